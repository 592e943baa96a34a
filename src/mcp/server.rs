//! The central Model Context Protocol engine
//!
//! Routes each inbound request by method, runs the validated and
//! rate-limited tool/prompt pipelines, and encodes the outcome onto the
//! connection. Protocol failures become JSON-RPC errors; failures inside a
//! tool or prompt body are returned as successful results carrying the
//! error text.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::domain::notifier::ConnectionNotifier;
use crate::domain::registry::Registry;
use crate::errors::ProtocolError;
use crate::logging::redact_audit_params;
use crate::mcp::protocol::{
    CallToolParams, CallToolResult, GetPromptParams, GetPromptResult, InitializeParams,
    InitializeResult, ListChangedCapability, ListParams, ListPromptsResult, ListToolsResult,
    ServerCapabilities, SUPPORTED_PROTOCOL_VERSION,
};
use crate::mcp::rpc::Request;
use crate::mcp::transport::Connection;
use crate::AppState;

pub const RATE_LIMIT_EXCEEDED: &str = "rate limit exceeded";

/// What a handler decided; encoded onto the wire by [`deliver`].
#[derive(Debug)]
pub enum Outcome {
    Success(Value),
    /// Well-formed request whose capability failed; still a result reply.
    ApplicationError(Value),
    ProtocolError(ProtocolError),
    NoReply,
}

impl Outcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::ApplicationError(_) => "application_error",
            Self::ProtocolError(_) => "protocol_error",
            Self::NoReply => "no_reply",
        }
    }
}

pub async fn handle_json_rpc_request(state: &AppState, connection: &Connection, request: Request) {
    let span = info_span!("mcp_request", method = %request.method, id = ?request.id);
    async {
        let started_at = Instant::now();
        let outcome = dispatch(state, connection, &request).await;
        let label = outcome.label();
        deliver(connection, &request, outcome);

        info!(
            params = %redact_audit_params(request.params.as_ref()),
            outcome = label,
            duration_ms = started_at.elapsed().as_millis(),
            "mcp action audited"
        );
    }
    .instrument(span)
    .await
}

pub async fn dispatch(state: &AppState, connection: &Connection, request: &Request) -> Outcome {
    match request.method.as_str() {
        "initialize" => handle_initialize(state, request.params.as_ref()),
        "notifications/initialized" => {
            debug!("client finished initialization");
            Outcome::NoReply
        }
        "ping" => Outcome::Success(json!({})),
        "tools/list" => match parse_list_params(request.params.as_ref()) {
            Ok(()) => encode(&ListToolsResult {
                tools: state.registry.tool_metadata(),
            }),
            Err(err) => Outcome::ProtocolError(err),
        },
        "tools/call" => handle_tools_call(state, connection, request.params.as_ref()).await,
        "prompts/list" => match parse_list_params(request.params.as_ref()) {
            Ok(()) => encode(&ListPromptsResult {
                prompts: state.registry.prompt_metadata(),
            }),
            Err(err) => Outcome::ProtocolError(err),
        },
        "prompts/get" => handle_prompts_get(state, connection, request.params.as_ref()).await,
        _ => Outcome::ProtocolError(ProtocolError::MethodNotFound),
    }
}

fn handle_initialize(state: &AppState, params: Option<&Value>) -> Outcome {
    let client = params
        .and_then(|params| InitializeParams::deserialize(params).ok())
        .unwrap_or_default();

    info!(
        client_name = client.client_info.as_ref().map(|info| info.name.as_str()),
        client_version = client.client_info.as_ref().map(|info| info.version.as_str()),
        requested_version = client.protocol_version.as_deref(),
        negotiated_version = SUPPORTED_PROTOCOL_VERSION,
        "client initializing"
    );

    encode(&InitializeResult {
        protocol_version: SUPPORTED_PROTOCOL_VERSION,
        capabilities: server_capabilities(&state.registry),
        server_info: state.server_info.clone(),
    })
}

/// `tools` is always advertised; `prompts` only when any are registered.
pub fn server_capabilities(registry: &Registry) -> ServerCapabilities {
    let unchanging = ListChangedCapability {
        list_changed: false,
    };
    ServerCapabilities {
        tools: Some(unchanging),
        prompts: registry.has_prompts().then_some(unchanging),
    }
}

/// Pagination is unsupported, so any cursor is invalid.
fn parse_list_params(params: Option<&Value>) -> Result<(), ProtocolError> {
    match params {
        None | Some(Value::Null) => Ok(()),
        Some(params) => match object_params::<ListParams>(Some(params)) {
            Some(ListParams { cursor: None }) => Ok(()),
            Some(ListParams { cursor: Some(_) }) | None => Err(ProtocolError::InvalidParams),
        },
    }
}

/// Params decoded from a JSON object. serde would also accept the positional
/// array form of a struct; the protocol only uses named params.
fn object_params<'de, T: Deserialize<'de>>(params: Option<&'de Value>) -> Option<T> {
    params
        .filter(|params| params.is_object())
        .and_then(|params| T::deserialize(params).ok())
}

async fn handle_tools_call(
    state: &AppState,
    connection: &Connection,
    params: Option<&Value>,
) -> Outcome {
    let Some(params) = object_params::<CallToolParams>(params) else {
        return Outcome::ProtocolError(ProtocolError::InvalidParams);
    };

    let Some(tool) = state.registry.tool(&params.name) else {
        return Outcome::ProtocolError(ProtocolError::UnknownTool { name: params.name });
    };

    if !tool.rate_gate.allow() {
        warn!(tool = %params.name, "tool rate limit exceeded");
        return tool_error(RATE_LIMIT_EXCEEDED);
    }

    if let Some(missing) = tool.missing_required(&params) {
        debug!(tool = %params.name, missing, "tool call is missing a required argument");
        return Outcome::ProtocolError(ProtocolError::InvalidParams);
    }

    let notifier = ConnectionNotifier::new(connection.clone());
    match tool.handler.execute(&notifier, params).await {
        Ok(result) if result.is_error == Some(true) => match serde_json::to_value(&result) {
            Ok(value) => Outcome::ApplicationError(value),
            Err(err) => encode_failure(err),
        },
        Ok(result) => encode(&result),
        Err(err) => {
            debug!(error = %err, "tool execution failed");
            tool_error(err.message())
        }
    }
}

async fn handle_prompts_get(
    state: &AppState,
    connection: &Connection,
    params: Option<&Value>,
) -> Outcome {
    let Some(params) = object_params::<GetPromptParams>(params) else {
        return Outcome::ProtocolError(ProtocolError::InvalidParams);
    };

    let Some(prompt) = state.registry.prompt(&params.name) else {
        return Outcome::ProtocolError(ProtocolError::UnknownPrompt { name: params.name });
    };

    if !prompt.rate_gate.allow() {
        warn!(prompt = %params.name, "prompt rate limit exceeded");
        return prompt_error(RATE_LIMIT_EXCEEDED);
    }

    if let Some(missing) = prompt.missing_required(&params) {
        return Outcome::ProtocolError(ProtocolError::MissingArgument {
            name: missing.to_string(),
        });
    }

    let notifier = ConnectionNotifier::new(connection.clone());
    match prompt.handler.process(&notifier, params).await {
        Ok(result) => encode(&result),
        Err(err) => {
            debug!(error = %err, "prompt processing failed");
            prompt_error(err.message())
        }
    }
}

fn tool_error(message: &str) -> Outcome {
    match serde_json::to_value(CallToolResult::error_text(message)) {
        Ok(value) => Outcome::ApplicationError(value),
        Err(err) => encode_failure(err),
    }
}

fn prompt_error(message: &str) -> Outcome {
    match serde_json::to_value(GetPromptResult::assistant_text(message)) {
        Ok(value) => Outcome::ApplicationError(value),
        Err(err) => encode_failure(err),
    }
}

fn encode<T: Serialize>(result: &T) -> Outcome {
    match serde_json::to_value(result) {
        Ok(value) => Outcome::Success(value),
        Err(err) => encode_failure(err),
    }
}

fn encode_failure(err: serde_json::Error) -> Outcome {
    error!(error = %err, "failed to encode result");
    Outcome::ProtocolError(ProtocolError::Internal)
}

/// Write the outcome back. Notifications never get a reply, and write
/// failures are logged rather than surfaced.
fn deliver(connection: &Connection, request: &Request, outcome: Outcome) {
    let Some(id) = request.id.as_ref() else {
        if !matches!(outcome, Outcome::NoReply) {
            debug!(outcome = outcome.label(), "dropping reply to notification");
        }
        return;
    };

    let sent = match &outcome {
        Outcome::Success(result) | Outcome::ApplicationError(result) => {
            connection.reply(id, result)
        }
        Outcome::ProtocolError(err) => {
            connection.reply_with_error(Some(id), err.code(), &err.to_string())
        }
        Outcome::NoReply => return,
    };

    if let Err(err) = sent {
        error!(method = %request.method, error = %err, "problem replying");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_accept_absent_null_or_empty() {
        assert!(parse_list_params(None).is_ok());
        assert!(parse_list_params(Some(&Value::Null)).is_ok());
        assert!(parse_list_params(Some(&json!({}))).is_ok());
        assert!(parse_list_params(Some(&json!({"cursor": null}))).is_ok());
    }

    #[test]
    fn list_params_reject_cursor_and_garbage() {
        assert_eq!(
            parse_list_params(Some(&json!({"cursor": "invalid-cursor"}))),
            Err(ProtocolError::InvalidParams)
        );
        assert_eq!(
            parse_list_params(Some(&json!("cursor"))),
            Err(ProtocolError::InvalidParams)
        );
        assert_eq!(
            parse_list_params(Some(&json!([]))),
            Err(ProtocolError::InvalidParams)
        );
    }

    #[test]
    fn positional_params_are_rejected() {
        assert!(object_params::<CallToolParams>(Some(&json!(["sha256sum", {}]))).is_none());
        assert!(object_params::<GetPromptParams>(Some(&json!(["example"]))).is_none());
        assert_eq!(
            object_params::<CallToolParams>(Some(&json!({"name": "sha256sum"})))
                .map(|params| params.name),
            Some("sha256sum".to_string())
        );
    }

    #[test]
    fn capabilities_follow_registry_contents() {
        let empty = server_capabilities(&Registry::default());
        assert!(empty.tools.is_some());
        assert!(empty.prompts.is_none());
    }

    #[test]
    fn outcome_labels() {
        assert_eq!(Outcome::NoReply.label(), "no_reply");
        assert_eq!(tool_error("boom").label(), "application_error");
        assert_eq!(prompt_error("boom").label(), "application_error");
        assert_eq!(encode(&json!({})).label(), "success");
    }
}

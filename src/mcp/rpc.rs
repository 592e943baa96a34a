//! JSON-RPC 2.0 envelopes and error codes
//!
//! Every outbound message is built here and serialized to a single JSON
//! object; framing (the trailing newline) is the transport's job.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

pub const PARSE_ERROR: i32 = -32700;
pub const INVALID_REQUEST: i32 = -32600;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

/// Inbound message. A missing (or `null`) `id` marks a notification.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

impl Request {
    pub fn new(id: Option<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Response<'a, T> {
    pub jsonrpc: &'static str,
    pub id: &'a RequestId,
    pub result: &'a T,
}

impl<'a, T: Serialize> Response<'a, T> {
    pub fn new(id: &'a RequestId, result: &'a T) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result,
        }
    }
}

/// Error reply. `id` is `null` when the request id could not be read.
#[derive(Debug, Serialize)]
pub struct ErrorResponse<'a> {
    pub jsonrpc: &'static str,
    pub id: Option<&'a RequestId>,
    pub error: RpcErrorObject<'a>,
}

impl<'a> ErrorResponse<'a> {
    pub fn new(id: Option<&'a RequestId>, code: i32, message: &'a str) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            error: RpcErrorObject { code, message },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RpcErrorObject<'a> {
    pub code: i32,
    pub message: &'a str,
}

#[derive(Debug, Serialize)]
pub struct Notification<'a, P> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    pub params: &'a P,
}

impl<'a, P: Serialize> Notification<'a, P> {
    pub fn new(method: &'a str, params: &'a P) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
        }
    }
}

/// Best-effort id recovery from a payload that failed envelope validation.
pub fn extract_id(payload: &Value) -> Option<RequestId> {
    payload
        .get("id")
        .cloned()
        .and_then(|id| serde_json::from_value(id).ok())
}

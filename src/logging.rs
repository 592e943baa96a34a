use serde_json::{Map, Value};
use tracing_subscriber::{fmt, EnvFilter};

const REDACTED: &str = "[REDACTED]";

/// Install the global subscriber. Output goes to stderr because stdout
/// carries the protocol stream.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .compact()
        .init();
}

/// Copy of request params fit for the audit log, with credential-like
/// values masked at any depth.
pub fn redact_audit_params(params: Option<&Value>) -> Value {
    params.map(redact_value).unwrap_or(Value::Null)
}

fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, item)| {
                    let item = if is_sensitive_key(key) {
                        Value::String(REDACTED.to_string())
                    } else {
                        redact_value(item)
                    };
                    (key.clone(), item)
                })
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        other => other.clone(),
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.trim().to_ascii_lowercase().replace(&['-', '_'][..], "");
    ["token", "secret", "password", "credential", "apikey", "authorization"]
        .iter()
        .any(|needle| normalized.contains(needle))
}

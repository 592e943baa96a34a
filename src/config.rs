use std::env;
use std::str::FromStr;

use thiserror::Error;

use crate::domain::rate_gate::RateGate;
use crate::mcp::protocol::Implementation;

pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 1_048_576;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub server_name: String,
    pub server_version: String,
    pub max_message_bytes: usize,
    pub tool_rate: RateSettings,
    pub prompt_rate: RateSettings,
}

/// Per-capability token bucket parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateSettings {
    pub per_second: f64,
    pub burst: u32,
}

impl RateSettings {
    pub fn gate(&self) -> RateGate {
        RateGate::new(self.per_second, self.burst)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must not be empty")]
    Empty { name: &'static str },
    #[error("{name} must be a positive integer")]
    InvalidSize { name: &'static str },
    #[error("{name} must be a non-negative number")]
    InvalidRate { name: &'static str },
    #[error("{name} must be a valid u32")]
    InvalidBurst { name: &'static str },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_name = text_var("MCP_SERVER_NAME", "ExampleServer")?;
        let server_version = text_var("MCP_SERVER_VERSION", "1.0.0")?;

        let max_message_bytes = parsed_var::<usize>("MCP_MAX_MESSAGE_BYTES")
            .map_err(|_| ConfigError::InvalidSize {
                name: "MCP_MAX_MESSAGE_BYTES",
            })?
            .unwrap_or(DEFAULT_MAX_MESSAGE_BYTES);
        if max_message_bytes == 0 {
            return Err(ConfigError::InvalidSize {
                name: "MCP_MAX_MESSAGE_BYTES",
            });
        }

        Ok(Self {
            server_name,
            server_version,
            max_message_bytes,
            tool_rate: rate_settings("MCP_TOOL_RATE_PER_SEC", 10.0, "MCP_TOOL_BURST", 1)?,
            prompt_rate: rate_settings("MCP_PROMPT_RATE_PER_SEC", 1.0, "MCP_PROMPT_BURST", 5)?,
        })
    }

    pub fn server_info(&self) -> Implementation {
        Implementation::new(&self.server_name, &self.server_version)
    }
}

fn text_var(name: &'static str, default: &str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) => {
            let value = value.trim().to_string();
            if value.is_empty() {
                return Err(ConfigError::Empty { name });
            }
            Ok(value)
        }
        Err(_) => Ok(default.to_string()),
    }
}

fn parsed_var<T: FromStr>(name: &str) -> Result<Option<T>, T::Err> {
    env::var(name)
        .ok()
        .map(|value| value.trim().parse::<T>())
        .transpose()
}

fn rate_settings(
    rate_name: &'static str,
    default_rate: f64,
    burst_name: &'static str,
    default_burst: u32,
) -> Result<RateSettings, ConfigError> {
    let per_second = parsed_var::<f64>(rate_name)
        .ok()
        .and_then(|value| match value {
            Some(rate) if rate.is_finite() && rate >= 0.0 => Some(rate),
            Some(_) => None,
            None => Some(default_rate),
        })
        .ok_or(ConfigError::InvalidRate { name: rate_name })?;

    let burst = parsed_var::<u32>(burst_name)
        .map_err(|_| ConfigError::InvalidBurst { name: burst_name })?
        .unwrap_or(default_burst);

    Ok(RateSettings { per_second, burst })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // Tests mutate process-wide environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 7] = [
        "MCP_SERVER_NAME",
        "MCP_SERVER_VERSION",
        "MCP_MAX_MESSAGE_BYTES",
        "MCP_TOOL_RATE_PER_SEC",
        "MCP_TOOL_BURST",
        "MCP_PROMPT_RATE_PER_SEC",
        "MCP_PROMPT_BURST",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn parse_defaults() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();

        let config = Config::from_env().expect("config should parse");
        assert_eq!(
            config.server_info(),
            Implementation::new("ExampleServer", "1.0.0")
        );
        assert_eq!(config.max_message_bytes, DEFAULT_MAX_MESSAGE_BYTES);
        assert_eq!(
            config.tool_rate,
            RateSettings {
                per_second: 10.0,
                burst: 1
            }
        );
        assert_eq!(
            config.prompt_rate,
            RateSettings {
                per_second: 1.0,
                burst: 5
            }
        );
    }

    #[test]
    fn overrides_apply() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var("MCP_SERVER_NAME", " checksum-server ");
        env::set_var("MCP_TOOL_BURST", "3");
        env::set_var("MCP_PROMPT_RATE_PER_SEC", "0.5");

        let config = Config::from_env().expect("config should parse");
        assert_eq!(config.server_name, "checksum-server");
        assert_eq!(config.tool_rate.burst, 3);
        assert_eq!(config.prompt_rate.per_second, 0.5);
        clear_env();
    }

    #[test]
    fn empty_name_fails() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var("MCP_SERVER_NAME", "  ");

        let err = Config::from_env().expect_err("expected empty name error");
        assert!(matches!(err, ConfigError::Empty { name: "MCP_SERVER_NAME" }));
        clear_env();
    }

    #[test]
    fn negative_rate_fails() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var("MCP_TOOL_RATE_PER_SEC", "-1");

        let err = Config::from_env().expect_err("expected invalid rate error");
        assert!(matches!(err, ConfigError::InvalidRate { .. }));
        clear_env();
    }

    #[test]
    fn zero_message_size_fails() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var("MCP_MAX_MESSAGE_BYTES", "0");

        let err = Config::from_env().expect_err("expected invalid size error");
        assert!(matches!(err, ConfigError::InvalidSize { .. }));
        clear_env();
    }

    #[test]
    fn unparsable_burst_fails() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        clear_env();
        env::set_var("MCP_PROMPT_BURST", "many");

        let err = Config::from_env().expect_err("expected invalid burst error");
        assert!(matches!(err, ConfigError::InvalidBurst { name: "MCP_PROMPT_BURST" }));
        clear_env();
    }
}

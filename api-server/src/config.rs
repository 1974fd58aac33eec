//! Server configuration, read once from the environment at startup

use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_DATA_DIR: &str = ".todo-data";
pub const DEFAULT_JWT_SECRET: &str = "dev-jwt-secret-change-me";
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 60 * 60 * 8;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {name} '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub token_ttl_seconds: i64,
    pub cors_permissive: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; unset or blank values take defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        let bind_raw = get("TODO_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw
            .parse::<SocketAddr>()
            .map_err(|err| ConfigError::Invalid {
                name: "TODO_BIND_ADDR",
                value: bind_raw.clone(),
                reason: err.to_string(),
            })?;

        let token_ttl_seconds = match get("TODO_TOKEN_TTL_SECONDS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|ttl| *ttl > 0)
                .ok_or_else(|| ConfigError::Invalid {
                    name: "TODO_TOKEN_TTL_SECONDS",
                    value: raw.clone(),
                    reason: "expected a positive number of seconds".to_string(),
                })?,
            None => DEFAULT_TOKEN_TTL_SECONDS,
        };

        Ok(Self {
            bind_addr,
            data_dir: get("TODO_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            jwt_secret: get("TODO_JWT_SECRET").unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string()),
            token_ttl_seconds,
            cors_permissive: flag(get("TODO_CORS_PERMISSIVE").as_deref(), true),
        })
    }

    /// Defaults rooted at `data_dir`, bound to an ephemeral local port
    #[cfg(test)]
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            data_dir: data_dir.into(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            cors_permissive: true,
        }
    }

    pub fn todos_path(&self) -> PathBuf {
        self.data_dir.join("todos.json")
    }

    pub fn auth_dir(&self) -> PathBuf {
        self.data_dir.join("auth")
    }
}

fn flag(raw: Option<&str>, default: bool) -> bool {
    match raw {
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            _ => default,
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind_addr.port(), 5000);
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(config.token_ttl_seconds, DEFAULT_TOKEN_TTL_SECONDS);
        assert!(config.cors_permissive);
        assert_eq!(config.auth_dir(), PathBuf::from(".todo-data/auth"));
    }

    #[test]
    fn values_are_parsed() {
        let config = config_from(&[
            ("TODO_BIND_ADDR", "127.0.0.1:8088"),
            ("TODO_DATA_DIR", "/tmp/todo"),
            ("TODO_TOKEN_TTL_SECONDS", "60"),
            ("TODO_CORS_PERMISSIVE", "off"),
        ])
        .unwrap();
        assert_eq!(config.bind_addr.port(), 8088);
        assert_eq!(config.todos_path(), PathBuf::from("/tmp/todo/todos.json"));
        assert_eq!(config.token_ttl_seconds, 60);
        assert!(!config.cors_permissive);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(config_from(&[("TODO_BIND_ADDR", "nowhere")]).is_err());
        assert!(config_from(&[("TODO_TOKEN_TTL_SECONDS", "-5")]).is_err());
        // Unknown flag spellings keep the default
        assert!(config_from(&[("TODO_CORS_PERMISSIVE", "maybe")])
            .unwrap()
            .cors_permissive);
    }
}

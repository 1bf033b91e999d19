// ⚙️ Configuration - environment variables, optionally loaded from `.env`

use std::path::PathBuf;

pub const DATABASE_VAR: &str = "TRIVIA_DATABASE";
pub const BIND_VAR: &str = "TRIVIA_BIND";

const DEFAULT_DATABASE: &str = "trivia.db";
const DEFAULT_BIND: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Address the HTTP server binds to
    pub bind_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from(DEFAULT_DATABASE),
            bind_addr: DEFAULT_BIND.to_string(),
        }
    }
}

impl Config {
    /// Load from the process environment after reading `.env` if present
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("loaded environment from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Config {
            database_path: value(DATABASE_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            bind_addr: value(BIND_VAR).unwrap_or(defaults.bind_addr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_overrides_and_blank_values() {
        let vars: HashMap<&str, &str> =
            [(DATABASE_VAR, "/tmp/quiz.db"), (BIND_VAR, "  ")].into_iter().collect();

        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.database_path, PathBuf::from("/tmp/quiz.db"));
        assert_eq!(config.bind_addr, DEFAULT_BIND);
    }
}

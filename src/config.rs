//! Server configuration, read from environment variables
//!
//! Unparseable values fall back to the default; values that parse but make no
//! sense (zero pool size, unknown theme) are rejected by [`ServerConfig::validate`].

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be at least 1")]
    Zero { key: &'static str },
    #[error("unknown theme '{0}' (expected one of: hamster, cosmic, coin, empire)")]
    UnknownTheme(String),
    #[error("invalid bind address {0}")]
    BindAddr(String),
}

/// Cosmetic variant of the game page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub title: &'static str,
    pub currency: &'static str,
    pub mascot: &'static str,
    pub background: &'static str,
    pub accent: &'static str,
}

pub static THEMES: [Theme; 4] = [
    Theme {
        name: "hamster",
        title: "Hamster Clicker",
        currency: "Coins",
        mascot: "🐹",
        background: "#1a1a2e",
        accent: "gold",
    },
    Theme {
        name: "cosmic",
        title: "Cosmic Clicker",
        currency: "Stardust",
        mascot: "🚀",
        background: "#0b0c2a",
        accent: "#8be9fd",
    },
    Theme {
        name: "coin",
        title: "Coin Clicker Master",
        currency: "Coins",
        mascot: "🪙",
        background: "#20232a",
        accent: "#f5c542",
    },
    Theme {
        name: "empire",
        title: "Hamster Empire",
        currency: "Gold",
        mascot: "👑",
        background: "#2b1d0e",
        accent: "#e0a526",
    },
];

impl Theme {
    pub fn by_name(name: &str) -> Option<&'static Theme> {
        let name = name.trim().to_ascii_lowercase();
        THEMES.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub max_connections: u32,
    pub static_dir: String,
    pub leaderboard_size: u32,
    pub leaderboard_refresh_secs: u64,
    /// Rebuild the leaderboard snapshot right after every save
    pub refresh_on_save: bool,
    /// Enables `POST /api/reset`
    pub allow_reset: bool,
    pub theme: &'static Theme,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 10000,
            database_path: "data/clicker.db".to_string(),
            max_connections: 5,
            static_dir: "static".to_string(),
            leaderboard_size: 100,
            leaderboard_refresh_secs: 60,
            refresh_on_save: true,
            allow_reset: false,
            theme: &THEMES[0],
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the process environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let theme = match lookup("CLICKER_THEME") {
            Some(name) => Theme::by_name(&name).ok_or(ConfigError::UnknownTheme(name))?,
            None => defaults.theme,
        };

        let config = Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(lookup("PORT"), defaults.port),
            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),
            max_connections: parse_or(lookup("DB_MAX_CONNECTIONS"), defaults.max_connections),
            static_dir: lookup("STATIC_DIR").unwrap_or(defaults.static_dir),
            leaderboard_size: parse_or(lookup("LEADERBOARD_SIZE"), defaults.leaderboard_size),
            leaderboard_refresh_secs: parse_or(
                lookup("LEADERBOARD_REFRESH_SECS"),
                defaults.leaderboard_refresh_secs,
            ),
            refresh_on_save: lookup("LEADERBOARD_REFRESH_ON_SAVE")
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.refresh_on_save),
            allow_reset: lookup("ALLOW_RESET")
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.allow_reset),
            theme,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Zero { key: "DB_MAX_CONNECTIONS" });
        }
        if self.leaderboard_size == 0 {
            return Err(ConfigError::Zero { key: "LEADERBOARD_SIZE" });
        }
        if self.leaderboard_refresh_secs == 0 {
            return Err(ConfigError::Zero { key: "LEADERBOARD_REFRESH_SECS" });
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::BindAddr(format!("{}:{}", self.host, self.port)))
    }

    pub fn leaderboard_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.leaderboard_refresh_secs)
    }
}

fn parse_or<T: FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(default)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_env_empty() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.port, 10000);
        assert_eq!(config.database_path, "data/clicker.db");
        assert_eq!(config.leaderboard_size, 100);
        assert!(config.refresh_on_save);
        assert!(!config.allow_reset);
        assert_eq!(config.theme.name, "hamster");
        assert_eq!(config.bind_addr().unwrap().port(), 10000);
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("HOST", "127.0.0.1"),
            ("LEADERBOARD_SIZE", "25"),
            ("LEADERBOARD_REFRESH_ON_SAVE", "off"),
            ("ALLOW_RESET", "yes"),
            ("CLICKER_THEME", "Cosmic"),
        ]))
        .unwrap();

        assert_eq!(config.bind_addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(config.leaderboard_size, 25);
        assert!(!config.refresh_on_save);
        assert!(config.allow_reset);
        assert_eq!(config.theme.title, "Cosmic Clicker");
    }

    #[test]
    fn test_unparseable_falls_back() {
        let config = ServerConfig::from_lookup(lookup_from(&[
            ("PORT", "not-a-port"),
            ("ALLOW_RESET", "maybe"),
        ]))
        .unwrap();
        assert_eq!(config.port, 10000);
        assert!(!config.allow_reset);
    }

    #[test]
    fn test_rejects_zero_and_unknown_theme() {
        assert_eq!(
            ServerConfig::from_lookup(lookup_from(&[("LEADERBOARD_SIZE", "0")])).unwrap_err(),
            ConfigError::Zero { key: "LEADERBOARD_SIZE" }
        );
        assert_eq!(
            ServerConfig::from_lookup(lookup_from(&[("LEADERBOARD_REFRESH_SECS", "0")]))
                .unwrap_err(),
            ConfigError::Zero { key: "LEADERBOARD_REFRESH_SECS" }
        );
        assert!(matches!(
            ServerConfig::from_lookup(lookup_from(&[("CLICKER_THEME", "dragon")])),
            Err(ConfigError::UnknownTheme(_))
        ));
    }

    #[test]
    fn test_theme_names_unique() {
        for theme in &THEMES {
            assert_eq!(Theme::by_name(theme.name), Some(theme));
        }
    }
}

// SPDX-License-Identifier: Apache-2.0

//! Process configuration resolved from `LUGLINE_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_DB_PATH: &str = "lugline.sqlite3";
pub const DEFAULT_BODY_LIMIT_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u64 = 100;
pub const DEFAULT_RATE_LIMIT_WINDOW_SECS: u64 = 900;
pub const DEFAULT_SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;
pub const DEFAULT_AUTO_ASSIGN_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_AUTO_ASSIGN_CUTOFF_HOURS: i64 = 24;
pub const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 86_400;
pub const DEFAULT_NOTIFICATION_RETENTION_DAYS: i64 = 30;
pub const DEFAULT_AI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_AI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_MAIL_FROM: &str = "\"Lugline\" <no-reply@lugline.example>";

/// Everything the server reads from the environment, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub db_path: PathBuf,
    pub body_limit_bytes: usize,
    pub rate_limit_max_requests: u64,
    pub rate_limit_window_secs: u64,
    pub session_ttl_secs: i64,
    pub auto_assign_interval_secs: u64,
    pub auto_assign_cutoff_hours: i64,
    pub cleanup_interval_secs: u64,
    pub notification_retention_days: i64,
    pub ai_api_base: String,
    pub ai_model: String,
    pub ai_api_key: Option<String>,
    pub mail_api_base: Option<String>,
    pub mail_api_key: Option<String>,
    pub mail_from: String,
    pub log_json: bool,
    pub seed_admin_email: Option<String>,
    pub seed_admin_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            body_limit_bytes: DEFAULT_BODY_LIMIT_BYTES,
            rate_limit_max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            rate_limit_window_secs: DEFAULT_RATE_LIMIT_WINDOW_SECS,
            session_ttl_secs: DEFAULT_SESSION_TTL_SECS,
            auto_assign_interval_secs: DEFAULT_AUTO_ASSIGN_INTERVAL_SECS,
            auto_assign_cutoff_hours: DEFAULT_AUTO_ASSIGN_CUTOFF_HOURS,
            cleanup_interval_secs: DEFAULT_CLEANUP_INTERVAL_SECS,
            notification_retention_days: DEFAULT_NOTIFICATION_RETENTION_DAYS,
            ai_api_base: DEFAULT_AI_API_BASE.to_string(),
            ai_model: DEFAULT_AI_MODEL.to_string(),
            ai_api_key: None,
            mail_api_base: None,
            mail_api_key: None,
            mail_from: DEFAULT_MAIL_FROM.to_string(),
            log_json: false,
            seed_admin_email: None,
            seed_admin_password: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env_string("LUGLINE_BIND_ADDR", DEFAULT_BIND_ADDR),
            db_path: PathBuf::from(env_string("LUGLINE_DB_PATH", DEFAULT_DB_PATH)),
            body_limit_bytes: env_usize("LUGLINE_BODY_LIMIT_BYTES", DEFAULT_BODY_LIMIT_BYTES),
            rate_limit_max_requests: env_u64(
                "LUGLINE_RATE_LIMIT_MAX_REQUESTS",
                DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            ),
            rate_limit_window_secs: env_u64(
                "LUGLINE_RATE_LIMIT_WINDOW_SECS",
                DEFAULT_RATE_LIMIT_WINDOW_SECS,
            ),
            session_ttl_secs: env_i64("LUGLINE_SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS),
            auto_assign_interval_secs: env_u64(
                "LUGLINE_AUTO_ASSIGN_INTERVAL_SECS",
                DEFAULT_AUTO_ASSIGN_INTERVAL_SECS,
            ),
            auto_assign_cutoff_hours: env_i64(
                "LUGLINE_AUTO_ASSIGN_CUTOFF_HOURS",
                DEFAULT_AUTO_ASSIGN_CUTOFF_HOURS,
            ),
            cleanup_interval_secs: env_u64(
                "LUGLINE_CLEANUP_INTERVAL_SECS",
                DEFAULT_CLEANUP_INTERVAL_SECS,
            ),
            notification_retention_days: env_i64(
                "LUGLINE_NOTIFICATION_RETENTION_DAYS",
                DEFAULT_NOTIFICATION_RETENTION_DAYS,
            ),
            ai_api_base: env_string("LUGLINE_AI_API_BASE", DEFAULT_AI_API_BASE),
            ai_model: env_string("LUGLINE_AI_MODEL", DEFAULT_AI_MODEL),
            ai_api_key: env_opt("GEMINI_API_KEY"),
            mail_api_base: env_opt("LUGLINE_MAIL_API_BASE"),
            mail_api_key: env_opt("LUGLINE_MAIL_API_KEY"),
            mail_from: env_string("LUGLINE_MAIL_FROM", DEFAULT_MAIL_FROM),
            log_json: env_bool("LUGLINE_LOG_JSON", false),
            seed_admin_email: env_opt("LUGLINE_SEED_ADMIN_EMAIL"),
            seed_admin_password: env_opt("LUGLINE_SEED_ADMIN_PASSWORD"),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        self.bind_addr
            .parse::<SocketAddr>()
            .map_err(|e| format!("invalid LUGLINE_BIND_ADDR {:?}: {e}", self.bind_addr))?;
        if self.body_limit_bytes == 0 {
            return Err("LUGLINE_BODY_LIMIT_BYTES must be positive".to_string());
        }
        if self.rate_limit_max_requests == 0 {
            return Err("LUGLINE_RATE_LIMIT_MAX_REQUESTS must be positive".to_string());
        }
        if self.rate_limit_window_secs == 0 {
            return Err("LUGLINE_RATE_LIMIT_WINDOW_SECS must be positive".to_string());
        }
        if self.session_ttl_secs <= 0 {
            return Err("LUGLINE_SESSION_TTL_SECS must be positive".to_string());
        }
        if self.auto_assign_interval_secs == 0 {
            return Err("LUGLINE_AUTO_ASSIGN_INTERVAL_SECS must be positive".to_string());
        }
        if self.auto_assign_cutoff_hours <= 0 {
            return Err("LUGLINE_AUTO_ASSIGN_CUTOFF_HOURS must be positive".to_string());
        }
        if self.cleanup_interval_secs == 0 {
            return Err("LUGLINE_CLEANUP_INTERVAL_SECS must be positive".to_string());
        }
        if self.notification_retention_days <= 0 {
            return Err("LUGLINE_NOTIFICATION_RETENTION_DAYS must be positive".to_string());
        }
        if self.mail_api_base.is_some() != self.mail_api_key.is_some() {
            return Err(
                "LUGLINE_MAIL_API_BASE and LUGLINE_MAIL_API_KEY must be set together".to_string(),
            );
        }
        if self.seed_admin_email.is_some() != self.seed_admin_password.is_some() {
            return Err(
                "LUGLINE_SEED_ADMIN_EMAIL and LUGLINE_SEED_ADMIN_PASSWORD must be set together"
                    .to_string(),
            );
        }
        Ok(())
    }

    pub fn mail_enabled(&self) -> bool {
        self.mail_api_base.is_some() && self.mail_api_key.is_some()
    }

    pub fn assistant_enabled(&self) -> bool {
        self.ai_api_key.is_some()
    }
}

fn env_string(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name)
        .ok()
        .map(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_i64(name: &str, default: i64) -> i64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.mail_enabled());
        assert!(!config.assistant_enabled());
    }

    #[test]
    fn rejects_unparseable_bind_addr() {
        let config = AppConfig {
            bind_addr: "not-an-addr".to_string(),
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("LUGLINE_BIND_ADDR"));
    }

    #[test]
    fn rejects_zero_rate_limit_window() {
        let config = AppConfig {
            rate_limit_window_secs: 0,
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn mail_base_requires_key() {
        let config = AppConfig {
            mail_api_base: Some("https://mail.example".to_string()),
            ..AppConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.contains("LUGLINE_MAIL_API_KEY"));
    }

    #[test]
    fn seed_admin_requires_both_halves() {
        let config = AppConfig {
            seed_admin_email: Some("admin@lugline.example".to_string()),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }
}

/// Configuration management for the sales portal
use crate::error::{PortalError, PortalResult};
use chrono::{Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub session: SessionConfig,
    pub record_store: RecordStoreConfig,
    pub activity: ActivityConfig,
    pub worklist: WorklistConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Offset of the business time zone from UTC, in minutes
    pub utc_offset_minutes: i32,
}

/// Longest accepted session idle timeout (one year)
pub const MAX_IDLE_TIMEOUT_SECS: u64 = 365 * 24 * 3600;

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub idle_timeout_secs: u64,
    pub cookie_secure: bool,
}

/// Record store backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RecordStoreConfig {
    Salesforce(SalesforceConfig),
    Memory { seed_file: Option<PathBuf> },
}

/// Salesforce REST API credentials
#[derive(Clone, Serialize, Deserialize)]
pub struct SalesforceConfig {
    pub login_url: String,
    pub api_version: String,
    pub username: String,
    pub password: String,
    pub security_token: String,
    pub client_id: String,
    pub client_secret: String,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for SalesforceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceConfig")
            .field("login_url", &self.login_url)
            .field("api_version", &self.api_version)
            .field("username", &self.username)
            .field("client_id", &self.client_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

/// Fixed values stamped on every call activity log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityConfig {
    pub subject: String,
    /// Owner of created tasks; `None` leaves the store default owner
    pub owner_id: Option<String>,
    pub task_type: String,
}

impl Default for ActivityConfig {
    fn default() -> Self {
        Self {
            subject: "Call".to_string(),
            owner_id: None,
            task_type: "Call".to_string(),
        }
    }
}

/// Worklist configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorklistConfig {
    pub limit: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> PortalResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("PORTAL_HOSTNAME").unwrap_or_else(|_| "0.0.0.0".to_string());
        // PORT is what most hosting platforms assign
        let port = env::var("PORTAL_PORT")
            .or_else(|_| env::var("PORT"))
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| PortalError::Config("Invalid port number".to_string()))?;
        let utc_offset_minutes = env::var("PORTAL_UTC_OFFSET_MINUTES")
            .unwrap_or_else(|_| "540".to_string())
            .parse()
            .map_err(|_| PortalError::Config("Invalid UTC offset".to_string()))?;

        let idle_timeout_secs = env::var("PORTAL_SESSION_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "3600".to_string())
            .parse()
            .unwrap_or(3600);
        let cookie_secure = env::var("PORTAL_COOKIE_SECURE")
            .unwrap_or_else(|_| "false".to_string())
            .parse()
            .unwrap_or(false);

        let backend = env::var("PORTAL_RECORD_STORE").unwrap_or_else(|_| "salesforce".to_string());
        let record_store = match backend.as_str() {
            "memory" => RecordStoreConfig::Memory {
                seed_file: env::var("PORTAL_MEMORY_SEED").map(PathBuf::from).ok(),
            },
            "salesforce" => RecordStoreConfig::Salesforce(SalesforceConfig {
                login_url: env::var("SF_LOGIN_URL")
                    .unwrap_or_else(|_| "https://login.salesforce.com".to_string()),
                api_version: env::var("SF_API_VERSION").unwrap_or_else(|_| "59.0".to_string()),
                username: env::var("SF_USERNAME")
                    .map_err(|_| PortalError::Config("SF_USERNAME required".to_string()))?,
                password: env::var("SF_PASSWORD")
                    .map_err(|_| PortalError::Config("SF_PASSWORD required".to_string()))?,
                security_token: env::var("SF_SECURITY_TOKEN").unwrap_or_default(),
                client_id: env::var("SF_CLIENT_ID")
                    .map_err(|_| PortalError::Config("SF_CLIENT_ID required".to_string()))?,
                client_secret: env::var("SF_CLIENT_SECRET")
                    .map_err(|_| PortalError::Config("SF_CLIENT_SECRET required".to_string()))?,
                timeout_secs: env::var("SF_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .unwrap_or(30),
            }),
            other => {
                return Err(PortalError::Config(format!(
                    "Unknown record store backend: {}",
                    other
                )))
            }
        };

        let defaults = ActivityConfig::default();
        let activity = ActivityConfig {
            subject: env::var("PORTAL_ACTIVITY_SUBJECT").unwrap_or(defaults.subject),
            owner_id: env::var("PORTAL_ACTIVITY_OWNER_ID")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            task_type: env::var("PORTAL_ACTIVITY_TYPE").unwrap_or(defaults.task_type),
        };

        let worklist_limit = env::var("PORTAL_WORKLIST_LIMIT")
            .unwrap_or_else(|_| "200".to_string())
            .parse()
            .unwrap_or(200);

        let log_level = env::var("RUST_LOG")
            .unwrap_or_else(|_| "sales_portal=debug,tower_http=debug".to_string());
        let log_json = env::var("LOG_FORMAT")
            .map(|f| f.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                utc_offset_minutes,
            },
            session: SessionConfig {
                idle_timeout_secs,
                cookie_secure,
            },
            record_store,
            activity,
            worklist: WorklistConfig {
                limit: worklist_limit,
            },
            logging: LoggingConfig {
                level: log_level,
                json: log_json,
            },
        })
    }

    /// Configuration backed by an empty memory store, for local runs and tests
    pub fn in_memory() -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "127.0.0.1".to_string(),
                port: 5000,
                utc_offset_minutes: 540,
            },
            session: SessionConfig {
                idle_timeout_secs: 3600,
                cookie_secure: false,
            },
            record_store: RecordStoreConfig::Memory { seed_file: None },
            activity: ActivityConfig::default(),
            worklist: WorklistConfig { limit: 200 },
            logging: LoggingConfig {
                level: "info".to_string(),
                json: false,
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> PortalResult<()> {
        if self.service.hostname.is_empty() {
            return Err(PortalError::Config("Hostname cannot be empty".to_string()));
        }

        if self.session.idle_timeout_secs == 0 {
            return Err(PortalError::Config(
                "Session idle timeout must be positive".to_string(),
            ));
        }
        if self.session.idle_timeout_secs > MAX_IDLE_TIMEOUT_SECS {
            return Err(PortalError::Config(format!(
                "Session idle timeout must be at most {}s",
                MAX_IDLE_TIMEOUT_SECS
            )));
        }

        // Offsets beyond +/-24h are rejected by chrono
        self.business_offset()?;

        if let RecordStoreConfig::Salesforce(sf) = &self.record_store {
            if !sf.login_url.starts_with("https://") && !sf.login_url.starts_with("http://") {
                return Err(PortalError::Config(
                    "SF_LOGIN_URL must be an http(s) URL".to_string(),
                ));
            }
            if sf.timeout_secs == 0 {
                return Err(PortalError::Config(
                    "SF_TIMEOUT_SECS must be positive".to_string(),
                ));
            }
        }

        if self.worklist.limit == 0 {
            return Err(PortalError::Config(
                "Worklist limit must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Session idle timeout as a duration
    pub fn idle_timeout(&self) -> PortalResult<Duration> {
        i64::try_from(self.session.idle_timeout_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .ok_or_else(|| {
                PortalError::Config(format!(
                    "Session idle timeout out of range: {}s",
                    self.session.idle_timeout_secs
                ))
            })
    }

    /// Business time zone used for session timestamps and activity dates
    pub fn business_offset(&self) -> PortalResult<FixedOffset> {
        FixedOffset::east_opt(self.service.utc_offset_minutes * 60).ok_or_else(|| {
            PortalError::Config(format!(
                "UTC offset out of range: {} minutes",
                self.service.utc_offset_minutes
            ))
        })
    }
}

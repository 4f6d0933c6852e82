use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::env;
use std::time::Duration;
use config; // Explicitly import the config crate

pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";

#[derive(Debug, Deserialize, Clone)]
pub struct WebConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueueConfig {
    /// Seconds between two runs of the queue processor inside the server.
    pub poll_interval_secs: u64,
    /// Upper bound for a single publish call.
    pub publish_timeout_secs: u64,
    /// Age after which an unfinished claim is released as failed.
    pub claim_lease_secs: i64,
}

impl QueueConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn publish_timeout(&self) -> Duration {
        Duration::from_secs(self.publish_timeout_secs.max(1))
    }

    pub fn claim_lease(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.claim_lease_secs.max(1))
    }

    /// A claim must outlive the publish it guards, or a second run could fail an
    /// entry whose publish is still in flight.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        let timeout_secs = self.publish_timeout().as_secs() as i64;
        if self.claim_lease().num_seconds() <= timeout_secs {
            return Err(config::ConfigError::Message(format!(
                "FATAL: 'CLAIM_LEASE_SECS' ({}) must be greater than 'PUBLISH_TIMEOUT_SECS' ({}).",
                self.claim_lease().num_seconds(),
                timeout_secs
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub web: WebConfig,
    pub queue: QueueConfig,
    // These fields will be populated from the .env file
    pub database_path: String,
    pub allowed_origins: String,
    pub log_level: String,
}

impl Config {
    pub fn from_env(env_path: &Path) -> Result<Self, config::ConfigError> {
        // Load the specified .env file. Propagate an error if it fails.
        dotenvy::from_path(env_path)
            .map_err(|e| {
                config::ConfigError::Message(format!(
                    "FATAL: Failed to load .env file from '{}'. Error: {}",
                    env_path.display(),
                    e
                ))
            })?;

        let database_path = env::var("DATABASE_PATH").map_err(|_| {
            config::ConfigError::Message(
                "FATAL: Environment variable 'DATABASE_PATH' is not set in your .env file."
                    .to_string(),
            )
        })?;

        if Path::new(&database_path).is_relative() {
            return Err(config::ConfigError::Message(format!(
                "FATAL: The 'DATABASE_PATH' in your .env file is a relative path ('{}'). \
                 It MUST be an absolute path.",
                database_path
            )));
        }

        let allowed_origins = env::var("ALLOWED_ORIGINS").unwrap_or_else(|_| "".to_string());
        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let mut builder = config::Config::builder()
            // Base settings (web host/port, queue timings) come from the TOML file.
            .add_source(config::File::new(DEFAULT_CONFIG_FILE, config::FileFormat::Toml))
            .set_override("database_path", database_path)?
            .set_override("allowed_origins", allowed_origins)?
            .set_override("log_level", log_level)?;

        // Queue timings may be tuned per deployment without touching the TOML file.
        for (var, key) in [
            ("QUEUE_POLL_INTERVAL_SECS", "queue.poll_interval_secs"),
            ("PUBLISH_TIMEOUT_SECS", "queue.publish_timeout_secs"),
            ("CLAIM_LEASE_SECS", "queue.claim_lease_secs"),
        ] {
            if let Ok(raw) = env::var(var) {
                let value = raw.trim().parse::<i64>().map_err(|_| {
                    config::ConfigError::Message(format!(
                        "FATAL: '{}' must be a whole number of seconds, got '{}'.",
                        var, raw
                    ))
                })?;
                if value <= 0 {
                    return Err(config::ConfigError::Message(format!(
                        "FATAL: '{}' must be greater than zero.", var
                    )));
                }
                builder = builder.set_override(key, value)?;
            }
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.queue.validate()?;
        Ok(config)
    }

    /// Returns the full path to the member directory database inside its own folder.
    pub fn members_db_path(&self) -> PathBuf {
        PathBuf::from(&self.database_path)
            .join("members")
            .join("members.db")
    }

    /// Returns the full path to the document store inside its own folder.
    pub fn documents_db_path(&self) -> PathBuf {
        PathBuf::from(&self.database_path)
            .join("documents")
            .join("documents.redb")
    }
}

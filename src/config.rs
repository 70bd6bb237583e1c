/// Configuration management for the NearCard service
use crate::error::{CardError, CardResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Base URL of the frontend app, without trailing slash. Registration and
    /// profile-view redirects are built against this.
    pub frontend_url: String,
    /// Public URL this service is reachable at, if deployed behind one.
    /// Stored redirect targets pointing back at this host are rejected.
    pub public_url: Option<String>,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub cards_db: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> CardResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("NEARCARD_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("NEARCARD_PORT")
            .unwrap_or_else(|_| "8787".to_string())
            .parse()
            .map_err(|_| CardError::Validation("Invalid port number".to_string()))?;

        let frontend_url = env::var("NEARCARD_FRONTEND_URL")
            .unwrap_or_else(|_| "https://nearcard.app".to_string())
            .trim_end_matches('/')
            .to_string();
        let public_url = env::var("NEARCARD_PUBLIC_URL").ok();
        let version =
            env::var("NEARCARD_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

        let data_directory: PathBuf = env::var("NEARCARD_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let cards_db = env::var("NEARCARD_CARDS_DB_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("cards.sqlite"));

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                frontend_url,
                public_url,
                version,
            },
            storage: StorageConfig {
                data_directory,
                cards_db,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> CardResult<()> {
        if self.service.hostname.is_empty() {
            return Err(CardError::Validation(
                "Hostname cannot be empty".to_string(),
            ));
        }

        if url::Url::parse(&self.service.frontend_url).is_err() {
            return Err(CardError::Validation(format!(
                "Frontend URL is not a valid URL: {}",
                self.service.frontend_url
            )));
        }

        if let Some(public_url) = &self.service.public_url {
            if url::Url::parse(public_url).is_err() {
                return Err(CardError::Validation(format!(
                    "Public URL is not a valid URL: {}",
                    public_url
                )));
            }
        }

        Ok(())
    }

    /// Host component of the public URL, used as the redirect deny host
    pub fn public_host(&self) -> Option<String> {
        self.service
            .public_url
            .as_ref()
            .and_then(|u| url::Url::parse(u).ok())
            .and_then(|u| u.host_str().map(|h| h.to_ascii_lowercase()))
    }
}

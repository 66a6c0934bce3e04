//! Layered configuration: defaults, `AWS_*` fallbacks, `ferry.toml`, then
//! `FERRY_`-prefixed environment variables. Command-line flags are applied
//! on top by the caller.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use ferry_s3::{Credentials, DEFAULT_REGION, S3Config};
use ferry_transfer::TransferOptions;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "ferry.toml";

const AWS_FALLBACKS: [&str; 4] = ["AWS_ACCESS_KEY_ID", "AWS_SECRET_ACCESS_KEY", "AWS_SESSION_TOKEN", "AWS_REGION"];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FerryConfig {
    pub store:     StoreConfig,
    pub transfer:  TransferOptions,
    /// Default tracing filter; `RUST_LOG` takes precedence.
    pub log_level: String,
}

impl Default for FerryConfig {
    fn default() -> Self {
        Self {
            store:     StoreConfig::default(),
            transfer:  TransferOptions::default(),
            log_level: "warn".to_string(),
        }
    }
}

/// The `[store]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub bucket:            Option<String>,
    pub region:            Option<String>,
    /// Base URL of an S3-compatible service such as MinIO.
    pub endpoint:          Option<String>,
    pub path_style:        bool,
    pub access_key_id:     Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token:     Option<String>,
}

impl FerryConfig {
    /// Build the provider stack. An explicit `path` must exist; otherwise
    /// `ferry.toml` in the working directory is read when present.
    pub fn figment(path: Option<&Path>) -> Figment {
        let file = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
        Figment::new()
            .merge(aws_fallbacks())
            .merge(Toml::file_exact(file))
            .merge(Env::prefixed("FERRY_").split("__"))
    }

    pub fn load(path: Option<&Path>) -> Result<Self, figment::Error> {
        if let Some(path) = path {
            if !path.is_file() {
                return Err(figment::Error::from(format!("config file {} not found", path.display())));
            }
        }
        Self::figment(path).extract()
    }
}

/// Standard AWS variables, mapped into `[store]` below every other source.
fn aws_fallbacks() -> Env {
    Env::raw().only(&AWS_FALLBACKS).map(|key| {
        let mapped = if key == "AWS_ACCESS_KEY_ID" {
            "store.access_key_id"
        } else if key == "AWS_SECRET_ACCESS_KEY" {
            "store.secret_access_key"
        } else if key == "AWS_SESSION_TOKEN" {
            "store.session_token"
        } else if key == "AWS_REGION" {
            "store.region"
        } else {
            key.as_str()
        };
        mapped.into()
    })
}

impl StoreConfig {
    pub fn s3_config(&self) -> Result<S3Config> {
        let bucket = self
            .bucket
            .clone()
            .context("no bucket configured; set [store] bucket, FERRY_STORE__BUCKET or --bucket")?;
        let access_key_id = self
            .access_key_id
            .clone()
            .context("no access key configured; set [store] access_key_id or AWS_ACCESS_KEY_ID")?;
        let secret_access_key = self
            .secret_access_key
            .clone()
            .context("no secret key configured; set [store] secret_access_key or AWS_SECRET_ACCESS_KEY")?;

        let mut credentials = Credentials::new(access_key_id, secret_access_key);
        if let Some(token) = &self.session_token {
            credentials = credentials.with_session_token(token.clone());
        }

        let mut config = S3Config::new(bucket, credentials)
            .region(self.region.as_deref().unwrap_or(DEFAULT_REGION))
            .path_style(self.path_style);
        if let Some(endpoint) = &self.endpoint {
            config = config.endpoint(endpoint.clone());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s3_config_requires_bucket_and_keys() {
        let mut store = StoreConfig::default();
        assert!(store.s3_config().is_err());

        store.bucket = Some("frames".into());
        store.access_key_id = Some("id".into());
        assert!(store.s3_config().is_err());

        store.secret_access_key = Some("secret".into());
        let config = store.s3_config().unwrap();
        assert_eq!(config.bucket, "frames");
        assert_eq!(config.region, DEFAULT_REGION);
        assert!(config.endpoint.is_none());
    }
}

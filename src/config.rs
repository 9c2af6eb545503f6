use anyhow::{Result, anyhow};
use serde::{Serialize, Serializer};

pub const DATABASE_URL_VAR: &str = "DATABASE_URL";
pub const BUCKET_NAME_VAR: &str = "GLOSS_INPUTS_BUCKET_NAME";
pub const REGION_VAR: &str = "AWS_REGION_NAME";
pub const ENDPOINT_URL_VAR: &str = "GLOSS_S3_ENDPOINT_URL";

pub const DEFAULT_BUCKET_NAME: &str = "dev-hub-gloss-inputs-s3";
pub const DEFAULT_REGION: &str = "eu-west-2";

/// Process configuration for a sync run.
///
/// Serializing a config (used for the startup log line) never exposes the
/// credentials embedded in the database URL.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncConfig {
    #[serde(serialize_with = "serialize_redacted_url")]
    pub database_url: String,
    pub bucket_name: String,
    pub region: String,
    pub endpoint_url: Option<String>,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let mut builder = SyncConfigBuilder::new().endpoint_url(get(ENDPOINT_URL_VAR));
        if let Some(url) = get(DATABASE_URL_VAR) {
            builder = builder.database_url(url);
        }
        if let Some(bucket) = get(BUCKET_NAME_VAR) {
            builder = builder.bucket_name(bucket);
        }
        if let Some(region) = get(REGION_VAR) {
            builder = builder.region(region);
        }

        builder.build()
    }

    pub fn redacted_database_url(&self) -> String {
        redact_database_url(&self.database_url)
    }
}

fn serialize_redacted_url<S: Serializer>(url: &str, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&redact_database_url(url))
}

// Helper function to hide the userinfo part of a connection string
pub fn redact_database_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };

    let authority_end = rest.find(['/', '?']).unwrap_or(rest.len());
    let (authority, tail) = rest.split_at(authority_end);

    match authority.rsplit_once('@') {
        Some((_, host)) => format!("{}://****@{}{}", scheme, host, tail),
        None => url.to_string(),
    }
}

pub struct SyncConfigBuilder {
    database_url: Option<String>,
    bucket_name: Option<String>,
    region: Option<String>,
    endpoint_url: Option<String>,
}

impl SyncConfigBuilder {
    pub fn new() -> Self {
        Self {
            database_url: None,
            bucket_name: None,
            region: None,
            endpoint_url: None,
        }
    }

    pub fn database_url<S: Into<String>>(mut self, url: S) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn bucket_name<S: Into<String>>(mut self, bucket: S) -> Self {
        self.bucket_name = Some(bucket.into());
        self
    }

    pub fn region<S: Into<String>>(mut self, region: S) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn endpoint_url(mut self, endpoint_url: Option<String>) -> Self {
        self.endpoint_url = endpoint_url;
        self
    }

    pub fn build(self) -> Result<SyncConfig> {
        let database_url = self.database_url
            .ok_or_else(|| anyhow!("{} is required", DATABASE_URL_VAR))?;

        Ok(SyncConfig {
            database_url,
            bucket_name: self.bucket_name.unwrap_or_else(|| DEFAULT_BUCKET_NAME.to_string()),
            region: self.region.unwrap_or_else(|| DEFAULT_REGION.to_string()),
            endpoint_url: self.endpoint_url,
        })
    }
}

impl Default for SyncConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

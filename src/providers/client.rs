use async_trait::async_trait;

use crate::models::{NormalizedProfile, Platform, Result};

/// Source of profile data for one platform.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileProvider: Send + Sync {
    /// Platform this provider talks to
    fn platform(&self) -> Platform;

    /// Fetch and normalize everything the renderers need for `handle`
    async fn fetch_profile(&self, handle: &str) -> Result<NormalizedProfile>;
}

/// Turns an avatar reference into something embeddable.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AvatarResolver: Send + Sync {
    /// Always yields a data URI; on any failure that is
    /// [`PLACEHOLDER_AVATAR`](crate::providers::avatar::PLACEHOLDER_AVATAR).
    async fn resolve(&self, reference: &str) -> String;
}

/// Configuration for upstream clients
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub credentials: Option<ApiCredentials>,
    pub submission_limit: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiCredentials {
    pub key: String,
    pub secret: String,
}

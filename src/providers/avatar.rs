use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    models::{CardError, Result},
    providers::client::AvatarResolver,
};

/// Neutral silhouette used whenever an avatar cannot be fetched.
pub const PLACEHOLDER_AVATAR: &str = concat!(
    "data:image/svg+xml;base64,",
    "PHN2ZyB4bWxucz0iaHR0cDovL3d3dy53My5vcmcvMjAwMC9zdmciIHdpZHRoPSIxMDAiIGhlaWdo",
    "dD0iMTAwIiB2aWV3Qm94PSIwIDAgMTAwIDEwMCI+PHJlY3Qgd2lkdGg9IjEwMCIgaGVpZ2h0PSIx",
    "MDAiIGZpbGw9IiNEMEQ3REUiLz48Y2lyY2xlIGN4PSI1MCIgY3k9IjM4IiByPSIxOCIgZmlsbD0i",
    "IzhDOTU5RiIvPjxwYXRoIGQ9Ik0xOCA5MmM0LTIwIDE4LTMwIDMyLTMwczI4IDEwIDMyIDMweiIg",
    "ZmlsbD0iIzhDOTU5RiIvPjwvc3ZnPg==",
);

const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";
const MAX_AVATAR_BYTES: usize = 512 * 1024;

/// Fetches remote avatars and inlines them as base64 data URIs so the
/// rendered SVG has no external references.
pub struct HttpAvatarResolver {
    http_client: reqwest::Client,
}

impl HttpAvatarResolver {
    pub fn new(timeout_seconds: u64) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| CardError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }

    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CardError::UpstreamStatus {
                platform: "avatar".to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string())
            .filter(|v| v.starts_with("image/"))
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());

        let bytes = response.bytes().await?;
        if bytes.is_empty() || bytes.len() > MAX_AVATAR_BYTES {
            return Err(CardError::upstream(
                "avatar",
                format!("unexpected avatar size {} bytes", bytes.len()),
            ));
        }

        debug!("Inlined avatar {} ({}, {} bytes)", url, content_type, bytes.len());
        Ok(to_data_uri(&content_type, &bytes))
    }
}

#[async_trait]
impl AvatarResolver for HttpAvatarResolver {
    async fn resolve(&self, reference: &str) -> String {
        let Some(url) = normalize_reference(reference) else {
            return match reference.trim() {
                r if r.starts_with("data:") => r.to_string(),
                _ => PLACEHOLDER_AVATAR.to_string(),
            };
        };

        match self.fetch(&url).await {
            Ok(data_uri) => data_uri,
            Err(e) => {
                warn!("Using placeholder avatar for {}: {}", url, e);
                PLACEHOLDER_AVATAR.to_string()
            }
        }
    }
}

/// Fetchable URL for an avatar reference, or `None` when the reference is
/// already inline or unusable.
fn normalize_reference(reference: &str) -> Option<String> {
    let reference = reference.trim();
    if reference.starts_with("//") {
        Some(format!("https:{}", reference))
    } else if reference.starts_with("http://") || reference.starts_with("https://") {
        Some(reference.to_string())
    } else {
        None
    }
}

pub fn to_data_uri(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, BASE64.encode(bytes))
}

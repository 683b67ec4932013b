use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::{
    config::Settings,
    models::{CacheKey, CacheStats, CardError, NormalizedProfile, Platform, Result, TtlCache},
    providers::{AvatarResolver, CodeforcesClient, HttpAvatarResolver, ProfileProvider, RetryConfig},
    render::{render_card, render_graph, render_heatmap, CardKind, Rendered},
};

const MAX_HANDLE_LEN: usize = 64;

/// Read-through front for the providers: profiles and inlined avatars are
/// cached so repeated card requests do not hit upstream.
pub struct ProfileService {
    providers: HashMap<Platform, Arc<dyn ProfileProvider>>,
    avatars: Arc<dyn AvatarResolver>,
    profile_cache: TtlCache<NormalizedProfile>,
    avatar_cache: TtlCache<String>,
}

impl ProfileService {
    pub fn new(
        providers: Vec<Arc<dyn ProfileProvider>>,
        avatars: Arc<dyn AvatarResolver>,
        profile_ttl: Duration,
        avatar_ttl: Duration,
        max_entries: usize,
    ) -> Self {
        let providers = providers
            .into_iter()
            .map(|provider| (provider.platform(), provider))
            .collect();

        Self {
            providers,
            avatars,
            profile_cache: TtlCache::new(profile_ttl, max_entries),
            avatar_cache: TtlCache::new(avatar_ttl, max_entries),
        }
    }

    /// Wires the live Codeforces client and HTTP avatar resolver.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let retry = RetryConfig::from(&settings.retry);
        let codeforces = CodeforcesClient::new(settings.codeforces_provider(), retry)?;
        let avatars = HttpAvatarResolver::new(settings.codeforces.timeout_seconds)?;

        Ok(Self::new(
            vec![Arc::new(codeforces)],
            Arc::new(avatars),
            Duration::from_secs(settings.cache.profile_ttl_seconds),
            Duration::from_secs(settings.cache.avatar_ttl_seconds),
            settings.cache.max_entries,
        ))
    }

    pub async fn profile(&self, platform: Platform, handle: &str) -> Result<NormalizedProfile> {
        validate_handle(handle)?;

        let key = CacheKey::profile(platform, handle);
        if let Some(profile) = self.profile_cache.get(&key) {
            debug!("Profile cache hit for {}", key);
            return Ok(profile);
        }

        let provider = self.providers.get(&platform).ok_or_else(|| {
            CardError::Config(format!("No provider configured for {}", platform.as_str()))
        })?;

        let profile = provider.fetch_profile(handle).await?;
        profile.validate()?;

        info!("Caching profile {}", key);
        self.profile_cache.insert(key, profile.clone());
        Ok(profile)
    }

    /// Embeddable avatar for `profile`; never fails.
    pub async fn avatar(&self, profile: &NormalizedProfile) -> String {
        let Some(reference) = profile.avatar_ref.as_deref().filter(|r| !r.is_empty()) else {
            return self.avatars.resolve("").await;
        };

        let key = CacheKey::avatar(reference);
        if let Some(data_uri) = self.avatar_cache.get(&key) {
            return data_uri;
        }

        let data_uri = self.avatars.resolve(reference).await;
        self.avatar_cache.insert(key, data_uri.clone());
        data_uri
    }

    /// Fetches (or reuses) the profile and draws the requested card.
    /// Upstream failures are returned as errors; render failures come back
    /// as [`Rendered::Fallback`].
    pub async fn render(
        &self,
        kind: CardKind,
        platform: Platform,
        handle: &str,
        now: DateTime<Utc>,
    ) -> Result<Rendered> {
        let profile = self.profile(platform, handle).await?;
        Ok(self.render_profile(kind, &profile, now).await)
    }

    pub async fn render_profile(
        &self,
        kind: CardKind,
        profile: &NormalizedProfile,
        now: DateTime<Utc>,
    ) -> Rendered {
        match kind {
            CardKind::Profile => {
                let avatar = self.avatar(profile).await;
                render_card(profile, &avatar, now)
            }
            CardKind::Graph => render_graph(profile, now),
            CardKind::Heatmap => render_heatmap(profile, now),
        }
    }

    pub fn cache_stats(&self) -> (CacheStats, CacheStats) {
        (self.profile_cache.stats(), self.avatar_cache.stats())
    }

    pub fn cleanup_expired(&self) {
        self.profile_cache.cleanup_expired();
        self.avatar_cache.cleanup_expired();
    }
}

pub fn validate_handle(handle: &str) -> Result<()> {
    if handle.is_empty() {
        return Err(CardError::MalformedInput("handle is empty".to_string()));
    }
    if handle.len() > MAX_HANDLE_LEN {
        return Err(CardError::MalformedInput(format!(
            "handle is longer than {} characters",
            MAX_HANDLE_LEN
        )));
    }
    if !handle
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
    {
        return Err(CardError::MalformedInput(format!(
            "handle {:?} contains unsupported characters",
            handle
        )));
    }
    Ok(())
}

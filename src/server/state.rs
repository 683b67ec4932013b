use std::sync::Arc;

use crate::{config::Settings, models::Result, service::ProfileService};

pub struct AppState {
    pub service: ProfileService,
    pub cache_max_age_seconds: u64,
}

impl AppState {
    pub fn new(service: ProfileService, cache_max_age_seconds: u64) -> Arc<Self> {
        Arc::new(Self {
            service,
            cache_max_age_seconds,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Arc<Self>> {
        let service = ProfileService::from_settings(settings)?;
        Ok(Self::new(service, settings.server.cache_max_age_seconds))
    }
}

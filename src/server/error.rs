use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::warn;

use crate::{
    models::CardError,
    render::{fallback, CardKind},
};

pub const SVG_CONTENT_TYPE: &str = "image/svg+xml; charset=utf-8";

/// Failure while serving a card. Always answered with a fallback image
/// sized for the requested card so `<img>` embeds never break.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unknown platform {platform}")]
    UnknownPlatform { kind: CardKind, platform: String },

    #[error("{error}")]
    Card { kind: CardKind, error: CardError },
}

impl AppError {
    pub fn card(kind: CardKind, error: CardError) -> Self {
        AppError::Card { kind, error }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::UnknownPlatform { .. } => StatusCode::NOT_FOUND,
            AppError::Card { error, .. } => status_for(error),
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::UnknownPlatform { platform, .. } => format!("Unknown platform {}", platform),
            AppError::Card { error, .. } => error.fallback_message(),
        }
    }

    fn kind(&self) -> CardKind {
        match self {
            AppError::UnknownPlatform { kind, .. } | AppError::Card { kind, .. } => *kind,
        }
    }
}

pub fn status_for(error: &CardError) -> StatusCode {
    match error {
        CardError::HandleNotFound { .. } => StatusCode::NOT_FOUND,
        CardError::MalformedInput(_) => StatusCode::BAD_REQUEST,
        CardError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        CardError::UpstreamData { .. }
        | CardError::UpstreamPayload { .. }
        | CardError::UpstreamStatus { .. }
        | CardError::Http(_) => StatusCode::BAD_GATEWAY,
        CardError::RenderInternal(_) | CardError::Serialization(_) | CardError::Config(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!("Serving fallback {} ({}): {}", self.kind().as_str(), status, self);

        let svg = fallback::render(self.kind(), &self.message());
        (
            status,
            [
                (header::CONTENT_TYPE, SVG_CONTENT_TYPE),
                (header::CACHE_CONTROL, "no-store"),
            ],
            svg,
        )
            .into_response()
    }
}

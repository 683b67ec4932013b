use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::info;

use crate::{
    models::Platform,
    render::{CardKind, Rendered},
};

use super::{
    error::{AppError, SVG_CONTENT_TYPE},
    state::AppState,
};

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn card_handler(
    State(state): State<Arc<AppState>>,
    Path((platform, handle)): Path<(String, String)>,
) -> Response {
    serve_card(&state, CardKind::Profile, &platform, &handle).await
}

pub async fn graph_handler(
    State(state): State<Arc<AppState>>,
    Path((platform, handle)): Path<(String, String)>,
) -> Response {
    serve_card(&state, CardKind::Graph, &platform, &handle).await
}

pub async fn heatmap_handler(
    State(state): State<Arc<AppState>>,
    Path((platform, handle)): Path<(String, String)>,
) -> Response {
    serve_card(&state, CardKind::Heatmap, &platform, &handle).await
}

async fn serve_card(state: &AppState, kind: CardKind, platform: &str, handle: &str) -> Response {
    info!("Rendering {} for {}/{}", kind.as_str(), platform, handle);

    let Some(platform_id) = Platform::from_str(platform) else {
        return AppError::UnknownPlatform {
            kind,
            platform: platform.to_string(),
        }
        .into_response();
    };

    match state.service.render(kind, platform_id, handle, Utc::now()).await {
        Ok(Rendered::Svg(svg)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, SVG_CONTENT_TYPE.to_string()),
                (
                    header::CACHE_CONTROL,
                    format!("public, max-age={}", state.cache_max_age_seconds),
                ),
            ],
            svg,
        )
            .into_response(),
        Ok(Rendered::Fallback { error, .. }) | Err(error) => {
            AppError::card(kind, error).into_response()
        }
    }
}

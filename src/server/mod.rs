use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::get,
    Router,
};
use tokio::{net::TcpListener, signal, task::JoinHandle};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info};

pub mod error;
pub mod routes;
pub mod state;

pub use error::{status_for, AppError};
pub use state::AppState;

use routes::{card_handler, graph_handler, health_handler, heatmap_handler};

const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/health", get(health_handler))
        .route("/:platform/:handle/card.svg", get(card_handler))
        .route("/:platform/:handle/graph.svg", get(graph_handler))
        .route("/:platform/:handle/heatmap.svg", get(heatmap_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Periodically drop expired profiles and avatars so idle handles do not
/// hold memory until the next insert.
pub fn spawn_cache_sweeper(state: Arc<AppState>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            state.service.cleanup_expired();
            let (profiles, avatars) = state.service.cache_stats();
            debug!(
                "Cache sweep: {} profiles, {} avatars cached",
                profiles.entries, avatars.entries
            );
        }
    })
}

/// Serve until Ctrl+C or SIGTERM.
pub async fn serve(state: Arc<AppState>, address: SocketAddr) -> std::io::Result<()> {
    let sweeper = spawn_cache_sweeper(state.clone(), CACHE_SWEEP_INTERVAL);
    let app = router(state);

    info!("Binding to {address}");
    let listener = TcpListener::bind(address).await?;
    info!("Server running on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.abort();
    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{CardError, NormalizedProfile, Platform, RatingChange},
        providers::{
            client::{MockAvatarResolver, MockProfileProvider},
            PLACEHOLDER_AVATAR,
        },
        service::ProfileService,
    };

    fn mock_provider() -> MockProfileProvider {
        let mut provider = MockProfileProvider::new();
        provider.expect_platform().return_const(Platform::Codeforces);
        provider.expect_fetch_profile().returning(|handle| match handle {
            "ghost" => Err(CardError::HandleNotFound {
                platform: "codeforces".to_string(),
                handle: handle.to_string(),
            }),
            "busy" => Err(CardError::RateLimited { platform: "codeforces".to_string() }),
            _ => {
                let mut profile = NormalizedProfile::new(handle);
                profile.current_rating = Some(1650);
                profile.max_rating = Some(1700);
                profile.rank_label = "expert".to_string();
                profile.rating_history = vec![RatingChange {
                    timestamp_seconds: 1_700_000_000,
                    new_rating: 1650,
                    contest_name: "Round 1".to_string(),
                    contest_rank: Some(10),
                }];
                Ok(profile)
            }
        });
        provider
    }

    async fn spawn_app() -> String {
        let provider = mock_provider();
        let mut avatars = MockAvatarResolver::new();
        avatars
            .expect_resolve()
            .returning(|_| PLACEHOLDER_AVATAR.to_string());

        let service = ProfileService::new(
            vec![Arc::new(provider)],
            Arc::new(avatars),
            Duration::from_secs(60),
            Duration::from_secs(60),
            10,
        );
        let app = router(AppState::new(service, 300));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}", address)
    }

    #[tokio::test]
    async fn test_sweeper_drops_expired_profiles() {
        let service = ProfileService::new(
            vec![Arc::new(mock_provider())],
            Arc::new(MockAvatarResolver::new()),
            Duration::from_millis(1),
            Duration::from_millis(1),
            10,
        );
        let state = AppState::new(service, 300);

        state.service.profile(Platform::Codeforces, "tourist").await.unwrap();
        assert_eq!(state.service.cache_stats().0.entries, 1);

        let sweeper = spawn_cache_sweeper(state.clone(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(100)).await;
        sweeper.abort();

        assert_eq!(state.service.cache_stats().0.entries, 0);
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn_app().await;
        let body = reqwest::get(format!("{}/health", base)).await.unwrap().text().await.unwrap();
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_card_endpoints_serve_svg() {
        let base = spawn_app().await;

        for kind in ["card", "graph", "heatmap"] {
            let response = reqwest::get(format!("{}/codeforces/tourist/{}.svg", base, kind))
                .await
                .unwrap();

            assert_eq!(response.status(), reqwest::StatusCode::OK);
            assert_eq!(response.headers()["content-type"], "image/svg+xml; charset=utf-8");
            assert_eq!(response.headers()["cache-control"], "public, max-age=300");
            let body = response.text().await.unwrap();
            assert!(body.contains("<svg"));
            assert!(body.contains("tourist"));
        }
    }

    #[tokio::test]
    async fn test_failures_serve_fallback_with_status() {
        let base = spawn_app().await;

        let cases = [
            ("codeforces/ghost/card.svg", reqwest::StatusCode::NOT_FOUND),
            ("codeforces/busy/graph.svg", reqwest::StatusCode::TOO_MANY_REQUESTS),
            ("topcoder/tourist/heatmap.svg", reqwest::StatusCode::NOT_FOUND),
            ("codeforces/bad%20handle/card.svg", reqwest::StatusCode::BAD_REQUEST),
        ];

        for (path, expected) in cases {
            let response = reqwest::get(format!("{}/{}", base, path)).await.unwrap();
            assert_eq!(response.status(), expected, "{}", path);
            assert_eq!(response.headers()["cache-control"], "no-store");
            let body = response.text().await.unwrap();
            assert!(body.contains("<svg"), "{}", path);
        }
    }
}

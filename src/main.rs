use clap::{Parser, Subcommand};
use cp_cards::{
    config::Settings,
    models::{NormalizedProfile, Platform},
    providers::PLACEHOLDER_AVATAR,
    render::{self, CardKind, Rendered},
    server::{self, AppState},
    service::ProfileService,
};
use chrono::Utc;
use std::{net::SocketAddr, path::PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "cp-cards")]
#[clap(about = "Render competitive programming profiles as SVG cards", long_about = None)]
struct Cli {
    /// Settings file (defaults to config/default + config/local + CP_CARDS__* env)
    #[clap(long, global = true)]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on (overrides server.port)
        #[clap(short, long)]
        port: Option<u16>,
    },

    /// Render a single card to a file or stdout
    Render {
        /// card, graph or heatmap
        #[clap(short, long, default_value = "card")]
        kind: String,

        /// Handle to fetch from the platform
        #[clap(long, conflicts_with = "input", required_unless_present = "input")]
        handle: Option<String>,

        /// Platform to fetch from
        #[clap(long, default_value = "codeforces")]
        platform: String,

        /// Render from a NormalizedProfile JSON file instead of fetching
        #[clap(short, long)]
        input: Option<PathBuf>,

        /// Output file; stdout when omitted
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::new().unwrap_or_else(|e| {
            eprintln!("Using default settings: {}", e);
            Settings::default()
        }),
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.app.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = settings.validate() {
        error!("Invalid settings: {}", e);
        return Err(anyhow::anyhow!(e));
    }

    match cli.command {
        Commands::Serve { port } => {
            let port = port.unwrap_or(settings.server.port);
            let address: SocketAddr = format!("{}:{}", settings.server.host, port).parse()?;

            info!("Starting {} v{}", settings.app.name, settings.app.version);
            let state = AppState::from_settings(&settings)?;
            server::serve(state, address).await?;
        }

        Commands::Render {
            kind,
            handle,
            platform,
            input,
            output,
        } => {
            let kind = CardKind::from_str(&kind).ok_or_else(|| {
                anyhow::anyhow!("Invalid kind: {} (expected card, graph or heatmap)", kind)
            })?;
            let now = Utc::now();

            let rendered = match (input, handle) {
                (Some(path), _) => {
                    let json = std::fs::read_to_string(&path)?;
                    let profile: NormalizedProfile = serde_json::from_str(&json)?;
                    match kind {
                        CardKind::Profile => {
                            let avatar = profile
                                .avatar_ref
                                .as_deref()
                                .filter(|r| r.starts_with("data:"))
                                .unwrap_or(PLACEHOLDER_AVATAR);
                            render::render_card(&profile, avatar, now)
                        }
                        CardKind::Graph => render::render_graph(&profile, now),
                        CardKind::Heatmap => render::render_heatmap(&profile, now),
                    }
                }
                (None, Some(handle)) => {
                    let platform = Platform::from_str(&platform)
                        .ok_or_else(|| anyhow::anyhow!("Unknown platform: {}", platform))?;
                    let service = ProfileService::from_settings(&settings)?;
                    service.render(kind, platform, &handle, now).await?
                }
                (None, None) => {
                    return Err(anyhow::anyhow!("Either --handle or --input is required"))
                }
            };

            if let Rendered::Fallback { error, .. } = &rendered {
                warn!("Rendered fallback image: {}", error);
            }

            match output {
                Some(path) => {
                    std::fs::write(&path, rendered.svg())?;
                    info!("Wrote {} to {}", kind.as_str(), path.display());
                }
                None => println!("{}", rendered.svg()),
            }
        }
    }

    Ok(())
}

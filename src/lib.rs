pub mod models;
pub mod config;
pub mod providers;
pub mod render;
pub mod service;
pub mod server;
pub mod utils;

pub use models::{CardError, NormalizedProfile, Platform, Result};
pub use config::Settings;
pub use render::{render_card, render_graph, render_heatmap, CardKind, Rendered};
pub use service::ProfileService;

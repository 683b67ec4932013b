pub mod svg;
pub mod scale;
pub mod palette;
pub mod card;
pub mod graph;
pub mod heatmap;
pub mod fallback;

pub use card::render_card;
pub use graph::render_graph;
pub use heatmap::render_heatmap;
pub use scale::{map_linear, LinearScale};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{CardError, Result};
use svg::Document;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CardKind {
    Profile,
    Graph,
    Heatmap,
}

impl CardKind {
    /// Nominal canvas size in pixels.
    pub fn size(&self) -> (f64, f64) {
        match self {
            CardKind::Profile => (500.0, 300.0),
            CardKind::Graph => (900.0, 420.0),
            CardKind::Heatmap => (700.0, 250.0),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CardKind::Profile => "card",
            CardKind::Graph => "graph",
            CardKind::Heatmap => "heatmap",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "card" | "profile" => Some(CardKind::Profile),
            "graph" | "rating" => Some(CardKind::Graph),
            "heatmap" | "activity" => Some(CardKind::Heatmap),
            _ => None,
        }
    }
}

/// Outcome of a render call. Both variants carry a complete SVG document;
/// `Fallback` tells the caller to answer with a non-success status.
#[derive(Debug)]
pub enum Rendered {
    Svg(String),
    Fallback { svg: String, error: CardError },
}

impl Rendered {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Rendered::Fallback { .. })
    }

    pub fn svg(&self) -> &str {
        match self {
            Rendered::Svg(svg) | Rendered::Fallback { svg, .. } => svg,
        }
    }

    pub fn into_svg(self) -> String {
        match self {
            Rendered::Svg(svg) | Rendered::Fallback { svg, .. } => svg,
        }
    }
}

/// Renderer boundary: serialize a laid-out scene, or turn any failure into
/// a fallback image of the same size.
pub(crate) fn finish(kind: CardKind, scene: Result<Document>) -> Rendered {
    match scene.and_then(|doc| doc.to_svg()) {
        Ok(svg) => Rendered::Svg(svg),
        Err(error) => {
            warn!("Falling back for {} render: {}", kind.as_str(), error);
            Rendered::Fallback {
                svg: fallback::render(kind, &error.fallback_message()),
                error,
            }
        }
    }
}

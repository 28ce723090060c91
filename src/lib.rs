//! # mapstyle
//!
//! Color classification and style-script generation for GeoJSON layers drawn
//! on an interactive Leaflet map.
//!
//! For each layer, the attribute chosen for coloring is classified
//! (categorical, sequential, diverging or none), its values are normalized
//! into `[0, 1]`, and a style descriptor is built from the layer's options.
//! All layers are then emitted as one JavaScript callback that creates the
//! map, adds the base tiles, draws the layers and fits the view to them.
//!
//! ## Quick Start
//!
//! ```rust
//! use mapstyle::prelude::*;
//! use serde_json::json;
//!
//! let data = json!({
//!     "type": "FeatureCollection",
//!     "features": [
//!         { "type": "Feature", "geometry": { "type": "Point", "coordinates": [4.9, 52.4] },
//!           "properties": { "population": 120 } },
//!         { "type": "Feature", "geometry": { "type": "Point", "coordinates": [4.8, 52.3] },
//!           "properties": { "population": 80 } }
//!     ]
//! });
//!
//! let layer = Layer::new(data).options(StylingOptions::new().color_attribute("population"));
//! let config = MapConfig::new().view(52.37, 4.89, 12);
//!
//! let out = generate(&[layer], &config)?;
//! assert!(out.script.contains("map.fitBounds"));
//! # Ok::<(), mapstyle::Error>(())
//! ```
//!
//! ## Feature Flags
//!
//! - `cli`: the `mapstyle` binary (YAML map document to render script)

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
// Allow unwrap() in tests only - banned in production code
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Core Modules
// ============================================================================

/// Color values and hex conversions.
pub mod color;

/// Scale functions for data-to-visual mappings.
pub mod scale;

/// Feature layers and styling options.
pub mod layer;

// ============================================================================
// Styling Modules
// ============================================================================

/// Color classification of layer attributes.
pub mod classify;

/// Style descriptors and expressions.
pub mod style;

// ============================================================================
// Output Modules
// ============================================================================

/// Output encoders (render script).
pub mod output;

/// Render script generation.
pub mod render;

/// Map configuration and YAML documents.
pub mod config;

// ============================================================================
// Error Types
// ============================================================================

/// Error types for mapstyle operations.
pub mod error;

pub use error::{Error, Result};
pub use render::generate;

// ============================================================================
// Prelude
// ============================================================================

/// Commonly used types and traits for convenient imports.
///
/// ```rust
/// use mapstyle::prelude::*;
/// ```
pub mod prelude {
    pub use crate::classify::{classify, Classification};
    pub use crate::color::Rgba;
    pub use crate::config::{Dimension, MapConfig, MapDocument, TileProvider};
    pub use crate::error::{Error, Result};
    pub use crate::layer::{ColorOption, Layer, StyleValue, StylingOptions};
    pub use crate::render::{generate, RenderScript};
    pub use crate::scale::{ColorScale, LinearScale, Scale, ScaleRef};
    pub use crate::style::{build_style, StyleDescriptor};
}

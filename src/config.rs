//! Map configuration.
//!
//! [`MapConfig`] carries everything the render script needs besides the
//! layers: container id and size, initial view, and the base tile provider.
//! It can be built in code or loaded from YAML; every field has a default.

use std::fmt;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::layer::{Layer, StylingOptions};

/// A container dimension: pixels, or any CSS length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    /// Size in pixels.
    Pixels(u32),
    /// CSS length such as `"100%"` or `"30em"`.
    Css(String),
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Pixels(px) => write!(f, "{px}px"),
            Dimension::Css(css) => f.write_str(css),
        }
    }
}

/// Base tile layer: URL template plus options passed verbatim to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ProviderSetting")]
pub struct TileProvider {
    /// URL template (`{s}`, `{z}`, `{x}`, `{y}` placeholders).
    pub url: String,
    /// Provider options (attribution, maxZoom, subdomains, ...).
    #[serde(default)]
    pub options: IndexMap<String, Value>,
}

const OSM_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

impl TileProvider {
    /// Create a provider with no options.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), options: IndexMap::new() }
    }

    /// Add a provider option.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// OpenStreetMap standard tiles.
    #[must_use]
    pub fn openstreetmap() -> Self {
        Self::new("https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png")
            .option("maxZoom", 19)
            .option("attribution", OSM_ATTRIBUTION)
    }

    /// CARTO light basemap.
    #[must_use]
    pub fn carto_positron() -> Self {
        Self::carto("light_all")
    }

    /// CARTO dark basemap.
    #[must_use]
    pub fn carto_dark_matter() -> Self {
        Self::carto("dark_all")
    }

    fn carto(variant: &str) -> Self {
        Self::new(format!("https://{{s}}.basemaps.cartocdn.com/{variant}/{{z}}/{{x}}/{{y}}{{r}}.png"))
            .option("subdomains", "abcd")
            .option("maxZoom", 20)
            .option(
                "attribution",
                format!("{OSM_ATTRIBUTION} &copy; <a href=\"https://carto.com/attributions\">CARTO</a>"),
            )
    }

    /// Esri satellite imagery.
    #[must_use]
    pub fn esri_world_imagery() -> Self {
        Self::new(
            "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
        )
        .option("attribution", "Tiles &copy; Esri")
    }

    /// OpenTopoMap topographic tiles.
    #[must_use]
    pub fn opentopomap() -> Self {
        Self::new("https://{s}.tile.opentopomap.org/{z}/{x}/{y}.png")
            .option("maxZoom", 17)
            .option(
                "attribution",
                format!("{OSM_ATTRIBUTION}, <a href=\"https://opentopomap.org\">OpenTopoMap</a>"),
            )
    }

    /// Look up a preset by name (case-insensitive).
    #[must_use]
    pub fn named(name: &str) -> Option<Self> {
        let provider = match name.to_ascii_lowercase().as_str() {
            "openstreetmap" | "osm" => Self::openstreetmap(),
            "cartodb-positron" | "positron" => Self::carto_positron(),
            "cartodb-darkmatter" | "darkmatter" => Self::carto_dark_matter(),
            "esri-worldimagery" => Self::esri_world_imagery(),
            "opentopomap" => Self::opentopomap(),
            _ => return None,
        };
        Some(provider)
    }
}

impl Default for TileProvider {
    fn default() -> Self {
        Self::openstreetmap()
    }
}

/// YAML form of a provider: a preset name or an explicit URL and options.
#[derive(Deserialize)]
#[serde(untagged)]
enum ProviderSetting {
    Named(String),
    Custom {
        url: String,
        #[serde(default)]
        options: IndexMap<String, Value>,
    },
}

impl TryFrom<ProviderSetting> for TileProvider {
    type Error = String;

    fn try_from(setting: ProviderSetting) -> std::result::Result<Self, String> {
        match setting {
            ProviderSetting::Named(name) => {
                TileProvider::named(&name).ok_or_else(|| format!("unknown tile provider '{name}'"))
            }
            ProviderSetting::Custom { url, options } => Ok(TileProvider { url, options }),
        }
    }
}

/// Map container and initial view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Id of the host container element.
    #[serde(default = "default_id")]
    pub id: String,
    /// Container width.
    #[serde(default = "default_width")]
    pub width: Dimension,
    /// Container height.
    #[serde(default = "default_height")]
    pub height: Dimension,
    /// Initial center as `[lat, lon]`.
    #[serde(default)]
    pub center: [f64; 2],
    /// Initial zoom level.
    #[serde(default = "default_zoom")]
    pub zoom: u8,
    /// Base tile layer.
    #[serde(default)]
    pub provider: TileProvider,
}

fn default_id() -> String {
    "map".to_string()
}
fn default_width() -> Dimension {
    Dimension::Css("100%".to_string())
}
fn default_height() -> Dimension {
    Dimension::Pixels(400)
}
fn default_zoom() -> u8 {
    11
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            id: default_id(),
            width: default_width(),
            height: default_height(),
            center: [0.0, 0.0],
            zoom: default_zoom(),
            provider: TileProvider::default(),
        }
    }
}

impl MapConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the container id.
    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the container size.
    #[must_use]
    pub fn size(mut self, width: Dimension, height: Dimension) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the initial view.
    #[must_use]
    pub fn view(mut self, lat: f64, lon: f64, zoom: u8) -> Self {
        self.center = [lat, lon];
        self.zoom = zoom;
        self
    }

    /// Set the base tile provider.
    #[must_use]
    pub fn provider(mut self, provider: TileProvider) -> Self {
        self.provider = provider;
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        parse_yaml(&read_config(path.as_ref())?)
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error with line number if parsing fails.
    pub fn parse(yaml: &str) -> Result<Self> {
        parse_yaml(yaml)
    }

    /// Loads configuration with fallback to defaults.
    #[must_use]
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_default()
    }
}

/// One layer entry of a [`MapDocument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerEntry {
    /// GeoJSON file, relative to the document.
    pub path: PathBuf,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Styling options.
    #[serde(flatten)]
    pub options: StylingOptions,
}

/// A YAML map document: optional map settings plus layer files.
///
/// ```yaml
/// map:
///   center: [52.37, 4.89]
///   zoom: 12
///   provider: cartodb-positron
/// layers:
///   - path: districts.geojson
///     color: { attribute: population }
///     color_map: viridis
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDocument {
    /// Map settings; `None` lets the caller supply its own defaults.
    #[serde(default)]
    pub map: Option<MapConfig>,
    /// Layers in drawing order.
    #[serde(default)]
    pub layers: Vec<LayerEntry>,
}

impl MapDocument {
    /// Loads a document from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        parse_yaml(&read_config(path.as_ref())?)
    }

    /// Parses a document from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error with line number if parsing fails.
    pub fn parse(yaml: &str) -> Result<Self> {
        parse_yaml(yaml)
    }

    /// Read every layer file, resolving relative paths against `base_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if a file cannot be read or is not JSON.
    pub fn load_layers(&self, base_dir: &Path) -> Result<Vec<Layer>> {
        self.layers
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let path = base_dir.join(&entry.path);
                let text = std::fs::read_to_string(&path).map_err(|e| Error::Io(e).in_layer(index))?;
                let mut layer = Layer::from_geojson_str(&text)
                    .map_err(|e| e.in_layer(index))?
                    .options(entry.options.clone());
                layer.name = entry.name.clone();
                Ok(layer)
            })
            .collect()
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|_| Error::ConfigNotFound(path.display().to_string()))
}

fn parse_yaml<T: serde::de::DeserializeOwned>(yaml: &str) -> Result<T> {
    serde_yaml_ng::from_str(yaml).map_err(|e| {
        let line = e.location().map(|l| l.line()).unwrap_or(0);
        Error::ConfigParse {
            line,
            message: e.to_string(),
        }
    })
}

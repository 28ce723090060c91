//! Feature layers and their styling options.
//!
//! A [`Layer`] pairs a raw GeoJSON payload with [`StylingOptions`]. The
//! payload stays untyped until [`LayerData::from_value`] validates it, so a
//! malformed layer is reported at generation time with its position.

use geojson::{Feature, FeatureCollection, GeoJson};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// A literal style value, emitted verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// A numeric literal.
    Number(f64),
    /// A string literal (quoted on emission).
    Text(String),
}

/// Reference to a feature attribute, read per feature at render time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeRef {
    /// Property name on each feature.
    pub attribute: String,
}

impl AttributeRef {
    /// Reference the named attribute.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { attribute: name.into() }
    }
}

/// A style option value: either a literal or an attribute read.
///
/// In YAML documents a literal is written as-is (`marker_size: 4`) and an
/// attribute as a map (`marker_size: { attribute: population }`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StyleValue {
    /// Read the value from each feature.
    Attribute(AttributeRef),
    /// Same value for every feature.
    Literal(Literal),
}

impl StyleValue {
    /// Attribute-driven value.
    #[must_use]
    pub fn attribute(name: impl Into<String>) -> Self {
        StyleValue::Attribute(AttributeRef::new(name))
    }

    /// Attribute name when this value reads from features.
    #[must_use]
    pub fn as_attribute(&self) -> Option<&str> {
        match self {
            StyleValue::Attribute(r) => Some(&r.attribute),
            StyleValue::Literal(_) => None,
        }
    }
}

impl From<f64> for StyleValue {
    fn from(v: f64) -> Self {
        StyleValue::Literal(Literal::Number(v))
    }
}

impl From<&str> for StyleValue {
    fn from(s: &str) -> Self {
        StyleValue::Literal(Literal::Text(s.to_string()))
    }
}

impl From<String> for StyleValue {
    fn from(s: String) -> Self {
        StyleValue::Literal(Literal::Text(s))
    }
}

/// How a layer chooses its fill color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColorOption {
    /// Color features by the distribution of an attribute.
    Attribute(AttributeRef),
    /// One CSS color for every feature, passed through verbatim.
    Constant(String),
}

impl ColorOption {
    /// Attribute name when the color is data-driven.
    #[must_use]
    pub fn as_attribute(&self) -> Option<&str> {
        match self {
            ColorOption::Attribute(r) => Some(&r.attribute),
            ColorOption::Constant(_) => None,
        }
    }
}

/// Styling options for one layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StylingOptions {
    /// Circle marker radius for point features.
    #[serde(default = "default_marker_size")]
    pub marker_size: StyleValue,
    /// Stroke width.
    #[serde(default = "default_border_width")]
    pub border_width: StyleValue,
    /// Stroke opacity.
    #[serde(default = "default_opacity")]
    pub opacity: StyleValue,
    /// Fill opacity.
    #[serde(default = "default_opacity")]
    pub fill_opacity: StyleValue,
    /// Fill color choice.
    #[serde(default)]
    pub color: Option<ColorOption>,
    /// Named color scale the renderer applies to normalized attribute values.
    #[serde(default)]
    pub color_map: Option<String>,
    /// Explicit stroke color; falls back to a constant `color` when unset.
    #[serde(default)]
    pub stroke_color: Option<StyleValue>,
}

fn default_marker_size() -> StyleValue {
    StyleValue::from(3.0)
}
fn default_border_width() -> StyleValue {
    StyleValue::from(2.0)
}
fn default_opacity() -> StyleValue {
    StyleValue::from(0.5)
}

impl Default for StylingOptions {
    fn default() -> Self {
        Self {
            marker_size: default_marker_size(),
            border_width: default_border_width(),
            opacity: default_opacity(),
            fill_opacity: default_opacity(),
            color: None,
            color_map: None,
            stroke_color: None,
        }
    }
}

impl StylingOptions {
    /// Create options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the marker radius.
    #[must_use]
    pub fn marker_size(mut self, value: impl Into<StyleValue>) -> Self {
        self.marker_size = value.into();
        self
    }

    /// Set the stroke width.
    #[must_use]
    pub fn border_width(mut self, value: impl Into<StyleValue>) -> Self {
        self.border_width = value.into();
        self
    }

    /// Set the stroke opacity.
    #[must_use]
    pub fn opacity(mut self, value: impl Into<StyleValue>) -> Self {
        self.opacity = value.into();
        self
    }

    /// Set the fill opacity.
    #[must_use]
    pub fn fill_opacity(mut self, value: impl Into<StyleValue>) -> Self {
        self.fill_opacity = value.into();
        self
    }

    /// Color every feature with one CSS color.
    #[must_use]
    pub fn color_constant(mut self, color: impl Into<String>) -> Self {
        self.color = Some(ColorOption::Constant(color.into()));
        self
    }

    /// Color features by an attribute.
    #[must_use]
    pub fn color_attribute(mut self, name: impl Into<String>) -> Self {
        self.color = Some(ColorOption::Attribute(AttributeRef::new(name)));
        self
    }

    /// Use a named color scale instead of the default for the classification.
    #[must_use]
    pub fn color_map(mut self, name: impl Into<String>) -> Self {
        self.color_map = Some(name.into());
        self
    }

    /// Set the stroke color.
    #[must_use]
    pub fn stroke_color(mut self, value: impl Into<StyleValue>) -> Self {
        self.stroke_color = Some(value.into());
        self
    }

    /// Attribute driving the fill color, if any.
    #[must_use]
    pub fn color_attribute_name(&self) -> Option<&str> {
        self.color.as_ref().and_then(ColorOption::as_attribute)
    }

    /// Check the color options are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConflictingColorOptions`] for a constant color with a
    /// color map, and [`Error::ColorMapWithoutAttribute`] for a color map with
    /// no color at all.
    pub fn validate(&self) -> Result<()> {
        match (&self.color, &self.color_map) {
            (Some(ColorOption::Constant(_)), Some(_)) => Err(Error::ConflictingColorOptions),
            (None, Some(_)) => Err(Error::ColorMapWithoutAttribute),
            _ => Ok(()),
        }
    }
}

/// A GeoJSON payload plus its styling options.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Optional display name, carried into the generated script as a comment.
    pub name: Option<String>,
    /// Raw GeoJSON value; validated during generation.
    pub data: Value,
    /// Styling options.
    pub options: StylingOptions,
}

impl Layer {
    /// Create a layer from a raw JSON value with default options.
    #[must_use]
    pub fn new(data: impl Into<Value>) -> Self {
        Self {
            name: None,
            data: data.into(),
            options: StylingOptions::default(),
        }
    }

    /// Create a layer from GeoJSON text.
    ///
    /// Only JSON syntax is checked here; the GeoJSON structure is checked
    /// when the render script is generated.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON.
    pub fn from_geojson_str(text: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str::<Value>(text)?))
    }

    /// Create a layer from a typed GeoJSON object.
    ///
    /// # Errors
    ///
    /// Returns an error if the object cannot be serialized.
    pub fn from_geojson(geojson: &GeoJson) -> Result<Self> {
        Ok(Self::new(serde_json::to_value(geojson)?))
    }

    /// Set the display name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the styling options.
    #[must_use]
    pub fn options(mut self, options: StylingOptions) -> Self {
        self.options = options;
        self
    }
}

/// A validated layer payload, always held as a feature collection.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerData {
    collection: FeatureCollection,
}

impl LayerData {
    /// Validate a raw payload.
    ///
    /// A bare Feature or Geometry is promoted to a one-feature collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLayerData`] if the value is not GeoJSON.
    pub fn from_value(value: &Value) -> Result<Self> {
        let geojson = GeoJson::from_json_value(value.clone())
            .map_err(|e| Error::InvalidLayerData(e.to_string()))?;

        let collection = match geojson {
            GeoJson::FeatureCollection(collection) => collection,
            GeoJson::Feature(feature) => single(feature),
            GeoJson::Geometry(geometry) => single(Feature {
                bbox: None,
                geometry: Some(geometry),
                id: None,
                properties: None,
                foreign_members: None,
            }),
        };

        Ok(Self { collection })
    }

    /// Features in payload order.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.collection.features
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.collection.features.len()
    }

    /// True when the collection has no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collection.features.is_empty()
    }

    /// True when some feature has at least one position, so the layer has bounds.
    #[must_use]
    pub fn has_geometry(&self) -> bool {
        self.collection
            .features
            .iter()
            .filter_map(|f| f.geometry.as_ref())
            .any(|g| has_positions(&g.value))
    }

    /// Serialize the collection as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.collection)?)
    }
}

fn has_positions(value: &geojson::Value) -> bool {
    use geojson::Value as Geometry;
    match value {
        Geometry::Point(_) => true,
        Geometry::MultiPoint(points) | Geometry::LineString(points) => !points.is_empty(),
        Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => lines.iter().any(|l| !l.is_empty()),
        Geometry::MultiPolygon(polygons) => polygons.iter().flatten().any(|ring| !ring.is_empty()),
        Geometry::GeometryCollection(geometries) => geometries.iter().any(|g| has_positions(&g.value)),
    }
}

fn single(feature: Feature) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: vec![feature],
        foreign_members: None,
    }
}

/// Present value of a feature attribute. JSON `null` counts as absent.
#[must_use]
pub fn attribute_value<'a>(feature: &'a Feature, name: &str) -> Option<&'a Value> {
    feature
        .properties
        .as_ref()
        .and_then(|props| props.get(name))
        .filter(|v| !v.is_null())
}

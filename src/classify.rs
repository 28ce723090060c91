//! Color classification of a layer attribute.
//!
//! Inspects the values of the attribute that drives a layer's fill color and
//! decides how they map onto a color scale:
//!
//! - **Categorical**: the first present value is not a number. Distinct values
//!   are ranked by first appearance and normalized to `rank / (count - 1)`.
//! - **Diverging**: numbers spanning both signs. The extent is symmetrized to
//!   `[-m, m]` so zero lands on the scale midpoint.
//! - **Sequential**: all other numbers, normalized over `[min, max]`.
//! - **None**: no attribute, or no feature carries a usable value.
//!
//! Two inputs have no natural normalization and get fixed values instead:
//! a single category normalizes to [`SINGLE_CATEGORY_VALUE`] and a constant
//! numeric attribute to [`CONSTANT_RANGE_VALUE`].

use geojson::Feature;
use indexmap::IndexMap;
use log::{debug, warn};
use serde_json::Value;

use crate::color::Rgba;
use crate::layer::{attribute_value, ColorOption};
use crate::scale::{LinearScale, Scale, ScaleRef};

/// Normalized value of the only category of a single-category attribute.
pub const SINGLE_CATEGORY_VALUE: f64 = 0.0;

/// Normalized value of every feature when a numeric attribute has zero range.
pub const CONSTANT_RANGE_VALUE: f64 = 0.5;

/// Numeric extent of an attribute.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
    /// `max - min`.
    pub range: f64,
}

impl Extent {
    /// Extent of finite values, or `None` if there are none.
    #[must_use]
    pub fn of(values: impl IntoIterator<Item = f64>) -> Option<Self> {
        let (min, max) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })?;
        Some(Self { min, max, range: max - min })
    }

    /// Widen to `[-m, m]` where `m = max(|min|, |max|)`.
    #[must_use]
    pub fn symmetric(self) -> Self {
        let abs_max = self.min.abs().max(self.max.abs());
        Self { min: -abs_max, max: abs_max, range: 2.0 * abs_max }
    }

    /// Map a value into `[0, 1]`; zero-range extents map to [`CONSTANT_RANGE_VALUE`].
    #[must_use]
    pub fn normalize(&self, value: f64) -> f64 {
        match LinearScale::unit((self.min, self.max)) {
            Ok(scale) => scale.scale(value),
            Err(_) => CONSTANT_RANGE_VALUE,
        }
    }
}

/// Distinct category values ranked by first appearance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Categories {
    ranks: IndexMap<String, usize>,
}

impl Categories {
    /// Rank distinct keys in encounter order.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ranks = IndexMap::new();
        for key in keys {
            let next = ranks.len();
            ranks.entry(key.into()).or_insert(next);
        }
        Self { ranks }
    }

    /// Number of distinct categories.
    #[must_use]
    pub fn count(&self) -> usize {
        self.ranks.len()
    }

    /// Rank of a category key.
    #[must_use]
    pub fn rank(&self, key: &str) -> Option<usize> {
        self.ranks.get(key).copied()
    }

    /// Normalized value of a rank: `rank / (count - 1)`.
    #[must_use]
    pub fn normalize_rank(&self, rank: usize) -> f64 {
        if self.count() <= 1 {
            SINGLE_CATEGORY_VALUE
        } else {
            rank as f64 / (self.count() - 1) as f64
        }
    }

    /// `(key, normalized value)` pairs in rank order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.ranks.iter().map(|(key, &rank)| (key.as_str(), self.normalize_rank(rank)))
    }
}

/// Shape of a color-driving attribute across a layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// No data-driven color.
    None,
    /// Qualitative values.
    Categorical(Categories),
    /// Single-signed numbers.
    Sequential(Extent),
    /// Numbers spanning zero; the extent is symmetric.
    Diverging(Extent),
}

impl Classification {
    /// Normalize a raw attribute value into `[0, 1]`.
    ///
    /// Returns `None` for values this classification cannot place: unknown
    /// categories, non-numeric values on a numeric attribute, and everything
    /// under [`Classification::None`].
    #[must_use]
    pub fn normalize(&self, value: &Value) -> Option<f64> {
        match self {
            Classification::None => None,
            Classification::Categorical(categories) => {
                let rank = categories.rank(&category_key(value)?)?;
                Some(categories.normalize_rank(rank))
            }
            Classification::Sequential(extent) | Classification::Diverging(extent) => {
                let v = value.as_f64().filter(|v| v.is_finite())?;
                Some(extent.normalize(v))
            }
        }
    }

    /// Default color scale for this classification.
    #[must_use]
    pub fn default_scale(&self) -> Option<ScaleRef> {
        match self {
            Classification::None => None,
            Classification::Categorical(c) => Some(ScaleRef::Categorical { count: c.count() }),
            Classification::Sequential(_) => Some(ScaleRef::Sequential),
            Classification::Diverging(_) => Some(ScaleRef::Diverging),
        }
    }

    /// Short label for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Classification::None => "none",
            Classification::Categorical(_) => "categorical",
            Classification::Sequential(_) => "sequential",
            Classification::Diverging(_) => "diverging",
        }
    }

    /// Legend stops for this classification drawn with `scale`.
    ///
    /// Numeric classifications produce min, midpoint and max stops;
    /// categorical ones produce one stop per category.
    #[must_use]
    pub fn legend(&self, scale: &ScaleRef) -> Vec<LegendStop> {
        let stop = |label: String, value: f64| LegendStop { label, value, color: scale.color_at(value) };
        match self {
            Classification::None => Vec::new(),
            Classification::Categorical(categories) => {
                categories.iter().map(|(key, t)| stop(key.to_string(), t)).collect()
            }
            Classification::Sequential(e) | Classification::Diverging(e) => vec![
                stop(format_stop(e.min), 0.0),
                stop(format_stop(e.min + e.range / 2.0), 0.5),
                stop(format_stop(e.max), 1.0),
            ],
        }
    }
}

/// One legend entry.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendStop {
    /// Category name or formatted number.
    pub label: String,
    /// Normalized position in `[0, 1]`.
    pub value: f64,
    /// Color at `value`, when the scale is known on the Rust side.
    pub color: Option<Rgba>,
}

fn format_stop(v: f64) -> String {
    let rounded = (v * 1000.0).round() / 1000.0;
    format!("{rounded}")
}

/// Classify the color option of a layer over its features.
#[must_use]
pub fn classify(features: &[Feature], color: Option<&ColorOption>) -> Classification {
    match color.and_then(ColorOption::as_attribute) {
        Some(attribute) => classify_attribute(features, attribute),
        None => Classification::None,
    }
}

/// Classify the values of `attribute` across `features`.
#[must_use]
pub fn classify_attribute(features: &[Feature], attribute: &str) -> Classification {
    let values: Vec<&Value> = features.iter().filter_map(|f| attribute_value(f, attribute)).collect();

    let missing = features.len() - values.len();
    if missing > 0 && !values.is_empty() {
        warn!("{missing} of {} features have no '{attribute}' value", features.len());
    }

    let Some(first) = values.first() else {
        debug!("no feature carries '{attribute}', color classification disabled");
        return Classification::None;
    };

    let classification = if first.is_number() {
        classify_numeric(&values, attribute)
    } else {
        let categories = Categories::from_keys(values.iter().filter_map(|v| category_key(v)));
        if categories.count() == 1 {
            warn!("'{attribute}' has a single category, normalizing to {SINGLE_CATEGORY_VALUE}");
        }
        Classification::Categorical(categories)
    };

    debug!("'{attribute}' classified as {}", classification.kind());
    classification
}

fn classify_numeric(values: &[&Value], attribute: &str) -> Classification {
    let Some(extent) = Extent::of(values.iter().filter_map(|v| v.as_f64())) else {
        return Classification::None;
    };

    if extent.max > 0.0 && extent.min < 0.0 {
        return Classification::Diverging(extent.symmetric());
    }

    if extent.range == 0.0 {
        warn!("'{attribute}' is constant ({}), normalizing to {CONSTANT_RANGE_VALUE}", extent.min);
    }
    Classification::Sequential(extent)
}

/// Lookup key of a category value, matching JavaScript's `String(value)`
/// for scalars and `JSON.stringify(value)` for arrays and objects.
#[must_use]
pub fn category_key(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.as_f64().map_or_else(|| n.to_string(), number_to_string)),
        Value::Array(_) | Value::Object(_) => {
            let mut out = String::new();
            stringify(value, &mut out);
            Some(out)
        }
    }
}

/// Format a number the way JavaScript's `Number.prototype.toString` does.
///
/// Magnitudes in `[1e-6, 1e21)` are written in plain decimal notation, others
/// in exponent form with an explicit sign (`1e+21`, `1.5e-7`).
#[must_use]
pub fn number_to_string(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if f == 0.0 {
        return "0".to_string();
    }
    if (1e-6..1e21).contains(&f.abs()) {
        return format!("{f}");
    }
    let text = format!("{f:e}");
    match text.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => format!("{mantissa}e+{exponent}"),
        _ => text,
    }
}

// JSON.stringify for already valid JSON: compact, numbers in script form.
fn stringify(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.as_f64().map_or_else(|| n.to_string(), number_to_string)),
        Value::String(s) => out.push_str(&quote(s)),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                stringify(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&quote(key));
                out.push(':');
                stringify(item, out);
            }
            out.push('}');
        }
    }
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

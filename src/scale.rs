//! Scale functions for data-to-visual mappings.
//!
//! Attribute values are first normalized into `[0, 1]` by a [`LinearScale`],
//! then looked up in a [`ColorScale`]. [`ScaleRef`] names which color scale a
//! style rule uses: one of the three defaults or a user-supplied named scale
//! that the map renderer resolves.

use crate::color::Rgba;
use crate::error::{Error, Result};

/// Trait for scale functions that map domain values to range values.
pub trait Scale<D, R> {
    /// Transform a domain value to a range value.
    fn scale(&self, value: D) -> R;

    /// Get the domain extent.
    fn domain(&self) -> (D, D);

    /// Get the range extent.
    fn range(&self) -> (R, R);
}

/// Linear scale for continuous-to-continuous mapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    domain_min: f64,
    domain_max: f64,
    range_min: f64,
    range_max: f64,
}

impl LinearScale {
    /// Create a new linear scale.
    ///
    /// # Errors
    ///
    /// Returns an error if domain_min equals domain_max or either bound is not finite.
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Result<Self> {
        if !domain.0.is_finite() || !domain.1.is_finite() {
            return Err(Error::ScaleDomain("Domain bounds must be finite".to_string()));
        }
        if domain.0 == domain.1 {
            return Err(Error::ScaleDomain("Domain min and max cannot be equal".to_string()));
        }

        Ok(Self {
            domain_min: domain.0,
            domain_max: domain.1,
            range_min: range.0,
            range_max: range.1,
        })
    }

    /// Create a scale onto `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns an error if domain_min equals domain_max.
    pub fn unit(domain: (f64, f64)) -> Result<Self> {
        Self::new(domain, (0.0, 1.0))
    }
}

impl Scale<f64, f64> for LinearScale {
    fn scale(&self, value: f64) -> f64 {
        let t = (value - self.domain_min) / (self.domain_max - self.domain_min);
        self.range_min + t * (self.range_max - self.range_min)
    }

    fn domain(&self) -> (f64, f64) {
        (self.domain_min, self.domain_max)
    }

    fn range(&self) -> (f64, f64) {
        (self.range_min, self.range_max)
    }
}

/// Color scale over the unit domain `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorScale {
    colors: Vec<Rgba>,
}

/// Parse a compile-time palette. Every entry is a valid `#rrggbb` literal.
fn palette(hex: &[&str]) -> ColorScale {
    ColorScale {
        colors: hex.iter().filter_map(|h| Rgba::from_hex(h).ok()).collect(),
    }
}

impl ColorScale {
    /// Create a new color scale.
    ///
    /// # Errors
    ///
    /// Returns an error if colors is empty.
    pub fn new(colors: Vec<Rgba>) -> Result<Self> {
        if colors.is_empty() {
            return Err(Error::ScaleDomain("Color scale requires at least one color".to_string()));
        }

        Ok(Self { colors })
    }

    /// The palette stops, in order.
    #[must_use]
    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }

    /// Yellow-green-blue sequential scale (ColorBrewer YlGnBu, light to dark).
    #[must_use]
    pub fn yellow_green_blue() -> Self {
        palette(&[
            "#ffffd9", "#edf8b1", "#c7e9b4", "#7fcdbb", "#41b6c4", "#1d91c0", "#225ea8",
            "#253494", "#081d58",
        ])
    }

    /// Red-yellow-blue diverging scale (ColorBrewer RdYlBu), neutral at 0.5.
    #[must_use]
    pub fn red_yellow_blue() -> Self {
        palette(&[
            "#a50026", "#d73027", "#f46d43", "#fdae61", "#fee090", "#ffffbf", "#e0f3f8",
            "#abd9e9", "#74add1", "#4575b4", "#313695",
        ])
    }

    /// Ten-color qualitative palette.
    #[must_use]
    pub fn category10() -> Self {
        palette(&[
            "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2",
            "#7f7f7f", "#bcbd22", "#17becf",
        ])
    }

    /// Create a viridis color scale (perceptually uniform).
    #[must_use]
    pub fn viridis() -> Self {
        Self {
            colors: vec![
                Rgba::rgb(68, 1, 84),
                Rgba::rgb(59, 82, 139),
                Rgba::rgb(33, 145, 140),
                Rgba::rgb(94, 201, 98),
                Rgba::rgb(253, 231, 37),
            ],
        }
    }

    /// Create a magma color scale (sequential, perceptually uniform).
    #[must_use]
    pub fn magma() -> Self {
        Self {
            colors: vec![
                Rgba::rgb(0, 0, 4),
                Rgba::rgb(81, 18, 124),
                Rgba::rgb(183, 55, 121),
                Rgba::rgb(252, 137, 97),
                Rgba::rgb(252, 253, 191),
            ],
        }
    }

    /// Create a sequential blue scale.
    #[must_use]
    pub fn blues() -> Self {
        Self {
            colors: vec![
                Rgba::rgb(247, 251, 255),
                Rgba::rgb(198, 219, 239),
                Rgba::rgb(107, 174, 214),
                Rgba::rgb(33, 113, 181),
                Rgba::rgb(8, 48, 107),
            ],
        }
    }

    /// Create a diverging red-blue scale.
    #[must_use]
    pub fn red_blue() -> Self {
        Self {
            colors: vec![
                Rgba::rgb(178, 24, 43),
                Rgba::rgb(239, 138, 98),
                Rgba::rgb(247, 247, 247),
                Rgba::rgb(103, 169, 207),
                Rgba::rgb(33, 102, 172),
            ],
        }
    }

    /// Create a greyscale color scale.
    #[must_use]
    pub fn greys() -> Self {
        Self { colors: vec![Rgba::WHITE, Rgba::BLACK] }
    }

    /// Look up a palette by the name the map renderer knows it under.
    ///
    /// Matching ignores ASCII case. Unknown names return `None`; the renderer
    /// may still resolve them, but Rust-side evaluation cannot.
    #[must_use]
    pub fn named(name: &str) -> Option<Self> {
        let scale = match name.to_ascii_lowercase().as_str() {
            "ylgnbu" => Self::yellow_green_blue(),
            "rdylbu" => Self::red_yellow_blue(),
            "category10" => Self::category10(),
            "viridis" => Self::viridis(),
            "magma" => Self::magma(),
            "blues" => Self::blues(),
            "rdbu" => Self::red_blue(),
            "greys" => Self::greys(),
            _ => return None,
        };
        Some(scale)
    }

    /// Pick a palette entry by rank, wrapping when the rank exceeds the palette.
    #[must_use]
    pub fn pick(&self, index: usize) -> Rgba {
        self.colors[index % self.colors.len()]
    }
}

impl Scale<f64, Rgba> for ColorScale {
    fn scale(&self, value: f64) -> Rgba {
        let t = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };

        if self.colors.len() == 1 {
            return self.colors[0];
        }

        let segment_count = self.colors.len() - 1;
        let segment = (t * segment_count as f64).floor() as usize;
        let segment = segment.min(segment_count - 1);

        let local_t = t * segment_count as f64 - segment as f64;

        self.colors[segment].lerp(self.colors[segment + 1], local_t)
    }

    fn domain(&self) -> (f64, f64) {
        (0.0, 1.0)
    }

    fn range(&self) -> (Rgba, Rgba) {
        (*self.colors.first().unwrap_or(&Rgba::BLACK), *self.colors.last().unwrap_or(&Rgba::WHITE))
    }
}

/// Which color scale a fill rule looks normalized values up in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScaleRef {
    /// Scale named by the caller; passed verbatim to the renderer.
    Named(String),
    /// Default sequential scale ([`ColorScale::yellow_green_blue`]).
    Sequential,
    /// Default diverging scale ([`ColorScale::red_yellow_blue`]).
    Diverging,
    /// Default qualitative palette ([`ColorScale::category10`]) indexed by
    /// category rank among `count` categories.
    Categorical {
        /// Number of distinct categories.
        count: usize,
    },
}

impl ScaleRef {
    /// Palette backing this reference, if it is known on the Rust side.
    #[must_use]
    pub fn palette(&self) -> Option<ColorScale> {
        match self {
            ScaleRef::Named(name) => ColorScale::named(name),
            ScaleRef::Sequential => Some(ColorScale::yellow_green_blue()),
            ScaleRef::Diverging => Some(ColorScale::red_yellow_blue()),
            ScaleRef::Categorical { .. } => Some(ColorScale::category10()),
        }
    }

    /// Color for a normalized value.
    ///
    /// Categorical scales convert the value back to its rank and pick a
    /// discrete palette entry; the others interpolate.
    #[must_use]
    pub fn color_at(&self, t: f64) -> Option<Rgba> {
        let palette = self.palette()?;
        match self {
            ScaleRef::Categorical { count } => Some(palette.pick(category_rank(t, *count))),
            _ => Some(palette.scale(t)),
        }
    }
}

/// Recover a category rank from its normalized value `rank / (count - 1)`.
#[must_use]
pub fn category_rank(t: f64, count: usize) -> usize {
    if count <= 1 || !t.is_finite() {
        return 0;
    }
    (t.clamp(0.0, 1.0) * (count - 1) as f64).round() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_scale() {
        let scale = LinearScale::new((0.0, 100.0), (0.0, 1.0)).expect("operation should succeed");
        assert_relative_eq!(scale.scale(0.0), 0.0);
        assert_relative_eq!(scale.scale(50.0), 0.5);
        assert_relative_eq!(scale.scale(100.0), 1.0);
    }

    #[test]
    fn test_linear_scale_equal_domain_error() {
        assert!(LinearScale::new((5.0, 5.0), (0.0, 1.0)).is_err());
        assert!(LinearScale::new((0.0, f64::INFINITY), (0.0, 1.0)).is_err());
    }

    #[test]
    fn test_color_scale_single_color() {
        let scale = ColorScale::new(vec![Rgba::WHITE]).expect("color scale creation should succeed");
        assert_eq!(scale.scale(0.5), Rgba::WHITE);
    }

    #[test]
    fn test_color_scale_invalid_empty() {
        assert!(ColorScale::new(vec![]).is_err());
    }

    #[test]
    fn test_color_scale_clamping() {
        let scale = ColorScale::new(vec![Rgba::BLACK, Rgba::WHITE])
            .expect("color scale creation should succeed");
        assert_eq!(scale.scale(-1.0), Rgba::BLACK);
        assert_eq!(scale.scale(2.0), Rgba::WHITE);
        assert_eq!(scale.scale(f64::NAN), Rgba::BLACK);
    }

    #[test]
    fn test_default_palettes_endpoints() {
        let seq = ColorScale::yellow_green_blue();
        assert_eq!(seq.scale(0.0).to_hex(), "#ffffd9");
        assert_eq!(seq.scale(1.0).to_hex(), "#081d58");

        let div = ColorScale::red_yellow_blue();
        assert_eq!(div.scale(0.5).to_hex(), "#ffffbf");
        assert_eq!(div.colors().len(), 11);
    }

    #[test]
    fn test_named_lookup_ignores_case() {
        assert_eq!(ColorScale::named("Viridis"), Some(ColorScale::viridis()));
        assert_eq!(ColorScale::named("YlGnBu"), Some(ColorScale::yellow_green_blue()));
        assert!(ColorScale::named("no-such-scale").is_none());
    }

    #[test]
    fn test_pick_wraps() {
        let cat = ColorScale::category10();
        assert_eq!(cat.pick(0), cat.pick(10));
        assert_ne!(cat.pick(0), cat.pick(1));
    }

    #[test]
    fn test_category_rank() {
        assert_eq!(category_rank(0.0, 3), 0);
        assert_eq!(category_rank(0.5, 3), 1);
        assert_eq!(category_rank(1.0, 3), 2);
        assert_eq!(category_rank(0.0, 1), 0);
        assert_eq!(category_rank(f64::NAN, 4), 0);
    }

    #[test]
    fn test_scale_ref_categorical_is_discrete() {
        let cat = ScaleRef::Categorical { count: 3 };
        let palette = ColorScale::category10();
        assert_eq!(cat.color_at(0.5), Some(palette.pick(1)));
        assert_eq!(cat.color_at(1.0), Some(palette.pick(2)));
    }

    #[test]
    fn test_scale_ref_unknown_named_has_no_palette() {
        let named = ScaleRef::Named("Spectral".to_string());
        assert!(named.palette().is_none());
        assert!(named.color_at(0.3).is_none());
    }
}

//! Per-layer style descriptors.

use geojson::Feature;

use crate::classify::Classification;
use crate::color::Rgba;
use crate::error::Result;
use crate::layer::{attribute_value, ColorOption, StylingOptions};
use crate::scale::ScaleRef;
use crate::style::expr::{EvalContext, Expr, Resolved};

/// Fill color for features without a usable color value.
pub const FALLBACK_FILL: Rgba = Rgba::NEUTRAL;

/// A style channel, named as the map renderer's path options name it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Circle marker radius.
    Radius,
    /// Stroke color.
    StrokeColor,
    /// Stroke width.
    Weight,
    /// Stroke opacity.
    Opacity,
    /// Fill opacity.
    FillOpacity,
    /// Fill color.
    FillColor,
}

impl Channel {
    /// Option key in the generated style object.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Channel::Radius => "radius",
            Channel::StrokeColor => "color",
            Channel::Weight => "weight",
            Channel::Opacity => "opacity",
            Channel::FillOpacity => "fillOpacity",
            Channel::FillColor => "fillColor",
        }
    }
}

/// Resolved style rules for one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleDescriptor {
    /// Attribute whose normalized value feeds [`Expr::ColorValue`].
    pub color_attribute: Option<String>,
    /// Marker radius.
    pub radius: Expr,
    /// Stroke color; omitted leaves the renderer default.
    pub stroke_color: Option<Expr>,
    /// Stroke width.
    pub weight: Expr,
    /// Stroke opacity.
    pub opacity: Expr,
    /// Fill opacity.
    pub fill_opacity: Expr,
    /// Fill color; omitted leaves the renderer default.
    pub fill_color: Option<Expr>,
}

impl StyleDescriptor {
    /// Channels with a rule, in emission order.
    #[must_use]
    pub fn channels(&self) -> Vec<(Channel, &Expr)> {
        let mut channels = vec![(Channel::Radius, &self.radius)];
        if let Some(stroke) = &self.stroke_color {
            channels.push((Channel::StrokeColor, stroke));
        }
        channels.push((Channel::Weight, &self.weight));
        channels.push((Channel::Opacity, &self.opacity));
        channels.push((Channel::FillOpacity, &self.fill_opacity));
        if let Some(fill) = &self.fill_color {
            channels.push((Channel::FillColor, fill));
        }
        channels
    }

    /// Rule for one channel.
    #[must_use]
    pub fn rule(&self, channel: Channel) -> Option<&Expr> {
        self.channels().into_iter().find(|(c, _)| *c == channel).map(|(_, e)| e)
    }

    /// True when every rule is a literal, so all features share one style.
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.channels().iter().all(|(_, e)| !e.is_feature_dependent())
    }

    /// True when some rule needs the normalized color value.
    #[must_use]
    pub fn uses_color_value(&self) -> bool {
        self.channels().iter().any(|(_, e)| e.uses_color_value())
    }

    /// Color scale behind a data-driven fill.
    #[must_use]
    pub fn fill_scale(&self) -> Option<&ScaleRef> {
        fn find(expr: &Expr) -> Option<&ScaleRef> {
            match expr {
                Expr::ScaleLookup { scale, .. } => Some(scale),
                Expr::IfPresent { then, otherwise, .. } => find(then).or_else(|| find(otherwise)),
                Expr::Literal(_) | Expr::Attribute(_) | Expr::ColorValue => None,
            }
        }
        self.fill_color.as_ref().and_then(find)
    }

    /// Compute the concrete style of one feature.
    ///
    /// Channels whose rule cannot be resolved for this feature are left out.
    #[must_use]
    pub fn evaluate(&self, feature: &Feature, classification: &Classification) -> ResolvedStyle {
        let color_value = self
            .color_attribute
            .as_deref()
            .and_then(|name| attribute_value(feature, name))
            .and_then(|value| classification.normalize(value));
        let ctx = EvalContext { feature, color_value };

        ResolvedStyle {
            values: self
                .channels()
                .into_iter()
                .filter_map(|(channel, expr)| expr.evaluate(&ctx).map(|v| (channel, v)))
                .collect(),
        }
    }
}

/// Concrete style values for one feature.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResolvedStyle {
    /// Channel values in emission order.
    pub values: Vec<(Channel, Resolved)>,
}

impl ResolvedStyle {
    /// Value of one channel.
    #[must_use]
    pub fn get(&self, channel: Channel) -> Option<&Resolved> {
        self.values.iter().find(|(c, _)| *c == channel).map(|(_, v)| v)
    }
}

/// Build the style descriptor for a layer.
///
/// Fill color resolution, first match wins:
/// 1. constant `color`
/// 2. `color_map` applied to the normalized attribute value
/// 3. the classification's default scale (sequential, diverging, categorical)
/// 4. no fill rule
///
/// # Errors
///
/// Returns an error when the color options conflict (see
/// [`StylingOptions::validate`]).
pub fn build_style(options: &StylingOptions, classification: &Classification) -> Result<StyleDescriptor> {
    options.validate()?;

    let color_attribute = options.color_attribute_name().map(str::to_string);

    let fill_color = match (&options.color, &options.color_map) {
        (Some(ColorOption::Constant(color)), _) => Some(Expr::text(color.clone())),
        (_, Some(name)) => Some(Expr::scaled_color(ScaleRef::Named(name.clone()), FALLBACK_FILL)),
        _ => classification.default_scale().map(|scale| Expr::scaled_color(scale, FALLBACK_FILL)),
    };

    let stroke_color = match (&options.stroke_color, &options.color) {
        (Some(value), _) => Some(Expr::from_value(value)),
        (None, Some(ColorOption::Constant(color))) => Some(Expr::text(color.clone())),
        _ => None,
    };

    Ok(StyleDescriptor {
        color_attribute,
        radius: Expr::from_value(&options.marker_size),
        stroke_color,
        weight: Expr::from_value(&options.border_width),
        opacity: Expr::from_value(&options.opacity),
        fill_opacity: Expr::from_value(&options.fill_opacity),
        fill_color,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{Categories, Extent};
    use crate::error::Error;
    use crate::layer::{Literal, StyleValue};
    use serde_json::json;

    fn sequential() -> Classification {
        Classification::Sequential(Extent { min: 0.0, max: 10.0, range: 10.0 })
    }

    fn feature(props: serde_json::Value) -> Feature {
        Feature {
            bbox: None,
            geometry: None,
            id: None,
            properties: props.as_object().cloned(),
            foreign_members: None,
        }
    }

    #[test]
    fn test_constant_color_wins() {
        let opts = StylingOptions::new().color_constant("#ff0000");
        let style = build_style(&opts, &Classification::None).unwrap();
        assert_eq!(style.fill_color, Some(Expr::text("#ff0000")));
        assert_eq!(style.stroke_color, Some(Expr::text("#ff0000")));
        assert!(style.is_constant());
    }

    #[test]
    fn test_constant_color_with_map_is_rejected() {
        let opts = StylingOptions::new().color_constant("#ff0000").color_map("viridis");
        assert!(matches!(
            build_style(&opts, &Classification::None),
            Err(Error::ConflictingColorOptions)
        ));
    }

    #[test]
    fn test_color_map_overrides_default_scale() {
        let opts = StylingOptions::new().color_attribute("pop").color_map("viridis");
        let style = build_style(&opts, &sequential()).unwrap();
        assert_eq!(
            style.fill_color,
            Some(Expr::scaled_color(ScaleRef::Named("viridis".to_string()), FALLBACK_FILL))
        );
    }

    #[test]
    fn test_default_scale_per_classification() {
        let opts = StylingOptions::new().color_attribute("x");

        let seq = build_style(&opts, &sequential()).unwrap();
        assert_eq!(seq.fill_color, Some(Expr::scaled_color(ScaleRef::Sequential, FALLBACK_FILL)));

        let div = Classification::Diverging(Extent { min: -1.0, max: 1.0, range: 2.0 });
        let div = build_style(&opts, &div).unwrap();
        assert_eq!(div.fill_color, Some(Expr::scaled_color(ScaleRef::Diverging, FALLBACK_FILL)));

        let cat = Classification::Categorical(Categories::from_keys(["a", "b", "c"]));
        let cat = build_style(&opts, &cat).unwrap();
        assert_eq!(
            cat.fill_color,
            Some(Expr::scaled_color(ScaleRef::Categorical { count: 3 }, FALLBACK_FILL))
        );
    }

    #[test]
    fn test_fill_scale() {
        let opts = StylingOptions::new().color_attribute("x");
        assert_eq!(build_style(&opts, &sequential()).unwrap().fill_scale(), Some(&ScaleRef::Sequential));
        let constant = build_style(&StylingOptions::new().color_constant("#fff"), &Classification::None).unwrap();
        assert_eq!(constant.fill_scale(), None);
    }

    #[test]
    fn test_no_color_omits_fill() {
        let style = build_style(&StylingOptions::new(), &Classification::None).unwrap();
        assert!(style.fill_color.is_none());
        assert!(style.rule(Channel::FillColor).is_none());
        assert!(style.stroke_color.is_none());
        let keys: Vec<&str> = style.channels().iter().map(|(c, _)| c.key()).collect();
        assert_eq!(keys, vec!["radius", "weight", "opacity", "fillOpacity"]);
    }

    #[test]
    fn test_attribute_channels_independent_of_classification() {
        let opts = StylingOptions::new().marker_size(StyleValue::attribute("size")).color_attribute("x");
        let a = build_style(&opts, &sequential()).unwrap();
        let b = build_style(&opts, &Classification::Categorical(Categories::from_keys(["q"]))).unwrap();
        assert_eq!(a.radius, Expr::Attribute("size".to_string()));
        assert_eq!(a.radius, b.radius);
        assert_eq!(a.weight, Expr::Literal(Literal::Number(2.0)));
    }

    #[test]
    fn test_stroke_color_option() {
        let opts = StylingOptions::new().color_attribute("x").stroke_color("#000");
        let style = build_style(&opts, &sequential()).unwrap();
        assert_eq!(style.rule(Channel::StrokeColor), Some(&Expr::text("#000")));
    }

    #[test]
    fn test_evaluate_feature() {
        let opts = StylingOptions::new().color_attribute("x");
        let classification = sequential();
        let style = build_style(&opts, &classification).unwrap();

        let high = style.evaluate(&feature(json!({"x": 10})), &classification);
        assert_eq!(high.get(Channel::Radius), Some(&Resolved::Number(3.0)));
        assert_eq!(
            high.get(Channel::FillColor),
            Some(&Resolved::Color(Rgba::from_hex("#081d58").unwrap()))
        );

        let missing = style.evaluate(&feature(json!({})), &classification);
        assert_eq!(
            missing.get(Channel::FillColor),
            Some(&Resolved::Text(FALLBACK_FILL.to_hex()))
        );
    }

    #[test]
    fn test_evaluate_drops_unresolved_attribute_channel() {
        let opts = StylingOptions::new().marker_size(StyleValue::attribute("size"));
        let style = build_style(&opts, &Classification::None).unwrap();
        assert!(!style.is_constant());
        let resolved = style.evaluate(&feature(json!({})), &Classification::None);
        assert!(resolved.get(Channel::Radius).is_none());
        assert!(resolved.get(Channel::Weight).is_some());
    }
}

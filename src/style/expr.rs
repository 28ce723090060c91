//! Style expressions.
//!
//! A small expression tree describing how one style channel is computed for a
//! feature. The tree is evaluated here on the Rust side and serialized to
//! script text by [`crate::output`].

use geojson::Feature;
use serde_json::Value;

use crate::color::Rgba;
use crate::layer::{attribute_value, Literal, StyleValue};
use crate::scale::ScaleRef;

/// An expression producing one style channel value.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant value.
    Literal(Literal),
    /// Read a feature attribute.
    Attribute(String),
    /// The feature's normalized color value, computed by the layer's
    /// preprocessing step. Missing when the feature has no usable value.
    ColorValue,
    /// Look `input` up in a color scale.
    ScaleLookup {
        /// Scale to sample.
        scale: ScaleRef,
        /// Normalized input in `[0, 1]`.
        input: Box<Expr>,
    },
    /// `then` when `test` is present, otherwise `otherwise`.
    IfPresent {
        /// Expression checked for presence.
        test: Box<Expr>,
        /// Value when present.
        then: Box<Expr>,
        /// Value when missing.
        otherwise: Box<Expr>,
    },
}

/// A concrete channel value.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// Numeric value.
    Number(f64),
    /// Text value (including constant CSS colors).
    Text(String),
    /// Color computed from a scale.
    Color(Rgba),
}

/// Per-feature inputs for evaluation.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    /// Feature being styled.
    pub feature: &'a Feature,
    /// Its normalized color value, if any.
    pub color_value: Option<f64>,
}

impl Expr {
    /// Build the expression for a style option value.
    #[must_use]
    pub fn from_value(value: &StyleValue) -> Self {
        match value {
            StyleValue::Literal(lit) => Expr::Literal(lit.clone()),
            StyleValue::Attribute(r) => Expr::Attribute(r.attribute.clone()),
        }
    }

    /// Text literal.
    #[must_use]
    pub fn text(s: impl Into<String>) -> Self {
        Expr::Literal(Literal::Text(s.into()))
    }

    /// Scale lookup of the color value, falling back to `fallback` when the
    /// feature has no color value.
    #[must_use]
    pub fn scaled_color(scale: ScaleRef, fallback: Rgba) -> Self {
        Expr::IfPresent {
            test: Box::new(Expr::ColorValue),
            then: Box::new(Expr::ScaleLookup { scale, input: Box::new(Expr::ColorValue) }),
            otherwise: Box::new(Expr::text(fallback.to_hex())),
        }
    }

    /// True when the expression reads anything from the feature.
    #[must_use]
    pub fn is_feature_dependent(&self) -> bool {
        match self {
            Expr::Literal(_) => false,
            Expr::Attribute(_) | Expr::ColorValue => true,
            Expr::ScaleLookup { input, .. } => input.is_feature_dependent(),
            Expr::IfPresent { test, then, otherwise } => {
                test.is_feature_dependent()
                    || then.is_feature_dependent()
                    || otherwise.is_feature_dependent()
            }
        }
    }

    /// True when the expression needs the feature's color value.
    #[must_use]
    pub fn uses_color_value(&self) -> bool {
        match self {
            Expr::ColorValue => true,
            Expr::Literal(_) | Expr::Attribute(_) => false,
            Expr::ScaleLookup { input, .. } => input.uses_color_value(),
            Expr::IfPresent { test, then, otherwise } => {
                test.uses_color_value() || then.uses_color_value() || otherwise.uses_color_value()
            }
        }
    }

    /// Evaluate against one feature.
    ///
    /// Returns `None` when an attribute or color value is missing, or when a
    /// named scale is unknown on the Rust side.
    #[must_use]
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Option<Resolved> {
        match self {
            Expr::Literal(Literal::Number(n)) => Some(Resolved::Number(*n)),
            Expr::Literal(Literal::Text(s)) => Some(Resolved::Text(s.clone())),
            Expr::Attribute(name) => attribute_value(ctx.feature, name).map(resolve_json),
            Expr::ColorValue => ctx.color_value.map(Resolved::Number),
            Expr::ScaleLookup { scale, input } => match input.evaluate(ctx)? {
                Resolved::Number(t) => scale.color_at(t).map(Resolved::Color),
                Resolved::Text(_) | Resolved::Color(_) => None,
            },
            Expr::IfPresent { test, then, otherwise } => {
                if test.evaluate(ctx).is_some() {
                    then.evaluate(ctx)
                } else {
                    otherwise.evaluate(ctx)
                }
            }
        }
    }
}

fn resolve_json(value: &Value) -> Resolved {
    match value {
        Value::Number(n) => n.as_f64().map_or_else(|| Resolved::Text(n.to_string()), Resolved::Number),
        Value::String(s) => Resolved::Text(s.clone()),
        other => Resolved::Text(other.to_string()),
    }
}

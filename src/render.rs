//! Render script generation.
//!
//! [`generate`] validates every layer, classifies its color attribute, builds
//! its style descriptor and assembles the per-layer fragments into one map
//! callback. Nothing is emitted until every layer has been prepared, so an
//! invalid layer never yields a partial script.

use log::{debug, trace};
use serde::Serialize;

use crate::classify::{classify, Classification, LegendStop};
use crate::config::MapConfig;
use crate::error::Result;
use crate::layer::{Layer, LayerData};
use crate::output::{needs_chroma, ScriptWriter, Statement};
use crate::style::{build_style, StyleDescriptor};

/// A layer that passed validation, with its derived classification and style.
#[derive(Debug, Clone)]
pub struct PreparedLayer {
    /// Position in the input.
    pub index: usize,
    /// Display name.
    pub name: Option<String>,
    /// Validated payload.
    pub data: LayerData,
    /// Color classification; always `None` for an empty layer.
    pub classification: Classification,
    /// Style rules; `None` for an empty layer.
    pub style: Option<StyleDescriptor>,
}

impl PreparedLayer {
    /// Validate and derive everything needed to emit one layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not GeoJSON or the styling options
    /// conflict. Errors are not yet tagged with the layer position.
    pub fn new(index: usize, layer: &Layer) -> Result<Self> {
        let data = LayerData::from_value(&layer.data)?;
        layer.options.validate()?;

        let (classification, style) = if data.is_empty() {
            debug!("layer {index} is empty, drawing without style");
            (Classification::None, None)
        } else {
            let classification = classify(data.features(), layer.options.color.as_ref());
            let style = build_style(&layer.options, &classification)?;
            debug!(
                "layer {index}: {} features, {} classification",
                data.len(),
                classification.kind()
            );
            (classification, Some(style))
        };

        Ok(Self {
            index,
            name: layer.name.clone(),
            data,
            classification,
            style,
        })
    }

    /// Script variable holding this layer's feature collection.
    #[must_use]
    pub fn var(&self) -> String {
        format!("layer_{}", self.index)
    }

    /// True when the layer is drawn with a style.
    #[must_use]
    pub fn is_drawn(&self) -> bool {
        self.style.is_some()
    }

    /// True when the layer takes part in bounds fitting: it is styled and has a position.
    #[must_use]
    pub fn has_bounds(&self) -> bool {
        self.is_drawn() && self.data.has_geometry()
    }

    /// Legend for the layer's fill color, empty when the fill is not data-driven.
    #[must_use]
    pub fn legend(&self) -> Vec<LegendStop> {
        match self.style.as_ref().and_then(StyleDescriptor::fill_scale) {
            Some(scale) => self.classification.legend(scale),
            None => Vec::new(),
        }
    }

    /// Emit this layer's statements.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn fragment(&self) -> Result<Vec<Statement>> {
        let var = self.var();
        let mut statements = Vec::with_capacity(4);

        if let Some(name) = &self.name {
            statements.push(Statement::Comment(name.clone()));
        }
        statements.push(Statement::ParseLayer {
            var: var.clone(),
            payload: self.data.to_json_string()?,
        });

        if let Some(style) = &self.style {
            if let Some(attribute) = &style.color_attribute {
                if style.uses_color_value() && self.classification != Classification::None {
                    statements.push(Statement::Preprocess {
                        var: var.clone(),
                        attribute: attribute.clone(),
                        classification: self.classification.clone(),
                    });
                }
            }
        }

        statements.push(Statement::AddLayer {
            var,
            style: self.style.clone(),
        });
        Ok(statements)
    }
}

/// Summary of one emitted layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayerSummary {
    /// Position in the input.
    pub index: usize,
    /// Display name.
    pub name: Option<String>,
    /// Number of features.
    pub features: usize,
    /// Classification kind (`none`, `categorical`, `sequential`, `diverging`).
    pub classification: String,
}

/// Generated script plus what the host page needs to embed it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderScript {
    /// Callback to run once the map assets are loaded.
    pub script: String,
    /// Id the host must give the map container.
    pub container_id: String,
    /// Container width (CSS).
    pub width: String,
    /// Container height (CSS).
    pub height: String,
    /// Whether the script uses chroma.js.
    pub requires_chroma: bool,
    /// Per-layer summaries in input order.
    pub layers: Vec<LayerSummary>,
}

/// Validate and prepare every layer.
///
/// # Errors
///
/// Returns the first failing layer's error, tagged with its position.
pub fn prepare_layers(layers: &[Layer]) -> Result<Vec<PreparedLayer>> {
    layers
        .iter()
        .enumerate()
        .map(|(index, layer)| PreparedLayer::new(index, layer).map_err(|e| e.in_layer(index)))
        .collect()
}

/// Generate the render script for `layers` on a map described by `config`.
///
/// The script creates the map, adds the base tiles, draws each layer in
/// order and, when at least one layer has features, fits the view to their
/// combined bounds.
///
/// # Errors
///
/// Returns an error if any layer is invalid; no script is produced then.
pub fn generate(layers: &[Layer], config: &MapConfig) -> Result<RenderScript> {
    let prepared = prepare_layers(layers)?;

    let mut writer = ScriptWriter::new()
        .statement(Statement::InitMap {
            container_id: config.id.clone(),
            center: config.center,
            zoom: config.zoom,
        })
        .statement(Statement::TileLayer {
            url: config.provider.url.clone(),
            options: config.provider.options.clone(),
        });

    for layer in &prepared {
        let fragment = layer.fragment()?;
        trace!("layer {}: {} statements", layer.index, fragment.len());
        writer = writer.statements(fragment);
    }

    let bounded: Vec<String> = prepared.iter().filter(|l| l.has_bounds()).map(PreparedLayer::var).collect();
    if !bounded.is_empty() {
        writer.push(Statement::FitBounds { layers: bounded });
    }

    let requires_chroma = prepared
        .iter()
        .filter_map(|l| l.style.as_ref())
        .any(|s| s.channels().iter().any(|(_, e)| needs_chroma(e)));

    let script = writer.render();
    debug!("generated {} bytes of script for {} layers", script.len(), prepared.len());

    Ok(RenderScript {
        script,
        container_id: config.id.clone(),
        width: config.width.to_string(),
        height: config.height.to_string(),
        requires_chroma,
        layers: prepared
            .iter()
            .map(|l| LayerSummary {
                index: l.index,
                name: l.name.clone(),
                features: l.data.len(),
                classification: l.classification.kind().to_string(),
            })
            .collect(),
    })
}

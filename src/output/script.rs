//! JavaScript render-script writer.
//!
//! Statements are collected in order and rendered into one callback function
//! targeting Leaflet (with chroma.js for interpolated color scales). Style
//! expressions are turned into script text only here.

use std::fmt::Write as FmtWrite;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::Value;

use crate::classify::{number_to_string, Classification, Extent, CONSTANT_RANGE_VALUE};
use crate::error::Result;
use crate::layer::Literal;
use crate::scale::ScaleRef;
use crate::style::{Expr, StyleDescriptor};

/// Property on each feature that carries its normalized color value.
pub const COLOR_VALUE_PROPERTY: &str = "__colorValue";

/// A statement of the render script.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `// text`
    Comment(String),
    /// Create the map in its container and set the initial view.
    InitMap {
        /// Container element id.
        container_id: String,
        /// `[lat, lon]`.
        center: [f64; 2],
        /// Initial zoom.
        zoom: u8,
    },
    /// Add the base tile layer.
    TileLayer {
        /// URL template.
        url: String,
        /// Provider options, serialized verbatim.
        options: IndexMap<String, Value>,
    },
    /// Parse a layer's GeoJSON payload into `var`.
    ParseLayer {
        /// Variable holding the feature collection.
        var: String,
        /// Compact GeoJSON text.
        payload: String,
    },
    /// Compute each feature's normalized color value from `attribute`.
    Preprocess {
        /// Variable holding the feature collection.
        var: String,
        /// Attribute driving the color.
        attribute: String,
        /// Normalization parameters.
        classification: Classification,
    },
    /// Draw a collection, styled when `style` is set, and add it to the map.
    AddLayer {
        /// Variable holding the feature collection.
        var: String,
        /// Style rules; `None` draws with renderer defaults.
        style: Option<StyleDescriptor>,
    },
    /// Group the drawn layers and fit the view to their bounds.
    FitBounds {
        /// Variables of the drawn layers.
        layers: Vec<String>,
    },
}

/// Builds a render script from statements.
#[derive(Debug, Clone)]
pub struct ScriptWriter {
    /// Indent unit
    indent: String,
    /// Statements in emission order
    statements: Vec<Statement>,
}

impl Default for ScriptWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptWriter {
    /// Create an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            indent: "  ".to_string(),
            statements: Vec::new(),
        }
    }

    /// Set the indent unit.
    #[must_use]
    pub fn indent(mut self, indent: impl Into<String>) -> Self {
        self.indent = indent.into();
        self
    }

    /// Add a statement.
    #[must_use]
    pub fn statement(mut self, statement: Statement) -> Self {
        self.statements.push(statement);
        self
    }

    /// Add several statements.
    #[must_use]
    pub fn statements(mut self, statements: impl IntoIterator<Item = Statement>) -> Self {
        self.statements.extend(statements);
        self
    }

    /// Add a raw statement.
    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Statements collected so far.
    #[must_use]
    pub fn as_statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Render the callback function.
    #[must_use]
    pub fn render(&self) -> String {
        let mut js = String::with_capacity(4096);
        js.push_str("function () {\n");
        for statement in &self.statements {
            for line in statement_to_js(statement).lines() {
                if line.is_empty() {
                    js.push('\n');
                } else {
                    let _ = writeln!(js, "{}{line}", self.indent);
                }
            }
        }
        js.push_str("}\n");
        js
    }

    /// Write to a file.
    ///
    /// # Errors
    ///
    /// Returns an error if file writing fails.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(self.render().as_bytes())?;
        Ok(())
    }
}

/// Quote a string as a script string literal.
///
/// Safe to embed inside an HTML `<script>` element.
#[must_use]
pub fn js_string(s: &str) -> String {
    let quoted = serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string());
    quoted
        .replace("</", "<\\/")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029")
}

/// Format a number as a script literal; non-finite values become `null`.
#[must_use]
pub fn js_number(v: f64) -> String {
    if v.is_finite() {
        number_to_string(v)
    } else {
        "null".to_string()
    }
}

/// Serialize a style expression.
#[must_use]
pub fn expr_to_js(expr: &Expr) -> String {
    match expr {
        Expr::Literal(Literal::Number(n)) => js_number(*n),
        Expr::Literal(Literal::Text(s)) => js_string(s),
        Expr::Attribute(name) => format!("(feature.properties || {{}})[{}]", js_string(name)),
        Expr::ColorValue => format!("feature.{COLOR_VALUE_PROPERTY}"),
        Expr::ScaleLookup { scale, input } => scale_to_js(scale, &expr_to_js(input)),
        Expr::IfPresent { test, then, otherwise } => format!(
            "(({}) == null ? {} : {})",
            expr_to_js(test),
            expr_to_js(otherwise),
            expr_to_js(then)
        ),
    }
}

fn scale_to_js(scale: &ScaleRef, input: &str) -> String {
    match scale {
        ScaleRef::Named(name) => format!("chroma.scale({})({input}).hex()", js_string(name)),
        ScaleRef::Categorical { count } => {
            let last = count.saturating_sub(1);
            let palette = palette_to_js(scale);
            let size = scale.palette().map_or(1, |p| p.colors().len());
            format!("{palette}[Math.round({input} * {last}) % {size}]")
        }
        ScaleRef::Sequential | ScaleRef::Diverging => {
            format!("chroma.scale({})({input}).hex()", palette_to_js(scale))
        }
    }
}

fn palette_to_js(scale: &ScaleRef) -> String {
    let colors: Vec<String> = scale
        .palette()
        .map(|p| p.colors().iter().map(|c| js_string(&c.to_hex())).collect())
        .unwrap_or_default();
    format!("[{}]", colors.join(", "))
}

/// True when the expression needs chroma.js at run time.
#[must_use]
pub fn needs_chroma(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(_) | Expr::Attribute(_) | Expr::ColorValue => false,
        Expr::ScaleLookup { scale, input } => {
            !matches!(scale, ScaleRef::Categorical { .. }) || needs_chroma(input)
        }
        Expr::IfPresent { test, then, otherwise } => {
            needs_chroma(test) || needs_chroma(then) || needs_chroma(otherwise)
        }
    }
}

fn statement_to_js(statement: &Statement) -> String {
    match statement {
        Statement::Comment(text) => format!("// {}", single_line(text)),
        Statement::InitMap { container_id, center, zoom } => format!(
            "var map = L.map({}).setView([{}, {}], {zoom});",
            js_string(container_id),
            js_number(center[0]),
            js_number(center[1])
        ),
        Statement::TileLayer { url, options } => format!(
            "L.tileLayer({}, {}).addTo(map);",
            js_string(url),
            object_to_js(options.iter().map(|(k, v)| (k.as_str(), value_to_js(v))))
        ),
        Statement::ParseLayer { var, payload } => {
            format!("var {var} = JSON.parse({});", js_string(payload))
        }
        Statement::Preprocess { var, attribute, classification } => {
            preprocess_to_js(var, attribute, classification)
        }
        Statement::AddLayer { var, style: None } => {
            format!("var {var}_layer = L.geoJSON({var}).addTo(map);")
        }
        Statement::AddLayer { var, style: Some(style) } => add_styled_layer_to_js(var, style),
        Statement::FitBounds { layers } => {
            let members: Vec<String> = layers.iter().map(|v| format!("{v}_layer")).collect();
            format!(
                "var group = L.featureGroup([{}]);\nmap.fitBounds(group.getBounds());",
                members.join(", ")
            )
        }
    }
}

fn value_to_js(value: &Value) -> String {
    match value {
        Value::String(s) => js_string(s),
        Value::Number(n) => n.as_f64().map_or_else(|| n.to_string(), js_number),
        other => serde_json::to_string(other)
            .map(|s| s.replace("</", "<\\/"))
            .unwrap_or_else(|_| "null".to_string()),
    }
}

/// Collapse every script line terminator so the text stays inside a `//` comment.
fn single_line(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace(['\n', '\r', '\u{2028}', '\u{2029}'], " ")
}

fn object_to_js<'a>(entries: impl Iterator<Item = (&'a str, String)>) -> String {
    let body: Vec<String> = entries.map(|(k, v)| format!("{}: {v}", js_string(k))).collect();
    if body.is_empty() {
        "{}".to_string()
    } else {
        format!("{{{}}}", body.join(", "))
    }
}

fn preprocess_to_js(var: &str, attribute: &str, classification: &Classification) -> String {
    let read = format!("var value = (feature.properties || {{}})[{}];", js_string(attribute));
    let target = format!("feature.{COLOR_VALUE_PROPERTY}");
    match classification {
        Classification::None => String::new(),
        Classification::Sequential(extent) | Classification::Diverging(extent) => format!(
            "{var}.features.forEach(function (feature) {{\n  {read}\n  {target} = (typeof value === \"number\" && isFinite(value)) ? {} : null;\n}});",
            numeric_normalization(extent)
        ),
        Classification::Categorical(categories) => {
            let entries: Vec<String> =
                categories.iter().map(|(key, t)| format!("[{}, {}]", js_string(key), js_number(t))).collect();
            format!(
                "var {var}_categories = new Map([{}]);\n\
                 {var}.features.forEach(function (feature) {{\n  \
                 {read}\n  \
                 var key = value == null ? null : (typeof value === \"object\" ? JSON.stringify(value) : String(value));\n  \
                 {target} = (key !== null && {var}_categories.has(key)) ? {var}_categories.get(key) : null;\n\
                 }});",
                entries.join(", ")
            )
        }
    }
}

fn numeric_normalization(extent: &Extent) -> String {
    if extent.range == 0.0 {
        js_number(CONSTANT_RANGE_VALUE)
    } else {
        format!("(value - {}) / {}", js_number(extent.min), js_number(extent.range))
    }
}

fn add_styled_layer_to_js(var: &str, style: &StyleDescriptor) -> String {
    let param = if style.is_constant() { "" } else { "feature" };
    let channels: Vec<String> = style
        .channels()
        .into_iter()
        .map(|(channel, expr)| format!("    {}: {}", channel.key(), expr_to_js(expr)))
        .collect();
    format!(
        "var {var}_layer = L.geoJSON({var}, {{\n  \
         pointToLayer: function (feature, latlng) {{ return L.circleMarker(latlng); }},\n  \
         style: function ({param}) {{\n    return {{\n{}\n    }};\n  }}\n\
         }}).addTo(map);",
        channels.join(",\n")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Categories;
    use crate::color::Rgba;
    use crate::layer::StylingOptions;
    use crate::style::build_style;

    #[test]
    fn test_js_string_escapes() {
        assert_eq!(js_string("plain"), "\"plain\"");
        assert_eq!(js_string("a\"b"), "\"a\\\"b\"");
        assert_eq!(js_string("</script>"), "\"<\\/script>\"");
        assert_eq!(js_string("x\u{2028}y"), "\"x\\u2028y\"");
    }

    #[test]
    fn test_js_number() {
        assert_eq!(js_number(3.0), "3");
        assert_eq!(js_number(0.25), "0.25");
        assert_eq!(js_number(-1.5), "-1.5");
        assert_eq!(js_number(f64::NAN), "null");
        assert_eq!(js_number(f64::INFINITY), "null");
        assert_eq!(js_number(1e21), "1e+21");
    }

    #[test]
    fn test_expr_literal_and_attribute() {
        assert_eq!(expr_to_js(&Expr::Literal(Literal::Number(2.0))), "2");
        assert_eq!(expr_to_js(&Expr::text("#ff0000")), "\"#ff0000\"");
        assert_eq!(
            expr_to_js(&Expr::Attribute("size".to_string())),
            "(feature.properties || {})[\"size\"]"
        );
    }

    #[test]
    fn test_expr_scaled_color() {
        let named = Expr::scaled_color(ScaleRef::Named("viridis".to_string()), Rgba::NEUTRAL);
        assert_eq!(
            expr_to_js(&named),
            "((feature.__colorValue) == null ? \"#bdbdbd\" : chroma.scale(\"viridis\")(feature.__colorValue).hex())"
        );

        let sequential = expr_to_js(&Expr::scaled_color(ScaleRef::Sequential, Rgba::NEUTRAL));
        assert!(sequential.contains("chroma.scale([\"#ffffd9\""));
        assert!(sequential.contains("\"#081d58\"]"));
    }

    #[test]
    fn test_expr_categorical_lookup() {
        let expr = Expr::ScaleLookup {
            scale: ScaleRef::Categorical { count: 3 },
            input: Box::new(Expr::ColorValue),
        };
        let js = expr_to_js(&expr);
        assert!(js.starts_with("[\"#1f77b4\""));
        assert!(js.ends_with("[Math.round(feature.__colorValue * 2) % 10]"));
        assert!(!needs_chroma(&expr));
    }

    #[test]
    fn test_needs_chroma() {
        assert!(needs_chroma(&Expr::scaled_color(ScaleRef::Diverging, Rgba::NEUTRAL)));
        assert!(!needs_chroma(&Expr::text("#fff")));
    }

    #[test]
    fn test_render_wraps_in_callback() {
        let js = ScriptWriter::new()
            .statement(Statement::InitMap {
                container_id: "map".to_string(),
                center: [52.5, 4.25],
                zoom: 11,
            })
            .statement(Statement::TileLayer {
                url: "https://t/{z}/{x}/{y}.png".to_string(),
                options: IndexMap::from([("maxZoom".to_string(), Value::from(19))]),
            })
            .render();
        assert!(js.starts_with("function () {\n"));
        assert!(js.ends_with("}\n"));
        assert!(js.contains("  var map = L.map(\"map\").setView([52.5, 4.25], 11);"));
        assert!(js.contains("  L.tileLayer(\"https://t/{z}/{x}/{y}.png\", {\"maxZoom\": 19}).addTo(map);"));
    }

    #[test]
    fn test_write_to_file_with_custom_indent() {
        let mut writer = ScriptWriter::new().indent("\t");
        writer.push(Statement::Comment("roads\nand rails".to_string()));
        assert_eq!(writer.as_statements().len(), 1);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.js");
        writer.write_to_file(&path).unwrap();
        let js = std::fs::read_to_string(&path).unwrap();
        assert_eq!(js, "function () {\n\t// roads and rails\n}\n");
    }

    #[test]
    fn test_preprocess_numeric() {
        let js = statement_to_js(&Statement::Preprocess {
            var: "layer_0".to_string(),
            attribute: "pop".to_string(),
            classification: Classification::Diverging(Extent { min: -4.0, max: 4.0, range: 8.0 }),
        });
        assert!(js.starts_with("layer_0.features.forEach(function (feature) {"));
        assert!(js.contains("(value - -4) / 8"));
    }

    #[test]
    fn test_preprocess_zero_range_uses_midpoint() {
        let js = statement_to_js(&Statement::Preprocess {
            var: "layer_0".to_string(),
            attribute: "pop".to_string(),
            classification: Classification::Sequential(Extent { min: 5.0, max: 5.0, range: 0.0 }),
        });
        assert!(js.contains("? 0.5 : null"));
        assert!(!js.contains("/ 0"));
    }

    #[test]
    fn test_preprocess_categorical_table_in_rank_order() {
        let js = statement_to_js(&Statement::Preprocess {
            var: "layer_1".to_string(),
            attribute: "kind".to_string(),
            classification: Classification::Categorical(Categories::from_keys(["B", "A", "C"])),
        });
        assert!(js.starts_with("var layer_1_categories = new Map([[\"B\", 0], [\"A\", 0.5], [\"C\", 1]]);"));
        assert!(js.contains("(key !== null && layer_1_categories.has(key)) ? layer_1_categories.get(key) : null"));
    }

    #[test]
    fn test_preprocess_categorical_prototype_keys_are_plain_entries() {
        let js = statement_to_js(&Statement::Preprocess {
            var: "layer_0".to_string(),
            attribute: "kind".to_string(),
            classification: Classification::Categorical(Categories::from_keys(["__proto__", "constructor"])),
        });
        assert!(js.starts_with("var layer_0_categories = new Map([[\"__proto__\", 0], [\"constructor\", 1]]);"));
        assert!(!js.contains("{\"__proto__\""));
        assert!(!js.contains("layer_0_categories[key]"));
    }

    #[test]
    fn test_comment_collapses_all_line_terminators() {
        for text in ["a\rALERT(1)", "a\r\nALERT(1)", "a\u{2028}ALERT(1)", "a\u{2029}ALERT(1)"] {
            let js = statement_to_js(&Statement::Comment(text.to_string()));
            assert_eq!(js, "// a ALERT(1)");
            assert!(!js.contains(['\n', '\r', '\u{2028}', '\u{2029}']));
        }
    }

    #[test]
    fn test_add_layer_constant_style() {
        let style = build_style(&StylingOptions::new().color_constant("#123456"), &Classification::None).unwrap();
        let js = statement_to_js(&Statement::AddLayer { var: "layer_0".to_string(), style: Some(style) });
        assert!(js.contains("style: function () {"));
        assert!(js.contains("fillColor: \"#123456\""));
        assert!(js.contains("L.circleMarker(latlng)"));
        assert!(js.ends_with("}).addTo(map);"));
    }

    #[test]
    fn test_add_layer_unstyled() {
        let js = statement_to_js(&Statement::AddLayer { var: "layer_2".to_string(), style: None });
        assert_eq!(js, "var layer_2_layer = L.geoJSON(layer_2).addTo(map);");
    }

    #[test]
    fn test_fit_bounds() {
        let js = statement_to_js(&Statement::FitBounds {
            layers: vec!["layer_0".to_string(), "layer_2".to_string()],
        });
        assert!(js.contains("L.featureGroup([layer_0_layer, layer_2_layer])"));
        assert!(js.ends_with("map.fitBounds(group.getBounds());"));
    }
}

//! Output encoders (render script).

mod script;

pub use script::{
    expr_to_js, js_number, js_string, needs_chroma, ScriptWriter, Statement, COLOR_VALUE_PROPERTY,
};

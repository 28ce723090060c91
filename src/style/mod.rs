//! Style descriptors and the expressions they are built from.
//!
//! [`build_style`] turns a layer's [`StylingOptions`](crate::layer::StylingOptions)
//! and its [`Classification`](crate::classify::Classification) into a
//! [`StyleDescriptor`]: one [`Expr`] per style channel. Expressions can be
//! evaluated per feature in Rust, and are serialized to script text only at
//! emission time.

mod descriptor;
mod expr;

pub use descriptor::{build_style, Channel, ResolvedStyle, StyleDescriptor, FALLBACK_FILL};
pub use expr::{EvalContext, Expr, Resolved};

//! # sipgen-emit
//!
//! Renders a declaration model and its rule overlay as SIP binding text,
//! and wires builder, rule engine and emitter into a [`Pipeline`] for one
//! translation unit.

pub mod emitter;
pub mod error;
pub mod options;
pub mod pipeline;

pub use emitter::{Emitted, emit};
pub use error::EmitError;
pub use options::EmitOptions;
pub use pipeline::{Pipeline, PipelineOutput};

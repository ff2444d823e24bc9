//! Single translation unit pipeline: build → apply rules → emit.
//!
//! 1. Build the declaration model from the normalized tree
//!    (`sipgen_model::build_model`)
//! 2. Apply the rule table to produce an overlay (`sipgen_rules::apply_rules`)
//! 3. Render SIP text (`crate::emit`)
//!
//! Diagnostics from every stage are collected in stage order. A pipeline
//! borrows its rule table, so one table can serve many pipelines running in
//! parallel.

use sipgen_core::Diagnostics;
use sipgen_model::{AstNode, build_model};
use sipgen_rules::{RuleTable, RuleUsage, apply_rules};
use tracing::debug;

use crate::emitter::emit;
use crate::error::EmitError;
use crate::options::EmitOptions;

/// Generator for one translation unit.
#[derive(Debug, Clone)]
pub struct Pipeline<'r> {
    rules: &'r RuleTable,
    options: EmitOptions,
}

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub text: String,
    pub diagnostics: Diagnostics,
    pub usage: RuleUsage,
}

impl<'r> Pipeline<'r> {
    #[must_use]
    pub const fn new(rules: &'r RuleTable, options: EmitOptions) -> Self {
        Self { rules, options }
    }

    #[must_use]
    pub const fn options(&self) -> &EmitOptions {
        &self.options
    }

    /// Generate SIP text for the tree rooted at `root`.
    ///
    /// Rule conflicts and typedef cycles are reported as error diagnostics,
    /// not as `Err`; the caller decides whether they fail the run.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::Model`] when the model cannot be built.
    pub fn run(&self, root: &AstNode) -> Result<PipelineOutput, EmitError> {
        let mut diagnostics = Diagnostics::new();

        let model = build_model(root, &mut diagnostics)?;
        debug!(header = %self.options.header, decls = model.len(), "model built");

        let outcome = apply_rules(&model, self.rules);
        diagnostics.extend(outcome.diagnostics);

        let emitted = emit(&model, &outcome.overlay, &self.options)?;
        diagnostics.extend(emitted.diagnostics);

        Ok(PipelineOutput {
            text: emitted.text,
            diagnostics,
            usage: outcome.usage,
        })
    }
}

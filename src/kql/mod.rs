//! KQL generation for relational plans.
//!
//! Converts select plans into pipe-stage query text and modification
//! batches into control commands.

pub mod compiler;
pub mod control;
pub mod correlation;
pub mod expr;
pub mod joins;
pub mod literal;

#[cfg(test)]
mod tests;

use serde::Serialize;
use tracing::debug;

use crate::error::CompileResult;
use crate::plan::{SelectPlan, Value};

pub use compiler::KqlCompiler;
pub use control::compile_batch;

/// How bound parameter values reach the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterMode {
    /// Substitute each parameter with its literal value (default).
    #[default]
    Inline,
    /// Render bare parameter names and collect them for a
    /// `declare query_parameters(...)` header supplied by the caller.
    Declare,
}

/// Compilation options.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryOptions {
    pub parameter_mode: ParameterMode,
}

/// A named parameter referenced by a compiled query in declare mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryParameter {
    pub name: String,
    /// KQL scalar type name (long, string, datetime, ...)
    pub kql_type: &'static str,
    pub value: Value,
}

/// The result of compiling one select plan.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    /// Pipe-stage query text
    pub text: String,
    /// Parameters collected in declare mode; empty in inline mode
    pub parameters: Vec<QueryParameter>,
}

impl CompiledQuery {
    /// The `declare query_parameters(...)` header for this query, if any
    /// parameters were collected.
    pub fn parameter_declaration(&self) -> Option<String> {
        if self.parameters.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .parameters
            .iter()
            .map(|p| format!("{}:{}", p.name, p.kql_type))
            .collect();
        Some(format!("declare query_parameters({});", parts.join(", ")))
    }

    /// Query text with the parameter declaration prepended when present.
    pub fn full_text(&self) -> String {
        match self.parameter_declaration() {
            Some(decl) => format!("{}\n{}", decl, self.text),
            None => self.text.clone(),
        }
    }
}

/// Compile a select plan with default options (inlined literals).
pub fn compile(plan: &SelectPlan) -> CompileResult<CompiledQuery> {
    compile_with_options(plan, &QueryOptions::default())
}

/// Compile a select plan.
pub fn compile_with_options(
    plan: &SelectPlan,
    options: &QueryOptions,
) -> CompileResult<CompiledQuery> {
    debug!(tables = plan.tables.len(), "compiling select plan");
    let mut compiler = KqlCompiler::new(options.parameter_mode);
    compiler.visit_select(plan)?;
    Ok(compiler.finish())
}

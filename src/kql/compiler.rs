//! The select-plan compiler.
//!
//! One `KqlCompiler` instance drives one compilation: it owns the output
//! buffer, the nesting-depth counter and the partition-frame stack, so
//! independent plans can be compiled concurrently without sharing state.
//!
//! Stages are always emitted in a fixed order: source, filter, ordering,
//! projection, skip, take. Ordering precedes the pagination stages
//! because the skip rewrite indexes rows in their final order, and the
//! partition rewrite consumes ordering keys when it materializes a take.

use std::collections::HashSet;

use crate::error::CompileResult;
use crate::plan::{Ordering, Projection, ScalarExpr, SelectPlan, TableSource};

use super::correlation::remove_correlation;
use super::{CompiledQuery, ParameterMode, QueryParameter};

/// Descent budget for expression and predicate trees.
pub(crate) const MAX_EXPR_DEPTH: usize = 512;

/// Synthetic projection alias that exists only to force serialization of
/// row numbers upstream; never rendered.
const ROW_VERSION_ALIAS: &str = "RowVersion";

/// Transient state for one lateral join being compiled. Frames nest when
/// lateral joins do; the stack is popped as soon as the join's inner plan
/// has been rendered.
#[derive(Debug, Clone)]
pub(crate) struct PartitionFrame {
    /// Partition key column; `None` for cross-apply (no top-N rewrite)
    pub column: Option<String>,
    /// Orderings of the select that holds the correlation predicate
    pub orderings: Vec<Ordering>,
    /// Whether that select carries a limit to fold into the partition
    pub has_limit: bool,
    /// The extracted correlation predicate, removed from the filter stage
    pub correlation: ScalarExpr,
}

/// Compiles one select plan into pipe-stage text.
pub struct KqlCompiler {
    pub(crate) out: String,
    pub(crate) depth: usize,
    pub(crate) frames: Vec<PartitionFrame>,
    pub(crate) mode: ParameterMode,
    pub(crate) parameters: Vec<QueryParameter>,
}

impl KqlCompiler {
    pub fn new(mode: ParameterMode) -> Self {
        KqlCompiler {
            out: String::new(),
            depth: 0,
            frames: Vec::new(),
            mode,
            parameters: Vec::new(),
        }
    }

    pub fn finish(self) -> CompiledQuery {
        CompiledQuery {
            text: self.out,
            parameters: self.parameters,
        }
    }

    /// Compile one select node. Nested invocations wrap their output in
    /// parentheses so the text can be inlined as a table source.
    pub fn visit_select(&mut self, plan: &SelectPlan) -> CompileResult<()> {
        let nested = self.depth > 0;
        self.depth += 1;

        if nested {
            self.out.push_str("(\n");
        }

        let result = self.write_stages(plan);
        self.depth -= 1;
        result?;

        if nested {
            self.out.push_str("\n)");
        }

        Ok(())
    }

    pub(crate) fn write_stages(&mut self, plan: &SelectPlan) -> CompileResult<()> {
        self.write_source(plan)?;
        self.write_filter(plan)?;
        self.write_order_by(plan)?;
        self.write_projection(plan)?;
        self.write_skip(plan)?;
        self.write_take(plan)
    }

    // ------------------------------------------------------------
    // source stage
    // ------------------------------------------------------------

    fn write_source(&mut self, plan: &SelectPlan) -> CompileResult<()> {
        match plan.tables.len() {
            // degenerate constant select
            0 => Ok(()),
            1 => self.write_single_source(&plan.tables[0]),
            _ => self.write_joined_source(plan),
        }
    }

    pub(crate) fn write_single_source(&mut self, source: &TableSource) -> CompileResult<()> {
        match source {
            TableSource::Table(name) => {
                self.out.push_str(name);
                Ok(())
            }
            TableSource::Raw(text) => {
                self.out.push('(');
                self.out.push_str(text);
                self.out.push(')');
                Ok(())
            }
            TableSource::Subquery(nested) => self.visit_select(nested),
            TableSource::Join { inner, .. } => self.write_single_source(inner),
            TableSource::OuterApply(inner) | TableSource::CrossApply(inner) => {
                self.visit_select(inner)
            }
        }
    }

    // ------------------------------------------------------------
    // filter stage
    // ------------------------------------------------------------

    fn write_filter(&mut self, plan: &SelectPlan) -> CompileResult<()> {
        let Some(predicate) = &plan.predicate else {
            return Ok(());
        };

        // While a lateral join is being compiled its correlation predicate
        // moves to the join's `on` clause; strip it from the filter here.
        let cleaned;
        let to_render = match self.frames.last() {
            Some(frame) => {
                let correlation = frame.correlation.clone();
                match remove_correlation(predicate, &correlation) {
                    // the correlation was the whole filter
                    None => return Ok(()),
                    Some(residual) => {
                        cleaned = residual;
                        &cleaned
                    }
                }
            }
            None => predicate,
        };

        self.out.push_str("\n| where ");
        self.translate_expr(to_render, 0)
    }

    // ------------------------------------------------------------
    // ordering stage
    // ------------------------------------------------------------

    fn write_order_by(&mut self, plan: &SelectPlan) -> CompileResult<()> {
        if plan.orderings.is_empty() {
            return Ok(());
        }

        self.out.push_str("\n| order by ");
        for (i, ordering) in plan.orderings.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.translate_expr(&ordering.expr, 0)?;
            self.out
                .push_str(if ordering.ascending { " asc" } else { " desc" });
        }
        Ok(())
    }

    // ------------------------------------------------------------
    // projection stage
    // ------------------------------------------------------------

    fn write_projection(&mut self, plan: &SelectPlan) -> CompileResult<()> {
        if plan.projections.is_empty() {
            return Ok(());
        }

        let has_row_number = plan
            .projections
            .iter()
            .any(|p| matches!(p.expr, ScalarExpr::RowNumber));

        // row numbers are only stable across later stages once the stream
        // is serialized
        if has_row_number {
            self.out.push_str("\n| serialize ");
        }

        self.out.push_str("\n| project ");

        let mut used_aliases: HashSet<String> = HashSet::new();
        let mut first = true;

        for projection in &plan.projections {
            if has_row_number && projection.alias.as_deref() == Some(ROW_VERSION_ALIAS) {
                continue;
            }

            if !first {
                self.out.push_str(", ");
            }
            first = false;

            self.write_projection_entry(projection, &mut used_aliases)?;
        }

        Ok(())
    }

    fn write_projection_entry(
        &mut self,
        projection: &Projection,
        used_aliases: &mut HashSet<String>,
    ) -> CompileResult<()> {
        if let Some(alias) = &projection.alias {
            let unique = make_unique_alias(alias, used_aliases);
            self.out.push_str(&unique);
            self.out.push_str(" = ");
        }

        match &projection.expr {
            ScalarExpr::RowNumber => {
                self.out.push_str("row_number(0)");
                Ok(())
            }
            expr => self.translate_expr(expr, 0),
        }
    }

    // ------------------------------------------------------------
    // skip stage
    // ------------------------------------------------------------

    /// KQL has no offset primitive: index the rows with a synthetic
    /// `row_number(1)` column and filter on it.
    fn write_skip(&mut self, plan: &SelectPlan) -> CompileResult<()> {
        let Some(offset) = &plan.offset else {
            return Ok(());
        };

        if plan.projections.is_empty() {
            // no projection stage to extend; serialize assigns the ordinal
            self.out.push_str("\n| serialize skip_index = row_number(1)");
        } else {
            self.out.push_str(", skip_index = row_number(1)");
        }
        self.out.push_str("\n| where skip_index > ");
        self.translate_expr(offset, 0)
    }

    // ------------------------------------------------------------
    // take stage
    // ------------------------------------------------------------

    fn write_take(&mut self, plan: &SelectPlan) -> CompileResult<()> {
        let Some(limit) = &plan.limit else {
            return Ok(());
        };

        // Inside a lateral-optional join the take becomes a per-key top-N
        // via the partition hint; the plain take stage is suppressed.
        let partition = match self.frames.last() {
            Some(frame) if frame.column.is_some() && frame.has_limit => Some((
                frame.column.clone().unwrap_or_default(),
                frame.orderings.clone(),
            )),
            _ => None,
        };

        if let Some((column, orderings)) = partition {
            self.out.push_str("\n| partition hint.strategy=native by ");
            self.out.push_str(&column);
            self.out.push_str(" (top ");
            self.translate_expr(limit, 0)?;

            if !orderings.is_empty() {
                self.out.push_str(" by ");
                for (i, ordering) in orderings.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.translate_expr(&ordering.expr, 0)?;
                    self.out
                        .push_str(if ordering.ascending { " asc" } else { " desc" });
                }
            }

            self.out.push(')');
            return Ok(());
        }

        self.out.push_str("\n| take ");
        self.translate_expr(limit, 0)
    }
}

/// Deduplicate projection aliases within one stage, case-insensitively,
/// suffixing `_1`, `_2`, ... in source order.
fn make_unique_alias(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_ascii_lowercase()) {
        return base.to_string();
    }

    let mut i = 1;
    loop {
        let candidate = format!("{}_{}", base, i);
        if used.insert(candidate.to_ascii_lowercase()) {
            return candidate;
        }
        i += 1;
    }
}

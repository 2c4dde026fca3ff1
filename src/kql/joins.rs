//! Join and lateral-join rewriting.
//!
//! Every table source after the first becomes a `join kind=leftouter`
//! stage. Simple joins carry their equality predicate directly; lateral
//! (apply) sources first have their correlation predicate extracted from
//! the inner plan, and outer-apply additionally folds the inner plan's
//! top-N into a partition hint keyed on the correlation column.

use crate::error::{CompileError, CompileResult};
use crate::plan::{BinaryOp, ScalarExpr, SelectPlan, TableSource};

use super::compiler::{KqlCompiler, PartitionFrame};
use super::correlation::find_correlation;

impl KqlCompiler {
    pub(crate) fn write_joined_source(&mut self, plan: &SelectPlan) -> CompileResult<()> {
        self.write_single_source(&plan.tables[0])?;

        for right in &plan.tables[1..] {
            self.out.push_str("\n| join kind=leftouter (");

            match right {
                TableSource::Join { on, .. } => {
                    self.write_single_source(right)?;
                    self.out.push_str(") on ");
                    self.write_join_predicate(on)?;
                }
                TableSource::OuterApply(inner) => self.write_outer_apply(inner)?,
                TableSource::CrossApply(inner) => self.write_cross_apply(inner)?,
                TableSource::Table(_) | TableSource::Raw(_) | TableSource::Subquery(_) => {
                    return Err(CompileError::unsupported(
                        "every table source after the first must be a join or a lateral join",
                    ));
                }
            }
        }

        Ok(())
    }

    /// Outer apply: per-outer-row subquery with preserved unmatched rows.
    /// The inner plan's take is intercepted by the partition frame and
    /// re-emitted as `partition hint.strategy=native by <key> (top N ...)`.
    fn write_outer_apply(&mut self, inner: &SelectPlan) -> CompileResult<()> {
        let Some((correlation, owner)) = find_correlation(inner)? else {
            return Err(CompileError::unsupported(
                "could not extract a correlation predicate from the lateral join",
            ));
        };

        let ScalarExpr::Binary { right, .. } = correlation else {
            // find_correlation only returns binary equalities
            return Err(CompileError::unsupported("malformed correlation predicate"));
        };
        let ScalarExpr::Column { name: key, .. } = &**right else {
            return Err(CompileError::unsupported(
                "correlation predicate right side must be a column",
            ));
        };

        self.frames.push(PartitionFrame {
            column: Some(key.clone()),
            orderings: owner.orderings.clone(),
            has_limit: owner.limit.is_some(),
            correlation: correlation.clone(),
        });

        let result = self.visit_select(inner);
        self.frames.pop();
        result?;

        self.out.push_str(") on ");
        self.write_join_predicate(correlation)
    }

    /// Cross apply: the correlation moves into the join predicate but no
    /// partition rewrite applies; otherwise compiles like a simple join.
    fn write_cross_apply(&mut self, inner: &SelectPlan) -> CompileResult<()> {
        let Some((correlation, _)) = find_correlation(inner)? else {
            return Err(CompileError::unsupported(
                "could not extract a correlation predicate from the lateral join",
            ));
        };
        let correlation = correlation.clone();

        self.frames.push(PartitionFrame {
            column: None,
            orderings: Vec::new(),
            has_limit: false,
            correlation: correlation.clone(),
        });

        let result = self.visit_select(inner);
        self.frames.pop();
        result?;

        self.out.push_str(") on ");
        self.write_join_predicate(&correlation)
    }

    /// Join predicates must be a single equality between two columns;
    /// each side gets the join-stage scope prefix.
    pub(crate) fn write_join_predicate(&mut self, predicate: &ScalarExpr) -> CompileResult<()> {
        let ScalarExpr::Binary {
            op: BinaryOp::Eq,
            left,
            right,
        } = predicate
        else {
            return Err(CompileError::unsupported(
                "join predicate must be a single column equality",
            ));
        };

        self.write_join_side(left, true)?;
        self.out.push_str(" == ");
        self.write_join_side(right, false)
    }

    fn write_join_side(&mut self, expr: &ScalarExpr, is_left: bool) -> CompileResult<()> {
        let ScalarExpr::Column { name, .. } = expr else {
            return Err(CompileError::unsupported(
                "join key must be a column reference",
            ));
        };

        self.out.push_str(if is_left { "$left." } else { "$right." });
        self.out.push_str(name);
        Ok(())
    }
}

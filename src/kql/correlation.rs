//! Correlation predicate extraction and cleanup for lateral joins.
//!
//! A lateral (apply) subplan carries its link to the outer row as an
//! ordinary equality inside its own filter. The extractor digs that
//! equality out so the join stage can use it; the cleaner removes it from
//! the residual filter where it can do so confidently.

use crate::error::{CompileError, CompileResult};
use crate::plan::{BinaryOp, ScalarExpr, SelectPlan, TableSource, UnaryOp};

use super::compiler::MAX_EXPR_DEPTH;

/// Find the correlation predicate of a lateral subplan: the first
/// column == column equality in left-to-right, depth-first order, looking
/// through and/or/not combinators. If the plan's own filter has none, the
/// search descends into nested subquery sources (the correlation may sit
/// below intermediate projections).
///
/// Returns the predicate together with the select node whose filter
/// contains it; that node's ordering and limit feed the partition rewrite.
///
/// Only the first match is returned. A plan with several
/// correlation-shaped equalities keeps the extras in its filter stage,
/// which is a known precision limitation carried over deliberately.
pub fn find_correlation(plan: &SelectPlan) -> CompileResult<Option<(&ScalarExpr, &SelectPlan)>> {
    if let Some(predicate) = &plan.predicate {
        if let Some(found) = find_in_expr(predicate, 0)? {
            return Ok(Some((found, plan)));
        }
    }

    for table in &plan.tables {
        if let TableSource::Subquery(nested) = table {
            if let Some(found) = find_correlation(nested)? {
                return Ok(Some(found));
            }
        }
    }

    Ok(None)
}

fn find_in_expr(expr: &ScalarExpr, depth: usize) -> CompileResult<Option<&ScalarExpr>> {
    if depth > MAX_EXPR_DEPTH {
        return Err(CompileError::DepthExceeded(MAX_EXPR_DEPTH));
    }

    match expr {
        ScalarExpr::Binary {
            op: BinaryOp::Eq,
            left,
            right,
        } if matches!(**left, ScalarExpr::Column { .. })
            && matches!(**right, ScalarExpr::Column { .. }) =>
        {
            Ok(Some(expr))
        }
        ScalarExpr::Binary { op, left, right } if op.is_logical() => {
            if let Some(found) = find_in_expr(left, depth + 1)? {
                return Ok(Some(found));
            }
            find_in_expr(right, depth + 1)
        }
        ScalarExpr::Unary {
            op: UnaryOp::Not,
            operand,
        } => find_in_expr(operand, depth + 1),
        _ => Ok(None),
    }
}

/// Remove an extracted correlation predicate from a filter tree.
///
/// Returns `None` when the correlation was the whole filter. Handles the
/// exact match, either operand of a top-level `and`, and one level of
/// reconstruction when exactly one side of an `and` cleanly reduced.
/// Anywhere the correlation cannot be confidently isolated (it sits under
/// an `or`, or both sides of an `and` shifted) the filter is returned
/// unchanged: the redundant term is also enforced by the join, so it is
/// harmless, whereas guessing could drop a real condition.
pub fn remove_correlation(
    predicate: &ScalarExpr,
    correlation: &ScalarExpr,
) -> Option<ScalarExpr> {
    if expr_eq(predicate, correlation) {
        return None;
    }

    if let ScalarExpr::Binary {
        op: BinaryOp::And,
        left,
        right,
    } = predicate
    {
        if expr_eq(left, correlation) {
            return Some((**right).clone());
        }
        if expr_eq(right, correlation) {
            return Some((**left).clone());
        }

        let cleaned_left = remove_correlation(left, correlation);
        let cleaned_right = remove_correlation(right, correlation);

        return match (cleaned_left, cleaned_right) {
            (None, cleaned) => Some(cleaned.unwrap_or_else(|| (**right).clone())),
            (cleaned, None) => Some(cleaned.unwrap_or_else(|| (**left).clone())),
            (Some(cl), Some(cr)) => {
                let left_changed = !expr_eq(&cl, left);
                let right_changed = !expr_eq(&cr, right);
                if left_changed != right_changed {
                    Some(ScalarExpr::and(cl, cr))
                } else {
                    Some(predicate.clone())
                }
            }
        };
    }

    Some(predicate.clone())
}

/// Structural equality over predicate trees: operators and column names,
/// not reference identity. Column type annotations are ignored so an
/// extracted predicate matches its occurrence in the filter even when the
/// planner attached looser typing on one side.
pub fn expr_eq(a: &ScalarExpr, b: &ScalarExpr) -> bool {
    match (a, b) {
        (
            ScalarExpr::Binary {
                op: op_a,
                left: la,
                right: ra,
            },
            ScalarExpr::Binary {
                op: op_b,
                left: lb,
                right: rb,
            },
        ) => op_a == op_b && expr_eq(la, lb) && expr_eq(ra, rb),
        (
            ScalarExpr::Unary {
                op: op_a,
                operand: oa,
            },
            ScalarExpr::Unary {
                op: op_b,
                operand: ob,
            },
        ) => op_a == op_b && expr_eq(oa, ob),
        (ScalarExpr::Column { name: na, .. }, ScalarExpr::Column { name: nb, .. }) => na == nb,
        _ => a == b,
    }
}

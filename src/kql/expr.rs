//! Scalar expression translation.
//!
//! Operators map to fixed textual tokens; the null tests are function
//! calls (`isnull`/`isnotnull`), and relational comparisons between two
//! string-typed operands go through `strcmp` because KQL defines no
//! ordering operators on text.

use crate::error::{CompileError, CompileResult};
use crate::plan::{BinaryOp, ScalarExpr, SelectPlan, UnaryOp, Value};

use super::compiler::{KqlCompiler, MAX_EXPR_DEPTH};
use super::literal::{format_literal, kql_type};
use super::{ParameterMode, QueryParameter};

impl KqlCompiler {
    pub(crate) fn translate_expr(&mut self, expr: &ScalarExpr, depth: usize) -> CompileResult<()> {
        if depth > MAX_EXPR_DEPTH {
            return Err(CompileError::DepthExceeded(MAX_EXPR_DEPTH));
        }

        match expr {
            ScalarExpr::Column { name, .. } => {
                self.out.push_str(name);
                Ok(())
            }
            ScalarExpr::Constant(value) => {
                self.out.push_str(&format_literal(value));
                Ok(())
            }
            ScalarExpr::Parameter { name, value } => {
                self.write_parameter(name, value);
                Ok(())
            }
            ScalarExpr::Unary { op, operand } => {
                let func = match op {
                    UnaryOp::IsNull => "isnull",
                    UnaryOp::IsNotNull => "isnotnull",
                    UnaryOp::Not => "not",
                };
                self.out.push_str(func);
                self.out.push('(');
                self.translate_expr(operand, depth + 1)?;
                self.out.push(')');
                Ok(())
            }
            ScalarExpr::Binary { op, left, right } => {
                self.translate_binary(*op, left, right, depth)
            }
            ScalarExpr::InList {
                item,
                values,
                negated,
            } => {
                self.translate_expr(item, depth + 1)?;
                self.out.push_str(if *negated { " !in (" } else { " in (" });
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.translate_expr(value, depth + 1)?;
                }
                self.out.push(')');
                Ok(())
            }
            // membership in a parameterized collection: parse it as a
            // structured value and test the element's array index
            ScalarExpr::InCollection { item, collection } => {
                self.out.push_str("array_index_of(parse_json(");
                self.translate_expr(collection, depth + 1)?;
                self.out.push_str("), ");
                self.translate_expr(item, depth + 1)?;
                self.out.push_str(") != -1");
                Ok(())
            }
            ScalarExpr::Exists(plan) => self.translate_exists(plan),
            ScalarExpr::RowNumber => {
                self.out.push_str("row_number(0)");
                Ok(())
            }
        }
    }

    fn translate_binary(
        &mut self,
        op: BinaryOp,
        left: &ScalarExpr,
        right: &ScalarExpr,
        depth: usize,
    ) -> CompileResult<()> {
        // string ordering comparisons rewrite through a three-way compare
        if op.is_relational() && left.is_string_typed() && right.is_string_typed() {
            self.out.push_str("strcmp(");
            self.translate_expr(left, depth + 1)?;
            self.out.push_str(", ");
            self.translate_expr(right, depth + 1)?;
            self.out.push_str(") ");
            self.out.push_str(operator_token(op));
            self.out.push_str(" 0");
            return Ok(());
        }

        self.translate_operand(left, op, depth)?;
        self.out.push(' ');
        self.out.push_str(operator_token(op));
        self.out.push(' ');
        self.translate_operand(right, op, depth)
    }

    fn translate_operand(
        &mut self,
        operand: &ScalarExpr,
        parent: BinaryOp,
        depth: usize,
    ) -> CompileResult<()> {
        if needs_parens(parent, operand) {
            self.out.push('(');
            self.translate_expr(operand, depth + 1)?;
            self.out.push(')');
            return Ok(());
        }
        self.translate_expr(operand, depth + 1)
    }

    /// Existence test: the subplan runs, is counted, and yields a single
    /// `1` when non-empty.
    fn translate_exists(&mut self, plan: &SelectPlan) -> CompileResult<()> {
        self.out.push_str("(\n");
        self.depth += 1;
        let result = self.write_stages(plan);
        self.depth -= 1;
        result?;
        self.out.push_str("\n| count | where Count > 0 | project 1");
        self.out.push_str("\n)");
        Ok(())
    }

    fn write_parameter(&mut self, name: &str, value: &Value) {
        match self.mode {
            ParameterMode::Inline => self.out.push_str(&format_literal(value)),
            ParameterMode::Declare => {
                self.out.push_str(name);
                if !self.parameters.iter().any(|p| p.name == name) {
                    self.parameters.push(QueryParameter {
                        name: name.to_string(),
                        kql_type: kql_type(value),
                        value: value.clone(),
                    });
                }
            }
        }
    }
}

fn operator_token(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Gt => ">",
        BinaryOp::Gte => ">=",
        BinaryOp::Lt => "<",
        BinaryOp::Lte => "<=",
        BinaryOp::And => "and",
        BinaryOp::Or => "or",
    }
}

/// An `or` under an `and` (or the reverse) keeps its own parentheses so
/// precedence survives the flat token stream.
fn needs_parens(parent: BinaryOp, child: &ScalarExpr) -> bool {
    if !parent.is_logical() {
        return false;
    }
    matches!(child, ScalarExpr::Binary { op, .. } if op.is_logical() && *op != parent)
}

//! Select pipeline tests: stages, pagination, projection, parameters.

use pretty_assertions::assert_eq;

use crate::error::CompileError;
use crate::kql::compiler::MAX_EXPR_DEPTH;
use crate::kql::{ParameterMode, QueryOptions, compile, compile_with_options};
use crate::plan::*;

fn text(plan: &SelectPlan) -> String {
    compile(plan).unwrap().text
}

#[test]
fn test_bare_table_scan_has_no_stages() {
    let plan = SelectPlan::table("Users");
    assert_eq!(text(&plan), "Users");
}

#[test]
fn test_degenerate_select_without_sources() {
    let plan = SelectPlan {
        projections: vec![Projection::aliased(ScalarExpr::constant(1i64), "One")],
        ..Default::default()
    };
    assert_eq!(text(&plan), "\n| project One = 1");
}

#[test]
fn test_raw_source_is_parenthesized() {
    let plan = SelectPlan {
        tables: vec![TableSource::Raw("Users | take 100".to_string())],
        ..Default::default()
    };
    assert_eq!(text(&plan), "(Users | take 100)");
}

#[test]
fn test_filter_stage() {
    let plan = SelectPlan {
        predicate: Some(ScalarExpr::eq(
            ScalarExpr::column("Active"),
            ScalarExpr::constant(true),
        )),
        ..SelectPlan::table("Users")
    };
    assert_eq!(text(&plan), "Users\n| where Active == true");
}

#[test]
fn test_stage_order_is_fixed() {
    let plan = SelectPlan {
        predicate: Some(ScalarExpr::eq(
            ScalarExpr::column("Active"),
            ScalarExpr::constant(true),
        )),
        orderings: vec![Ordering::desc(ScalarExpr::column("Score"))],
        projections: vec![
            Projection::aliased(ScalarExpr::column("Id"), "Id"),
            Projection::aliased(ScalarExpr::column("Name"), "Name"),
        ],
        limit: Some(ScalarExpr::constant(10i64)),
        ..SelectPlan::table("Users")
    };
    assert_eq!(
        text(&plan),
        "Users\n\
         | where Active == true\n\
         | order by Score desc\n\
         | project Id = Id, Name = Name\n\
         | take 10"
    );
}

#[test]
fn test_multiple_orderings() {
    let plan = SelectPlan {
        orderings: vec![
            Ordering::asc(ScalarExpr::column("Region")),
            Ordering::desc(ScalarExpr::column("Score")),
        ],
        ..SelectPlan::table("Users")
    };
    assert_eq!(text(&plan), "Users\n| order by Region asc, Score desc");
}

#[test]
fn test_offset_becomes_synthetic_row_number_filter() {
    let plan = SelectPlan {
        projections: vec![Projection::aliased(ScalarExpr::column("Id"), "Id")],
        offset: Some(ScalarExpr::constant(5i64)),
        ..SelectPlan::table("Users")
    };
    assert_eq!(
        text(&plan),
        "Users\n\
         | project Id = Id, skip_index = row_number(1)\n\
         | where skip_index > 5"
    );

    // removing the offset drops both the ordinal and its filter
    let without = SelectPlan {
        offset: None,
        ..plan
    };
    assert_eq!(text(&without), "Users\n| project Id = Id");
}

#[test]
fn test_offset_without_projection_stage() {
    let plan = SelectPlan {
        offset: Some(ScalarExpr::constant(20i64)),
        ..SelectPlan::table("Users")
    };
    assert_eq!(
        text(&plan),
        "Users\n\
         | serialize skip_index = row_number(1)\n\
         | where skip_index > 20"
    );
}

#[test]
fn test_duplicate_aliases_are_suffixed_in_source_order() {
    let plan = SelectPlan {
        projections: vec![
            Projection::aliased(ScalarExpr::column("A"), "X"),
            Projection::aliased(ScalarExpr::column("B"), "X"),
        ],
        ..SelectPlan::table("Users")
    };
    assert_eq!(text(&plan), "Users\n| project X = A, X_1 = B");
}

#[test]
fn test_alias_dedup_is_case_insensitive() {
    let plan = SelectPlan {
        projections: vec![
            Projection::aliased(ScalarExpr::column("A"), "name"),
            Projection::aliased(ScalarExpr::column("B"), "Name"),
        ],
        ..SelectPlan::table("Users")
    };
    assert_eq!(text(&plan), "Users\n| project name = A, Name_1 = B");
}

#[test]
fn test_row_number_projection_serializes_and_drops_row_version() {
    let plan = SelectPlan {
        projections: vec![
            Projection::aliased(ScalarExpr::column("Id"), "Id"),
            Projection::aliased(ScalarExpr::RowNumber, "rn"),
            Projection::aliased(ScalarExpr::column("Version"), "RowVersion"),
        ],
        ..SelectPlan::table("Users")
    };
    assert_eq!(
        text(&plan),
        "Users\n\
         | serialize \n\
         | project Id = Id, rn = row_number(0)"
    );
}

#[test]
fn test_nested_subquery_source_is_wrapped() {
    let inner = SelectPlan {
        predicate: Some(ScalarExpr::eq(
            ScalarExpr::column("Active"),
            ScalarExpr::constant(true),
        )),
        ..SelectPlan::table("Users")
    };
    let plan = SelectPlan {
        tables: vec![TableSource::Subquery(Box::new(inner))],
        limit: Some(ScalarExpr::constant(1i64)),
        ..Default::default()
    };
    assert_eq!(
        text(&plan),
        "(\nUsers\n| where Active == true\n)\n| take 1"
    );
}

#[test]
fn test_string_comparison_rewrites_to_strcmp() {
    let plan = SelectPlan {
        predicate: Some(ScalarExpr::binary(
            BinaryOp::Gt,
            ScalarExpr::string_column("FirstName"),
            ScalarExpr::string_column("LastName"),
        )),
        ..SelectPlan::table("Users")
    };
    assert_eq!(
        text(&plan),
        "Users\n| where strcmp(FirstName, LastName) > 0"
    );
}

#[test]
fn test_non_string_comparison_keeps_operator() {
    let plan = SelectPlan {
        predicate: Some(ScalarExpr::binary(
            BinaryOp::Gt,
            ScalarExpr::column("Age"),
            ScalarExpr::constant(21i64),
        )),
        ..SelectPlan::table("Users")
    };
    assert_eq!(text(&plan), "Users\n| where Age > 21");
}

#[test]
fn test_null_tests_render_as_functions() {
    let plan = SelectPlan {
        predicate: Some(ScalarExpr::Unary {
            op: UnaryOp::IsNull,
            operand: Box::new(ScalarExpr::column("Email")),
        }),
        ..SelectPlan::table("Users")
    };
    assert_eq!(text(&plan), "Users\n| where isnull(Email)");

    let plan = SelectPlan {
        predicate: Some(ScalarExpr::Unary {
            op: UnaryOp::Not,
            operand: Box::new(ScalarExpr::Unary {
                op: UnaryOp::IsNotNull,
                operand: Box::new(ScalarExpr::column("Email")),
            }),
        }),
        ..SelectPlan::table("Users")
    };
    assert_eq!(text(&plan), "Users\n| where not(isnotnull(Email))");
}

#[test]
fn test_or_group_keeps_parentheses_under_and() {
    let plan = SelectPlan {
        predicate: Some(ScalarExpr::and(
            ScalarExpr::or(
                ScalarExpr::eq(ScalarExpr::column("A"), ScalarExpr::constant(1i64)),
                ScalarExpr::eq(ScalarExpr::column("B"), ScalarExpr::constant(2i64)),
            ),
            ScalarExpr::eq(ScalarExpr::column("C"), ScalarExpr::constant(3i64)),
        )),
        ..SelectPlan::table("T")
    };
    assert_eq!(text(&plan), "T\n| where (A == 1 or B == 2) and C == 3");
}

#[test]
fn test_membership_in_literal_list() {
    let plan = SelectPlan {
        predicate: Some(ScalarExpr::InList {
            item: Box::new(ScalarExpr::column("Status")),
            values: vec![
                ScalarExpr::constant("open"),
                ScalarExpr::constant("pending"),
            ],
            negated: false,
        }),
        ..SelectPlan::table("Tickets")
    };
    assert_eq!(
        text(&plan),
        "Tickets\n| where Status in (\"open\", \"pending\")"
    );
}

#[test]
fn test_negated_membership() {
    let plan = SelectPlan {
        predicate: Some(ScalarExpr::InList {
            item: Box::new(ScalarExpr::column("Status")),
            values: vec![ScalarExpr::constant("closed")],
            negated: true,
        }),
        ..SelectPlan::table("Tickets")
    };
    assert_eq!(text(&plan), "Tickets\n| where Status !in (\"closed\")");
}

#[test]
fn test_membership_in_parameterized_collection() {
    let tags = serde_json::json!(["a", "b"]);
    let plan = SelectPlan {
        predicate: Some(ScalarExpr::InCollection {
            item: Box::new(ScalarExpr::column("Tag")),
            collection: Box::new(ScalarExpr::parameter("p_tags", tags)),
        }),
        ..SelectPlan::table("Posts")
    };
    assert_eq!(
        text(&plan),
        "Posts\n| where array_index_of(parse_json(dynamic([\"a\",\"b\"])), Tag) != -1"
    );
}

#[test]
fn test_exists_renders_counted_subquery() {
    let sub = SelectPlan {
        predicate: Some(ScalarExpr::eq(
            ScalarExpr::column("Kind"),
            ScalarExpr::constant("audit"),
        )),
        ..SelectPlan::table("Events")
    };
    let plan = SelectPlan {
        projections: vec![Projection::aliased(
            ScalarExpr::Exists(Box::new(sub)),
            "HasAudit",
        )],
        ..SelectPlan::table("Users")
    };
    assert_eq!(
        text(&plan),
        "Users\n\
         | project HasAudit = (\n\
         Events\n\
         | where Kind == \"audit\"\n\
         | count | where Count > 0 | project 1\n\
         )"
    );
}

#[test]
fn test_inline_parameter_mode_substitutes_literals() {
    let plan = SelectPlan {
        predicate: Some(ScalarExpr::binary(
            BinaryOp::Gt,
            ScalarExpr::column("Age"),
            ScalarExpr::parameter("p_min", 21i64),
        )),
        ..SelectPlan::table("Users")
    };
    let compiled = compile(&plan).unwrap();
    assert_eq!(compiled.text, "Users\n| where Age > 21");
    assert!(compiled.parameters.is_empty());
    assert_eq!(compiled.parameter_declaration(), None);
}

#[test]
fn test_declare_parameter_mode_collects_parameters() {
    let plan = SelectPlan {
        predicate: Some(ScalarExpr::and(
            ScalarExpr::binary(
                BinaryOp::Gt,
                ScalarExpr::column("Age"),
                ScalarExpr::parameter("p_min", 21i64),
            ),
            ScalarExpr::eq(
                ScalarExpr::column("Name"),
                ScalarExpr::parameter("p_name", "ada"),
            ),
        )),
        ..SelectPlan::table("Users")
    };
    let options = QueryOptions {
        parameter_mode: ParameterMode::Declare,
    };
    let compiled = compile_with_options(&plan, &options).unwrap();

    assert_eq!(compiled.text, "Users\n| where Age > p_min and Name == p_name");
    assert_eq!(compiled.parameters.len(), 2);
    assert_eq!(compiled.parameters[0].name, "p_min");
    assert_eq!(compiled.parameters[0].kql_type, "long");
    assert_eq!(compiled.parameters[1].kql_type, "string");
    assert_eq!(
        compiled.parameter_declaration().unwrap(),
        "declare query_parameters(p_min:long, p_name:string);"
    );
    assert_eq!(
        compiled.full_text(),
        "declare query_parameters(p_min:long, p_name:string);\n\
         Users\n\
         | where Age > p_min and Name == p_name"
    );
}

#[test]
fn test_repeated_parameter_is_declared_once() {
    let p = || ScalarExpr::parameter("p_val", 1i64);
    let plan = SelectPlan {
        predicate: Some(ScalarExpr::or(
            ScalarExpr::eq(ScalarExpr::column("A"), p()),
            ScalarExpr::eq(ScalarExpr::column("B"), p()),
        )),
        ..SelectPlan::table("T")
    };
    let options = QueryOptions {
        parameter_mode: ParameterMode::Declare,
    };
    let compiled = compile_with_options(&plan, &options).unwrap();
    assert_eq!(compiled.parameters.len(), 1);
}

#[test]
fn test_over_deep_predicate_exceeds_descent_budget() {
    let leaf = || ScalarExpr::eq(ScalarExpr::column("A"), ScalarExpr::constant(1i64));
    let predicate = (0..MAX_EXPR_DEPTH + 100).fold(leaf(), |acc, _| ScalarExpr::and(acc, leaf()));
    let plan = SelectPlan {
        predicate: Some(predicate),
        ..SelectPlan::table("T")
    };
    assert_eq!(
        compile(&plan),
        Err(CompileError::DepthExceeded(MAX_EXPR_DEPTH))
    );
}

#[test]
fn test_plan_is_not_mutated_by_compilation() {
    let plan = SelectPlan {
        predicate: Some(ScalarExpr::eq(
            ScalarExpr::column("Active"),
            ScalarExpr::constant(true),
        )),
        offset: Some(ScalarExpr::constant(3i64)),
        projections: vec![Projection::aliased(ScalarExpr::column("Id"), "Id")],
        ..SelectPlan::table("Users")
    };
    let snapshot = plan.clone();
    let _ = compile(&plan).unwrap();
    let _ = compile(&plan).unwrap();
    assert_eq!(plan, snapshot);
}

//! Elimination behavior around variable declarators and destructuring
//! patterns: pruning dead bindings while preserving every observable
//! evaluation the extraction performs.

mod common;

use common::*;
use jshake_core::ast::statement::Statement;
use jshake_core::diagnostics::{CollectingDiagnosticHandler, DiagnosticHandler};
use jshake_core::{EliminationDecision, ShakeOptions, SymbolKind, TreeShaker};
use std::sync::Arc;

#[test]
fn test_unused_pure_binding_is_removed() {
    let mut b = UnitBuilder::new();
    let a = b.declare("a", SymbolKind::Let);
    let pattern = b.pat("a", a);
    let init = b.num(1.0);
    b.let_binding(pattern, init);
    let (program, symbols) = b.finish();

    let output = shake(program, &symbols);
    assert!(
        output.program.statements.is_empty(),
        "pure unused binding should vanish entirely"
    );
}

#[test]
fn test_unused_binding_with_effectful_initializer_is_hoisted() {
    let mut b = UnitBuilder::new();
    let x = b.declare("x", SymbolKind::Let);
    let pattern = b.pat("x", x);
    let init = b.effect("sideEffect");
    b.let_binding(pattern, init);
    let (program, symbols) = b.finish();

    let output = shake(program, &symbols);
    assert!(declared_names(&output.program).is_empty());
    assert_eq!(call_trace(&output.program), vec!["sideEffect"]);
}

#[test]
fn test_used_binding_survives() {
    let mut b = UnitBuilder::new();
    let a = b.declare("a", SymbolKind::Let);
    let pattern = b.pat("a", a);
    let init = b.num(1.0);
    b.let_binding(pattern, init);
    let read = b.read("a", a);
    b.statement(read);
    let (program, symbols) = b.finish();

    let output = shake(program, &symbols);
    assert_eq!(declared_names(&output.program), vec!["a"]);
}

#[test]
fn test_unused_property_pruned_from_known_source() {
    let mut b = UnitBuilder::new();
    let a = b.declare("a", SymbolKind::Let);
    let c = b.declare("c", SymbolKind::Let);
    let pat_a = b.pat("a", a);
    let pat_c = b.pat("c", c);
    let prop_a = b.prop("a", pat_a);
    let prop_b = b.prop("b", pat_c);
    let pattern = b.obj_pat(vec![prop_a, prop_b]);
    let one = b.num(1.0);
    let two = b.num(2.0);
    let m_a = b.data("a", one);
    let m_b = b.data("b", two);
    let init = b.object(vec![m_a, m_b]);
    b.let_binding(pattern, init);
    let read = b.read("a", a);
    b.statement(read);
    let (program, symbols) = b.finish();

    let output = shake(program, &symbols);
    assert_eq!(
        declared_names(&output.program),
        vec!["a"],
        "only the read binding should remain in the pattern"
    );
    assert!(call_trace(&output.program).is_empty());
}

#[test]
fn test_nested_pattern_sibling_pruned() {
    let mut b = UnitBuilder::new();
    let x = b.declare("x", SymbolKind::Let);
    let y = b.declare("y", SymbolKind::Let);
    let pat_x = b.pat("x", x);
    let pat_y = b.pat("y", y);
    let inner_x = b.prop("x", pat_x);
    let inner_y = b.prop("y", pat_y);
    let inner = b.obj_pat(vec![inner_x, inner_y]);
    let outer_prop = b.prop("a", inner);
    let pattern = b.obj_pat(vec![outer_prop]);

    let one = b.num(1.0);
    let two = b.num(2.0);
    let m_x = b.data("x", one);
    let m_y = b.data("y", two);
    let inner_obj = b.object(vec![m_x, m_y]);
    let m_a = b.data("a", inner_obj);
    let init = b.object(vec![m_a]);
    b.let_binding(pattern, init);
    let read = b.read("x", x);
    b.statement(read);
    let (program, symbols) = b.finish();

    let output = shake(program, &symbols);
    assert_eq!(declared_names(&output.program), vec!["x"]);
}

#[test]
fn test_provably_dead_default_allows_removal() {
    // The key is present with a non-undefined value, so the effectful
    // default can never run and the unused binding drops cleanly.
    let mut b = UnitBuilder::new();
    let d = b.declare("d", SymbolKind::Let);
    let pat_d = b.pat("d", d);
    let default = b.effect("neverRuns");
    let prop = b.prop_with_default("d", pat_d, default);
    let pattern = b.obj_pat(vec![prop]);
    let three = b.num(3.0);
    let m_d = b.data("d", three);
    let init = b.object(vec![m_d]);
    b.let_binding(pattern, init);
    let (program, symbols) = b.finish();

    let output = shake(program, &symbols);
    assert!(output.program.statements.is_empty());
    assert!(call_trace(&output.program).is_empty());
}

#[test]
fn test_effectful_default_on_absent_key_keeps_declarator() {
    let mut b = UnitBuilder::new();
    let d = b.declare("d", SymbolKind::Let);
    let pat_d = b.pat("d", d);
    let default = b.effect("computeDefault");
    let prop = b.prop_with_default("d", pat_d, default);
    let pattern = b.obj_pat(vec![prop]);
    let init = b.object(vec![]);
    let declarator = b.declarator(pattern, Some(init));
    let declarator_id = declarator.id;
    b.let_declarators(vec![declarator]);
    let (program, symbols) = b.finish();

    let output = shake(program, &symbols);
    assert_eq!(declared_names(&output.program), vec!["d"]);
    assert_eq!(
        output.report.decision_for(declarator_id),
        Some(EliminationDecision::Keep),
        "a default that may fire pins the whole extraction"
    );
}

#[test]
fn test_effectful_computed_key_is_hoisted() {
    let mut b = UnitBuilder::new();
    let e = b.declare("e", SymbolKind::Let);
    let pat_e = b.pat("e", e);
    let key = b.effect("keyFn");
    let prop = b.prop_computed(key, pat_e);
    let pattern = b.obj_pat(vec![prop]);
    let init = b.object(vec![]);
    b.let_binding(pattern, init);
    let (program, symbols) = b.finish();

    let output = shake(program, &symbols);
    assert!(declared_names(&output.program).is_empty());
    assert_eq!(
        call_trace(&output.program),
        vec!["keyFn"],
        "the computed key evaluates exactly once even without the binding"
    );
}

#[test]
fn test_unknown_shape_source_is_kept_whole() {
    let mut b = UnitBuilder::new();
    let external = b.declare("input", SymbolKind::External);
    let g = b.declare("g", SymbolKind::Let);
    let pat_g = b.pat("g", g);
    let prop = b.prop("g", pat_g);
    let pattern = b.obj_pat(vec![prop]);
    let init = b.read("input", external);
    let declarator = b.declarator(pattern, Some(init));
    let declarator_id = declarator.id;
    b.let_declarators(vec![declarator]);
    let (program, symbols) = b.finish();

    let output = shake(program, &symbols);
    assert_eq!(
        declared_names(&output.program),
        vec!["g"],
        "property reads on an opaque source may run getters"
    );
    assert_eq!(
        output.report.decision_for(declarator_id),
        Some(EliminationDecision::Keep)
    );
}

#[test]
fn test_duplicate_binding_reports_error_and_is_untouched() {
    let mut b = UnitBuilder::new();
    let x1 = b.declare("x", SymbolKind::Let);
    let x2 = b.declare("x", SymbolKind::Let);
    let pat1 = b.pat("x", x1);
    let pat2 = b.pat("x", x2);
    let prop_a = b.prop("a", pat1);
    let prop_b = b.prop("b", pat2);
    let pattern = b.obj_pat(vec![prop_a, prop_b]);
    let one = b.num(1.0);
    let two = b.num(2.0);
    let m_a = b.data("a", one);
    let m_b = b.data("b", two);
    let init = b.object(vec![m_a, m_b]);
    b.let_binding(pattern, init);
    let (program, symbols) = b.finish();

    let handler = Arc::new(CollectingDiagnosticHandler::new());
    let shaker = TreeShaker::new(ShakeOptions::default(), handler.clone());
    let output = shaker
        .shake(program, &symbols)
        .expect("structural errors recover locally");

    assert!(handler.has_errors());
    assert_eq!(
        declared_names(&output.program),
        vec!["x", "x"],
        "a malformed declarator is left exactly as written"
    );
}

#[test]
fn test_dead_store_removed_with_binding() {
    let mut b = UnitBuilder::new();
    let a = b.declare("a", SymbolKind::Let);
    let pattern = b.pat("a", a);
    let init = b.num(1.0);
    b.let_binding(pattern, init);
    let two = b.num(2.0);
    b.assign("a", a, two);
    let (program, symbols) = b.finish();

    let output = shake(program, &symbols);
    assert!(
        output.program.statements.is_empty(),
        "stores into a never-read binding are dead"
    );
}

#[test]
fn test_dead_store_keeps_effectful_value() {
    let mut b = UnitBuilder::new();
    let a = b.declare("a", SymbolKind::Let);
    let pattern = b.pat("a", a);
    let init = b.num(1.0);
    b.let_binding(pattern, init);
    let value = b.effect("produce");
    b.assign("a", a, value);
    let (program, symbols) = b.finish();

    let output = shake(program, &symbols);
    assert!(declared_names(&output.program).is_empty());
    assert_eq!(call_trace(&output.program), vec!["produce"]);
}

#[test]
fn test_declaration_splits_around_hoisted_effect() {
    let mut b = UnitBuilder::new();
    let a = b.declare("a", SymbolKind::Let);
    let x = b.declare("x", SymbolKind::Let);
    let c = b.declare("c", SymbolKind::Let);
    let pat_a = b.pat("a", a);
    let pat_x = b.pat("x", x);
    let pat_c = b.pat("c", c);
    let one = b.num(1.0);
    let eff = b.effect("middle");
    let two = b.num(2.0);
    let d1 = b.declarator(pat_a, Some(one));
    let d2 = b.declarator(pat_x, Some(eff));
    let d3 = b.declarator(pat_c, Some(two));
    b.let_declarators(vec![d1, d2, d3]);
    let read = b.read("c", c);
    b.statement(read);
    let (program, symbols) = b.finish();

    let output = shake(program, &symbols);
    assert_eq!(declared_names(&output.program), vec!["c"]);
    assert_eq!(call_trace(&output.program), vec!["middle"]);
    assert!(
        matches!(output.program.statements[0], Statement::Expression(_)),
        "the hoisted effect must precede the surviving declarators"
    );
    assert!(matches!(output.program.statements[1], Statement::Variable(_)));
}

#[test]
fn test_exported_binding_never_dropped() {
    let mut b = UnitBuilder::new();
    let a = b.declare_exported("a", SymbolKind::Const);
    let pattern = b.pat("a", a);
    let init = b.num(1.0);
    b.let_binding(pattern, init);
    let (program, symbols) = b.finish();

    let output = shake(program, &symbols);
    assert_eq!(declared_names(&output.program), vec!["a"]);
}

#[test]
fn test_shaking_disabled_leaves_unit_alone() {
    let mut b = UnitBuilder::new();
    let a = b.declare("a", SymbolKind::Let);
    let pattern = b.pat("a", a);
    let init = b.num(1.0);
    b.let_binding(pattern, init);
    let (program, symbols) = b.finish();

    let options = ShakeOptions {
        shake_bindings: false,
        ..ShakeOptions::default()
    };
    let output = shake_with(options, program, &symbols);
    assert_eq!(declared_names(&output.program), vec!["a"]);
}

//! Elimination planning.
//!
//! Consumes the binder's records and the usage map and assigns each
//! eliminable node a decision. The planner never mutates the tree; it also
//! precomputes, for every binding dropped with effect preservation, the
//! ordered expressions the rewriter must hoist in evaluation order.

use crate::ast::expression::{
    ArrayElement, ArrowBody, Expression, ExpressionKind, ObjectExpression, ObjectMember,
    Parameter, PropertyKey,
};
use crate::ast::pattern::{Pattern, PatternKind};
use crate::ast::statement::{Statement, VariableDeclarator};
use crate::ast::{NodeId, Program};
use crate::config::ShakeOptions;
use crate::shaker::bind::BoundPattern;
use crate::shaker::classify::Classifier;
use crate::shaker::usage::{PatternUse, UsageMap};
use crate::symbols::{SymbolId, SymbolTable};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EliminationDecision {
    Keep,
    DropBindingKeepEffect,
    DropEntirely,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    pub node_id: NodeId,
    pub decision: EliminationDecision,
    pub reason: String,
}

/// Machine-readable account of everything the shaker decided, including
/// keeps that were downgrades from a possible drop.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShakeReport {
    pub entries: Vec<ReportEntry>,
}

impl ShakeReport {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn decision_for(&self, node_id: NodeId) -> Option<EliminationDecision> {
        self.entries
            .iter()
            .find(|entry| entry.node_id == node_id)
            .map(|entry| entry.decision)
    }

    pub fn extend(&mut self, other: ShakeReport) {
        self.entries.extend(other.entries);
    }
}

#[derive(Debug, Default)]
pub struct ShakePlan {
    /// Insertion-ordered so obligations and diagnostics come out in plan
    /// order run after run.
    decisions: IndexMap<NodeId, EliminationDecision>,
    /// Effectful expressions to emit as statements, in evaluation order, in
    /// place of a node dropped with effect preservation.
    hoists: IndexMap<NodeId, Vec<Expression>>,
    pub report: ShakeReport,
}

impl ShakePlan {
    pub fn decision(&self, node_id: NodeId) -> EliminationDecision {
        self.decisions
            .get(&node_id)
            .copied()
            .unwrap_or(EliminationDecision::Keep)
    }

    pub fn hoisted(&self, node_id: NodeId) -> &[Expression] {
        self.hoists.get(&node_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_work(&self) -> bool {
        !self.decisions.is_empty()
    }

    /// Every node the rewriter is obliged to act on.
    pub fn actionable_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.decisions.keys().copied()
    }

    fn decide(&mut self, node_id: NodeId, decision: EliminationDecision, reason: &str) {
        if decision != EliminationDecision::Keep {
            self.decisions.insert(node_id, decision);
        }
        self.report.entries.push(ReportEntry {
            node_id,
            decision,
            reason: reason.to_owned(),
        });
    }
}

pub fn plan_program(
    program: &Program,
    symbols: &SymbolTable,
    options: &ShakeOptions,
    classifier: &Classifier<'_>,
    binds: &FxHashMap<NodeId, BoundPattern>,
    usage: &UsageMap,
) -> ShakePlan {
    let mut planner = Planner {
        symbols,
        options,
        classifier,
        binds,
        usage,
        plan: ShakePlan::default(),
    };
    planner.plan_statements(&program.statements);
    planner.plan
}

struct Planner<'a> {
    symbols: &'a SymbolTable,
    options: &'a ShakeOptions,
    classifier: &'a Classifier<'a>,
    binds: &'a FxHashMap<NodeId, BoundPattern>,
    usage: &'a UsageMap,
    plan: ShakePlan,
}

impl<'a> Planner<'a> {
    fn plan_statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            match statement {
                Statement::Variable(decl) => {
                    for declarator in &decl.declarators {
                        self.plan_declarator(declarator, decl.is_exported);
                    }
                }
                Statement::Function(function) => {
                    let exported =
                        function.is_exported || self.symbols.get(function.symbol).is_exported;
                    if self.options.shake_bindings
                        && !exported
                        && !self.usage.is_read(function.symbol)
                    {
                        self.plan
                            .decide(function.id, EliminationDecision::DropEntirely, "never used");
                    } else {
                        self.plan_parameters(&function.parameters);
                        self.plan_statements(&function.body.statements);
                    }
                }
                Statement::Expression(stmt) => {
                    if !self.plan_dead_store(stmt.id, &stmt.expression) {
                        self.plan_expr(&stmt.expression);
                    }
                }
                Statement::If(stmt) => {
                    self.plan_expr(&stmt.condition);
                    self.plan_statements(&stmt.then_block.statements);
                    if let Some(else_block) = &stmt.else_block {
                        self.plan_statements(&else_block.statements);
                    }
                }
                Statement::While(stmt) => {
                    self.plan_expr(&stmt.condition);
                    self.plan_statements(&stmt.body.statements);
                }
                Statement::Return(stmt) => {
                    if let Some(value) = &stmt.value {
                        self.plan_expr(value);
                    }
                }
                Statement::Block(block) => self.plan_statements(&block.statements),
                Statement::Opaque(_) => {}
            }
        }
    }

    fn plan_declarator(&mut self, declarator: &VariableDeclarator, exported: bool) {
        let Some(bound) = self.binds.get(&declarator.id) else {
            self.plan_initializer(declarator);
            return;
        };
        if bound.is_malformed() {
            // Left exactly as written, including its source literal;
            // diagnostics were already emitted. Nested bodies still get
            // planned.
            if let Some(init) = &declarator.initializer {
                self.plan_expr(init);
            }
            return;
        }
        let exported = exported
            || bound
                .records
                .iter()
                .any(|record| self.symbols.get(record.symbol).is_exported);
        let any_used = exported
            || bound
                .records
                .iter()
                .any(|record| self.usage.is_read(record.symbol));

        if !self.options.shake_bindings || any_used {
            self.plan_kept_declarator(declarator, bound, exported);
            return;
        }

        // Every bound name is dead; decide what the extraction still owes.
        if bound.has_opaque_reads() {
            self.plan.decide(
                declarator.id,
                EliminationDecision::Keep,
                "source shape unknown",
            );
            self.plan_initializer(declarator);
            return;
        }
        if bound.has_effectful_defaults() {
            self.plan.decide(
                declarator.id,
                EliminationDecision::Keep,
                "default value may have side effects",
            );
            self.plan_initializer(declarator);
            return;
        }
        let init_effectful = declarator
            .initializer
            .as_ref()
            .map(|init| !self.classifier.classify(init).is_pure())
            .unwrap_or(false);
        if init_effectful || bound.has_effectful_computed_keys() {
            let hoists = self.hoist_exprs(declarator);
            self.plan.decide(
                declarator.id,
                EliminationDecision::DropBindingKeepEffect,
                "unused binding; effects preserved",
            );
            self.report_discarded_literal(declarator.initializer.as_ref());
            self.plan.hoists.insert(declarator.id, hoists);
        } else {
            self.plan
                .decide(declarator.id, EliminationDecision::DropEntirely, "never used");
        }
    }

    fn plan_kept_declarator(
        &mut self,
        declarator: &VariableDeclarator,
        bound: &BoundPattern,
        exported: bool,
    ) {
        if self.options.shake_bindings {
            let rollup = PatternUse::rollup(bound, self.usage, exported);
            self.prune_pattern(&declarator.pattern, &rollup);
        }
        self.plan_initializer(declarator);
    }

    fn plan_initializer(&mut self, declarator: &VariableDeclarator) {
        let Some(init) = &declarator.initializer else {
            return;
        };
        match resolved_literal(init) {
            Some(object) => self.plan_kept_literal(object),
            None => self.plan_expr(init),
        }
    }

    /// Drop the topmost dead removable pattern properties; below a dropped
    /// property nothing else needs a decision.
    fn prune_pattern(&mut self, pattern: &Pattern, rollup: &PatternUse) {
        match &pattern.kind {
            PatternKind::Identifier(_) => {}
            PatternKind::Object(object) => {
                for property in &object.properties {
                    if rollup.subtree_kept(property.id) {
                        self.prune_pattern(&property.value, rollup);
                    } else {
                        self.plan
                            .decide(property.id, EliminationDecision::DropEntirely, "never used");
                    }
                }
                if let Some(rest) = &object.rest {
                    self.prune_pattern(rest, rollup);
                }
            }
            PatternKind::Array(array) => {
                for element in array.elements.iter().flatten() {
                    if rollup.subtree_kept(element.id) {
                        self.prune_pattern(&element.pattern, rollup);
                    } else {
                        self.plan
                            .decide(element.id, EliminationDecision::DropEntirely, "never used");
                    }
                }
            }
        }
    }

    /// Whole-variable store into a name that is never read anywhere in the
    /// unit. Returns false when the statement is not such a store.
    fn plan_dead_store(&mut self, statement_id: NodeId, expr: &Expression) -> bool {
        if !self.options.shake_bindings {
            return false;
        }
        let ExpressionKind::Assignment(op, target, value) = &expr.kind else {
            return false;
        };
        if op.reads_target() {
            return false;
        }
        let ExpressionKind::Identifier(ident) = &target.kind else {
            return false;
        };
        let Some(symbol) = ident.symbol else {
            return false;
        };
        if !self.is_dead_local(symbol) {
            return false;
        }
        if self.classifier.classify(value).is_pure() {
            self.plan
                .decide(statement_id, EliminationDecision::DropEntirely, "dead store");
        } else {
            let mut hoists = Vec::new();
            self.hoist_from_expr(value, &mut hoists);
            self.plan.decide(
                statement_id,
                EliminationDecision::DropBindingKeepEffect,
                "dead store; effects preserved",
            );
            self.plan.hoists.insert(statement_id, hoists);
        }
        true
    }

    fn is_dead_local(&self, symbol: SymbolId) -> bool {
        let info = self.symbols.get(symbol);
        use crate::symbols::SymbolKind;
        let local = matches!(
            info.kind,
            SymbolKind::Let | SymbolKind::Var | SymbolKind::Const
        );
        local && !info.is_exported && !self.usage.is_read(symbol)
    }

    // -- object literal members -------------------------------------------

    /// Member decisions for a literal whose binding survives. Shadowed
    /// definitions are dead regardless of usage; live definitions stay only
    /// if their key can still be touched.
    fn plan_kept_literal(&mut self, object: &ObjectExpression) {
        if !self.options.shake_object_members
            || self.usage.is_escaped(object.id)
            || self.usage.facts.is_dynamic(object.id)
        {
            self.recurse_literal(object);
            return;
        }

        let live = live_member_indices(object);
        for (index, member) in object.members.iter().enumerate() {
            let Some(key) = member.static_key() else {
                // Unreachable for non-dynamic literals; kept for safety.
                self.recurse_member(member);
                continue;
            };
            let key = key.to_owned();
            if member.is_accessor() && !self.options.shake_accessors {
                self.recurse_member(member);
                continue;
            }
            if !live.contains(&index) {
                self.plan_shadowed_member(member);
                continue;
            }
            if self.usage.key_touched(object.id, &key) {
                self.recurse_member(member);
                continue;
            }
            // Live definition of a key nothing touches.
            match member {
                ObjectMember::Data { id, value, .. } => {
                    if self.classifier.classify(value).is_pure() {
                        self.plan
                            .decide(*id, EliminationDecision::DropEntirely, "key never accessed");
                    } else {
                        self.plan.decide(
                            *id,
                            EliminationDecision::Keep,
                            "value may have side effects",
                        );
                        self.plan_expr(value);
                    }
                }
                ObjectMember::Shorthand { id, .. } => {
                    self.plan
                        .decide(*id, EliminationDecision::DropEntirely, "key never accessed");
                }
                ObjectMember::Getter { id, .. } | ObjectMember::Setter { id, .. } => {
                    self.plan
                        .decide(*id, EliminationDecision::DropEntirely, "key never accessed");
                }
                ObjectMember::Spread { .. } => self.recurse_member(member),
            }
        }
    }

    fn plan_shadowed_member(&mut self, member: &ObjectMember) {
        match member {
            ObjectMember::Data { id, value, .. } => {
                // The value still evaluates at construction; only a pure one
                // can vanish with its dead definition.
                if self.classifier.classify(value).is_pure() {
                    self.plan.decide(
                        *id,
                        EliminationDecision::DropEntirely,
                        "shadowed by a later definition",
                    );
                } else {
                    self.plan.decide(
                        *id,
                        EliminationDecision::Keep,
                        "value may have side effects",
                    );
                    self.plan_expr(value);
                }
            }
            ObjectMember::Shorthand { id, .. } => {
                self.plan.decide(
                    *id,
                    EliminationDecision::DropEntirely,
                    "shadowed by a later definition",
                );
            }
            ObjectMember::Getter { id, .. } | ObjectMember::Setter { id, .. } => {
                // Accessor bodies never run at construction.
                self.plan.decide(
                    *id,
                    EliminationDecision::DropEntirely,
                    "shadowed by a later definition",
                );
            }
            ObjectMember::Spread { .. } => self.recurse_member(member),
        }
    }

    fn recurse_literal(&mut self, object: &ObjectExpression) {
        for member in &object.members {
            self.recurse_member(member);
        }
    }

    fn recurse_member(&mut self, member: &ObjectMember) {
        match member {
            ObjectMember::Data { key, value, .. } => {
                if let PropertyKey::Computed(key_expr) = key {
                    self.plan_expr(key_expr);
                }
                match resolved_literal(value) {
                    Some(child) => self.plan_kept_literal(child),
                    None => self.plan_expr(value),
                }
            }
            ObjectMember::Shorthand { .. } => {}
            ObjectMember::Getter { key, body, .. } | ObjectMember::Setter { key, body, .. } => {
                if let PropertyKey::Computed(key_expr) = key {
                    self.plan_expr(key_expr);
                }
                self.plan_statements(&body.statements);
            }
            ObjectMember::Spread { value, .. } => self.plan_expr(value),
        }
    }

    /// Report-only entries for the members of a construction that is being
    /// discarded wholesale. The rewriter acts on the declarator, not on
    /// these, so they never enter the decision map.
    fn report_discarded_literal(&mut self, initializer: Option<&Expression>) {
        let Some(object) = initializer.and_then(resolved_literal) else {
            return;
        };
        for member in &object.members {
            match member {
                ObjectMember::Data { id, key, value, .. } => {
                    let key_effectful = match key {
                        PropertyKey::Computed(key_expr) => {
                            !self.classifier.classify(key_expr).is_pure()
                        }
                        PropertyKey::Static(_) => false,
                    };
                    if key_effectful || !self.classifier.classify(value).is_pure() {
                        self.plan.report.entries.push(ReportEntry {
                            node_id: *id,
                            decision: EliminationDecision::DropBindingKeepEffect,
                            reason: "construction discarded; effects preserved".to_owned(),
                        });
                    } else {
                        self.plan.report.entries.push(ReportEntry {
                            node_id: *id,
                            decision: EliminationDecision::DropEntirely,
                            reason: "construction discarded".to_owned(),
                        });
                    }
                }
                ObjectMember::Shorthand { id, .. }
                | ObjectMember::Getter { id, .. }
                | ObjectMember::Setter { id, .. }
                | ObjectMember::Spread { id, .. } => {
                    self.plan.report.entries.push(ReportEntry {
                        node_id: *id,
                        decision: EliminationDecision::DropEntirely,
                        reason: "construction discarded".to_owned(),
                    });
                }
            }
        }
    }

    // -- hoisting ----------------------------------------------------------

    /// Expressions that must survive a dropped declarator, in evaluation
    /// order: the initializer's effects first, then effectful computed keys
    /// in pattern order. Key reads and defaults are provably pure here or
    /// the declarator would not have been droppable.
    fn hoist_exprs(&self, declarator: &VariableDeclarator) -> Vec<Expression> {
        let mut out = Vec::new();
        if let Some(init) = &declarator.initializer {
            self.hoist_from_expr(init, &mut out);
        }
        self.hoist_pattern_keys(&declarator.pattern, &mut out);
        out
    }

    fn hoist_from_expr(&self, expr: &Expression, out: &mut Vec<Expression>) {
        if self.classifier.classify(expr).is_pure() {
            return;
        }
        match &expr.kind {
            ExpressionKind::Object(object) if self.decomposable(object) => {
                for member in &object.members {
                    match member {
                        ObjectMember::Data { key, value, .. } => {
                            if let PropertyKey::Computed(key_expr) = key {
                                self.hoist_from_expr(key_expr, out);
                            }
                            self.hoist_from_expr(value, out);
                        }
                        ObjectMember::Getter { key, .. } | ObjectMember::Setter { key, .. } => {
                            if let PropertyKey::Computed(key_expr) = key {
                                self.hoist_from_expr(key_expr, out);
                            }
                        }
                        // Shorthand reads are pure; decomposable spreads are
                        // pure to enumerate.
                        ObjectMember::Shorthand { .. } | ObjectMember::Spread { .. } => {}
                    }
                }
            }
            ExpressionKind::Parenthesized(inner) => self.hoist_from_expr(inner, out),
            ExpressionKind::Sequence(parts) => {
                for part in parts {
                    self.hoist_from_expr(part, out);
                }
            }
            _ => out.push(expr.clone()),
        }
    }

    /// A literal can be taken apart member by member only when dropping the
    /// construction itself loses nothing: spreads must be pure to enumerate
    /// and nested literals must decompose in turn.
    fn decomposable(&self, object: &ObjectExpression) -> bool {
        object.members.iter().all(|member| match member {
            ObjectMember::Spread { value, .. } => self.classifier.classify(value).is_pure_known(),
            ObjectMember::Data { value, .. } => match &value.kind {
                ExpressionKind::Object(child) => self.decomposable(child),
                _ => true,
            },
            ObjectMember::Shorthand { .. }
            | ObjectMember::Getter { .. }
            | ObjectMember::Setter { .. } => true,
        })
    }

    fn hoist_pattern_keys(&self, pattern: &Pattern, out: &mut Vec<Expression>) {
        match &pattern.kind {
            PatternKind::Identifier(_) => {}
            PatternKind::Object(object) => {
                for property in &object.properties {
                    if let PropertyKey::Computed(key_expr) = &property.key {
                        if !self.classifier.classify(key_expr).is_pure() {
                            out.push((**key_expr).clone());
                        }
                    }
                    self.hoist_pattern_keys(&property.value, out);
                }
                if let Some(rest) = &object.rest {
                    self.hoist_pattern_keys(rest, out);
                }
            }
            PatternKind::Array(array) => {
                for element in array.elements.iter().flatten() {
                    self.hoist_pattern_keys(&element.pattern, out);
                }
            }
        }
    }

    // -- generic recursion -------------------------------------------------

    fn plan_parameters(&mut self, parameters: &[Parameter]) {
        for parameter in parameters {
            if let Some(default) = &parameter.default {
                self.plan_expr(default);
            }
        }
    }

    /// Descend into nested function bodies so their statements get planned;
    /// expressions themselves carry no statement-level decisions.
    fn plan_expr(&mut self, expr: &Expression) {
        match &expr.kind {
            ExpressionKind::Identifier(_)
            | ExpressionKind::Literal(_)
            | ExpressionKind::Opaque(_) => {}
            ExpressionKind::Binary(_, left, right) => {
                self.plan_expr(left);
                self.plan_expr(right);
            }
            ExpressionKind::Unary(_, operand) => self.plan_expr(operand),
            ExpressionKind::Assignment(_, target, value) => {
                self.plan_expr(target);
                self.plan_expr(value);
            }
            ExpressionKind::Member(member) => {
                self.plan_expr(&member.object);
                if let PropertyKey::Computed(key) = &member.property {
                    self.plan_expr(key);
                }
            }
            ExpressionKind::Call(callee, args) | ExpressionKind::New(callee, args) => {
                self.plan_expr(callee);
                for arg in args {
                    self.plan_expr(&arg.value);
                }
            }
            ExpressionKind::Object(object) => self.recurse_literal(object),
            ExpressionKind::Array(elements) => {
                for element in elements {
                    match element {
                        ArrayElement::Expression(value) | ArrayElement::Spread(value) => {
                            self.plan_expr(value)
                        }
                        ArrayElement::Hole => {}
                    }
                }
            }
            ExpressionKind::Function(function) => {
                self.plan_parameters(&function.parameters);
                self.plan_statements(&function.body.statements);
            }
            ExpressionKind::Arrow(arrow) => {
                self.plan_parameters(&arrow.parameters);
                match &arrow.body {
                    ArrowBody::Expression(body) => self.plan_expr(body),
                    ArrowBody::Block(body) => self.plan_statements(&body.statements),
                }
            }
            ExpressionKind::Conditional(test, consequent, alternate) => {
                self.plan_expr(test);
                self.plan_expr(consequent);
                self.plan_expr(alternate);
            }
            ExpressionKind::Sequence(parts) => {
                for part in parts {
                    self.plan_expr(part);
                }
            }
            ExpressionKind::Parenthesized(inner) => self.plan_expr(inner),
        }
    }
}

fn resolved_literal(expr: &Expression) -> Option<&ObjectExpression> {
    match &expr.kind {
        ExpressionKind::Object(object) => Some(object),
        ExpressionKind::Parenthesized(inner) => resolved_literal(inner),
        _ => None,
    }
}

/// Indices of the member definitions that actually serve each static key:
/// a later data definition replaces everything before it, a later accessor
/// replaces data but merges with an existing accessor pair.
fn live_member_indices(object: &ObjectExpression) -> Vec<usize> {
    #[derive(Clone, Copy)]
    enum State {
        Data(usize),
        Accessor { get: Option<usize>, set: Option<usize> },
    }

    let mut per_key: FxHashMap<&str, State> = FxHashMap::default();
    for (index, member) in object.members.iter().enumerate() {
        let Some(key) = member.static_key() else { continue };
        match member {
            ObjectMember::Data { .. } | ObjectMember::Shorthand { .. } => {
                per_key.insert(key, State::Data(index));
            }
            ObjectMember::Getter { .. } => {
                let set = match per_key.get(key) {
                    Some(State::Accessor { set, .. }) => *set,
                    _ => None,
                };
                per_key.insert(key, State::Accessor { get: Some(index), set });
            }
            ObjectMember::Setter { .. } => {
                let get = match per_key.get(key) {
                    Some(State::Accessor { get, .. }) => *get,
                    _ => None,
                };
                per_key.insert(key, State::Accessor { get, set: Some(index) });
            }
            ObjectMember::Spread { .. } => {}
        }
    }

    let mut live = Vec::new();
    for state in per_key.values() {
        match state {
            State::Data(index) => live.push(*index),
            State::Accessor { get, set } => {
                if let Some(index) = get {
                    live.push(*index);
                }
                if let Some(index) = set {
                    live.push(*index);
                }
            }
        }
    }
    live.sort_unstable();
    live
}

//! Effect-aware elimination of unused bindings and object members.
//!
//! One pass runs bind, usage, plan, and rewrite in order; the driver
//! iterates passes to a fixpoint because dropping a dead function or
//! accessor body also removes the reads it contained, which can expose
//! further dead bindings.

pub mod bind;
pub mod classify;
pub mod plan;
pub mod rewrite;
pub mod usage;

use crate::ast::expression::{
    ArrayElement, ArrowBody, Expression, ExpressionKind, ObjectMember, Parameter, PropertyKey,
};
use crate::ast::pattern::PatternKind;
use crate::ast::statement::{Block, Statement, VariableDeclarator};
use crate::ast::{NodeId, Program};
use crate::config::ShakeOptions;
use crate::diagnostics::{ConsoleDiagnosticHandler, DiagnosticHandler};
use crate::errors::ShakeError;
use crate::symbols::{SymbolId, SymbolTable, ValueShape};
use bind::{bind_pattern, BoundPattern};
use classify::Classifier;
use plan::{plan_program, EliminationDecision, ShakeReport};
use rewrite::rewrite_program;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::{debug, info};
use usage::track_usage;

pub struct ShakeOutput {
    pub program: Program,
    pub report: ShakeReport,
    /// Analysis passes run, including the final pass that found nothing.
    pub passes: usize,
}

pub struct TreeShaker {
    options: ShakeOptions,
    handler: Arc<dyn DiagnosticHandler>,
}

impl TreeShaker {
    pub fn new(options: ShakeOptions, handler: Arc<dyn DiagnosticHandler>) -> Self {
        TreeShaker { options, handler }
    }

    pub fn with_defaults() -> Self {
        TreeShaker::new(
            ShakeOptions::default(),
            Arc::new(ConsoleDiagnosticHandler::new(false)),
        )
    }

    pub fn options(&self) -> &ShakeOptions {
        &self.options
    }

    /// Shake one compilation unit. Structural problems in individual
    /// declarators are reported through the handler and those declarators
    /// are left untouched; only an internal consistency failure aborts.
    pub fn shake(
        &self,
        program: Program,
        symbols: &SymbolTable,
    ) -> Result<ShakeOutput, ShakeError> {
        let mut program = program;
        let mut report = ShakeReport::default();
        let mut passes = 0usize;

        for pass in 0..self.options.max_passes {
            passes = pass + 1;
            let artifacts = bind_unit(&program, symbols, self.handler.as_ref());
            let classifier = Classifier::new(symbols, &artifacts.binding_shapes);
            let usage = track_usage(
                &program,
                symbols,
                &artifacts.per_declarator,
                &artifacts.binding_literal,
            );
            let plan = plan_program(
                &program,
                symbols,
                &self.options,
                &classifier,
                &artifacts.per_declarator,
                &usage,
            );

            if !plan.has_work() {
                merge_report(&mut report, plan.report);
                debug!(pass, "fixpoint reached");
                break;
            }

            let obligations: Vec<NodeId> = plan.actionable_ids().collect();
            let result = rewrite_program(program, &plan);
            verify_applied(&obligations, &result.applied)?;
            debug!(pass, decisions = obligations.len(), "elimination pass applied");

            program = result.program;
            merge_report(&mut report, plan.report);
            if !result.changed {
                break;
            }
        }

        let eliminated = report
            .entries
            .iter()
            .filter(|entry| entry.decision != EliminationDecision::Keep)
            .count();
        info!(passes, eliminated, "shaking complete");
        Ok(ShakeOutput {
            program,
            report,
            passes,
        })
    }
}

fn verify_applied(obligations: &[NodeId], applied: &FxHashSet<NodeId>) -> Result<(), ShakeError> {
    match obligations.iter().find(|id| !applied.contains(id)) {
        Some(missed) => Err(ShakeError::InternalConsistency(format!(
            "planned elimination for node {} was never applied",
            missed.index()
        ))),
        None => Ok(()),
    }
}

/// Later passes refine earlier decisions for the same node, so merged
/// entries replace rather than accumulate.
fn merge_report(total: &mut ShakeReport, fresh: ShakeReport) {
    if fresh.is_empty() {
        return;
    }
    let fresh_ids: FxHashSet<NodeId> = fresh.entries.iter().map(|entry| entry.node_id).collect();
    total.entries.retain(|entry| !fresh_ids.contains(&entry.node_id));
    total.entries.extend(fresh.entries);
}

/// Everything one bind pass learns about the unit, across all scopes in
/// source order.
pub struct BindArtifacts {
    pub per_declarator: FxHashMap<NodeId, BoundPattern>,
    pub binding_shapes: FxHashMap<SymbolId, ValueShape>,
    /// Bare bindings whose initializer is (syntactically) an object literal.
    pub binding_literal: FxHashMap<SymbolId, NodeId>,
}

pub fn bind_unit(
    program: &Program,
    symbols: &SymbolTable,
    handler: &dyn DiagnosticHandler,
) -> BindArtifacts {
    let mut pass = BindPass {
        symbols,
        handler,
        per_declarator: FxHashMap::default(),
        binding_shapes: FxHashMap::default(),
        binding_literal: FxHashMap::default(),
    };
    pass.visit_statements(&program.statements);
    BindArtifacts {
        per_declarator: pass.per_declarator,
        binding_shapes: pass.binding_shapes,
        binding_literal: pass.binding_literal,
    }
}

struct BindPass<'a> {
    symbols: &'a SymbolTable,
    handler: &'a dyn DiagnosticHandler,
    per_declarator: FxHashMap<NodeId, BoundPattern>,
    binding_shapes: FxHashMap<SymbolId, ValueShape>,
    binding_literal: FxHashMap<SymbolId, NodeId>,
}

impl<'a> BindPass<'a> {
    fn visit_declarator(&mut self, declarator: &VariableDeclarator) {
        let bound = {
            let classifier = Classifier::new(self.symbols, &self.binding_shapes);
            bind_pattern(
                &declarator.pattern,
                declarator.initializer.as_ref(),
                &classifier,
                self.handler,
            )
        };
        for record in &bound.records {
            self.binding_shapes.insert(record.symbol, record.shape);
        }
        if let PatternKind::Identifier(binding) = &declarator.pattern.kind {
            if let Some(literal) = declarator.initializer.as_ref().and_then(syntactic_literal) {
                self.binding_literal.insert(binding.symbol, literal);
            }
        }
        self.per_declarator.insert(declarator.id, bound);
        if let Some(init) = &declarator.initializer {
            self.visit_expr(init);
        }
    }

    fn visit_statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            match statement {
                Statement::Variable(decl) => {
                    for declarator in &decl.declarators {
                        self.visit_declarator(declarator);
                    }
                }
                Statement::Function(function) => {
                    self.visit_parameters(&function.parameters);
                    self.visit_block(&function.body);
                }
                Statement::Expression(stmt) => self.visit_expr(&stmt.expression),
                Statement::If(stmt) => {
                    self.visit_expr(&stmt.condition);
                    self.visit_block(&stmt.then_block);
                    if let Some(else_block) = &stmt.else_block {
                        self.visit_block(else_block);
                    }
                }
                Statement::While(stmt) => {
                    self.visit_expr(&stmt.condition);
                    self.visit_block(&stmt.body);
                }
                Statement::Return(stmt) => {
                    if let Some(value) = &stmt.value {
                        self.visit_expr(value);
                    }
                }
                Statement::Block(block) => self.visit_block(block),
                Statement::Opaque(_) => {}
            }
        }
    }

    fn visit_block(&mut self, block: &Block) {
        self.visit_statements(&block.statements);
    }

    fn visit_parameters(&mut self, parameters: &[Parameter]) {
        for parameter in parameters {
            if let Some(default) = &parameter.default {
                self.visit_expr(default);
            }
        }
    }

    /// Declarations live inside nested function and accessor bodies, so the
    /// bind pass has to reach them through expressions.
    fn visit_expr(&mut self, expr: &Expression) {
        match &expr.kind {
            ExpressionKind::Identifier(_)
            | ExpressionKind::Literal(_)
            | ExpressionKind::Opaque(_) => {}
            ExpressionKind::Binary(_, left, right) => {
                self.visit_expr(left);
                self.visit_expr(right);
            }
            ExpressionKind::Unary(_, operand) => self.visit_expr(operand),
            ExpressionKind::Assignment(_, target, value) => {
                self.visit_expr(target);
                self.visit_expr(value);
            }
            ExpressionKind::Member(member) => {
                self.visit_expr(&member.object);
                if let PropertyKey::Computed(key) = &member.property {
                    self.visit_expr(key);
                }
            }
            ExpressionKind::Call(callee, args) | ExpressionKind::New(callee, args) => {
                self.visit_expr(callee);
                for arg in args {
                    self.visit_expr(&arg.value);
                }
            }
            ExpressionKind::Object(object) => {
                for member in &object.members {
                    match member {
                        ObjectMember::Data { key, value, .. } => {
                            if let PropertyKey::Computed(key_expr) = key {
                                self.visit_expr(key_expr);
                            }
                            self.visit_expr(value);
                        }
                        ObjectMember::Shorthand { .. } => {}
                        ObjectMember::Getter { key, body, .. }
                        | ObjectMember::Setter { key, body, .. } => {
                            if let PropertyKey::Computed(key_expr) = key {
                                self.visit_expr(key_expr);
                            }
                            self.visit_block(body);
                        }
                        ObjectMember::Spread { value, .. } => self.visit_expr(value),
                    }
                }
            }
            ExpressionKind::Array(elements) => {
                for element in elements {
                    match element {
                        ArrayElement::Expression(value) | ArrayElement::Spread(value) => {
                            self.visit_expr(value)
                        }
                        ArrayElement::Hole => {}
                    }
                }
            }
            ExpressionKind::Function(function) => {
                self.visit_parameters(&function.parameters);
                self.visit_block(&function.body);
            }
            ExpressionKind::Arrow(arrow) => {
                self.visit_parameters(&arrow.parameters);
                match &arrow.body {
                    ArrowBody::Expression(body) => self.visit_expr(body),
                    ArrowBody::Block(body) => self.visit_block(body),
                }
            }
            ExpressionKind::Conditional(test, consequent, alternate) => {
                self.visit_expr(test);
                self.visit_expr(consequent);
                self.visit_expr(alternate);
            }
            ExpressionKind::Sequence(parts) => {
                for part in parts {
                    self.visit_expr(part);
                }
            }
            ExpressionKind::Parenthesized(inner) => self.visit_expr(inner),
        }
    }
}

fn syntactic_literal(expr: &Expression) -> Option<NodeId> {
    match &expr.kind {
        ExpressionKind::Object(object) => Some(object.id),
        ExpressionKind::Parenthesized(inner) => syntactic_literal(inner),
        _ => None,
    }
}

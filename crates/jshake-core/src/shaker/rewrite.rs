//! Plan application.
//!
//! Rebuilds the tree block by block, dropping nodes the plan condemned and
//! synthesizing expression statements for preserved effects. Synthesized
//! statements take fresh ids minted past the program's watermark, so a
//! later pass can target them like any producer-built node.

use crate::ast::expression::{
    ArrayElement, ArrowBody, ArrowFunction, Expression, ExpressionKind, FunctionExpression,
    MemberExpression, ObjectExpression, ObjectMember, Parameter, PropertyKey,
};
use crate::ast::pattern::{ArrayPattern, ObjectPattern, Pattern, PatternKind};
use crate::ast::statement::{
    Block, ExpressionStatement, IfStatement, ReturnStatement, Statement, VariableDeclaration,
    WhileStatement,
};
use crate::ast::{NodeId, NodeIdGen, Program};
use crate::shaker::plan::{EliminationDecision, ShakePlan};
use rustc_hash::FxHashSet;

pub struct RewriteResult {
    pub program: Program,
    /// Ids of every node a drop decision was carried out for; the driver
    /// checks this against the plan's obligations.
    pub applied: FxHashSet<NodeId>,
    pub changed: bool,
}

pub fn rewrite_program(program: Program, plan: &ShakePlan) -> RewriteResult {
    let mut rewriter = Rewriter {
        plan,
        ids: NodeIdGen::starting_at(program.next_node_id),
        applied: FxHashSet::default(),
    };
    let statements = rewriter.rewrite_statements(program.statements);
    let changed = !rewriter.applied.is_empty();
    RewriteResult {
        program: Program {
            statements,
            span: program.span,
            next_node_id: rewriter.ids.watermark(),
        },
        applied: rewriter.applied,
        changed,
    }
}

struct Rewriter<'a> {
    plan: &'a ShakePlan,
    ids: NodeIdGen,
    applied: FxHashSet<NodeId>,
}

impl<'a> Rewriter<'a> {
    fn rewrite_statements(&mut self, statements: Vec<Statement>) -> Vec<Statement> {
        let mut out = Vec::with_capacity(statements.len());
        for statement in statements {
            match statement {
                Statement::Variable(decl) => self.rewrite_declaration(decl, &mut out),
                Statement::Function(function) => {
                    match self.plan.decision(function.id) {
                        EliminationDecision::DropEntirely => {
                            self.applied.insert(function.id);
                        }
                        EliminationDecision::Keep | EliminationDecision::DropBindingKeepEffect => {
                            let mut function = function;
                            function.parameters = self.rewrite_parameters(function.parameters);
                            function.body = self.rewrite_block(function.body);
                            out.push(Statement::Function(function));
                        }
                    }
                }
                Statement::Expression(stmt) => match self.plan.decision(stmt.id) {
                    EliminationDecision::Keep => {
                        out.push(Statement::Expression(ExpressionStatement {
                            id: stmt.id,
                            expression: self.rewrite_expr(stmt.expression),
                            span: stmt.span,
                        }));
                    }
                    EliminationDecision::DropEntirely => {
                        self.applied.insert(stmt.id);
                    }
                    EliminationDecision::DropBindingKeepEffect => {
                        self.applied.insert(stmt.id);
                        self.emit_hoists(stmt.id, &mut out);
                    }
                },
                Statement::If(stmt) => {
                    out.push(Statement::If(IfStatement {
                        condition: self.rewrite_expr(stmt.condition),
                        then_block: self.rewrite_block(stmt.then_block),
                        else_block: stmt.else_block.map(|block| self.rewrite_block(block)),
                        span: stmt.span,
                    }));
                }
                Statement::While(stmt) => {
                    out.push(Statement::While(WhileStatement {
                        condition: self.rewrite_expr(stmt.condition),
                        body: self.rewrite_block(stmt.body),
                        span: stmt.span,
                    }));
                }
                Statement::Return(stmt) => {
                    out.push(Statement::Return(ReturnStatement {
                        value: stmt.value.map(|value| self.rewrite_expr(value)),
                        span: stmt.span,
                    }));
                }
                Statement::Block(block) => {
                    out.push(Statement::Block(self.rewrite_block(block)));
                }
                Statement::Opaque(stmt) => out.push(Statement::Opaque(stmt)),
            }
        }
        out
    }

    /// Declarators evaluate left to right, so a dropped-with-effects
    /// declarator splits the declaration: everything kept so far is flushed,
    /// the preserved effects follow as statements, and later declarators
    /// start a new declaration.
    fn rewrite_declaration(&mut self, decl: VariableDeclaration, out: &mut Vec<Statement>) {
        let VariableDeclaration {
            kind,
            declarators,
            is_exported,
            span,
        } = decl;
        let mut pending: Vec<crate::ast::statement::VariableDeclarator> = Vec::new();
        let flush = |pending: &mut Vec<_>, out: &mut Vec<Statement>| {
            if !pending.is_empty() {
                out.push(Statement::Variable(VariableDeclaration {
                    kind,
                    declarators: std::mem::take(pending),
                    is_exported,
                    span,
                }));
            }
        };

        for declarator in declarators {
            match self.plan.decision(declarator.id) {
                EliminationDecision::Keep => {
                    let mut declarator = declarator;
                    declarator.pattern = self.rewrite_pattern(declarator.pattern);
                    declarator.initializer =
                        declarator.initializer.map(|init| self.rewrite_expr(init));
                    pending.push(declarator);
                }
                EliminationDecision::DropEntirely => {
                    self.applied.insert(declarator.id);
                }
                EliminationDecision::DropBindingKeepEffect => {
                    self.applied.insert(declarator.id);
                    flush(&mut pending, out);
                    self.emit_hoists(declarator.id, out);
                }
            }
        }
        flush(&mut pending, out);
    }

    fn emit_hoists(&mut self, node_id: NodeId, out: &mut Vec<Statement>) {
        for expr in self.plan.hoisted(node_id) {
            let expression = self.rewrite_expr(expr.clone());
            let span = expression.span;
            out.push(Statement::Expression(ExpressionStatement {
                id: self.ids.next_id(),
                expression,
                span,
            }));
        }
    }

    fn rewrite_pattern(&mut self, pattern: Pattern) -> Pattern {
        let kind = match pattern.kind {
            PatternKind::Identifier(binding) => PatternKind::Identifier(binding),
            PatternKind::Object(object) => {
                let mut properties = Vec::with_capacity(object.properties.len());
                for mut property in object.properties {
                    match self.plan.decision(property.id) {
                        EliminationDecision::DropEntirely => {
                            self.applied.insert(property.id);
                        }
                        EliminationDecision::Keep | EliminationDecision::DropBindingKeepEffect => {
                            property.value = Box::new(self.rewrite_pattern(*property.value));
                            properties.push(property);
                        }
                    }
                }
                PatternKind::Object(ObjectPattern {
                    properties,
                    rest: object
                        .rest
                        .map(|rest| Box::new(self.rewrite_pattern(*rest))),
                    span: object.span,
                })
            }
            PatternKind::Array(array) => {
                let elements = array
                    .elements
                    .into_iter()
                    .map(|slot| {
                        let Some(mut element) = slot else { return None };
                        match self.plan.decision(element.id) {
                            EliminationDecision::DropEntirely => {
                                self.applied.insert(element.id);
                                // A hole keeps later elements in position.
                                None
                            }
                            EliminationDecision::Keep
                            | EliminationDecision::DropBindingKeepEffect => {
                                element.pattern =
                                    Box::new(self.rewrite_pattern(*element.pattern));
                                Some(element)
                            }
                        }
                    })
                    .collect();
                PatternKind::Array(ArrayPattern {
                    elements,
                    span: array.span,
                })
            }
        };
        Pattern::new(kind, pattern.span)
    }

    fn rewrite_expr(&mut self, expr: Expression) -> Expression {
        let kind = match expr.kind {
            ExpressionKind::Identifier(ident) => ExpressionKind::Identifier(ident),
            ExpressionKind::Literal(literal) => ExpressionKind::Literal(literal),
            ExpressionKind::Opaque(text) => ExpressionKind::Opaque(text),
            ExpressionKind::Binary(op, left, right) => ExpressionKind::Binary(
                op,
                Box::new(self.rewrite_expr(*left)),
                Box::new(self.rewrite_expr(*right)),
            ),
            ExpressionKind::Unary(op, operand) => {
                ExpressionKind::Unary(op, Box::new(self.rewrite_expr(*operand)))
            }
            ExpressionKind::Assignment(op, target, value) => ExpressionKind::Assignment(
                op,
                Box::new(self.rewrite_expr(*target)),
                Box::new(self.rewrite_expr(*value)),
            ),
            ExpressionKind::Member(member) => ExpressionKind::Member(MemberExpression {
                object: Box::new(self.rewrite_expr(*member.object)),
                property: self.rewrite_key(member.property),
            }),
            ExpressionKind::Call(callee, args) => ExpressionKind::Call(
                Box::new(self.rewrite_expr(*callee)),
                args.into_iter()
                    .map(|mut arg| {
                        arg.value = self.rewrite_expr(arg.value);
                        arg
                    })
                    .collect(),
            ),
            ExpressionKind::New(callee, args) => ExpressionKind::New(
                Box::new(self.rewrite_expr(*callee)),
                args.into_iter()
                    .map(|mut arg| {
                        arg.value = self.rewrite_expr(arg.value);
                        arg
                    })
                    .collect(),
            ),
            ExpressionKind::Object(object) => ExpressionKind::Object(self.rewrite_object(object)),
            ExpressionKind::Array(elements) => ExpressionKind::Array(
                elements
                    .into_iter()
                    .map(|element| match element {
                        ArrayElement::Expression(value) => {
                            ArrayElement::Expression(self.rewrite_expr(value))
                        }
                        ArrayElement::Spread(value) => {
                            ArrayElement::Spread(self.rewrite_expr(value))
                        }
                        ArrayElement::Hole => ArrayElement::Hole,
                    })
                    .collect(),
            ),
            ExpressionKind::Function(function) => {
                ExpressionKind::Function(FunctionExpression {
                    name: function.name,
                    parameters: self.rewrite_parameters(function.parameters),
                    body: self.rewrite_block(function.body),
                    span: function.span,
                })
            }
            ExpressionKind::Arrow(arrow) => ExpressionKind::Arrow(ArrowFunction {
                parameters: self.rewrite_parameters(arrow.parameters),
                body: match arrow.body {
                    ArrowBody::Expression(body) => {
                        ArrowBody::Expression(Box::new(self.rewrite_expr(*body)))
                    }
                    ArrowBody::Block(body) => ArrowBody::Block(self.rewrite_block(body)),
                },
                span: arrow.span,
            }),
            ExpressionKind::Conditional(test, consequent, alternate) => {
                ExpressionKind::Conditional(
                    Box::new(self.rewrite_expr(*test)),
                    Box::new(self.rewrite_expr(*consequent)),
                    Box::new(self.rewrite_expr(*alternate)),
                )
            }
            ExpressionKind::Sequence(parts) => ExpressionKind::Sequence(
                parts
                    .into_iter()
                    .map(|part| self.rewrite_expr(part))
                    .collect(),
            ),
            ExpressionKind::Parenthesized(inner) => {
                ExpressionKind::Parenthesized(Box::new(self.rewrite_expr(*inner)))
            }
        };
        Expression::new(kind, expr.span)
    }

    fn rewrite_object(&mut self, object: ObjectExpression) -> ObjectExpression {
        let mut members = Vec::with_capacity(object.members.len());
        for member in object.members {
            match self.plan.decision(member.id()) {
                EliminationDecision::DropEntirely => {
                    self.applied.insert(member.id());
                }
                // DropBindingKeepEffect is never planned for a member of a
                // surviving literal; leaving it unapplied trips the driver's
                // consistency check instead of silently mangling the tree.
                EliminationDecision::Keep | EliminationDecision::DropBindingKeepEffect => {
                    members.push(self.rewrite_member(member));
                }
            }
        }
        ObjectExpression {
            id: object.id,
            members,
            span: object.span,
        }
    }

    fn rewrite_member(&mut self, member: ObjectMember) -> ObjectMember {
        match member {
            ObjectMember::Data { id, key, value, span } => ObjectMember::Data {
                id,
                key: self.rewrite_key(key),
                value: self.rewrite_expr(value),
                span,
            },
            ObjectMember::Shorthand { id, name, span } => {
                ObjectMember::Shorthand { id, name, span }
            }
            ObjectMember::Getter { id, key, body, span } => ObjectMember::Getter {
                id,
                key: self.rewrite_key(key),
                body: self.rewrite_block(body),
                span,
            },
            ObjectMember::Setter {
                id,
                key,
                param,
                body,
                span,
            } => ObjectMember::Setter {
                id,
                key: self.rewrite_key(key),
                param,
                body: self.rewrite_block(body),
                span,
            },
            ObjectMember::Spread { id, value, span } => ObjectMember::Spread {
                id,
                value: self.rewrite_expr(value),
                span,
            },
        }
    }

    fn rewrite_key(&mut self, key: PropertyKey) -> PropertyKey {
        match key {
            PropertyKey::Static(ident) => PropertyKey::Static(ident),
            PropertyKey::Computed(expr) => {
                PropertyKey::Computed(Box::new(self.rewrite_expr(*expr)))
            }
        }
    }

    fn rewrite_parameters(&mut self, parameters: Vec<Parameter>) -> Vec<Parameter> {
        parameters
            .into_iter()
            .map(|mut parameter| {
                parameter.default = parameter.default.map(|default| self.rewrite_expr(default));
                parameter
            })
            .collect()
    }

    fn rewrite_block(&mut self, block: Block) -> Block {
        Block {
            statements: self.rewrite_statements(block.statements),
            span: block.span,
        }
    }
}

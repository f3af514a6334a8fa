#![allow(dead_code)]

//! Shared builders for integration tests: a small DSL that plays the role
//! of the external parser/resolver, plus inspectors for the shaken output.

use jshake_core::ast::expression::{
    Argument, BinaryOp, Expression, ExpressionKind, Identifier, Literal, MemberExpression,
    ObjectExpression, ObjectMember, PropertyKey,
};
use jshake_core::ast::pattern::{
    BindingIdentifier, ObjectPattern, Pattern, PatternKind, PatternProperty,
};
use jshake_core::ast::statement::{
    Block, ExpressionStatement, FunctionDeclaration, Statement, VariableDeclaration,
    VariableDeclarator, VariableKind,
};
use jshake_core::ast::{Ident, NodeIdGen, Program};
use jshake_core::diagnostics::CollectingDiagnosticHandler;
use jshake_core::{
    ShakeOptions, ShakeOutput, Span, Symbol, SymbolId, SymbolKind, SymbolTable, TreeShaker,
};
use std::sync::Arc;

pub struct UnitBuilder {
    pub symbols: SymbolTable,
    pub ids: NodeIdGen,
    statements: Vec<Statement>,
}

impl UnitBuilder {
    pub fn new() -> Self {
        UnitBuilder {
            symbols: SymbolTable::new(),
            ids: NodeIdGen::new(),
            statements: Vec::new(),
        }
    }

    pub fn declare(&mut self, name: &str, kind: SymbolKind) -> SymbolId {
        self.symbols
            .declare(Symbol::new(name, kind, Span::SYNTHESIZED))
    }

    pub fn declare_exported(&mut self, name: &str, kind: SymbolKind) -> SymbolId {
        self.symbols
            .declare(Symbol::new(name, kind, Span::SYNTHESIZED).exported())
    }

    // -- expressions -------------------------------------------------------

    pub fn num(&self, value: f64) -> Expression {
        expr(ExpressionKind::Literal(Literal::Number(value)))
    }

    pub fn string(&self, value: &str) -> Expression {
        expr(ExpressionKind::Literal(Literal::String(value.into())))
    }

    pub fn undefined(&self) -> Expression {
        expr(ExpressionKind::Literal(Literal::Undefined))
    }

    pub fn read(&self, name: &str, symbol: SymbolId) -> Expression {
        expr(ExpressionKind::Identifier(Identifier {
            name: name.into(),
            symbol: Some(symbol),
        }))
    }

    /// An identifier the resolver could not tie to a declaration.
    pub fn global(&self, name: &str) -> Expression {
        expr(ExpressionKind::Identifier(Identifier {
            name: name.into(),
            symbol: None,
        }))
    }

    pub fn call(&self, name: &str, args: Vec<Expression>) -> Expression {
        expr(ExpressionKind::Call(
            Box::new(self.global(name)),
            args.into_iter()
                .map(|value| Argument {
                    value,
                    is_spread: false,
                    span: Span::SYNTHESIZED,
                })
                .collect(),
        ))
    }

    /// `name()` with no arguments: the canonical observable effect.
    pub fn effect(&self, name: &str) -> Expression {
        self.call(name, vec![])
    }

    pub fn add(&self, left: Expression, right: Expression) -> Expression {
        expr(ExpressionKind::Binary(
            BinaryOp::Add,
            Box::new(left),
            Box::new(right),
        ))
    }

    pub fn member(&self, object: Expression, key: &str) -> Expression {
        expr(ExpressionKind::Member(MemberExpression {
            object: Box::new(object),
            property: PropertyKey::Static(Ident::new(key.into(), Span::SYNTHESIZED)),
        }))
    }

    // -- object literals ---------------------------------------------------

    pub fn object(&mut self, members: Vec<ObjectMember>) -> Expression {
        expr(ExpressionKind::Object(ObjectExpression {
            id: self.ids.next_id(),
            members,
            span: Span::SYNTHESIZED,
        }))
    }

    pub fn data(&mut self, key: &str, value: Expression) -> ObjectMember {
        ObjectMember::Data {
            id: self.ids.next_id(),
            key: PropertyKey::Static(Ident::new(key.into(), Span::SYNTHESIZED)),
            value,
            span: Span::SYNTHESIZED,
        }
    }

    pub fn data_computed(&mut self, key: Expression, value: Expression) -> ObjectMember {
        ObjectMember::Data {
            id: self.ids.next_id(),
            key: PropertyKey::Computed(Box::new(key)),
            value,
            span: Span::SYNTHESIZED,
        }
    }

    pub fn shorthand(&mut self, name: &str, symbol: SymbolId) -> ObjectMember {
        ObjectMember::Shorthand {
            id: self.ids.next_id(),
            name: Identifier {
                name: name.into(),
                symbol: Some(symbol),
            },
            span: Span::SYNTHESIZED,
        }
    }

    pub fn getter(&mut self, key: &str, body: Vec<Statement>) -> ObjectMember {
        ObjectMember::Getter {
            id: self.ids.next_id(),
            key: PropertyKey::Static(Ident::new(key.into(), Span::SYNTHESIZED)),
            body: Block {
                statements: body,
                span: Span::SYNTHESIZED,
            },
            span: Span::SYNTHESIZED,
        }
    }

    pub fn setter(&mut self, key: &str, body: Vec<Statement>) -> ObjectMember {
        ObjectMember::Setter {
            id: self.ids.next_id(),
            key: PropertyKey::Static(Ident::new(key.into(), Span::SYNTHESIZED)),
            param: Ident::new("value".into(), Span::SYNTHESIZED),
            body: Block {
                statements: body,
                span: Span::SYNTHESIZED,
            },
            span: Span::SYNTHESIZED,
        }
    }

    pub fn spread(&mut self, value: Expression) -> ObjectMember {
        ObjectMember::Spread {
            id: self.ids.next_id(),
            value,
            span: Span::SYNTHESIZED,
        }
    }

    // -- patterns ----------------------------------------------------------

    pub fn pat(&self, name: &str, symbol: SymbolId) -> Pattern {
        Pattern::new(
            PatternKind::Identifier(BindingIdentifier {
                name: name.into(),
                symbol,
            }),
            Span::SYNTHESIZED,
        )
    }

    pub fn obj_pat(&self, properties: Vec<PatternProperty>) -> Pattern {
        Pattern::new(
            PatternKind::Object(ObjectPattern {
                properties,
                rest: None,
                span: Span::SYNTHESIZED,
            }),
            Span::SYNTHESIZED,
        )
    }

    pub fn prop(&mut self, key: &str, value: Pattern) -> PatternProperty {
        PatternProperty {
            id: self.ids.next_id(),
            key: PropertyKey::Static(Ident::new(key.into(), Span::SYNTHESIZED)),
            value: Box::new(value),
            default: None,
            span: Span::SYNTHESIZED,
        }
    }

    pub fn prop_with_default(
        &mut self,
        key: &str,
        value: Pattern,
        default: Expression,
    ) -> PatternProperty {
        PatternProperty {
            id: self.ids.next_id(),
            key: PropertyKey::Static(Ident::new(key.into(), Span::SYNTHESIZED)),
            value: Box::new(value),
            default: Some(default),
            span: Span::SYNTHESIZED,
        }
    }

    pub fn prop_computed(&mut self, key: Expression, value: Pattern) -> PatternProperty {
        PatternProperty {
            id: self.ids.next_id(),
            key: PropertyKey::Computed(Box::new(key)),
            value: Box::new(value),
            default: None,
            span: Span::SYNTHESIZED,
        }
    }

    // -- statements --------------------------------------------------------

    pub fn declarator(
        &mut self,
        pattern: Pattern,
        initializer: Option<Expression>,
    ) -> VariableDeclarator {
        VariableDeclarator {
            id: self.ids.next_id(),
            pattern,
            initializer,
            span: Span::SYNTHESIZED,
        }
    }

    pub fn let_binding(&mut self, pattern: Pattern, initializer: Expression) {
        let declarator = self.declarator(pattern, Some(initializer));
        self.let_declarators(vec![declarator]);
    }

    pub fn let_declarators(&mut self, declarators: Vec<VariableDeclarator>) {
        self.statements.push(Statement::Variable(VariableDeclaration {
            kind: VariableKind::Let,
            declarators,
            is_exported: false,
            span: Span::SYNTHESIZED,
        }));
    }

    pub fn statement(&mut self, expression: Expression) {
        let statement = self.make_statement(expression);
        self.statements.push(statement);
    }

    pub fn make_statement(&mut self, expression: Expression) -> Statement {
        Statement::Expression(ExpressionStatement {
            id: self.ids.next_id(),
            expression,
            span: Span::SYNTHESIZED,
        })
    }

    /// `function name() { body }` with no parameters.
    pub fn func_decl(&mut self, name: &str, symbol: SymbolId, body: Vec<Statement>) {
        self.statements
            .push(Statement::Function(FunctionDeclaration {
                id: self.ids.next_id(),
                name: Ident::new(name.into(), Span::SYNTHESIZED),
                symbol,
                parameters: vec![],
                body: Block {
                    statements: body,
                    span: Span::SYNTHESIZED,
                },
                is_exported: false,
                span: Span::SYNTHESIZED,
            }));
    }

    /// `name = value;`
    pub fn assign(&mut self, name: &str, symbol: SymbolId, value: Expression) {
        use jshake_core::ast::expression::AssignmentOp;
        let assignment = expr(ExpressionKind::Assignment(
            AssignmentOp::Assign,
            Box::new(self.read(name, symbol)),
            Box::new(value),
        ));
        self.statement(assignment);
    }

    /// `object.key = value;`
    pub fn assign_member(&mut self, object: Expression, key: &str, value: Expression) {
        use jshake_core::ast::expression::AssignmentOp;
        let target = self.member(object, key);
        let assignment = expr(ExpressionKind::Assignment(
            AssignmentOp::Assign,
            Box::new(target),
            Box::new(value),
        ));
        self.statement(assignment);
    }

    pub fn finish(self) -> (Program, SymbolTable) {
        let program = Program::new(self.statements, Span::SYNTHESIZED, &self.ids);
        (program, self.symbols)
    }
}

fn expr(kind: ExpressionKind) -> Expression {
    Expression::new(kind, Span::SYNTHESIZED)
}

// -- runners ---------------------------------------------------------------

pub fn shake(program: Program, symbols: &SymbolTable) -> ShakeOutput {
    shake_with(ShakeOptions::default(), program, symbols)
}

pub fn shake_with(
    options: ShakeOptions,
    program: Program,
    symbols: &SymbolTable,
) -> ShakeOutput {
    let handler = Arc::new(CollectingDiagnosticHandler::new());
    let shaker = TreeShaker::new(options, handler);
    shaker.shake(program, symbols).expect("shaking should succeed")
}

// -- inspectors ------------------------------------------------------------

/// Names bound by top-level variable declarations, in source order.
pub fn declared_names(program: &Program) -> Vec<String> {
    let mut names = Vec::new();
    for statement in &program.statements {
        if let Statement::Variable(decl) = statement {
            for declarator in &decl.declarators {
                collect_pattern_names(&declarator.pattern, &mut names);
            }
        }
    }
    names
}

fn collect_pattern_names(pattern: &Pattern, names: &mut Vec<String>) {
    match &pattern.kind {
        PatternKind::Identifier(binding) => names.push(binding.name.clone()),
        PatternKind::Object(object) => {
            for property in &object.properties {
                collect_pattern_names(&property.value, names);
            }
            if let Some(rest) = &object.rest {
                collect_pattern_names(rest, names);
            }
        }
        PatternKind::Array(array) => {
            for element in array.elements.iter().flatten() {
                collect_pattern_names(&element.pattern, names);
            }
        }
    }
}

/// Callee names of every call in the program, in evaluation order. This is
/// the observable effect trace the shaker must preserve.
pub fn call_trace(program: &Program) -> Vec<String> {
    let mut trace = Vec::new();
    for statement in &program.statements {
        trace_statement(statement, &mut trace);
    }
    trace
}

fn trace_statement(statement: &Statement, trace: &mut Vec<String>) {
    match statement {
        Statement::Variable(decl) => {
            for declarator in &decl.declarators {
                if let Some(init) = &declarator.initializer {
                    trace_expr(init, trace);
                }
                trace_pattern(&declarator.pattern, trace);
            }
        }
        Statement::Function(_) => {}
        Statement::Expression(stmt) => trace_expr(&stmt.expression, trace),
        Statement::If(stmt) => {
            trace_expr(&stmt.condition, trace);
            for inner in &stmt.then_block.statements {
                trace_statement(inner, trace);
            }
            if let Some(else_block) = &stmt.else_block {
                for inner in &else_block.statements {
                    trace_statement(inner, trace);
                }
            }
        }
        Statement::While(stmt) => {
            trace_expr(&stmt.condition, trace);
            for inner in &stmt.body.statements {
                trace_statement(inner, trace);
            }
        }
        Statement::Return(stmt) => {
            if let Some(value) = &stmt.value {
                trace_expr(value, trace);
            }
        }
        Statement::Block(block) => {
            for inner in &block.statements {
                trace_statement(inner, trace);
            }
        }
        Statement::Opaque(_) => {}
    }
}

fn trace_pattern(pattern: &Pattern, trace: &mut Vec<String>) {
    match &pattern.kind {
        PatternKind::Identifier(_) => {}
        PatternKind::Object(object) => {
            for property in &object.properties {
                if let PropertyKey::Computed(key) = &property.key {
                    trace_expr(key, trace);
                }
                if let Some(default) = &property.default {
                    trace_expr(default, trace);
                }
                trace_pattern(&property.value, trace);
            }
            if let Some(rest) = &object.rest {
                trace_pattern(rest, trace);
            }
        }
        PatternKind::Array(array) => {
            for element in array.elements.iter().flatten() {
                if let Some(default) = &element.default {
                    trace_expr(default, trace);
                }
                trace_pattern(&element.pattern, trace);
            }
        }
    }
}

fn trace_expr(e: &Expression, trace: &mut Vec<String>) {
    match &e.kind {
        ExpressionKind::Call(callee, args) => {
            if let ExpressionKind::Identifier(ident) = &callee.kind {
                trace.push(ident.name.clone());
            } else {
                trace_expr(callee, trace);
            }
            for arg in args {
                trace_expr(&arg.value, trace);
            }
        }
        ExpressionKind::Identifier(_)
        | ExpressionKind::Literal(_)
        | ExpressionKind::Opaque(_) => {}
        ExpressionKind::Binary(_, left, right) => {
            trace_expr(left, trace);
            trace_expr(right, trace);
        }
        ExpressionKind::Unary(_, operand) => trace_expr(operand, trace),
        ExpressionKind::Assignment(_, target, value) => {
            trace_expr(target, trace);
            trace_expr(value, trace);
        }
        ExpressionKind::Member(member) => {
            trace_expr(&member.object, trace);
            if let PropertyKey::Computed(key) = &member.property {
                trace_expr(key, trace);
            }
        }
        ExpressionKind::New(callee, args) => {
            trace_expr(callee, trace);
            for arg in args {
                trace_expr(&arg.value, trace);
            }
        }
        ExpressionKind::Object(object) => {
            for member in &object.members {
                match member {
                    ObjectMember::Data { key, value, .. } => {
                        if let PropertyKey::Computed(key_expr) = key {
                            trace_expr(key_expr, trace);
                        }
                        trace_expr(value, trace);
                    }
                    ObjectMember::Shorthand { .. }
                    | ObjectMember::Getter { .. }
                    | ObjectMember::Setter { .. } => {}
                    ObjectMember::Spread { value, .. } => trace_expr(value, trace),
                }
            }
        }
        ExpressionKind::Array(elements) => {
            for element in elements {
                match element {
                    jshake_core::ast::expression::ArrayElement::Expression(value)
                    | jshake_core::ast::expression::ArrayElement::Spread(value) => {
                        trace_expr(value, trace)
                    }
                    jshake_core::ast::expression::ArrayElement::Hole => {}
                }
            }
        }
        ExpressionKind::Function(_) | ExpressionKind::Arrow(_) => {}
        ExpressionKind::Conditional(test, consequent, alternate) => {
            trace_expr(test, trace);
            trace_expr(consequent, trace);
            trace_expr(alternate, trace);
        }
        ExpressionKind::Sequence(parts) => {
            for part in parts {
                trace_expr(part, trace);
            }
        }
        ExpressionKind::Parenthesized(inner) => trace_expr(inner, trace),
    }
}

/// The object literal initializing the first top-level declarator whose
/// bound name matches, if it survived.
pub fn literal_for<'a>(program: &'a Program, name: &str) -> Option<&'a ObjectExpression> {
    for statement in &program.statements {
        let Statement::Variable(decl) = statement else { continue };
        for declarator in &decl.declarators {
            let PatternKind::Identifier(binding) = &declarator.pattern.kind else {
                continue;
            };
            if binding.name != name {
                continue;
            }
            if let Some(init) = &declarator.initializer {
                if let ExpressionKind::Object(object) = &init.kind {
                    return Some(object);
                }
            }
        }
    }
    None
}

pub fn member_keys(object: &ObjectExpression) -> Vec<String> {
    object
        .members
        .iter()
        .filter_map(|member| member.static_key().map(str::to_owned))
        .collect()
}

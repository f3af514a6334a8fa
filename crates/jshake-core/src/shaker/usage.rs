//! Usage and liveness tracking.
//!
//! A forward scan over one compilation unit recording, per declared symbol,
//! whether any read exists anywhere after its declaration (nested closures
//! included), and per statically-known object literal, which keys are
//! touched and whether the literal escapes. Everything here is a
//! conservative over-approximation: a name or key is never reported unused
//! when a read might exist.

use crate::ast::expression::{
    ArrayElement, ArrowBody, Expression, ExpressionKind, MemberExpression, ObjectExpression,
    ObjectMember, Parameter, PropertyKey,
};
use crate::ast::pattern::{Pattern, PatternKind};
use crate::ast::statement::{Block, Statement, VariableDeclarator};
use crate::ast::{NodeId, Program};
use crate::shaker::bind::BoundPattern;
use crate::symbols::{SymbolId, SymbolTable};
use rustc_hash::{FxHashMap, FxHashSet};

/// What serves reads of a static key on a literal, after "last definition
/// wins" replacement. Accessor pairs of one key merge instead of replacing
/// each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyBacking {
    /// Data member; carries the nested literal id when the value is itself
    /// an object literal.
    Data(Option<NodeId>),
    Accessor,
}

/// Structural facts about every object literal in the unit, gathered before
/// reads are resolved.
#[derive(Debug, Default)]
pub struct LiteralFacts {
    backing: FxHashMap<(NodeId, String), KeyBacking>,
    /// Literals with a computed-key or spread member: their key set is open,
    /// so no per-key reasoning is safe.
    dynamic: FxHashSet<NodeId>,
    /// Syntactically nested literal values, for escape propagation.
    children: FxHashMap<NodeId, Vec<NodeId>>,
}

impl LiteralFacts {
    pub fn is_dynamic(&self, literal: NodeId) -> bool {
        self.dynamic.contains(&literal)
    }

    pub fn backing(&self, literal: NodeId, key: &str) -> Option<KeyBacking> {
        self.backing.get(&(literal, key.to_owned())).copied()
    }
}

#[derive(Debug, Default)]
pub struct UsageMap {
    reads: FxHashMap<SymbolId, u32>,
    writes: FxHashMap<SymbolId, u32>,
    key_touches: FxHashMap<NodeId, FxHashSet<String>>,
    escaped: FxHashSet<NodeId>,
    pub facts: LiteralFacts,
}

impl UsageMap {
    pub fn read_count(&self, symbol: SymbolId) -> u32 {
        self.reads.get(&symbol).copied().unwrap_or(0)
    }

    pub fn is_read(&self, symbol: SymbolId) -> bool {
        self.read_count(symbol) > 0
    }

    pub fn write_count(&self, symbol: SymbolId) -> u32 {
        self.writes.get(&symbol).copied().unwrap_or(0)
    }

    pub fn is_escaped(&self, literal: NodeId) -> bool {
        self.escaped.contains(&literal)
    }

    /// Whether reads or writes of `key` can reach the literal. An escaped
    /// literal behaves as if every key were touched.
    pub fn key_touched(&self, literal: NodeId, key: &str) -> bool {
        if self.is_escaped(literal) {
            return true;
        }
        self.key_touches
            .get(&literal)
            .map(|keys| keys.contains(key))
            .unwrap_or(false)
    }
}

/// Per-pattern-property rollups derived from the binder's records: whether
/// any leaf binding under a property is used, and whether any leaf's
/// extraction must be kept for effect.
#[derive(Debug, Default)]
pub struct PatternUse {
    used: FxHashSet<NodeId>,
    unremovable: FxHashSet<NodeId>,
}

impl PatternUse {
    pub fn rollup(bound: &BoundPattern, usage: &UsageMap, exported: bool) -> Self {
        let mut rollup = PatternUse::default();
        for record in &bound.records {
            let used = exported || usage.is_read(record.symbol);
            for id in &record.path {
                if used {
                    rollup.used.insert(*id);
                }
                if !record.removable {
                    rollup.unremovable.insert(*id);
                }
            }
        }
        rollup
    }

    pub fn subtree_used(&self, id: NodeId) -> bool {
        self.used.contains(&id)
    }

    /// The property must survive even if its bindings are dead.
    pub fn subtree_unremovable(&self, id: NodeId) -> bool {
        self.unremovable.contains(&id)
    }

    pub fn subtree_kept(&self, id: NodeId) -> bool {
        self.subtree_used(id) || self.subtree_unremovable(id)
    }
}

pub fn track_usage(
    program: &Program,
    symbols: &SymbolTable,
    binds: &FxHashMap<NodeId, BoundPattern>,
    binding_literal: &FxHashMap<SymbolId, NodeId>,
) -> UsageMap {
    let mut map = UsageMap::default();

    collect_literal_facts(&program.statements, &mut map.facts);

    let mut counter = ReadWriteCounter { map: &mut map };
    counter.visit_statements(&program.statements);

    // A literal bound to a name that is later reassigned cannot be resolved
    // through that name; if the name is also read, the reads may still see
    // the literal, so it escapes.
    for (symbol, literal) in binding_literal {
        if map.write_count(*symbol) > 0 && map.read_count(*symbol) > 0 {
            map.escaped.insert(*literal);
        }
    }

    let mut resolver = Resolver {
        map: &mut map,
        symbols,
        binds,
        binding_literal,
    };
    resolver.visit_statements(&program.statements);

    propagate_escapes(&mut map);
    map
}

fn propagate_escapes(map: &mut UsageMap) {
    let mut worklist: Vec<NodeId> = map.escaped.iter().copied().collect();
    while let Some(literal) = worklist.pop() {
        let children = match map.facts.children.get(&literal) {
            Some(children) => children.clone(),
            None => continue,
        };
        for child in children {
            if map.escaped.insert(child) {
                worklist.push(child);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Phase 0: literal structure
// ---------------------------------------------------------------------------

fn collect_literal_facts(statements: &[Statement], facts: &mut LiteralFacts) {
    struct FactWalker<'a> {
        facts: &'a mut LiteralFacts,
    }

    impl<'a> FactWalker<'a> {
        fn expr(&mut self, expr: &Expression) {
            match &expr.kind {
                ExpressionKind::Object(object) => self.object(object),
                ExpressionKind::Identifier(_) | ExpressionKind::Literal(_) => {}
                ExpressionKind::Binary(_, left, right) => {
                    self.expr(left);
                    self.expr(right);
                }
                ExpressionKind::Unary(_, operand) => self.expr(operand),
                ExpressionKind::Assignment(_, target, value) => {
                    self.expr(target);
                    self.expr(value);
                }
                ExpressionKind::Member(member) => {
                    self.expr(&member.object);
                    if let PropertyKey::Computed(key) = &member.property {
                        self.expr(key);
                    }
                }
                ExpressionKind::Call(callee, args) | ExpressionKind::New(callee, args) => {
                    self.expr(callee);
                    for arg in args {
                        self.expr(&arg.value);
                    }
                }
                ExpressionKind::Array(elements) => {
                    for element in elements {
                        match element {
                            ArrayElement::Expression(value) | ArrayElement::Spread(value) => {
                                self.expr(value)
                            }
                            ArrayElement::Hole => {}
                        }
                    }
                }
                ExpressionKind::Function(function) => {
                    self.parameters(&function.parameters);
                    self.block(&function.body);
                }
                ExpressionKind::Arrow(arrow) => {
                    self.parameters(&arrow.parameters);
                    match &arrow.body {
                        ArrowBody::Expression(body) => self.expr(body),
                        ArrowBody::Block(body) => self.block(body),
                    }
                }
                ExpressionKind::Conditional(test, consequent, alternate) => {
                    self.expr(test);
                    self.expr(consequent);
                    self.expr(alternate);
                }
                ExpressionKind::Sequence(parts) => {
                    for part in parts {
                        self.expr(part);
                    }
                }
                ExpressionKind::Parenthesized(inner) => self.expr(inner),
                ExpressionKind::Opaque(_) => {}
            }
        }

        fn object(&mut self, object: &ObjectExpression) {
            for member in &object.members {
                match member {
                    ObjectMember::Data { key, value, .. } => {
                        match key.as_static() {
                            Some(name) => {
                                let child = nested_literal(value).map(|o| o.id);
                                if let Some(child) = child {
                                    self.facts
                                        .children
                                        .entry(object.id)
                                        .or_default()
                                        .push(child);
                                }
                                self.facts
                                    .backing
                                    .insert((object.id, name.to_owned()), KeyBacking::Data(child));
                            }
                            None => {
                                self.facts.dynamic.insert(object.id);
                            }
                        }
                        if let PropertyKey::Computed(key_expr) = key {
                            self.expr(key_expr);
                        }
                        self.expr(value);
                    }
                    ObjectMember::Shorthand { name, .. } => {
                        self.facts
                            .backing
                            .insert((object.id, name.name.clone()), KeyBacking::Data(None));
                    }
                    ObjectMember::Getter { key, body, .. } => {
                        self.accessor_key(object.id, key);
                        self.block(body);
                    }
                    ObjectMember::Setter { key, body, .. } => {
                        self.accessor_key(object.id, key);
                        self.block(body);
                    }
                    ObjectMember::Spread { value, .. } => {
                        self.facts.dynamic.insert(object.id);
                        self.expr(value);
                    }
                }
            }
        }

        fn accessor_key(&mut self, literal: NodeId, key: &PropertyKey) {
            match key.as_static() {
                Some(name) => {
                    self.facts
                        .backing
                        .insert((literal, name.to_owned()), KeyBacking::Accessor);
                }
                None => {
                    self.facts.dynamic.insert(literal);
                }
            }
            if let PropertyKey::Computed(key_expr) = key {
                self.expr(key_expr);
            }
        }

        fn parameters(&mut self, parameters: &[Parameter]) {
            for parameter in parameters {
                self.pattern_exprs(&parameter.pattern);
                if let Some(default) = &parameter.default {
                    self.expr(default);
                }
            }
        }

        fn pattern_exprs(&mut self, pattern: &Pattern) {
            match &pattern.kind {
                PatternKind::Identifier(_) => {}
                PatternKind::Object(object) => {
                    for property in &object.properties {
                        if let PropertyKey::Computed(key) = &property.key {
                            self.expr(key);
                        }
                        if let Some(default) = &property.default {
                            self.expr(default);
                        }
                        self.pattern_exprs(&property.value);
                    }
                    if let Some(rest) = &object.rest {
                        self.pattern_exprs(rest);
                    }
                }
                PatternKind::Array(array) => {
                    for element in array.elements.iter().flatten() {
                        if let Some(default) = &element.default {
                            self.expr(default);
                        }
                        self.pattern_exprs(&element.pattern);
                    }
                }
            }
        }

        fn block(&mut self, block: &Block) {
            self.statements(&block.statements);
        }

        fn statements(&mut self, statements: &[Statement]) {
            for statement in statements {
                match statement {
                    Statement::Variable(decl) => {
                        for declarator in &decl.declarators {
                            self.pattern_exprs(&declarator.pattern);
                            if let Some(init) = &declarator.initializer {
                                self.expr(init);
                            }
                        }
                    }
                    Statement::Function(function) => {
                        self.parameters(&function.parameters);
                        self.block(&function.body);
                    }
                    Statement::Expression(stmt) => self.expr(&stmt.expression),
                    Statement::If(stmt) => {
                        self.expr(&stmt.condition);
                        self.block(&stmt.then_block);
                        if let Some(else_block) = &stmt.else_block {
                            self.block(else_block);
                        }
                    }
                    Statement::While(stmt) => {
                        self.expr(&stmt.condition);
                        self.block(&stmt.body);
                    }
                    Statement::Return(stmt) => {
                        if let Some(value) = &stmt.value {
                            self.expr(value);
                        }
                    }
                    Statement::Block(block) => self.block(block),
                    Statement::Opaque(_) => {}
                }
            }
        }
    }

    FactWalker { facts }.statements(statements);
}

fn nested_literal(expr: &Expression) -> Option<&ObjectExpression> {
    match &expr.kind {
        ExpressionKind::Object(object) => Some(object),
        ExpressionKind::Parenthesized(inner) => nested_literal(inner),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Phase 1: symbol reads and writes
// ---------------------------------------------------------------------------

struct ReadWriteCounter<'a> {
    map: &'a mut UsageMap,
}

impl<'a> ReadWriteCounter<'a> {
    fn read(&mut self, symbol: Option<SymbolId>) {
        if let Some(symbol) = symbol {
            *self.map.reads.entry(symbol).or_insert(0) += 1;
        }
    }

    fn write(&mut self, symbol: Option<SymbolId>) {
        if let Some(symbol) = symbol {
            *self.map.writes.entry(symbol).or_insert(0) += 1;
        }
    }

    fn visit_expr(&mut self, expr: &Expression) {
        match &expr.kind {
            ExpressionKind::Identifier(ident) => self.read(ident.symbol),
            ExpressionKind::Literal(_) => {}
            ExpressionKind::Binary(_, left, right) => {
                self.visit_expr(left);
                self.visit_expr(right);
            }
            ExpressionKind::Unary(_, operand) => self.visit_expr(operand),
            ExpressionKind::Assignment(op, target, value) => {
                match &target.kind {
                    ExpressionKind::Identifier(ident) => {
                        // A whole-variable write is not a read of the old
                        // value; compound operators read first.
                        self.write(ident.symbol);
                        if op.reads_target() {
                            self.read(ident.symbol);
                        }
                    }
                    _ => self.visit_expr(target),
                }
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
                        ObjectMember::Shorthand { name, .. } => self.read(name.symbol),
                        ObjectMember::Getter { key, body, .. } => {
                            if let PropertyKey::Computed(key_expr) = key {
                                self.visit_expr(key_expr);
                            }
                            self.visit_block(body);
                        }
                        ObjectMember::Setter { key, body, .. } => {
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
            ExpressionKind::Opaque(_) => {}
        }
    }

    fn visit_parameters(&mut self, parameters: &[Parameter]) {
        for parameter in parameters {
            self.visit_pattern_exprs(&parameter.pattern);
            if let Some(default) = &parameter.default {
                self.visit_expr(default);
            }
        }
    }

    fn visit_pattern_exprs(&mut self, pattern: &Pattern) {
        match &pattern.kind {
            PatternKind::Identifier(_) => {}
            PatternKind::Object(object) => {
                for property in &object.properties {
                    if let PropertyKey::Computed(key) = &property.key {
                        self.visit_expr(key);
                    }
                    if let Some(default) = &property.default {
                        self.visit_expr(default);
                    }
                    self.visit_pattern_exprs(&property.value);
                }
                if let Some(rest) = &object.rest {
                    self.visit_pattern_exprs(rest);
                }
            }
            PatternKind::Array(array) => {
                for element in array.elements.iter().flatten() {
                    if let Some(default) = &element.default {
                        self.visit_expr(default);
                    }
                    self.visit_pattern_exprs(&element.pattern);
                }
            }
        }
    }

    fn visit_block(&mut self, block: &Block) {
        self.visit_statements(&block.statements);
    }

    fn visit_statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            match statement {
                Statement::Variable(decl) => {
                    for declarator in &decl.declarators {
                        self.visit_pattern_exprs(&declarator.pattern);
                        if let Some(init) = &declarator.initializer {
                            self.visit_expr(init);
                        }
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
}

// ---------------------------------------------------------------------------
// Phase 2: literal key reads and escapes
// ---------------------------------------------------------------------------

struct Resolver<'a> {
    map: &'a mut UsageMap,
    symbols: &'a SymbolTable,
    binds: &'a FxHashMap<NodeId, BoundPattern>,
    binding_literal: &'a FxHashMap<SymbolId, NodeId>,
}

impl<'a> Resolver<'a> {
    fn escape(&mut self, literal: NodeId) {
        self.map.escaped.insert(literal);
    }

    fn touch_key(&mut self, literal: NodeId, key: &str) {
        self.map
            .key_touches
            .entry(literal)
            .or_default()
            .insert(key.to_owned());
    }

    fn literal_of(&self, symbol: SymbolId) -> Option<NodeId> {
        if self.map.write_count(symbol) > 0 {
            return None;
        }
        self.binding_literal.get(&symbol).copied()
    }

    /// Visit an expression and return the object literal its value statically
    /// resolves to, if any. Callers escape the result unless the surrounding
    /// context keeps the value trackable.
    fn visit_expr(&mut self, expr: &Expression) -> Option<NodeId> {
        match &expr.kind {
            ExpressionKind::Identifier(ident) => ident.symbol.and_then(|s| self.literal_of(s)),
            ExpressionKind::Literal(_) => None,
            ExpressionKind::Binary(_, left, right) => {
                self.consume(left);
                self.consume(right);
                None
            }
            ExpressionKind::Unary(_, operand) => {
                self.consume(operand);
                None
            }
            ExpressionKind::Assignment(_, target, value) => {
                match &target.kind {
                    ExpressionKind::Identifier(ident) => {
                        let assigned = self.visit_expr(value);
                        if let (Some(literal), Some(symbol)) = (assigned, ident.symbol) {
                            // A literal stored into a name that is read later
                            // is observable through those reads.
                            if self.map.is_read(symbol) {
                                self.escape(literal);
                            }
                        }
                    }
                    ExpressionKind::Member(member) => {
                        self.visit_member_write(member);
                        self.consume(value);
                    }
                    _ => {
                        self.consume(target);
                        self.consume(value);
                    }
                }
                None
            }
            ExpressionKind::Member(member) => self.visit_member_read(member),
            ExpressionKind::Call(callee, args) | ExpressionKind::New(callee, args) => {
                // A method call hands the receiver to an unknown function.
                if let ExpressionKind::Member(member) = &callee.kind {
                    let receiver = self.visit_member_read(member);
                    if let Some(literal) = receiver {
                        self.escape(literal);
                    }
                    if let Some(object) = self.resolve_value(&member.object) {
                        self.escape(object);
                    }
                } else {
                    self.consume(callee);
                }
                for arg in args {
                    self.consume(&arg.value);
                }
                None
            }
            ExpressionKind::Object(object) => {
                self.visit_object(object);
                Some(object.id)
            }
            ExpressionKind::Array(elements) => {
                for element in elements {
                    match element {
                        ArrayElement::Expression(value) | ArrayElement::Spread(value) => {
                            self.consume(value)
                        }
                        ArrayElement::Hole => {}
                    }
                }
                None
            }
            ExpressionKind::Function(function) => {
                self.visit_parameters(&function.parameters);
                self.visit_block(&function.body);
                None
            }
            ExpressionKind::Arrow(arrow) => {
                self.visit_parameters(&arrow.parameters);
                match &arrow.body {
                    ArrowBody::Expression(body) => self.consume(body),
                    ArrowBody::Block(body) => self.visit_block(body),
                }
                None
            }
            ExpressionKind::Conditional(test, consequent, alternate) => {
                self.consume(test);
                self.consume(consequent);
                self.consume(alternate);
                None
            }
            ExpressionKind::Sequence(parts) => {
                let mut last = None;
                for part in parts {
                    last = self.visit_expr(part);
                }
                // Discarded middle values were already visited; the sequence
                // yields its last value.
                last
            }
            ExpressionKind::Parenthesized(inner) => self.visit_expr(inner),
            ExpressionKind::Opaque(_) => None,
        }
    }

    /// Visit an expression whose value flows somewhere the tracker cannot
    /// follow; any literal it resolves to escapes.
    fn consume(&mut self, expr: &Expression) {
        if let Some(literal) = self.visit_expr(expr) {
            self.escape(literal);
        }
    }

    /// Resolve without visiting (the expression was already walked).
    fn resolve_value(&self, expr: &Expression) -> Option<NodeId> {
        match &expr.kind {
            ExpressionKind::Identifier(ident) => ident.symbol.and_then(|s| self.literal_of(s)),
            ExpressionKind::Object(object) => Some(object.id),
            ExpressionKind::Parenthesized(inner) => self.resolve_value(inner),
            _ => None,
        }
    }

    fn visit_member_read(&mut self, member: &MemberExpression) -> Option<NodeId> {
        let object = self.visit_expr(&member.object);
        match &member.property {
            PropertyKey::Static(key) => {
                let Some(literal) = object else { return None };
                if self.map.facts.is_dynamic(literal) {
                    self.escape(literal);
                    return None;
                }
                self.touch_key(literal, &key.node);
                match self.map.facts.backing(literal, &key.node) {
                    Some(KeyBacking::Data(child)) => child,
                    Some(KeyBacking::Accessor) | None => None,
                }
            }
            PropertyKey::Computed(key) => {
                // Unknown key: any member could be read.
                if let Some(literal) = object {
                    self.escape(literal);
                }
                self.consume(key);
                None
            }
        }
    }

    fn visit_member_write(&mut self, member: &MemberExpression) {
        let object = self.visit_expr(&member.object);
        match &member.property {
            PropertyKey::Static(key) => {
                if let Some(literal) = object {
                    if self.map.facts.is_dynamic(literal) {
                        self.escape(literal);
                    } else {
                        // A write can invoke a setter for this key.
                        self.touch_key(literal, &key.node);
                    }
                }
            }
            PropertyKey::Computed(key) => {
                if let Some(literal) = object {
                    self.escape(literal);
                }
                self.consume(key);
            }
        }
    }

    fn visit_object(&mut self, object: &ObjectExpression) {
        for member in &object.members {
            match member {
                ObjectMember::Data { key, value, .. } => {
                    if let PropertyKey::Computed(key_expr) = key {
                        self.consume(key_expr);
                    }
                    if nested_literal(value).is_some() {
                        // Syntactic child: tracked through facts.children,
                        // does not escape by being stored here.
                        let _ = self.visit_expr(value);
                    } else {
                        self.consume(value);
                    }
                }
                ObjectMember::Shorthand { name, .. } => {
                    // Aliasing a tracked literal into another object.
                    if let Some(literal) = name.symbol.and_then(|s| self.literal_of(s)) {
                        self.escape(literal);
                    }
                }
                ObjectMember::Getter { key, body, .. } | ObjectMember::Setter { key, body, .. } => {
                    if let PropertyKey::Computed(key_expr) = key {
                        self.consume(key_expr);
                    }
                    self.visit_block(body);
                }
                ObjectMember::Spread { value, .. } => self.consume(value),
            }
        }
    }

    fn visit_parameters(&mut self, parameters: &[Parameter]) {
        for parameter in parameters {
            self.visit_pattern_defaults(&parameter.pattern);
            if let Some(default) = &parameter.default {
                self.consume(default);
            }
        }
    }

    fn visit_pattern_defaults(&mut self, pattern: &Pattern) {
        match &pattern.kind {
            PatternKind::Identifier(_) => {}
            PatternKind::Object(object) => {
                for property in &object.properties {
                    if let PropertyKey::Computed(key) = &property.key {
                        self.consume(key);
                    }
                    if let Some(default) = &property.default {
                        self.consume(default);
                    }
                    self.visit_pattern_defaults(&property.value);
                }
                if let Some(rest) = &object.rest {
                    self.visit_pattern_defaults(rest);
                }
            }
            PatternKind::Array(array) => {
                for element in array.elements.iter().flatten() {
                    if let Some(default) = &element.default {
                        self.consume(default);
                    }
                    self.visit_pattern_defaults(&element.pattern);
                }
            }
        }
    }

    fn visit_declarator(&mut self, declarator: &VariableDeclarator, exported: bool) {
        self.visit_pattern_defaults(&declarator.pattern);
        let value = declarator
            .initializer
            .as_ref()
            .and_then(|init| self.visit_expr(init));

        match &declarator.pattern.kind {
            PatternKind::Identifier(_) => {
                if exported {
                    if let Some(literal) = value {
                        self.escape(literal);
                    }
                }
            }
            PatternKind::Object(_) | PatternKind::Array(_) => {
                let rollup = self
                    .binds
                    .get(&declarator.id)
                    .map(|bound| PatternUse::rollup(bound, self.map, exported));
                self.mark_extraction(&declarator.pattern, value, rollup.as_ref());
            }
        }
    }

    /// Mark the key reads a destructuring performs against a resolved source
    /// literal. Only properties that will survive (used or unremovable)
    /// still read their key after rewriting.
    fn mark_extraction(
        &mut self,
        pattern: &Pattern,
        literal: Option<NodeId>,
        rollup: Option<&PatternUse>,
    ) {
        match &pattern.kind {
            PatternKind::Identifier(_) => {}
            PatternKind::Object(object) => {
                for property in &object.properties {
                    let kept = rollup.map(|r| r.subtree_kept(property.id)).unwrap_or(true);
                    let child = match (&property.key, literal) {
                        (PropertyKey::Static(key), Some(source)) => {
                            if kept {
                                if self.map.facts.is_dynamic(source) {
                                    self.escape(source);
                                } else {
                                    self.touch_key(source, &key.node);
                                }
                            }
                            match self.map.facts.backing(source, &key.node) {
                                Some(KeyBacking::Data(child)) => child,
                                _ => None,
                            }
                        }
                        (PropertyKey::Computed(_), Some(source)) => {
                            if kept {
                                // Unknown key against a tracked literal.
                                self.escape(source);
                            }
                            None
                        }
                        (_, None) => None,
                    };
                    self.mark_extraction(&property.value, child, rollup);
                }
                if let Some(rest) = &object.rest {
                    if let Some(source) = literal {
                        // Rest reads every remaining key.
                        self.escape(source);
                    }
                    self.mark_extraction(rest, None, rollup);
                }
            }
            PatternKind::Array(array) => {
                for element in array.elements.iter().flatten() {
                    self.mark_extraction(&element.pattern, None, rollup);
                }
            }
        }
    }

    fn visit_block(&mut self, block: &Block) {
        self.visit_statements(&block.statements);
    }

    fn visit_statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            match statement {
                Statement::Variable(decl) => {
                    let exported = decl.is_exported;
                    for declarator in &decl.declarators {
                        let exported = exported
                            || self
                                .binds
                                .get(&declarator.id)
                                .map(|bound| {
                                    bound.records.iter().any(|record| {
                                        self.symbols.get(record.symbol).is_exported
                                    })
                                })
                                .unwrap_or(false);
                        self.visit_declarator(declarator, exported);
                    }
                }
                Statement::Function(function) => {
                    self.visit_parameters(&function.parameters);
                    self.visit_block(&function.body);
                }
                Statement::Expression(stmt) => {
                    // The statement's own value is discarded; nothing
                    // escapes through it.
                    let _ = self.visit_expr(&stmt.expression);
                }
                Statement::If(stmt) => {
                    self.consume(&stmt.condition);
                    self.visit_block(&stmt.then_block);
                    if let Some(else_block) = &stmt.else_block {
                        self.visit_block(else_block);
                    }
                }
                Statement::While(stmt) => {
                    self.consume(&stmt.condition);
                    self.visit_block(&stmt.body);
                }
                Statement::Return(stmt) => {
                    if let Some(value) = &stmt.value {
                        // Returned values leave the unit.
                        self.consume(value);
                    }
                }
                Statement::Block(block) => self.visit_block(block),
                Statement::Opaque(_) => {}
            }
        }
    }
}

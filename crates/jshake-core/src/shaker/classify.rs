//! Expression effect classification.
//!
//! Decides, for a single expression, whether evaluating it can have an
//! externally observable effect, and whether the resulting value has a
//! statically known shape. Classification is a pure function of the node and
//! the shapes established so far; it always terminates with a result and
//! degrades to `Effectful` + `Unknown` for anything it cannot prove.

use crate::ast::expression::{
    ArrayElement, BinaryOp, Expression, ExpressionKind, Identifier, ObjectExpression,
    ObjectMember, PropertyKey, UnaryOp,
};
use crate::symbols::{SymbolId, SymbolTable, ValueShape};
use rustc_hash::FxHashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Pure,
    Effectful,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub effect: Effect,
    pub shape: ValueShape,
}

impl Classification {
    pub fn pure_known() -> Self {
        Self {
            effect: Effect::Pure,
            shape: ValueShape::Known,
        }
    }

    pub fn pure_unknown() -> Self {
        Self {
            effect: Effect::Pure,
            shape: ValueShape::Unknown,
        }
    }

    /// The conservative fallback: may do anything, yields anything.
    pub fn opaque() -> Self {
        Self {
            effect: Effect::Effectful,
            shape: ValueShape::Unknown,
        }
    }

    pub fn is_pure(&self) -> bool {
        self.effect == Effect::Pure
    }

    pub fn is_pure_known(&self) -> bool {
        self.is_pure() && self.shape == ValueShape::Known
    }
}

pub struct Classifier<'a> {
    symbols: &'a SymbolTable,
    binding_shapes: &'a FxHashMap<SymbolId, ValueShape>,
}

impl<'a> Classifier<'a> {
    pub fn new(
        symbols: &'a SymbolTable,
        binding_shapes: &'a FxHashMap<SymbolId, ValueShape>,
    ) -> Self {
        Self {
            symbols,
            binding_shapes,
        }
    }

    pub fn classify(&self, expr: &Expression) -> Classification {
        match &expr.kind {
            ExpressionKind::Literal(_) => Classification::pure_known(),

            // Reading a variable is effect-free; the value's shape depends on
            // what its declaration bound it to.
            ExpressionKind::Identifier(ident) => Classification {
                effect: Effect::Pure,
                shape: self.identifier_shape(ident),
            },

            ExpressionKind::Binary(op, left, right) => {
                if binary_op_is_pure(*op)
                    && self.classify(left).is_pure_known()
                    && self.classify(right).is_pure_known()
                {
                    Classification::pure_known()
                } else {
                    Classification::opaque()
                }
            }

            ExpressionKind::Unary(op, operand) => {
                if unary_op_is_pure(*op) && self.classify(operand).is_pure_known() {
                    Classification::pure_known()
                } else {
                    Classification::opaque()
                }
            }

            // Property access on an unknown-shaped object may invoke a getter
            // with arbitrary effects. On a known-shaped object the read itself
            // is pure, but the member value may carry accessor-backed keys of
            // its own, so the result shape stays unknown and a further read
            // down the chain classifies conservatively.
            ExpressionKind::Member(member) => {
                let object = self.classify(&member.object);
                let key_ok = match &member.property {
                    PropertyKey::Static(_) => true,
                    PropertyKey::Computed(key) => self.classify(key).is_pure_known(),
                };
                if object.is_pure_known() && key_ok {
                    Classification::pure_unknown()
                } else {
                    Classification::opaque()
                }
            }

            // Calls, construction, and writes to anything are always
            // effectful; whole-variable writes to dead locals are handled by
            // the planner, not here.
            ExpressionKind::Call(_, _)
            | ExpressionKind::New(_, _)
            | ExpressionKind::Assignment(_, _, _) => Classification::opaque(),

            ExpressionKind::Object(object) => self.classify_object(object),

            ExpressionKind::Array(elements) => {
                let mut pure = true;
                let mut shape = ValueShape::Known;
                for element in elements {
                    match element {
                        ArrayElement::Expression(value) => {
                            pure &= self.classify(value).is_pure();
                        }
                        // Spreading can run getters or an arbitrary iterator
                        // on the spread source.
                        ArrayElement::Spread(value) => {
                            pure &= self.classify(value).is_pure_known();
                            shape = ValueShape::Unknown;
                        }
                        ArrayElement::Hole => {}
                    }
                }
                Classification {
                    effect: if pure { Effect::Pure } else { Effect::Effectful },
                    shape,
                }
            }

            // Closing over a function is pure; calling it is not, but that is
            // the call site's problem. The resulting value is opaque.
            ExpressionKind::Function(_) | ExpressionKind::Arrow(_) => {
                Classification::pure_unknown()
            }

            ExpressionKind::Conditional(test, consequent, alternate) => {
                if self.classify(test).is_pure_known()
                    && self.classify(consequent).is_pure_known()
                    && self.classify(alternate).is_pure_known()
                {
                    Classification::pure_known()
                } else {
                    Classification::opaque()
                }
            }

            ExpressionKind::Sequence(parts) => {
                if parts.iter().all(|part| self.classify(part).is_pure()) {
                    let shape = parts
                        .last()
                        .map(|last| self.classify(last).shape)
                        .unwrap_or(ValueShape::Unknown);
                    Classification {
                        effect: Effect::Pure,
                        shape,
                    }
                } else {
                    Classification::opaque()
                }
            }

            ExpressionKind::Parenthesized(inner) => self.classify(inner),

            ExpressionKind::Opaque(_) => Classification::opaque(),
        }
    }

    /// Shape of the value an identifier refers to: known only when its
    /// declaration's own source shape is known.
    pub fn identifier_shape(&self, ident: &Identifier) -> ValueShape {
        let Some(symbol) = ident.symbol else {
            return ValueShape::Unknown;
        };
        if self.symbols.get(symbol).is_opaque_value() {
            return ValueShape::Unknown;
        }
        self.binding_shapes
            .get(&symbol)
            .copied()
            .unwrap_or(ValueShape::Unknown)
    }

    /// Object literal construction is pure when every member is; defining an
    /// accessor does not invoke it. The resulting shape is unknown as soon as
    /// any key is backed by an accessor, computed, or produced by a spread,
    /// because a later read of such a key may run arbitrary code.
    fn classify_object(&self, object: &ObjectExpression) -> Classification {
        let mut pure = true;
        let mut shape = ValueShape::Known;
        for member in &object.members {
            match member {
                ObjectMember::Data { key, value, .. } => {
                    if let PropertyKey::Computed(key_expr) = key {
                        pure &= self.classify(key_expr).is_pure();
                        shape = ValueShape::Unknown;
                    }
                    pure &= self.classify(value).is_pure();
                }
                ObjectMember::Shorthand { .. } => {}
                ObjectMember::Getter { key, .. } | ObjectMember::Setter { key, .. } => {
                    if let PropertyKey::Computed(key_expr) = key {
                        pure &= self.classify(key_expr).is_pure();
                    }
                    shape = ValueShape::Unknown;
                }
                ObjectMember::Spread { value, .. } => {
                    pure &= self.classify(value).is_pure_known();
                    shape = ValueShape::Unknown;
                }
            }
        }
        Classification {
            effect: if pure { Effect::Pure } else { Effect::Effectful },
            shape,
        }
    }
}

/// Closed allowlist of operators assumed side-effect-free on known primitive
/// shapes. `in` and `instanceof` can throw on non-object operands.
fn binary_op_is_pure(op: BinaryOp) -> bool {
    !matches!(op, BinaryOp::In | BinaryOp::Instanceof)
}

/// `delete` mutates its target; everything else on the list is a value
/// operator.
fn unary_op_is_pure(op: UnaryOp) -> bool {
    !matches!(op, UnaryOp::Delete)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::expression::{Argument, Literal, MemberExpression};
    use crate::ast::{Ident, NodeIdGen, Spanned};
    use crate::span::Span;
    use crate::symbols::{Symbol, SymbolKind};

    fn expr(kind: ExpressionKind) -> Expression {
        Expression::new(kind, Span::SYNTHESIZED)
    }

    fn num(value: f64) -> Expression {
        expr(ExpressionKind::Literal(Literal::Number(value)))
    }

    #[test]
    fn test_literals_are_pure_known() {
        let symbols = SymbolTable::new();
        let shapes = FxHashMap::default();
        let classifier = Classifier::new(&symbols, &shapes);

        assert!(classifier.classify(&num(1.0)).is_pure_known());
        assert!(classifier
            .classify(&expr(ExpressionKind::Literal(Literal::Undefined)))
            .is_pure_known());
    }

    #[test]
    fn test_binary_over_literals_is_pure() {
        let symbols = SymbolTable::new();
        let shapes = FxHashMap::default();
        let classifier = Classifier::new(&symbols, &shapes);

        let sum = expr(ExpressionKind::Binary(
            BinaryOp::Add,
            Box::new(num(0.0)),
            Box::new(num(1.0)),
        ));
        assert!(classifier.classify(&sum).is_pure_known());
    }

    #[test]
    fn test_call_is_effectful() {
        let symbols = SymbolTable::new();
        let shapes = FxHashMap::default();
        let classifier = Classifier::new(&symbols, &shapes);

        let call = expr(ExpressionKind::Call(
            Box::new(expr(ExpressionKind::Identifier(Identifier {
                name: "effect".into(),
                symbol: None,
            }))),
            Vec::<Argument>::new(),
        ));
        let classification = classifier.classify(&call);
        assert_eq!(classification.effect, Effect::Effectful);
        assert_eq!(classification.shape, ValueShape::Unknown);
    }

    #[test]
    fn test_member_on_unknown_object_is_effectful() {
        let mut symbols = SymbolTable::new();
        let param = symbols.declare(Symbol::new(
            "unknown",
            SymbolKind::Parameter,
            Span::SYNTHESIZED,
        ));
        let shapes = FxHashMap::default();
        let classifier = Classifier::new(&symbols, &shapes);

        let access = expr(ExpressionKind::Member(MemberExpression {
            object: Box::new(expr(ExpressionKind::Identifier(Identifier {
                name: "unknown".into(),
                symbol: Some(param),
            }))),
            property: PropertyKey::Static(Ident::new("g".into(), Span::SYNTHESIZED)),
        }));
        assert_eq!(classifier.classify(&access), Classification::opaque());
    }

    #[test]
    fn test_chained_member_read_is_not_trusted() {
        let mut symbols = SymbolTable::new();
        let obj = symbols.declare(Symbol::new("obj", SymbolKind::Let, Span::SYNTHESIZED));
        let mut shapes = FxHashMap::default();
        shapes.insert(obj, ValueShape::Known);
        let classifier = Classifier::new(&symbols, &shapes);

        let first = expr(ExpressionKind::Member(MemberExpression {
            object: Box::new(expr(ExpressionKind::Identifier(Identifier {
                name: "obj".into(),
                symbol: Some(obj),
            }))),
            property: PropertyKey::Static(Ident::new("a".into(), Span::SYNTHESIZED)),
        }));
        // The member value may itself hold accessor-backed keys.
        assert_eq!(classifier.classify(&first), Classification::pure_unknown());

        let second = expr(ExpressionKind::Member(MemberExpression {
            object: Box::new(first),
            property: PropertyKey::Static(Ident::new("b".into(), Span::SYNTHESIZED)),
        }));
        assert_eq!(classifier.classify(&second), Classification::opaque());
    }

    #[test]
    fn test_object_with_getter_constructs_pure_but_unknown() {
        let symbols = SymbolTable::new();
        let shapes = FxHashMap::default();
        let classifier = Classifier::new(&symbols, &shapes);
        let mut ids = NodeIdGen::new();

        let object = ObjectExpression {
            id: ids.next_id(),
            members: vec![ObjectMember::Getter {
                id: ids.next_id(),
                key: PropertyKey::Static(Spanned::new("a".into(), Span::SYNTHESIZED)),
                body: crate::ast::statement::Block {
                    statements: vec![],
                    span: Span::SYNTHESIZED,
                },
                span: Span::SYNTHESIZED,
            }],
            span: Span::SYNTHESIZED,
        };
        let classification = classifier.classify(&expr(ExpressionKind::Object(object)));
        assert_eq!(classification.effect, Effect::Pure);
        assert_eq!(classification.shape, ValueShape::Unknown);
    }

    #[test]
    fn test_unmodeled_node_falls_back_to_opaque() {
        let symbols = SymbolTable::new();
        let shapes = FxHashMap::default();
        let classifier = Classifier::new(&symbols, &shapes);

        let tagged = expr(ExpressionKind::Opaque("TaggedTemplateExpression".into()));
        assert_eq!(classifier.classify(&tagged), Classification::opaque());
    }
}

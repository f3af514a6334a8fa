//! Pattern binding.
//!
//! Walks a binding pattern depth-first, left-to-right (source order is the
//! evaluation-order contract for computed keys and defaults) paired with its
//! initializer, and produces one record per bound name plus the set of
//! evaluations that must survive elimination even if every bound name is
//! unused.

use crate::ast::expression::{
    ArrayElement, Expression, ExpressionKind, Literal, ObjectExpression, ObjectMember, PropertyKey,
};
use crate::ast::pattern::{ArrayPatternElement, Pattern, PatternKind, PatternProperty};
use crate::ast::NodeId;
use crate::diagnostics::DiagnosticHandler;
use crate::errors::ShakeError;
use crate::shaker::classify::{Classifier, Effect};
use crate::span::Span;
use crate::symbols::{SymbolId, ValueShape};
use rustc_hash::FxHashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MandatoryKind {
    /// A computed pattern key: evaluated exactly once whether or not the
    /// extracted binding survives.
    ComputedKey,
    /// A property read (or iteration) performed against a value of unknown
    /// shape; the read alone can trigger an accessor.
    OpaqueSourceRead,
    /// A default value that cannot be proven dead; it may run when the
    /// source key is absent or `undefined`.
    DefaultValue,
}

#[derive(Debug, Clone, Copy)]
pub struct MandatoryEval {
    pub kind: MandatoryKind,
    pub effect: Effect,
    pub span: Span,
}

/// One bound name produced by a pattern.
#[derive(Debug, Clone)]
pub struct BindingRecord {
    pub symbol: SymbolId,
    pub name: String,
    pub span: Span,
    pub shape: ValueShape,
    /// Ids of the enclosing pattern properties/elements, outermost first.
    /// Empty for a bare identifier pattern.
    pub path: Vec<NodeId>,
    /// True when omitting this extraction loses no effect: the source chain
    /// is known-shaped, every computed key on the path is pure, and every
    /// live default on the path is pure.
    pub removable: bool,
}

#[derive(Debug, Default)]
pub struct BoundPattern {
    pub records: Vec<BindingRecord>,
    pub mandatory: Vec<MandatoryEval>,
    /// Structural error (duplicate bound name): the declarator must be left
    /// untouched.
    pub structural: Option<ShakeError>,
}

impl BoundPattern {
    pub fn is_malformed(&self) -> bool {
        self.structural.is_some()
    }

    pub fn has_opaque_reads(&self) -> bool {
        self.mandatory
            .iter()
            .any(|m| matches!(m.kind, MandatoryKind::OpaqueSourceRead))
    }

    pub fn has_effectful_defaults(&self) -> bool {
        self.mandatory
            .iter()
            .any(|m| matches!(m.kind, MandatoryKind::DefaultValue) && m.effect == Effect::Effectful)
    }

    pub fn has_effectful_computed_keys(&self) -> bool {
        self.mandatory
            .iter()
            .any(|m| matches!(m.kind, MandatoryKind::ComputedKey) && m.effect == Effect::Effectful)
    }
}

/// What the binder statically knows about the value being destructured.
#[derive(Clone, Copy)]
struct Source<'a> {
    shape: ValueShape,
    object: Option<&'a ObjectExpression>,
    array: Option<&'a [ArrayElement]>,
}

impl<'a> Source<'a> {
    fn opaque() -> Self {
        Source {
            shape: ValueShape::Unknown,
            object: None,
            array: None,
        }
    }

    /// Known shape, but the concrete structure is not visible (a primitive,
    /// or a value reached through a chain the binder does not follow).
    fn known_unseen() -> Self {
        Source {
            shape: ValueShape::Known,
            object: None,
            array: None,
        }
    }
}

/// Outcome of resolving one static pattern key against the source.
enum KeyLookup<'a> {
    /// Key present with a non-`undefined` value: defaults are provably dead.
    Value(Source<'a>),
    /// Key provably absent or `undefined`: the default, if any, runs.
    Defaulted,
    /// Cannot tell which value (or whether the default) applies.
    Unresolved,
}

pub fn bind_pattern(
    pattern: &Pattern,
    initializer: Option<&Expression>,
    classifier: &Classifier<'_>,
    handler: &dyn DiagnosticHandler,
) -> BoundPattern {
    let mut binder = Binder {
        classifier,
        handler,
        out: BoundPattern::default(),
        seen: FxHashSet::default(),
        path: Vec::new(),
    };
    let source = binder.source_of(initializer);
    binder.walk(pattern, source, true);
    binder.out
}

struct Binder<'a, 'c> {
    classifier: &'a Classifier<'c>,
    handler: &'a dyn DiagnosticHandler,
    out: BoundPattern,
    seen: FxHashSet<String>,
    path: Vec<NodeId>,
}

impl<'a, 'c> Binder<'a, 'c> {
    fn source_of(&self, expr: Option<&'a Expression>) -> Source<'a> {
        let Some(expr) = expr else {
            // A declarator without an initializer binds `undefined`.
            return Source::known_unseen();
        };
        if self.classifier.classify(expr).shape == ValueShape::Unknown {
            return Source::opaque();
        }
        match &expr.kind {
            ExpressionKind::Object(object) => Source {
                shape: ValueShape::Known,
                object: Some(object),
                array: None,
            },
            ExpressionKind::Array(elements) => Source {
                shape: ValueShape::Known,
                object: None,
                array: Some(elements),
            },
            ExpressionKind::Parenthesized(inner) => self.source_of(Some(inner)),
            _ => Source::known_unseen(),
        }
    }

    fn walk(&mut self, pattern: &'a Pattern, source: Source<'a>, removable: bool) {
        match &pattern.kind {
            PatternKind::Identifier(binding) => {
                if !self.seen.insert(binding.name.clone()) {
                    let message = format!(
                        "name '{}' is bound more than once in the same pattern",
                        binding.name
                    );
                    self.handler.error(pattern.span, &message);
                    self.out.structural = Some(ShakeError::Structural {
                        span: pattern.span,
                        message,
                    });
                }
                self.out.records.push(BindingRecord {
                    symbol: binding.symbol,
                    name: binding.name.clone(),
                    span: pattern.span,
                    shape: source.shape,
                    path: self.path.clone(),
                    removable,
                });
            }
            PatternKind::Object(object) => {
                if source.shape == ValueShape::Unknown {
                    // Even an empty pattern checks the source for
                    // null/undefined, and every property read may run a
                    // getter on the opaque value.
                    self.out.mandatory.push(MandatoryEval {
                        kind: MandatoryKind::OpaqueSourceRead,
                        effect: Effect::Effectful,
                        span: pattern.span,
                    });
                }
                for property in &object.properties {
                    self.walk_property(property, source, removable);
                }
                if let Some(rest) = &object.rest {
                    // Rest copies every remaining key; never trimmed.
                    self.walk(rest, Source::known_unseen(), false);
                }
            }
            PatternKind::Array(array) => {
                if let Some(elements) = source.array {
                    self.walk_array(&array.elements, elements, removable);
                } else {
                    // Array destructuring drives the source's iterator; only
                    // a literal array is provably effect-free to iterate.
                    self.out.mandatory.push(MandatoryEval {
                        kind: MandatoryKind::OpaqueSourceRead,
                        effect: Effect::Effectful,
                        span: pattern.span,
                    });
                    for element in array.elements.iter().flatten() {
                        self.walk_element(element, KeyLookup::Unresolved, Source::opaque(), false);
                    }
                }
            }
        }
    }

    fn walk_property(
        &mut self,
        property: &'a PatternProperty,
        source: Source<'a>,
        removable: bool,
    ) {
        let mut removable = removable && source.shape == ValueShape::Known;

        let lookup = match &property.key {
            PropertyKey::Computed(key_expr) => {
                let key_class = self.classifier.classify(key_expr);
                self.out.mandatory.push(MandatoryEval {
                    kind: MandatoryKind::ComputedKey,
                    effect: key_class.effect,
                    span: key_expr.span,
                });
                removable &= key_class.is_pure();
                KeyLookup::Unresolved
            }
            PropertyKey::Static(key) => match source.object {
                Some(object) if source.shape == ValueShape::Known => {
                    self.lookup_key(object, &key.node)
                }
                _ => KeyLookup::Unresolved,
            },
        };

        match lookup {
            KeyLookup::Value(child) => {
                // Default provably dead: skip it entirely.
                self.descend(property.id, &property.value, child, removable);
            }
            KeyLookup::Defaulted => {
                let child = match &property.default {
                    Some(default) => {
                        let default_class = self.classifier.classify(default);
                        if default_class.effect == Effect::Effectful {
                            self.out.mandatory.push(MandatoryEval {
                                kind: MandatoryKind::DefaultValue,
                                effect: Effect::Effectful,
                                span: default.span,
                            });
                            removable = false;
                        }
                        self.source_of(Some(default))
                    }
                    None => Source::known_unseen(),
                };
                self.descend(property.id, &property.value, child, removable);
            }
            KeyLookup::Unresolved => {
                if let Some(default) = &property.default {
                    let default_class = self.classifier.classify(default);
                    if default_class.effect == Effect::Effectful {
                        self.out.mandatory.push(MandatoryEval {
                            kind: MandatoryKind::DefaultValue,
                            effect: Effect::Effectful,
                            span: default.span,
                        });
                        removable = false;
                    }
                }
                // The extracted value cannot be pinned down, so everything
                // below sees an opaque source.
                self.descend(property.id, &property.value, Source::opaque(), removable);
            }
        }
    }

    fn lookup_key(&self, object: &'a ObjectExpression, key: &str) -> KeyLookup<'a> {
        let mut found = KeyLookup::Defaulted;
        for member in &object.members {
            match member {
                ObjectMember::Data {
                    key: member_key,
                    value,
                    ..
                } if member_key.as_static() == Some(key) => {
                    found = if is_undefined_literal(value) {
                        KeyLookup::Defaulted
                    } else {
                        KeyLookup::Value(self.source_of(Some(value)))
                    };
                }
                // A shorthand defines the key but its runtime value is the
                // binding's, which the binder does not chase.
                ObjectMember::Shorthand { name, .. } if name.name == key => {
                    found = KeyLookup::Unresolved;
                }
                _ => {}
            }
        }
        found
    }

    fn walk_array(
        &mut self,
        targets: &'a [Option<ArrayPatternElement>],
        elements: &'a [ArrayElement],
        removable: bool,
    ) {
        for (index, target) in targets.iter().enumerate() {
            let Some(target) = target else { continue };
            if target.is_rest {
                self.walk_element(target, KeyLookup::Unresolved, Source::known_unseen(), false);
                continue;
            }
            let lookup = match elements.get(index) {
                Some(ArrayElement::Expression(value)) if !is_undefined_literal(value) => {
                    KeyLookup::Value(self.source_of(Some(value)))
                }
                // Hole, missing, or literal `undefined`.
                _ => KeyLookup::Defaulted,
            };
            self.walk_element(target, lookup, Source::opaque(), removable);
        }
    }

    fn walk_element(
        &mut self,
        element: &'a ArrayPatternElement,
        lookup: KeyLookup<'a>,
        fallback: Source<'a>,
        removable: bool,
    ) {
        let mut removable = removable;
        let child = match lookup {
            KeyLookup::Value(child) => child,
            KeyLookup::Defaulted => match &element.default {
                Some(default) => {
                    let default_class = self.classifier.classify(default);
                    if default_class.effect == Effect::Effectful {
                        self.out.mandatory.push(MandatoryEval {
                            kind: MandatoryKind::DefaultValue,
                            effect: Effect::Effectful,
                            span: default.span,
                        });
                        removable = false;
                    }
                    self.source_of(Some(default))
                }
                None => Source::known_unseen(),
            },
            KeyLookup::Unresolved => {
                if let Some(default) = &element.default {
                    let default_class = self.classifier.classify(default);
                    if default_class.effect == Effect::Effectful {
                        self.out.mandatory.push(MandatoryEval {
                            kind: MandatoryKind::DefaultValue,
                            effect: Effect::Effectful,
                            span: default.span,
                        });
                        removable = false;
                    }
                }
                fallback
            }
        };
        self.path.push(element.id);
        self.walk(&element.pattern, child, removable);
        self.path.pop();
    }

    fn descend(
        &mut self,
        id: NodeId,
        pattern: &'a Pattern,
        source: Source<'a>,
        removable: bool,
    ) {
        self.path.push(id);
        self.walk(pattern, source, removable);
        self.path.pop();
    }
}

fn is_undefined_literal(expr: &Expression) -> bool {
    matches!(expr.kind, ExpressionKind::Literal(Literal::Undefined))
}

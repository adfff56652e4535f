use std::rc::Rc;

use crate::span::Span;
use crate::symbol::Symbol;

/// A single reference to a symbol in a rule's RHS. Grounded on the teacher's
/// `ProductionTail::right_hand_side: Vec<Rc<Symbol>>` in `src/state.rs`,
/// generalized per §9's "polymorphic symbol reference in RHS" note into a
/// plain value carrying an optional label (for downstream code-emission
/// attribute access) and span, instead of a bare `Rc<Symbol>`.
#[derive(Debug, Clone)]
pub struct SymbolRef {
    pub symbol: Rc<Symbol>,
    pub label: Option<String>,
    pub span: Option<Span>,
}

impl SymbolRef {
    pub fn new(symbol: Rc<Symbol>) -> Self {
        Self {
            symbol,
            label: None,
            span: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

/// An ordered production `(index, lhs, rhs, action, precedence-override)`.
/// `index` is the rule's 0-based insertion order, stable for the life of
/// the `Grammar` — grounded on `Production` in the teacher's `src/state.rs`,
/// but carrying the action as an opaque `String` (never parsed by the
/// core) rather than the teacher's own typed action-block representation,
/// and an explicit precedence-override symbol instead of the teacher's
/// derived-only `rhs_associated_precedence`.
#[derive(Debug, Clone)]
pub struct Rule {
    index: u32,
    lhs: Rc<Symbol>,
    rhs: Vec<SymbolRef>,
    action: Option<String>,
    precedence_override: Option<Rc<Symbol>>,
}

impl Rule {
    pub fn new(
        index: u32,
        lhs: Rc<Symbol>,
        rhs: Vec<SymbolRef>,
        action: Option<String>,
        precedence_override: Option<Rc<Symbol>>,
    ) -> Self {
        Self {
            index,
            lhs,
            rhs,
            action,
            precedence_override,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn lhs(&self) -> &Rc<Symbol> {
        &self.lhs
    }

    pub fn rhs(&self) -> &[SymbolRef] {
        &self.rhs
    }

    pub fn rhs_symbols(&self) -> impl Iterator<Item = &Rc<Symbol>> {
        self.rhs.iter().map(|r| &r.symbol)
    }

    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn precedence_override(&self) -> Option<&Rc<Symbol>> {
        self.precedence_override.as_ref()
    }

    /// The rule's effective precedence level: the override if one was
    /// given, else the rightmost terminal in the RHS, else 0 (unassigned).
    /// Implements §4.6's "determined by the rule's explicit override if
    /// any, else by the precedence of the rightmost terminal".
    pub fn precedence(&self) -> u32 {
        if let Some(sym) = &self.precedence_override {
            return sym.precedence();
        }
        for sym_ref in self.rhs.iter().rev() {
            if sym_ref.symbol.is_terminal() {
                return sym_ref.symbol.precedence();
            }
        }
        0
    }

    pub fn associativity(&self) -> crate::symbol::Associativity {
        if let Some(sym) = &self.precedence_override {
            return sym.associativity();
        }
        for sym_ref in self.rhs.iter().rev() {
            if sym_ref.symbol.is_terminal() {
                return sym_ref.symbol.associativity();
            }
        }
        crate::symbol::Associativity::None
    }
}

use std::collections::BTreeMap;
use std::rc::Rc;

use crate::diagnostics::DiagnosticSink;
use crate::rule::Rule;
use crate::symbol::{Symbol, SymbolTable};

/// A directive's stored payload, once its `DirectiveKind`-specific effect
/// (if any) has already been applied by the builder. Most kinds in §6's
/// table are "opaque, stored verbatim ... for downstream emission" — this
/// is the value type for that verbatim storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectivePayload {
    Value(String),
    Symbols(Vec<String>),
    Code(String),
}

/// The four one-way phases a `Grammar` passes through (§4.7). Checked with
/// `debug_assert!` at stage entry points — an out-of-order call is an
/// implementation bug, not a user-facing error, matching the teacher's
/// `panic!("key sets should be identical to get here")` style internal
/// assertion in `state.rs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Open,
    Finalized,
    Analyzed,
    Tabulated,
}

/// The ground truth every later stage consumes: interned symbols, ordered
/// rules, the selected start symbol, and free-form directive storage.
/// Grounded on the teacher's `ParserSpecification` in the original
/// `src/grammar.rs`, but the `lexan`-backed `SymbolTable`/error-to-stderr
/// pair is replaced with this crate's own `symbol::SymbolTable` and a
/// collected `DiagnosticSink`.
#[derive(Debug)]
pub struct Grammar {
    symbol_table: SymbolTable,
    rules: Vec<Rule>,
    start_symbol: Option<Rc<Symbol>>,
    directives: BTreeMap<String, DirectivePayload>,
    diagnostics: DiagnosticSink,
    phase: Phase,
    accept_rule_index: Option<u32>,
}

impl Default for Grammar {
    fn default() -> Self {
        Self::new()
    }
}

impl Grammar {
    pub fn new() -> Self {
        Self {
            symbol_table: SymbolTable::new(),
            rules: Vec::new(),
            start_symbol: None,
            directives: BTreeMap::new(),
            diagnostics: DiagnosticSink::new(),
            phase: Phase::Open,
            accept_rule_index: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        debug_assert!(phase as u8 >= self.phase as u8, "phases never go backwards");
        self.phase = phase;
    }

    pub fn symbol_table(&self) -> &SymbolTable {
        &self.symbol_table
    }

    pub(crate) fn symbol_table_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbol_table
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub(crate) fn push_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    pub fn rule(&self, index: u32) -> &Rule {
        &self.rules[index as usize]
    }

    pub fn start_symbol(&self) -> Option<&Rc<Symbol>> {
        self.start_symbol.as_ref()
    }

    pub(crate) fn set_start_symbol(&mut self, symbol: Rc<Symbol>) {
        self.start_symbol = Some(symbol);
    }

    pub fn accept_rule_index(&self) -> Option<u32> {
        self.accept_rule_index
    }

    pub(crate) fn set_accept_rule_index(&mut self, index: u32) {
        self.accept_rule_index = Some(index);
    }

    pub fn directive(&self, key: &str) -> Option<&DirectivePayload> {
        self.directives.get(key)
    }

    pub fn directives(&self) -> &BTreeMap<String, DirectivePayload> {
        &self.directives
    }

    /// Stores `payload` under `key`; returns `true` if this overwrote an
    /// existing entry (the caller turns that into a "directive overwrite"
    /// warning).
    pub(crate) fn set_directive(&mut self, key: impl Into<String>, payload: DirectivePayload) -> bool {
        self.directives.insert(key.into(), payload).is_some()
    }

    pub fn diagnostics(&self) -> &DiagnosticSink {
        &self.diagnostics
    }

    pub(crate) fn diagnostics_mut(&mut self) -> &mut DiagnosticSink {
        &mut self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn terminal_count(&self) -> usize {
        self.symbol_table.terminal_count()
    }

    pub fn nonterminal_count(&self) -> usize {
        self.symbol_table.nonterminal_count()
    }
}

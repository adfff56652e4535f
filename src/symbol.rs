use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use crate::span::Span;

pub const END_MARKER_NAME: &str = "$";
pub const ACCEPT_NAME: &str = "$accept";
pub const INVALID_NAME: &str = "<invalid>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Terminal,
    Nonterminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    None,
    Left,
    Right,
    NonAssoc,
}

impl Default for Associativity {
    fn default() -> Self {
        Associativity::None
    }
}

impl fmt::Display for Associativity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Associativity::None => write!(f, "None"),
            Associativity::Left => write!(f, "Left"),
            Associativity::Right => write!(f, "Right"),
            Associativity::NonAssoc => write!(f, "NonAssoc"),
        }
    }
}

/// An interned grammar symbol. Always handled as `Rc<Symbol>`; identity
/// (equality, ordering, hashing) is the dense `ident`, not the name.
#[derive(Debug)]
pub struct Symbol {
    ident: u32,
    name: String,
    kind: SymbolKind,
    type_annotation: RefCell<Option<String>>,
    precedence: Cell<u32>,
    associativity: Cell<Associativity>,
    defined_at: RefCell<Option<Span>>,
    used_at: RefCell<Vec<Span>>,
    used: Cell<bool>,
    terminal_index: Cell<Option<u32>>,
    nonterminal_index: Cell<Option<u32>>,
}

impl_ident_cmp!(Symbol);

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Symbol {
    fn new(ident: u32, name: &str, kind: SymbolKind, defined_at: Option<Span>) -> Rc<Self> {
        Rc::new(Self {
            ident,
            name: name.to_string(),
            kind,
            type_annotation: RefCell::new(None),
            precedence: Cell::new(0),
            associativity: Cell::new(Associativity::None),
            defined_at: RefCell::new(defined_at),
            used_at: RefCell::new(vec![]),
            used: Cell::new(false),
            terminal_index: Cell::new(None),
            nonterminal_index: Cell::new(None),
        })
    }

    pub fn ident(&self) -> u32 {
        self.ident
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == SymbolKind::Terminal
    }

    pub fn is_nonterminal(&self) -> bool {
        self.kind == SymbolKind::Nonterminal
    }

    pub fn is_end_marker(&self) -> bool {
        self.ident == 0
    }

    pub fn is_accept(&self) -> bool {
        self.name == ACCEPT_NAME
    }

    pub fn is_invalid(&self) -> bool {
        self.name == INVALID_NAME
    }

    pub fn defined_at(&self) -> Option<Span> {
        self.defined_at.borrow().clone()
    }

    pub fn add_defined_at(&self, span: &Span) {
        let mut defined_at = self.defined_at.borrow_mut();
        if defined_at.is_none() {
            *defined_at = Some(span.clone());
        }
    }

    pub fn add_used_at(&self, span: &Span) {
        self.used_at.borrow_mut().push(span.clone());
        self.used.set(true);
    }

    /// Marks the symbol as referenced without an associated span (e.g. a
    /// `%left`/`%right`/`%nonassoc` terminal list entry).
    pub fn mark_used(&self) {
        self.used.set(true);
    }

    pub fn is_used(&self) -> bool {
        self.used.get()
    }

    pub fn type_annotation(&self) -> Option<String> {
        self.type_annotation.borrow().clone()
    }

    /// Returns `false` when an annotation was already present (caller
    /// reports the conflict; the first assignment wins).
    pub fn set_type_annotation(&self, annotation: &str) -> bool {
        let mut current = self.type_annotation.borrow_mut();
        if current.is_some() {
            false
        } else {
            *current = Some(annotation.to_string());
            true
        }
    }

    pub fn precedence(&self) -> u32 {
        self.precedence.get()
    }

    pub fn associativity(&self) -> Associativity {
        self.associativity.get()
    }

    pub fn precedence_assigned(&self) -> bool {
        self.precedence.get() != 0
    }

    /// Returns `false` (and leaves the symbol untouched) if a precedence
    /// level was already assigned; the builder turns that into a warning.
    pub fn set_precedence(&self, associativity: Associativity, level: u32) -> bool {
        if self.precedence_assigned() {
            false
        } else {
            self.precedence.set(level);
            self.associativity.set(associativity);
            true
        }
    }

    /// Dense index into `ParseTable::action`'s terminal axis. `None` until
    /// `Grammar::finalize` assigns indices, and always `None` for a
    /// nonterminal.
    pub fn terminal_index(&self) -> Option<u32> {
        self.terminal_index.get()
    }

    pub fn set_terminal_index(&self, index: u32) {
        debug_assert!(self.is_terminal());
        self.terminal_index.set(Some(index));
    }

    /// Dense index into `ParseTable::goto`'s nonterminal axis.
    pub fn nonterminal_index(&self) -> Option<u32> {
        self.nonterminal_index.get()
    }

    pub fn set_nonterminal_index(&self, index: u32) {
        debug_assert!(self.is_nonterminal());
        self.nonterminal_index.set(Some(index));
    }
}

/// By-name map plus dense-ID vector, following `alap_gen_ng::symbol::SymbolTable`'s
/// shape but collapsed to a single shared Terminal/Nonterminal namespace, per
/// the data model's "symbol names are unique across both kinds" rule.
#[derive(Debug)]
pub struct SymbolTable {
    by_name: BTreeMap<String, Rc<Symbol>>,
    by_id: Vec<Rc<Symbol>>,
    next_precedence_level: u32,
    invalid_symbol: Rc<Symbol>,
    end_marker: Rc<Symbol>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        let end_marker = Symbol::new(0, END_MARKER_NAME, SymbolKind::Terminal, None);
        let invalid_symbol = Symbol::new(1, INVALID_NAME, SymbolKind::Nonterminal, None);
        let mut by_name = BTreeMap::new();
        by_name.insert(END_MARKER_NAME.to_string(), Rc::clone(&end_marker));
        by_name.insert(INVALID_NAME.to_string(), Rc::clone(&invalid_symbol));
        Self {
            by_name,
            by_id: vec![Rc::clone(&end_marker), Rc::clone(&invalid_symbol)],
            next_precedence_level: 0,
            invalid_symbol,
            end_marker,
        }
    }

    pub fn end_marker(&self) -> Rc<Symbol> {
        Rc::clone(&self.end_marker)
    }

    pub fn invalid_symbol(&self) -> Rc<Symbol> {
        Rc::clone(&self.invalid_symbol)
    }

    pub fn lookup(&self, name: &str) -> Option<Rc<Symbol>> {
        self.by_name.get(name).cloned()
    }

    /// Interns `name` as `kind`. `Ok` on a fresh or matching-kind symbol;
    /// `Err(existing)` when `name` is already known under a different
    /// kind (the caller records the diagnostic and keeps using `existing`).
    pub fn intern(&mut self, name: &str, kind: SymbolKind, span: Option<&Span>) -> Result<Rc<Symbol>, Rc<Symbol>> {
        if name.is_empty() {
            return Ok(self.invalid_symbol());
        }
        if let Some(existing) = self.by_name.get(name) {
            if existing.kind() == kind {
                if let Some(span) = span {
                    existing.add_defined_at(span);
                }
                Ok(Rc::clone(existing))
            } else {
                Err(Rc::clone(existing))
            }
        } else {
            let ident = self.by_id.len() as u32;
            let symbol = Symbol::new(ident, name, kind, span.cloned());
            self.by_name.insert(name.to_string(), Rc::clone(&symbol));
            self.by_id.push(Rc::clone(&symbol));
            Ok(symbol)
        }
    }

    /// Reserves `$accept`, called once by `Grammar::finalize`.
    pub fn intern_accept(&mut self) -> Rc<Symbol> {
        self.intern(ACCEPT_NAME, SymbolKind::Nonterminal, None)
            .expect("$accept cannot already exist with a conflicting kind")
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// All interned symbols in dense-ID order — the one iteration order
    /// downstream stages are allowed to depend on.
    pub fn symbols(&self) -> impl Iterator<Item = &Rc<Symbol>> {
        self.by_id.iter()
    }

    pub fn terminals(&self) -> impl Iterator<Item = &Rc<Symbol>> {
        self.by_id.iter().filter(|s| s.is_terminal())
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = &Rc<Symbol>> {
        self.by_id.iter().filter(|s| s.is_nonterminal())
    }

    pub fn next_precedence_level(&mut self) -> u32 {
        self.next_precedence_level += 1;
        self.next_precedence_level
    }

    /// Assigns the dense per-kind indices (`$` at terminal index 0) used by
    /// `ParseTable`'s axes. Idempotent; called once by `Grammar::finalize`
    /// after augmentation so every symbol, including `$accept`, is covered.
    pub fn assign_table_indices(&self) {
        for (i, symbol) in self.terminals().enumerate() {
            symbol.set_terminal_index(i as u32);
        }
        for (i, symbol) in self.nonterminals().enumerate() {
            symbol.set_nonterminal_index(i as u32);
        }
    }

    pub fn terminal_count(&self) -> usize {
        self.terminals().count()
    }

    pub fn nonterminal_count(&self) -> usize {
        self.nonterminals().count()
    }
}

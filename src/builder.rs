use std::rc::Rc;

use crate::grammar::{DirectivePayload, Grammar, Phase};
use crate::options::GeneratorOptions;
use crate::rule::{Rule, SymbolRef};
use crate::span::Span;
use crate::symbol::{Symbol, SymbolKind};
use crate::validate;

/// Directive kinds the core recognizes, per §6's upstream table. The first
/// seven carry a specific effect on the `Grammar`; the rest are stored
/// verbatim for downstream code emitters that this crate never inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DirectiveKind {
    StartSymbol,
    Token,
    Type,
    TokenType,
    Left,
    Right,
    Nonassoc,
    Include,
    Code,
    Fallback,
    Wildcard,
    DefaultType,
    DefaultDestructor,
    Destructor,
    ExtraArgument,
    TokenPrefix,
    Name,
    StackSize,
    StackOverflow,
    SyntaxError,
    ParseAccept,
    ParseFailure,
}

impl DirectiveKind {
    fn key(self) -> &'static str {
        use DirectiveKind::*;
        match self {
            StartSymbol => "start_symbol",
            Token => "token",
            Type => "type",
            TokenType => "token_type",
            Left => "left",
            Right => "right",
            Nonassoc => "nonassoc",
            Include => "include",
            Code => "code",
            Fallback => "fallback",
            Wildcard => "wildcard",
            DefaultType => "default_type",
            DefaultDestructor => "default_destructor",
            Destructor => "destructor",
            ExtraArgument => "extra_argument",
            TokenPrefix => "token_prefix",
            Name => "name",
            StackSize => "stack_size",
            StackOverflow => "stack_overflow",
            SyntaxError => "syntax_error",
            ParseAccept => "parse_accept",
            ParseFailure => "parse_failure",
        }
    }
}

/// One untyped reference to a symbol as it arrives from the (out-of-scope)
/// grammar-file parser: a bare name plus an optional kind the upstream
/// parser already knows (e.g. because the ref came from inside a `%token`
/// directive) and an optional span.
#[derive(Debug, Clone)]
pub struct RhsRef {
    pub name: String,
    pub kind_hint: Option<SymbolKind>,
    pub span: Option<Span>,
}

impl RhsRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind_hint: None,
            span: None,
        }
    }

    pub fn with_kind(mut self, kind: SymbolKind) -> Self {
        self.kind_hint = Some(kind);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }
}

struct PendingRule {
    lhs: Rc<Symbol>,
    span: Option<Span>,
    alternative_count: u32,
}

/// The event sink §4.1 describes: consumes `directive`/`begin_rule`/
/// `alternative`/`end_rule`/`parser_error` events in source order and
/// incrementally builds a `Grammar`. Grounded on `ParserSpecification` in
/// the teacher's original `src/grammar.rs` (same role — the thing the
/// surface-syntax parser pushes events into) but restructured as an
/// explicit event-method API per §4.1/§9's "event-driven construction"
/// note, instead of the teacher's ad-hoc `add_token`/`set_precedence`
/// methods called directly from parser actions.
pub struct Builder {
    grammar: Grammar,
    options: GeneratorOptions,
    pending: Option<PendingRule>,
    start_explicit: bool,
}

impl Builder {
    pub fn new(options: GeneratorOptions) -> Self {
        Self {
            grammar: Grammar::new(),
            options,
            pending: None,
            start_explicit: false,
        }
    }

    fn looks_like_terminal(name: &str) -> bool {
        let has_non_letter = name.chars().any(|c| !c.is_ascii_alphabetic());
        let all_upper = !name.is_empty() && name.chars().all(|c| c.is_ascii_uppercase());
        has_non_letter || all_upper
    }

    /// Implements the RHS-kind-inference algorithm of §4.1: an explicit
    /// hint wins, then an existing interning, then (if enabled) the
    /// ALLCAPS/non-letter heuristic, defaulting to nonterminal.
    fn infer_kind(&self, name: &str, hint: Option<SymbolKind>) -> SymbolKind {
        if let Some(kind) = hint {
            return kind;
        }
        if let Some(existing) = self.grammar.symbol_table().lookup(name) {
            return existing.kind();
        }
        if self.options.allcaps_heuristic && Self::looks_like_terminal(name) {
            SymbolKind::Terminal
        } else {
            SymbolKind::Nonterminal
        }
    }

    fn intern_ref(&mut self, reference: &RhsRef) -> Rc<Symbol> {
        if reference.name.is_empty() {
            self.grammar
                .diagnostics_mut()
                .error(reference.span.clone(), "empty symbol name");
            return self.grammar.symbol_table().invalid_symbol();
        }
        let kind = self.infer_kind(&reference.name, reference.kind_hint);
        let symbol = match self
            .grammar
            .symbol_table_mut()
            .intern(&reference.name, kind, reference.span.as_ref())
        {
            Ok(symbol) => symbol,
            Err(existing) => {
                self.grammar.diagnostics_mut().error(
                    reference.span.clone(),
                    format!(
                        "\"{}\" already declared as a {:?}",
                        reference.name,
                        existing.kind()
                    ),
                );
                existing
            }
        };
        if let Some(span) = &reference.span {
            symbol.add_used_at(span);
        }
        symbol
    }

    /// Interns `name` without marking it used — for declaration-only
    /// contexts (`%token`, `%left`/`%right`/`%nonassoc` lists).
    fn declare_ref(&mut self, reference: &RhsRef, forced_kind: SymbolKind) -> Rc<Symbol> {
        if reference.name.is_empty() {
            self.grammar
                .diagnostics_mut()
                .error(reference.span.clone(), "empty symbol name");
            return self.grammar.symbol_table().invalid_symbol();
        }
        match self.grammar.symbol_table_mut().intern(
            &reference.name,
            forced_kind,
            reference.span.as_ref(),
        ) {
            Ok(symbol) => symbol,
            Err(existing) => {
                self.grammar.diagnostics_mut().error(
                    reference.span.clone(),
                    format!(
                        "\"{}\" already declared as a {:?}",
                        reference.name,
                        existing.kind()
                    ),
                );
                existing
            }
        }
    }

    fn define_precedence_group(
        &mut self,
        associativity: crate::symbol::Associativity,
        terminals: &[RhsRef],
    ) {
        let level = self.grammar.symbol_table_mut().next_precedence_level();
        for reference in terminals {
            let symbol = self.declare_ref(reference, SymbolKind::Terminal);
            symbol.mark_used();
            if !symbol.set_precedence(associativity, level) {
                self.grammar.diagnostics_mut().warning(
                    reference.span.clone(),
                    format!("precedence already assigned to \"{}\"", symbol.name()),
                );
            }
        }
    }

    pub fn directive(&mut self, kind: DirectiveKind, payload: DirectivePayload, span: Option<Span>) {
        use DirectiveKind::*;
        match kind {
            StartSymbol => {
                if let DirectivePayload::Value(name) = payload {
                    let symbol = self.intern_ref(&RhsRef {
                        name,
                        kind_hint: None,
                        span: span.clone(),
                    });
                    self.grammar.set_start_symbol(symbol);
                    self.start_explicit = true;
                } else {
                    self.grammar
                        .diagnostics_mut()
                        .error(span, "%start_symbol requires a single symbol name");
                }
            }
            Token => {
                if let DirectivePayload::Symbols(names) = payload {
                    for name in names {
                        self.declare_ref(
                            &RhsRef {
                                name,
                                kind_hint: None,
                                span: span.clone(),
                            },
                            SymbolKind::Terminal,
                        );
                    }
                } else {
                    self.grammar
                        .diagnostics_mut()
                        .error(span, "%token requires one or more symbol names");
                }
            }
            Type => {
                if let DirectivePayload::Symbols(names) = payload {
                    for name in names {
                        let symbol = self.intern_ref(&RhsRef {
                            name,
                            kind_hint: None,
                            span: span.clone(),
                        });
                        if !symbol.set_type_annotation("<type>") {
                            self.grammar.diagnostics_mut().warning(
                                span.clone(),
                                format!("type annotation already assigned to \"{}\"", symbol.name()),
                            );
                        }
                    }
                } else {
                    self.grammar
                        .diagnostics_mut()
                        .error(span, "%type requires one or more symbol names");
                }
            }
            Left | Right | Nonassoc => {
                if let DirectivePayload::Symbols(names) = payload {
                    let refs: Vec<RhsRef> = names
                        .into_iter()
                        .map(|name| RhsRef {
                            name,
                            kind_hint: None,
                            span: span.clone(),
                        })
                        .collect();
                    let associativity = match kind {
                        Left => crate::symbol::Associativity::Left,
                        Right => crate::symbol::Associativity::Right,
                        Nonassoc => crate::symbol::Associativity::NonAssoc,
                        _ => unreachable!(),
                    };
                    self.define_precedence_group(associativity, &refs);
                } else {
                    self.grammar.diagnostics_mut().error(
                        span,
                        "precedence directives require one or more terminal names",
                    );
                }
            }
            _ => {
                let overwrote = self.grammar.set_directive(kind.key(), payload);
                if overwrote {
                    self.grammar.diagnostics_mut().warning(
                        span,
                        format!("directive \"{}\" overwrites a previous value", kind.key()),
                    );
                }
            }
        }
    }

    pub fn begin_rule(&mut self, lhs_ref: RhsRef) {
        debug_assert!(self.pending.is_none(), "begin_rule called while a rule is open");
        let span = lhs_ref.span.clone();
        let lhs = self.intern_ref(&lhs_ref);
        if self.grammar.start_symbol().is_none() {
            self.grammar.set_start_symbol(Rc::clone(&lhs));
        }
        self.pending = Some(PendingRule {
            lhs,
            span,
            alternative_count: 0,
        });
    }

    pub fn alternative(
        &mut self,
        rhs_refs: Vec<RhsRef>,
        action: Option<String>,
        precedence_override: Option<RhsRef>,
        span: Option<Span>,
    ) {
        let pending = self
            .pending
            .as_mut()
            .expect("alternative called with no open rule");
        pending.alternative_count += 1;
        let lhs = Rc::clone(&pending.lhs);
        let rhs: Vec<SymbolRef> = rhs_refs
            .iter()
            .map(|r| {
                let symbol = self.intern_ref(r);
                let mut symbol_ref = SymbolRef::new(symbol);
                if let Some(s) = &r.span {
                    symbol_ref = symbol_ref.with_span(s.clone());
                }
                symbol_ref
            })
            .collect();
        let precedence_override = precedence_override.map(|r| self.intern_ref(&r));
        let index = self.grammar.rules().len() as u32;
        self.grammar
            .push_rule(Rule::new(index, lhs, rhs, action, precedence_override));
        let _ = span;
    }

    pub fn end_rule(&mut self, span: Option<Span>) {
        let pending = self.pending.take().expect("end_rule called with no open rule");
        if pending.alternative_count == 0 {
            self.grammar.diagnostics_mut().error(
                span.or(pending.span),
                format!("rule for \"{}\" has no alternatives", pending.lhs.name()),
            );
        }
    }

    pub fn parser_error(&mut self, span: Option<Span>, message: impl Into<String>) {
        self.grammar.diagnostics_mut().error(span, message);
    }

    /// Runs the validator and, if no fatal errors were found, appends the
    /// augmentation rule `$accept → S`, assigns dense per-kind table
    /// indices, and advances the grammar to `Phase::Finalized`.
    pub fn finalize(mut self) -> Grammar {
        let report = validate::validate(&self.grammar);
        let had_fatal = report.has_errors();
        self.grammar.diagnostics_mut().append(report);

        if !had_fatal {
            if let Some(start) = self.grammar.start_symbol().cloned() {
                let accept = self.grammar.symbol_table_mut().intern_accept();
                let index = self.grammar.rules().len() as u32;
                self.grammar.push_rule(Rule::new(
                    index,
                    accept,
                    vec![SymbolRef::new(start)],
                    None,
                    None,
                ));
                self.grammar.set_accept_rule_index(index);
                self.grammar.symbol_table().assign_table_indices();
            }
        }
        self.grammar.set_phase(Phase::Finalized);
        self.grammar
    }

    /// Escape hatch for tests that want to inspect an un-augmented,
    /// un-validated `Grammar` (e.g. to feed straight to `validate::validate`
    /// and assert on its diagnostics).
    #[cfg(test)]
    pub(crate) fn into_grammar_unchecked(self) -> Grammar {
        self.grammar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::GeneratorOptions;
    use crate::symbol::SymbolKind;

    fn nt(name: &str) -> RhsRef {
        RhsRef::new(name).with_kind(SymbolKind::Nonterminal)
    }

    fn t(name: &str) -> RhsRef {
        RhsRef::new(name).with_kind(SymbolKind::Terminal)
    }

    #[test]
    fn first_rule_lhs_becomes_start_symbol() {
        let mut builder = Builder::new(GeneratorOptions::default());
        builder.begin_rule(nt("S"));
        builder.alternative(vec![t("a")], None, None, None);
        builder.end_rule(None);
        let grammar = builder.finalize();
        assert_eq!(grammar.start_symbol().unwrap().name(), "S");
    }

    #[test]
    fn explicit_start_symbol_directive_wins() {
        let mut builder = Builder::new(GeneratorOptions::default());
        builder.begin_rule(nt("S"));
        builder.alternative(vec![nt("T")], None, None, None);
        builder.end_rule(None);
        builder.begin_rule(nt("T"));
        builder.alternative(vec![t("a")], None, None, None);
        builder.end_rule(None);
        builder.directive(
            DirectiveKind::StartSymbol,
            DirectivePayload::Value("T".to_string()),
            None,
        );
        let grammar = builder.finalize();
        assert_eq!(grammar.start_symbol().unwrap().name(), "T");
    }

    #[test]
    fn augmentation_rule_is_appended_last() {
        let mut builder = Builder::new(GeneratorOptions::default());
        builder.begin_rule(nt("S"));
        builder.alternative(vec![t("a")], None, None, None);
        builder.end_rule(None);
        let grammar = builder.finalize();
        let accept_index = grammar.accept_rule_index().unwrap();
        let rule = grammar.rule(accept_index);
        assert!(rule.lhs().is_accept());
        assert_eq!(rule.rhs().len(), 1);
        assert_eq!(rule.rhs()[0].symbol.name(), "S");
    }

    #[test]
    fn rule_with_no_alternatives_is_an_error() {
        let mut builder = Builder::new(GeneratorOptions::default());
        builder.begin_rule(nt("S"));
        builder.end_rule(None);
        let grammar = builder.finalize();
        assert!(grammar.has_errors());
    }

    #[test]
    fn allcaps_heuristic_infers_terminal() {
        let mut builder = Builder::new(GeneratorOptions::default());
        builder.begin_rule(nt("S"));
        builder.alternative(vec![RhsRef::new("NUM")], None, None, None);
        builder.end_rule(None);
        let grammar = builder.finalize();
        let num = grammar.symbol_table().lookup("NUM").unwrap();
        assert!(num.is_terminal());
    }

    #[test]
    fn precedence_group_assigns_ascending_levels() {
        let mut builder = Builder::new(GeneratorOptions::default());
        builder.directive(
            DirectiveKind::Left,
            DirectivePayload::Symbols(vec!["PLUS".to_string()]),
            None,
        );
        builder.directive(
            DirectiveKind::Left,
            DirectivePayload::Symbols(vec!["TIMES".to_string()]),
            None,
        );
        builder.begin_rule(nt("E"));
        builder.alternative(vec![t("NUM")], None, None, None);
        builder.end_rule(None);
        let grammar = builder.finalize();
        let plus = grammar.symbol_table().lookup("PLUS").unwrap();
        let times = grammar.symbol_table().lookup("TIMES").unwrap();
        assert_eq!(plus.precedence(), 1);
        assert_eq!(times.precedence(), 2);
    }
}

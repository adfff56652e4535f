#[macro_use]
mod macros;

pub mod analysis;
pub mod automaton;
pub mod builder;
pub mod diagnostics;
pub mod error;
pub mod grammar;
pub mod item;
pub mod lookahead;
pub mod options;
pub mod rule;
pub mod sets;
pub mod span;
pub mod symbol;
pub mod table;
pub mod validate;

pub use automaton::{build_canonical, Automaton, State, Transition};
pub use builder::{Builder, DirectiveKind, RhsRef};
pub use diagnostics::{Diagnostic, DiagnosticSink, Severity};
pub use error::Error;
pub use grammar::{DirectivePayload, Grammar, Phase};
pub use lookahead::{compute_lookaheads, LookaheadTable};
pub use options::{GeneratorOptions, LalrMode};
pub use span::Span;
pub use symbol::{Associativity, Symbol, SymbolKind, SymbolTable};
pub use table::{build_tables, Action, Conflict, ConflictKind, ConflictReport, ParseTable};

/// Runs the full pipeline — `Builder::finalize` output through
/// `build_canonical`, nullable/FIRST/FOLLOW, `compute_lookaheads`, and
/// `build_tables` — for callers (and the end-to-end tests below) that want
/// every intermediate value without re-wiring the stages by hand.
pub struct Generated {
    pub grammar: Grammar,
    pub automaton: Automaton,
    pub nullable: sets::IdSet,
    pub first: std::collections::BTreeMap<u32, sets::IdSet>,
    pub follow: std::collections::BTreeMap<u32, sets::IdSet>,
    pub lookaheads: LookaheadTable,
    pub table: ParseTable,
    pub conflicts: ConflictReport,
}

/// Runs `Generated`'s full pipeline over an already-`finalize`d grammar.
/// Refuses when the grammar isn't fit to tabulate: no rules at all, a
/// start symbol that isn't a nonterminal, or (the catch-all) any other
/// fatal diagnostic recorded during validation — building an automaton
/// over any of those would just propagate garbage.
pub fn generate(grammar: Grammar, options: GeneratorOptions) -> Result<Generated, Error> {
    if grammar.rules().is_empty() {
        return Err(Error::EmptyGrammar);
    }
    match grammar.start_symbol() {
        None => return Err(Error::InvalidStartSymbol(String::new())),
        Some(start) if !start.is_nonterminal() => {
            return Err(Error::InvalidStartSymbol(start.name().to_string()));
        }
        _ => {}
    }
    if grammar.has_errors() {
        return Err(Error::HasErrors);
    }
    let automaton = build_canonical(&grammar);
    let nullable = analysis::nullable(&grammar);
    let first = analysis::first_sets(&grammar, &nullable);
    let follow = analysis::follow_sets(&grammar, &nullable, &first);
    let lookaheads = compute_lookaheads(&automaton, &grammar, &nullable, &first, &follow, options);
    let (table, conflicts) = build_tables(&automaton, &grammar, &lookaheads);
    Ok(Generated {
        grammar,
        automaton,
        nullable,
        first,
        follow,
        lookaheads,
        table,
        conflicts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::SymbolKind;

    fn nt(name: &str) -> RhsRef {
        RhsRef::new(name).with_kind(SymbolKind::Nonterminal)
    }

    fn t(name: &str) -> RhsRef {
        RhsRef::new(name).with_kind(SymbolKind::Terminal)
    }

    fn ident(grammar: &Grammar, name: &str) -> u32 {
        grammar.symbol_table().lookup(name).unwrap().ident()
    }

    // Scenario 1: classic unambiguous arithmetic grammar.
    #[test]
    fn arithmetic_grammar_has_twelve_states_and_no_conflicts() {
        let mut b = Builder::new(GeneratorOptions::default());
        b.begin_rule(nt("E"));
        b.alternative(vec![nt("E"), t("PLUS"), nt("T")], None, None, None);
        b.alternative(vec![nt("T")], None, None, None);
        b.end_rule(None);
        b.begin_rule(nt("T"));
        b.alternative(vec![nt("T"), t("TIMES"), nt("F")], None, None, None);
        b.alternative(vec![nt("F")], None, None, None);
        b.end_rule(None);
        b.begin_rule(nt("F"));
        b.alternative(vec![t("LP"), nt("E"), t("RP")], None, None, None);
        b.alternative(vec![t("NUM")], None, None, None);
        b.end_rule(None);
        let grammar = b.finalize();
        assert!(!grammar.has_errors());

        let generated = generate(grammar, GeneratorOptions::default()).unwrap();
        assert_eq!(generated.automaton.states().len(), 12);
        assert_eq!(generated.conflicts.conflicts().len(), 0);

        let lp = ident(&generated.grammar, "LP");
        let num = ident(&generated.grammar, "NUM");
        for name in ["E", "T", "F"] {
            let id = ident(&generated.grammar, name);
            let set = &generated.first[&id];
            assert_eq!(set.len(), 2);
            assert!(set.contains(lp) && set.contains(num));
        }

        let dollar = generated.grammar.symbol_table().end_marker().ident();
        let plus = ident(&generated.grammar, "PLUS");
        let times = ident(&generated.grammar, "TIMES");
        let rp = ident(&generated.grammar, "RP");
        let e = ident(&generated.grammar, "E");
        let t_id = ident(&generated.grammar, "T");
        let f_id = ident(&generated.grammar, "F");
        assert_eq!(generated.follow[&e].len(), 3);
        assert!(generated.follow[&e].contains(dollar) && generated.follow[&e].contains(plus) && generated.follow[&e].contains(rp));
        assert_eq!(generated.follow[&t_id], generated.follow[&f_id]);
        assert!(generated.follow[&t_id].contains(times));
    }

    // Scenario 2: ambiguous arithmetic resolved by %left precedence.
    #[test]
    fn left_associative_precedence_resolves_all_shift_reduce_conflicts() {
        let mut b = Builder::new(GeneratorOptions::default());
        b.directive(DirectiveKind::Left, DirectivePayload::Symbols(vec!["PLUS".to_string()]), None);
        b.directive(DirectiveKind::Left, DirectivePayload::Symbols(vec!["TIMES".to_string()]), None);
        b.begin_rule(nt("E"));
        b.alternative(vec![nt("E"), t("PLUS"), nt("E")], None, None, None);
        b.alternative(vec![nt("E"), t("TIMES"), nt("E")], None, None, None);
        b.alternative(vec![t("NUM")], None, None, None);
        b.end_rule(None);
        let grammar = b.finalize();

        let generated = generate(grammar, GeneratorOptions::default()).unwrap();
        assert!(generated.conflicts.conflicts().iter().all(|c| c.resolved));
        assert!(generated
            .conflicts
            .conflicts()
            .iter()
            .any(|c| c.kind == ConflictKind::ShiftReduce));
    }

    // Scenario 3: right-associative CARET shifts instead of reducing.
    #[test]
    fn right_associative_precedence_shifts() {
        let mut b = Builder::new(GeneratorOptions::default());
        b.directive(DirectiveKind::Right, DirectivePayload::Symbols(vec!["CARET".to_string()]), None);
        b.begin_rule(nt("E"));
        b.alternative(vec![nt("E"), t("CARET"), nt("E")], None, None, None);
        b.alternative(vec![t("NUM")], None, None, None);
        b.end_rule(None);
        let grammar = b.finalize();

        let generated = generate(grammar, GeneratorOptions::default()).unwrap();
        let caret_index = generated.grammar.symbol_table().lookup("CARET").unwrap().terminal_index().unwrap();
        let found_shift = generated.automaton.states().iter().any(|s| {
            matches!(generated.table.action(s.id(), caret_index), Action::Shift(_))
        });
        assert!(found_shift);
        for conflict in generated.conflicts.conflicts() {
            if conflict.terminal == caret_index {
                assert!(matches!(generated.table.action(conflict.state, caret_index), Action::Shift(_)));
            }
        }
    }

    // Scenario 4: nonassoc EQ produces an Error cell at the conflict point.
    #[test]
    fn nonassoc_precedence_yields_error_cell() {
        let mut b = Builder::new(GeneratorOptions::default());
        b.directive(DirectiveKind::Nonassoc, DirectivePayload::Symbols(vec!["EQ".to_string()]), None);
        b.begin_rule(nt("E"));
        b.alternative(vec![nt("E"), t("EQ"), nt("E")], None, None, None);
        b.alternative(vec![t("NUM")], None, None, None);
        b.end_rule(None);
        let grammar = b.finalize();

        let generated = generate(grammar, GeneratorOptions::default()).unwrap();
        let eq_index = generated.grammar.symbol_table().lookup("EQ").unwrap().terminal_index().unwrap();
        let found_error = generated
            .conflicts
            .conflicts()
            .iter()
            .filter(|c| c.terminal == eq_index)
            .any(|c| matches!(generated.table.action(c.state, eq_index), Action::Error));
        assert!(found_error);
    }

    // Scenario 5: classic reduce/reduce ambiguity, lowest rule index wins.
    #[test]
    fn reduce_reduce_conflict_picks_first_declared_rule() {
        let mut b = Builder::new(GeneratorOptions::default());
        b.begin_rule(nt("S"));
        b.alternative(vec![nt("A")], None, None, None);
        b.alternative(vec![nt("B")], None, None, None);
        b.end_rule(None);
        b.begin_rule(nt("A"));
        b.alternative(vec![t("x")], None, None, None);
        b.end_rule(None);
        b.begin_rule(nt("B"));
        b.alternative(vec![t("x")], None, None, None);
        b.end_rule(None);
        let grammar = b.finalize();

        let a_rule_index = grammar.rules().iter().find(|r| r.lhs().name() == "A").unwrap().index();
        let b_rule_index = grammar.rules().iter().find(|r| r.lhs().name() == "B").unwrap().index();
        assert!(a_rule_index < b_rule_index);

        let generated = generate(grammar, GeneratorOptions::default()).unwrap();
        let rr = generated
            .conflicts
            .conflicts()
            .iter()
            .find(|c| c.kind == ConflictKind::ReduceReduce)
            .expect("x must be a reduce/reduce conflict");
        let winner = *rr.competing_rules.iter().min().unwrap();
        assert_eq!(winner, a_rule_index);
    }

    // Scenario 6: epsilon/nullable chain.
    #[test]
    fn epsilon_chain_nullable_and_follow_sets() {
        let mut b = Builder::new(GeneratorOptions::default());
        b.begin_rule(nt("S"));
        b.alternative(vec![nt("A"), nt("B"), t("c")], None, None, None);
        b.end_rule(None);
        b.begin_rule(nt("A"));
        b.alternative(vec![t("a")], None, None, None);
        b.alternative(vec![], None, None, None);
        b.end_rule(None);
        b.begin_rule(nt("B"));
        b.alternative(vec![t("b")], None, None, None);
        b.alternative(vec![], None, None, None);
        b.end_rule(None);
        let grammar = b.finalize();

        let generated = generate(grammar, GeneratorOptions::default()).unwrap();
        let a = ident(&generated.grammar, "A");
        let b_id = ident(&generated.grammar, "B");
        let s = ident(&generated.grammar, "S");
        assert!(generated.nullable.contains(a));
        assert!(generated.nullable.contains(b_id));
        assert!(!generated.nullable.contains(s));

        let a_char = ident(&generated.grammar, "a");
        let b_char = ident(&generated.grammar, "b");
        let c_char = ident(&generated.grammar, "c");
        let dollar = generated.grammar.symbol_table().end_marker().ident();

        let first_s = &generated.first[&s];
        assert_eq!(first_s.len(), 3);
        assert!(first_s.contains(a_char) && first_s.contains(b_char) && first_s.contains(c_char));

        let follow_a = &generated.follow[&a];
        assert_eq!(follow_a.len(), 2);
        assert!(follow_a.contains(b_char) && follow_a.contains(c_char));

        let follow_b = &generated.follow[&b_id];
        assert_eq!(follow_b.len(), 1);
        assert!(follow_b.contains(c_char));

        let follow_s = &generated.follow[&s];
        assert_eq!(follow_s.len(), 1);
        assert!(follow_s.contains(dollar));
    }
}

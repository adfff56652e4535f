use std::collections::BTreeSet;

use crate::diagnostics::DiagnosticSink;
use crate::grammar::Grammar;

/// Runs the seven checks of §4.2 over a fully-built, pre-augmentation
/// grammar. Returns a fresh sink so the caller (the builder) decides how to
/// fold it into the grammar's own diagnostics. Grounded on the sequence of
/// `self.error(...)`/`self.warning(...)` calls the teacher's bootstrap
/// parser makes while building `ParserSpecification`, generalized from
/// ad-hoc inline checks into one ordered pass.
pub fn validate(grammar: &Grammar) -> DiagnosticSink {
    let mut sink = DiagnosticSink::new();

    // 1. At least one rule.
    if grammar.rules().is_empty() {
        sink.error(None, "grammar has no rules");
        return sink;
    }

    // 2. Start symbol exists and is a nonterminal; every rule's LHS is a
    // nonterminal.
    match grammar.start_symbol() {
        None => sink.error(None, "no start symbol could be determined"),
        Some(start) if !start.is_nonterminal() => sink.error(
            start.defined_at(),
            format!("start symbol \"{}\" is not a nonterminal", start.name()),
        ),
        Some(_) => (),
    }
    for rule in grammar.rules() {
        if !rule.lhs().is_nonterminal() {
            sink.error(
                rule.lhs().defined_at(),
                format!(
                    "rule {} has terminal \"{}\" as its left-hand side",
                    rule.index(),
                    rule.lhs().name()
                ),
            );
        }
    }

    // 3. Precedence override on an alternative names a terminal.
    for rule in grammar.rules() {
        if let Some(over) = rule.precedence_override() {
            if !over.is_terminal() {
                sink.error(
                    over.defined_at(),
                    format!(
                        "precedence override \"{}\" on rule {} is not a terminal",
                        over.name(),
                        rule.index()
                    ),
                );
            } else if !over.precedence_assigned() {
                sink.warning(
                    over.defined_at(),
                    format!(
                        "precedence override \"{}\" on rule {} has no assigned precedence",
                        over.name(),
                        rule.index()
                    ),
                );
            }
        }
    }

    // 4. Every nonterminal used in some RHS has at least one defining rule.
    let defined: BTreeSet<u32> = grammar.rules().iter().map(|r| r.lhs().ident()).collect();
    let mut reported_undefined = BTreeSet::new();
    for rule in grammar.rules() {
        for sym in rule.rhs_symbols() {
            if sym.is_nonterminal() && !defined.contains(&sym.ident()) && reported_undefined.insert(sym.ident()) {
                sink.error(
                    sym.defined_at(),
                    format!("nonterminal \"{}\" used but has no rule", sym.name()),
                );
            }
        }
    }

    // 5. Reachability from start over nonterminal edges.
    if let Some(start) = grammar.start_symbol() {
        let mut reachable: BTreeSet<u32> = BTreeSet::new();
        let mut worklist = vec![start.ident()];
        reachable.insert(start.ident());
        while let Some(ident) = worklist.pop() {
            for rule in grammar.rules().iter().filter(|r| r.lhs().ident() == ident) {
                for sym in rule.rhs_symbols() {
                    if sym.is_nonterminal() && reachable.insert(sym.ident()) {
                        worklist.push(sym.ident());
                    }
                }
            }
        }
        let mut reported = BTreeSet::new();
        for rule in grammar.rules() {
            let lhs = rule.lhs();
            if !reachable.contains(&lhs.ident()) && reported.insert(lhs.ident()) {
                sink.warning(
                    lhs.defined_at(),
                    format!("nonterminal \"{}\" is unreachable from the start symbol", lhs.name()),
                );
            }
        }
    }

    // 6. Productivity (fixed point).
    let mut productive: BTreeSet<u32> = BTreeSet::new();
    loop {
        let mut added = false;
        for rule in grammar.rules() {
            if productive.contains(&rule.lhs().ident()) {
                continue;
            }
            let all_productive = rule
                .rhs_symbols()
                .all(|sym| sym.is_terminal() || productive.contains(&sym.ident()));
            if all_productive {
                productive.insert(rule.lhs().ident());
                added = true;
            }
        }
        if !added {
            break;
        }
    }
    let mut reported_unproductive = BTreeSet::new();
    for rule in grammar.rules() {
        let lhs = rule.lhs();
        if lhs.is_nonterminal()
            && !productive.contains(&lhs.ident())
            && reported_unproductive.insert(lhs.ident())
        {
            sink.warning(
                lhs.defined_at(),
                format!("nonterminal \"{}\" is not productive", lhs.name()),
            );
        }
    }

    // 7. Symbols declared but never referenced.
    for symbol in grammar.symbol_table().symbols() {
        if symbol.is_end_marker() || symbol.is_invalid() || symbol.is_accept() {
            continue;
        }
        if !symbol.is_used() {
            sink.warning(
                symbol.defined_at(),
                format!("symbol \"{}\" is declared but never used", symbol.name()),
            );
        }
    }

    sink
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{Builder, RhsRef};
    use crate::options::GeneratorOptions;
    use crate::symbol::SymbolKind;

    #[test]
    fn empty_grammar_is_fatal() {
        let builder = Builder::new(GeneratorOptions::default());
        let grammar = builder.into_grammar_unchecked();
        let sink = validate(&grammar);
        assert!(sink.has_errors());
    }

    #[test]
    fn undefined_nonterminal_is_an_error() {
        let mut builder = Builder::new(GeneratorOptions::default());
        builder.begin_rule(RhsRef::new("S").with_kind(SymbolKind::Nonterminal));
        builder.alternative(
            vec![RhsRef::new("B").with_kind(SymbolKind::Nonterminal)],
            None,
            None,
            None,
        );
        builder.end_rule(None);
        let grammar = builder.into_grammar_unchecked();
        let sink = validate(&grammar);
        assert!(sink.has_errors());
    }

    #[test]
    fn unreachable_nonterminal_warns() {
        let mut builder = Builder::new(GeneratorOptions::default());
        builder.begin_rule(RhsRef::new("S").with_kind(SymbolKind::Nonterminal));
        builder.alternative(vec![RhsRef::new("a").with_kind(SymbolKind::Terminal)], None, None, None);
        builder.end_rule(None);
        builder.begin_rule(RhsRef::new("Unused").with_kind(SymbolKind::Nonterminal));
        builder.alternative(vec![RhsRef::new("b").with_kind(SymbolKind::Terminal)], None, None, None);
        builder.end_rule(None);
        let grammar = builder.into_grammar_unchecked();
        let sink = validate(&grammar);
        assert!(!sink.has_errors());
        assert!(sink.warning_count() > 0);
    }
}

use std::collections::BTreeMap;

use crate::grammar::Grammar;
use crate::sets::IdSet;

/// The set of nonterminal idents that can derive the empty string, computed
/// by fixed point: a nonterminal becomes nullable the first time some rule
/// of its has an all-nullable (or empty) RHS (§4.3).
pub fn nullable(grammar: &Grammar) -> IdSet {
    let mut nullable = IdSet::new();
    loop {
        let mut changed = false;
        for rule in grammar.rules() {
            let lhs = rule.lhs().ident();
            if nullable.contains(lhs) {
                continue;
            }
            if rule.rhs_symbols().all(|s| s.is_nonterminal() && nullable.contains(s.ident())) {
                changed |= nullable.insert(lhs);
            }
        }
        if !changed {
            break;
        }
    }
    nullable
}

/// FIRST(alpha) for a sequence of symbols, given already-computed FIRST sets
/// per symbol: union `FIRST` of each symbol left to right, stopping at (and
/// including) the first non-nullable one; if every symbol is nullable the
/// whole sequence is nullable too (signalled by the second return value).
pub fn first_of_sequence<'a, I>(first: &BTreeMap<u32, IdSet>, nullable: &IdSet, symbols: I) -> (IdSet, bool)
where
    I: IntoIterator<Item = &'a std::rc::Rc<crate::symbol::Symbol>>,
{
    let mut result = IdSet::new();
    for symbol in symbols {
        if symbol.is_terminal() {
            result.insert(symbol.ident());
            return (result, false);
        }
        if let Some(set) = first.get(&symbol.ident()) {
            result.union_with(set);
        }
        if !nullable.contains(symbol.ident()) {
            return (result, false);
        }
    }
    (result, true)
}

/// FIRST(X) for every symbol X, computed by fixed point (§4.3). A terminal's
/// FIRST set is the singleton `{X}`; a nonterminal's is the union, over its
/// rules, of `FIRST` of each RHS prefix up to its first non-nullable symbol.
pub fn first_sets(grammar: &Grammar, nullable: &IdSet) -> BTreeMap<u32, IdSet> {
    let mut first: BTreeMap<u32, IdSet> = BTreeMap::new();
    for symbol in grammar.symbol_table().terminals() {
        first.insert(symbol.ident(), IdSet::singleton(symbol.ident()));
    }
    for symbol in grammar.symbol_table().nonterminals() {
        first.entry(symbol.ident()).or_insert_with(IdSet::new);
    }

    loop {
        let mut changed = false;
        for rule in grammar.rules() {
            let (seq_first, _) = first_of_sequence(&first, nullable, rule.rhs_symbols());
            let entry = first.entry(rule.lhs().ident()).or_insert_with(IdSet::new);
            changed |= entry.union_with(&seq_first);
        }
        if !changed {
            break;
        }
    }
    first
}

/// FOLLOW(A) for every nonterminal A, computed by fixed point (§4.3). Seeded
/// with `$` in `FOLLOW(start)`; for every rule `B -> alpha A beta`, FOLLOW(A)
/// gains FIRST(beta), and if beta is nullable (or empty) it also gains all
/// of FOLLOW(B).
pub fn follow_sets(grammar: &Grammar, nullable: &IdSet, first: &BTreeMap<u32, IdSet>) -> BTreeMap<u32, IdSet> {
    let mut follow: BTreeMap<u32, IdSet> = BTreeMap::new();
    for symbol in grammar.symbol_table().nonterminals() {
        follow.insert(symbol.ident(), IdSet::new());
    }
    if let Some(start) = grammar.start_symbol() {
        let end_marker = grammar.symbol_table().end_marker();
        follow
            .entry(start.ident())
            .or_insert_with(IdSet::new)
            .insert(end_marker.ident());
    }

    loop {
        let mut changed = false;
        for rule in grammar.rules() {
            let rhs = rule.rhs();
            for (i, sym_ref) in rhs.iter().enumerate() {
                if !sym_ref.symbol.is_nonterminal() {
                    continue;
                }
                let (beta_first, beta_nullable) = first_of_sequence(first, nullable, rhs[i + 1..].iter().map(|r| &r.symbol));
                let entry = follow.entry(sym_ref.symbol.ident()).or_insert_with(IdSet::new);
                changed |= entry.union_with(&beta_first);
                if beta_nullable {
                    let lhs_follow = follow.get(&rule.lhs().ident()).cloned().unwrap_or_default();
                    let entry = follow.entry(sym_ref.symbol.ident()).or_insert_with(IdSet::new);
                    changed |= entry.union_with(&lhs_follow);
                }
            }
        }
        if !changed {
            break;
        }
    }
    follow
}

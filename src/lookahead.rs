use std::collections::BTreeMap;

use crate::automaton::Automaton;
use crate::grammar::Grammar;
use crate::item::Item;
use crate::options::{GeneratorOptions, LalrMode};
use crate::sets::IdSet;

use crate::analysis::first_of_sequence;

/// A sentinel terminal id outside the grammar's dense `[0, N)` id space,
/// used to tag the "propagate, don't know yet" lookahead during LR(1)
/// closure per the DeRemer-Pennello algorithm (§4.5 step 1).
const SENTINEL: u32 = u32::MAX;

/// Per-state reduce-item lookahead sets, the output of `compute_lookaheads`.
/// Keyed by `(state_id, item)` so the table builder can look up any reduce
/// item's lookahead set regardless of which mode produced it.
#[derive(Debug, Default)]
pub struct LookaheadTable {
    reduce: BTreeMap<(u32, Item), IdSet>,
}

impl LookaheadTable {
    /// The lookahead set for `item` as a reduce item in `state`. Empty if
    /// `item` was never recorded (e.g. it is not a reduce item).
    pub fn lookahead(&self, state: u32, item: Item) -> IdSet {
        self.reduce.get(&(state, item)).cloned().unwrap_or_default()
    }

    fn union_into(&mut self, state: u32, item: Item, terminals: &IdSet) -> bool {
        self.reduce.entry((state, item)).or_insert_with(IdSet::new).union_with(terminals)
    }
}

/// LR(1) closure of a single seed item with lookahead `{SENTINEL}`: standard
/// item closure (§4.4), but every derived item carries a lookahead set
/// computed as `FIRST(beta . a)` for each `a` already attached to its
/// parent, per §4.5 step 1.
fn lr1_closure(
    grammar: &Grammar,
    nullable: &IdSet,
    first: &BTreeMap<u32, IdSet>,
    seed: Item,
) -> BTreeMap<Item, IdSet> {
    let mut table: BTreeMap<Item, IdSet> = BTreeMap::new();
    table.insert(seed, IdSet::singleton(SENTINEL));
    let mut worklist = vec![seed];

    while let Some(item) = worklist.pop() {
        let la = table.get(&item).cloned().unwrap_or_default();
        let rule = grammar.rule(item.rule_index);
        if let Some(symbol) = item.next_symbol(grammar) {
            if symbol.is_nonterminal() {
                let beta = &rule.rhs()[item.dot + 1..];
                let (beta_first, beta_nullable) =
                    first_of_sequence(first, nullable, beta.iter().map(|r| &r.symbol));
                for production in grammar.rules().iter().filter(|r| r.lhs().ident() == symbol.ident()) {
                    let mut new_la = beta_first.clone();
                    if beta_nullable {
                        new_la.union_with(&la);
                    }
                    let new_item = Item::initial(production.index());
                    let entry = table.entry(new_item).or_insert_with(IdSet::new);
                    if entry.union_with(&new_la) {
                        worklist.push(new_item);
                    }
                }
            }
        }
    }
    table
}

/// Implements §4.5's two modes behind one entry point.
pub fn compute_lookaheads(
    automaton: &Automaton,
    grammar: &Grammar,
    nullable: &IdSet,
    first: &BTreeMap<u32, IdSet>,
    follow: &BTreeMap<u32, IdSet>,
    options: GeneratorOptions,
) -> LookaheadTable {
    match options.lalr_mode {
        LalrMode::Slr => compute_slr(automaton, grammar, follow),
        LalrMode::Lalr => compute_lalr(automaton, grammar, nullable, first),
    }
}

fn compute_slr(automaton: &Automaton, grammar: &Grammar, follow: &BTreeMap<u32, IdSet>) -> LookaheadTable {
    let mut table = LookaheadTable::default();
    for state in automaton.states() {
        for item in state.items().iter().filter(|item| item.is_reduce(grammar)) {
            let lhs = grammar.rule(item.rule_index).lhs();
            let la = follow.get(&lhs.ident()).cloned().unwrap_or_default();
            table.union_into(state.id(), *item, &la);
        }
    }
    table
}

fn compute_lalr(automaton: &Automaton, grammar: &Grammar, nullable: &IdSet, first: &BTreeMap<u32, IdSet>) -> LookaheadTable {
    // One map covers every destination a lookahead can land on: a kernel
    // item shifted into another state, or a (possibly non-kernel) reduce
    // item closed over in its own state. Same-state reduce items derived
    // from a kernel item's closure (typically an epsilon alternative) get
    // an edge back into this same map instead of having their lookahead
    // frozen at first-pass closure time, so they still pick up whatever
    // the kernel item's lookahead propagates to later in the fixed point.
    let mut lookaheads: BTreeMap<(u32, Item), IdSet> = BTreeMap::new();
    let mut edges: Vec<((u32, Item), (u32, Item))> = Vec::new();

    let accept_index = grammar
        .accept_rule_index()
        .expect("compute_lookaheads requires a finalized grammar");
    let end_marker = grammar.symbol_table().end_marker();
    lookaheads.insert((0, Item::initial(accept_index)), IdSet::singleton(end_marker.ident()));

    for state in automaton.states() {
        for kernel_item in state.kernel_items(grammar) {
            let closure = lr1_closure(grammar, nullable, first, *kernel_item);
            for (item, la) in &closure {
                let mut spontaneous = la.clone();
                let propagates = spontaneous.remove(SENTINEL);

                let dest = if item.is_reduce(grammar) {
                    (state.id(), *item)
                } else {
                    let symbol = item.next_symbol(grammar).expect("non-reduce item has a next symbol");
                    match automaton.goto_state(state.id(), symbol.ident()) {
                        Some(target) => (target, item.shifted()),
                        None => continue,
                    }
                };

                if !spontaneous.is_empty() {
                    lookaheads.entry(dest).or_insert_with(IdSet::new).union_with(&spontaneous);
                }
                if propagates {
                    edges.push(((state.id(), *kernel_item), dest));
                }
            }
        }
    }

    loop {
        let mut changed = false;
        for (src, dst) in &edges {
            let src_la = lookaheads.get(src).cloned().unwrap_or_default();
            changed |= lookaheads.entry(*dst).or_insert_with(IdSet::new).union_with(&src_la);
        }
        if !changed {
            break;
        }
    }

    let mut table = LookaheadTable::default();
    for state in automaton.states() {
        for item in state.reduce_items(grammar) {
            let la = lookaheads.get(&(state.id(), *item)).cloned().unwrap_or_default();
            table.union_into(state.id(), *item, &la);
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{first_sets, follow_sets, nullable};
    use crate::automaton::build_canonical;
    use crate::builder::{Builder, RhsRef};
    use crate::symbol::SymbolKind;

    fn nt(name: &str) -> RhsRef {
        RhsRef::new(name).with_kind(SymbolKind::Nonterminal)
    }

    fn t(name: &str) -> RhsRef {
        RhsRef::new(name).with_kind(SymbolKind::Terminal)
    }

    fn arithmetic_grammar() -> Grammar {
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

        b.finalize()
    }

    #[test]
    fn reduce_lookaheads_never_carry_the_sentinel() {
        let grammar = arithmetic_grammar();
        let automaton = build_canonical(&grammar);
        let null = nullable(&grammar);
        let first = first_sets(&grammar, &null);
        let follow = follow_sets(&grammar, &null, &first);
        let table = compute_lookaheads(&automaton, &grammar, &null, &first, &follow, GeneratorOptions::default());

        for state in automaton.states() {
            for item in state.reduce_items(&grammar) {
                let la = table.lookahead(state.id(), *item);
                assert!(!la.contains(u32::MAX));
            }
        }
    }

    #[test]
    fn accept_rule_reduces_only_on_dollar() {
        let grammar = arithmetic_grammar();
        let automaton = build_canonical(&grammar);
        let null = nullable(&grammar);
        let first = first_sets(&grammar, &null);
        let follow = follow_sets(&grammar, &null, &first);
        let table = compute_lookaheads(&automaton, &grammar, &null, &first, &follow, GeneratorOptions::default());

        let accept_index = grammar.accept_rule_index().unwrap();
        let accept_item = Item::new(accept_index, 1);
        let dollar = grammar.symbol_table().end_marker().ident();
        let state = automaton
            .states()
            .iter()
            .find(|s| s.items().contains(&accept_item))
            .expect("accept item must appear in some state");
        let la = table.lookahead(state.id(), accept_item);
        assert_eq!(la.len(), 1);
        assert!(la.contains(dollar));
    }

    #[test]
    fn epsilon_reduce_item_inherits_lookahead_through_accept_closure() {
        // $accept -> S, S -> A, A -> a | epsilon. Closing the initial item
        // $accept -> . S exposes A -> . (dot 0, non-kernel) with only the
        // inherited sentinel lookahead; it must still end up with FOLLOW(A)
        // (here {$}) once the sentinel resolves to the accept item's own
        // lookahead, not an empty set.
        let mut b = Builder::new(GeneratorOptions::default());
        b.begin_rule(nt("S"));
        b.alternative(vec![nt("A")], None, None, None);
        b.end_rule(None);
        b.begin_rule(nt("A"));
        b.alternative(vec![t("a")], None, None, None);
        b.alternative(vec![], None, None, None);
        b.end_rule(None);
        let grammar = b.finalize();

        let automaton = build_canonical(&grammar);
        let null = nullable(&grammar);
        let first = first_sets(&grammar, &null);
        let follow = follow_sets(&grammar, &null, &first);
        let table = compute_lookaheads(&automaton, &grammar, &null, &first, &follow, GeneratorOptions::default());

        let epsilon_rule = grammar
            .rules()
            .iter()
            .find(|r| r.lhs().name() == "A" && r.rhs().is_empty())
            .expect("A has an epsilon alternative");
        let epsilon_item = Item::initial(epsilon_rule.index());
        let dollar = grammar.symbol_table().end_marker().ident();

        let state = automaton
            .states()
            .iter()
            .find(|s| s.items().contains(&epsilon_item))
            .expect("epsilon item must appear in some state");
        let la = table.lookahead(state.id(), epsilon_item);
        assert!(!la.is_empty(), "epsilon reduce item must not be left with an empty lookahead");
        assert!(la.contains(dollar));
    }

    #[test]
    fn lalr_and_slr_agree_on_unambiguous_grammar() {
        let grammar = arithmetic_grammar();
        let automaton = build_canonical(&grammar);
        let null = nullable(&grammar);
        let first = first_sets(&grammar, &null);
        let follow = follow_sets(&grammar, &null, &first);

        let mut lalr_opts = GeneratorOptions::default();
        lalr_opts.lalr_mode = LalrMode::Lalr;
        let lalr_table = compute_lookaheads(&automaton, &grammar, &null, &first, &follow, lalr_opts);

        let mut slr_opts = GeneratorOptions::default();
        slr_opts.lalr_mode = LalrMode::Slr;
        let slr_table = compute_lookaheads(&automaton, &grammar, &null, &first, &follow, slr_opts);

        for state in automaton.states() {
            for item in state.reduce_items(&grammar) {
                let lalr_la = lalr_table.lookahead(state.id(), *item);
                let slr_la = slr_table.lookahead(state.id(), *item);
                // LALR lookaheads are always a subset of the coarser SLR
                // (FOLLOW-based) ones for this conflict-free grammar.
                for t in lalr_la.iter() {
                    assert!(slr_la.contains(t));
                }
            }
        }
    }
}

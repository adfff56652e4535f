use std::collections::{BTreeMap, VecDeque};
use std::rc::Rc;

use crate::grammar::Grammar;
use crate::item::{closure, goto, Item, ItemSet};
use crate::symbol::Symbol;

/// `(id, items)` — `items` is always a closed `ItemSet`. State 0 is the
/// closure of `{(accept_rule, 0)}` (§3).
#[derive(Debug, Clone)]
pub struct State {
    id: u32,
    items: ItemSet,
}

impl State {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn items(&self) -> &ItemSet {
        &self.items
    }

    pub fn kernel_items<'g>(&'g self, grammar: &'g Grammar) -> impl Iterator<Item = &'g Item> + 'g {
        self.items.iter().filter(move |item| item.is_kernel(grammar))
    }

    pub fn reduce_items<'g>(&'g self, grammar: &'g Grammar) -> impl Iterator<Item = &'g Item> + 'g {
        self.items.iter().filter(move |item| item.is_reduce(grammar))
    }
}

/// `(from_state, symbol, to_state)`. At most one outgoing transition per
/// `(state, symbol)` pair (§3).
#[derive(Debug, Clone)]
pub struct Transition {
    pub from: u32,
    pub symbol: Rc<Symbol>,
    pub to: u32,
}

/// The canonical collection of LR(0) states plus the transitions between
/// them, built once per `Grammar` and then treated as immutable (§3, §4.4).
#[derive(Debug)]
pub struct Automaton {
    states: Vec<State>,
    transitions: Vec<Transition>,
}

impl Automaton {
    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, id: u32) -> &State {
        &self.states[id as usize]
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn transitions_from(&self, state_id: u32) -> impl Iterator<Item = &Transition> {
        self.transitions.iter().filter(move |t| t.from == state_id)
    }

    /// The target state of `(state_id, symbol)`, if any.
    pub fn goto_state(&self, state_id: u32, symbol_ident: u32) -> Option<u32> {
        self.transitions
            .iter()
            .find(|t| t.from == state_id && t.symbol.ident() == symbol_ident)
            .map(|t| t.to)
    }
}

/// Builds the canonical LR(0) collection by BFS from state 0 (§4.4).
/// Iteration order — over symbols appearing after a dot, by symbol id — is
/// fixed so that both state numbering and transition order are
/// reproducible across runs on byte-identical input (§5).
pub fn build_canonical(grammar: &Grammar) -> Automaton {
    let accept_index = grammar
        .accept_rule_index()
        .expect("build_canonical requires a finalized, augmented grammar");

    let mut initial = ItemSet::new();
    initial.insert(Item::initial(accept_index));
    let initial = closure(grammar, initial);

    let mut states: Vec<State> = vec![State {
        id: 0,
        items: initial.clone(),
    }];
    let mut index_of: BTreeMap<ItemSet, u32> = BTreeMap::new();
    index_of.insert(initial, 0);

    let mut transitions = Vec::new();
    let mut worklist: VecDeque<u32> = VecDeque::new();
    worklist.push_back(0);

    while let Some(state_id) = worklist.pop_front() {
        // Deterministic order: symbols appearing after a dot, by symbol id.
        let mut symbols: BTreeMap<u32, Rc<Symbol>> = BTreeMap::new();
        for item in states[state_id as usize].items.iter() {
            if let Some(symbol) = item.next_symbol(grammar) {
                symbols.entry(symbol.ident()).or_insert_with(|| Rc::clone(symbol));
            }
        }
        for (_, symbol) in symbols {
            let target_items = goto(grammar, &states[state_id as usize].items, &symbol);
            if target_items.is_empty() {
                continue;
            }
            let to = if let Some(&existing) = index_of.get(&target_items) {
                existing
            } else {
                let new_id = states.len() as u32;
                index_of.insert(target_items.clone(), new_id);
                states.push(State {
                    id: new_id,
                    items: target_items,
                });
                worklist.push_back(new_id);
                new_id
            };
            transitions.push(Transition {
                from: state_id,
                symbol,
                to,
            });
        }
    }

    Automaton { states, transitions }
}

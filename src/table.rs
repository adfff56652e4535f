use std::fmt;

use crate::automaton::Automaton;
use crate::grammar::Grammar;
use crate::span::Span;
use crate::symbol::Associativity;

/// One cell of the ACTION matrix (§3). `Error` is the zero value dense
/// matrices are initialised to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Error,
    Shift(u32),
    Reduce(u32),
    Accept,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Action::Error => write!(f, "error"),
            Action::Shift(s) => write!(f, "shift {}", s),
            Action::Reduce(r) => write!(f, "reduce {}", r),
            Action::Accept => write!(f, "accept"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

/// One recorded conflict, resolved or not, per §4.6.
#[derive(Debug, Clone)]
pub struct Conflict {
    pub kind: ConflictKind,
    pub state: u32,
    pub terminal: u32,
    pub competing_rules: Vec<u32>,
    pub resolution: String,
    pub resolved: bool,
    pub span: Option<Span>,
}

/// All conflicts found while building the tables, in discovery order
/// (ascending state, then ascending terminal id).
#[derive(Debug, Default)]
pub struct ConflictReport {
    conflicts: Vec<Conflict>,
}

impl ConflictReport {
    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn unresolved_count(&self) -> usize {
        self.conflicts.iter().filter(|c| !c.resolved).count()
    }

    fn push(&mut self, conflict: Conflict) {
        self.conflicts.push(conflict);
    }
}

/// Dense ACTION/GOTO matrices plus the lookups needed to render or drive
/// them: `action[state][terminal_index]`, `goto[state][nonterminal_index]`
/// (`None` meaning no transition), per §3's ParseTable.
#[derive(Debug)]
pub struct ParseTable {
    state_count: usize,
    terminal_count: usize,
    nonterminal_count: usize,
    action: Vec<Action>,
    goto: Vec<Option<u32>>,
}

impl ParseTable {
    fn new(state_count: usize, terminal_count: usize, nonterminal_count: usize) -> Self {
        Self {
            state_count,
            terminal_count,
            nonterminal_count,
            action: vec![Action::Error; state_count * terminal_count],
            goto: vec![None; state_count * nonterminal_count],
        }
    }

    fn action_index(&self, state: u32, terminal_index: u32) -> usize {
        state as usize * self.terminal_count + terminal_index as usize
    }

    fn goto_index(&self, state: u32, nonterminal_index: u32) -> usize {
        state as usize * self.nonterminal_count + nonterminal_index as usize
    }

    pub fn action(&self, state: u32, terminal_index: u32) -> Action {
        self.action[self.action_index(state, terminal_index)]
    }

    fn set_action(&mut self, state: u32, terminal_index: u32, action: Action) {
        let index = self.action_index(state, terminal_index);
        self.action[index] = action;
    }

    pub fn goto(&self, state: u32, nonterminal_index: u32) -> Option<u32> {
        self.goto[self.goto_index(state, nonterminal_index)]
    }

    fn set_goto(&mut self, state: u32, nonterminal_index: u32, target: u32) {
        let index = self.goto_index(state, nonterminal_index);
        self.goto[index] = Some(target);
    }

    pub fn state_count(&self) -> usize {
        self.state_count
    }

    pub fn terminal_count(&self) -> usize {
        self.terminal_count
    }

    pub fn nonterminal_count(&self) -> usize {
        self.nonterminal_count
    }
}

/// Builds `ParseTable` and its `ConflictReport` from a finished automaton
/// and lookahead table, per §4.6.
pub fn build_tables(
    automaton: &Automaton,
    grammar: &Grammar,
    lookaheads: &crate::lookahead::LookaheadTable,
) -> (ParseTable, ConflictReport) {
    let state_count = automaton.states().len();
    let terminal_count = grammar.terminal_count();
    let nonterminal_count = grammar.nonterminal_count();
    let mut table = ParseTable::new(state_count, terminal_count, nonterminal_count);
    let mut report = ConflictReport::default();
    let accept_index = grammar.accept_rule_index();
    let dollar_index = grammar.symbol_table().end_marker().terminal_index().unwrap();

    for transition in automaton.transitions() {
        if transition.symbol.is_terminal() {
            let terminal_index = transition.symbol.terminal_index().unwrap();
            table.set_action(transition.from, terminal_index, Action::Shift(transition.to));
        } else {
            let nonterminal_index = transition.symbol.nonterminal_index().unwrap();
            table.set_goto(transition.from, nonterminal_index, transition.to);
        }
    }

    for state in automaton.states() {
        for item in state.reduce_items(grammar) {
            let rule = grammar.rule(item.rule_index);
            if Some(item.rule_index) == accept_index {
                table.set_action(state.id(), dollar_index, Action::Accept);
                continue;
            }
            let lookahead = lookaheads.lookahead(state.id(), *item);
            for terminal_id in lookahead.iter() {
                let terminal = grammar
                    .symbol_table()
                    .symbols()
                    .find(|s| s.ident() == terminal_id)
                    .expect("lookahead ids always name a real terminal");
                let terminal_index = terminal.terminal_index().unwrap();
                let existing = table.action(state.id(), terminal_index);
                match existing {
                    Action::Error => {
                        table.set_action(state.id(), terminal_index, Action::Reduce(item.rule_index));
                    }
                    Action::Shift(_) => {
                        resolve_shift_reduce(&mut table, &mut report, state.id(), terminal_index, terminal.precedence(), terminal.associativity(), rule);
                    }
                    Action::Reduce(other_rule) => {
                        resolve_reduce_reduce(&mut table, &mut report, state.id(), terminal_index, other_rule, item.rule_index);
                    }
                    Action::Accept => {
                        // `$` can only be produced by the accept rule itself.
                    }
                }
            }
        }
    }

    (table, report)
}

enum Resolution {
    Shift,
    Reduce,
    Error,
    Unresolved,
}

/// Resolves one shift/reduce conflict per §4.6: compares the reducing
/// rule's precedence against the lookahead terminal's, falling back to
/// associativity on a tie. Mutates the existing `Shift` cell to `Reduce`
/// or `Error` when resolution says so; leaves it alone (shift wins) when
/// either side is unresolved or the terminal is left shifting.
fn resolve_shift_reduce(
    table: &mut ParseTable,
    report: &mut ConflictReport,
    state: u32,
    terminal_index: u32,
    shift_precedence: u32,
    shift_assoc: Associativity,
    reduce_rule: &crate::rule::Rule,
) {
    let reduce_precedence = reduce_rule.precedence();
    let resolution = if shift_precedence == 0 || reduce_precedence == 0 {
        Resolution::Unresolved
    } else if reduce_precedence > shift_precedence {
        Resolution::Reduce
    } else if shift_precedence > reduce_precedence {
        Resolution::Shift
    } else {
        match shift_assoc {
            Associativity::Left => Resolution::Reduce,
            Associativity::Right => Resolution::Shift,
            Associativity::NonAssoc => Resolution::Error,
            Associativity::None => Resolution::Unresolved,
        }
    };

    let (description, resolved) = match resolution {
        Resolution::Reduce => {
            table.set_action(state, terminal_index, Action::Reduce(reduce_rule.index()));
            ("reduce: rule precedence wins", true)
        }
        Resolution::Error => {
            table.set_action(state, terminal_index, Action::Error);
            ("error: nonassociative terminal", true)
        }
        Resolution::Shift => ("shift: terminal precedence or right associativity wins", true),
        Resolution::Unresolved => ("unresolved: default to shift", false),
    };

    report.push(Conflict {
        kind: ConflictKind::ShiftReduce,
        state,
        terminal: terminal_index,
        competing_rules: vec![reduce_rule.index()],
        resolution: description.to_string(),
        resolved,
        span: None,
    });
}

fn resolve_reduce_reduce(
    table: &mut ParseTable,
    report: &mut ConflictReport,
    state: u32,
    terminal_index: u32,
    existing_rule: u32,
    new_rule: u32,
) {
    let winner = existing_rule.min(new_rule);
    table.set_action(state, terminal_index, Action::Reduce(winner));
    report.push(Conflict {
        kind: ConflictKind::ReduceReduce,
        state,
        terminal: terminal_index,
        competing_rules: vec![existing_rule, new_rule],
        resolution: format!("reduce rule {} (lowest index)", winner),
        resolved: true,
        span: None,
    });
}

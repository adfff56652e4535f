/// Which lookahead algorithm `compute_lookaheads` runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LalrMode {
    /// Lookahead of a reduce item is FOLLOW(lhs). Cheaper, occasionally
    /// over-approximates and reports conflicts a full LALR(1) table
    /// wouldn't have.
    Slr,
    /// DeRemer-Pennello propagation over kernel items. The default.
    Lalr,
}

impl Default for LalrMode {
    fn default() -> Self {
        LalrMode::Lalr
    }
}

/// Generator-wide toggles. `Copy` so it can be threaded through the
/// pipeline by value instead of borrowed everywhere.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorOptions {
    /// When an RHS reference's kind can't be inferred from a directive or
    /// a prior interning, treat non-letter-containing or all-uppercase
    /// names as terminals. Off means such refs default to nonterminal.
    pub allcaps_heuristic: bool,
    pub lalr_mode: LalrMode,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            allcaps_heuristic: true,
            lalr_mode: LalrMode::default(),
        }
    }
}

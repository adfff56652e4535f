use std::collections::BTreeSet;
use std::fmt;

/// A set of dense symbol identifiers, backed by a `BTreeSet` rather than a
/// true bit-vector — grounded on `alap_gen_ng::symbol::terminal::TokenSet`
/// (a `BTreeSet<Token>` newtype with `BitOrAssign`/`FromIterator`/manual
/// `Display`), which is the teacher lineage's standard shape for a
/// deterministically-ordered id set. Used for `nullable`, `FIRST`,
/// `FOLLOW`, and LALR lookahead sets alike; callers decide whether the IDs
/// are symbol idents, terminal indices, or nonterminal indices.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct IdSet(BTreeSet<u32>);

impl IdSet {
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    pub fn singleton(id: u32) -> Self {
        let mut set = BTreeSet::new();
        set.insert(id);
        Self(set)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, id: u32) -> bool {
        self.0.contains(&id)
    }

    /// Inserts `id`; returns `true` if the set grew (used by fixed-point
    /// loops to detect "no change this pass").
    pub fn insert(&mut self, id: u32) -> bool {
        self.0.insert(id)
    }

    pub fn remove(&mut self, id: u32) -> bool {
        self.0.remove(&id)
    }

    /// Unions `other` into `self`; returns `true` if `self` grew.
    pub fn union_with(&mut self, other: &IdSet) -> bool {
        let before = self.0.len();
        for id in other.0.iter() {
            self.0.insert(*id);
        }
        self.0.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }

    pub fn intersection(&self, other: &IdSet) -> IdSet {
        IdSet(self.0.intersection(&other.0).copied().collect())
    }
}

impl FromIterator<u32> for IdSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for IdSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", id)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_reports_growth() {
        let mut a = IdSet::singleton(1);
        let b = IdSet::from_iter([1, 2, 3]);
        assert!(a.union_with(&b));
        assert!(!a.union_with(&b));
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn display_is_sorted() {
        let set: IdSet = [3, 1, 2].into_iter().collect();
        assert_eq!(set.to_string(), "{1, 2, 3}");
    }
}

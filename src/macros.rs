/// Identity-based `PartialEq`/`Eq`/`Ord`/`PartialOrd` for types that carry a
/// dense `ident: u32` field and are always handled through `Rc<Self>`. `Rc<T>`
/// already forwards these traits to `T` by value, so this is enough to make
/// `Rc<Symbol>`/`Rc<Production>` usable as `BTreeMap`/`BTreeSet` keys keyed
/// by identity rather than structural content.
macro_rules! impl_ident_cmp {
    ( $ident:ident ) => {
        impl std::cmp::PartialEq for $ident {
            fn eq(&self, other: &Self) -> bool {
                self.ident == other.ident
            }
        }

        impl std::cmp::Eq for $ident {}

        impl std::cmp::Ord for $ident {
            fn cmp(&self, other: &Self) -> std::cmp::Ordering {
                self.ident.cmp(&other.ident)
            }
        }

        impl std::cmp::PartialOrd for $ident {
            fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl std::hash::Hash for $ident {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                self.ident.hash(state)
            }
        }
    };
}

//! Dense node ids.
//!
//! Each arena hands out monotonically increasing 4-byte ids. `NONE` is the
//! reserved sentinel; arenas never issue it. Converting an id wider than
//! `u32::MAX - 1` is a corrupt build and panics.

macro_rules! dense_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u32);

        impl $name {
            /// Reserved sentinel id.
            pub const NONE: $name = $name(u32::MAX);

            #[inline]
            pub fn from_usize(index: usize) -> Self {
                $name(u32::try_from(index).expect("node id overflow"))
            }

            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }

            #[inline]
            pub const fn is_none(self) -> bool {
                self.0 == u32::MAX
            }
        }
    };
}

dense_id! {
    /// Id of an item (top-level declaration).
    ItemId
}

dense_id! {
    /// Id of a statement.
    StmtId
}

dense_id! {
    /// Id of an expression.
    ExprId
}

dense_id! {
    /// Id of a type expression (a type as written in source).
    TypeExprId
}

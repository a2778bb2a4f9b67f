use std::fmt;

macro_rules! key_type {
    ($(#[$doc:meta])* $name:ident, $prefix:literal) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(u64);

        impl $name {
            /// Rebuilds a key from its raw persisted form.
            #[must_use]
            pub const fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// The raw form written into persisted records.
            #[must_use]
            pub const fn raw(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

key_type! {
    /// Key of one byte string in the `strings` table.
    StringKey, "s"
}

key_type! {
    /// Key of one representation record in the `reps` table.
    RepKey, "r"
}

key_type! {
    /// Identifier of the transaction a mutable representation belongs to.
    TxnId, "t"
}

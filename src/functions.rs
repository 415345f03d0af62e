use std::fmt;

use strum_macros::{Display, EnumString};

/// Built-in functions that translate to something other than a plain call.
/// Any other name is passed through as written.
#[derive(Display, EnumString, Debug, Clone, Copy, PartialEq, Eq)]
#[strum(ascii_case_insensitive)]
pub enum KnownFunction {
    COALESCE,
    IIF,
    ISNULL,
    NULLIF,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(n) => write!(f, "exactly {n} arguments"),
            Arity::AtLeast(n) => write!(f, "at least {n} arguments"),
        }
    }
}

impl KnownFunction {
    pub fn lookup(name: &str) -> Option<Self> {
        name.parse().ok()
    }

    pub fn arity(self) -> Arity {
        match self {
            KnownFunction::COALESCE => Arity::AtLeast(2),
            KnownFunction::IIF => Arity::Exactly(3),
            KnownFunction::ISNULL | KnownFunction::NULLIF => Arity::Exactly(2),
        }
    }

    pub fn accepts(self, count: usize) -> bool {
        match self.arity() {
            Arity::Exactly(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }
}

pub type GSym = string_interner::DefaultSymbol;

thread_local! {
    static INTERNER: std::cell::RefCell<string_interner::StringInterner<string_interner::DefaultBackend>> =
        std::cell::RefCell::new(string_interner::StringInterner::default());
}

/// An interned identifier: a hierarchical name, a port name, a symbol's
/// display name. Two `Id`s compare equal iff they were interned from the
/// same string; comparison is a symbol (integer) comparison, not a string
/// comparison.
#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize))]
pub struct Id {
    sym: GSym,
}

impl Id {
    pub fn new<S: AsRef<str>>(s: S) -> Self {
        let sym = INTERNER.with(|i| i.borrow_mut().get_or_intern(s.as_ref()));
        Id { sym }
    }

    pub fn as_str(&self) -> String {
        INTERNER.with(|i| i.borrow().resolve(self.sym).unwrap_or_default().to_string())
    }
}

impl Default for Id {
    fn default() -> Self {
        Id::new("")
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Debug for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Id({})", self.as_str())
    }
}

impl From<&str> for Id {
    fn from(s: &str) -> Self {
        Id::new(s)
    }
}

impl From<String> for Id {
    fn from(s: String) -> Self {
        Id::new(s)
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

/// Something addressable by a stable interned name, mirroring calyx's
/// `GetName` trait.
pub trait GetName {
    fn name(&self) -> Id;
}

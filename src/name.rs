//! Qualified names as used by the rename, drop and append tables.
use std::fmt;
use std::hash::{Hash, Hasher};

use string_cache::DefaultAtom as Atom;

/// The local part that matches any local name within a namespace.
pub const WILDCARD: &str = "*";

/// A `QName` represents a qualified name.
///
/// A qualified name is a tag or attribute name that has a namespace, a
/// local name and the prefix it was (or will be) written with.  An empty
/// namespace means no namespace.  Two names compare equal when namespace
/// and local name match; the prefix only matters for serialization.
///
/// The name with an empty namespace and an empty local part is the
/// sentinel used by the rename tables to mean "drop this".
///
/// ```
/// # use xmltransform::QName;
/// let a = QName::from("{http://www.w3.org/1999/xhtml}a");
/// assert_eq!(a.ns(), "http://www.w3.org/1999/xhtml");
/// assert_eq!(a.local_name(), "a");
/// assert!(QName::from("").is_empty());
/// ```
#[derive(Clone)]
pub struct QName {
    ns: Atom,
    local: Atom,
    prefix: Atom,
}

impl QName {
    /// Creates a qualified name from a namespace and a local name.
    pub fn new<N, L>(ns: N, local: L) -> QName
    where
        N: Into<Atom>,
        L: Into<Atom>,
    {
        QName::with_prefix(ns, local, Atom::from(""))
    }

    /// Creates a qualified name that also carries a prefix.
    pub fn with_prefix<N, L, P>(ns: N, local: L, prefix: P) -> QName
    where
        N: Into<Atom>,
        L: Into<Atom>,
        P: Into<Atom>,
    {
        QName {
            ns: ns.into(),
            local: local.into(),
            prefix: prefix.into(),
        }
    }

    /// Creates a name without namespace.
    pub fn from_name(local: &str) -> QName {
        QName::new(Atom::from(""), local)
    }

    /// Returns the sentinel empty name.
    pub fn empty() -> QName {
        QName::new(Atom::from(""), Atom::from(""))
    }

    /// Parses a name from its textual form.
    ///
    /// Two formats are supported ``{namespace}local`` or just ``local``.
    /// The empty string parses to the sentinel name.
    pub fn parse(s: &str) -> QName {
        if s.starts_with('{') {
            if let Some(index) = s.find('}') {
                return QName::new(&s[1..index], &s[index + 1..]);
            }
        }
        QName::from_name(s)
    }

    /// Returns the namespace URI.  Empty if the name is unqualified.
    #[inline]
    pub fn ns(&self) -> &str {
        &self.ns
    }

    /// Returns the local part of the name.
    #[inline]
    pub fn local_name(&self) -> &str {
        &self.local
    }

    /// Returns the prefix.  Empty means the default namespace or no
    /// namespace at all.
    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns the same name carrying a different prefix.
    pub fn to_prefixed<P: Into<Atom>>(&self, prefix: P) -> QName {
        QName {
            ns: self.ns.clone(),
            local: self.local.clone(),
            prefix: prefix.into(),
        }
    }

    /// Is this the sentinel empty name?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ns.is_empty() && self.local.is_empty()
    }

    /// Does the local part match any local name?
    #[inline]
    pub fn is_wildcard(&self) -> bool {
        &*self.local == WILDCARD
    }

    /// Is the name bound to a namespace?
    #[inline]
    pub fn is_qualified(&self) -> bool {
        !self.ns.is_empty()
    }
}

impl<'a> From<&'a str> for QName {
    #[inline]
    fn from(s: &'a str) -> QName {
        QName::parse(s)
    }
}

impl<'a> From<(&'a str, &'a str)> for QName {
    #[inline]
    fn from((ns, local): (&'a str, &'a str)) -> QName {
        QName::new(ns, local)
    }
}

impl PartialEq for QName {
    fn eq(&self, other: &QName) -> bool {
        self.local == other.local && self.ns == other.ns
    }
}

impl Eq for QName {}

impl Hash for QName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.local.hash(state);
        self.ns.hash(state);
    }
}

impl fmt::Debug for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "QName(\"{}\")", self)
        } else {
            write!(f, "QName(\"{}\", prefix=\"{}\")", self, self.prefix)
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.ns.is_empty() {
            write!(f, "{{{}}}", self.ns)?;
        }
        write!(f, "{}", self.local)
    }
}

//! Namespace lookups and the scoped overlay used by the transform layers.
use std::collections::HashMap;

use string_cache::DefaultAtom as Atom;

use crate::name::QName;

pub use xml::namespace::{NS_XMLNS_PREFIX, NS_XMLNS_URI, NS_XML_PREFIX, NS_XML_URI};

/// Prefix of the synthesized namespace prefixes (`ps1`, `ps2`, ...).
pub const SYNTHETIC_PREFIX: &str = "ps";

/// Resolves prefixes to namespace URIs and back.
///
/// Both directions answer for the current position in a document.  A
/// prefix of `""` stands for the default namespace.
pub trait NamespaceContext {
    /// Returns the URI bound to `prefix`.
    fn lookup_namespace(&self, prefix: &str) -> Option<Atom>;

    /// Returns a prefix bound to `uri`.
    fn lookup_prefix(&self, uri: &str) -> Option<Atom>;
}

impl<'a, T: NamespaceContext + ?Sized> NamespaceContext for &'a T {
    fn lookup_namespace(&self, prefix: &str) -> Option<Atom> {
        (**self).lookup_namespace(prefix)
    }

    fn lookup_prefix(&self, uri: &str) -> Option<Atom> {
        (**self).lookup_prefix(uri)
    }
}

impl<'a, T: NamespaceContext + ?Sized> NamespaceContext for &'a mut T {
    fn lookup_namespace(&self, prefix: &str) -> Option<Atom> {
        (**self).lookup_namespace(prefix)
    }

    fn lookup_prefix(&self, uri: &str) -> Option<Atom> {
        (**self).lookup_prefix(uri)
    }
}

impl<T: NamespaceContext + ?Sized> NamespaceContext for Box<T> {
    fn lookup_namespace(&self, prefix: &str) -> Option<Atom> {
        (**self).lookup_namespace(prefix)
    }

    fn lookup_prefix(&self, uri: &str) -> Option<Atom> {
        (**self).lookup_prefix(uri)
    }
}

fn fixed_namespace(prefix: &str) -> Option<&'static str> {
    match prefix {
        NS_XML_PREFIX => Some(NS_XML_URI),
        NS_XMLNS_PREFIX => Some(NS_XMLNS_URI),
        _ => None,
    }
}

fn fixed_prefix(uri: &str) -> Option<&'static str> {
    match uri {
        NS_XML_URI => Some(NS_XML_PREFIX),
        NS_XMLNS_URI => Some(NS_XMLNS_PREFIX),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct Scope {
    namespaces: HashMap<Atom, Atom>,
    prefixes: HashMap<Atom, Atom>,
}

/// A stack of prefix bindings layered over the document's own context.
///
/// One scope is pushed per element entered and popped per element left,
/// including elements that end up dropped.  Lookups walk the scopes from
/// the innermost outwards, then try the fixed `xml`/`xmlns` bindings and
/// finally the delegate context passed in by the caller.  The `resolve_*`
/// variants copy whatever they find in an outer scope or in the delegate
/// into the innermost scope so the next lookup is a single map lookup.
///
/// The overlay also carries the namespace remap table built from
/// `{ns}* -> {ns2}*` rename entries.  Prefix lookups go through it first;
/// a namespace remapped to `""` has no prefix at all.
#[derive(Debug, Default)]
pub struct NamespaceOverlay {
    scopes: Vec<Scope>,
    remap: HashMap<Atom, Atom>,
}

impl NamespaceOverlay {
    /// Creates an overlay with the given namespace remap table.
    pub fn new(remap: HashMap<Atom, Atom>) -> NamespaceOverlay {
        NamespaceOverlay {
            scopes: Vec::new(),
            remap,
        }
    }

    /// Enters a new element scope.
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Leaves the innermost element scope.
    pub fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    /// Returns the number of open scopes.
    #[inline]
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Binds `prefix` to `uri` in the innermost scope.
    ///
    /// Does nothing when no scope is open.
    pub fn bind(&mut self, prefix: &str, uri: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            let prefix = Atom::from(prefix);
            let uri = Atom::from(uri);
            scope.namespaces.insert(prefix.clone(), uri.clone());
            scope.prefixes.insert(uri, prefix);
        }
    }

    /// Returns the configured replacement for a namespace URI.
    #[inline]
    pub fn remapped(&self, uri: &str) -> Option<&Atom> {
        self.remap.get(&Atom::from(uri))
    }

    /// Looks up the URI bound to `prefix` without caching.
    pub fn lookup_namespace(
        &self,
        prefix: &str,
        delegate: &dyn NamespaceContext,
    ) -> Option<Atom> {
        let key = Atom::from(prefix);
        for scope in self.scopes.iter().rev() {
            if let Some(uri) = scope.namespaces.get(&key) {
                return Some(uri.clone());
            }
        }
        if let Some(uri) = fixed_namespace(prefix) {
            return Some(Atom::from(uri));
        }
        delegate.lookup_namespace(prefix)
    }

    /// Looks up the URI bound to `prefix`, caching the answer.
    pub fn resolve_namespace(
        &mut self,
        prefix: &str,
        delegate: &dyn NamespaceContext,
    ) -> Option<Atom> {
        let key = Atom::from(prefix);
        let found = self
            .scopes
            .iter()
            .rev()
            .enumerate()
            .find_map(|(level, scope)| scope.namespaces.get(&key).map(|uri| (level, uri.clone())));
        if let Some((level, uri)) = found {
            if level > 0 {
                self.cache_namespace(prefix, &uri);
            }
            return Some(uri);
        }
        if let Some(uri) = fixed_namespace(prefix) {
            return Some(Atom::from(uri));
        }
        let uri = delegate.lookup_namespace(prefix)?;
        self.cache_namespace(prefix, &uri);
        Some(uri)
    }

    /// Looks up a prefix bound to `uri` without caching.
    pub fn lookup_prefix(&self, uri: &str, delegate: &dyn NamespaceContext) -> Option<Atom> {
        let uri = self.effective_uri(uri)?;
        for scope in self.scopes.iter().rev() {
            if let Some(prefix) = scope.prefixes.get(&uri) {
                return Some(prefix.clone());
            }
        }
        if let Some(prefix) = fixed_prefix(&uri) {
            return Some(Atom::from(prefix));
        }
        delegate.lookup_prefix(&uri)
    }

    /// Looks up a prefix bound to `uri`, caching the answer.
    pub fn resolve_prefix(
        &mut self,
        uri: &str,
        delegate: &dyn NamespaceContext,
    ) -> Option<Atom> {
        let uri = self.effective_uri(uri)?;
        let found = self
            .scopes
            .iter()
            .rev()
            .enumerate()
            .find_map(|(level, scope)| scope.prefixes.get(&uri).map(|prefix| (level, prefix.clone())));
        if let Some((level, prefix)) = found {
            if level > 0 {
                self.cache_prefix(&uri, &prefix);
            }
            return Some(prefix);
        }
        if let Some(prefix) = fixed_prefix(&uri) {
            return Some(Atom::from(prefix));
        }
        let prefix = delegate.lookup_prefix(&uri)?;
        self.cache_prefix(&uri, &prefix);
        Some(prefix)
    }

    /// Returns the prefix bound to `uri`, binding a fresh `psN` prefix in
    /// the innermost scope if there is none.
    ///
    /// The empty namespace never gets a prefix.
    pub fn unique_prefix(&mut self, uri: &str, delegate: &dyn NamespaceContext) -> Option<Atom> {
        if uri.is_empty() {
            return None;
        }
        if let Some(prefix) = self.resolve_prefix(uri, delegate) {
            return Some(prefix);
        }
        let mut index = 0;
        loop {
            index += 1;
            let candidate = format!("{}{}", SYNTHETIC_PREFIX, index);
            if self.lookup_namespace(&candidate, delegate).is_none() {
                self.bind(&candidate, uri);
                return Some(Atom::from(candidate));
            }
        }
    }

    /// Gives a renamed element the prefix it is reported or written with.
    ///
    /// An unprefixed, unqualified name moved into a namespace takes the
    /// prefix bound to that namespace, or a fresh synthetic one.  A
    /// prefixed name moved out of every namespace loses its prefix.  In
    /// all other cases the original prefix is kept.
    pub fn adopt_prefix(
        &mut self,
        original: &QName,
        target: QName,
        delegate: &dyn NamespaceContext,
    ) -> QName {
        let prefix = if original.prefix().is_empty()
            && !original.is_qualified()
            && target.is_qualified()
        {
            let found = match self.resolve_prefix(target.ns(), delegate) {
                Some(prefix) => Some(prefix),
                None => self.unique_prefix(target.ns(), delegate),
            };
            found.unwrap_or_else(|| Atom::from(""))
        } else if !original.prefix().is_empty() && !target.is_qualified() {
            Atom::from("")
        } else {
            Atom::from(original.prefix())
        };
        target.to_prefixed(prefix)
    }

    fn effective_uri(&self, uri: &str) -> Option<Atom> {
        if uri.is_empty() {
            return None;
        }
        let uri = Atom::from(uri);
        match self.remap.get(&uri) {
            Some(target) if target.is_empty() => None,
            Some(target) => Some(target.clone()),
            None => Some(uri),
        }
    }

    fn cache_namespace(&mut self, prefix: &str, uri: &Atom) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.namespaces.insert(Atom::from(prefix), uri.clone());
        }
    }

    fn cache_prefix(&mut self, uri: &Atom, prefix: &Atom) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.prefixes.insert(uri.clone(), prefix.clone());
        }
    }
}

//! The string keyed configuration surface and its typed form.
use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use string_cache::DefaultAtom as Atom;

use crate::append::AppendRule;
use crate::name::QName;
use crate::rename::RenameTable;

/// Transform configuration.
///
/// Names use the `{namespace}local` convention (the namespace part is
/// optional), `*` as local part matches every name of a namespace and the
/// empty string is the sentinel name that drops what it is mapped to.
///
/// * `elements`: element renames.  Mapping an element to `""` drops it
///   with its whole subtree.  A `{a}*` to `{b}*` entry also rewrites
///   namespace declarations of `a` to `b`.
/// * `attributes`: attribute renames.  Mapping to `""` removes the
///   attribute.
/// * `appends`: synthetic content.  The key names the triggering element;
///   a trailing `/` puts the content inside it instead of before it.  The
///   value names the injected element, optionally followed by `=text`.
///   If the value names the trigger itself the text replaces the
///   element's content.
/// * `drops`: elements to unwrap, keeping their content.
///
/// Maps keep insertion order, which is also the lookup order.
///
/// ```
/// # use xmltransform::TransformConfig;
/// let config = TransformConfig::new()
///     .rename_element("{urn:old}*", "{urn:new}*")
///     .append_element("{urn:old}Body/", "{urn:new}Payload")
///     .drop_element("wrapper");
/// assert!(config.needs_reader_transform());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransformConfig {
    pub elements: IndexMap<String, String>,
    pub attributes: IndexMap<String, String>,
    pub appends: IndexMap<String, String>,
    pub drops: Vec<String>,
    /// Writer only: turn surviving attributes into child elements.
    pub attributes_to_elements: bool,
    /// Reader only: when false, `effective_reader` hands out the wrapped
    /// reader.
    pub block_original_reader: bool,
    /// Writer only: the namespace written as default namespace.  All
    /// other default namespace declarations are suppressed.
    pub default_namespace: Option<String>,
}

impl TransformConfig {
    /// Returns a new config with default values.
    pub fn new() -> TransformConfig {
        TransformConfig {
            elements: IndexMap::new(),
            attributes: IndexMap::new(),
            appends: IndexMap::new(),
            drops: vec![],
            attributes_to_elements: false,
            block_original_reader: true,
            default_namespace: None,
        }
    }

    /// Adds an element rename.
    pub fn rename_element<K: Into<String>, V: Into<String>>(mut self, from: K, to: V) -> Self {
        self.elements.insert(from.into(), to.into());
        self
    }

    /// Adds an attribute rename.
    pub fn rename_attribute<K: Into<String>, V: Into<String>>(mut self, from: K, to: V) -> Self {
        self.attributes.insert(from.into(), to.into());
        self
    }

    /// Adds an append rule.
    pub fn append_element<K: Into<String>, V: Into<String>>(mut self, trigger: K, spec: V) -> Self {
        self.appends.insert(trigger.into(), spec.into());
        self
    }

    /// Adds an element to unwrap.
    pub fn drop_element<S: Into<String>>(mut self, name: S) -> Self {
        self.drops.push(name.into());
        self
    }

    /// Sets the namespace written as default namespace.
    pub fn default_namespace<S: Into<String>>(mut self, uri: S) -> Self {
        self.default_namespace = Some(uri.into());
        self
    }

    /// Does reading need a transform layer at all?
    pub fn needs_reader_transform(&self) -> bool {
        !self.elements.is_empty()
            || !self.attributes.is_empty()
            || !self.appends.is_empty()
            || !self.drops.is_empty()
    }

    /// Does writing need a transform layer at all?
    pub fn needs_writer_transform(&self) -> bool {
        self.needs_reader_transform()
            || self.attributes_to_elements
            || self.default_namespace.is_some()
    }

    /// Converts the string tables into their typed form.
    pub fn rules(&self) -> TransformRules {
        let mut rules = TransformRules {
            elements: RenameTable::with_capacity(self.elements.len()),
            attributes: RenameTable::with_capacity(self.attributes.len()),
            appends: HashMap::with_capacity(self.appends.len()),
            drops: self.drops.iter().map(|name| QName::parse(name)).collect(),
            namespace_remap: HashMap::new(),
        };
        for (from, to) in &self.elements {
            let from = QName::parse(from);
            let to = QName::parse(to);
            if from.is_wildcard() && to.is_wildcard() {
                rules
                    .namespace_remap
                    .insert(Atom::from(from.ns()), Atom::from(to.ns()));
            }
            rules.elements.put(from, to);
        }
        for (from, to) in &self.attributes {
            rules.attributes.put(QName::parse(from), QName::parse(to));
        }
        for (trigger, spec) in &self.appends {
            let (trigger, rule) = parse_append(trigger, spec);
            rules.appends.insert(trigger, rule);
        }
        rules
    }
}

impl Default for TransformConfig {
    fn default() -> TransformConfig {
        TransformConfig::new()
    }
}

gen_setters!(TransformConfig,
    elements: val IndexMap<String, String>,
    attributes: val IndexMap<String, String>,
    appends: val IndexMap<String, String>,
    drops: val Vec<String>,
    attributes_to_elements: val bool,
    block_original_reader: val bool
);

/// Splits one `appends` entry into the trigger name and its rule.
fn parse_append(trigger: &str, spec: &str) -> (QName, AppendRule) {
    let (trigger, child) = match trigger.strip_suffix('/') {
        Some(trigger) => (trigger, true),
        None => (trigger, false),
    };
    let from = spec.find('}').unwrap_or(0);
    let (target, text) = match spec[from..].find('=').map(|index| index + from) {
        Some(index) if index > 0 => (&spec[..index], Some(spec[index + 1..].to_string())),
        _ => (spec, None),
    };
    (
        QName::parse(trigger),
        AppendRule::new(QName::parse(target), text, child),
    )
}

/// The typed tables a transform reader or writer runs on.
#[derive(Debug, Clone, Default)]
pub struct TransformRules {
    pub elements: RenameTable,
    pub attributes: RenameTable,
    /// Append rules by triggering element.  Consumed on first use.
    pub appends: HashMap<QName, AppendRule>,
    pub drops: HashSet<QName>,
    /// Namespace replacements from `{a}*` to `{b}*` element renames.
    pub namespace_remap: HashMap<Atom, Atom>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::append::AppendMode;

    #[test]
    fn test_parse_append() {
        let (trigger, rule) = parse_append("{urn:a}Body/", "{urn:b}Payload");
        assert_eq!(trigger, QName::new("urn:a", "Body"));
        assert_eq!(rule.target(), &QName::new("urn:b", "Payload"));
        assert_eq!(rule.mode(), AppendMode::PostWrap);

        let (_, rule) = parse_append("a", "{http://x=y}b=1 = 2");
        assert_eq!(rule.target(), &QName::new("http://x=y", "b"));
        assert_eq!(rule.text(), Some("1 = 2"));
        assert_eq!(rule.mode(), AppendMode::PreInclude);

        let (_, rule) = parse_append("a", "=x");
        assert_eq!(rule.target(), &QName::from_name("=x"));
        assert_eq!(rule.text(), None);
    }

    #[test]
    fn test_wildcard_pairs_remap_namespaces() {
        let rules = TransformConfig::new()
            .rename_element("{urn:a}*", "{urn:b}*")
            .rename_element("{urn:c}*", "d")
            .rename_attribute("{urn:e}*", "{urn:f}*")
            .rules();
        assert_eq!(rules.namespace_remap.len(), 1);
        assert_eq!(
            rules.namespace_remap.get(&Atom::from("urn:a")).map(|uri| &**uri),
            Some("urn:b")
        );
        assert_eq!(rules.elements.len(), 2);
        assert_eq!(rules.attributes.len(), 1);
    }
}

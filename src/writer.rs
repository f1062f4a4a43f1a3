//! The outbound transform layer over a push writer.
use std::collections::{HashMap, HashSet};

use log::{debug, trace};
use string_cache::DefaultAtom as Atom;

use crate::append::{AppendMode, AppendRule};
use crate::config::{TransformConfig, TransformRules};
use crate::events::{Closing, ParsingEvent};
use crate::name::QName;
use crate::namespace::{NamespaceContext, NamespaceOverlay, NS_XMLNS_PREFIX};
use crate::rename::RenameTable;
use crate::stream::XmlStreamWriter;
use crate::Error;

/// A writer that renames, drops and injects elements while serializing.
///
/// Every call is rewritten and forwarded to the wrapped
/// [`XmlStreamWriter`].  Content that has to be written when an element
/// closes is kept on a stack of frames, one per written start element.
/// Inside a deep-dropped element every call is swallowed.
///
/// Like the reader, a transform writer is good for exactly one document.
pub struct TransformWriter<W> {
    inner: W,
    elements: RenameTable,
    attributes: RenameTable,
    appends: HashMap<QName, AppendRule>,
    drops: HashSet<QName>,
    namespaces: NamespaceOverlay,
    written_uris: Vec<HashSet<Atom>>,
    frames: Vec<Closing>,
    replace_namespace: Option<Atom>,
    replace_text: Option<(usize, String)>,
    post_wrap: Option<QName>,
    depth: usize,
    drop_depth: usize,
    attributes_to_elements: bool,
    default_namespace: Option<Atom>,
}

impl<W: XmlStreamWriter> TransformWriter<W> {
    /// Wraps `inner` with the rules of a configuration.
    pub fn new(inner: W, config: &TransformConfig) -> TransformWriter<W> {
        TransformWriter::from_rules(
            inner,
            config.rules(),
            config.attributes_to_elements,
            config.default_namespace.as_deref(),
        )
    }

    /// Wraps `inner` with already converted rules.
    pub fn from_rules(
        inner: W,
        rules: TransformRules,
        attributes_to_elements: bool,
        default_namespace: Option<&str>,
    ) -> TransformWriter<W> {
        TransformWriter {
            inner,
            elements: rules.elements,
            attributes: rules.attributes,
            appends: rules.appends,
            drops: rules.drops,
            namespaces: NamespaceOverlay::new(rules.namespace_remap),
            written_uris: vec![],
            frames: vec![],
            replace_namespace: None,
            replace_text: None,
            post_wrap: None,
            depth: 0,
            drop_depth: 0,
            attributes_to_elements,
            default_namespace: default_namespace.map(Atom::from),
        }
    }

    /// Returns the number of elements currently open, dropped ones
    /// included.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns a reference to the wrapped writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwraps the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }

    fn in_deep_drop(&self) -> bool {
        self.drop_depth > 0 && self.drop_depth <= self.depth
    }

    fn matches_dropped(&self, shallow: bool) -> bool {
        self.in_deep_drop() || (shallow && self.frames.last() == Some(&Closing::Unwrap))
    }

    fn is_default_namespace(&self, uri: &str) -> bool {
        self.default_namespace.as_deref() == Some(uri)
    }

    fn is_replaced_namespace(&self, uri: &str) -> bool {
        self.replace_namespace.as_deref() == Some(uri)
    }

    fn remapped(&self, uri: &str) -> Option<Atom> {
        self.namespaces.remapped(uri).cloned()
    }

    /// Writes a start tag, declaring its namespace when the current
    /// scope does not already bind the prefix to it.
    fn write(&mut self, name: &QName, replace_prefix: bool) -> Result<(), Error> {
        let ns = name.ns();
        let mut declare = false;
        let mut prefix = Atom::from(name.prefix());
        if ns.is_empty() {
            prefix = Atom::from("");
        } else if (replace_prefix || self.default_namespace.is_some()) && prefix.is_empty() {
            let found = self.namespaces.resolve_prefix(ns, &self.inner);
            prefix = match found {
                Some(found) => found,
                None => {
                    declare = true;
                    self.namespaces
                        .unique_prefix(ns, &self.inner)
                        .unwrap_or_else(|| Atom::from(""))
                }
            };
        }
        if self.is_default_namespace(ns) {
            prefix = Atom::from("");
        }
        trace!("writing start {} as {:?}", name, prefix);
        self.inner
            .write_start_element(&prefix, name.local_name(), ns)?;
        let bound = self.namespaces.resolve_namespace(&prefix, &self.inner);
        if declare || bound.as_deref().unwrap_or("") != ns {
            self.write_namespace(&prefix, ns)?;
        }
        Ok(())
    }

    /// Writes the synthetic sibling or wrapper that goes before the
    /// element and returns the matching frame.
    fn write_pre_append(
        &mut self,
        name: &QName,
        expected: &QName,
        rule: AppendRule,
    ) -> Result<Closing, Error> {
        let target = rule.target().clone();
        let ns = target.ns();
        let mut declare = false;
        let prefix = match self.namespaces.resolve_prefix(ns, &self.inner) {
            Some(prefix) => prefix,
            None => {
                declare = true;
                if ns == expected.ns() && !expected.prefix().is_empty() {
                    Atom::from(expected.prefix())
                } else {
                    self.namespaces
                        .unique_prefix(ns, &self.inner)
                        .unwrap_or_else(|| Atom::from(""))
                }
            }
        };
        self.write(&target.to_prefixed(prefix.clone()), false)?;
        if declare && !prefix.is_empty() {
            self.write_namespace(&prefix, ns)?;
        }
        match rule.into_text() {
            None => Ok(Closing::replay(vec![
                ParsingEvent::EndElement(expected.clone()),
                ParsingEvent::EndElement(target),
            ])),
            Some(text) => {
                self.inner.write_characters(&text)?;
                self.inner.write_end_element()?;
                Ok(Closing::for_element(name, expected))
            }
        }
    }

    /// Opens a post-wrap element once the wrapped element's own
    /// declarations and attributes are written.
    fn open_post_wrap(&mut self) -> Result<(), Error> {
        if let Some(target) = self.post_wrap.take() {
            let prefix = self
                .namespaces
                .resolve_prefix(target.ns(), &self.inner)
                .unwrap_or_else(|| Atom::from(""));
            self.write(&target.to_prefixed(prefix), false)?;
        }
        Ok(())
    }

    fn replay(&mut self, events: impl IntoIterator<Item = ParsingEvent>) -> Result<(), Error> {
        for event in events {
            match event {
                ParsingEvent::StartElement(name) => self.write(&name, true)?,
                ParsingEvent::EndElement(..) => self.inner.write_end_element()?,
                ParsingEvent::Characters(text) => self.inner.write_characters(&text)?,
            }
        }
        Ok(())
    }

    fn write_attribute_as_element(&mut self, name: &QName, value: &str) -> Result<(), Error> {
        self.write_start_element("", name.local_name(), name.ns())?;
        self.write_characters(value)?;
        self.write_end_element()
    }
}

impl<W: XmlStreamWriter> NamespaceContext for TransformWriter<W> {
    fn lookup_namespace(&self, prefix: &str) -> Option<Atom> {
        self.namespaces.lookup_namespace(prefix, &self.inner)
    }

    fn lookup_prefix(&self, uri: &str) -> Option<Atom> {
        self.namespaces.lookup_prefix(uri, &self.inner)
    }
}

impl<W: XmlStreamWriter> XmlStreamWriter for TransformWriter<W> {
    fn write_start_element(&mut self, prefix: &str, local: &str, uri: &str) -> Result<(), Error> {
        self.open_post_wrap()?;
        self.depth += 1;
        self.namespaces.push_scope();
        if self.in_deep_drop() {
            return Ok(());
        }
        let inherited = self.written_uris.last().cloned().unwrap_or_default();
        self.written_uris.push(inherited);

        let name = QName::with_prefix(uri, local, prefix);
        debug!("write StartElement {} at {}", name, self.depth);
        let append = self.appends.remove(&name);
        let dropped = self.drops.contains(&name);
        let expected = match self.elements.get(&name) {
            Some(target) => self.namespaces.adopt_prefix(&name, target, &self.inner),
            None => name.clone(),
        };

        let mut closing = Closing::for_element(&name, &expected);
        let mut post = None;
        match append {
            Some(rule) if rule.replaces_content_of(&name) => {
                debug!("replacing content of {} with {:?}", expected, rule.text());
                self.replace_text = rule.into_text().map(|text| (self.depth, text));
            }
            Some(rule) if rule.is_child() => post = Some(rule),
            Some(rule) => {
                debug!("{:?} {} at {}", rule.mode(), rule.target(), expected);
                closing = self.write_pre_append(&name, &expected, rule)?;
            }
            None if dropped => {
                debug!("shallow-dropping start {}", name);
                self.frames.push(Closing::Unwrap);
                return Ok(());
            }
            None if expected.is_empty() => {
                debug!("deep-dropping {}", name);
                self.written_uris.pop();
                self.drop_depth = self.depth;
                return Ok(());
            }
            None => {}
        }

        self.write(&expected, false)?;
        if expected.is_qualified() && !name.is_qualified() {
            self.write_namespace(expected.prefix(), expected.ns())?;
        }
        self.replace_namespace = if expected.ns() == name.ns() {
            None
        } else {
            Some(Atom::from(name.ns()))
        };

        if let Some(rule) = post {
            let target = rule.target().clone();
            debug!("{:?} {} at {}", rule.mode(), target, expected);
            closing = match rule.mode() {
                AppendMode::PostInclude => Closing::replay(vec![
                    ParsingEvent::StartElement(target.clone()),
                    ParsingEvent::Characters(rule.into_text().unwrap_or_default()),
                    ParsingEvent::EndElement(target),
                    ParsingEvent::EndElement(expected),
                ]),
                _ => {
                    self.post_wrap = Some(target.clone());
                    Closing::replay(vec![
                        ParsingEvent::EndElement(target),
                        ParsingEvent::EndElement(expected),
                    ])
                }
            };
        }
        self.frames.push(closing);
        Ok(())
    }

    fn write_end_element(&mut self) -> Result<(), Error> {
        let in_drop = self.in_deep_drop();
        if self.depth == 0 || (!in_drop && self.frames.is_empty()) {
            return Err(Error::UnexpectedEvent);
        }
        self.open_post_wrap()?;
        self.namespaces.pop_scope();
        self.depth -= 1;
        if matches!(self.replace_text, Some((opened, _)) if opened > self.depth) {
            self.replace_text = None;
        }
        if in_drop {
            if self.drop_depth > self.depth {
                self.drop_depth = 0;
            }
            return Ok(());
        }
        self.written_uris.pop();
        match self.frames.pop().ok_or(Error::UnexpectedEvent)? {
            Closing::Unwrap => {
                debug!("shallow-dropping end at {}", self.depth + 1);
                Ok(())
            }
            Closing::Plain => self.inner.write_end_element(),
            Closing::Replay(events) => self.replay(events),
        }
    }

    fn write_characters(&mut self, text: &str) -> Result<(), Error> {
        if self.matches_dropped(false) {
            return Ok(());
        }
        self.open_post_wrap()?;
        match self.replace_text.take() {
            Some((_, replacement)) => self.inner.write_characters(&replacement),
            None => self.inner.write_characters(text),
        }
    }

    fn write_comment(&mut self, text: &str) -> Result<(), Error> {
        if self.matches_dropped(false) {
            return Ok(());
        }
        self.open_post_wrap()?;
        self.inner.write_comment(text)
    }

    fn write_namespace(&mut self, prefix: &str, uri: &str) -> Result<(), Error> {
        if prefix.is_empty() || prefix == NS_XMLNS_PREFIX {
            return self.write_default_namespace(uri);
        }
        if self.matches_dropped(true) {
            return Ok(());
        }
        let remapped = self.remapped(uri);
        if remapped.as_ref().map_or(false, |target| target.is_empty())
            || self.is_replaced_namespace(uri)
        {
            return Ok(());
        }
        let uri = remapped.unwrap_or_else(|| Atom::from(uri));
        let written = self
            .written_uris
            .last()
            .map_or(false, |written| written.contains(&uri));
        if written && self.namespaces.resolve_prefix(&uri, &self.inner).as_deref() == Some(prefix) {
            return Ok(());
        }
        if self.is_default_namespace(&uri) {
            self.inner.write_default_namespace(&uri)?;
            self.namespaces.bind("", &uri);
        } else {
            self.inner.write_namespace(prefix, &uri)?;
            self.namespaces.bind(prefix, &uri);
        }
        if let Some(written) = self.written_uris.last_mut() {
            written.insert(uri);
        }
        Ok(())
    }

    fn write_default_namespace(&mut self, uri: &str) -> Result<(), Error> {
        if self.matches_dropped(true) {
            return Ok(());
        }
        let remapped = self.remapped(uri);
        if remapped.as_ref().map_or(false, |target| target.is_empty())
            || (self.default_namespace.is_some() && !self.is_default_namespace(uri))
            || self.is_replaced_namespace(uri)
        {
            return Ok(());
        }
        let uri = remapped.unwrap_or_else(|| Atom::from(uri));
        let written = self
            .written_uris
            .last()
            .map_or(false, |written| written.contains(&uri));
        if written && self.namespaces.resolve_prefix(&uri, &self.inner).as_deref() == Some("") {
            return Ok(());
        }
        self.inner.write_default_namespace(&uri)?;
        self.namespaces.bind("", &uri);
        if let Some(written) = self.written_uris.last_mut() {
            written.insert(uri);
        }
        Ok(())
    }

    fn set_default_namespace(&mut self, uri: &str) -> Result<(), Error> {
        if self.matches_dropped(true) {
            return Ok(());
        }
        let remapped = self.remapped(uri);
        if remapped.as_ref().map_or(false, |target| target.is_empty())
            || (self.default_namespace.is_some() && !self.is_default_namespace(uri))
        {
            return Ok(());
        }
        match remapped {
            Some(target) => self.inner.set_default_namespace(&target),
            None => self.inner.set_default_namespace(uri),
        }
    }

    fn write_attribute(
        &mut self,
        prefix: &str,
        uri: &str,
        local: &str,
        value: &str,
    ) -> Result<(), Error> {
        if self.matches_dropped(true) {
            return Ok(());
        }
        let name = QName::with_prefix(uri, local, prefix);
        let name = match self.attributes.get(&name) {
            Some(target) if target.is_empty() => {
                trace!("dropping attribute {}", name);
                return Ok(());
            }
            Some(target) if target.ns() == name.ns() => target.to_prefixed(name.prefix()),
            Some(target) => target,
            None => name,
        };
        if self.attributes_to_elements {
            self.write_attribute_as_element(&name, value)
        } else {
            self.inner
                .write_attribute(name.prefix(), name.ns(), name.local_name(), value)
        }
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.open_post_wrap()?;
        self.inner.flush()
    }
}

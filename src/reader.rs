//! The inbound transform layer over a pull reader.
use std::collections::{HashMap, HashSet, VecDeque};

use log::debug;
use once_cell::unsync::OnceCell;
use string_cache::DefaultAtom as Atom;

use crate::append::{AppendMode, AppendRule};
use crate::config::{TransformConfig, TransformRules};
use crate::events::{Closing, EventKind, ParsingEvent};
use crate::name::QName;
use crate::namespace::{NamespaceContext, NamespaceOverlay};
use crate::rename::RenameTable;
use crate::stream::XmlStreamReader;
use crate::Error;

/// Reader property asking whether element names are interned.
pub const INTERN_NAMES: &str = "org.codehaus.stax2.internNames";

/// Reader property asking whether namespace URIs are interned.
pub const INTERN_NS_URIS: &str = "org.codehaus.stax2.internNsUris";

/// What the reader is positioned on.
#[derive(Debug)]
enum Cursor {
    /// Whatever the wrapped reader is positioned on.
    Delegate,
    /// The wrapped reader's start element, reported under a new name.
    Element(QName),
    /// A synthetic event.
    Event(ParsingEvent),
}

/// A reader that renames, drops and injects elements while parsing.
///
/// The transform reader wraps any [`XmlStreamReader`] and rewrites the
/// events it reports.  Synthetic events are queued and handed out before
/// the wrapped reader is advanced again; everything that has to happen
/// when an element closes is kept on a stack of frames, one per real
/// start element, so the output always nests correctly.
///
/// A transform reader is good for exactly one document: append rules are
/// consumed the first time their element is seen.
///
/// ```
/// # use xmltransform::{TransformConfig, TransformReader, XmlReader, XmlStreamReader, EventKind};
/// let config = TransformConfig::new().rename_element("foo", "bar");
/// let mut reader = TransformReader::new(XmlReader::new(&b"<foo/>"[..]), &config);
/// reader.next_event().unwrap();
/// assert_eq!(reader.next_event().unwrap(), EventKind::StartElement);
/// assert_eq!(reader.name().local_name(), "bar");
/// ```
pub struct TransformReader<R> {
    inner: R,
    elements: RenameTable,
    attributes: RenameTable,
    appends: HashMap<QName, AppendRule>,
    drops: HashSet<QName>,
    namespaces: NamespaceOverlay,
    pushed_back: VecDeque<Cursor>,
    frames: Vec<Closing>,
    current: Cursor,
    replace_text: Option<(usize, String)>,
    attribute_indexes: OnceCell<Vec<usize>>,
    block_original_reader: bool,
}

impl<R: XmlStreamReader> TransformReader<R> {
    /// Wraps `inner` with the rules of a configuration.
    pub fn new(inner: R, config: &TransformConfig) -> TransformReader<R> {
        TransformReader::from_rules(inner, config.rules(), config.block_original_reader)
    }

    /// Wraps `inner` with already converted rules.
    pub fn from_rules(
        inner: R,
        rules: TransformRules,
        block_original_reader: bool,
    ) -> TransformReader<R> {
        TransformReader {
            inner,
            elements: rules.elements,
            attributes: rules.attributes,
            appends: rules.appends,
            drops: rules.drops,
            namespaces: NamespaceOverlay::new(rules.namespace_remap),
            pushed_back: VecDeque::new(),
            frames: vec![],
            current: Cursor::Delegate,
            replace_text: None,
            attribute_indexes: OnceCell::new(),
            block_original_reader,
        }
    }

    /// Returns the reader callers should consume.
    ///
    /// That is this reader unless the original reader was configured not
    /// to be blocked, in which case the wrapped reader is returned and the
    /// rules no longer apply.
    pub fn effective_reader(&mut self) -> &mut dyn XmlStreamReader {
        if self.block_original_reader {
            return self;
        }
        &mut self.inner
    }

    /// Returns the number of elements currently open.
    pub fn depth(&self) -> usize {
        self.namespaces.depth()
    }

    /// Returns a reference to the wrapped reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Unwraps the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn expected_name(&mut self, name: &QName) -> QName {
        match self.elements.get(name) {
            Some(target) => self.namespaces.adopt_prefix(name, target, &self.inner),
            None => name.clone(),
        }
    }

    /// Handles a real start element.  Returns `false` if it vanished.
    fn start_element(&mut self) -> Result<bool, Error> {
        self.namespaces.push_scope();
        let name = self.inner.name();
        debug!("read StartElement {} at {}", name, self.depth());
        let append = self.appends.remove(&name);
        let dropped = self.drops.contains(&name);
        let expected = self.expected_name(&name);

        match append {
            Some(rule) if rule.replaces_content_of(&name) => {
                debug!("replacing content of {} with {:?}", expected, rule.text());
                self.replace_text = rule.into_text().map(|text| (self.namespaces.depth(), text));
                self.frames.push(Closing::for_element(&name, &expected));
                self.current = Cursor::Element(expected);
            }
            Some(rule) => self.start_append(&name, expected, rule),
            None if dropped => {
                debug!("shallow-dropping start {}", expected);
                self.frames.push(Closing::Unwrap);
                return Ok(false);
            }
            None if expected.is_empty() => {
                debug!("deep-dropping {}", name);
                let skipped = self.skip_subtree();
                self.namespaces.pop_scope();
                skipped?;
                return Ok(false);
            }
            None => {
                self.frames.push(Closing::for_element(&name, &expected));
                self.current = Cursor::Element(expected);
            }
        }
        Ok(true)
    }

    fn start_append(&mut self, name: &QName, expected: QName, rule: AppendRule) {
        let target = rule.target().clone();
        let mode = rule.mode();
        debug!("{:?} {} at {}", mode, target, expected);
        match mode {
            AppendMode::PostWrap => {
                self.pushed_back
                    .push_front(Cursor::Event(ParsingEvent::StartElement(target.clone())));
                self.frames.push(Closing::replay(vec![
                    ParsingEvent::EndElement(target),
                    ParsingEvent::EndElement(expected.clone()),
                ]));
                self.current = Cursor::Element(expected);
            }
            AppendMode::PostInclude => {
                let text = rule.into_text().unwrap_or_default();
                self.frames.push(Closing::replay(vec![
                    ParsingEvent::StartElement(target.clone()),
                    ParsingEvent::Characters(text),
                    ParsingEvent::EndElement(target),
                    ParsingEvent::EndElement(expected.clone()),
                ]));
                self.current = Cursor::Element(expected);
            }
            AppendMode::PreWrap => {
                self.pushed_back.push_front(Cursor::Element(expected.clone()));
                self.frames.push(Closing::replay(vec![
                    ParsingEvent::EndElement(expected),
                    ParsingEvent::EndElement(target.clone()),
                ]));
                self.current = Cursor::Event(ParsingEvent::StartElement(target));
            }
            AppendMode::PreInclude => {
                let text = rule.into_text().unwrap_or_default();
                self.frames.push(Closing::for_element(name, &expected));
                self.pushed_back.push_front(Cursor::Element(expected));
                self.pushed_back
                    .push_front(Cursor::Event(ParsingEvent::EndElement(target.clone())));
                self.pushed_back
                    .push_front(Cursor::Event(ParsingEvent::Characters(text)));
                self.current = Cursor::Event(ParsingEvent::StartElement(target));
            }
        }
    }

    /// Handles a real end element.  Returns `false` if it vanished.
    fn end_element(&mut self) -> bool {
        debug!("read EndElement {} at {}", self.inner.name(), self.depth());
        self.namespaces.pop_scope();
        let depth = self.namespaces.depth();
        if matches!(self.replace_text, Some((opened, _)) if opened > depth) {
            self.replace_text = None;
        }
        match self.frames.pop() {
            Some(Closing::Unwrap) => {
                debug!("shallow-dropping end {}", self.inner.name());
                false
            }
            Some(Closing::Replay(mut events)) => {
                debug!("replaying {} pushed events", events.len());
                match events.pop_front() {
                    Some(first) => {
                        for event in events.into_iter().rev() {
                            self.pushed_back.push_front(Cursor::Event(event));
                        }
                        self.current = Cursor::Event(first);
                    }
                    None => self.current = Cursor::Delegate,
                }
                true
            }
            Some(Closing::Plain) | None => {
                self.current = Cursor::Delegate;
                true
            }
        }
    }

    /// Consumes the wrapped reader up to the end of the current element.
    fn skip_subtree(&mut self) -> Result<(), Error> {
        let mut open = 0usize;
        while self.inner.has_next() {
            match self.inner.next_event()? {
                EventKind::StartElement => open += 1,
                EventKind::EndElement if open == 0 => break,
                EventKind::EndElement => open -= 1,
                _ => {}
            }
        }
        Ok(())
    }

    fn current_name(&self) -> QName {
        match self.current {
            Cursor::Delegate => self.inner.name(),
            Cursor::Element(ref name) => name.clone(),
            Cursor::Event(ref event) => event.name().cloned().unwrap_or_else(QName::empty),
        }
    }

    fn attribute_indexes(&self) -> &[usize] {
        if let Cursor::Element(..) = self.current {
            self.attribute_indexes.get_or_init(|| {
                (0..self.inner.attribute_count())
                    .filter(|&index| {
                        match self.attributes.get(&self.inner.attribute_name(index)) {
                            Some(target) => !target.is_empty(),
                            None => true,
                        }
                    })
                    .collect()
            })
            .as_slice()
        } else {
            &[]
        }
    }

    fn attribute_index(&self, index: usize) -> usize {
        let indexes = self.attribute_indexes();
        match indexes.get(index) {
            Some(&index) => index,
            None => panic!(
                "invalid index {}; current element has only {} attributes",
                index,
                indexes.len()
            ),
        }
    }
}

impl<R: XmlStreamReader> NamespaceContext for TransformReader<R> {
    fn lookup_namespace(&self, prefix: &str) -> Option<Atom> {
        let uri = self.namespaces.lookup_namespace(prefix, &self.inner)?;
        match self.namespaces.remapped(&uri) {
            Some(target) if target.is_empty() => None,
            Some(target) => Some(target.clone()),
            None => Some(uri),
        }
    }

    fn lookup_prefix(&self, uri: &str) -> Option<Atom> {
        self.namespaces.lookup_prefix(uri, &self.inner)
    }
}

impl<R: XmlStreamReader> XmlStreamReader for TransformReader<R> {
    fn next_event(&mut self) -> Result<EventKind, Error> {
        self.attribute_indexes = OnceCell::new();
        if let Some(cursor) = self.pushed_back.pop_front() {
            debug!("pushed event available: {:?}", cursor);
            self.current = cursor;
            return Ok(self.event_kind());
        }
        loop {
            match self.inner.next_event()? {
                EventKind::StartElement => {
                    if self.start_element()? {
                        return Ok(self.event_kind());
                    }
                }
                EventKind::EndElement => {
                    if self.end_element() {
                        return Ok(self.event_kind());
                    }
                }
                EventKind::Characters if self.replace_text.is_some() => {
                    let text = self.replace_text.take().map(|(_, text)| text);
                    self.current = Cursor::Event(ParsingEvent::Characters(text.unwrap_or_default()));
                    return Ok(EventKind::Characters);
                }
                kind => {
                    self.current = Cursor::Delegate;
                    return Ok(kind);
                }
            }
        }
    }

    fn has_next(&self) -> bool {
        !self.pushed_back.is_empty() || self.inner.has_next()
    }

    fn event_kind(&self) -> EventKind {
        match self.current {
            Cursor::Delegate => self.inner.event_kind(),
            Cursor::Element(..) => EventKind::StartElement,
            Cursor::Event(ref event) => event.kind(),
        }
    }

    fn name(&self) -> QName {
        let name = self.current_name();
        if name.prefix().is_empty() && name.is_qualified() {
            if let Some(prefix) = self.namespaces.lookup_prefix(name.ns(), &self.inner) {
                return name.to_prefixed(prefix);
            }
        }
        name
    }

    fn text(&self) -> &str {
        match self.current {
            Cursor::Delegate => self.inner.text(),
            Cursor::Event(ParsingEvent::Characters(ref text)) => text.as_str(),
            Cursor::Event(..) | Cursor::Element(..) => "",
        }
    }

    fn attribute_count(&self) -> usize {
        self.attribute_indexes().len()
    }

    fn attribute_name(&self, index: usize) -> QName {
        let original = self.inner.attribute_name(self.attribute_index(index));
        let renamed = match self.attributes.get(&original) {
            Some(renamed) => renamed,
            None => return original,
        };
        if renamed.prefix().is_empty() && renamed.is_qualified() {
            if let Some(prefix) = self.namespaces.lookup_prefix(renamed.ns(), &self.inner) {
                return renamed.to_prefixed(prefix);
            }
        }
        renamed
    }

    fn attribute_value(&self, index: usize) -> &str {
        self.inner.attribute_value(self.attribute_index(index))
    }

    fn namespace_count(&self) -> usize {
        match self.current {
            Cursor::Element(..) => self.inner.namespace_count(),
            _ => 0,
        }
    }

    fn namespace_prefix(&self, index: usize) -> Atom {
        let uri = self.inner.namespace_uri(index);
        if let Some(target) = self.namespaces.remapped(&uri) {
            if target.is_empty() {
                return Atom::from("");
            }
            return self.inner.namespace_prefix(index);
        }
        if &*uri == self.inner.name().ns() {
            return Atom::from(self.name().prefix());
        }
        self.inner.namespace_prefix(index)
    }

    fn namespace_uri(&self, index: usize) -> Atom {
        let uri = self.inner.namespace_uri(index);
        if let Some(target) = self.namespaces.remapped(&uri) {
            return target.clone();
        }
        if &*uri == self.inner.name().ns() {
            return Atom::from(self.current_name().ns());
        }
        uri
    }

    fn property(&self, name: &str) -> Option<bool> {
        match name {
            INTERN_NAMES | INTERN_NS_URIS => Some(false),
            _ => self.inner.property(name),
        }
    }
}

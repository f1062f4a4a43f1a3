//! Stream readers and writers backed by xml-rs.
use std::borrow::Cow;
use std::io::{Read, Write};

use log::trace;
use string_cache::DefaultAtom as Atom;
use xml::attribute::Attribute;
use xml::name::{Name, OwnedName};
use xml::namespace::{Namespace, NS_NO_PREFIX, NS_XMLNS_PREFIX, NS_XML_PREFIX};
use xml::reader::{EventReader, ParserConfig, XmlEvent as ReaderEvent};
use xml::writer::{EmitterConfig, EventWriter, XmlEvent as WriterEvent};

use crate::events::EventKind;
use crate::name::QName;
use crate::namespace::NamespaceContext;
use crate::stream::{XmlStreamReader, XmlStreamWriter};
use crate::Error;

fn qname_from_owned(name: OwnedName) -> QName {
    QName::with_prefix(
        name.namespace.as_deref().unwrap_or(""),
        name.local_name.as_str(),
        name.prefix.as_deref().unwrap_or(""),
    )
}

/// Returns the declarations `current` makes on top of `parent`.
fn declared_namespaces(parent: Option<&Namespace>, current: &Namespace) -> Vec<(Atom, Atom)> {
    let mut rv = vec![];
    for (prefix, uri) in current.0.iter() {
        if prefix == NS_XML_PREFIX || prefix == NS_XMLNS_PREFIX {
            continue;
        }
        let inherited = parent.and_then(|ns| ns.0.get(prefix));
        match inherited {
            Some(old) if old == uri => continue,
            None if prefix == NS_NO_PREFIX && uri.is_empty() => continue,
            _ => {}
        }
        rv.push((Atom::from(prefix.as_str()), Atom::from(uri.as_str())));
    }
    rv
}

/// A pull reader over any byte source.
///
/// Whitespace and CDATA sections are reported as characters, comments
/// are kept.  Processing instructions and doctype declarations are
/// skipped.
pub struct XmlReader<R: Read> {
    source: EventReader<R>,
    kind: EventKind,
    name: QName,
    text: String,
    attributes: Vec<(QName, String)>,
    declared: Vec<(Atom, Atom)>,
    scopes: Vec<Namespace>,
    pop_pending: bool,
    finished: bool,
}

impl<R: Read> XmlReader<R> {
    /// Creates a reader with the default parser settings.
    pub fn new(source: R) -> XmlReader<R> {
        XmlReader::new_with_config(
            source,
            ParserConfig::new()
                .ignore_comments(false)
                .whitespace_to_characters(true)
                .cdata_to_characters(true)
                .coalesce_characters(true),
        )
    }

    /// Creates a reader with explicit parser settings.
    pub fn new_with_config(source: R, config: ParserConfig) -> XmlReader<R> {
        XmlReader {
            source: EventReader::new_with_config(source, config),
            kind: EventKind::StartDocument,
            name: QName::empty(),
            text: String::new(),
            attributes: vec![],
            declared: vec![],
            scopes: vec![],
            pop_pending: false,
            finished: false,
        }
    }

    fn current_scope(&self) -> Option<&Namespace> {
        self.scopes.last()
    }
}

impl<R: Read> NamespaceContext for XmlReader<R> {
    fn lookup_namespace(&self, prefix: &str) -> Option<Atom> {
        self.current_scope()
            .and_then(|ns| ns.0.get(prefix))
            .filter(|uri| !uri.is_empty())
            .map(|uri| Atom::from(uri.as_str()))
    }

    fn lookup_prefix(&self, uri: &str) -> Option<Atom> {
        if uri.is_empty() {
            return None;
        }
        self.current_scope()?
            .0
            .iter()
            .find(|&(_, bound)| bound == uri)
            .map(|(prefix, _)| Atom::from(prefix.as_str()))
    }
}

impl<R: Read> XmlStreamReader for XmlReader<R> {
    fn next_event(&mut self) -> Result<EventKind, Error> {
        if self.finished {
            return Ok(EventKind::EndDocument);
        }
        if self.pop_pending {
            self.scopes.pop();
            self.pop_pending = false;
        }
        self.attributes.clear();
        self.declared.clear();
        self.text.clear();
        loop {
            let kind = match self.source.next()? {
                ReaderEvent::StartDocument { .. } => EventKind::StartDocument,
                ReaderEvent::EndDocument => {
                    self.finished = true;
                    EventKind::EndDocument
                }
                ReaderEvent::StartElement {
                    name,
                    attributes,
                    namespace,
                } => {
                    self.declared = declared_namespaces(self.current_scope(), &namespace);
                    self.name = qname_from_owned(name);
                    self.attributes = attributes
                        .into_iter()
                        .map(|attr| (qname_from_owned(attr.name), attr.value))
                        .collect();
                    self.scopes.push(namespace);
                    EventKind::StartElement
                }
                ReaderEvent::EndElement { name } => {
                    self.name = qname_from_owned(name);
                    self.pop_pending = true;
                    EventKind::EndElement
                }
                ReaderEvent::Characters(s) | ReaderEvent::Whitespace(s) | ReaderEvent::CData(s) => {
                    self.text = s;
                    EventKind::Characters
                }
                ReaderEvent::Comment(s) => {
                    self.text = s;
                    EventKind::Comment
                }
                other => {
                    trace!("skipping unsupported event {:?}", other);
                    continue;
                }
            };
            self.kind = kind;
            return Ok(kind);
        }
    }

    fn has_next(&self) -> bool {
        !self.finished
    }

    fn event_kind(&self) -> EventKind {
        self.kind
    }

    fn name(&self) -> QName {
        match self.kind {
            EventKind::StartElement | EventKind::EndElement => self.name.clone(),
            _ => QName::empty(),
        }
    }

    fn text(&self) -> &str {
        &self.text
    }

    fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    fn attribute_name(&self, index: usize) -> QName {
        self.attributes[index].0.clone()
    }

    fn attribute_value(&self, index: usize) -> &str {
        &self.attributes[index].1
    }

    fn namespace_count(&self) -> usize {
        self.declared.len()
    }

    fn namespace_prefix(&self, index: usize) -> Atom {
        self.declared[index].0.clone()
    }

    fn namespace_uri(&self, index: usize) -> Atom {
        self.declared[index].1.clone()
    }
}

struct PendingStart {
    name: QName,
    namespaces: Vec<(Atom, Atom)>,
    attributes: Vec<(QName, String)>,
}

/// A push writer serializing into any byte sink.
///
/// Start tags are buffered until the next structural call so that
/// namespace declarations and attributes can still be added.  Missing
/// declarations for element and attribute prefixes are added when the
/// tag is written out.
pub struct XmlWriter<W: Write> {
    sink: EventWriter<W>,
    scopes: Vec<Vec<(Atom, Atom)>>,
    pending: Option<PendingStart>,
    generated: usize,
}

impl<W: Write> XmlWriter<W> {
    /// Creates a writer that emits a bare fragment: no XML declaration,
    /// no indentation and `<tag/>` for empty elements.
    pub fn new(sink: W) -> XmlWriter<W> {
        XmlWriter::new_with_config(
            sink,
            EmitterConfig::new()
                .write_document_declaration(false)
                .pad_self_closing(false)
                .autopad_comments(false),
        )
    }

    /// Creates a writer with explicit emitter settings.
    pub fn new_with_config(sink: W, config: EmitterConfig) -> XmlWriter<W> {
        XmlWriter {
            sink: EventWriter::new_with_config(sink, config),
            scopes: vec![vec![]],
            pending: None,
            generated: 0,
        }
    }

    /// Writes out a pending start tag and returns the sink.
    pub fn into_inner(mut self) -> Result<W, Error> {
        self.flush_pending()?;
        Ok(self.sink.into_inner())
    }

    fn bound(&self, prefix: &str) -> Option<&Atom> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .find(|&&(ref p, _)| &**p == prefix)
            .map(|&(_, ref uri)| uri)
    }

    fn bind(&mut self, prefix: Atom, uri: Atom) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.push((prefix, uri));
        }
    }

    fn pending_mut(&mut self) -> Result<&mut PendingStart, Error> {
        self.pending.as_mut().ok_or(Error::UnexpectedEvent)
    }

    /// Makes sure `prefix` resolves to `uri` on the pending tag.
    fn ensure_bound(&mut self, declarations: &mut Vec<(Atom, Atom)>, prefix: &str, uri: &str) {
        if self.bound(prefix).map_or("", |bound| &**bound) == uri {
            return;
        }
        let prefix = Atom::from(prefix);
        let uri = Atom::from(uri);
        declarations.push((prefix.clone(), uri.clone()));
        self.bind(prefix, uri);
    }

    fn attribute_prefix(&mut self, declarations: &mut Vec<(Atom, Atom)>, uri: &str) -> Atom {
        let existing = self.lookup_prefix(uri).filter(|prefix| !prefix.is_empty());
        if let Some(prefix) = existing {
            return prefix;
        }
        let prefix = loop {
            self.generated += 1;
            let candidate = format!("ns{}", self.generated);
            if self.bound(&candidate).is_none() {
                break Atom::from(candidate);
            }
        };
        self.ensure_bound(declarations, &prefix, uri);
        prefix
    }

    fn flush_pending(&mut self) -> Result<(), Error> {
        let pending = match self.pending.take() {
            Some(pending) => pending,
            None => return Ok(()),
        };
        let mut declarations = pending.namespaces;

        let element = &pending.name;
        let element_prefix = if element.is_qualified() {
            self.ensure_bound(&mut declarations, element.prefix(), element.ns());
            element.prefix()
        } else {
            self.ensure_bound(&mut declarations, NS_NO_PREFIX, "");
            ""
        };

        let mut attribute_names = Vec::with_capacity(pending.attributes.len());
        for (name, _) in &pending.attributes {
            let prefix = if !name.is_qualified() {
                Atom::from("")
            } else if name.prefix().is_empty() {
                self.attribute_prefix(&mut declarations, name.ns())
            } else {
                self.ensure_bound(&mut declarations, name.prefix(), name.ns());
                Atom::from(name.prefix())
            };
            attribute_names.push(name.to_prefixed(prefix));
        }

        let mut namespace = Namespace::empty();
        let mut undeclare_default = false;
        for (prefix, uri) in &declarations {
            if prefix.is_empty() && uri.is_empty() {
                undeclare_default = true;
            } else {
                namespace.put(&**prefix, &**uri);
            }
        }

        let mut attributes = Vec::with_capacity(attribute_names.len() + 1);
        if undeclare_default {
            attributes.push(Attribute {
                name: Name::local("xmlns"),
                value: "",
            });
        }
        for (name, &(_, ref value)) in attribute_names.iter().zip(pending.attributes.iter()) {
            attributes.push(Attribute {
                name: xml_name(name),
                value,
            });
        }

        trace!("writing start tag {:?}", element);
        let name = Name {
            local_name: element.local_name(),
            namespace: Some(element.ns()).filter(|ns| !ns.is_empty()),
            prefix: Some(element_prefix).filter(|prefix| !prefix.is_empty()),
        };
        self.sink.write(WriterEvent::StartElement {
            name,
            attributes: Cow::Owned(attributes),
            namespace: Cow::Owned(namespace),
        })?;
        Ok(())
    }
}

fn xml_name(name: &QName) -> Name<'_> {
    Name {
        local_name: name.local_name(),
        namespace: Some(name.ns()).filter(|ns| !ns.is_empty()),
        prefix: Some(name.prefix()).filter(|prefix| !prefix.is_empty()),
    }
}

impl<W: Write> NamespaceContext for XmlWriter<W> {
    fn lookup_namespace(&self, prefix: &str) -> Option<Atom> {
        self.bound(prefix).filter(|uri| !uri.is_empty()).cloned()
    }

    fn lookup_prefix(&self, uri: &str) -> Option<Atom> {
        if uri.is_empty() {
            return None;
        }
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter().rev())
            .filter(|&&(_, ref bound)| &**bound == uri)
            .map(|&(ref prefix, _)| prefix)
            .find(|prefix| self.bound(prefix).map(|bound| &**bound) == Some(uri))
            .cloned()
    }
}

impl<W: Write> XmlStreamWriter for XmlWriter<W> {
    fn write_start_element(&mut self, prefix: &str, local: &str, uri: &str) -> Result<(), Error> {
        self.flush_pending()?;
        self.scopes.push(vec![]);
        self.pending = Some(PendingStart {
            name: QName::with_prefix(uri, local, prefix),
            namespaces: vec![],
            attributes: vec![],
        });
        Ok(())
    }

    fn write_end_element(&mut self) -> Result<(), Error> {
        self.flush_pending()?;
        if self.scopes.len() <= 1 {
            return Err(Error::UnexpectedEvent);
        }
        self.sink.write(WriterEvent::EndElement { name: None })?;
        self.scopes.pop();
        Ok(())
    }

    fn write_characters(&mut self, text: &str) -> Result<(), Error> {
        self.flush_pending()?;
        self.sink.write(WriterEvent::Characters(text))?;
        Ok(())
    }

    fn write_comment(&mut self, text: &str) -> Result<(), Error> {
        self.flush_pending()?;
        self.sink.write(WriterEvent::Comment(text))?;
        Ok(())
    }

    fn write_namespace(&mut self, prefix: &str, uri: &str) -> Result<(), Error> {
        self.pending_mut()?;
        if uri.is_empty() && (!prefix.is_empty() || self.lookup_namespace(prefix).is_none()) {
            return Ok(());
        }
        let prefix = Atom::from(prefix);
        let uri = Atom::from(uri);
        let pending = self.pending_mut()?;
        if !pending.namespaces.iter().any(|&(ref p, _)| *p == prefix) {
            pending.namespaces.push((prefix.clone(), uri.clone()));
            self.bind(prefix, uri);
        }
        Ok(())
    }

    fn write_default_namespace(&mut self, uri: &str) -> Result<(), Error> {
        self.write_namespace(NS_NO_PREFIX, uri)
    }

    fn set_default_namespace(&mut self, uri: &str) -> Result<(), Error> {
        self.bind(Atom::from(NS_NO_PREFIX), Atom::from(uri));
        Ok(())
    }

    fn write_attribute(
        &mut self,
        prefix: &str,
        uri: &str,
        local: &str,
        value: &str,
    ) -> Result<(), Error> {
        let pending = self.pending_mut()?;
        pending
            .attributes
            .push((QName::with_prefix(uri, local, prefix), value.to_string()));
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Error> {
        self.flush_pending()?;
        self.sink.inner_mut().flush()?;
        Ok(())
    }
}

//! The pull reader and push writer interfaces the transform layers wrap.
use string_cache::DefaultAtom as Atom;

use crate::events::{EventKind, XmlEvent};
use crate::name::QName;
use crate::namespace::NamespaceContext;
use crate::Error;

/// A forward-only, cursor style XML event source.
///
/// `next_event` moves the cursor; every other method describes the event
/// the cursor is positioned on.
pub trait XmlStreamReader: NamespaceContext {
    /// Moves to the next event and returns its kind.
    ///
    /// Once `EndDocument` was returned, further calls keep returning it.
    fn next_event(&mut self) -> Result<EventKind, Error>;

    /// Are there events left to pull?
    fn has_next(&self) -> bool;

    /// Returns the kind of the current event.
    fn event_kind(&self) -> EventKind;

    /// Returns the name of the current start or end element, including
    /// its prefix.  The sentinel empty name on any other event.
    fn name(&self) -> QName;

    /// Returns the text of the current characters or comment event.
    fn text(&self) -> &str;

    /// Returns the number of attributes on the current start element.
    fn attribute_count(&self) -> usize;

    /// Returns the name of the attribute at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below `attribute_count()`.
    fn attribute_name(&self, index: usize) -> QName;

    /// Returns the value of the attribute at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below `attribute_count()`.
    fn attribute_value(&self, index: usize) -> &str;

    /// Looks up an attribute value by namespace and local name.
    fn attribute_value_by_name(&self, ns: &str, local: &str) -> Option<&str> {
        (0..self.attribute_count())
            .find(|&index| {
                let name = self.attribute_name(index);
                name.ns() == ns && name.local_name() == local
            })
            .map(|index| self.attribute_value(index))
    }

    /// Returns the number of namespace declarations on the current start
    /// element.
    fn namespace_count(&self) -> usize;

    /// Returns the prefix of the declaration at `index`; `""` for a
    /// default namespace declaration.
    fn namespace_prefix(&self, index: usize) -> Atom;

    /// Returns the URI of the declaration at `index`.
    fn namespace_uri(&self, index: usize) -> Atom;

    /// Returns a boolean reader property, if the reader knows it.
    fn property(&self, _name: &str) -> Option<bool> {
        None
    }

    /// Turns the reader into an iterator of owned events.
    fn into_events(self) -> Events<Self>
    where
        Self: Sized,
    {
        Events {
            reader: self,
            finished: false,
        }
    }
}

/// A push style XML event sink.
///
/// A start tag can be followed by namespace declarations and attributes
/// until the next start, end, characters or comment call.
pub trait XmlStreamWriter: NamespaceContext {
    /// Opens an element.  An empty `uri` means no namespace; an empty
    /// `prefix` with a non-empty `uri` puts the element in the default
    /// namespace.
    fn write_start_element(&mut self, prefix: &str, local: &str, uri: &str) -> Result<(), Error>;

    /// Closes the innermost open element.
    fn write_end_element(&mut self) -> Result<(), Error>;

    /// Writes character data.
    fn write_characters(&mut self, text: &str) -> Result<(), Error>;

    /// Writes a comment.
    fn write_comment(&mut self, text: &str) -> Result<(), Error>;

    /// Declares `prefix` for `uri` on the pending start tag.
    fn write_namespace(&mut self, prefix: &str, uri: &str) -> Result<(), Error>;

    /// Declares the default namespace on the pending start tag.
    fn write_default_namespace(&mut self, uri: &str) -> Result<(), Error>;

    /// Binds the default namespace for the current scope without writing
    /// a declaration.
    fn set_default_namespace(&mut self, uri: &str) -> Result<(), Error>;

    /// Adds an attribute to the pending start tag.
    fn write_attribute(
        &mut self,
        prefix: &str,
        uri: &str,
        local: &str,
        value: &str,
    ) -> Result<(), Error>;

    /// Adds an unqualified attribute to the pending start tag.
    fn write_local_attribute(&mut self, local: &str, value: &str) -> Result<(), Error> {
        self.write_attribute("", "", local, value)
    }

    /// Writes out anything pending and flushes the sink.
    fn flush(&mut self) -> Result<(), Error>;
}

macro_rules! forward_reader {
    ($ty:ty) => {
        fn next_event(&mut self) -> Result<EventKind, Error> {
            (**self).next_event()
        }
        fn has_next(&self) -> bool {
            (**self).has_next()
        }
        fn event_kind(&self) -> EventKind {
            (**self).event_kind()
        }
        fn name(&self) -> QName {
            (**self).name()
        }
        fn text(&self) -> &str {
            (**self).text()
        }
        fn attribute_count(&self) -> usize {
            (**self).attribute_count()
        }
        fn attribute_name(&self, index: usize) -> QName {
            (**self).attribute_name(index)
        }
        fn attribute_value(&self, index: usize) -> &str {
            (**self).attribute_value(index)
        }
        fn attribute_value_by_name(&self, ns: &str, local: &str) -> Option<&str> {
            (**self).attribute_value_by_name(ns, local)
        }
        fn namespace_count(&self) -> usize {
            (**self).namespace_count()
        }
        fn namespace_prefix(&self, index: usize) -> Atom {
            (**self).namespace_prefix(index)
        }
        fn namespace_uri(&self, index: usize) -> Atom {
            (**self).namespace_uri(index)
        }
        fn property(&self, name: &str) -> Option<bool> {
            (**self).property(name)
        }
    };
}

macro_rules! forward_writer {
    ($ty:ty) => {
        fn write_start_element(&mut self, prefix: &str, local: &str, uri: &str) -> Result<(), Error> {
            (**self).write_start_element(prefix, local, uri)
        }
        fn write_end_element(&mut self) -> Result<(), Error> {
            (**self).write_end_element()
        }
        fn write_characters(&mut self, text: &str) -> Result<(), Error> {
            (**self).write_characters(text)
        }
        fn write_comment(&mut self, text: &str) -> Result<(), Error> {
            (**self).write_comment(text)
        }
        fn write_namespace(&mut self, prefix: &str, uri: &str) -> Result<(), Error> {
            (**self).write_namespace(prefix, uri)
        }
        fn write_default_namespace(&mut self, uri: &str) -> Result<(), Error> {
            (**self).write_default_namespace(uri)
        }
        fn set_default_namespace(&mut self, uri: &str) -> Result<(), Error> {
            (**self).set_default_namespace(uri)
        }
        fn write_attribute(
            &mut self,
            prefix: &str,
            uri: &str,
            local: &str,
            value: &str,
        ) -> Result<(), Error> {
            (**self).write_attribute(prefix, uri, local, value)
        }
        fn flush(&mut self) -> Result<(), Error> {
            (**self).flush()
        }
    };
}

impl<R: XmlStreamReader + ?Sized> XmlStreamReader for Box<R> {
    forward_reader!(Box<R>);
}

impl<'a, R: XmlStreamReader + ?Sized> XmlStreamReader for &'a mut R {
    forward_reader!(&'a mut R);
}

impl<W: XmlStreamWriter + ?Sized> XmlStreamWriter for Box<W> {
    forward_writer!(Box<W>);
}

impl<'a, W: XmlStreamWriter + ?Sized> XmlStreamWriter for &'a mut W {
    forward_writer!(&'a mut W);
}

/// Takes an owned snapshot of the event `reader` is positioned on.
pub fn snapshot<R: XmlStreamReader + ?Sized>(reader: &R, kind: EventKind) -> XmlEvent {
    match kind {
        EventKind::StartDocument => XmlEvent::StartDocument,
        EventKind::EndDocument => XmlEvent::EndDocument,
        EventKind::StartElement => XmlEvent::StartElement {
            name: reader.name(),
            attributes: (0..reader.attribute_count())
                .map(|index| {
                    (
                        reader.attribute_name(index),
                        reader.attribute_value(index).to_string(),
                    )
                })
                .collect(),
            namespaces: (0..reader.namespace_count())
                .map(|index| (reader.namespace_prefix(index), reader.namespace_uri(index)))
                .collect(),
        },
        EventKind::EndElement => XmlEvent::EndElement {
            name: reader.name(),
        },
        EventKind::Characters => XmlEvent::Characters(reader.text().to_string()),
        EventKind::Comment => XmlEvent::Comment(reader.text().to_string()),
    }
}

/// An iterator over owned snapshots of a reader's events.
///
/// When the next event is `EndDocument` or an error, it is returned once
/// and then the iterator stops producing events.
pub struct Events<R> {
    reader: R,
    finished: bool,
}

impl<R: XmlStreamReader> Events<R> {
    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: XmlStreamReader> Iterator for Events<R> {
    type Item = Result<XmlEvent, Error>;

    fn next(&mut self) -> Option<Result<XmlEvent, Error>> {
        if self.finished {
            return None;
        }
        let ev = self
            .reader
            .next_event()
            .map(|kind| snapshot(&self.reader, kind));
        match ev {
            Ok(XmlEvent::EndDocument) | Err(_) => self.finished = true,
            _ => {}
        }
        Some(ev)
    }
}

/// Pulls every remaining event from `reader` and pushes it into `writer`.
///
/// Start tags are written together with their namespace declarations and
/// attributes.  The writer is flushed at the end.
pub fn copy<R, W>(reader: &mut R, writer: &mut W) -> Result<(), Error>
where
    R: XmlStreamReader + ?Sized,
    W: XmlStreamWriter + ?Sized,
{
    while reader.has_next() {
        match reader.next_event()? {
            EventKind::StartElement => copy_start_element(reader, writer)?,
            EventKind::EndElement => writer.write_end_element()?,
            EventKind::Characters => writer.write_characters(reader.text())?,
            EventKind::Comment => writer.write_comment(reader.text())?,
            EventKind::StartDocument => {}
            EventKind::EndDocument => break,
        }
    }
    writer.flush()
}

fn copy_start_element<R, W>(reader: &R, writer: &mut W) -> Result<(), Error>
where
    R: XmlStreamReader + ?Sized,
    W: XmlStreamWriter + ?Sized,
{
    let name = reader.name();
    writer.write_start_element(name.prefix(), name.local_name(), name.ns())?;
    for index in 0..reader.namespace_count() {
        let prefix = reader.namespace_prefix(index);
        let uri = reader.namespace_uri(index);
        if prefix.is_empty() {
            writer.write_default_namespace(&uri)?;
        } else {
            writer.write_namespace(&prefix, &uri)?;
        }
    }
    for index in 0..reader.attribute_count() {
        let name = reader.attribute_name(index);
        writer.write_attribute(
            name.prefix(),
            name.ns(),
            name.local_name(),
            reader.attribute_value(index),
        )?;
    }
    Ok(())
}

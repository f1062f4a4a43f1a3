//! Event types shared by readers, writers and the transform layers.
use std::collections::VecDeque;
use std::fmt;

use string_cache::DefaultAtom as Atom;

use crate::name::QName;

/// The kind of event a reader is positioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    StartDocument,
    EndDocument,
    StartElement,
    EndElement,
    Characters,
    Comment,
}

/// A synthetic event spliced into a stream by the transform layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsingEvent {
    StartElement(QName),
    EndElement(QName),
    Characters(String),
}

impl ParsingEvent {
    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match *self {
            ParsingEvent::StartElement(..) => EventKind::StartElement,
            ParsingEvent::EndElement(..) => EventKind::EndElement,
            ParsingEvent::Characters(..) => EventKind::Characters,
        }
    }

    /// Returns the element name of a start or end event.
    pub fn name(&self) -> Option<&QName> {
        match *self {
            ParsingEvent::StartElement(ref name) | ParsingEvent::EndElement(ref name) => Some(name),
            ParsingEvent::Characters(..) => None,
        }
    }
}

/// What has to happen when the element that opened a frame is closed.
///
/// One frame is pushed per real start element that is not deep-dropped
/// and popped by the matching end element, so synthetic content always
/// nests correctly around the real events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Closing {
    /// The start tag was swallowed by a shallow drop; swallow the end too.
    Unwrap,
    /// Pass the real end through.
    Plain,
    /// Replace the real end by this sequence.
    Replay(VecDeque<ParsingEvent>),
}

impl Closing {
    /// Plain if the element kept its name, else a renamed end tag.
    pub fn for_element(original: &QName, expected: &QName) -> Closing {
        if original == expected {
            Closing::Plain
        } else {
            Closing::replay(vec![ParsingEvent::EndElement(expected.clone())])
        }
    }

    pub fn replay(events: Vec<ParsingEvent>) -> Closing {
        Closing::Replay(events.into())
    }
}

/// An owned snapshot of one reader event.
///
/// Produced by [`Events`](crate::Events); mostly useful to inspect or
/// compare whole streams.
#[derive(PartialEq, Eq, Clone)]
pub enum XmlEvent {
    /// The beginning of the document.
    StartDocument,
    /// The end of the document.
    EndDocument,
    /// A start tag.
    StartElement {
        /// Qualified name of the element, with the prefix it is reported
        /// with.
        name: QName,
        /// Attributes in document order.
        attributes: Vec<(QName, String)>,
        /// `(prefix, uri)` namespace declarations made on this element.
        namespaces: Vec<(Atom, Atom)>,
    },
    /// An end tag.
    EndElement {
        name: QName,
    },
    /// Character data, including whitespace and CDATA content.
    Characters(String),
    /// A comment.
    Comment(String),
}

impl fmt::Debug for XmlEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            XmlEvent::StartDocument => write!(f, "StartDocument"),
            XmlEvent::EndDocument => write!(f, "EndDocument"),
            XmlEvent::StartElement {
                ref name,
                ref attributes,
                ref namespaces,
            } => {
                write!(f, "StartElement({}", name)?;
                if !namespaces.is_empty() {
                    let namespaces: Vec<String> = namespaces
                        .iter()
                        .map(|&(ref prefix, ref uri)| format!("{}={}", prefix, uri))
                        .collect();
                    write!(f, ", xmlns[{}]", namespaces.join(", "))?;
                }
                if !attributes.is_empty() {
                    let attributes: Vec<String> = attributes
                        .iter()
                        .map(|&(ref name, ref value)| format!("{} -> {}", name, value))
                        .collect();
                    write!(f, ", [{}]", attributes.join(", "))?;
                }
                write!(f, ")")
            }
            XmlEvent::EndElement { ref name } => write!(f, "EndElement({})", name),
            XmlEvent::Characters(ref data) => write!(f, "Characters({})", data),
            XmlEvent::Comment(ref data) => write!(f, "Comment({})", data),
        }
    }
}

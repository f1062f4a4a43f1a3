//! A streaming rewrite layer for XML readers and writers.
//!
//! The crate wraps a forward-only pull reader or a push writer and rewrites
//! the document while it streams through: elements and attributes can be
//! renamed or moved between namespaces, elements can be unwrapped or
//! dropped with their whole subtree, and synthetic elements can be spliced
//! in around or inside an element.  Callers keep talking to a normal
//! reader or writer and never see the original names.
//!
//! ## Installation
//!
//! ```ini
//! [dependencies]
//! xmltransform = "0"
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use xmltransform::{copy, TransformConfig, TransformReader, XmlReader, XmlWriter};
//!
//! let config = TransformConfig::new()
//!     .rename_element("{urn:old}*", "{urn:new}*")
//!     .rename_attribute("secret", "")
//!     .drop_element("{urn:old}wrapper");
//!
//! let source = r#"<a xmlns="urn:old" secret="1"><wrapper><b/></wrapper></a>"#;
//! let mut reader = TransformReader::new(XmlReader::new(source.as_bytes()), &config);
//! let mut writer = XmlWriter::new(Vec::new());
//! copy(&mut reader, &mut writer).unwrap();
//!
//! let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
//! assert_eq!(out, r#"<a xmlns="urn:new"><b/></a>"#);
//! ```
//!
//! ## Design Notes
//!
//! The rules come from a [`TransformConfig`] that uses plain strings in the
//! `{namespace}local` notation.  They are converted once into typed tables
//! when a [`TransformReader`] or [`TransformWriter`] is created.  The
//! `create_*_if_needed` helpers skip the transform layer entirely when no
//! rule is configured.
//!
//! Both transform layers keep a stack with one entry per open element that
//! says what has to happen when that element closes.  Synthetic content is
//! therefore always nested correctly no matter how rules are combined.
//!
//! Append rules fire only for the first matching element.  A transform
//! reader or writer can thus only be used for a single document.
//!
//! Parsing and serialization are done by `xml-rs` through [`XmlReader`]
//! and [`XmlWriter`], but any type implementing [`XmlStreamReader`] or
//! [`XmlStreamWriter`] can be wrapped.
use std::fmt;
use std::io;

#[macro_use]
mod macros;

mod append;
mod backend;
mod config;
mod events;
mod factory;
mod name;
mod namespace;
mod reader;
mod rename;
mod stream;
mod writer;

pub use crate::append::{AppendMode, AppendRule};
pub use crate::backend::{XmlReader, XmlWriter};
pub use crate::config::{TransformConfig, TransformRules};
pub use crate::events::{EventKind, ParsingEvent, XmlEvent};
pub use crate::factory::{
    create_reader_if_needed, create_transform_reader_if_needed, create_transform_writer_if_needed,
    create_writer_if_needed,
};
pub use crate::name::{QName, WILDCARD};
pub use crate::namespace::{NamespaceContext, NamespaceOverlay, SYNTHETIC_PREFIX};
pub use crate::reader::{TransformReader, INTERN_NAMES, INTERN_NS_URIS};
pub use crate::rename::RenameTable;
pub use crate::stream::{copy, snapshot, Events, XmlStreamReader, XmlStreamWriter};
pub use crate::writer::TransformWriter;

/// Errors that can occur while reading or writing
#[derive(Debug)]
pub enum Error {
    /// The XML is invalid
    MalformedXml(xml::reader::Error),
    /// An IO Error
    Io(io::Error),
    /// The serializer refused an event
    Emitter(xml::writer::Error),
    /// The stream cannot accept this call here, for example an end tag
    /// with no open element or a namespace declaration outside of a
    /// start tag.
    UnexpectedEvent,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::MalformedXml(ref e) => write!(f, "Malformed XML. {}", e),
            Error::Io(ref e) => write!(f, "{}", e),
            Error::Emitter(ref e) => write!(f, "Cannot write XML. {}", e),
            Error::UnexpectedEvent => write!(f, "Unexpected XML event"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::MalformedXml(ref e) => Some(e),
            Error::Io(ref e) => Some(e),
            Error::Emitter(ref e) => Some(e),
            Error::UnexpectedEvent => None,
        }
    }
}

impl From<xml::reader::Error> for Error {
    fn from(err: xml::reader::Error) -> Error {
        Error::MalformedXml(err)
    }
}

impl From<xml::writer::Error> for Error {
    fn from(err: xml::writer::Error) -> Error {
        match err {
            xml::writer::Error::Io(err) => Error::Io(err),
            err => Error::Emitter(err),
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

//! Helpers that only wrap streams when there is something to rewrite.
use std::io::{Read, Write};

use log::debug;

use crate::backend::{XmlReader, XmlWriter};
use crate::config::TransformConfig;
use crate::reader::TransformReader;
use crate::stream::{XmlStreamReader, XmlStreamWriter};
use crate::writer::TransformWriter;

/// Wraps `reader` in a [`TransformReader`] if the configuration has any
/// reading rule, otherwise hands it back unchanged.
pub fn create_transform_reader_if_needed<'a, R>(
    reader: R,
    config: &TransformConfig,
) -> Box<dyn XmlStreamReader + 'a>
where
    R: XmlStreamReader + 'a,
{
    if config.needs_reader_transform() {
        debug!("wrapping reader in a transform reader");
        Box::new(TransformReader::new(reader, config))
    } else {
        debug!("no reading rules, passing reader through");
        Box::new(reader)
    }
}

/// Like [`create_transform_reader_if_needed`] but parses `source` when no
/// reader is supplied.
pub fn create_reader_if_needed<'a, S>(
    reader: Option<Box<dyn XmlStreamReader + 'a>>,
    source: S,
    config: &TransformConfig,
) -> Box<dyn XmlStreamReader + 'a>
where
    S: Read + 'a,
{
    match reader {
        Some(reader) => create_transform_reader_if_needed(reader, config),
        None => create_transform_reader_if_needed(XmlReader::new(source), config),
    }
}

/// Wraps `writer` in a [`TransformWriter`] if the configuration has any
/// writing rule, otherwise hands it back unchanged.
pub fn create_transform_writer_if_needed<'a, W>(
    writer: W,
    config: &TransformConfig,
) -> Box<dyn XmlStreamWriter + 'a>
where
    W: XmlStreamWriter + 'a,
{
    if config.needs_writer_transform() {
        debug!("wrapping writer in a transform writer");
        Box::new(TransformWriter::new(writer, config))
    } else {
        debug!("no writing rules, passing writer through");
        Box::new(writer)
    }
}

/// Like [`create_transform_writer_if_needed`] but serializes into `sink`
/// when no writer is supplied.
pub fn create_writer_if_needed<'a, S>(
    writer: Option<Box<dyn XmlStreamWriter + 'a>>,
    sink: S,
    config: &TransformConfig,
) -> Box<dyn XmlStreamWriter + 'a>
where
    S: Write + 'a,
{
    match writer {
        Some(writer) => create_transform_writer_if_needed(writer, config),
        None => create_transform_writer_if_needed(XmlWriter::new(sink), config),
    }
}

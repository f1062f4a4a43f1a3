use std::io;

use pretty_assertions::assert_eq;
use string_cache::DefaultAtom as Atom;

use xmltransform::{
    copy, create_writer_if_needed, Error, NamespaceContext, TransformConfig, TransformReader,
    TransformWriter, XmlReader, XmlStreamWriter, XmlWriter,
};

fn write_with<F>(config: &TransformConfig, f: F) -> String
where
    F: FnOnce(&mut dyn XmlStreamWriter) -> Result<(), Error>,
{
    let mut writer = TransformWriter::new(XmlWriter::new(Vec::new()), config);
    f(&mut writer).unwrap();
    writer.flush().unwrap();
    String::from_utf8(writer.into_inner().into_inner().unwrap()).unwrap()
}

#[test]
fn test_rename() {
    let config = TransformConfig::new().rename_element("foo", "bar");
    let out = write_with(&config, |w| {
        w.write_start_element("", "foo", "")?;
        w.write_characters("x")?;
        w.write_end_element()
    });
    assert_eq!(out, "<bar>x</bar>");
}

#[test]
fn test_replace_namespace() {
    let config = TransformConfig::new().rename_element("{http://foo}*", "{http://bar}*");
    let out = write_with(&config, |w| {
        w.write_start_element("ns", "test", "http://foo")?;
        w.write_namespace("ns", "http://foo")?;
        w.write_start_element("ns", "a", "http://foo")?;
        w.write_characters("1 2 3")?;
        w.write_end_element()?;
        w.write_end_element()
    });
    assert_eq!(
        out,
        r#"<ns:test xmlns:ns="http://bar"><ns:a>1 2 3</ns:a></ns:test>"#
    );
}

#[test]
fn test_default_namespace() {
    let config = TransformConfig::new()
        .rename_element("{http://testbeans.com}*", "{http://testbeans.com/v2}*")
        .default_namespace("http://testbeans.com/v2");
    let out = write_with(&config, |w| {
        w.write_start_element("", "testBean", "http://testbeans.com")?;
        w.write_default_namespace("http://testbeans.com")?;
        w.write_start_element("", "bean", "http://testbeans.com")?;
        w.write_end_element()?;
        w.write_end_element()
    });
    assert_eq!(
        out,
        r#"<testBean xmlns="http://testbeans.com/v2"><bean/></testBean>"#
    );
}

#[test]
fn test_attributes_to_elements() {
    let config = TransformConfig::new().attributes_to_elements(true);
    let out = write_with(&config, |w| {
        w.write_start_element("", "a", "")?;
        w.write_local_attribute("id", "5")?;
        w.write_end_element()
    });
    assert_eq!(out, "<a><id>5</id></a>");
}

#[test]
fn test_attribute_drop() {
    let config = TransformConfig::new().rename_attribute("secret", "");
    let out = write_with(&config, |w| {
        w.write_start_element("", "a", "")?;
        w.write_local_attribute("secret", "1")?;
        w.write_local_attribute("id", "2")?;
        w.write_end_element()
    });
    assert_eq!(out, r#"<a id="2"/>"#);
}

#[test]
fn test_deep_drop() {
    let config = TransformConfig::new().rename_element("secret", "");
    let out = write_with(&config, |w| {
        w.write_start_element("", "a", "")?;
        w.write_start_element("", "secret", "")?;
        w.write_characters("x")?;
        w.write_start_element("", "inner", "")?;
        w.write_comment("c")?;
        w.write_end_element()?;
        w.write_end_element()?;
        w.write_start_element("", "b", "")?;
        w.write_end_element()?;
        w.write_end_element()
    });
    assert_eq!(out, "<a><b/></a>");
}

#[test]
fn test_shallow_drop() {
    let config = TransformConfig::new().drop_element("w");
    let out = write_with(&config, |w| {
        w.write_start_element("", "a", "")?;
        w.write_start_element("", "w", "")?;
        w.write_local_attribute("x", "1")?;
        w.write_start_element("", "b", "")?;
        w.write_end_element()?;
        w.write_end_element()?;
        w.write_end_element()
    });
    assert_eq!(out, "<a><b/></a>");
}

#[test]
fn test_pre_wrap() {
    let config = TransformConfig::new().append_element("b", "wrap");
    let out = write_with(&config, |w| {
        w.write_start_element("", "a", "")?;
        w.write_start_element("", "b", "")?;
        w.write_end_element()?;
        w.write_start_element("", "b", "")?;
        w.write_end_element()?;
        w.write_end_element()
    });
    assert_eq!(out, "<a><wrap><b/></wrap><b/></a>");
}

#[test]
fn test_pre_include() {
    let config = TransformConfig::new().append_element("b", "n=hi");
    let out = write_with(&config, |w| {
        w.write_start_element("", "a", "")?;
        w.write_start_element("", "b", "")?;
        w.write_end_element()?;
        w.write_end_element()
    });
    assert_eq!(out, "<a><n>hi</n><b/></a>");
}

#[test]
fn test_post_wrap_keeps_attributes_on_the_element() {
    let config = TransformConfig::new().append_element("a/", "inner");
    let out = write_with(&config, |w| {
        w.write_start_element("", "a", "")?;
        w.write_local_attribute("x", "1")?;
        w.write_characters("t")?;
        w.write_end_element()
    });
    assert_eq!(out, r#"<a x="1"><inner>t</inner></a>"#);
}

#[test]
fn test_post_include() {
    let config = TransformConfig::new().append_element("a/", "n=hi");
    let out = write_with(&config, |w| {
        w.write_start_element("", "a", "")?;
        w.write_start_element("", "b", "")?;
        w.write_end_element()?;
        w.write_end_element()
    });
    assert_eq!(out, "<a><b/><n>hi</n></a>");
}

#[test]
fn test_replace_content() {
    let config = TransformConfig::new().append_element("a", "a=new");
    let out = write_with(&config, |w| {
        w.write_start_element("", "a", "")?;
        w.write_characters("old")?;
        w.write_end_element()
    });
    assert_eq!(out, "<a>new</a>");
}

#[test]
fn test_prefix_synthesis() {
    let config = TransformConfig::new().rename_element("foo", "{http://x}foo");
    let out = write_with(&config, |w| {
        w.write_start_element("", "foo", "")?;
        w.write_end_element()
    });
    assert_eq!(out, r#"<ps1:foo xmlns:ps1="http://x"/>"#);
}

#[test]
fn test_unbalanced_end_element() {
    let mut writer = TransformWriter::new(XmlWriter::new(Vec::new()), &TransformConfig::new());
    assert!(matches!(
        writer.write_end_element(),
        Err(Error::UnexpectedEvent)
    ));
}

#[test]
fn test_depth_after_drops() {
    let config = TransformConfig::new()
        .drop_element("w")
        .rename_element("x", "");
    let mut writer = TransformWriter::new(XmlWriter::new(Vec::new()), &config);
    for name in &["a", "w", "x", "y"] {
        writer.write_start_element("", name, "").unwrap();
    }
    assert_eq!(writer.depth(), 4);
    for _ in 0..4 {
        writer.write_end_element().unwrap();
    }
    assert_eq!(writer.depth(), 0);
    assert!(matches!(
        writer.write_end_element(),
        Err(Error::UnexpectedEvent)
    ));
    writer.flush().unwrap();
    let out = String::from_utf8(writer.into_inner().into_inner().unwrap()).unwrap();
    assert_eq!(out, "<a/>");
}

/// Refuses every start tag.
struct Refusing;

impl NamespaceContext for Refusing {
    fn lookup_namespace(&self, _prefix: &str) -> Option<Atom> {
        None
    }

    fn lookup_prefix(&self, _uri: &str) -> Option<Atom> {
        None
    }
}

impl XmlStreamWriter for Refusing {
    fn write_start_element(&mut self, _: &str, _: &str, _: &str) -> Result<(), Error> {
        Err(io::Error::new(io::ErrorKind::Other, "refused").into())
    }

    fn write_end_element(&mut self) -> Result<(), Error> {
        Ok(())
    }

    fn write_characters(&mut self, _: &str) -> Result<(), Error> {
        Ok(())
    }

    fn write_comment(&mut self, _: &str) -> Result<(), Error> {
        Ok(())
    }

    fn write_namespace(&mut self, _: &str, _: &str) -> Result<(), Error> {
        Ok(())
    }

    fn write_default_namespace(&mut self, _: &str) -> Result<(), Error> {
        Ok(())
    }

    fn set_default_namespace(&mut self, _: &str) -> Result<(), Error> {
        Ok(())
    }

    fn write_attribute(&mut self, _: &str, _: &str, _: &str, _: &str) -> Result<(), Error> {
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Error> {
        Ok(())
    }
}

#[test]
fn test_end_without_frame_leaves_state_alone() {
    let mut writer = TransformWriter::new(Refusing, &TransformConfig::new());
    assert!(matches!(
        writer.write_start_element("", "a", ""),
        Err(Error::Io(..))
    ));
    assert_eq!(writer.depth(), 1);
    assert!(matches!(
        writer.write_end_element(),
        Err(Error::UnexpectedEvent)
    ));
    assert_eq!(writer.depth(), 1);
}

#[test]
fn test_passthrough_is_identity() {
    let xml = r#"<a xmlns:p="urn:p"><p:b p:x="1">text</p:b><!--c--></a>"#;
    let mut reader = XmlReader::new(xml.as_bytes());
    let mut writer = TransformWriter::new(XmlWriter::new(Vec::new()), &TransformConfig::new());
    copy(&mut reader, &mut writer).unwrap();
    let out = String::from_utf8(writer.into_inner().into_inner().unwrap()).unwrap();
    assert_eq!(out, xml);
}

#[test]
fn test_writer_then_reader_round_trip() {
    let outbound = TransformConfig::new().rename_element("foo", "{urn:n}bar");
    let written = write_with(&outbound, |w| {
        w.write_start_element("", "foo", "")?;
        w.write_start_element("", "foo", "")?;
        w.write_end_element()?;
        w.write_end_element()
    });
    assert_eq!(written, r#"<ps1:bar xmlns:ps1="urn:n"><ps1:bar/></ps1:bar>"#);

    let inbound = TransformConfig::new().rename_element("{urn:n}bar", "foo");
    let mut reader = TransformReader::new(XmlReader::new(written.as_bytes()), &inbound);
    let mut writer = XmlWriter::new(Vec::new());
    copy(&mut reader, &mut writer).unwrap();
    let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    assert_eq!(out, r#"<foo xmlns:ps1="urn:n"><foo/></foo>"#);
}

#[test]
fn test_reader_into_writer_round_trip() {
    let xml = r#"<p:a xmlns:p="urn:a"><p:b>1</p:b></p:a>"#;
    let inbound = TransformConfig::new().rename_element("{urn:a}*", "{urn:b}*");
    let outbound = TransformConfig::new().rename_element("{urn:b}*", "{urn:a}*");

    let mut reader = TransformReader::new(XmlReader::new(xml.as_bytes()), &inbound);
    let mut writer = TransformWriter::new(XmlWriter::new(Vec::new()), &outbound);
    copy(&mut reader, &mut writer).unwrap();
    let out = String::from_utf8(writer.into_inner().into_inner().unwrap()).unwrap();
    assert_eq!(out, xml);
}

#[test]
fn test_factory() {
    let config = TransformConfig::new().rename_element("foo", "bar");
    let mut out = Vec::new();
    {
        let mut writer = create_writer_if_needed(None, &mut out, &config);
        writer.write_start_element("", "foo", "").unwrap();
        writer.write_end_element().unwrap();
        writer.flush().unwrap();
    }
    assert_eq!(String::from_utf8(out).unwrap(), "<bar/>");

    let mut out = Vec::new();
    {
        let mut writer = create_writer_if_needed(None, &mut out, &TransformConfig::new());
        writer.write_start_element("", "foo", "").unwrap();
        writer.write_end_element().unwrap();
        writer.flush().unwrap();
    }
    assert_eq!(String::from_utf8(out).unwrap(), "<foo/>");
}

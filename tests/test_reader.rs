use once_cell::sync::Lazy;
use pretty_assertions::assert_eq;

use xmltransform::{
    copy, create_reader_if_needed, Error, EventKind, NamespaceContext, QName, TransformConfig,
    TransformReader, XmlEvent, XmlReader, XmlStreamReader, XmlWriter, INTERN_NAMES,
    INTERN_NS_URIS,
};

static ENVELOPE: Lazy<TransformConfig> = Lazy::new(|| {
    TransformConfig::new()
        .rename_element("{urn:old}*", "{urn:new}*")
        .rename_attribute("secret", "")
        .drop_element("{urn:old}wrapper")
});

fn reader<'a>(xml: &'a str, config: &TransformConfig) -> TransformReader<XmlReader<&'a [u8]>> {
    TransformReader::new(XmlReader::new(xml.as_bytes()), config)
}

fn transform(xml: &str, config: &TransformConfig) -> String {
    let mut reader = reader(xml, config);
    let mut writer = XmlWriter::new(Vec::new());
    copy(&mut reader, &mut writer).unwrap();
    String::from_utf8(writer.into_inner().unwrap()).unwrap()
}

/// Advances to the next start element.
fn next_start<R: XmlStreamReader + ?Sized>(reader: &mut R) {
    while reader.next_event().unwrap() != EventKind::StartElement {}
}

#[test]
fn test_rename_events() {
    let config = TransformConfig::new().rename_element("foo", "bar");
    let events: Vec<XmlEvent> = reader(r#"<foo xmlns:p="urn:p" p:x="1"/>"#, &config)
        .into_events()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        events,
        vec![
            XmlEvent::StartDocument,
            XmlEvent::StartElement {
                name: QName::from("bar"),
                attributes: vec![(QName::new("urn:p", "x"), "1".into())],
                namespaces: vec![("p".into(), "urn:p".into())],
            },
            XmlEvent::EndElement {
                name: QName::from("bar"),
            },
            XmlEvent::EndDocument,
        ]
    );
}

#[test]
fn test_passthrough_is_identity() {
    let xml = r#"<a xmlns="urn:a" xmlns:p="urn:p"><p:b p:x="1">text</p:b><!--c--></a>"#;
    assert_eq!(transform(xml, &TransformConfig::new()), xml);
}

#[test]
fn test_rename_nested() {
    let config = TransformConfig::new().rename_element("foo", "bar");
    assert_eq!(transform("<foo><x/></foo>", &config), "<bar><x/></bar>");
}

#[test]
fn test_envelope() {
    assert_eq!(
        transform(
            r#"<a xmlns="urn:old" secret="1"><wrapper><b/></wrapper></a>"#,
            &ENVELOPE
        ),
        r#"<a xmlns="urn:new"><b/></a>"#
    );
}

#[test]
fn test_envelope_prefixed() {
    let xml = r#"<p:a xmlns:p="urn:old"><p:wrapper>x</p:wrapper><p:b/></p:a>"#;
    let mut reader = reader(xml, &ENVELOPE);
    next_start(&mut reader);
    assert_eq!(reader.name(), QName::new("urn:new", "a"));
    assert_eq!(reader.name().prefix(), "p");
    assert_eq!(reader.lookup_namespace("p").as_deref(), Some("urn:new"));
    assert_eq!(&*reader.namespace_uri(0), "urn:new");
    drop(reader);
    assert_eq!(
        transform(xml, &ENVELOPE),
        r#"<p:a xmlns:p="urn:new">x<p:b/></p:a>"#
    );
}

#[test]
fn test_namespace_remapped_to_none() {
    let config = TransformConfig::new().rename_element("{urn:old}*", "*");
    assert_eq!(
        transform(r#"<a xmlns="urn:old"><b/></a>"#, &config),
        "<a><b/></a>"
    );
}

#[test]
fn test_deep_drop() {
    let config = TransformConfig::new().rename_element("secret", "");
    let mut reader = reader("<a><secret><x>1</x></secret><b/></a>", &config);
    let mut writer = XmlWriter::new(Vec::new());
    copy(&mut reader, &mut writer).unwrap();
    assert_eq!(reader.depth(), 0);
    let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
    assert_eq!(out, "<a><b/></a>");
}

#[test]
fn test_malformed_inside_deep_drop() {
    let config = TransformConfig::new().rename_element("secret", "");
    let mut reader = reader("<a><secret><x></secret></a>", &config);
    let err = loop {
        if let Err(err) = reader.next_event() {
            break err;
        }
    };
    assert!(matches!(err, Error::MalformedXml(..)));
    assert_eq!(reader.depth(), 1);
}

#[test]
fn test_shallow_drop() {
    let config = TransformConfig::new().drop_element("w");
    assert_eq!(
        transform("<a><w><b>1</b></w>2</a>", &config),
        "<a><b>1</b>2</a>"
    );
}

#[test]
fn test_depth() {
    let config = TransformConfig::new().drop_element("w");
    let mut reader = reader("<a><w><b/></w></a>", &config);
    next_start(&mut reader);
    assert_eq!(reader.depth(), 1);
    next_start(&mut reader);
    assert_eq!(reader.name(), QName::from("b"));
    assert_eq!(reader.depth(), 3);
}

#[test]
fn test_pre_wrap_fires_once() {
    let config = TransformConfig::new().append_element("b", "wrap");
    assert_eq!(
        transform("<a><b/><b/></a>", &config),
        "<a><wrap><b/></wrap><b/></a>"
    );
}

#[test]
fn test_pre_include() {
    let config = TransformConfig::new().append_element("b", "note=hi");
    assert_eq!(
        transform(r#"<a><b id="1"/></a>"#, &config),
        r#"<a><note>hi</note><b id="1"/></a>"#
    );
}

#[test]
fn test_post_include() {
    let config = TransformConfig::new().append_element("a/", "note=hi");
    assert_eq!(
        transform("<a><b/></a>", &config),
        "<a><b/><note>hi</note></a>"
    );
}

#[test]
fn test_post_wrap() {
    let config = TransformConfig::new().append_element("a/", "inner");
    assert_eq!(
        transform(r#"<a x="1"><b/>t</a>"#, &config),
        r#"<a x="1"><inner><b/>t</inner></a>"#
    );
}

#[test]
fn test_replace_content() {
    let config = TransformConfig::new().append_element("a", "a=new");
    assert_eq!(
        transform("<r><a>old</a><a>keep</a></r>", &config),
        "<r><a>new</a><a>keep</a></r>"
    );
}

#[test]
fn test_renamed_and_appended() {
    let config = TransformConfig::new()
        .rename_element("a", "z")
        .append_element("a", "wrap");
    assert_eq!(
        transform("<r><a/></r>", &config),
        "<r><wrap><z/></wrap></r>"
    );
}

#[test]
fn test_attribute_drop() {
    let config = TransformConfig::new().rename_attribute("name", "");
    let mut reader = reader(r#"<a name="x" id="1"/>"#, &config);
    next_start(&mut reader);
    assert_eq!(reader.attribute_count(), 1);
    assert_eq!(reader.attribute_name(0), QName::from("id"));
    assert_eq!(reader.attribute_value(0), "1");
    assert_eq!(reader.attribute_value_by_name("", "name"), None);
    assert_eq!(reader.attribute_value_by_name("", "id"), Some("1"));
}

#[test]
#[should_panic(expected = "invalid index 1")]
fn test_attribute_index_out_of_range() {
    let config = TransformConfig::new().rename_attribute("name", "");
    let mut reader = reader(r#"<a name="x" id="1"/>"#, &config);
    next_start(&mut reader);
    reader.attribute_value(1);
}

#[test]
fn test_attribute_moved_into_namespace() {
    let config = TransformConfig::new().rename_attribute("id", "{urn:x}key");
    assert_eq!(
        transform(r#"<a xmlns:x="urn:x" id="1"/>"#, &config),
        r#"<a xmlns:x="urn:x" x:key="1"/>"#
    );
}

#[test]
fn test_prefix_synthesis() {
    let config = TransformConfig::new().rename_element("a", "{urn:n}a");
    let mut reader = reader("<a><b/></a>", &config);
    next_start(&mut reader);
    assert_eq!(reader.name().prefix(), "ps1");
    assert_eq!(reader.lookup_namespace("ps1").as_deref(), Some("urn:n"));
    drop(reader);
    assert_eq!(
        transform("<a><b/></a>", &config),
        r#"<ps1:a xmlns:ps1="urn:n"><b/></ps1:a>"#
    );
}

#[test]
fn test_intern_properties() {
    let reader = reader("<a/>", &ENVELOPE);
    assert_eq!(reader.property(INTERN_NAMES), Some(false));
    assert_eq!(reader.property(INTERN_NS_URIS), Some(false));
    assert_eq!(reader.property("something.else"), None);
}

#[test]
fn test_effective_reader() {
    let config = TransformConfig::new().rename_element("foo", "bar");
    let mut blocking = reader("<foo/>", &config);
    next_start(blocking.effective_reader());
    assert_eq!(blocking.effective_reader().name().local_name(), "bar");

    let config = config.block_original_reader(false);
    let mut open = reader("<foo/>", &config);
    next_start(open.effective_reader());
    assert_eq!(open.effective_reader().name().local_name(), "foo");
}

#[test]
fn test_factory_skips_empty_config() {
    let mut reader = create_reader_if_needed(None, "<foo/>".as_bytes(), &TransformConfig::new());
    next_start(&mut reader);
    assert_eq!(reader.property(INTERN_NAMES), None);

    let config = TransformConfig::new().rename_element("foo", "bar");
    let mut reader = create_reader_if_needed(None, "<foo/>".as_bytes(), &config);
    next_start(&mut reader);
    assert_eq!(reader.name(), QName::from("bar"));
}

#[test]
fn test_malformed_input() {
    let mut reader = reader("<a><b></a>", &ENVELOPE);
    let mut writer = XmlWriter::new(Vec::new());
    match copy(&mut reader, &mut writer) {
        Err(Error::MalformedXml(..)) => {}
        other => panic!("unexpected result: {:?}", other),
    }
}

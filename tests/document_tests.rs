//! Document splitting, depth limits, partial sizes and editing

use lazy_bson::{Array, Document, Element, Error, Tag, ValidateConfig, Value};

fn two_ints() -> Vec<u8> {
    vec![
        0x13, 0x00, 0x00, 0x00, // length
        0x10, b'a', 0x00, 0x01, 0x00, 0x00, 0x00, // "a": 1
        0x10, b'b', 0x00, 0x02, 0x00, 0x00, 0x00, // "b": 2
        0x00,
    ]
}

/// {"a": {"b": {"c": {}}}}
fn nested() -> Vec<u8> {
    vec![
        0x1D, 0x00, 0x00, 0x00, //
        0x03, b'a', 0x00, 0x15, 0x00, 0x00, 0x00, //
        0x03, b'b', 0x00, 0x0D, 0x00, 0x00, 0x00, //
        0x03, b'c', 0x00, 0x05, 0x00, 0x00, 0x00, 0x00, //
        0x00, 0x00, 0x00,
    ]
}

#[test]
fn test_read_and_lookup() {
    let doc = Document::read(two_ints()).unwrap();
    assert_eq!(doc.len(), 2);
    assert!(!doc.is_empty());
    assert_eq!(doc.validate().unwrap(), 19);

    assert_eq!(doc.get("a").unwrap().as_i32().unwrap(), 1);
    assert_eq!(doc.lookup("b").unwrap().key(), "b");
    assert!(doc.get("c").is_none());

    let keys: Vec<_> = doc.iter().map(Element::key).collect();
    assert_eq!(keys, ["a", "b"]);
}

#[test]
fn test_untouched_document_marshals_to_input() {
    let doc = Document::read(nested()).unwrap();
    assert_eq!(doc.marshal().unwrap(), nested());
}

#[test]
fn test_read_rejects_bad_framing() {
    let mut data = two_ints();
    data.truncate(12);
    assert!(matches!(
        Document::read(data).unwrap_err(),
        Error::InvalidLength { declared: 19, .. }
    ));

    let mut data = two_ints();
    data.push(0x00);
    assert!(matches!(
        Document::read(data).unwrap_err(),
        Error::InvalidLength { .. }
    ));

    let mut data = two_ints();
    data[4] = 0x42;
    assert!(matches!(
        Document::read(data).unwrap_err(),
        Error::InvalidTag(0x42)
    ));
}

#[test]
fn test_partial_size_on_invalid_boolean() {
    let data = vec![
        0x10, 0x00, 0x00, 0x00, // length
        0x10, b'x', 0x00, 0x01, 0x00, 0x00, 0x00, // "x": 1
        0x08, b'b', 0x00, 0x02, // "b": <bad boolean>
        0x00,
    ];
    let doc = Document::read(data.clone()).unwrap();

    let first = doc.validate().unwrap_err();
    assert!(matches!(first.error, Error::InvalidBoolean(2)));
    assert_eq!(first.progress, 14);

    let second = doc.validate().unwrap_err();
    assert_eq!(second.progress, first.progress);
    assert!(matches!(second.error, Error::InvalidBoolean(2)));

    // the same bytes nested one level down, validated without splitting
    let mut outer = vec![0x03, b'd', 0x00];
    outer.extend_from_slice(&data);
    let element = Element::read(outer).unwrap();
    let err = element.validate().unwrap_err();
    assert!(matches!(err.error, Error::InvalidBoolean(2)));
    assert_eq!(err.progress, 3 + 14);
}

#[test]
fn test_declared_length_must_match_children() {
    // embedded document claims 13 bytes but holds a 7-byte element
    let data = vec![
        0x03, b'd', 0x00, //
        0x0D, 0x00, 0x00, 0x00, //
        0x10, b'n', 0x00, 0x01, 0x00, 0x00, 0x00, //
        0x00, 0x00,
    ];
    let element = Element::read(data).unwrap();
    let err = element.validate().unwrap_err();
    assert!(matches!(
        err.error,
        Error::InvalidLength {
            declared: 13,
            actual: 12
        }
    ));
    assert_eq!(err.progress, 3 + 12);
}

#[test]
fn test_max_depth() {
    let doc = Document::read(nested()).unwrap();
    assert_eq!(doc.validate().unwrap(), 29);
    assert_eq!(
        doc.validate_with(&ValidateConfig { max_depth: 3 }).unwrap(),
        29
    );

    let err = doc
        .validate_with(&ValidateConfig { max_depth: 2 })
        .unwrap_err();
    assert!(matches!(err.error, Error::MaxDepthExceeded(2)));

    let err = doc
        .validate_with(&ValidateConfig { max_depth: 1 })
        .unwrap_err();
    assert!(matches!(err.error, Error::MaxDepthExceeded(1)));
    // outer prefix, "a" header, its prefix, "b" header
    assert_eq!(err.progress, 4 + 3 + 4 + 3);
}

#[test]
fn test_max_depth_through_materialized_documents() {
    let mut doc = Document::read(nested()).unwrap();
    let a = doc.lookup_mut("a").unwrap().value_mut().document_mut().unwrap();
    a.lookup_mut("b")
        .unwrap()
        .value_mut()
        .document_mut()
        .unwrap();

    assert_eq!(doc.validate().unwrap(), 29);
    let err = doc
        .validate_with(&ValidateConfig { max_depth: 1 })
        .unwrap_err();
    assert!(matches!(err.error, Error::MaxDepthExceeded(1)));
    assert_eq!(doc.marshal().unwrap(), nested());
}

#[test]
fn test_set_and_remove() {
    let mut doc = Document::read(two_ints()).unwrap();

    let replaced = doc.set("a", Value::string("one")).unwrap().unwrap();
    assert_eq!(replaced.value().as_i32().unwrap(), 1);
    assert!(doc.set("c", Value::boolean(true)).unwrap().is_none());

    let keys: Vec<_> = doc.iter().map(Element::key).collect();
    assert_eq!(keys, ["a", "b", "c"]);

    let removed = doc.remove("b").unwrap();
    assert_eq!(removed.value().as_i32().unwrap(), 2);
    assert!(doc.remove("b").is_none());

    let reread = Document::read(doc.marshal().unwrap()).unwrap();
    assert!(reread.equal(&doc));
    assert_eq!(reread.get("a").unwrap().as_str().unwrap(), "one");
    assert!(reread.get("c").unwrap().as_bool().unwrap());

    assert!(matches!(
        doc.set("a\0b", Value::null()).unwrap_err(),
        Error::InvalidKey
    ));
    assert!(matches!(
        doc.set("z", Value::default()).unwrap_err(),
        Error::UninitializedValue
    ));
}

#[test]
fn test_append_keeps_duplicates() {
    let mut doc = Document::new();
    doc.append(Element::from_key_and_value("k", &Value::int32(1)).unwrap())
        .append(Element::from_key_and_value("k", &Value::int32(2)).unwrap());
    assert_eq!(doc.len(), 2);
    assert_eq!(doc.get("k").unwrap().as_i32().unwrap(), 1);
    assert_eq!(doc.validate().unwrap(), 4 + 7 + 7 + 1);
}

#[test]
fn test_empty_document() {
    let doc = Document::new();
    assert!(doc.is_empty());
    assert_eq!(doc.marshal().unwrap(), [0x05, 0x00, 0x00, 0x00, 0x00]);
    assert!(Document::read(vec![0x05, 0x00, 0x00, 0x00, 0x00]).unwrap().is_empty());
}

#[test]
fn test_copy_is_independent() {
    let mut inner = Document::new();
    inner.set("x", Value::int32(1)).unwrap();
    let mut doc = Document::new();
    doc.set("d", Value::document(inner)).unwrap();

    let shallow = doc.clone();
    let deep = doc.copy();
    doc.lookup_mut("d")
        .unwrap()
        .value_mut()
        .document_mut()
        .unwrap()
        .set("y", Value::int32(2))
        .unwrap();

    assert_eq!(doc.get("d").unwrap().as_document().unwrap().len(), 2);
    assert_eq!(shallow.get("d").unwrap().as_document().unwrap().len(), 1);
    assert_eq!(deep.get("d").unwrap().as_document().unwrap().len(), 1);
    assert!(shallow.equal(&deep));
    assert!(!shallow.equal(&doc));
}

#[test]
fn test_normalize_headers() {
    let mut doc = Document::new();
    doc.set("n", Value::int32(1)).unwrap();
    doc.append(
        Element::read(vec![
            0x0F, b'c', 0x00, //
            0x40, 0x00, 0x00, 0x00, // wrong outer length
            0x02, 0x00, 0x00, 0x00, b'x', 0x00, //
            0x05, 0x00, 0x00, 0x00, 0x00,
        ])
        .unwrap(),
    );

    assert_eq!(doc.normalize_headers().unwrap(), 1);
    assert_eq!(doc.normalize_headers().unwrap(), 0);
    let (code, scope) = doc.get("c").unwrap().as_code_with_scope().unwrap();
    assert_eq!(code, "x");
    assert!(scope.is_empty());
}

#[test]
fn test_array_reads_and_edits() {
    let mut array = Array::new();
    array.push(Value::string("a")).unwrap().push(Value::int64(2)).unwrap();
    array.push(Value::null()).unwrap();
    assert_eq!(array.len(), 3);

    *array.get_mut(1).unwrap() = Value::int32(9);
    assert!(array.remove(7).is_none());
    assert_eq!(array.remove(0).unwrap().as_str().unwrap(), "a");

    let reread = Array::read(array.marshal().unwrap()).unwrap();
    let tags: Vec<_> = reread.iter().map(|v| v.tag().unwrap()).collect();
    assert_eq!(tags, [Tag::Int32, Tag::Null]);
    assert_eq!(reread.get(0).unwrap().as_i32().unwrap(), 9);

    let doc = Document::read(reread.marshal().unwrap()).unwrap();
    let keys: Vec<_> = doc.iter().map(Element::key).collect();
    assert_eq!(keys, ["0", "1"]);
}

#[test]
fn test_display() {
    let doc = Document::read(two_ints()).unwrap();
    assert_eq!(
        doc.to_string(),
        r#"bson.Document{bson.Element{[32-bit integer]"a": 1}, bson.Element{[32-bit integer]"b": 2}}"#
    );

    let array = Array::try_from_values([Value::boolean(true), Value::null()]).unwrap();
    assert_eq!(array.to_string(), "bson.Array[true, null]");
}

#[test]
fn test_array_from_values_rejects_uninitialized() {
    let err = Array::try_from_values([Value::int32(0), Value::default(), Value::int32(2)])
        .unwrap_err();
    assert!(matches!(err, Error::UninitializedValue));

    let array = Array::try_from_values([Value::int32(0), Value::int32(1)]).unwrap();
    assert_eq!(array.get(1).unwrap().as_i32().unwrap(), 1);
}

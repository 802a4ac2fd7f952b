//! Deeply nested raw input on a small thread stack

use lazy_bson::{DEFAULT_MAX_DEPTH, Document, Error};

/// {"d": {"d": ... {}}} with `levels` embedded documents below the root.
fn nested_raw(levels: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(8 * levels + 5);
    for level in 0..levels {
        let len = (8 * (levels - level) + 5) as i32;
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&[0x03, b'd', 0x00]);
    }
    data.extend_from_slice(&[0x05, 0x00, 0x00, 0x00, 0x00]);
    data.resize(data.len() + levels, 0x00);
    data
}

fn on_small_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    std::thread::Builder::new()
        .stack_size(2 << 20)
        .spawn(f)
        .unwrap()
        .join()
        .unwrap()
}

#[test]
fn test_nested_raw_layout() {
    let data = nested_raw(2);
    assert_eq!(data.len(), 21);
    let doc = Document::read(data).unwrap();
    assert_eq!(doc.validate().unwrap(), 21);
}

#[test]
fn test_default_depth_validates_on_small_stack() {
    let levels = DEFAULT_MAX_DEPTH as usize;
    let size = on_small_stack(move || {
        let doc = Document::read(nested_raw(levels)).unwrap();
        doc.validate().map_err(|p| p.to_string())
    });
    assert_eq!(size.unwrap(), 8 * DEFAULT_MAX_DEPTH as usize + 5);
}

#[test]
fn test_one_past_default_depth_is_rejected() {
    let levels = DEFAULT_MAX_DEPTH as usize + 1;
    let err = on_small_stack(move || {
        let doc = Document::read(nested_raw(levels)).unwrap();
        let err = doc.validate().unwrap_err();
        (matches!(err.error, Error::MaxDepthExceeded(DEFAULT_MAX_DEPTH)), err.progress)
    });
    assert!(err.0);
    // a length prefix and a "d" header for every enclosing level
    assert_eq!(err.1, 7 * (DEFAULT_MAX_DEPTH as usize + 1));
}

#[test]
fn test_far_past_default_depth_is_rejected() {
    let err = on_small_stack(|| {
        let doc = Document::read(nested_raw(20_000)).unwrap();
        matches!(doc.validate().unwrap_err().error, Error::MaxDepthExceeded(_))
    });
    assert!(err);
}

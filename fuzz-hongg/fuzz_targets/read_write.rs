use bytes::Bytes;
use honggfuzz::fuzz;
use lazy_bson::{Document, Element, ValidateConfig};

fn main() {
    let shallow = ValidateConfig { max_depth: 8 };
    loop {
        fuzz!(|data: &[u8]| {
            let bytes = Bytes::copy_from_slice(data);

            if let Ok(mut doc) = Document::read(bytes.clone()) {
                if let Ok(size) = doc.validate() {
                    let out = doc.marshal().unwrap();
                    assert_eq!(out.len(), size);
                    let _ = doc.validate_with(&shallow);
                }
                let _ = doc.normalize_headers();
                let _ = doc.marshal();
                for element in doc.iter_mut() {
                    let _ = element.value_mut().document_mut();
                    let _ = element.value_mut().array_mut();
                    let _ = element.value_mut().scope_mut();
                }
                let _ = doc.marshal();
                let _ = doc.to_string();
            }

            if let Ok(element) = Element::read(bytes) {
                if let Ok(size) = element.validate() {
                    let mut dest = vec![0u8; size];
                    let written = element.write_into(true, 0, size, &mut dest).unwrap();
                    assert_eq!(written, size);
                    let _ = element.key_ok();
                }
            }
        });
    }
}

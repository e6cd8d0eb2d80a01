//! Verify URL encoding and post-field length handling against JSON test
//! vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs and expected outputs. The post-field
//! cases pin down the byte-length contract for multi-byte characters, where
//! a character-count implementation would truncate the request body.

use transfer_core::{ScriptedTransport, TransferHandle, TransferOption};

#[test]
fn url_encode_test_vectors() {
    let raw = include_str!("../../test-vectors/url_encode.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    let handle = TransferHandle::new(ScriptedTransport::with_status(200));
    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let input = case["input"].as_str().unwrap();
        let expected = case["expected"].as_str().unwrap();

        assert_eq!(handle.url_encode(input).unwrap(), expected, "{name}");
    }
}

#[test]
fn post_field_length_test_vectors() {
    let raw = include_str!("../../test-vectors/post_fields.json");
    let vectors: serde_json::Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let fields = case["fields"].as_str().unwrap();
        let expected_len = case["expected_byte_length"].as_u64().unwrap() as usize;

        // Sanity-check the vector itself against the encoding rules.
        assert_eq!(fields.as_bytes().len(), expected_len, "{name}: vector");

        let mut handle = TransferHandle::new(ScriptedTransport::with_status(200));
        handle
            .post(Some("http://localhost:3000/echo"), Some(fields))
            .unwrap();

        let sent = handle
            .transport()
            .options
            .iter()
            .find_map(|o| match o {
                TransferOption::PostFields(data) => Some(data.clone()),
                _ => None,
            })
            .expect("post fields were configured");
        assert_eq!(sent.len(), expected_len, "{name}: configured length");
        assert_eq!(sent, fields.as_bytes(), "{name}: configured bytes");
    }
}

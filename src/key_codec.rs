//! Object key decoding.
//!
//! Storage change notifications carry object keys URL-escaped, with spaces sent
//! as `+`. The decoded key is the document name used on the knowledge-base side.
//!
//! Two distinct encoded keys may decode to the same name (`a+b` and `a%20b`).
//! The remote store cannot tell those objects apart; we do not try to.

use percent_encoding::percent_decode_str;

use crate::error::KeyDecodeError;

/// Canonical name of a document, derived from an object key.
pub type DocumentName = String;

/// Percent-decode `encoded_key`, then replace every literal `+` with a space.
///
/// A `%` not followed by two hex digits, or escapes that decode to invalid
/// UTF-8, are an error.
pub fn decode(encoded_key: &str) -> Result<DocumentName, KeyDecodeError> {
    check_escapes(encoded_key)?;
    let decoded = percent_decode_str(encoded_key)
        .decode_utf8()
        .map_err(|e| KeyDecodeError {
            key: encoded_key.to_string(),
            message: e.to_string(),
        })?;

    Ok(decoded.replace('+', " "))
}

fn check_escapes(encoded_key: &str) -> Result<(), KeyDecodeError> {
    let bytes = encoded_key.as_bytes();
    for (at, _) in encoded_key.match_indices('%') {
        let escape = bytes.get(at + 1..at + 3);
        if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
            return Err(KeyDecodeError {
                key: encoded_key.to_string(),
                message: format!("malformed percent escape at byte {at}"),
            });
        }
    }
    Ok(())
}

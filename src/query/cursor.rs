//! Opaque cursor encoding
//!
//! A cursor is the URL-safe base64 form of `cursor:<key>`, where the key is
//! the item's identity. Decoding only checks the envelope; whether the key
//! belongs to the current result set is decided by the paginator.

use super::connection::PaginationError;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

const CURSOR_PREFIX: &str = "cursor:";

/// Encode an item identity as an opaque cursor
pub fn encode_cursor(key: &str) -> String {
    URL_SAFE_NO_PAD.encode(format!("{CURSOR_PREFIX}{key}"))
}

/// Recover the identity a cursor was produced from
pub fn decode_cursor(cursor: &str) -> Result<String, PaginationError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| PaginationError::InvalidCursor(cursor.to_string()))?;
    let text =
        String::from_utf8(bytes).map_err(|_| PaginationError::InvalidCursor(cursor.to_string()))?;
    match text.strip_prefix(CURSOR_PREFIX) {
        Some(key) if !key.is_empty() => Ok(key.to_string()),
        _ => Err(PaginationError::InvalidCursor(cursor.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_roundtrips_identity() {
        let id = "3f1c2a9e-8a51-4c55-9c1e-0d6b9f8c7a21";
        let cursor = encode_cursor(id);
        assert_ne!(cursor, id, "cursor must be opaque");
        assert_eq!(decode_cursor(&cursor).unwrap(), id);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(
            decode_cursor("not base64!"),
            Err(PaginationError::InvalidCursor(_))
        ));
    }

    #[test]
    fn rejects_foreign_envelope() {
        let foreign = URL_SAFE_NO_PAD.encode("arrayconnection:4");
        assert!(matches!(
            decode_cursor(&foreign),
            Err(PaginationError::InvalidCursor(_))
        ));

        let empty_key = URL_SAFE_NO_PAD.encode(CURSOR_PREFIX);
        assert!(decode_cursor(&empty_key).is_err());
    }
}

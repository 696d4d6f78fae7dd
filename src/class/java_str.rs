//! The "modified UTF-8" of class files: CESU-8 with NUL encoded as `C0 80`.

use std::{borrow::Cow, sync::Arc};

use cesu8_str::java as cesu8_java;

/// Decodes a `CONSTANT_Utf8` payload. Returns `None` for byte sequences that
/// are not valid modified UTF-8.
pub fn decode(bytes: &[u8]) -> Option<Arc<str>> {
    let java_str = cesu8_java::JavaStr::from_java_cesu8(bytes).ok()?;
    Some(Arc::from(cesu8_java::from_java_cesu8(java_str)))
}

/// Encodes a string the way it is stored in a `CONSTANT_Utf8` entry.
pub fn encode(s: &str) -> Cow<'_, [u8]> {
    match cesu8_java::from_utf8(s) {
        Cow::Borrowed(b) => Cow::Borrowed(b.as_bytes()),
        Cow::Owned(o) => Cow::Owned(o.into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_is_unchanged() {
        assert_eq!(decode(b"java/lang/Object").as_deref(), Some("java/lang/Object"));
        assert_eq!(encode("java/lang/Object").as_ref(), b"java/lang/Object");
    }

    #[test]
    fn nul_uses_two_bytes() {
        assert_eq!(decode(&[b'a', 0xc0, 0x80]).as_deref(), Some("a\0"));
        assert_eq!(encode("a\0").as_ref(), &[b'a', 0xc0, 0x80]);
    }

    #[test]
    fn supplementary_characters_are_surrogate_pairs() {
        let bytes = [0xed, 0xa0, 0xbd, 0xed, 0xb8, 0x80];
        assert_eq!(decode(&bytes).as_deref(), Some("\u{1f600}"));
        assert_eq!(encode("\u{1f600}").as_ref(), &bytes);
    }

    #[test]
    fn two_byte_sequences() {
        assert_eq!(decode(&[0xc3, 0xa9]).as_deref(), Some("é"));
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(decode(&[0xff, 0x41]), None);
        assert_eq!(decode(&[0xe2, 0x82]), None);
    }
}

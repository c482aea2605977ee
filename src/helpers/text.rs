//! Text decoding for delimited uploads.

use crate::spreadsheet::SpreadsheetError;
use encoding_rs::Encoding;
use encoding_rs::UTF_8;
use std::borrow::Cow;

/// Decodes raw bytes to text.
/// A byte order mark selects UTF-8, UTF-16LE or UTF-16BE and is stripped; without one the
/// bytes must be valid UTF-8. Malformed sequences are an error, never replaced.
pub(crate) fn decode(bytes: &[u8]) -> Result<Cow<'_, str>, SpreadsheetError> {
    let (encoding, bom_length) = Encoding::for_bom(bytes).unwrap_or((UTF_8, 0));
    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes[bom_length..])
        .ok_or_else(|| SpreadsheetError::InvalidEncoding(encoding.name().to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_utf8() {
        assert_eq!(decode("name,café".as_bytes()).unwrap(), "name,café");
    }

    #[test]
    fn strips_utf8_bom() {
        assert_eq!(decode(b"\xEF\xBB\xBFa,b").unwrap(), "a,b");
    }

    #[test]
    fn utf16_with_bom() {
        let bytes = [0xFF, 0xFE, b'a', 0, b',', 0, b'b', 0];
        assert_eq!(decode(&bytes).unwrap(), "a,b");
    }

    #[test]
    fn rejects_malformed_utf8() {
        let error = decode(b"a,\xFF\xFE\xFD").unwrap_err();
        assert_eq!(error.to_string(), "Invalid UTF-8 text");
    }
}

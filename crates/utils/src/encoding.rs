use std::io::{self, Read, Seek, SeekFrom};

use encoding_rs::{Encoding, UTF_8, WINDOWS_1251};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];

/// Share of suspicious characters above which a UTF-8 decode is rejected.
const MAX_BAD_CHAR_RATIO: f64 = 0.01;

/// Guesses the text encoding of a stream and rewinds it to the start.
///
/// Order of preference:
/// 1. UTF-8 byte order mark
/// 2. UTF-8, when fewer than 1% of the decoded characters are `?` or U+FFFD
/// 3. Windows-1251, the only legacy code page seen in the supported exports, standing in for
///    the platform default code page
pub fn detect_encoding<R: Read + Seek + ?Sized>(reader: &mut R) -> io::Result<&'static Encoding> {
    reader.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    reader.seek(SeekFrom::Start(0))?;

    Ok(detect_encoding_from_bytes(&bytes))
}

pub fn detect_encoding_from_bytes(bytes: &[u8]) -> &'static Encoding {
    if bytes.starts_with(&UTF8_BOM) {
        return UTF_8;
    }

    let (decoded, _) = UTF_8.decode_without_bom_handling(bytes);
    if looks_like_utf8(&decoded) {
        return UTF_8;
    }

    WINDOWS_1251
}

fn looks_like_utf8(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return true;
    }
    let bad = text.chars().filter(|c| matches!(c, '?' | '\u{FFFD}')).count();
    (bad as f64 / total as f64) < MAX_BAD_CHAR_RATIO
}

/// Reads the whole stream as text in its detected encoding.
pub fn read_text<R: Read + Seek + ?Sized>(reader: &mut R) -> io::Result<String> {
    reader.seek(SeekFrom::Start(0))?;
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let encoding = detect_encoding_from_bytes(&bytes);
    Ok(decode_text(&bytes, encoding))
}

/// Decodes bytes with the given encoding, dropping a leading BOM if present.
pub fn decode_text(bytes: &[u8], encoding: &'static Encoding) -> String {
    let (decoded, _, _) = encoding.decode(bytes);
    decoded.into_owned()
}

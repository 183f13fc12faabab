//! ToUnicode CMap parsing
//!
//! Fonts with custom or CID encodings carry a ToUnicode stream mapping
//! character codes to Unicode text. Only the `bfchar` and `bfrange` sections
//! matter for extraction; everything else in the CMap program is ignored.

use flate2::read::ZlibDecoder;
use lopdf::{Document, Object, Stream};
use std::collections::HashMap;
use std::io::Read;

/// A parsed ToUnicode CMap
#[derive(Debug, Default, Clone)]
pub struct ToUnicodeCMap {
    /// Direct code mappings (code -> Unicode text)
    pub char_map: HashMap<u32, String>,
    /// Range mappings (start_code, end_code, base_codepoint)
    pub ranges: Vec<(u32, u32, u32)>,
    /// Bytes per character code, taken from the first source code seen
    pub code_bytes: usize,
}

impl ToUnicodeCMap {
    pub fn new() -> Self {
        Self {
            code_bytes: 2,
            ..Self::default()
        }
    }

    /// Load the CMap referenced by a font dictionary's `ToUnicode` entry
    pub fn from_font(doc: &Document, font: &lopdf::Dictionary) -> Option<Self> {
        let stream = match font.get(b"ToUnicode").ok()? {
            Object::Reference(id) => doc.get_object(*id).ok()?.as_stream().ok()?,
            Object::Stream(stream) => stream,
            _ => return None,
        };
        Self::parse(&stream_bytes(stream))
    }

    /// Parse a ToUnicode CMap from its decompressed content
    pub fn parse(content: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(content);
        let mut cmap = ToUnicodeCMap::new();
        let mut code_len_seen = false;

        for section in sections(&text, "beginbfchar", "endbfchar") {
            let tokens = tokenize(section);
            for pair in tokens.chunks(2) {
                if let [Token::Hex(src), Token::Hex(dst)] = pair {
                    if !code_len_seen {
                        cmap.code_bytes = (src.len() / 2).max(1);
                        code_len_seen = true;
                    }
                    if let (Some(code), Some(text)) = (parse_hex(src), hex_to_unicode_string(dst)) {
                        cmap.char_map.insert(code, text);
                    }
                }
            }
        }

        for section in sections(&text, "beginbfrange", "endbfrange") {
            let tokens = tokenize(section);
            let mut i = 0;
            while i + 2 < tokens.len() {
                let (Token::Hex(start_hex), Token::Hex(end_hex)) = (&tokens[i], &tokens[i + 1])
                else {
                    i += 1;
                    continue;
                };
                if !code_len_seen {
                    cmap.code_bytes = (start_hex.len() / 2).max(1);
                    code_len_seen = true;
                }
                let (Some(start), Some(end)) = (parse_hex(start_hex), parse_hex(end_hex)) else {
                    i += 3;
                    continue;
                };
                match &tokens[i + 2] {
                    Token::Hex(base_hex) => {
                        if let Some(base) = parse_hex(base_hex) {
                            cmap.ranges.push((start, end, base));
                        }
                    }
                    Token::Array(items) => {
                        for (offset, dst) in items.iter().enumerate() {
                            let Some(code) = start.checked_add(offset as u32) else {
                                break;
                            };
                            if code > end {
                                break;
                            }
                            if let Some(text) = hex_to_unicode_string(dst) {
                                cmap.char_map.insert(code, text);
                            }
                        }
                    }
                }
                i += 3;
            }
        }

        if cmap.char_map.is_empty() && cmap.ranges.is_empty() {
            None
        } else {
            Some(cmap)
        }
    }

    /// Look up a code and return its Unicode text
    pub fn lookup(&self, code: u32) -> Option<String> {
        if let Some(s) = self.char_map.get(&code) {
            return Some(s.clone());
        }

        self.ranges
            .iter()
            .find(|&&(start, end, _)| code >= start && code <= end)
            .and_then(|&(start, _, base)| base.checked_add(code - start))
            .and_then(char::from_u32)
            .map(|c| c.to_string())
    }

    /// Decode a show-text string, `code_bytes` bytes per code
    pub fn decode(&self, bytes: &[u8]) -> String {
        let mut result = String::new();

        for chunk in bytes.chunks(self.code_bytes.max(1)) {
            let code = chunk.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
            if let Some(s) = self.lookup(code) {
                result.push_str(&s);
            } else if let Some(c) = char::from_u32(code) {
                result.push(c);
            }
        }

        result
    }
}

/// Decompressed stream bytes, falling back to a raw zlib pass and then the
/// stored bytes when lopdf cannot decode the filter chain
pub(crate) fn stream_bytes(stream: &Stream) -> Vec<u8> {
    if let Ok(data) = stream.decompressed_content() {
        return data;
    }
    let mut decoder = ZlibDecoder::new(stream.content.as_slice());
    let mut inflated = Vec::new();
    if decoder.read_to_end(&mut inflated).is_ok() {
        inflated
    } else {
        stream.content.clone()
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Hex(String),
    Array(Vec<String>),
}

/// Bodies between every `begin`/`end` keyword pair
fn sections<'a>(text: &'a str, begin: &str, end: &str) -> Vec<&'a str> {
    let mut out = Vec::new();
    let mut pos = 0;
    while let Some(start) = text[pos..].find(begin) {
        let body_start = pos + start + begin.len();
        let Some(len) = text[body_start..].find(end) else {
            break;
        };
        out.push(&text[body_start..body_start + len]);
        pos = body_start + len + end.len();
    }
    out
}

/// Split a section into `<hex>` tokens and `[<hex> ...]` arrays
fn tokenize(section: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = section.chars().peekable();
    let mut array: Option<Vec<String>> = None;

    while let Some(c) = chars.next() {
        match c {
            '<' => {
                let mut hex = String::new();
                for c in chars.by_ref() {
                    if c == '>' {
                        break;
                    }
                    if !c.is_whitespace() {
                        hex.push(c);
                    }
                }
                match array.as_mut() {
                    Some(items) => items.push(hex),
                    None => tokens.push(Token::Hex(hex)),
                }
            }
            '[' => array = Some(Vec::new()),
            ']' => {
                if let Some(items) = array.take() {
                    tokens.push(Token::Array(items));
                }
            }
            _ => {}
        }
    }

    tokens
}

fn parse_hex(hex: &str) -> Option<u32> {
    u32::from_str_radix(hex.trim(), 16).ok()
}

/// Convert a UTF-16BE hex string to text
fn hex_to_unicode_string(hex: &str) -> Option<String> {
    let hex = hex.trim();
    // lossy decoding turns stray bytes into multi-byte U+FFFD
    if !hex.is_ascii() {
        return None;
    }
    let units: Vec<u16> = hex
        .as_bytes()
        .chunks_exact(4)
        .filter_map(|chunk| std::str::from_utf8(chunk).ok())
        .filter_map(|digits| u16::from_str_radix(digits, 16).ok())
        .collect();

    if units.is_empty() {
        // single-byte destination such as <41>
        return parse_hex(hex).and_then(char::from_u32).map(|c| c.to_string());
    }

    let decoded = String::from_utf16_lossy(&units);
    if decoded.is_empty() {
        None
    } else {
        Some(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bfchar() {
        let cmap_content = r#"
/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
1 begincodespacerange
<0000><FFFF>
endcodespacerange
3 beginbfchar
<0003> <0020>
<0024> <0041>
<0025> <0042>
endbfchar
endcmap
"#;
        let cmap = ToUnicodeCMap::parse(cmap_content.as_bytes()).unwrap();

        assert_eq!(cmap.code_bytes, 2);
        assert_eq!(cmap.lookup(0x0003), Some(" ".to_string()));
        assert_eq!(cmap.lookup(0x0024), Some("A".to_string()));
        assert_eq!(cmap.lookup(0x0025), Some("B".to_string()));
    }

    #[test]
    fn test_decode_two_byte_codes() {
        let cmap_content = r#"
3 beginbfchar
<0003> <0020>
<0024> <0041>
<0025> <0042>
endbfchar
"#;
        let cmap = ToUnicodeCMap::parse(cmap_content.as_bytes()).unwrap();

        let codes = [0x00, 0x24, 0x00, 0x25, 0x00, 0x03];
        assert_eq!(cmap.decode(&codes), "AB ");
    }

    #[test]
    fn test_bfrange_with_base_and_array() {
        let cmap_content = r#"
2 beginbfrange
<10> <12> <0061>
<20> <21> [<0058> <FB01>]
endbfrange
"#;
        let cmap = ToUnicodeCMap::parse(cmap_content.as_bytes()).unwrap();

        assert_eq!(cmap.code_bytes, 1);
        assert_eq!(cmap.decode(&[0x10, 0x11, 0x12]), "abc");
        assert_eq!(cmap.decode(&[0x20, 0x21]), "X\u{FB01}");
    }

    #[test]
    fn test_non_ascii_destination_is_ignored() {
        let cmap_content = b"2 beginbfchar\n<0003> <0020>\n<0004> <00\x801>\nendbfchar\n";
        let cmap = ToUnicodeCMap::parse(cmap_content).unwrap();

        assert_eq!(cmap.lookup(0x0003), Some(" ".to_string()));
        assert_eq!(cmap.lookup(0x0004), None);
    }

    #[test]
    fn test_ranges_near_u32_max() {
        let cmap_content = r#"
2 beginbfrange
<FFFFFFFE> <FFFFFFFF> [<0041> <0042> <0043>]
<FFFFFF00> <FFFFFFFF> <FFFFFFF0>
endbfrange
"#;
        let cmap = ToUnicodeCMap::parse(cmap_content.as_bytes()).unwrap();

        assert_eq!(cmap.lookup(0xFFFF_FFFE), Some("A".to_string()));
        assert_eq!(cmap.lookup(0xFFFF_FFFF), Some("B".to_string()));
        assert_eq!(cmap.lookup(0xFFFF_FF80), None);
    }

    #[test]
    fn test_empty_cmap_is_none() {
        assert!(ToUnicodeCMap::parse(b"begincmap endcmap").is_none());
    }
}

//! Font resolution for text extraction
//!
//! Resolves a page font resource into what the interpreter needs: the
//! display name (for style heuristics), code width, glyph advance widths,
//! vertical metrics, and a way to decode show-text strings to Unicode.

use crate::objects::{get_array, get_dict, get_f64, get_name, number, resolve};
use crate::tounicode::ToUnicodeCMap;
use lopdf::{Dictionary, Document, Object};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Advance used when a font carries no width information, in 1/1000 em
const FALLBACK_WIDTH: f64 = 500.0;

const DEFAULT_ASCENT: f64 = 0.8;
const DEFAULT_DESCENT: f64 = -0.2;

/// Largest CID a two-byte code can select
const MAX_CID: u32 = 0xFFFF;

static SUBSET_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{6}\+").unwrap());

/// Check if a font name denotes a bold face. "Med" also matches Medium
/// weights.
pub fn is_bold_font(font_name: &str) -> bool {
    font_name.contains("Bold") || font_name.contains("Med")
}

/// Check if a font name denotes an italic face
pub fn is_italic_font(font_name: &str) -> bool {
    font_name.contains("Italic")
}

/// Strip a subset tag like `ABCDEF+` from a `BaseFont` name
pub fn strip_subset_prefix(name: &str) -> &str {
    match SUBSET_PREFIX_RE.find(name) {
        Some(m) => &name[m.end()..],
        None => name,
    }
}

#[derive(Debug, Clone)]
enum GlyphWidths {
    Simple {
        first_char: u32,
        widths: Vec<f64>,
        missing: f64,
    },
    Composite {
        widths: HashMap<u32, f64>,
        default: f64,
    },
}

impl GlyphWidths {
    fn get(&self, code: u32) -> f64 {
        match self {
            GlyphWidths::Simple {
                first_char,
                widths,
                missing,
            } => code
                .checked_sub(*first_char)
                .and_then(|i| widths.get(i as usize))
                .copied()
                .unwrap_or(*missing),
            GlyphWidths::Composite { widths, default } => {
                widths.get(&code).copied().unwrap_or(*default)
            }
        }
    }
}

/// A font resource resolved for the interpreter
#[derive(Debug, Clone)]
pub struct FontInfo<'a> {
    /// Display name, `BaseFont` without subset prefix
    pub name: String,
    /// Bytes per character code (2 for Type0 fonts)
    pub code_bytes: usize,
    /// Ascent in em
    pub ascent: f64,
    /// Descent in em (negative below the baseline)
    pub descent: f64,
    widths: GlyphWidths,
    to_unicode: Option<ToUnicodeCMap>,
    dict: &'a Dictionary,
}

impl<'a> FontInfo<'a> {
    pub fn load(doc: &'a Document, dict: &'a Dictionary, resource_name: &str) -> Self {
        let name = get_name(doc, dict, b"BaseFont")
            .map(|n| strip_subset_prefix(&String::from_utf8_lossy(n)).to_string())
            .unwrap_or_else(|| resource_name.to_string());

        let composite = get_name(doc, dict, b"Subtype") == Some(b"Type0".as_slice());
        let code_bytes = if composite { 2 } else { 1 };

        let descendant = if composite {
            get_array(doc, dict, b"DescendantFonts")
                .and_then(|fonts| fonts.first())
                .and_then(|f| match resolve(doc, f) {
                    Object::Dictionary(d) => Some(d),
                    _ => None,
                })
        } else {
            None
        };

        let widths = match descendant {
            Some(cid_font) => composite_widths(doc, cid_font),
            None => simple_widths(doc, dict),
        };

        let descriptor = get_dict(doc, descendant.unwrap_or(dict), b"FontDescriptor");
        let (ascent, descent) = descriptor
            .map(|d| {
                let ascent = get_f64(doc, d, b"Ascent").unwrap_or(0.0) / 1000.0;
                let descent = get_f64(doc, d, b"Descent").unwrap_or(0.0) / 1000.0;
                (ascent, descent)
            })
            .filter(|&(a, d)| a > 0.0 && a > d)
            .unwrap_or((DEFAULT_ASCENT, DEFAULT_DESCENT));

        let to_unicode = ToUnicodeCMap::from_font(doc, dict).map(|mut cmap| {
            cmap.code_bytes = code_bytes;
            cmap
        });

        FontInfo {
            name,
            code_bytes,
            ascent,
            descent,
            widths,
            to_unicode,
            dict,
        }
    }

    /// Split a show-text string into character codes
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        bytes
            .chunks(self.code_bytes)
            .map(|chunk| chunk.iter().fold(0u32, |acc, &b| (acc << 8) | u32::from(b)))
            .collect()
    }

    /// Horizontal advance of a code in 1/1000 em
    pub fn width(&self, code: u32) -> f64 {
        self.widths.get(code)
    }

    /// Decode a show-text string to Unicode
    pub fn decode(&self, doc: &Document, bytes: &[u8]) -> String {
        if let Some(cmap) = &self.to_unicode {
            return cmap.decode(bytes);
        }

        if let Ok(encoding) = self.dict.get_font_encoding(doc) {
            if let Ok(text) = Document::decode_text(&encoding, bytes) {
                return text;
            }
        }

        fallback_decode(bytes)
    }
}

/// UTF-16BE with BOM, else Latin-1
pub(crate) fn fallback_decode(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|chunk| u16::from_be_bytes([chunk[0], chunk[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    bytes.iter().map(|&b| b as char).collect()
}

fn simple_widths(doc: &Document, dict: &Dictionary) -> GlyphWidths {
    let first_char = get_f64(doc, dict, b"FirstChar").unwrap_or(0.0).max(0.0) as u32;
    let widths = get_array(doc, dict, b"Widths")
        .map(|arr| {
            arr.iter()
                .map(|w| number(resolve(doc, w)).unwrap_or(FALLBACK_WIDTH))
                .collect()
        })
        .unwrap_or_default();
    let missing = get_dict(doc, dict, b"FontDescriptor")
        .and_then(|d| get_f64(doc, d, b"MissingWidth"))
        .filter(|w| *w > 0.0)
        .unwrap_or(FALLBACK_WIDTH);

    GlyphWidths::Simple {
        first_char,
        widths,
        missing,
    }
}

/// Parse a CIDFont `W` array: `c [w1 w2 ...]` and `c_first c_last w` forms
fn composite_widths(doc: &Document, cid_font: &Dictionary) -> GlyphWidths {
    let default = get_f64(doc, cid_font, b"DW").unwrap_or(1000.0);
    let mut widths = HashMap::new();

    if let Some(w) = get_array(doc, cid_font, b"W") {
        let mut i = 0;
        while i < w.len() {
            let Some(first) = number(resolve(doc, &w[i])) else {
                break;
            };
            let first = first as u32;
            match w.get(i + 1).map(|o| resolve(doc, o)) {
                Some(Object::Array(list)) => {
                    for (offset, width) in list.iter().enumerate() {
                        let code = first.saturating_add(offset as u32);
                        if code > MAX_CID {
                            break;
                        }
                        if let Some(width) = number(resolve(doc, width)) {
                            widths.insert(code, width);
                        }
                    }
                    i += 2;
                }
                Some(last) => {
                    let (Some(last), Some(width)) =
                        (number(last), w.get(i + 2).and_then(|o| number(resolve(doc, o))))
                    else {
                        break;
                    };
                    for code in first..=(last as u32).min(MAX_CID) {
                        widths.insert(code, width);
                    }
                    i += 3;
                }
                None => break,
            }
        }
    }

    GlyphWidths::Composite { widths, default }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::dictionary;

    #[test]
    fn test_bold_detection() {
        assert!(is_bold_font("Helvetica-Bold"));
        assert!(is_bold_font("Arial-Medium"));
        assert!(is_bold_font("Roboto-Med"));
        assert!(!is_bold_font("Arial-Regular"));
        // case-sensitive
        assert!(!is_bold_font("arial-bold"));
    }

    #[test]
    fn test_italic_detection() {
        assert!(is_italic_font("Times-Italic"));
        assert!(is_italic_font("Helvetica-BoldItalic"));
        assert!(!is_italic_font("Helvetica-Oblique"));
    }

    #[test]
    fn test_strip_subset_prefix() {
        assert_eq!(strip_subset_prefix("ABCDEF+Calibri-Bold"), "Calibri-Bold");
        assert_eq!(strip_subset_prefix("Calibri"), "Calibri");
        assert_eq!(strip_subset_prefix("abcdef+Calibri"), "abcdef+Calibri");
    }

    #[test]
    fn test_simple_font_widths() {
        let doc = Document::with_version("1.5");
        let dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "TrueType",
            "BaseFont" => "XYZABC+Arial-BoldMT",
            "FirstChar" => 65,
            "Widths" => vec![Object::Integer(667), Object::Integer(722)],
        };
        let font = FontInfo::load(&doc, &dict, "F1");
        assert_eq!(font.name, "Arial-BoldMT");
        assert_eq!(font.code_bytes, 1);
        assert_eq!(font.width(65), 667.0);
        assert_eq!(font.width(66), 722.0);
        assert_eq!(font.width(67), FALLBACK_WIDTH);
        assert_eq!(font.ascent, DEFAULT_ASCENT);
    }

    #[test]
    fn test_composite_font_widths() {
        let mut doc = Document::with_version("1.5");
        let cid_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "DW" => 900,
            "W" => vec![
                Object::Integer(1),
                Object::Array(vec![Object::Integer(250), Object::Integer(300)]),
                Object::Integer(10),
                Object::Integer(12),
                Object::Integer(600),
            ],
            "FontDescriptor" => dictionary! {
                "Ascent" => 750,
                "Descent" => -250,
            },
        });
        let dict = dictionary! {
            "Type" => "Font",
            "Subtype" => "Type0",
            "BaseFont" => "NotoSans",
            "DescendantFonts" => vec![Object::Reference(cid_font)],
        };
        let font = FontInfo::load(&doc, &dict, "F2");
        assert_eq!(font.code_bytes, 2);
        assert_eq!(font.codes(&[0x00, 0x01, 0x00, 0x0B]), vec![1, 11]);
        assert_eq!(font.width(1), 250.0);
        assert_eq!(font.width(2), 300.0);
        assert_eq!(font.width(11), 600.0);
        assert_eq!(font.width(5), 900.0);
        assert_eq!((font.ascent, font.descent), (0.75, -0.25));
    }

    #[test]
    fn test_composite_widths_capped_at_max_cid() {
        let mut doc = Document::with_version("1.5");
        let cid_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "CIDFontType2",
            "W" => vec![
                Object::Integer(0),
                Object::Integer(4_294_967_295),
                Object::Integer(500),
                Object::Integer(65_534),
                Object::Array(vec![1.into(), 2.into(), 3.into(), 4.into()]),
            ],
        });
        let dict = dictionary! {
            "Subtype" => "Type0",
            "BaseFont" => "HugeRanges",
            "DescendantFonts" => vec![Object::Reference(cid_font)],
        };
        let font = FontInfo::load(&doc, &dict, "F3");
        assert_eq!(font.width(0), 500.0);
        assert_eq!(font.width(65_533), 500.0);
        assert_eq!(font.width(65_535), 2.0);
        assert_eq!(font.width(65_536), 1000.0);
    }

    #[test]
    fn test_fallback_decode() {
        assert_eq!(fallback_decode(b"Hi"), "Hi");
        assert_eq!(fallback_decode(&[0xFE, 0xFF, 0x00, 0x41]), "A");
    }
}

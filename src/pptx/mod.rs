//! Minimal PresentationML writer
//!
//! Builds an in-memory deck (canvas, slides, shared media) and serialises it
//! into a `.pptx` package with one master, one blank layout and one theme.

mod media;
mod package;
mod presentation;
mod slide;
mod template;

pub use media::{ImageFormat, MediaId, MediaPart};
pub use presentation::{CanvasSize, Presentation};
pub use slide::{Frame, Paragraph, Run, Shape, Slide, TextFrame};

/// Errors raised while serialising a presentation
#[derive(Debug, thiserror::Error)]
pub enum PptxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("XML formatting error")]
    Xml(#[from] std::fmt::Error),

    #[error("Unknown media reference {0:?}")]
    UnknownMedia(MediaId),
}

/// Escape text for XML content and attribute values.
///
/// Characters that XML 1.0 forbids (C0 controls other than tab, newline and
/// carriage return, U+FFFE, U+FFFF) are dropped.
pub(crate) fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if (c as u32) < 0x20 || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}

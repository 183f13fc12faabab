//! Small PDF fixtures built with lopdf

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use std::io::{Cursor, Read};

/// Smallest byte string the converter accepts as JPEG data
pub const FAKE_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0xFF, 0xD9];

pub struct PdfBuilder {
    pub doc: Document,
    pages_id: ObjectId,
    font_id: ObjectId,
    kids: Vec<Object>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        PdfBuilder {
            doc,
            pages_id,
            font_id,
            kids: Vec::new(),
        }
    }

    /// A DCT image stream carrying `data`
    pub fn add_jpeg(&mut self, data: &[u8], width: i64, height: i64) -> ObjectId {
        self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
                "Filter" => "DCTDecode",
            },
            data.to_vec(),
        ))
    }

    /// An uncompressed 8-bit RGB image
    pub fn add_raw_rgb(&mut self, pixels: &[u8], width: i64, height: i64) -> ObjectId {
        self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => width,
                "Height" => height,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8,
            },
            pixels.to_vec(),
        ))
    }

    /// A form XObject drawn at `(x, y)` whose resources hold the given images
    pub fn add_form(&mut self, x: i64, y: i64, content: &str, images: &[(&str, ObjectId)]) -> ObjectId {
        self.doc.add_object(Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Form",
                "BBox" => vec![0.into(), 0.into(), 1000.into(), 1000.into()],
                "Matrix" => vec![1.into(), 0.into(), 0.into(), 1.into(), x.into(), y.into()],
                "Resources" => dictionary! { "XObject" => xobject_dict(images) },
            },
            content.as_bytes().to_vec(),
        ))
    }

    /// Add a page; `F1` (Helvetica) and the given images are in its resources
    pub fn add_page(&mut self, width: i64, height: i64, content: &str, images: &[(&str, ObjectId)]) {
        let content_id = self
            .doc
            .add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![0.into(), 0.into(), width.into(), height.into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => self.font_id },
                "XObject" => xobject_dict(images),
            },
        });
        self.kids.push(page_id.into());
    }

    /// Finish the page tree and catalog
    pub fn build(mut self) -> Document {
        let count = self.kids.len() as i64;
        self.doc.objects.insert(
            self.pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => self.kids,
                "Count" => count,
            }),
        );
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
        self.doc
    }

    /// Finish and serialize
    pub fn to_bytes(self) -> Vec<u8> {
        let mut doc = self.build();
        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }
}

fn xobject_dict(entries: &[(&str, ObjectId)]) -> lopdf::Dictionary {
    let mut xobjects = lopdf::Dictionary::new();
    for (name, id) in entries {
        xobjects.set(name.as_bytes().to_vec(), Object::Reference(*id));
    }
    xobjects
}

/// Read one part of a `.pptx` package as text
pub fn read_part(pptx: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(pptx)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut text = String::new();
    file.read_to_string(&mut text).unwrap();
    text
}

/// Every part name in a `.pptx` package
pub fn part_names(pptx: &[u8]) -> Vec<String> {
    let archive = zip::ZipArchive::new(Cursor::new(pptx)).unwrap();
    archive.file_names().map(|n| n.to_string()).collect()
}

/// Read one part of a `.pptx` package as bytes
pub fn read_part_bytes(pptx: &[u8], name: &str) -> Vec<u8> {
    let mut archive = zip::ZipArchive::new(Cursor::new(pptx)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut data = Vec::new();
    file.read_to_end(&mut data).unwrap();
    data
}

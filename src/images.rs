//! Image XObject extraction
//!
//! JPEG streams are passed through untouched. Raw sample streams have no
//! standalone file format, so they are wrapped losslessly into PNG. Anything
//! else is reported as unsupported.

use crate::objects::{get_f64, get_name, number, resolve};
use crate::pptx::ImageFormat;
use flate2::read::ZlibDecoder;
use image::{DynamicImage, GrayImage, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::io::{Cursor, Read};

#[derive(Debug, Clone, PartialEq, serde::Serialize, thiserror::Error)]
pub enum ImageError {
    #[error("image object {0:?} not found")]
    Missing(ObjectId),

    #[error("object {0:?} is not an image XObject")]
    NotAnImage(ObjectId),

    #[error("unsupported image: {0}")]
    Unsupported(String),

    #[error("malformed image: {0}")]
    Malformed(String),
}

/// Encoded bytes ready to be stored as a picture part
#[derive(Debug, Clone)]
pub struct ExtractedImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
}

/// Palette entry used for indices past `hival`
static MISSING_ENTRY: [u8; 3] = [0; 3];

/// How raw samples map to pixels
enum SampleLayout {
    Gray,
    Rgb,
    /// Palette of `channels`-sized entries, indexed by one byte per pixel
    Indexed { channels: usize, palette: Vec<u8> },
}

/// Extract an image XObject by object id
pub fn extract_image(doc: &Document, id: ObjectId) -> Result<ExtractedImage, ImageError> {
    let stream = doc
        .get_object(id)
        .ok()
        .and_then(|o| o.as_stream().ok())
        .ok_or(ImageError::Missing(id))?;
    let dict = &stream.dict;

    if get_name(doc, dict, b"Subtype") != Some(b"Image".as_slice()) {
        return Err(ImageError::NotAnImage(id));
    }

    let width = dimension(doc, dict, b"Width")?;
    let height = dimension(doc, dict, b"Height")?;
    let filters = filter_names(doc, dict);

    match filters.last().map(Vec::as_slice) {
        Some(b"DCTDecode") | Some(b"DCT") => {
            let data = jpeg_bytes(stream, &filters[..filters.len() - 1])?;
            Ok(ExtractedImage {
                data,
                format: ImageFormat::Jpeg,
                width,
                height,
            })
        }
        Some(b"JPXDecode") => Err(ImageError::Unsupported("JPEG 2000".into())),
        Some(b"CCITTFaxDecode") | Some(b"CCF") => Err(ImageError::Unsupported("CCITT fax".into())),
        Some(b"JBIG2Decode") => Err(ImageError::Unsupported("JBIG2".into())),
        _ => {
            let samples = raw_samples(stream, &filters)?;
            let data = samples_to_png(doc, dict, samples, width, height)?;
            Ok(ExtractedImage {
                data,
                format: ImageFormat::Png,
                width,
                height,
            })
        }
    }
}

fn dimension(doc: &Document, dict: &Dictionary, key: &[u8]) -> Result<u32, ImageError> {
    get_f64(doc, dict, key)
        .filter(|v| *v >= 1.0 && *v <= u32::MAX as f64)
        .map(|v| v as u32)
        .ok_or_else(|| {
            ImageError::Malformed(format!("missing or invalid {}", String::from_utf8_lossy(key)))
        })
}

/// `Filter` as a list of names, outermost first
fn filter_names(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter").map(|f| resolve(doc, f)) {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(names)) => names
            .iter()
            .filter_map(|n| resolve(doc, n).as_name().ok())
            .map(|n| n.to_vec())
            .collect(),
        _ => Vec::new(),
    }
}

fn is_flate(name: &[u8]) -> bool {
    name == b"FlateDecode" || name == b"Fl"
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, ImageError> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| ImageError::Malformed(format!("flate data: {}", e)))?;
    Ok(out)
}

/// JPEG bytes, with any outer Flate layers removed
fn jpeg_bytes(stream: &Stream, outer: &[Vec<u8>]) -> Result<Vec<u8>, ImageError> {
    let mut data = stream.content.clone();
    for filter in outer {
        if !is_flate(filter) {
            return Err(ImageError::Unsupported(format!(
                "{} before DCTDecode",
                String::from_utf8_lossy(filter)
            )));
        }
        data = inflate(&data)?;
    }
    if !data.starts_with(&[0xFF, 0xD8]) {
        return Err(ImageError::Malformed("JPEG stream lacks SOI marker".into()));
    }
    Ok(data)
}

fn raw_samples(stream: &Stream, filters: &[Vec<u8>]) -> Result<Vec<u8>, ImageError> {
    if filters.is_empty() {
        return Ok(stream.content.clone());
    }
    let supported = filters
        .iter()
        .all(|f| is_flate(f) || f.as_slice() == b"LZWDecode" || f.as_slice() == b"LZW");
    if !supported {
        let names: Vec<_> = filters.iter().map(|f| String::from_utf8_lossy(f).to_string()).collect();
        return Err(ImageError::Unsupported(format!("filter {}", names.join(", "))));
    }
    match stream.decompressed_content() {
        Ok(data) => Ok(data),
        Err(_) if filters.len() == 1 && is_flate(&filters[0]) => inflate(&stream.content),
        Err(e) => Err(ImageError::Malformed(e.to_string())),
    }
}

fn samples_to_png(
    doc: &Document,
    dict: &Dictionary,
    samples: Vec<u8>,
    width: u32,
    height: u32,
) -> Result<Vec<u8>, ImageError> {
    if matches!(dict.get(b"ImageMask").map(|o| resolve(doc, o)), Ok(Object::Boolean(true))) {
        return Err(ImageError::Unsupported("stencil mask".into()));
    }
    let bits = get_f64(doc, dict, b"BitsPerComponent").unwrap_or(8.0);
    if bits != 8.0 {
        return Err(ImageError::Unsupported(format!("{} bits per component", bits)));
    }

    let pixels = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| ImageError::Malformed(format!("{}x{} pixels", width, height)))?;
    let rgb_len = pixels
        .checked_mul(3)
        .ok_or_else(|| ImageError::Malformed(format!("{}x{} pixels", width, height)))?;
    let image = match sample_layout(doc, dict)? {
        SampleLayout::Gray => {
            let samples = take_exact(samples, pixels)?;
            GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8)
        }
        SampleLayout::Rgb => {
            let samples = take_exact(samples, rgb_len)?;
            RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8)
        }
        SampleLayout::Indexed { channels, palette } => {
            let indices = take_exact(samples, pixels)?;
            let mut expanded = Vec::with_capacity(rgb_len);
            for index in indices {
                let start = index as usize * channels;
                let entry = palette
                    .get(start..start + channels)
                    .unwrap_or(&MISSING_ENTRY[..channels]);
                if channels == 1 {
                    expanded.extend_from_slice(&[entry[0]; 3]);
                } else {
                    expanded.extend_from_slice(entry);
                }
            }
            RgbImage::from_raw(width, height, expanded).map(DynamicImage::ImageRgb8)
        }
    }
    .ok_or_else(|| ImageError::Malformed("sample buffer does not match dimensions".into()))?;

    let mut png = Cursor::new(Vec::new());
    image
        .write_to(&mut png, image::ImageFormat::Png)
        .map_err(|e| ImageError::Malformed(format!("PNG encoding failed: {}", e)))?;
    Ok(png.into_inner())
}

/// Trim trailing padding; fail if there are too few samples
fn take_exact(mut samples: Vec<u8>, len: usize) -> Result<Vec<u8>, ImageError> {
    if samples.len() < len {
        return Err(ImageError::Malformed(format!(
            "expected {} sample bytes, found {}",
            len,
            samples.len()
        )));
    }
    samples.truncate(len);
    Ok(samples)
}

/// Channel count of a device-like color space, following ICCBased `N`
fn channels_of(doc: &Document, space: &Object) -> Option<usize> {
    match resolve(doc, space) {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"G" | b"CalGray" => Some(1),
            b"DeviceRGB" | b"RGB" | b"CalRGB" => Some(3),
            b"DeviceCMYK" | b"CMYK" => Some(4),
            _ => None,
        },
        Object::Array(arr) => match arr.first().and_then(|o| o.as_name().ok()) {
            Some(b"ICCBased") => arr
                .get(1)
                .map(|o| resolve(doc, o))
                .and_then(|o| o.as_stream().ok())
                .and_then(|s| s.dict.get(b"N").ok())
                .and_then(number)
                .map(|n| n as usize),
            Some(b"CalGray") => Some(1),
            Some(b"CalRGB") => Some(3),
            _ => None,
        },
        _ => None,
    }
}

fn sample_layout(doc: &Document, dict: &Dictionary) -> Result<SampleLayout, ImageError> {
    let Ok(space) = dict.get(b"ColorSpace") else {
        return Err(ImageError::Unsupported("no color space".into()));
    };

    if let Object::Array(arr) = resolve(doc, space) {
        if arr.first().and_then(|o| o.as_name().ok()) == Some(b"Indexed".as_slice()) {
            return indexed_layout(doc, arr);
        }
    }

    match channels_of(doc, space) {
        Some(1) => Ok(SampleLayout::Gray),
        Some(3) => Ok(SampleLayout::Rgb),
        Some(4) => Err(ImageError::Unsupported("CMYK samples".into())),
        _ => Err(ImageError::Unsupported("color space".into())),
    }
}

/// `[/Indexed base hival lookup]`
fn indexed_layout(doc: &Document, arr: &[Object]) -> Result<SampleLayout, ImageError> {
    let [_, base, _, lookup] = arr else {
        return Err(ImageError::Malformed("Indexed color space needs 4 entries".into()));
    };
    let channels = match channels_of(doc, base) {
        Some(n @ (1 | 3)) => n,
        _ => return Err(ImageError::Unsupported("Indexed base color space".into())),
    };
    let palette = match resolve(doc, lookup) {
        Object::String(bytes, _) => bytes.clone(),
        Object::Stream(stream) => crate::tounicode::stream_bytes(stream),
        _ => return Err(ImageError::Malformed("Indexed lookup table".into())),
    };
    Ok(SampleLayout::Indexed { channels, palette })
}

/// Encodings a picture part can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// Handle to a media part stored once in the presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MediaId(pub(crate) usize);

impl MediaId {
    /// Package part name, e.g. `image1.png`
    pub fn part_name(&self, format: ImageFormat) -> String {
        format!("image{}.{}", self.0 + 1, format.extension())
    }
}

#[derive(Debug, Clone)]
pub struct MediaPart {
    pub data: Vec<u8>,
    pub format: ImageFormat,
}

//! Color conversion between PDF fill colors and 8-bit RGB

use std::fmt;

/// An 8-bit RGB triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, thiserror::Error)]
pub enum ColorError {
    #[error("expected at least 3 color channels, got {0}")]
    TooFewChannels(usize),
    #[error("channel value {0} is outside [0, 1]")]
    OutOfRange(f64),
    #[error("packed color {0:#x} does not fit in 24 bits")]
    PackedOverflow(u32),
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Build from normalized channel intensities.
    ///
    /// Only the first three channels are read and each is truncated from
    /// `value × 255`. No color-space conversion happens here.
    pub fn from_normalized(channels: &[f64]) -> Result<Self, ColorError> {
        if channels.len() < 3 {
            return Err(ColorError::TooFewChannels(channels.len()));
        }
        let mut out = [0u8; 3];
        for (slot, &value) in out.iter_mut().zip(channels) {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ColorError::OutOfRange(value));
            }
            *slot = (value * 255.0) as u8;
        }
        Ok(Rgb::new(out[0], out[1], out[2]))
    }

    /// Naive DeviceCMYK to RGB: each channel is `1 - min(1, ink + k)`.
    pub fn from_cmyk(channels: &[f64]) -> Result<Self, ColorError> {
        let [c, m, y, k] = match channels {
            [c, m, y, k, ..] => [*c, *m, *y, *k],
            _ => return Err(ColorError::TooFewChannels(channels.len())),
        };
        for value in [c, m, y, k] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ColorError::OutOfRange(value));
            }
        }
        let channel = |ink: f64| 1.0 - (ink + k).min(1.0);
        Rgb::from_normalized(&[channel(c), channel(m), channel(y)])
    }

    /// Decode a packed `0xRRGGBB` integer.
    pub fn from_packed(packed: u32) -> Result<Self, ColorError> {
        if packed > 0xFF_FFFF {
            return Err(ColorError::PackedOverflow(packed));
        }
        Ok(Rgb::new(
            ((packed >> 16) & 0xFF) as u8,
            ((packed >> 8) & 0xFF) as u8,
            (packed & 0xFF) as u8,
        ))
    }

    pub fn packed(&self) -> u32 {
        (u32::from(self.r) << 16) | (u32::from(self.g) << 8) | u32::from(self.b)
    }

    /// Upper-case hex as used by `a:srgbClr/@val`
    pub fn hex(&self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.hex())
    }
}

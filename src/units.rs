//! Point to EMU conversion
//!
//! PresentationML measures everything in English Metric Units. One point is
//! exactly 12700 EMU, so one inch (72 pt) is 914400 EMU.

/// EMU per PDF point
pub const EMU_PER_POINT: f64 = 12700.0;

/// Default slide width (10 in) used when a document has no pages
pub const DEFAULT_SLIDE_WIDTH_EMU: i64 = 9_144_000;

/// Default slide height (7.5 in) used when a document has no pages
pub const DEFAULT_SLIDE_HEIGHT_EMU: i64 = 6_858_000;

/// Convert a length in points to EMU, truncating toward zero.
pub fn pt_to_emu(pt: f64) -> i64 {
    (pt * EMU_PER_POINT) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inch_is_914400() {
        assert_eq!(pt_to_emu(72.0), 914_400);
    }

    #[test]
    fn test_truncates_instead_of_rounding() {
        // 12700.635 EMU
        assert_eq!(pt_to_emu(1.00005), 12_700);
        // 6350.9906 EMU
        assert_eq!(pt_to_emu(0.500078), 6_350);
    }

    #[test]
    fn test_truncates_toward_zero_for_negatives() {
        assert_eq!(pt_to_emu(-1.00005), -12_700);
    }

    #[test]
    fn test_zero() {
        assert_eq!(pt_to_emu(0.0), 0);
    }
}

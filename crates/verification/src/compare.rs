//! Image comparison utilities for verification
//!
//! Filters run in 8-bit textures and sample with linear filtering, so outputs
//! are compared per channel against a tolerance rather than bit for bit.

/// Result of comparing two images
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareResult {
    /// Every channel is within the tolerance
    Match,
    /// Images have different dimensions
    DimensionMismatch {
        /// Dimensions of the expected image
        expected_dimensions: (u32, u32),
        /// Dimensions of the rendered image
        actual_dimensions: (u32, u32),
    },
    /// Images have matching dimensions but some channels differ too much
    PixelMismatch {
        /// Largest absolute channel difference
        max_difference: u8,
        /// Number of pixels with at least one channel over the tolerance
        mismatched_pixels: usize,
        /// Coordinates of the first mismatching pixel
        first_mismatch: (u32, u32),
    },
}

impl CompareResult {
    pub fn is_match(&self) -> bool {
        matches!(self, CompareResult::Match)
    }
}

/// Compares two RGBA8 images channel by channel
///
/// # Arguments
/// * `expected` - Reference image
/// * `actual` - Rendered image
/// * `tolerance` - Largest accepted absolute difference per channel
///
/// # Returns
/// A `CompareResult` indicating whether the images match and details about any differences
pub fn compare_images(expected: &image::RgbaImage, actual: &image::RgbaImage, tolerance: u8) -> CompareResult {
    if expected.dimensions() != actual.dimensions() {
        return CompareResult::DimensionMismatch {
            expected_dimensions: expected.dimensions(),
            actual_dimensions: actual.dimensions(),
        };
    }

    let mut max_difference = 0;
    let mut mismatched_pixels = 0;
    let mut first_mismatch = None;

    for (x, y, expected_pixel) in expected.enumerate_pixels() {
        let actual_pixel = actual.get_pixel(x, y);
        let difference = expected_pixel.0.iter().zip(actual_pixel.0).map(|(&e, a)| e.abs_diff(a)).max().unwrap_or(0);

        max_difference = max_difference.max(difference);
        if difference > tolerance {
            mismatched_pixels += 1;
            first_mismatch.get_or_insert((x, y));
        }
    }

    match first_mismatch {
        None => CompareResult::Match,
        Some(first_mismatch) => CompareResult::PixelMismatch {
            max_difference,
            mismatched_pixels,
            first_mismatch,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_tolerance_matches() {
        let expected = image::RgbaImage::from_pixel(4, 4, image::Rgba([100, 100, 100, 255]));
        let mut actual = expected.clone();
        actual.put_pixel(2, 1, image::Rgba([101, 99, 100, 255]));

        assert_eq!(compare_images(&expected, &actual, 1), CompareResult::Match);
        assert_eq!(
            compare_images(&expected, &actual, 0),
            CompareResult::PixelMismatch {
                max_difference: 1,
                mismatched_pixels: 1,
                first_mismatch: (2, 1),
            }
        );
    }

    #[test]
    fn test_dimension_mismatch() {
        let result = compare_images(&image::RgbaImage::new(2, 3), &image::RgbaImage::new(3, 2), 255);
        assert_eq!(
            result,
            CompareResult::DimensionMismatch {
                expected_dimensions: (2, 3),
                actual_dimensions: (3, 2),
            }
        );
        assert!(!result.is_match());
    }
}

//! Magic-byte detection for `POST /api/images` uploads.

use pin_canvas::ImageFormat;

pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(ImageFormat::Png)
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpg)
    } else if bytes.starts_with(b"BM") {
        Some(ImageFormat::Bmp)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_png_signature() {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0; 4]);
        assert_eq!(detect_format(&bytes), Some(ImageFormat::Png));
    }

    #[test]
    fn detects_jpeg_signature() {
        assert_eq!(detect_format(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(ImageFormat::Jpg));
    }

    #[test]
    fn detects_bmp_signature() {
        assert_eq!(detect_format(&[b'B', b'M', 0, 0]), Some(ImageFormat::Bmp));
    }

    #[test]
    fn rejects_unknown_signature() {
        assert_eq!(detect_format(&[0, 1, 2, 3]), None);
    }
}

use uuid::Uuid;

/// Image formats accepted on recipe upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Bmp,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Webp => "image/webp",
            Self::Bmp => "image/bmp",
        }
    }
}

/// Checks the payload starts with a known image signature.
pub fn sniff_image(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(ImageFormat::Jpeg);
    }
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(ImageFormat::Png);
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some(ImageFormat::Gif);
    }
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return Some(ImageFormat::Webp);
    }
    if bytes.starts_with(b"BM") {
        return Some(ImageFormat::Bmp);
    }
    None
}

/// Object key for a freshly uploaded recipe image.
pub fn recipe_image_key(format: ImageFormat) -> String {
    format!("uploads/recipe/{}.{}", Uuid::new_v4(), format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniffs_known_signatures() {
        assert_eq!(
            sniff_image(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(
            sniff_image(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00]),
            Some(ImageFormat::Png)
        );
        assert_eq!(sniff_image(b"GIF89a...."), Some(ImageFormat::Gif));
        assert_eq!(
            sniff_image(b"RIFF\x10\x00\x00\x00WEBPVP8 "),
            Some(ImageFormat::Webp)
        );
        assert_eq!(sniff_image(b"BM\x00\x00"), Some(ImageFormat::Bmp));
    }

    #[test]
    fn rejects_non_image_payloads() {
        assert_eq!(sniff_image(b"notanimage"), None);
        assert_eq!(sniff_image(b"{\"json\": true}"), None);
        assert_eq!(sniff_image(b""), None);
        // RIFF container that is not WEBP (e.g. WAV)
        assert_eq!(sniff_image(b"RIFF\x10\x00\x00\x00WAVEfmt "), None);
    }

    #[test]
    fn keys_are_unique_and_carry_the_extension() {
        let a = recipe_image_key(ImageFormat::Jpeg);
        let b = recipe_image_key(ImageFormat::Jpeg);
        assert_ne!(a, b);
        assert!(a.starts_with("uploads/recipe/"));
        assert!(a.ends_with(".jpg"));
        assert!(recipe_image_key(ImageFormat::Png).ends_with(".png"));
    }
}

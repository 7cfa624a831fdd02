//! Media type guessing for uploaded parts.

use crate::types::media_type;

/// Guess from the bytes' magic numbers.
pub fn guess_from_bytes(bytes: &[u8]) -> Option<String> {
    infer::get(bytes).map(|k| k.mime_type().to_string())
}

/// Guess from a file name or URL extension.
pub fn guess_from_name(name: &str) -> Option<String> {
    mime_guess::from_path(name)
        .first_raw()
        .map(|s| s.to_string())
}

/// Combined guess for a multipart file part: the declared file name wins,
/// then the content itself, otherwise `application/octet-stream`.
pub fn guess_part_type(file_name: Option<&str>, bytes: &[u8]) -> String {
    if let Some(name) = file_name
        && let Some(m) = guess_from_name(name)
    {
        return m;
    }
    guess_from_bytes(bytes).unwrap_or_else(|| media_type::BIN.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_beats_content() {
        let png_magic = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        assert_eq!(guess_part_type(Some("notes.txt"), &png_magic), "text/plain");
        assert_eq!(guess_part_type(None, &png_magic), "image/png");
        assert_eq!(guess_part_type(Some("blob"), b"\x00\x01"), media_type::BIN);
    }
}

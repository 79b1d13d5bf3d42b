use std::path::Path;

use anyhow::{bail, Context, Result};

/// Read an uploaded transcript file.
///
/// This is the only place pipeline input can fail: a missing or unreadable
/// file, or content that is not UTF-8 text.
pub fn read_transcript(path: &Path) -> Result<String> {
    if !path.exists() {
        bail!("Transcript file not found: {:?}", path);
    }

    let bytes = std::fs::read(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    decode_transcript(&bytes).with_context(|| format!("Failed to decode transcript: {:?}", path))
}

/// Decode an uploaded transcript payload
pub fn decode_transcript(bytes: &[u8]) -> Result<String> {
    if bytes.is_empty() {
        bail!("Transcript is empty");
    }

    let text = std::str::from_utf8(bytes).context("Transcript is not valid UTF-8 text")?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    // Windows exports use CRLF line endings
    Ok(text.replace("\r\n", "\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_transcript() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "\u{feff}8/1/24, 9:05 AM - Alice: hi\r\n8/1/24, 9:06 AM - Bob: hey").unwrap();

        let text = read_transcript(file.path()).unwrap();

        assert!(text.starts_with("8/1/24"));
        assert!(!text.contains('\r'));
    }

    #[test]
    fn test_missing_file() {
        let err = read_transcript(Path::new("/definitely/not/here.txt")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_empty_and_binary_payloads() {
        assert!(decode_transcript(b"").is_err());
        assert!(decode_transcript(&[0xff, 0xfe, 0x00]).is_err());
    }
}

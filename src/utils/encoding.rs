//! Binary sniffing and file reading with encoding fallback.
//!
//! Reading strategy:
//! - BOM markers first (UTF-8, UTF-16 LE/BE)
//! - strict UTF-8 fast path
//! - `chardetng` guess for everything else
//! - UTF-8 with replacement characters as the last resort

use anyhow::{Context, Result};
use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Fraction of bytes in `sample` that are control characters other than
/// tab, line feed and carriage return. NUL and DEL count as control.
pub fn control_char_ratio(sample: &[u8]) -> f64 {
    if sample.is_empty() {
        return 0.0;
    }
    let control = sample
        .iter()
        .filter(|&&b| (b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r') || b == 0x7f)
        .count();
    control as f64 / sample.len() as f64
}

/// Detect if a file is binary by sampling its first `sample_size` bytes.
///
/// Files that cannot be opened are treated as binary so they never reach the bundle.
pub fn is_binary_file(path: &Path, sample_size: usize, threshold: f64) -> bool {
    is_binary_file_impl(path, sample_size, threshold).unwrap_or(true)
}

fn is_binary_file_impl(path: &Path, sample_size: usize, threshold: f64) -> Result<bool> {
    let mut file = File::open(path)?;
    let mut sample = vec![0u8; sample_size];
    let bytes_read = file.read(&mut sample)?;
    sample.truncate(bytes_read);

    // Counted even after a byte-order mark.
    Ok(control_char_ratio(&sample) > threshold)
}

/// Read a file as text, never failing on bad encodings.
pub fn read_file_safe(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(decode_bytes(&bytes))
}

fn decode_bytes(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xef, 0xbb, 0xbf]) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if bytes.starts_with(&[0xff, 0xfe]) {
        let (cow, _, _) = UTF_16LE.decode(bytes);
        return cow.into_owned();
    }
    if bytes.starts_with(&[0xfe, 0xff]) {
        let (cow, _, _) = UTF_16BE.decode(bytes);
        return cow.into_owned();
    }

    if let Ok(text) = std::str::from_utf8(bytes) {
        return text.to_string();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let guessed: &'static Encoding = detector.guess(None, true);
    let (cow, _, had_errors) = guessed.decode(bytes);
    if !had_errors {
        return cow.into_owned();
    }

    let (cow, _, _) = UTF_8.decode(bytes);
    cow.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_control_char_ratio_ignores_whitespace() {
        assert_eq!(control_char_ratio(b"a\tb\r\nc"), 0.0);
        assert_eq!(control_char_ratio(b""), 0.0);
        assert!((control_char_ratio(&[0x00, b'a', 0x01, b'b']) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_is_binary_null_bytes() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0x00, 0x01, 0x02, 0x03]).unwrap();
        file.flush().unwrap();

        assert!(is_binary_file(file.path(), 8192, 0.1));
    }

    #[test]
    fn test_is_not_binary_text() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all("Normal text file\nwith lines\n".as_bytes()).unwrap();
        file.flush().unwrap();

        assert!(!is_binary_file(file.path(), 8192, 0.1));
    }

    #[test]
    fn test_bom_prefix_does_not_hide_binary_content() {
        let mut file = NamedTempFile::new().unwrap();
        let mut body = vec![0xff, 0xfe];
        body.extend_from_slice(&[0x01; 200]);
        file.write_all(&body).unwrap();
        file.flush().unwrap();

        assert!(is_binary_file(file.path(), 8192, 0.1));
    }

    #[test]
    fn test_few_control_chars_stay_under_threshold() {
        let mut file = NamedTempFile::new().unwrap();
        let mut body = "x".repeat(99).into_bytes();
        body.push(0x07);
        file.write_all(&body).unwrap();
        file.flush().unwrap();

        assert!(!is_binary_file(file.path(), 8192, 0.1));
    }

    #[test]
    fn test_read_file_safe_utf8() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all("Test content 🚀".as_bytes()).unwrap();
        file.flush().unwrap();

        assert_eq!(read_file_safe(file.path()).unwrap(), "Test content 🚀");
    }

    #[test]
    fn test_read_file_safe_strips_utf8_bom() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0xef, 0xbb, 0xbf]).unwrap();
        file.write_all(b"Hello").unwrap();
        file.flush().unwrap();

        assert_eq!(read_file_safe(file.path()).unwrap(), "Hello");
    }

    #[test]
    fn test_read_file_safe_latin1_fallback() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"caf\xe9 au lait").unwrap();
        file.flush().unwrap();

        let text = read_file_safe(file.path()).unwrap();
        assert!(text.starts_with("caf"));
        assert!(text.ends_with("au lait"));
    }
}

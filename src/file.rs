use crate::error::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path};

/// Determines if a file is likely binary by analyzing its content.
///
/// # Algorithm
///
/// 1. Reads the first 8KB of the file
/// 2. Checks for null bytes (binary indicator)
/// 3. Calculates the ratio of ASCII characters
/// 4. Files with null bytes or low ASCII ratio are considered binary
///
/// # Errors
///
/// Returns an error if the file cannot be opened or read.
pub(crate) fn is_likely_binary(path: &Path) -> Result<bool> {
    const BUFFER_SIZE: usize = 8192;
    const ASCII_THRESHOLD: f64 = 0.85;

    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut buffer = [0u8; BUFFER_SIZE];

    let bytes_read = reader.read(&mut buffer).map_err(|e| Error::io(path, e))?;

    if bytes_read == 0 {
        return Ok(false);
    }

    let sample = &buffer[..bytes_read];

    if memchr::memchr(0, sample).is_some() {
        return Ok(true);
    }

    // Multi-byte UTF-8 is fine as long as the sample decodes. A character cut
    // at the buffer boundary reports no error_len.
    match std::str::from_utf8(sample) {
        Ok(_) => return Ok(false),
        Err(e) if e.error_len().is_none() => return Ok(false),
        Err(_) => {}
    }

    let ascii_count = sample.iter().filter(|&&b| b < 128).count();
    let ascii_ratio = ascii_count as f64 / bytes_read as f64;

    Ok(ascii_ratio < ASCII_THRESHOLD)
}

/// Reads a file as UTF-8 text, refusing binary content.
///
/// # Errors
///
/// Returns [`Error::InvalidUtf8`] for binary or non-UTF-8 files and
/// [`Error::Io`] when the file cannot be read.
pub(crate) fn read_text(path: &Path) -> Result<String> {
    if is_likely_binary(path)? {
        return Err(Error::invalid_utf8(path));
    }

    std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::InvalidData {
            Error::invalid_utf8(path)
        } else {
            Error::io(path, e)
        }
    })
}

/// Renders `path` relative to `root` with `/` separators.
#[must_use]
pub(crate) fn relative_path_string(path: &Path, root: &Path) -> String {
    let relative = pathdiff::diff_paths(path, root).unwrap_or_else(|| path.to_path_buf());

    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(name) => Some(name.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::io::Write;

    #[test]
    fn test_is_likely_binary_text_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("test.txt");
        file.write_str("Hello, world!").unwrap();

        assert!(!is_likely_binary(file.path()).unwrap());
    }

    #[test]
    fn test_is_likely_binary_unicode_text() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("notes.md");
        file.write_str("Привет, мир! Документация на русском.").unwrap();

        assert!(!is_likely_binary(file.path()).unwrap());
    }

    #[test]
    fn test_is_likely_binary_binary_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("test.bin");

        let mut f = File::create(file.path()).unwrap();
        f.write_all(&[0u8; 100]).unwrap();

        assert!(is_likely_binary(file.path()).unwrap());
    }

    #[test]
    fn test_is_likely_binary_empty_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("empty.txt");
        file.touch().unwrap();

        assert!(!is_likely_binary(file.path()).unwrap());
    }

    #[test]
    fn test_read_text_rejects_binary() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("image.py");
        file.write_binary(&[0x89, 0x50, 0x4e, 0x47, 0x00, 0x01]).unwrap();

        assert!(matches!(
            read_text(file.path()),
            Err(Error::InvalidUtf8 { .. })
        ));
    }

    #[test]
    fn test_read_text_missing_file() {
        let temp = assert_fs::TempDir::new().unwrap();
        let err = read_text(&temp.path().join("missing.rs")).unwrap_err();
        assert!(err.is_io());
    }

    #[test]
    fn test_relative_path_string() {
        let root = Path::new("/repo");
        assert_eq!(
            relative_path_string(Path::new("/repo/src/lib/mod.rs"), root),
            "src/lib/mod.rs"
        );
        assert_eq!(relative_path_string(Path::new("/repo"), root), "");
    }
}

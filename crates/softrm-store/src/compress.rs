//! Gzip compression of stored payloads.
//!
//! Standard gzip container at the fastest setting; only regular files ever
//! take this path.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;

/// Stream `source` through a gzip encoder into `dest`, carrying over the
/// source permissions. Returns the compressed size on disk.
pub fn compress_file(source: &Path, dest: &Path) -> io::Result<u64> {
    let src = File::open(source)?;
    let perms = src.metadata()?.permissions();

    let dst = File::create(dest)?;
    let mut encoder = GzEncoder::new(BufWriter::new(dst), Compression::fast());
    io::copy(&mut BufReader::new(src), &mut encoder)?;

    let writer = encoder.finish()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    // The payload must be durable before its metadata record commits.
    file.sync_all()?;

    fs::set_permissions(dest, perms)?;
    Ok(file.metadata()?.len())
}

/// Decompress a stored gzip payload directly to `dest`. Returns the number
/// of bytes written.
pub fn decompress_file(source: &Path, dest: &Path) -> io::Result<u64> {
    let src = File::open(source)?;
    let mut decoder = GzDecoder::new(BufReader::new(src));

    let dst = File::create(dest)?;
    let mut writer = BufWriter::new(dst);
    let written = io::copy(&mut decoder, &mut writer)?;
    writer.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_decompress_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.txt");
        let packed = dir.path().join("plain.txt.gz");
        let restored = dir.path().join("restored.txt");

        let content = b"hello hello hello hello hello".repeat(64);
        fs::write(&plain, &content).unwrap();

        let compressed_size = compress_file(&plain, &packed).unwrap();
        assert_eq!(compressed_size, fs::metadata(&packed).unwrap().len());
        // Repetitive input actually shrinks.
        assert!(compressed_size < content.len() as u64);

        let written = decompress_file(&packed, &restored).unwrap();
        assert_eq!(written, content.len() as u64);
        assert_eq!(fs::read(&restored).unwrap(), content);
    }

    #[test]
    fn test_compress_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("empty");
        let packed = dir.path().join("empty.gz");
        let restored = dir.path().join("back");

        fs::write(&plain, b"").unwrap();
        compress_file(&plain, &packed).unwrap();
        decompress_file(&packed, &restored).unwrap();
        assert_eq!(fs::read(&restored).unwrap(), b"");
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let garbage = dir.path().join("not-gzip");
        fs::write(&garbage, b"plain bytes, no gzip magic").unwrap();

        let err = decompress_file(&garbage, &dir.path().join("out")).unwrap_err();
        assert_ne!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[test]
    fn test_compress_preserves_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("script.sh");
        let packed = dir.path().join("script.sh.gz");

        fs::write(&plain, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&plain, fs::Permissions::from_mode(0o755)).unwrap();

        compress_file(&plain, &packed).unwrap();
        let mode = fs::metadata(&packed).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}

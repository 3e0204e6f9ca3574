//! Transparent decompression of SQL dump files.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Read buffer for dump scanning
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Compression format detected from file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Bzip2,
    Xz,
    Zstd,
}

impl Compression {
    /// Detect compression format from file extension
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("gz" | "gzip") => Compression::Gzip,
            Some("bz2" | "bzip2") => Compression::Bzip2,
            Some("xz" | "lzma") => Compression::Xz,
            Some("zst" | "zstd") => Compression::Zstd,
            _ => Compression::None,
        }
    }

    /// Wrap a reader with the appropriate decompressor
    pub fn wrap_reader<'a>(&self, reader: Box<dyn Read + 'a>) -> io::Result<Box<dyn Read + 'a>> {
        Ok(match self {
            Compression::None => reader,
            Compression::Gzip => Box::new(flate2::read::GzDecoder::new(reader)),
            Compression::Bzip2 => Box::new(bzip2::read::BzDecoder::new(reader)),
            Compression::Xz => Box::new(xz2::read::XzDecoder::new(reader)),
            Compression::Zstd => Box::new(zstd::stream::read::Decoder::new(reader)?),
        })
    }

    /// Open `path` for buffered reading, decompressing by extension
    pub fn open(path: &Path) -> io::Result<Box<dyn BufRead>> {
        let file = File::open(path)?;
        let reader = Self::from_path(path).wrap_reader(Box::new(file))?;
        Ok(Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, reader)))
    }
}

impl std::fmt::Display for Compression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compression::None => write!(f, "none"),
            Compression::Gzip => write!(f, "gzip"),
            Compression::Bzip2 => write!(f, "bzip2"),
            Compression::Xz => write!(f, "xz"),
            Compression::Zstd => write!(f, "zstd"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_detect_from_extension() {
        assert_eq!(Compression::from_path(Path::new("dump.sql.gz")), Compression::Gzip);
        assert_eq!(Compression::from_path(Path::new("dump.SQL.ZST")), Compression::Zstd);
        assert_eq!(Compression::from_path(Path::new("dump.sql.bz2")), Compression::Bzip2);
        assert_eq!(Compression::from_path(Path::new("dump.sql.xz")), Compression::Xz);
        assert_eq!(Compression::from_path(Path::new("dump.sql")), Compression::None);
    }

    #[test]
    fn test_open_gzip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dump.sql.gz");

        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"CREATE TABLE users (id INT);").unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();

        let mut content = String::new();
        Compression::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "CREATE TABLE users (id INT);");
    }
}

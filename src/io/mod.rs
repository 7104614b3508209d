/// Byte stream backends for disk images

/// Gzip-compressed streams
pub mod gzip;
/// Stream trait with file and memory implementations
pub mod stream;

pub use gzip::GzipStream;
pub use stream::{FileStream, MemStream, Stream};

use crate::error::Result;
use std::path::Path;

/// Check if a path ends with the given extension, ignoring case
///
/// `ext` may contain several parts, such as `"sbt.gz"`.
pub fn has_extension<P: AsRef<Path>>(path: P, ext: &str) -> bool {
    path.as_ref()
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| {
            let name = n.to_ascii_lowercase();
            name.len() > ext.len() + 1 && name.ends_with(&format!(".{}", ext.to_ascii_lowercase()))
        })
        .unwrap_or(false)
}

/// Open a host file, transparently decompressing gzip data
pub fn open_stream<P: AsRef<Path>>(path: P, read_only: bool) -> Result<Box<dyn Stream>> {
    let mut stream: Box<dyn Stream> = Box::new(FileStream::open(&path, read_only)?);

    if gzip::detect(stream.as_mut()) {
        stream = Box::new(GzipStream::new(stream)?);
    }

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_extension() {
        assert!(has_extension("test.mgt", "mgt"));
        assert!(has_extension("TEST.MGT", "mgt"));
        assert!(has_extension("/path/to/game.sbt.gz", "sbt.gz"));
        assert!(has_extension("game.SBT", "sbt"));
        assert!(!has_extension("game.sbt.gz", "sbt"));
        assert!(!has_extension(".sbt", "sbt"));
        assert!(!has_extension("test.dsk", "mgt"));
    }
}

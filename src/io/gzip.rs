/// Gzip-compressed streams
///
/// The whole image is decompressed when the stream is opened. Writes are
/// collected in memory and compressed back into the inner stream on flush.

use crate::error::{DiskError, Result};
use crate::io::Stream;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

// Only support deflate-based gzips
const GZIP_SIGNATURE: &[u8; 3] = b"\x1F\x8B\x08";
const MAX_FILE_SIZE: usize = 10_000_000;

/// Check if a stream holds gzip data
pub fn detect(stream: &mut dyn Stream) -> bool {
    stream
        .peek(GZIP_SIGNATURE.len())
        .map(|magic| magic == GZIP_SIGNATURE)
        .unwrap_or(false)
}

/// Stream presenting the decompressed contents of a gzip stream
pub struct GzipStream {
    inner: Box<dyn Stream>,
    data: Vec<u8>,
    pos: usize,
    pending: Option<Vec<u8>>,
}

impl GzipStream {
    /// Decompress `inner` into a new stream
    pub fn new(mut inner: Box<dyn Stream>) -> Result<Self> {
        let compressed = inner.read_all()?;
        let mut decoder = GzDecoder::new(compressed.as_slice()).take(MAX_FILE_SIZE as u64 + 1);
        let mut data = Vec::new();
        decoder.read_to_end(&mut data)?;

        if data.len() > MAX_FILE_SIZE {
            return Err(DiskError::invalid_format("Decompressed file too large"));
        }

        log::debug!(
            "GzipStream::new(): {} expanded from {} to {} bytes",
            inner.path(),
            compressed.len(),
            data.len()
        );

        Ok(Self {
            inner,
            data,
            pos: 0,
            pending: None,
        })
    }
}

impl Stream for GzipStream {
    fn path(&self) -> &str {
        self.inner.path()
    }

    fn is_read_only(&self) -> bool {
        self.inner.is_read_only()
    }

    fn size(&mut self) -> Result<usize> {
        Ok(self.data.len())
    }

    fn rewind(&mut self) -> Result<()> {
        self.flush()?;
        self.pos = 0;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let available = self.data.len().saturating_sub(self.pos);
        let len = buf.len().min(available);
        buf[..len].copy_from_slice(&self.data[self.pos..self.pos + len]);
        self.pos += len;
        Ok(len)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.is_read_only() {
            return Err(DiskError::ReadOnly(self.path().to_string()));
        }

        self.pending.get_or_insert_with(Vec::new).extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&pending)?;
        let compressed = encoder.finish()?;

        self.inner.rewind()?;
        self.inner.write(&compressed)?;
        self.inner.flush()?;
        self.inner.rewind()?;

        self.data = pending;
        self.pos = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemStream;

    fn compress(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_detect() {
        let mut gz = MemStream::new("a.gz", compress(b"hello"));
        let mut plain = MemStream::new("a.img", b"hello".to_vec());
        assert!(detect(&mut gz));
        assert!(!detect(&mut plain));
    }

    #[test]
    fn test_decompress() {
        let inner = MemStream::new("disk.sbt.gz", compress(&[0x42; 1000]));
        let mut stream = GzipStream::new(Box::new(inner)).unwrap();
        assert_eq!(stream.size().unwrap(), 1000);
        assert_eq!(stream.read_all().unwrap(), vec![0x42; 1000]);
        assert_eq!(stream.path(), "disk.sbt.gz");
    }

    #[test]
    fn test_write_recompresses() {
        let inner = MemStream::new("disk.mgt.gz", compress(&[0; 64]));
        let handle = inner.clone();
        let mut stream = GzipStream::new(Box::new(inner)).unwrap();

        stream.rewind().unwrap();
        stream.write(&[7; 32]).unwrap();
        stream.flush().unwrap();

        let contents = handle.contents();
        let mut decoder = GzDecoder::new(contents.as_slice());
        let mut data = Vec::new();
        decoder.read_to_end(&mut data).unwrap();
        assert_eq!(data, vec![7; 32]);
        assert_eq!(stream.read_all().unwrap(), vec![7; 32]);
    }

    #[test]
    fn test_size_limit() {
        let inner = MemStream::new("big.gz", compress(&vec![0; MAX_FILE_SIZE]));
        assert_eq!(GzipStream::new(Box::new(inner)).unwrap().size().unwrap(), MAX_FILE_SIZE);

        let inner = MemStream::new("huge.gz", compress(&vec![0; MAX_FILE_SIZE + 1]));
        let result = GzipStream::new(Box::new(inner));
        assert!(matches!(result, Err(DiskError::InvalidFormat(_))));
    }

    #[test]
    fn test_invalid_data() {
        let inner = MemStream::new("bad.gz", b"\x1F\x8B\x08garbage".to_vec());
        assert!(GzipStream::new(Box::new(inner)).is_err());
    }
}

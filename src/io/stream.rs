/// Byte streams backing disk images

use crate::error::{DiskError, Result};
use crate::image::floppy::FloppyDevice;
use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// A rewindable byte stream holding a disk image
///
/// Streams are read and written sequentially from the last rewind. The
/// first write after a rewind replaces the stream contents, so saving an
/// image is always rewind, write everything, flush.
pub trait Stream {
    /// Path or name the stream was opened from
    fn path(&self) -> &str;

    /// Check if writes are refused
    fn is_read_only(&self) -> bool;

    /// Total size of the stream contents in bytes
    fn size(&mut self) -> Result<usize>;

    /// Return to the start of the stream
    fn rewind(&mut self) -> Result<()>;

    /// Read up to `buf.len()` bytes, returning the number read
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Write all of `buf`, returning the number of bytes written
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Push any buffered writes to the backing store
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    /// Raw floppy device behind this stream, if any
    fn device(&mut self) -> Option<&mut dyn FloppyDevice> {
        None
    }

    /// Read the whole stream from the start
    fn read_all(&mut self) -> Result<Vec<u8>> {
        let size = self.size()?;
        self.rewind()?;
        let mut data = vec![0u8; size];
        let read = self.read(&mut data)?;
        data.truncate(read);
        self.rewind()?;
        Ok(data)
    }

    /// Read the first bytes of the stream without consuming it
    fn peek(&mut self, len: usize) -> Result<Vec<u8>> {
        self.rewind()?;
        let mut data = vec![0u8; len];
        let read = self.read(&mut data)?;
        data.truncate(read);
        self.rewind()?;
        Ok(data)
    }
}

enum Mode {
    Closed,
    Reading(File),
    Writing(File),
}

/// Stream over a host file
///
/// The file is reopened for reading after each rewind, and truncated by the
/// first write that follows a rewind.
pub struct FileStream {
    path: PathBuf,
    name: String,
    read_only: bool,
    mode: Mode,
}

impl FileStream {
    /// Open an existing file
    ///
    /// A file that can't be opened for writing is opened read-only instead.
    pub fn open<P: AsRef<Path>>(path: P, read_only: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        File::open(&path)?;

        let read_only = read_only
            || OpenOptions::new()
                .read(true)
                .write(true)
                .open(&path)
                .is_err();

        Ok(Self {
            name: path.to_string_lossy().into_owned(),
            path,
            read_only,
            mode: Mode::Closed,
        })
    }
}

impl Stream for FileStream {
    fn path(&self) -> &str {
        &self.name
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn size(&mut self) -> Result<usize> {
        Ok(std::fs::metadata(&self.path)?.len() as usize)
    }

    fn rewind(&mut self) -> Result<()> {
        self.flush()?;
        self.mode = Mode::Closed;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if !matches!(self.mode, Mode::Reading(_)) {
            self.flush()?;
            self.mode = Mode::Reading(File::open(&self.path)?);
        }

        let Mode::Reading(file) = &mut self.mode else {
            return Ok(0);
        };

        let mut total = 0;
        while total < buf.len() {
            match file.read(&mut buf[total..])? {
                0 => break,
                n => total += n,
            }
        }
        Ok(total)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.read_only {
            return Err(DiskError::ReadOnly(self.name.clone()));
        }

        if !matches!(self.mode, Mode::Writing(_)) {
            self.mode = Mode::Writing(File::create(&self.path)?);
        }

        if let Mode::Writing(file) = &mut self.mode {
            file.write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<()> {
        if let Mode::Writing(file) = &mut self.mode {
            file.flush()?;
        }
        Ok(())
    }
}

/// In-memory stream
///
/// Clones share the same buffer, so a caller can keep a handle and inspect
/// what a disk image saved.
#[derive(Clone)]
pub struct MemStream {
    name: String,
    data: Rc<RefCell<Vec<u8>>>,
    pos: usize,
    writing: bool,
    read_only: bool,
}

impl MemStream {
    /// Create a stream over a copy of `data`
    pub fn new<S: Into<String>>(name: S, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data: Rc::new(RefCell::new(data)),
            pos: 0,
            writing: false,
            read_only: false,
        }
    }

    /// Mark the stream as read-only
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Copy of the current contents
    pub fn contents(&self) -> Vec<u8> {
        self.data.borrow().clone()
    }
}

impl Stream for MemStream {
    fn path(&self) -> &str {
        &self.name
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn size(&mut self) -> Result<usize> {
        Ok(self.data.borrow().len())
    }

    fn rewind(&mut self) -> Result<()> {
        self.pos = 0;
        self.writing = false;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let data = self.data.borrow();
        let available = data.len().saturating_sub(self.pos);
        let len = buf.len().min(available);
        buf[..len].copy_from_slice(&data[self.pos..self.pos + len]);
        self.pos += len;
        Ok(len)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.read_only {
            return Err(DiskError::ReadOnly(self.name.clone()));
        }

        let mut data = self.data.borrow_mut();
        if !self.writing {
            data.clear();
            self.pos = 0;
            self.writing = true;
        }

        data.extend_from_slice(buf);
        self.pos += buf.len();
        Ok(buf.len())
    }
}

//! File-backed byte source

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use super::errors::{check_range, SourceResult};
use super::ByteSource;

/// A plain file used as a byte source.
///
/// The length is cached; the file is only resized through [`ByteSource::resize`].
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    file: File,
    length: u64,
}

impl FileSource {
    /// Creates (or truncates) the file at `path`.
    pub fn create(path: &Path) -> SourceResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            length: 0,
        })
    }

    /// Opens an existing file for read/write.
    pub fn open(path: &Path) -> SourceResult<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let length = file.metadata()?.len();
        Ok(Self {
            path: path.to_path_buf(),
            file,
            length,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn length(&self) -> SourceResult<u64> {
        Ok(self.length)
    }

    fn resize(&mut self, new_length: u64) -> SourceResult<()> {
        self.file.set_len(new_length)?;
        self.length = new_length;
        Ok(())
    }

    fn read_range(&mut self, offset: u64, buf: &mut [u8]) -> SourceResult<()> {
        check_range(offset, buf.len(), self.length)?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_range(&mut self, offset: u64, data: &[u8]) -> SourceResult<()> {
        check_range(offset, data.len(), self.length)?;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> SourceResult<()> {
        self.file.flush()?;
        self.file.sync_all()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_source_persists_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bytes.bin");

        {
            let mut source = FileSource::create(&path).unwrap();
            source.resize(6).unwrap();
            source.write_range(1, b"abcd").unwrap();
            source.flush().unwrap();
        }

        let mut source = FileSource::open(&path).unwrap();
        assert_eq!(source.length().unwrap(), 6);
        let mut buf = [0u8; 6];
        source.read_range(0, &mut buf).unwrap();
        assert_eq!(&buf, b"\0abcd\0");
    }

    #[test]
    fn test_file_source_bounds() {
        let dir = TempDir::new().unwrap();
        let mut source = FileSource::create(&dir.path().join("b.bin")).unwrap();
        source.resize(2).unwrap();
        let mut buf = [0u8; 3];
        assert!(source.read_range(0, &mut buf).is_err());
        assert!(source.write_range(1, &[1, 2]).is_err());
    }
}

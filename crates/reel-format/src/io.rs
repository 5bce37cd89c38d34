//! I/O 抽象层.
//!
//! [`IoContext`] 在任意 [`IoBackend`] 上提供带读缓冲的小端读写接口,
//! 内置文件与内存两种后端.

use std::io::{self, Read, Seek, SeekFrom, Write};

use reel_core::{ReelError, ReelResult};

/// I/O 后端
pub trait IoBackend: Send {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    fn write_all(&mut self, buf: &[u8]) -> io::Result<()>;
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;
    fn position(&mut self) -> io::Result<u64>;
    /// 总大小, 未知时为 `None`
    fn size(&self) -> Option<u64>;
    fn is_seekable(&self) -> bool;
}

const BUFFER_SIZE: usize = 32 * 1024;

/// I/O 上下文
pub struct IoContext {
    inner: Box<dyn IoBackend>,
    buffer: Vec<u8>,
    /// 缓冲区中有效数据长度
    buf_len: usize,
    /// 缓冲区读取位置
    buf_pos: usize,
}

impl IoContext {
    pub fn new(backend: Box<dyn IoBackend>) -> Self {
        Self {
            inner: backend,
            buffer: vec![0u8; BUFFER_SIZE],
            buf_len: 0,
            buf_pos: 0,
        }
    }

    /// 以只读方式打开文件
    pub fn open_read(path: &str) -> ReelResult<Self> {
        let file = std::fs::File::open(path)?;
        Ok(Self::new(Box::new(FileBackend::new(file))))
    }

    /// 以读写方式创建文件 (截断已有内容)
    pub fn open_write(path: &str) -> ReelResult<Self> {
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Self::new(Box::new(FileBackend::new(file))))
    }

    /// 填满 `buf`, 数据不足时返回 `Eof`
    pub fn read_exact(&mut self, buf: &mut [u8]) -> ReelResult<()> {
        let mut filled = 0;
        while filled < buf.len() {
            if self.buf_pos == self.buf_len {
                self.buf_pos = 0;
                self.buf_len = self.inner.read(&mut self.buffer)?;
                if self.buf_len == 0 {
                    return Err(ReelError::Eof);
                }
            }
            let n = (self.buf_len - self.buf_pos).min(buf.len() - filled);
            buf[filled..filled + n].copy_from_slice(&self.buffer[self.buf_pos..self.buf_pos + n]);
            self.buf_pos += n;
            filled += n;
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, count: usize) -> ReelResult<Vec<u8>> {
        let mut buf = vec![0u8; count];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// 读取到末尾, 返回读到的字节
    pub fn read_to_end(&mut self) -> ReelResult<Vec<u8>> {
        let mut out = self.buffer[self.buf_pos..self.buf_len].to_vec();
        self.buf_pos = self.buf_len;
        let mut chunk = vec![0u8; BUFFER_SIZE];
        loop {
            let n = self.inner.read(&mut chunk)?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&chunk[..n]);
        }
    }

    pub fn read_u8(&mut self) -> ReelResult<u8> {
        let mut b = [0u8; 1];
        self.read_exact(&mut b)?;
        Ok(b[0])
    }

    pub fn read_u16_le(&mut self) -> ReelResult<u16> {
        let mut b = [0u8; 2];
        self.read_exact(&mut b)?;
        Ok(u16::from_le_bytes(b))
    }

    pub fn read_u32_le(&mut self) -> ReelResult<u32> {
        let mut b = [0u8; 4];
        self.read_exact(&mut b)?;
        Ok(u32::from_le_bytes(b))
    }

    /// 读取 4 字节标签 (FourCC)
    pub fn read_tag(&mut self) -> ReelResult<[u8; 4]> {
        let mut tag = [0u8; 4];
        self.read_exact(&mut tag)?;
        Ok(tag)
    }

    /// 跳过 `count` 字节
    pub fn skip(&mut self, count: usize) -> ReelResult<()> {
        let buffered = self.buf_len - self.buf_pos;
        if count <= buffered {
            self.buf_pos += count;
            return Ok(());
        }
        let rest = count - buffered;
        self.buf_pos = self.buf_len;
        if self.inner.is_seekable() {
            self.inner.seek(SeekFrom::Current(rest as i64))?;
            return Ok(());
        }
        let mut left = rest;
        while left > 0 {
            let n = self.inner.read(&mut self.buffer[..left.min(BUFFER_SIZE)])?;
            if n == 0 {
                return Err(ReelError::Eof);
            }
            left -= n;
        }
        self.buf_pos = 0;
        self.buf_len = 0;
        Ok(())
    }

    pub fn write_all(&mut self, buf: &[u8]) -> ReelResult<()> {
        self.inner.write_all(buf)?;
        Ok(())
    }

    pub fn write_u16_le(&mut self, v: u16) -> ReelResult<()> {
        self.write_all(&v.to_le_bytes())
    }

    pub fn write_u32_le(&mut self, v: u32) -> ReelResult<()> {
        self.write_all(&v.to_le_bytes())
    }

    pub fn write_tag(&mut self, tag: &[u8; 4]) -> ReelResult<()> {
        self.write_all(tag)
    }

    /// 定位, 同时清空读缓冲
    pub fn seek(&mut self, pos: SeekFrom) -> ReelResult<u64> {
        self.buf_pos = 0;
        self.buf_len = 0;
        Ok(self.inner.seek(pos)?)
    }

    /// 逻辑位置 (扣除读缓冲中尚未消费的部分)
    pub fn position(&mut self) -> ReelResult<u64> {
        let raw = self.inner.position()?;
        Ok(raw - (self.buf_len - self.buf_pos) as u64)
    }

    pub fn is_seekable(&self) -> bool {
        self.inner.is_seekable()
    }

    pub fn size(&self) -> Option<u64> {
        self.inner.size()
    }
}

/// 文件后端
struct FileBackend {
    file: std::fs::File,
}

impl FileBackend {
    fn new(file: std::fs::File) -> Self {
        Self { file }
    }
}

impl IoBackend for FileBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.file.write_all(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }

    fn position(&mut self) -> io::Result<u64> {
        self.file.stream_position()
    }

    fn size(&self) -> Option<u64> {
        self.file.metadata().ok().map(|m| m.len())
    }

    fn is_seekable(&self) -> bool {
        true
    }
}

/// 内存后端, 写入时在当前位置覆盖或追加
#[derive(Debug, Default)]
pub struct MemoryBackend {
    data: Vec<u8>,
    pos: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_data(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl IoBackend for MemoryBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let start = self.pos.min(self.data.len());
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        self.pos = start + n;
        Ok(n)
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let end = self.pos + buf.len();
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        self.data[self.pos..end].copy_from_slice(buf);
        self.pos = end;
        Ok(())
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(off) => i64::try_from(off).unwrap_or(i64::MAX),
            SeekFrom::End(off) => self.data.len() as i64 + off,
            SeekFrom::Current(off) => self.pos as i64 + off,
        };
        if target < 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "seek 位置不能为负"));
        }
        self.pos = target as usize;
        Ok(self.pos as u64)
    }

    fn position(&mut self) -> io::Result<u64> {
        Ok(self.pos as u64)
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    fn is_seekable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_backend_roundtrip() {
        let mut io = IoContext::new(Box::new(MemoryBackend::new()));
        io.write_tag(b"RIFF").unwrap();
        io.write_u32_le(0).unwrap();
        io.write_u16_le(0xBEEF).unwrap();
        // 回填
        io.seek(SeekFrom::Start(4)).unwrap();
        io.write_u32_le(42).unwrap();

        io.seek(SeekFrom::Start(0)).unwrap();
        assert_eq!(&io.read_tag().unwrap(), b"RIFF");
        assert_eq!(io.read_u32_le().unwrap(), 42);
        assert_eq!(io.position().unwrap(), 8);
        assert_eq!(io.read_u16_le().unwrap(), 0xBEEF);
        assert!(matches!(io.read_u8(), Err(ReelError::Eof)));
    }

    #[test]
    fn test_skip_and_eof() {
        let mut io = IoContext::new(Box::new(MemoryBackend::from_data((0..10).collect())));
        io.skip(3).unwrap();
        assert_eq!(io.read_u8().unwrap(), 3);
        io.skip(2).unwrap();
        assert_eq!(io.read_to_end().unwrap(), vec![6, 7, 8, 9]);
        assert!(io.read_to_end().unwrap().is_empty());
    }

    #[test]
    fn test_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("io.bin");
        let path = path.to_str().unwrap();
        {
            let mut io = IoContext::open_write(path).unwrap();
            io.write_all(&[1, 2, 3, 4]).unwrap();
        }
        let mut io = IoContext::open_read(path).unwrap();
        assert_eq!(io.size(), Some(4));
        assert_eq!(io.read_bytes(4).unwrap(), vec![1, 2, 3, 4]);
    }
}

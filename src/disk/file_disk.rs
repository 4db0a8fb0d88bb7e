use std::{
    fs::{File, OpenOptions},
    io::{Read, Result, Seek, SeekFrom, Write},
    path::PathBuf,
};

use crate::disk::{block_device::BlockDevice, types::ByteOffset};

/// 以宿主机上的一个普通文件作为磁盘镜像。
///
/// 每次操作都重新打开文件，不长期持有句柄：
/// 外部进程替换或截断镜像后，下一次访问就能看到。
#[derive(Debug, Clone)]
pub struct FileDisk {
    path: PathBuf,
}

impl FileDisk {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn open_read(&self) -> Result<File> {
        OpenOptions::new().read(true).open(&self.path)
    }

    // 只写打开，不创建：镜像必须已经存在
    fn open_write(&self) -> Result<File> {
        OpenOptions::new().write(true).open(&self.path)
    }
}

impl BlockDevice for FileDisk {
    fn size(&self) -> Result<u64> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    fn read_image(&self, buf: &mut [u8]) -> Result<()> {
        let mut file = self.open_read()?;
        file.read_exact(buf)?;
        Ok(())
    }

    fn write_image(&self, buf: &[u8]) -> Result<()> {
        let mut file = self.open_write()?;
        file.write_all(buf)?;
        file.flush()?;
        Ok(())
    }

    fn read_at(&self, offset: ByteOffset, buf: &mut [u8]) -> Result<usize> {
        let mut file = self.open_read()?;
        file.seek(SeekFrom::Start(offset.0))?;

        // 读到 buf 满或文件结尾为止
        let mut read = 0;
        while read < buf.len() {
            match file.read(&mut buf[read..])? {
                0 => break,
                n => read += n,
            }
        }
        Ok(read)
    }

    fn write_at(&self, offset: ByteOffset, buf: &[u8]) -> Result<usize> {
        let mut file = self.open_write()?;
        file.seek(SeekFrom::Start(offset.0))?;
        file.write_all(buf)?;
        Ok(buf.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn ranged_io_hits_absolute_offsets() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("disk.img");
        std::fs::write(&path, vec![0u8; 1024]).expect("seed image");

        let disk = FileDisk::new(&path);
        assert_eq!(disk.write_at(ByteOffset(600), b"abc").expect("write"), 3);

        let mut buf = [0u8; 3];
        assert_eq!(disk.read_at(ByteOffset(600), &mut buf).expect("read"), 3);
        assert_eq!(&buf, b"abc");
        assert_eq!(disk.size().expect("len"), 1024);
    }

    #[test]
    fn short_read_at_end_of_file() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("disk.img");
        std::fs::write(&path, vec![7u8; 10]).expect("seed image");

        let disk = FileDisk::new(&path);
        let mut buf = [0u8; 8];
        assert_eq!(disk.read_at(ByteOffset(6), &mut buf).expect("read"), 4);
        assert_eq!(&buf[..4], &[7, 7, 7, 7]);
    }

    #[test]
    fn missing_image_is_not_created() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("absent.img");

        let disk = FileDisk::new(&path);
        assert!(disk.write_at(ByteOffset(0), b"x").is_err());
        assert!(!path.exists());
    }
}

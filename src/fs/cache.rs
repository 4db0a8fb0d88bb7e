use log::{debug, warn};

use crate::{
    disk::{BlockDevice, ByteOffset},
    fs::{
        config::CachePolicy,
        error::{FileSystemError, Result},
        image::DiskImage,
        layout::DiskLayout,
    },
};

/// 内存镜像相对镜像文件的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    Clean, // 与镜像文件一致
    Dirty, // 有未回写的修改
}

/// 镜像文件在内存中的唯一副本
///
/// 每次修改都遵循 Clean -> Dirty -> (flush) -> Clean；
/// 开始新的修改之前，上一次留下的 Dirty 一定先被回写。
#[derive(Debug)]
pub struct DiskCache<D: BlockDevice> {
    device: D,
    image: DiskImage,
    state: CacheState,
    policy: CachePolicy,
    stale: bool, // 内存镜像含有未能撤销的半成品，下次访问前必须重新读取
}

impl<D: BlockDevice> DiskCache<D> {
    /// 加载整个镜像。镜像文件不存在或不够大都视为不可用
    pub fn open(device: D, layout: DiskLayout, policy: CachePolicy, path: &std::path::Path) -> Result<Self> {
        let unavailable = |source: std::io::Error| FileSystemError::BackingFileUnavailable {
            path: path.to_path_buf(),
            source,
        };

        let size = device.size().map_err(unavailable)?;
        if size < layout.total_size {
            return Err(unavailable(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("image is {} bytes, expected {}", size, layout.total_size),
            )));
        }

        let mut image = DiskImage::zeroed(layout);
        device.read_image(image.as_bytes_mut()).map_err(unavailable)?;
        debug!("cache: loaded {} byte image", layout.total_size);

        Ok(Self {
            device,
            image,
            state: CacheState::Clean,
            policy,
            stale: false,
        })
    }

    pub fn state(&self) -> CacheState {
        self.state
    }

    pub fn layout(&self) -> &DiskLayout {
        self.image.layout()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    /// 将内存镜像整体写回镜像文件
    pub fn flush(&mut self) -> Result<()> {
        self.device
            .write_image(self.image.as_bytes())
            .map_err(FileSystemError::BadDescriptor)?;
        self.state = CacheState::Clean;
        debug!("cache: flushed image");
        Ok(())
    }

    fn reload(&mut self) -> Result<()> {
        self.device
            .read_image(self.image.as_bytes_mut())
            .map_err(FileSystemError::BadDescriptor)?;
        self.stale = false;
        debug!("cache: reloaded image");
        Ok(())
    }

    /// 取得当前镜像：先回写遗留的修改，再按策略决定是否重新读取
    pub fn access(&mut self) -> Result<&DiskImage> {
        if self.state == CacheState::Dirty {
            warn!("cache: image still dirty from an earlier change, flushing first");
            self.flush()?;
        }
        if self.policy == CachePolicy::Reload || self.stale {
            self.reload()?;
        }
        Ok(&self.image)
    }

    /// 在镜像上执行一次结构性修改并立即回写
    ///
    /// `apply` 失败时丢弃内存中的半成品，从镜像文件恢复。
    pub fn mutate<T>(&mut self, apply: impl FnOnce(&mut DiskImage) -> Result<T>) -> Result<T> {
        self.access()?;
        debug_assert_eq!(self.state, CacheState::Clean);

        self.state = CacheState::Dirty;
        match apply(&mut self.image) {
            Ok(value) => {
                self.flush()?;
                Ok(value)
            }
            Err(e) => {
                // 半成品绝不能回写；重新读取失败时留到下次访问再读
                self.state = CacheState::Clean;
                self.stale = true;
                self.reload()?;
                Err(e)
            }
        }
    }

    /// 直接从镜像文件读取文件数据（pread）
    pub fn read_data(&mut self, offset: ByteOffset, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        let read = self
            .device
            .read_at(offset, &mut buf)
            .map_err(FileSystemError::BadDescriptor)?;
        buf.truncate(read);
        Ok(buf)
    }

    /// 直接向镜像文件写入文件数据（pwrite），同时更新内存副本
    pub fn write_data(&mut self, offset: ByteOffset, data: &[u8]) -> Result<usize> {
        let written = self
            .device
            .write_at(offset, data)
            .map_err(FileSystemError::BadDescriptor)?;
        self.image.write_range(offset, &data[..written]);
        Ok(written)
    }

    #[cfg(test)]
    pub(crate) fn mark_dirty(&mut self) {
        self.state = CacheState::Dirty;
    }

    #[cfg(test)]
    pub(crate) fn image_mut(&mut self) -> &mut DiskImage {
        &mut self.image
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        disk::{format_image, BlockIndex, FileDisk},
        fs::config::BitmapLayout,
    };
    use tempfile::TempDir;

    fn open_cache(policy: CachePolicy) -> (TempDir, DiskCache<FileDisk>) {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("disk.img");
        let layout = DiskLayout::new(BitmapLayout::Legacy);
        format_image(&path, &layout).expect("format");
        let cache = DiskCache::open(FileDisk::new(&path), layout, policy, &path).expect("open");
        (dir, cache)
    }

    #[test]
    fn missing_image_is_unavailable() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("absent.img");
        let err = DiskCache::open(FileDisk::new(&path), DiskLayout::default(), CachePolicy::Reload, &path)
            .expect_err("must fail");
        assert!(err.is_fatal());
    }

    #[test]
    fn undersized_image_is_unavailable() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("small.img");
        std::fs::write(&path, vec![0u8; 4096]).expect("seed");
        let err = DiskCache::open(FileDisk::new(&path), DiskLayout::default(), CachePolicy::Reload, &path)
            .expect_err("must fail");
        assert!(matches!(err, FileSystemError::BackingFileUnavailable { .. }));
    }

    #[test]
    fn mutation_is_flushed_and_leaves_cache_clean() {
        let (_dir, mut cache) = open_cache(CachePolicy::Reload);
        cache
            .mutate(|image| {
                image.block_mut(BlockIndex(3))[0] = 0xAB;
                Ok(())
            })
            .expect("mutate");
        assert_eq!(cache.state(), CacheState::Clean);

        // 重新读取后修改仍在，说明已经落盘
        let image = cache.access().expect("access");
        assert_eq!(image.block(BlockIndex(3))[0], 0xAB);
    }

    #[test]
    fn failed_mutation_is_discarded() {
        let (_dir, mut cache) = open_cache(CachePolicy::Authoritative);
        let result: Result<()> = cache.mutate(|image| {
            image.block_mut(BlockIndex(3))[0] = 0xAB;
            Err(FileSystemError::NotPermitted("/x".into()))
        });
        assert!(result.is_err());
        assert_eq!(cache.state(), CacheState::Clean);
        assert_eq!(cache.access().expect("access").block(BlockIndex(3))[0], 0);
    }

    #[test]
    fn failed_rollback_never_flushes_the_partial_change() {
        let (dir, mut cache) = open_cache(CachePolicy::Authoritative);
        let path = dir.path().join("disk.img");

        let result: Result<()> = cache.mutate(|image| {
            image.block_mut(BlockIndex(3))[0] = 0xAB;
            std::fs::remove_file(&path).expect("remove image");
            Err(FileSystemError::NotPermitted("/x".into()))
        });
        assert!(matches!(result, Err(FileSystemError::BadDescriptor(_))));
        assert_eq!(cache.state(), CacheState::Clean);

        // 镜像恢复后，下一次访问丢弃半成品并重新读取
        format_image(&path, cache.layout()).expect("format");
        assert_eq!(cache.access().expect("access").block(BlockIndex(3))[0], 0);
        assert_eq!(cache.state(), CacheState::Clean);
    }

    #[test]
    fn leftover_dirty_state_is_flushed_before_next_access() {
        let (_dir, mut cache) = open_cache(CachePolicy::Reload);
        cache.image_mut().block_mut(BlockIndex(4))[1] = 7;
        cache.mark_dirty();

        // Reload 策略下，如果没有先回写，这次修改会被重新读取覆盖
        let image = cache.access().expect("access");
        assert_eq!(image.block(BlockIndex(4))[1], 7);
        assert_eq!(cache.state(), CacheState::Clean);
    }

    #[test]
    fn reload_policy_sees_external_writes() {
        let (_dir, mut cache) = open_cache(CachePolicy::Reload);
        cache.device().write_at(BlockIndex(5).byte_offset(), b"zz").expect("external write");
        assert_eq!(&cache.access().expect("access").block(BlockIndex(5))[..2], b"zz");
    }

    #[test]
    fn data_writes_are_mirrored_in_memory() {
        let (_dir, mut cache) = open_cache(CachePolicy::Authoritative);
        let offset = BlockIndex(6).byte_offset().add(3);
        assert_eq!(cache.write_data(offset, b"hello").expect("write"), 5);
        assert_eq!(cache.read_data(offset, 5).expect("read"), b"hello");
        assert_eq!(cache.access().expect("access").read_range(offset, 5), b"hello");
    }
}

use std::path::Path;

use log::{debug, info, warn};

use crate::{
    disk::{BlockDevice, BlockIndex, FileDisk},
    fs::{
        attr::FileAttr,
        cache::{CacheState, DiskCache},
        config::{CachePolicy, FsConfig},
        directory::{DirRecord, DirectoryEntry, FileRecord, RootDirectory},
        error::{FileSystemError, Result},
        image::DiskImage,
        layout::DiskLayout,
        path::{resolve, resolve_for_create, resolve_for_mkdir, PathInfo},
    },
};

pub mod attr;
pub mod bitmap;
pub mod cache;
pub mod config;
pub mod directory;
pub mod error;
pub mod image;
pub mod layout;
pub mod path;

/// 宿主桥接层调用的全部文件系统操作
///
/// 所有操作都以路径为参数，单线程调用；需要多线程分发时由调用方加锁。
#[derive(Debug)]
pub struct FileSystem<D: BlockDevice = FileDisk> {
    cache: DiskCache<D>, // 唯一的内存镜像
}

impl FileSystem<FileDisk> {
    /// 挂载已存在的镜像文件。镜像不可用时返回致命错误
    pub fn mount(config: &FsConfig) -> Result<Self> {
        let layout = DiskLayout::new(config.bitmap);
        let device = FileDisk::new(&config.image_path);
        let fs = Self::with_device(device, layout, config.cache_policy, &config.image_path)?;
        info!(
            "mounted {} ({:?} bitmap, {:?} cache)",
            config.image_path.display(),
            config.bitmap,
            config.cache_policy
        );
        Ok(fs)
    }
}

impl<D: BlockDevice> FileSystem<D> {
    pub fn with_device(device: D, layout: DiskLayout, policy: CachePolicy, path: &Path) -> Result<Self> {
        Ok(Self {
            cache: DiskCache::open(device, layout, policy, path)?,
        })
    }

    pub fn cache_state(&self) -> CacheState {
        self.cache.state()
    }

    pub fn layout(&self) -> &DiskLayout {
        self.cache.layout()
    }

    /// 剩余可分配块数
    pub fn free_blocks(&mut self) -> Result<u64> {
        Ok(self.cache.access()?.bitmap().free_count())
    }

    fn root(image: &DiskImage) -> Result<RootDirectory> {
        RootDirectory::decode(image.block(BlockIndex::ROOT), image.layout())
    }

    fn directory(image: &DiskImage, dir: &DirRecord) -> Result<DirectoryEntry> {
        DirectoryEntry::decode(image.block(dir.start), image.layout())
    }

    // 按 /dir/name.ext 找到文件项
    fn lookup_file(&mut self, info: &PathInfo, path: &str) -> Result<FileRecord> {
        let not_found = || FileSystemError::NotFound(path.to_string());
        if info.depth != 2 {
            return Err(not_found());
        }

        let image = self.cache.access()?;
        let root = Self::root(image)?;
        let dir = root.find(&info.dir_name).ok_or_else(not_found)?;
        let file = Self::directory(image, dir)?
            .find(&info.file_name, &info.extension)
            .cloned()
            .ok_or_else(not_found)?;

        // 数据块必须在位图中标记为已用，否则起始块号不可信
        if let Some(start) = file.start {
            let bitmap = image.bitmap();
            let blocks = BlockIndex::blocks_for(file.size);
            if (start.0..start.0 + blocks).any(|b| !bitmap.is_used(BlockIndex(b))) {
                return Err(FileSystemError::Corrupted(format!(
                    "{} data at {} is not allocated in the bitmap",
                    path, start
                )));
            }
        }
        Ok(file)
    }

    /// 查询属性：根目录和子目录报告为目录，文件报告为普通文件及其大小
    pub fn get_attributes(&mut self, path: &str) -> Result<FileAttr> {
        let info = resolve(path);
        if info.has_file() {
            let file = self.lookup_file(&info, path)?;
            return Ok(FileAttr::file(file.size));
        }

        let image = self.cache.access()?;
        if info.is_root() {
            return Ok(FileAttr::directory());
        }

        let not_found = || FileSystemError::NotFound(path.to_string());
        // 嵌套目录不存在
        if !info.is_directory() {
            return Err(not_found());
        }
        Self::root(image)?
            .find(&info.dir_name)
            .map(|_| FileAttr::directory())
            .ok_or_else(not_found)
    }

    /// 列出目录内容，`.` 与 `..` 总在最前。找不到目录时只返回这两项
    pub fn list_directory(&mut self, path: &str) -> Result<Vec<String>> {
        let info = resolve(path);
        let image = self.cache.access()?;
        let root = Self::root(image)?;

        let mut names = vec![".".to_string(), "..".to_string()];
        if info.is_root() {
            names.extend(root.names().map(str::to_string));
        } else if info.is_directory() {
            if let Some(dir) = root.find(&info.dir_name) {
                names.extend(Self::directory(image, dir)?.listing());
            }
        }
        Ok(names)
    }

    /// 在根目录下创建子目录，返回其目录项记录所在块
    pub fn create_directory(&mut self, path: &str) -> Result<BlockIndex> {
        let name = resolve_for_mkdir(path)?;
        if name.is_empty() {
            return Err(FileSystemError::AlreadyExists(path.to_string()));
        }

        let start = self.cache.mutate(|image| {
            let mut root = Self::root(image)?;
            if root.find(&name).is_some() {
                return Err(FileSystemError::AlreadyExists(path.to_string()));
            }
            if root.is_full() {
                return Err(FileSystemError::NotPermitted(path.to_string()));
            }

            let start = image
                .bitmap()
                .find_first_free()
                .ok_or_else(|| FileSystemError::NotPermitted(path.to_string()))?;
            image.bitmap_mut().mark_range(start, 1, true);

            DirectoryEntry::default().encode(image.block_mut(start))?;
            root.directories.push(DirRecord { name, start });
            root.encode(image.block_mut(BlockIndex::ROOT))?;
            Ok(start)
        })?;

        debug!("mkdir {} -> {}", path, start);
        Ok(start)
    }

    /// 在子目录中创建空文件，数据块在第一次写入时才分配
    pub fn create_file(&mut self, path: &str) -> Result<()> {
        let info = resolve_for_create(path)?;
        // 根目录下不能直接放文件
        if info.is_root() || info.depth < 2 || !info.has_file() {
            return Err(FileSystemError::NotPermitted(path.to_string()));
        }

        self.cache.mutate(|image| {
            let root = Self::root(image)?;
            let dir = root
                .find(&info.dir_name)
                .ok_or_else(|| FileSystemError::NotPermitted(path.to_string()))?;

            let mut entry = Self::directory(image, dir)?;
            if entry.find(&info.file_name, &info.extension).is_some() {
                return Err(FileSystemError::AlreadyExists(path.to_string()));
            }
            if entry.is_full() {
                return Err(FileSystemError::NotPermitted(path.to_string()));
            }

            entry.files.push(FileRecord {
                name: info.file_name.clone(),
                ext: info.extension.clone(),
                size: 0,
                start: None,
            });
            entry.encode(image.block_mut(dir.start))
        })?;

        debug!("mknod {}", path);
        Ok(())
    }

    /// 读取文件内容：总是从文件开头读，最多 `size` 字节，`offset` 不参与
    pub fn read(&mut self, path: &str, size: usize, offset: u64) -> Result<Vec<u8>> {
        let info = resolve(path);
        if !info.has_file() {
            return Err(FileSystemError::IsADirectory(path.to_string()));
        }

        let file = self.lookup_file(&info, path)?;
        if offset != 0 {
            debug!("read {}: offset {} ignored, whole-file reads only", path, offset);
        }

        let Some(start) = file.start else {
            return Ok(Vec::new());
        };
        let len = (file.size as usize).min(size);
        self.cache.read_data(start.byte_offset(), len)
    }

    /// 写入文件。第一次写入时按本次长度分配连续块并确定文件大小，
    /// 之后的写入不能超出这个大小
    pub fn write(&mut self, path: &str, buf: &[u8], offset: u64) -> Result<usize> {
        let info = resolve(path);
        if !info.has_file() {
            return Err(FileSystemError::IsADirectory(path.to_string()));
        }

        let mut file = self.lookup_file(&info, path)?;
        let size = buf.len() as u64;

        if file.start.is_none() && size > 0 {
            file = self.allocate(&info, path, size)?;
        }

        let too_large = offset.checked_add(size).map_or(true, |end| end > file.size);
        if too_large {
            return Err(FileSystemError::FileTooLarge(path.to_string()));
        }

        // 空文件上写 0 字节
        let Some(start) = file.start else {
            return Ok(0);
        };
        self.cache.write_data(start.byte_offset().add(offset), buf)
    }

    // 为从未写过的文件分配 ceil(size / 512) 个连续块
    fn allocate(&mut self, info: &PathInfo, path: &str, size: u64) -> Result<FileRecord> {
        let blocks = BlockIndex::blocks_for(size);

        let file = self.cache.mutate(|image| {
            let not_found = || FileSystemError::NotFound(path.to_string());
            let root = Self::root(image)?;
            let dir = root.find(&info.dir_name).ok_or_else(not_found)?;
            let mut entry = Self::directory(image, dir)?;

            let start = image
                .bitmap()
                .find_free_range(blocks)
                .ok_or_else(|| {
                    warn!("no run of {} free block(s) for {}", blocks, path);
                    FileSystemError::FileTooLarge(path.to_string())
                })?;
            image.bitmap_mut().mark_range(start, blocks, true);

            let file = entry
                .find_mut(&info.file_name, &info.extension)
                .ok_or_else(not_found)?;
            file.start = Some(start);
            file.size = size;
            let file = file.clone();

            entry.encode(image.block_mut(dir.start))?;
            Ok(file)
        })?;

        debug!("allocated {} block(s) at {} for {}", blocks, file.start.map_or(0, |b| b.0), path);
        Ok(file)
    }

    /// 删除目录：不支持，直接成功
    pub fn remove_directory(&mut self, path: &str) -> Result<()> {
        debug!("rmdir {} ignored", path);
        Ok(())
    }

    /// 删除文件：不支持，直接成功
    pub fn remove_file(&mut self, path: &str) -> Result<()> {
        debug!("unlink {} ignored", path);
        Ok(())
    }

    pub fn open(&mut self, _path: &str) -> Result<()> {
        Ok(())
    }

    pub fn flush(&mut self, _path: &str) -> Result<()> {
        Ok(())
    }

    pub fn truncate(&mut self, _path: &str, _size: u64) -> Result<()> {
        Ok(())
    }
}

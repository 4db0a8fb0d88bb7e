use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::disk::BLOCK_SIZE;

/// 默认镜像路径（相对于当前工作目录）
pub const DEFAULT_IMAGE_PATH: &str = ".disk";

// 8.3 文件名
pub const MAX_FILENAME: usize = 8;
pub const MAX_EXTENSION: usize = 3;

/// 旧镜像格式里位图区域的字节数，远大于 8960 个块实际需要的 1120 字节
pub const LEGACY_BITMAP_SIZE: usize = 655_360;

/// 记录头部：i32 计数
pub const RECORD_COUNT_SIZE: usize = 4;

/// 根目录项：名字 8+1 字节 + i64 起始块
pub const ROOT_ENTRY_SIZE: usize = (MAX_FILENAME + 1) + 8;

/// 目录内文件项：名字 8+1 + 扩展名 3+1 + u64 大小 + i64 起始块
pub const FILE_ENTRY_SIZE: usize = (MAX_FILENAME + 1) + (MAX_EXTENSION + 1) + 8 + 8;

/// 根目录最多容纳的子目录数：(512 - 4) / 17 = 29
pub const MAX_DIRS_IN_ROOT: usize = (BLOCK_SIZE - RECORD_COUNT_SIZE) / ROOT_ENTRY_SIZE;

/// 每个目录最多容纳的文件数：(512 - 4) / 29 = 17
pub const MAX_FILES_IN_DIR: usize = (BLOCK_SIZE - RECORD_COUNT_SIZE) / FILE_ENTRY_SIZE;

/// 位图区域的大小策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BitmapLayout {
    /// 与旧镜像几何布局相同：固定 655360 字节的位图。
    /// 旧镜像中以字节偏移保存的起始块不兼容，读取时报告为损坏
    #[default]
    Legacy,
    /// 位图恰好覆盖所有块：ceil(N / 8) 字节
    Compact,
}

/// 缓存在两次回写之间如何对待内存镜像
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CachePolicy {
    /// 每次访问都从镜像文件重新读取
    #[default]
    Reload,
    /// 内存镜像即为权威副本，只在修改后回写
    Authoritative,
}

/// 挂载参数
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsConfig {
    pub image_path: PathBuf,
    pub bitmap: BitmapLayout,
    pub cache_policy: CachePolicy,
}

impl FsConfig {
    pub fn new(image_path: impl Into<PathBuf>) -> Self {
        Self {
            image_path: image_path.into(),
            ..Self::default()
        }
    }
}

impl Default for FsConfig {
    fn default() -> Self {
        Self {
            image_path: PathBuf::from(DEFAULT_IMAGE_PATH),
            bitmap: BitmapLayout::default(),
            cache_policy: CachePolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_capacities_match_legacy_format() {
        assert_eq!(ROOT_ENTRY_SIZE, 17);
        assert_eq!(FILE_ENTRY_SIZE, 29);
        assert_eq!(MAX_DIRS_IN_ROOT, 29);
        assert_eq!(MAX_FILES_IN_DIR, 17);
    }
}

//! flatfs：单个镜像文件上的两级 8.3 文件系统存储引擎
//!
//! 镜像由 512 字节的块数组和其后的空闲位图组成。块 0 是根目录，
//! 根目录下每个子目录占一个块，文件数据是一段连续的块。

pub mod disk;
pub mod fs;
mod utils;

pub use fs::{
    attr::{FileAttr, FileKind, FileMode},
    cache::CacheState,
    config::{BitmapLayout, CachePolicy, FsConfig},
    error::{FileSystemError, Result},
    FileSystem,
};

use std::path::PathBuf;

use thiserror::Error;

// errno 常量（Linux），供宿主桥接层返回负值错误码
const EPERM: i32 = 1;
const ENOENT: i32 = 2;
const EIO: i32 = 5;
const EBADF: i32 = 9;
const EEXIST: i32 = 17;
const EISDIR: i32 = 21;
const EFBIG: i32 = 27;
const ENAMETOOLONG: i32 = 36;

/// 文件系统错误类型
#[derive(Debug, Error)]
pub enum FileSystemError {
    #[error("File or directory not found: {0}")]
    NotFound(String), // 查找失败，带路径
    #[error("Name does not fit 8.3 format: {0}")]
    NameTooLong(String), // 名字超过 8 或扩展名超过 3
    #[error("Operation not permitted: {0}")]
    NotPermitted(String), // 层级、容量或根目录限制
    #[error("File or directory already exists: {0}")]
    AlreadyExists(String), // 重名
    #[error("Expected a file, found a directory: {0}")]
    IsADirectory(String), // 对目录做读写
    #[error("File too large: {0}")]
    FileTooLarge(String), // 分配失败或写越界
    #[error("Backing image I/O failed: {0}")]
    BadDescriptor(#[source] std::io::Error), // 读写镜像文件失败
    #[error("Backing image unavailable at {path}: {source}")]
    BackingFileUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    }, // 无法加载镜像，挂载失败（致命）
    #[error("File system corrupted: {0}")]
    Corrupted(String), // 元数据记录不合法
    #[error("Disk I/O error: {0}")]
    Io(#[from] std::io::Error), // 格式化等其他 I/O 错误
}

impl FileSystemError {
    /// 桥接层约定的返回值：负的 errno
    pub fn errno(&self) -> i32 {
        let code = match self {
            Self::NotFound(_) => ENOENT,
            Self::NameTooLong(_) => ENAMETOOLONG,
            Self::NotPermitted(_) => EPERM,
            Self::AlreadyExists(_) => EEXIST,
            Self::IsADirectory(_) => EISDIR,
            Self::FileTooLarge(_) => EFBIG,
            Self::BadDescriptor(_) | Self::BackingFileUnavailable { .. } => EBADF,
            Self::Corrupted(_) | Self::Io(_) => EIO,
        };
        -code
    }

    /// 是否为挂载阶段的致命错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BackingFileUnavailable { .. })
    }
}

/// 文件系统统一结果类型
pub type Result<T> = std::result::Result<T, FileSystemError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errno_follows_fuse_convention() {
        assert_eq!(FileSystemError::NotFound("/x".into()).errno(), -2);
        assert_eq!(FileSystemError::NameTooLong("/x".into()).errno(), -36);
        assert_eq!(FileSystemError::NotPermitted("/x".into()).errno(), -1);
        assert_eq!(FileSystemError::AlreadyExists("/x".into()).errno(), -17);
        assert_eq!(FileSystemError::IsADirectory("/x".into()).errno(), -21);
        assert_eq!(FileSystemError::FileTooLarge("/x".into()).errno(), -27);
        let io = std::io::Error::other("boom");
        assert_eq!(FileSystemError::BadDescriptor(io).errno(), -9);
    }

    #[test]
    fn only_unavailable_backing_file_is_fatal() {
        let err = FileSystemError::BackingFileUnavailable {
            path: PathBuf::from(".disk"),
            source: std::io::Error::from(std::io::ErrorKind::NotFound),
        };
        assert!(err.is_fatal());
        assert!(!FileSystemError::NotFound("/x".into()).is_fatal());
    }
}

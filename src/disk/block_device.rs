use std::io::Result;

use crate::disk::types::ByteOffset;

/// 镜像的持久化后端。整块镜像读写用于缓存的加载与回写，
/// 按偏移读写用于文件数据（类似 pread/pwrite）。
pub trait BlockDevice: Send + Sync {
    /// 后端当前长度（字节）
    fn size(&self) -> Result<u64>;
    /// 从偏移 0 开始读满 `buf`
    fn read_image(&self, buf: &mut [u8]) -> Result<()>;
    /// 从偏移 0 开始写入整个镜像
    fn write_image(&self, buf: &[u8]) -> Result<()>;
    /// 从 `offset` 读取最多 `buf.len()` 字节，返回实际读到的字节数
    fn read_at(&self, offset: ByteOffset, buf: &mut [u8]) -> Result<usize>;
    /// 在 `offset` 写入 `buf`，返回写入的字节数
    fn write_at(&self, offset: ByteOffset, buf: &[u8]) -> Result<usize>;
}

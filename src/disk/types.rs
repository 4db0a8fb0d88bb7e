use std::fmt;

use serde::{Deserialize, Serialize};

/// 每个逻辑块（Block）的大小：512 字节
/// 元数据记录与文件数据都以块为单位寻址。
pub const BLOCK_SIZE: usize = 512;

/// 虚拟磁盘总大小（单位：字节）：5MB
/// 镜像文件必须预先分配到这个大小。
pub const DISK_SIZE: u64 = 5 * 1024 * 1024;

/// 一个逻辑块类型（每块 512 字节的字节数组）
pub type Block = [u8; BLOCK_SIZE];

/// 块号。分配器发放的、目录记录里保存的都是块号。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockIndex(pub u64);

/// 镜像内的绝对字节偏移，只在真正读写镜像文件时出现。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ByteOffset(pub u64);

impl BlockIndex {
    /// 根目录所在的块
    pub const ROOT: BlockIndex = BlockIndex(0);

    pub fn byte_offset(self) -> ByteOffset {
        ByteOffset(self.0 * BLOCK_SIZE as u64)
    }

    /// 存放 `len` 字节需要的块数（向上取整）
    pub fn blocks_for(len: u64) -> u64 {
        len.div_ceil(BLOCK_SIZE as u64)
    }
}

impl ByteOffset {
    pub fn add(self, delta: u64) -> ByteOffset {
        ByteOffset(self.0.saturating_add(delta))
    }
}

impl fmt::Display for BlockIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block #{}", self.0)
    }
}

impl fmt::Display for ByteOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "byte {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_index_maps_to_byte_offset() {
        assert_eq!(BlockIndex(0).byte_offset(), ByteOffset(0));
        assert_eq!(BlockIndex(3).byte_offset(), ByteOffset(1536));
        assert_eq!(BlockIndex(3).byte_offset().add(10), ByteOffset(1546));
    }

    #[test]
    fn blocks_for_rounds_up() {
        assert_eq!(BlockIndex::blocks_for(0), 0);
        assert_eq!(BlockIndex::blocks_for(1), 1);
        assert_eq!(BlockIndex::blocks_for(512), 1);
        assert_eq!(BlockIndex::blocks_for(513), 2);
    }
}

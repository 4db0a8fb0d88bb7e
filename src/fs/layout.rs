use serde::{Deserialize, Serialize};

use crate::{
    disk::{BlockIndex, ByteOffset, BLOCK_SIZE, DISK_SIZE},
    fs::config::{BitmapLayout, LEGACY_BITMAP_SIZE},
};

/// 镜像的几何信息：块数组在前，位图紧随其后
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskLayout {
    pub total_size: u64,    // 镜像总字节数
    pub block_count: u64,   // 块数组中的块数 N
    pub bitmap_offset: u64, // 位图区域起始偏移 = N * BLOCK_SIZE
    pub bitmap_len: u64,    // 位图区域字节数
}

impl DiskLayout {
    pub fn new(bitmap: BitmapLayout) -> Self {
        Self::with_size(DISK_SIZE, bitmap)
    }

    pub fn with_size(total_size: u64, bitmap: BitmapLayout) -> Self {
        let block_size = BLOCK_SIZE as u64;
        let (block_count, bitmap_len) = match bitmap {
            BitmapLayout::Legacy => {
                let bitmap_len = LEGACY_BITMAP_SIZE as u64;
                ((total_size - bitmap_len) / block_size, bitmap_len)
            }
            BitmapLayout::Compact => {
                // 每块占 512 字节 + 1 bit：N * (8 * 512 + 1) <= 8 * total
                let mut n = total_size * 8 / (8 * block_size + 1);
                while n * block_size + n.div_ceil(8) > total_size {
                    n -= 1;
                }
                (n, n.div_ceil(8))
            }
        };

        Self {
            total_size,
            block_count,
            bitmap_offset: block_count * block_size,
            bitmap_len,
        }
    }

    pub fn contains_block(&self, block: BlockIndex) -> bool {
        block.0 < self.block_count
    }

    /// 块数组结束位置：文件数据不能越过这里
    pub fn data_end(&self) -> ByteOffset {
        ByteOffset(self.bitmap_offset)
    }
}

impl Default for DiskLayout {
    fn default() -> Self {
        Self::new(BitmapLayout::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_layout_matches_reference_image() {
        let layout = DiskLayout::new(BitmapLayout::Legacy);
        assert_eq!(layout.total_size, 5_242_880);
        assert_eq!(layout.block_count, 8960);
        assert_eq!(layout.bitmap_offset, 4_587_520);
        assert_eq!(layout.bitmap_len, 655_360);
    }

    #[test]
    fn compact_layout_covers_exactly_its_blocks() {
        let layout = DiskLayout::new(BitmapLayout::Compact);
        assert_eq!(layout.block_count, 10_237);
        assert_eq!(layout.bitmap_len, 1280);
        assert!(layout.bitmap_offset + layout.bitmap_len <= layout.total_size);
        // 再多一个块就放不下了
        let n = layout.block_count + 1;
        assert!(n * BLOCK_SIZE as u64 + n.div_ceil(8) > layout.total_size);
    }
}

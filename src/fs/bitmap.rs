use log::debug;

use crate::disk::BlockIndex;

/// 块位图：每个 bit 表示一个块是否被使用（0 空闲，1 已用）
///
/// 位图本身存放在镜像里，这里只是对那段字节的视图。
/// 只读操作需要 `B: AsRef<[u8]>`，标记操作还需要 `AsMut`。
#[derive(Debug)]
pub struct Bitmap<B> {
    bits: B,           // 位图字节，bit i 在第 i/8 个字节的第 i%8 位
    total_blocks: u64, // 有效位数，超出部分是填充
}

impl<B: AsRef<[u8]>> Bitmap<B> {
    pub fn new(bits: B, total_blocks: u64) -> Self {
        debug_assert!(bits.as_ref().len() as u64 * 8 >= total_blocks);
        Self { bits, total_blocks }
    }

    pub fn is_used(&self, block: BlockIndex) -> bool {
        let byte_index = (block.0 / 8) as usize;
        let bit_index = (block.0 % 8) as u8;
        self.bits.as_ref()[byte_index] & (1 << bit_index) != 0
    }

    // 第一个可分配的块：块 0 是根目录，永远不发放
    fn first_candidate(&self) -> u64 {
        BlockIndex::ROOT.0 + 1
    }

    /// 找到第一个空闲块；位图耗尽时返回 None
    pub fn find_first_free(&self) -> Option<BlockIndex> {
        let bytes = self.bits.as_ref();
        let mut index = self.first_candidate();

        while index < self.total_blocks {
            let byte = bytes[(index / 8) as usize];
            if byte == 0xFF && index % 8 == 0 {
                // 整个字节都已用，直接跳过
                index += 8;
                continue;
            }
            if byte & (1 << (index % 8)) == 0 {
                debug!("bitmap: first free block at {}", index);
                return Some(BlockIndex(index));
            }
            index += 1;
        }
        None
    }

    /// 找到第一段连续 `len` 个空闲块，返回起始块号
    pub fn find_free_range(&self, len: u64) -> Option<BlockIndex> {
        if len == 0 {
            return self.find_first_free();
        }

        let mut start = self.first_candidate();
        let mut run = 0;
        let mut index = start;

        while index < self.total_blocks {
            if self.is_used(BlockIndex(index)) {
                run = 0;
                start = index + 1;
            } else {
                run += 1;
                if run == len {
                    debug!("bitmap: free run of {} blocks at {}", len, start);
                    return Some(BlockIndex(start));
                }
            }
            index += 1;
        }
        None
    }

    /// 当前空闲块数（不含保留的根目录块）
    pub fn free_count(&self) -> u64 {
        (self.first_candidate()..self.total_blocks)
            .filter(|&i| !self.is_used(BlockIndex(i)))
            .count() as u64
    }
}

impl<B: AsRef<[u8]> + AsMut<[u8]>> Bitmap<B> {
    /// 将从 `start` 开始的 `len` 个 bit 设为 `used`
    ///
    /// 调用方负责保证范围落在块数组之内。
    pub fn mark_range(&mut self, start: BlockIndex, len: u64, used: bool) {
        debug_assert!(start.0 + len <= self.total_blocks, "bitmap range out of bounds");

        let bytes = self.bits.as_mut();
        for i in start.0..start.0 + len {
            let byte_index = (i / 8) as usize;
            let mask = 1u8 << (i % 8);
            if used {
                bytes[byte_index] |= mask;
            } else {
                bytes[byte_index] &= !mask;
            }
        }
        debug!(
            "bitmap: marked {} block(s) from {} as {}",
            len,
            start.0,
            if used { "used" } else { "free" }
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap(total_blocks: u64) -> Bitmap<Vec<u8>> {
        Bitmap::new(vec![0u8; total_blocks.div_ceil(8) as usize], total_blocks)
    }

    #[test]
    fn root_block_is_never_offered() {
        let bm = bitmap(16);
        assert_eq!(bm.find_first_free(), Some(BlockIndex(1)));
        assert_eq!(bm.find_free_range(3), Some(BlockIndex(1)));
    }

    #[test]
    fn first_free_skips_used_blocks() {
        let mut bm = bitmap(32);
        bm.mark_range(BlockIndex(0), 11, true);
        assert_eq!(bm.find_first_free(), Some(BlockIndex(11)));
        assert!(bm.is_used(BlockIndex(10)));
        assert!(!bm.is_used(BlockIndex(11)));
    }

    #[test]
    fn exhausted_bitmap_returns_none() {
        let mut bm = bitmap(10);
        bm.mark_range(BlockIndex(0), 10, true);
        assert_eq!(bm.find_first_free(), None);
        assert_eq!(bm.free_count(), 0);
    }

    #[test]
    fn padding_bits_are_not_allocatable() {
        // 10 个块占 2 个字节，后 6 位是填充
        let mut bm = bitmap(10);
        bm.mark_range(BlockIndex(0), 9, true);
        assert_eq!(bm.find_first_free(), Some(BlockIndex(9)));
        assert_eq!(bm.find_free_range(2), None);
    }

    #[test]
    fn free_range_skips_holes_that_are_too_small() {
        let mut bm = bitmap(24);
        bm.mark_range(BlockIndex(0), 1, true);
        bm.mark_range(BlockIndex(3), 1, true);
        // 1..3 只有两个空闲块
        assert_eq!(bm.find_free_range(3), Some(BlockIndex(4)));
        assert_eq!(bm.find_free_range(2), Some(BlockIndex(1)));
    }

    #[test]
    fn mark_range_can_clear_bits() {
        let mut bm = bitmap(16);
        bm.mark_range(BlockIndex(1), 5, true);
        assert_eq!(bm.free_count(), 10);
        bm.mark_range(BlockIndex(2), 2, false);
        assert_eq!(bm.find_first_free(), Some(BlockIndex(2)));
        assert_eq!(bm.free_count(), 12);
    }
}

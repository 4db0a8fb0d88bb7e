use crate::{
    disk::{Block, BlockIndex, ByteOffset, BLOCK_SIZE},
    fs::{bitmap::Bitmap, layout::DiskLayout},
};

/// 整个镜像在内存中的副本（扁平化存储）
#[derive(Debug, Clone)]
pub struct DiskImage {
    bytes: Vec<u8>,
    layout: DiskLayout,
}

impl DiskImage {
    /// 全零镜像
    pub fn zeroed(layout: DiskLayout) -> Self {
        Self {
            bytes: vec![0u8; layout.total_size as usize],
            layout,
        }
    }

    pub fn layout(&self) -> &DiskLayout {
        &self.layout
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    fn block_range(&self, index: BlockIndex) -> std::ops::Range<usize> {
        assert!(
            self.layout.contains_block(index),
            "block {} outside image of {} blocks",
            index.0,
            self.layout.block_count
        );
        let start = index.byte_offset().0 as usize;
        start..start + BLOCK_SIZE
    }

    pub fn block(&self, index: BlockIndex) -> &Block {
        let range = self.block_range(index);
        // 长度恰好是 BLOCK_SIZE，转换不会失败
        (&self.bytes[range]).try_into().unwrap()
    }

    pub fn block_mut(&mut self, index: BlockIndex) -> &mut Block {
        let range = self.block_range(index);
        (&mut self.bytes[range]).try_into().unwrap()
    }

    fn bitmap_range(&self) -> std::ops::Range<usize> {
        let start = self.layout.bitmap_offset as usize;
        start..start + self.layout.bitmap_len as usize
    }

    pub fn bitmap(&self) -> Bitmap<&[u8]> {
        let range = self.bitmap_range();
        Bitmap::new(&self.bytes[range], self.layout.block_count)
    }

    pub fn bitmap_mut(&mut self) -> Bitmap<&mut [u8]> {
        let range = self.bitmap_range();
        let total_blocks = self.layout.block_count;
        Bitmap::new(&mut self.bytes[range], total_blocks)
    }

    /// 将文件数据同步进内存副本，越界部分被截断
    pub fn write_range(&mut self, offset: ByteOffset, data: &[u8]) {
        let start = (offset.0 as usize).min(self.bytes.len());
        let end = (start + data.len()).min(self.bytes.len());
        self.bytes[start..end].copy_from_slice(&data[..end - start]);
    }

    pub fn read_range(&self, offset: ByteOffset, len: usize) -> &[u8] {
        let start = (offset.0 as usize).min(self.bytes.len());
        let end = (start + len).min(self.bytes.len());
        &self.bytes[start..end]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::config::BitmapLayout;

    #[test]
    fn blocks_and_bitmap_are_disjoint() {
        let mut image = DiskImage::zeroed(DiskLayout::new(BitmapLayout::Legacy));
        let last = BlockIndex(image.layout().block_count - 1);
        image.block_mut(last).fill(0xFF);

        let bitmap = image.bitmap();
        assert_eq!(bitmap.free_count(), image.layout().block_count - 1);
    }

    #[test]
    fn bitmap_updates_land_in_the_image() {
        let mut image = DiskImage::zeroed(DiskLayout::new(BitmapLayout::Compact));
        image.bitmap_mut().mark_range(BlockIndex(0), 9, true);

        let offset = image.layout().bitmap_offset as usize;
        assert_eq!(&image.as_bytes()[offset..offset + 2], &[0xFF, 0x01]);
    }

    #[test]
    fn ranged_access_is_clamped_to_the_image() {
        let mut image = DiskImage::zeroed(DiskLayout::default());
        let end = image.layout().total_size;
        image.write_range(ByteOffset(end - 2), b"abcd");
        assert_eq!(image.read_range(ByteOffset(end - 2), 4), b"ab");
    }
}

use std::{
    fs::OpenOptions,
    io::{Seek, SeekFrom, Write},
    path::{Path, PathBuf},
    sync::mpsc::Sender,
};

use log::info;

use crate::{
    disk::types::{BlockIndex, BLOCK_SIZE},
    fs::{error::FileSystemError, layout::DiskLayout},
};

/// 格式化过程中发给界面的进度消息
#[derive(Debug)]
pub enum BootProgress {
    Step(&'static str),
    Progress(u64), // 0..=100
    Finished(Result<PathBuf, FileSystemError>),
}

// 每次写 64KB，顺便汇报一次进度
const CHUNK_SIZE: usize = 128 * BLOCK_SIZE;

fn write_image(path: &Path, layout: &DiskLayout, mut progress: impl FnMut(u64)) -> Result<(), FileSystemError> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    // 块数组与位图全部清零：根目录计数为 0，没有已用块
    let zeros = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;
    while written < layout.total_size {
        let len = (layout.total_size - written).min(CHUNK_SIZE as u64) as usize;
        file.write_all(&zeros[..len])?;
        written += len as u64;
        progress(written * 100 / layout.total_size);
    }

    // 块 0 归根目录所有
    let root = BlockIndex::ROOT.0;
    file.seek(SeekFrom::Start(layout.bitmap_offset + root / 8))?;
    file.write_all(&[1u8 << (root % 8)])?;
    file.sync_all()?;

    info!(
        "formatted {} ({} blocks, {} byte bitmap)",
        path.display(),
        layout.block_count,
        layout.bitmap_len
    );
    Ok(())
}

/// 创建一个全新的、预先分配好大小的镜像文件（已存在则覆盖）
pub fn format_image(path: &Path, layout: &DiskLayout) -> Result<(), FileSystemError> {
    write_image(path, layout, |_| {})
}

/// 与 `format_image` 相同，但把进度发送给界面线程
pub fn perform_disk_initialization(path: PathBuf, layout: DiskLayout, tx: Sender<BootProgress>) {
    let _ = tx.send(BootProgress::Step("🧠 Initializing virtual disk..."));

    let result = write_image(&path, &layout, |percent| {
        let _ = tx.send(BootProgress::Progress(percent));
    });

    let _ = tx.send(BootProgress::Finished(result.map(|_| path)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::config::BitmapLayout;
    use std::sync::mpsc;
    use tempfile::TempDir;

    #[test]
    fn formatted_image_reserves_root_block() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("disk.img");
        let layout = DiskLayout::new(BitmapLayout::Legacy);
        format_image(&path, &layout).expect("format");

        let bytes = std::fs::read(&path).expect("read image");
        assert_eq!(bytes.len() as u64, layout.total_size);
        assert_eq!(bytes[layout.bitmap_offset as usize], 0x01);
        assert!(bytes[..BLOCK_SIZE].iter().all(|&b| b == 0));
    }

    #[test]
    fn progress_reaches_completion() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("disk.img");
        let (tx, rx) = mpsc::channel();

        perform_disk_initialization(path.clone(), DiskLayout::new(BitmapLayout::Compact), tx);

        let messages: Vec<BootProgress> = rx.iter().collect();
        assert!(matches!(messages.first(), Some(BootProgress::Step(_))));
        assert!(messages.iter().any(|m| matches!(m, BootProgress::Progress(100))));
        match messages.last() {
            Some(BootProgress::Finished(Ok(p))) => assert_eq!(p, &path),
            other => panic!("unexpected final message: {:?}", other),
        }
    }
}

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{
    disk::{Block, BlockIndex},
    fs::{
        config::{
            FILE_ENTRY_SIZE, MAX_DIRS_IN_ROOT, MAX_EXTENSION, MAX_FILENAME, MAX_FILES_IN_DIR,
            RECORD_COUNT_SIZE, ROOT_ENTRY_SIZE,
        },
        error::{FileSystemError, Result},
        layout::DiskLayout,
    },
    utils::{from_fixed, to_fixed},
};

// 磁盘上的根目录项，紧凑排列，bincode 定长小端编码正好 17 字节
#[derive(Debug, Serialize, Deserialize)]
struct RawDirectory {
    dname: [u8; MAX_FILENAME + 1],
    n_start_block: i64,
}

// 磁盘上的文件项，29 字节
#[derive(Debug, Serialize, Deserialize)]
struct RawFile {
    fname: [u8; MAX_FILENAME + 1],
    fext: [u8; MAX_EXTENSION + 1],
    fsize: u64,
    n_start_block: i64,
}

/// 根目录中的一个子目录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirRecord {
    pub name: String,
    pub start: BlockIndex, // 该目录的目录项记录所在块
}

/// 根目录记录，位于块 0
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootDirectory {
    pub directories: Vec<DirRecord>, // 按创建顺序排列，无空洞
}

/// 目录中的一个文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub name: String,
    pub ext: String,
    pub size: u64,
    pub start: Option<BlockIndex>, // 首次写入前为 None（磁盘上是 0）
}

/// 子目录的目录项记录，列出其中的文件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub files: Vec<FileRecord>,
}

fn read_count(block: &Block, capacity: usize, what: &str) -> Result<usize> {
    let mut raw = [0u8; RECORD_COUNT_SIZE];
    raw.copy_from_slice(&block[..RECORD_COUNT_SIZE]);
    let count = i32::from_le_bytes(raw);

    usize::try_from(count)
        .ok()
        .filter(|&n| n <= capacity)
        .ok_or_else(|| {
            FileSystemError::Corrupted(format!("{} count {} out of range 0..={}", what, count, capacity))
        })
}

fn write_count(block: &mut Block, count: usize) {
    block[..RECORD_COUNT_SIZE].copy_from_slice(&(count as i32).to_le_bytes());
}

fn decode_slots<T: DeserializeOwned>(block: &Block, entry_size: usize, count: usize) -> Result<Vec<T>> {
    (0..count)
        .map(|i| {
            let start = RECORD_COUNT_SIZE + i * entry_size;
            bincode::deserialize(&block[start..start + entry_size])
                .map_err(|e| FileSystemError::Corrupted(format!("entry {}: {}", i, e)))
        })
        .collect()
}

fn encode_slots<T: Serialize>(block: &mut Block, entry_size: usize, entries: &[T]) -> Result<()> {
    write_count(block, entries.len());
    for (i, entry) in entries.iter().enumerate() {
        let bytes = bincode::serialize(entry)
            .map_err(|e| FileSystemError::Corrupted(format!("entry {}: {}", i, e)))?;
        debug_assert_eq!(bytes.len(), entry_size);

        let start = RECORD_COUNT_SIZE + i * entry_size;
        block[start..start + entry_size].copy_from_slice(&bytes);
    }
    Ok(())
}

fn start_block(raw: i64, layout: &DiskLayout, owner: &str) -> Result<BlockIndex> {
    u64::try_from(raw)
        .ok()
        .map(BlockIndex)
        .filter(|&b| b != BlockIndex::ROOT && layout.contains_block(b))
        .ok_or_else(|| FileSystemError::Corrupted(format!("{} starts at invalid block {}", owner, raw)))
}

impl RootDirectory {
    pub fn decode(block: &Block, layout: &DiskLayout) -> Result<Self> {
        let count = read_count(block, MAX_DIRS_IN_ROOT, "root directory")?;
        let raw: Vec<RawDirectory> = decode_slots(block, ROOT_ENTRY_SIZE, count)?;

        let directories = raw
            .into_iter()
            .map(|r| {
                let name = from_fixed(&r.dname);
                let start = start_block(r.n_start_block, layout, &name)?;
                Ok(DirRecord { name, start })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { directories })
    }

    pub fn encode(&self, block: &mut Block) -> Result<()> {
        let raw: Vec<RawDirectory> = self
            .directories
            .iter()
            .map(|d| RawDirectory {
                dname: to_fixed(&d.name),
                n_start_block: d.start.0 as i64,
            })
            .collect();
        encode_slots(block, ROOT_ENTRY_SIZE, &raw)
    }

    pub fn find(&self, name: &str) -> Option<&DirRecord> {
        self.directories.iter().find(|d| d.name == name)
    }

    pub fn is_full(&self) -> bool {
        self.directories.len() >= MAX_DIRS_IN_ROOT
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.directories.iter().map(|d| d.name.as_str())
    }
}

impl DirectoryEntry {
    pub fn decode(block: &Block, layout: &DiskLayout) -> Result<Self> {
        let count = read_count(block, MAX_FILES_IN_DIR, "directory")?;
        let raw: Vec<RawFile> = decode_slots(block, FILE_ENTRY_SIZE, count)?;

        let files = raw
            .into_iter()
            .map(|r| {
                let name = from_fixed(&r.fname);
                let ext = from_fixed(&r.fext);
                let start = match r.n_start_block {
                    0 => None,
                    n => {
                        let owner = format!("{}.{}", name, ext);
                        let start = start_block(n, layout, &owner)?;
                        if start.byte_offset().add(r.fsize) > layout.data_end() {
                            return Err(FileSystemError::Corrupted(format!(
                                "{} runs past the block array",
                                owner
                            )));
                        }
                        Some(start)
                    }
                };
                Ok(FileRecord {
                    name,
                    ext,
                    size: r.fsize,
                    start,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { files })
    }

    pub fn encode(&self, block: &mut Block) -> Result<()> {
        let raw: Vec<RawFile> = self
            .files
            .iter()
            .map(|f| RawFile {
                fname: to_fixed(&f.name),
                fext: to_fixed(&f.ext),
                fsize: f.size,
                n_start_block: f.start.map_or(0, |b| b.0 as i64),
            })
            .collect();
        encode_slots(block, FILE_ENTRY_SIZE, &raw)
    }

    pub fn find(&self, name: &str, ext: &str) -> Option<&FileRecord> {
        self.files.iter().find(|f| f.name == name && f.ext == ext)
    }

    pub fn find_mut(&mut self, name: &str, ext: &str) -> Option<&mut FileRecord> {
        self.files.iter_mut().find(|f| f.name == name && f.ext == ext)
    }

    pub fn is_full(&self) -> bool {
        self.files.len() >= MAX_FILES_IN_DIR
    }

    /// 列目录时的显示名：`name.ext`
    pub fn listing(&self) -> impl Iterator<Item = String> + '_ {
        self.files.iter().map(|f| format!("{}.{}", f.name, f.ext))
    }
}

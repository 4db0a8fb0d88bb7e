use bitflags::bitflags;

bitflags! {
    /// stat 风格的模式位。不建模权限，只给出固定值
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FileMode: u32 {
        const S_IFDIR = 0o040000;
        const S_IFREG = 0o100000;

        const OWNER_R = 0o400;
        const OWNER_W = 0o200;
        const OWNER_X = 0o100;
        const GROUP_R = 0o040;
        const GROUP_W = 0o020;
        const GROUP_X = 0o010;
        const OTHER_R = 0o004;
        const OTHER_W = 0o002;
        const OTHER_X = 0o001;

        // rwxr-xr-x
        const DIR_DEFAULT = Self::OWNER_R.bits() | Self::OWNER_W.bits() | Self::OWNER_X.bits()
            | Self::GROUP_R.bits() | Self::GROUP_X.bits()
            | Self::OTHER_R.bits() | Self::OTHER_X.bits();
        // rw-rw-rw-
        const FILE_DEFAULT = Self::OWNER_R.bits() | Self::OWNER_W.bits()
            | Self::GROUP_R.bits() | Self::GROUP_W.bits()
            | Self::OTHER_R.bits() | Self::OTHER_W.bits();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Directory,
    RegularFile,
}

/// get_attributes 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileAttr {
    pub kind: FileKind,
    pub mode: FileMode,
    pub nlink: u32,
    pub size: u64,
}

impl FileAttr {
    pub fn directory() -> Self {
        Self {
            kind: FileKind::Directory,
            mode: FileMode::S_IFDIR | FileMode::DIR_DEFAULT,
            nlink: 2,
            size: 0,
        }
    }

    pub fn file(size: u64) -> Self {
        Self {
            kind: FileKind::RegularFile,
            mode: FileMode::S_IFREG | FileMode::FILE_DEFAULT,
            nlink: 1,
            size,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_match_stat_values() {
        assert_eq!(FileAttr::directory().mode.bits(), 0o040755);
        assert_eq!(FileAttr::file(3).mode.bits(), 0o100666);
        assert_eq!(FileAttr::file(3).size, 3);
    }
}

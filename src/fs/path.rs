use crate::fs::{
    config::{MAX_EXTENSION, MAX_FILENAME},
    error::{FileSystemError, Result},
};

/// 路径拆解结果：`/dir/name.ext`
///
/// 不适用的字段为空串，例如纯目录路径的文件字段。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathInfo {
    pub dir_name: String,
    pub full_file_name: String, // name.ext
    pub file_name: String,
    pub extension: String,
    pub depth: usize, // 以 '/' 分隔的段数，根目录为 0
}

impl PathInfo {
    pub fn is_root(&self) -> bool {
        self.depth == 0
    }

    pub fn has_file(&self) -> bool {
        !self.full_file_name.is_empty()
    }

    /// 指向根目录下的某个子目录（`/dir`）
    pub fn is_directory(&self) -> bool {
        self.depth == 1 && !self.has_file()
    }
}

/// 一次从左到右扫描路径，记录斜杠数和最后一个点的位置
pub fn resolve(path: &str) -> PathInfo {
    // 相对路径按根目录下解释
    let absolute;
    let path = if path.starts_with('/') {
        path
    } else {
        absolute = format!("/{}", path);
        absolute.as_str()
    };

    // 末尾的单个 '/' 不影响含义：/docs/ 等同 /docs
    let trimmed = match path.strip_suffix('/') {
        Some(rest) if !rest.is_empty() => rest,
        _ => path,
    };

    let mut info = PathInfo::default();
    let mut segment_start = 0; // 当前段第一个字符的位置
    let mut last_dot: Option<usize> = None; // 当前段中最后一个点

    for (i, c) in trimmed.char_indices() {
        match c {
            '/' => {
                info.depth += 1;
                // 第二个斜杠结束目录名
                if info.depth == 2 {
                    info.dir_name = trimmed[segment_start..i].to_string();
                }
                segment_start = i + 1;
                last_dot = None;
            }
            '.' => last_dot = Some(i),
            _ => {}
        }
    }

    if trimmed.len() <= segment_start {
        // 根目录或空的尾段
        if info.depth <= 1 {
            info.depth = 0;
        }
        return info;
    }

    let tail = &trimmed[segment_start..];
    match last_dot {
        // 尾段含点：文件
        Some(dot) => {
            info.full_file_name = tail.to_string();
            info.file_name = trimmed[segment_start..dot].to_string();
            info.extension = trimmed[dot + 1..].to_string();
        }
        // 尾段不含点：只有一段时是目录名；更深时是嵌套目录，目录名保持第一段
        None => {
            if info.depth == 1 {
                info.dir_name = tail.to_string();
            }
        }
    }

    info
}

// 名字按 NUL 结尾的定长字段存储，内嵌 NUL 会被截断成另一个名字
fn reject_nul(path: &str) -> Result<()> {
    if path.contains('\0') {
        return Err(FileSystemError::NotPermitted(path.to_string()));
    }
    Ok(())
}

/// 创建文件时使用的解析：额外检查 8.3 长度与层级
pub fn resolve_for_create(path: &str) -> Result<PathInfo> {
    reject_nul(path)?;
    let info = resolve(path);

    if info.dir_name.len() > MAX_FILENAME
        || info.file_name.len() > MAX_FILENAME
        || info.extension.len() > MAX_EXTENSION
    {
        return Err(FileSystemError::NameTooLong(path.to_string()));
    }

    // 目录里不能再有目录
    if info.depth > 2 {
        return Err(FileSystemError::NotPermitted(path.to_string()));
    }

    Ok(info)
}

/// 创建目录时使用的解析，返回目录名
///
/// 从右往左检查：最后一段和它的上一段超过 8 个字符为 NameTooLong，
/// 两段都合格但存在上级目录时为 NotPermitted。目录名不带扩展名。
pub fn resolve_for_mkdir(path: &str) -> Result<String> {
    reject_nul(path)?;
    let trimmed = path.trim_start_matches('/');
    let trimmed = trimmed.strip_suffix('/').unwrap_or(trimmed);

    let mut segments = trimmed.rsplit('/');
    // rsplit 至少产生一段
    let name = segments.next().unwrap_or_default();
    if name.len() > MAX_FILENAME {
        return Err(FileSystemError::NameTooLong(path.to_string()));
    }
    if let Some(parent) = segments.next() {
        if parent.len() > MAX_FILENAME {
            return Err(FileSystemError::NameTooLong(path.to_string()));
        }
        return Err(FileSystemError::NotPermitted(path.to_string()));
    }
    if name.contains('.') {
        return Err(FileSystemError::NotPermitted(path.to_string()));
    }

    Ok(name.to_string())
}

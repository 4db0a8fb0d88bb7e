/// 把名字编码成以 NUL 结尾的定长字段，超出部分截断
pub fn to_fixed<const N: usize>(name: &str) -> [u8; N] {
    let mut field = [0u8; N];
    let bytes = name.as_bytes();
    let len = bytes.len().min(N - 1);
    field[..len].copy_from_slice(&bytes[..len]);
    field
}

/// 读取定长字段中第一个 NUL 之前的内容
pub fn from_fixed(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}

//! VO 与节点内容的确定性编码
//!
//! 只用于进程内诊断（VO 大小、索引大小）以及跨进程传递 VO，
//! 不是稳定的持久化格式。

use bincode::Options;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;

/// 创建确定性 bincode 配置
pub fn bincode_config() -> impl bincode::Options {
    bincode::options()
        .with_little_endian()
        .with_fixint_encoding()
        .allow_trailing_bytes()
}

/// 序列化为字节
pub fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    Ok(bincode_config().serialize(value)?)
}

/// 从字节反序列化
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode_config().deserialize(bytes)?)
}

/// 计算序列化后的字节数
///
/// 序列化到 Vec 不会失败，出错时按 0 处理。
pub fn encoded_size<T: Serialize>(value: &T) -> u64 {
    bincode_config().serialized_size(value).unwrap_or(0)
}

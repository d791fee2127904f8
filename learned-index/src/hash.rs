//! Hash 函数抽象层
//!
//! 所有承诺、Merkle 组合与 VO 校验都通过 [`Hasher`] 计算，
//! 便于在 blake3 和 keccak256 之间切换并分别评估开销。

/// 32 字节哈希输出类型
pub type HashOutput = [u8; 32];

/// Hash 函数 trait
///
/// 所有实现必须满足：
/// 1. 确定性：相同输入产生相同输出
/// 2. 抗碰撞：不同输入极难产生相同输出
/// 3. 输出固定 32 字节
pub trait Hasher: Send + Sync + 'static {
    /// 计算输入数据的哈希值
    fn hash(data: &[u8]) -> HashOutput;

    /// 计算多段输入拼接后的哈希值
    ///
    /// 默认实现先拼接再哈希，具体算法可覆盖为增量计算。
    fn hash_parts(parts: &[&[u8]]) -> HashOutput {
        Self::hash(&parts.concat())
    }

    /// 返回算法名称（用于日志和调试）
    fn name() -> &'static str;
}

/// Blake3 哈希实现
///
/// 速度快、支持 SIMD，默认使用。
#[derive(Debug, Clone, Copy, Default)]
pub struct Blake3Hasher;

impl Hasher for Blake3Hasher {
    fn hash(data: &[u8]) -> HashOutput {
        blake3::hash(data).into()
    }

    fn hash_parts(parts: &[&[u8]]) -> HashOutput {
        let mut hasher = blake3::Hasher::new();
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().into()
    }

    fn name() -> &'static str {
        "blake3"
    }
}

/// Keccak256 哈希实现
///
/// 与以太坊工具链兼容的场景使用。
#[derive(Debug, Clone, Copy, Default)]
pub struct Keccak256Hasher;

impl Hasher for Keccak256Hasher {
    fn hash(data: &[u8]) -> HashOutput {
        Self::hash_parts(&[data])
    }

    fn hash_parts(parts: &[&[u8]]) -> HashOutput {
        use tiny_keccak::{Hasher as TinyHasher, Keccak};

        let mut output = [0u8; 32];
        let mut hasher = Keccak::v256();
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize(&mut output);
        output
    }

    fn name() -> &'static str {
        "keccak256"
    }
}

//! 承诺使用的密码学原语
//!
//! 所有哈希输入以一个字节的域标签开头，不同用途之间不会混淆。

use rand::RngCore;

use crate::config::SecretKeys;
use crate::hash::{HashOutput, Hasher};

/// 节点 nonce，每次节点内容变化时重新生成
pub type Nonce = [u8; 32];

/// 全零哈希，用作累加器初值和空缓冲的占位哈希
pub const ZERO_HASH: HashOutput = [0u8; 32];

// 域标签
pub(crate) const TAG_LEAF_ITEM: u8 = 0x00;
pub(crate) const TAG_INTERNAL_ITEM: u8 = 0x01;
pub(crate) const TAG_POSITION_PAD: u8 = 0x02;
pub(crate) const TAG_BUFFER_LEAF: u8 = 0x10;
pub(crate) const TAG_BUFFER_INNER: u8 = 0x11;
pub(crate) const TAG_CONNECTED_LEAF: u8 = 0x12;
pub(crate) const TAG_UPPER_BOTTOM: u8 = 0x13;
pub(crate) const TAG_UPPER_INNER: u8 = 0x14;

/// 生成随机 nonce
pub fn random_nonce() -> Nonce {
    let mut nonce = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut nonce);
    nonce
}

/// 按字节异或
#[inline]
pub fn xor(a: &HashOutput, b: &HashOutput) -> HashOutput {
    let mut out = *a;
    xor_into(&mut out, b);
    out
}

/// 将 `b` 异或进 `acc`
#[inline]
pub fn xor_into(acc: &mut HashOutput, b: &HashOutput) {
    for (x, y) in acc.iter_mut().zip(b.iter()) {
        *x ^= *y;
    }
}

/// 叶子条目哈希：H(tag || sk0 || key)
#[inline]
pub fn leaf_item<H: Hasher>(keys: &SecretKeys, key: i64) -> HashOutput {
    H::hash_parts(&[&[TAG_LEAF_ITEM], keys.sk0(), &key.to_be_bytes()])
}

/// 内部节点条目哈希：H(tag || sk0 || child_nonce || child_len)
#[inline]
pub fn internal_item<H: Hasher>(keys: &SecretKeys, nonce: &Nonce, len: u32) -> HashOutput {
    H::hash_parts(&[&[TAG_INTERNAL_ITEM], keys.sk0(), nonce, &len.to_be_bytes()])
}

/// 位置加密的掩码：H(tag || sk1 || nonce || pos)
///
/// 承诺值为 `acc_i XOR pad(i)`，把累加器绑定到节点 nonce 与具体位置。
#[inline]
pub fn position_pad<H: Hasher>(keys: &SecretKeys, nonce: &Nonce, pos: u32) -> HashOutput {
    H::hash_parts(&[&[TAG_POSITION_PAD], keys.sk1(), nonce, &pos.to_be_bytes()])
}

/// 将 key 序列编码为大端字节串（Merkle 节点哈希使用）
pub(crate) fn keys_bytes(keys: &[i64]) -> Vec<u8> {
    let mut out = Vec::with_capacity(keys.len() * 8 + 4);
    out.extend_from_slice(&(keys.len() as u32).to_be_bytes());
    for key in keys {
        out.extend_from_slice(&key.to_be_bytes());
    }
    out
}

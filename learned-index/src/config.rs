//! 索引配置与密钥
//!
//! [`IndexConfig`] 控制分段误差、缓冲比例、B 树扇出与版本链容量；
//! [`SecretKeys`] 是构建与校验共享的两把密钥，由调用方注入，不做持久化。

use std::fmt;
use std::sync::Arc;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, Result};

/// 默认的更新优化树误差界
pub const DEFAULT_ERR: u32 = 64;

/// 默认的缓冲比例
pub const DEFAULT_BUF_RATE: f64 = 0.3;

/// 默认的缓冲 / 上层 B 树最大扇出
pub const DEFAULT_FANOUT: usize = 32;

/// 默认的版本链容量
pub const DEFAULT_CHAIN_CAPACITY: usize = 1000;

/// 索引配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// 更新优化树（版本链）叶子的误差界
    pub err: u32,
    /// 慢速层每层的误差界，层号超出时沿用最后一个
    pub level_errs: Vec<u32>,
    /// 缓冲树与上层 B 树节点的最大条目数
    pub fanout: usize,
    /// 缓冲容量系数，叶子缓冲上限为 floor(len * buf_rate)
    pub buf_rate: f64,
    /// 版本链容量
    pub chain_capacity: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            err: DEFAULT_ERR,
            level_errs: vec![16, 32, 64, 128, 256],
            fanout: DEFAULT_FANOUT,
            buf_rate: DEFAULT_BUF_RATE,
            chain_capacity: DEFAULT_CHAIN_CAPACITY,
        }
    }
}

impl IndexConfig {
    pub fn with_err(mut self, err: u32) -> Self {
        self.err = err;
        self
    }

    pub fn with_level_errs(mut self, level_errs: Vec<u32>) -> Self {
        self.level_errs = level_errs;
        self
    }

    pub fn with_fanout(mut self, fanout: usize) -> Self {
        self.fanout = fanout;
        self
    }

    pub fn with_buf_rate(mut self, buf_rate: f64) -> Self {
        self.buf_rate = buf_rate;
        self
    }

    pub fn with_chain_capacity(mut self, chain_capacity: usize) -> Self {
        self.chain_capacity = chain_capacity;
        self
    }

    /// 第 `level` 层使用的误差界
    pub fn level_err(&self, level: usize) -> u32 {
        match self.level_errs.get(level) {
            Some(&err) => err,
            None => self.level_errs.last().copied().unwrap_or(self.err),
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.level_errs.is_empty() {
            return Err(IndexError::InvalidConfig(
                "level_errs must not be empty".into(),
            ));
        }
        if self.fanout < 3 {
            return Err(IndexError::InvalidConfig(format!(
                "fanout must be at least 3, got {}",
                self.fanout
            )));
        }
        if !self.buf_rate.is_finite() || self.buf_rate < 0.0 {
            return Err(IndexError::InvalidConfig(format!(
                "buf_rate must be finite and non-negative, got {}",
                self.buf_rate
            )));
        }
        if self.chain_capacity == 0 {
            return Err(IndexError::InvalidConfig(
                "chain_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SecretKeys
// ============================================================================

/// 承诺密钥对
///
/// - `sk0`：条目哈希 H(sk0 || item) 的密钥
/// - `sk1`：位置加密 Enc(sk1, nonce, h, i) 的密钥
///
/// 通过 `Arc` 在树、证明与校验端之间共享。
#[derive(Clone, PartialEq, Eq)]
pub struct SecretKeys {
    sk0: Vec<u8>,
    sk1: Vec<u8>,
}

impl SecretKeys {
    pub fn new(sk0: impl Into<Vec<u8>>, sk1: impl Into<Vec<u8>>) -> Arc<Self> {
        Arc::new(Self {
            sk0: sk0.into(),
            sk1: sk1.into(),
        })
    }

    /// 使用线程本地随机源生成两把 32 字节密钥
    pub fn random() -> Arc<Self> {
        let mut rng = rand::thread_rng();
        let mut sk0 = vec![0u8; 32];
        let mut sk1 = vec![0u8; 32];
        rng.fill_bytes(&mut sk0);
        rng.fill_bytes(&mut sk1);
        Arc::new(Self { sk0, sk1 })
    }

    #[inline]
    pub fn sk0(&self) -> &[u8] {
        &self.sk0
    }

    #[inline]
    pub fn sk1(&self) -> &[u8] {
        &self.sk1
    }
}

impl fmt::Debug for SecretKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKeys")
            .field("sk0", &"<redacted>")
            .field("sk1", &"<redacted>")
            .finish()
    }
}

/// 叶子缓冲容量：floor(model_len * buf_rate)
#[inline]
pub(crate) fn buffer_capacity(model_len: usize, buf_rate: f64) -> usize {
    (model_len as f64 * buf_rate).floor() as usize
}

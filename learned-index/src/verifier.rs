//! 独立客户端校验器
//!
//! 客户端只持有密钥和可信摘要，不需要树本身。

use std::marker::PhantomData;
use std::sync::Arc;

use crate::buffered::{verify_buffered, BufferedProof};
use crate::commitment::NodeDigest;
use crate::config::SecretKeys;
use crate::error::Result;
use crate::hash::{Blake3Hasher, HashOutput, Hasher};
use crate::learned::{verify_learned, LearnedProof};
use crate::traits::QueryResult;
use crate::versioned::{verify_version, VersionDigest, VersionedResult};

/// 持有密钥的校验器
pub struct Verifier<H: Hasher = Blake3Hasher> {
    secret: Arc<SecretKeys>,
    _marker: PhantomData<H>,
}

impl<H: Hasher> Clone for Verifier<H> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.secret))
    }
}

impl<H: Hasher> std::fmt::Debug for Verifier<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Verifier").field("hasher", &H::name()).finish()
    }
}

impl<H: Hasher> Verifier<H> {
    pub fn new(secret: Arc<SecretKeys>) -> Self {
        Self {
            secret,
            _marker: PhantomData,
        }
    }

    /// 校验查询优化树的结果
    pub fn verify_learned_detailed(
        &self,
        trusted: Option<&NodeDigest>,
        result: &QueryResult<LearnedProof>,
    ) -> Result<()> {
        verify_learned::<H>(
            trusted,
            result.low,
            result.high,
            &result.proof,
            &result.keys,
            &self.secret,
        )
    }

    pub fn verify_learned(
        &self,
        trusted: Option<&NodeDigest>,
        result: &QueryResult<LearnedProof>,
    ) -> bool {
        log_outcome(self.verify_learned_detailed(trusted, result))
    }

    /// 校验更新优化树的结果
    pub fn verify_buffered_detailed(
        &self,
        trusted: Option<&HashOutput>,
        result: &QueryResult<BufferedProof>,
    ) -> Result<()> {
        verify_buffered::<H>(
            trusted,
            result.low,
            result.high,
            &result.proof,
            &result.keys,
            &self.secret,
        )
    }

    pub fn verify_buffered(
        &self,
        trusted: Option<&HashOutput>,
        result: &QueryResult<BufferedProof>,
    ) -> bool {
        log_outcome(self.verify_buffered_detailed(trusted, result))
    }

    /// 校验多版本结果
    pub fn verify_version_detailed(
        &self,
        digest: &VersionDigest,
        result: &VersionedResult,
    ) -> Result<()> {
        verify_version::<H>(digest, result.low, result.high, result, &self.secret)
    }

    pub fn verify_version(&self, digest: &VersionDigest, result: &VersionedResult) -> bool {
        log_outcome(self.verify_version_detailed(digest, result))
    }
}

fn log_outcome(outcome: Result<()>) -> bool {
    match outcome {
        Ok(()) => true,
        Err(e) => {
            log::warn!("verification rejected: {}", e);
            false
        }
    }
}

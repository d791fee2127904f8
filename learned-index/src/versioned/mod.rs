//! 多版本管理
//!
//! 最近的版本以更新优化树的形式挂在固定容量的版本链上，更早的 key
//! 按二进制进位合并进各层查询优化树。每个可查询版本都有独立的摘要，
//! 客户端按版本校验。
//!
//! - `chain.rs`: 环形版本链
//! - `levels.rs`: 慢速层与进位合并
//! - `index.rs`: 插入、快照与查询
//! - `result.rs`: 多组件结果、摘要与校验

mod chain;
mod index;
mod levels;
mod result;

#[cfg(test)]
mod tests;

pub use self::chain::{ChainSlot, VersionChain};
pub use self::index::{VersionSnapshot, VersionedIndex};
pub use self::levels::LevelState;
pub use self::result::{verify_version, VersionDigest, VersionedResult};

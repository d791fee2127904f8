//! 集成测试公共模块

#![allow(dead_code)]

pub mod sample_data;
pub mod test_helpers;

pub use test_helpers::DeterministicRng;

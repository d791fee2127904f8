//! 树集成测试
//!
//! 三种结构在相同的 key 分布上与 `BTreeSet` 对照，并要求每次查询都能通过校验。

#[path = "../common/mod.rs"]
mod common;

mod buffered_test;
mod edge_cases_test;
mod learned_test;
mod versioned_test;

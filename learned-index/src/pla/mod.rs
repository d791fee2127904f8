//! 分段线性近似（PLA）
//!
//! - [`Model`] / [`Segment`]：线性模型与其覆盖的有序 key
//! - [`OptPla`]：在误差界下产生最少分段的在线凸包算法
//! - [`merge`]：有序序列归并
//! - [`tuning`]：误差界预训练

mod merge;
mod model;
mod opt_pla;
pub mod tuning;


pub use self::merge::{check_strictly_increasing, merge_sorted};
pub use self::model::{Model, Segment};
pub use self::opt_pla::OptPla;

//! # 表面生成模块
//!
//! 从体相结构枚举 Miller 指数并切出零偶极平板。
//!
//! ## 子模块
//! - `miller`: 对称不等价 Miller 指数枚举
//! - `slabgen`: 取向晶胞、终止面与平板构造
//! - `oxidation`: 氧化态赋值（极性筛选的电荷来源）
//!
//! ## 依赖关系
//! - 被 `commands/generate.rs` 使用
//! - 使用 `models/`

pub mod miller;
pub mod oxidation;
pub mod slabgen;

pub use miller::distinct_miller_indices;
pub use oxidation::{assign_oxidation_states, OxidationMode};
pub use slabgen::{reduce_miller, SlabGenerator};

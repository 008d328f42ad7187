//! # 数据模型模块
//!
//! ## 依赖关系
//! - 被 `parsers/`, `surface/`, `commands/` 使用
//! - 子模块: structure, slab

pub mod slab;
pub mod structure;

pub use slab::Slab;
pub use structure::{Atom, Crystal, Lattice};

//! # 收敛分析模块
//!
//! 解析完成的切面计算目录并绘制厚度收敛热图。
//!
//! ## 子模块
//! - `parse`: 目录遍历、表面能计算、CSV 读写
//! - `plot`: plotters 热图渲染
//!
//! ## 依赖关系
//! - 被 `commands/convergence.rs` 使用
//! - 使用 `parsers/`

pub mod parse;
pub mod plot;

pub use parse::ConvergenceRow;
pub use plot::PlotMetric;

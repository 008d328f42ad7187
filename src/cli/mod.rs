//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `generate`: 从体相结构生成零偶极切面
//! - `convergence`: 收敛分析（嵌套子命令）
//!   - `parse`: 收集计算结果到 CSV
//!   - `plot`: 绘制厚度收敛热图
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: generate, convergence

pub mod convergence;
pub mod generate;

use clap::{Parser, Subcommand};

/// slabgen - 表面切面生成与收敛分析工具
#[derive(Parser)]
#[command(name = "slabgen")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Surface slab generation and convergence analysis for first-principles calculations", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Generate zero-dipole surface slabs from a bulk structure
    Generate(generate::GenerateArgs),

    /// Parse and plot slab/vacuum thickness convergence data
    Convergence(convergence::ConvergenceArgs),
}

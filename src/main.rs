//! # slabgen - 表面切面生成与收敛分析工具
//!
//! 为第一性原理表面计算准备切面模型：从体相结构枚举 Miller 指数、
//! 切出零偶极（可选反演对称）的平板、生成 VASP 输入，并对算完的
//! 切面做厚度收敛分析。
//!
//! ## 子命令
//! - `generate` - 切面生成（单指数或最大指数内全部枚举）
//! - `convergence` - 收敛分析
//!   - `parse` - 收集计算结果到 CSV
//!   - `plot` - 绘制 slab/真空厚度收敛热图
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/          (命令行参数定义)
//!   ├── commands/     (命令执行逻辑)
//!   │     ├── surface/     (Miller 枚举、切面构造、氧化态)
//!   │     ├── convergence/ (目录解析、热图)
//!   │     ├── parsers/     (POSCAR/CIF/OUTCAR)
//!   │     ├── vasp/        (INCAR/KPOINTS/POTCAR.spec)
//!   │     └── models/      (晶格、结构、切面)
//!   ├── utils/        (工具函数)
//!   └── error.rs      (错误处理)
//! ```

mod cli;
mod commands;
mod convergence;
mod error;
mod models;
mod parsers;
mod surface;
mod utils;
mod vasp;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}

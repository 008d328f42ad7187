//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `surface/`, `convergence/`, `parsers/`, `vasp/`, `utils/`
//! - 子模块: generate, convergence

pub mod convergence;
pub mod generate;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Generate(args) => generate::execute(args),
        Commands::Convergence(args) => convergence::execute(args),
    }
}

//! # convergence 子命令 CLI 定义
//!
//! 收敛分析统一入口，包含两个子命令：
//! - `parse`: 收集计算结果到 CSV
//! - `plot`: 绘制厚度收敛热图
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/convergence.rs`

use clap::{Args, Subcommand, ValueEnum};
use std::path::PathBuf;

/// convergence 主命令参数
#[derive(Args, Debug)]
pub struct ConvergenceArgs {
    #[command(subcommand)]
    pub command: ConvergenceCommands,
}

/// convergence 子命令
#[derive(Subcommand, Debug)]
pub enum ConvergenceCommands {
    /// Collect energies from finished calculations into <hkl>_data.csv
    Parse(ParseArgs),

    /// Plot a slab/vacuum thickness heatmap from <hkl>_data.csv
    Plot(PlotArgs),
}

/// parse 子命令参数
#[derive(Args, Debug)]
pub struct ParseArgs {
    /// Miller index of the slabs, e.g. "1,0,1"
    #[arg(long)]
    pub hkl: String,

    /// Bulk energy per atom from a converged bulk calculation (eV)
    #[arg(long)]
    pub bulk_per_atom: f64,

    /// Root directory containing slab_vacuum_index calculation folders
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Output CSV path (default: <hkl>_data.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// 绘图数据列
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PlotKind {
    /// Surface energy (J/m²)
    SurfaceEnergy,
    /// Total energy per atom (eV)
    EnergyPerAtom,
}

impl std::fmt::Display for PlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlotKind::SurfaceEnergy => write!(f, "surface-energy"),
            PlotKind::EnergyPerAtom => write!(f, "energy-per-atom"),
        }
    }
}

/// 图像输出格式
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PlotFormat {
    /// PNG image
    Png,
    /// SVG vector image
    Svg,
}

/// plot 子命令参数
#[derive(Args, Debug)]
pub struct PlotArgs {
    /// Miller index of the slabs, e.g. "1,0,1"
    #[arg(long)]
    pub hkl: String,

    /// Quantity to plot
    #[arg(long, value_enum, default_value = "surface-energy")]
    pub kind: PlotKind,

    /// Input CSV (default: <hkl>_data.csv)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Output image path (default: <hkl>_<kind>.png)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (auto-detected from extension if not specified)
    #[arg(short, long, value_enum)]
    pub format: Option<PlotFormat>,

    /// Figure width in pixels (PNG) or points (SVG)
    #[arg(long, default_value_t = 1200)]
    pub width: u32,

    /// Figure height in pixels (PNG) or points (SVG)
    #[arg(long, default_value_t = 800)]
    pub height: u32,

    /// Do not annotate cells with the calculation time
    #[arg(long)]
    pub no_time: bool,
}

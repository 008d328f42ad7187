//! # convergence 命令实现
//!
//! `parse` 走目录收集能量数据写 CSV，`plot` 读 CSV 画热图。
//!
//! ## 依赖关系
//! - 使用 `cli/convergence.rs` 定义的参数
//! - 使用 `convergence/` 模块
//! - 使用 `utils/output.rs`, `utils/progress.rs`

use crate::cli::convergence::{
    ConvergenceArgs, ConvergenceCommands, ParseArgs, PlotArgs, PlotFormat, PlotKind,
};
use crate::cli::generate::parse_hkl;
use crate::convergence::{parse, plot, ConvergenceRow, PlotMetric};
use crate::error::{Result, SlabgenError};
use crate::utils::{output, progress};

use std::path::PathBuf;

/// 执行 convergence 命令
pub fn execute(args: ConvergenceArgs) -> Result<()> {
    match args.command {
        ConvergenceCommands::Parse(args) => execute_parse(args),
        ConvergenceCommands::Plot(args) => execute_plot(args),
    }
}

fn hkl_label(spec: &str) -> Result<String> {
    let (h, k, l) = parse_hkl(spec).map_err(SlabgenError::InvalidArgument)?;
    Ok(format!("{}{}{}", h, k, l))
}

fn execute_parse(args: ParseArgs) -> Result<()> {
    output::print_header("Convergence Data Collection");

    let hkl = hkl_label(&args.hkl)?;
    output::print_info(&format!(
        "Walking '{}' for slab_vac_index folders",
        args.dir.display()
    ));

    let spinner = progress::create_spinner("Parsing calculation folders");
    let parsed = parse::parse_folders(&args.dir, args.bulk_per_atom);
    spinner.finish_and_clear();

    let (rows, warnings) = parsed?;
    for warning in &warnings {
        output::print_warning(warning);
    }
    output::print_success(&format!("Parsed {} calculation folder(s)", rows.len()));

    let out = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{}_data.csv", hkl)));
    parse::write_csv(&rows, &out)?;

    print_convergence_table(&rows);
    output::print_done(&format!("Data written to '{}'", out.display()));
    Ok(())
}

fn execute_plot(args: PlotArgs) -> Result<()> {
    output::print_header("Convergence Heatmap");

    let hkl = hkl_label(&args.hkl)?;
    let metric = match args.kind {
        PlotKind::SurfaceEnergy => PlotMetric::SurfaceEnergy,
        PlotKind::EnergyPerAtom => PlotMetric::EnergyPerAtom,
    };

    let input = args
        .input
        .unwrap_or_else(|| PathBuf::from(format!("{}_data.csv", hkl)));
    if !input.exists() {
        return Err(SlabgenError::FileNotFound {
            path: input.display().to_string(),
        });
    }

    let rows = parse::read_csv(&input)?;
    if rows.is_empty() {
        return Err(SlabgenError::Other(format!(
            "No data rows in '{}'",
            input.display()
        )));
    }
    output::print_info(&format!(
        "{} data rows from '{}'",
        rows.len(),
        input.display()
    ));

    let panels = plot::build_panels(&rows, metric);
    output::print_info(&format!("{} termination panel(s)", panels.len()));

    let output_path = args
        .output
        .unwrap_or_else(|| PathBuf::from(format!("{}_{}.png", hkl, metric.file_fragment())));
    let use_svg = match args.format {
        Some(PlotFormat::Svg) => true,
        Some(PlotFormat::Png) => false,
        None => output_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("svg"))
            .unwrap_or(false),
    };

    let (h, k, l) = parse_hkl(&args.hkl).map_err(SlabgenError::InvalidArgument)?;
    let title = format!("({} {} {}) {}", h, k, l, metric.title_fragment());

    plot::render_heatmaps(
        &panels,
        &title,
        &output_path,
        args.width,
        args.height,
        !args.no_time,
        use_svg,
    )?;

    output::print_done(&format!("Heatmap written to '{}'", output_path.display()));
    Ok(())
}

/// 收敛数据汇总表
fn print_convergence_table(rows: &[ConvergenceRow]) {
    use tabled::{Table, Tabled};

    #[derive(Tabled)]
    struct ConvRow {
        #[tabled(rename = "Slab (Å)")]
        slab: String,
        #[tabled(rename = "Vacuum (Å)")]
        vac: String,
        #[tabled(rename = "Index")]
        index: String,
        #[tabled(rename = "γ (J/m²)")]
        gamma: String,
        #[tabled(rename = "E/atom (eV)")]
        per_atom: String,
        #[tabled(rename = "Time (s)")]
        time: String,
    }

    let table_rows: Vec<ConvRow> = rows
        .iter()
        .map(|r| ConvRow {
            slab: r.slab_thickness.clone(),
            vac: r.vac_thickness.clone(),
            index: r.slab_index.clone(),
            gamma: format!("{:.4}", r.surface_energy),
            per_atom: format!("{:.4}", r.slab_per_atom),
            time: format!("{:.0}", r.time_taken),
        })
        .collect();

    if !table_rows.is_empty() {
        output::print_separator();
        let table = Table::new(&table_rows);
        println!("{}", table);
    }
}

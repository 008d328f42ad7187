//! # 收敛计算目录解析
//!
//! 遍历 `slab_vac_index` 命名的计算文件夹，从 OUTCAR 提取总能量、
//! 离子数和耗时，从 POSCAR/CONTCAR 取表面积，算出表面能并汇总成
//! CSV 数据表。
//!
//! ## 表面能
//! γ = (E_slab - n·E_bulk) / (2A) × 16.02   (eV/Å² -> J/m²)
//!
//! ## 依赖关系
//! - 被 `commands/convergence.rs` 调用
//! - 使用 `parsers/outcar.rs`, `parsers/poscar.rs`
//! - 使用 `walkdir` 遍历目录、`glob`/`regex` 匹配文件夹名、`csv` 写数据

use crate::error::{Result, SlabgenError};
use crate::models::structure::{cross, norm};
use crate::parsers::{outcar, poscar};

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use walkdir::WalkDir;

/// eV/Å² 到 J/m² 的换算系数
const EV_PER_A2_TO_J_PER_M2: f64 = 16.02;

/// 文件夹名 `slab_vac_index`，厚度允许小数
static FOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)_(\d+(?:\.\d+)?)_(\d+)$").unwrap());

/// 一个 (slab, vacuum, index) 组合的收敛数据
#[derive(Debug, Clone)]
pub struct ConvergenceRow {
    pub slab_thickness: String,
    pub vac_thickness: String,
    pub slab_index: String,
    pub surface_energy: f64,
    pub slab_toten: f64,
    pub slab_per_atom: f64,
    pub time_taken: f64,
}

/// 解析目录树，返回 (数据行, 警告)
///
/// 无法解析的文件夹跳过并记录警告（warn-and-continue）。
pub fn parse_folders(root: &Path, bulk_per_atom: f64) -> Result<(Vec<ConvergenceRow>, Vec<String>)> {
    if !root.is_dir() {
        return Err(SlabgenError::DirectoryNotFound {
            path: root.display().to_string(),
        });
    }

    // glob 先粗筛，regex 再精确提取
    let prefilter = glob::Pattern::new("*_*_*").expect("valid glob pattern");

    let mut rows = Vec::new();
    let mut warnings = Vec::new();
    let mut matched_any = false;

    for entry in WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
    {
        let fol_name = match entry.file_name().to_str() {
            Some(n) => n.to_string(),
            None => continue,
        };
        if !prefilter.matches(&fol_name) {
            continue;
        }
        let captures = match FOLDER_RE.captures(&fol_name) {
            Some(c) => c,
            None => continue,
        };
        matched_any = true;

        match parse_one_folder(entry.path(), bulk_per_atom, &captures) {
            Ok(row) => rows.push(row),
            Err(e) => warnings.push(format!("Skipping '{}': {}", entry.path().display(), e)),
        }
    }

    if !matched_any {
        return Err(SlabgenError::NoFoldersFound {
            path: root.display().to_string(),
        });
    }

    rows.sort_by(|a, b| {
        let key = |r: &ConvergenceRow| {
            (
                r.slab_thickness.parse::<f64>().unwrap_or(0.0),
                r.vac_thickness.parse::<f64>().unwrap_or(0.0),
                r.slab_index.parse::<usize>().unwrap_or(0),
            )
        };
        key(a).partial_cmp(&key(b)).unwrap()
    });

    Ok((rows, warnings))
}

fn parse_one_folder(
    path: &Path,
    bulk_per_atom: f64,
    captures: &regex::Captures<'_>,
) -> Result<ConvergenceRow> {
    let outcar_path = path.join("OUTCAR");
    if !outcar_path.exists() {
        return Err(SlabgenError::FileNotFound {
            path: outcar_path.display().to_string(),
        });
    }
    let summary = outcar::parse_outcar(&outcar_path)?;

    let toten = summary.final_energy.ok_or_else(|| SlabgenError::ParseError {
        format: "outcar".to_string(),
        path: outcar_path.display().to_string(),
        reason: "No final energy found".to_string(),
    })?;

    // 优先 CONTCAR（弛豫后的胞），退回 POSCAR
    let structure_path = ["CONTCAR", "POSCAR"]
        .iter()
        .map(|n| path.join(n))
        .find(|p| p.exists())
        .ok_or_else(|| SlabgenError::FileNotFound {
            path: path.join("POSCAR").display().to_string(),
        })?;
    let slab = poscar::parse_poscar_file(&structure_path)?;

    let num_atoms = summary.num_ions.unwrap_or(slab.atoms.len());
    if num_atoms == 0 {
        return Err(SlabgenError::ParseError {
            format: "poscar".to_string(),
            path: structure_path.display().to_string(),
            reason: "Structure has no atoms".to_string(),
        });
    }

    let m = &slab.lattice.matrix;
    let area = norm(&cross(&m[0], &m[1]));

    let surface_energy =
        (toten - bulk_per_atom * num_atoms as f64) / (2.0 * area) * EV_PER_A2_TO_J_PER_M2;

    Ok(ConvergenceRow {
        slab_thickness: captures[1].to_string(),
        vac_thickness: captures[2].to_string(),
        slab_index: captures[3].to_string(),
        surface_energy,
        slab_toten: toten,
        slab_per_atom: toten / num_atoms as f64,
        time_taken: summary.elapsed_sec.unwrap_or(0.0),
    })
}

/// 写 `<hkl>_data.csv`
pub fn write_csv(rows: &[ConvergenceRow], output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path).map_err(SlabgenError::CsvError)?;

    wtr.write_record([
        "slab_thickness",
        "vac_thickness",
        "slab_index",
        "surface_energy",
        "slab_toten",
        "slab_per_atom",
        "time_taken",
    ])
    .map_err(SlabgenError::CsvError)?;

    for row in rows {
        wtr.write_record(&[
            row.slab_thickness.clone(),
            row.vac_thickness.clone(),
            row.slab_index.clone(),
            format!("{:.6}", row.surface_energy),
            format!("{:.8}", row.slab_toten),
            format!("{:.8}", row.slab_per_atom),
            format!("{:.3}", row.time_taken),
        ])
        .map_err(SlabgenError::CsvError)?;
    }

    wtr.flush().map_err(|e| SlabgenError::FileWriteError {
        path: output_path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

/// 读回 `<hkl>_data.csv`
pub fn read_csv(path: &Path) -> Result<Vec<ConvergenceRow>> {
    let mut rdr = csv::Reader::from_path(path).map_err(SlabgenError::CsvError)?;
    let mut rows = Vec::new();

    for record in rdr.records() {
        let record = record.map_err(SlabgenError::CsvError)?;
        if record.len() < 7 {
            continue;
        }
        let parse_f = |i: usize| -> f64 { record[i].parse().unwrap_or(f64::NAN) };
        rows.push(ConvergenceRow {
            slab_thickness: record[0].to_string(),
            vac_thickness: record[1].to_string(),
            slab_index: record[2].to_string(),
            surface_energy: parse_f(3),
            slab_toten: parse_f(4),
            slab_per_atom: parse_f(5),
            time_taken: parse_f(6),
        });
    }

    Ok(rows)
}

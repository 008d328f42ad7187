//! # generate 命令实现
//!
//! 切面生成全流程：读体相 -> 氧化态 -> 枚举 Miller 指数 ->
//! 按 (真空, 厚度) 组合并行切面 -> 零偶极/对称筛选 -> 去重 ->
//! 警告 -> 写结构与输入文件。
//!
//! ## 输出布局
//! - 默认: `<化学式>/POSCAR_<hkl>_<slab>_<vac>_<index>.vasp`
//! - `--fols`: `<hkl>/<slab>_<vac>_<index>/POSCAR`
//! - `--input-files`: 同上目录再加 INCAR/KPOINTS/POTCAR.spec
//!
//! ## 依赖关系
//! - 使用 `cli/generate.rs` 定义的参数
//! - 使用 `surface/`, `models/`, `parsers/`, `vasp/`
//! - 使用 `utils/output.rs`, `utils/progress.rs`

use crate::cli::generate::{
    parse_element_map, parse_f64_list, parse_hkl, parse_incar_overrides, parse_potcar_overrides,
    GenerateArgs,
};
use crate::error::{Result, SlabgenError};
use crate::models::{Crystal, Slab};
use crate::parsers;
use crate::parsers::poscar;
use crate::surface::{self, assign_oxidation_states, distinct_miller_indices, OxidationMode};
use crate::surface::slabgen::SlabGenerator;
use crate::utils::{output, progress};
use crate::vasp::{self, config::PBESOL_SLAB_CONFIG, InputOverrides};

use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// 单位面积偶极阈值 (e/Å)
const POLARITY_TOL: f64 = 1e-3;

/// 去重比较容差
const LATTICE_TOL: f64 = 1e-4;
const SITE_TOL: f64 = 1e-5;

/// 一个待输出切面及其组合标签
struct SlabRecord {
    hkl: String,
    slab_t: f64,
    vac_t: f64,
    index: usize,
    slab: Slab,
}

impl SlabRecord {
    /// 组合标签 hkl_slab_vac_index，警告和文件名都用它
    fn label(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.hkl,
            fmt_thickness(self.slab_t),
            fmt_thickness(self.vac_t),
            self.index
        )
    }
}

/// 厚度显示：整数值不带小数点（20 而不是 20.0）
fn fmt_thickness(t: f64) -> String {
    if t.fract() == 0.0 {
        format!("{:.0}", t)
    } else {
        format!("{}", t)
    }
}

/// 执行 generate 命令
pub fn execute(args: GenerateArgs) -> Result<()> {
    output::print_header("Surface Slab Generation");

    let thicknesses = parse_f64_list(&args.thicknesses).map_err(SlabgenError::InvalidArgument)?;
    let vacuums = parse_f64_list(&args.vacuums).map_err(SlabgenError::InvalidArgument)?;

    // 读体相结构
    let mut bulk = parsers::parse_structure_file(&args.structure)?;
    let bulk_name = bulk.formula();
    output::print_success(&format!(
        "Loaded bulk structure: {} ({} atoms)",
        bulk_name,
        bulk.atoms.len()
    ));

    // 氧化态装配（偶极筛选的电荷来源）
    let ox_mode = resolve_ox_mode(&args)?;
    let balanced = assign_oxidation_states(&mut bulk, &ox_mode)?;
    if !balanced {
        output::print_warning(
            "No charge-neutral oxidation state combination found; \
             all sites treated as neutral for dipole screening",
        );
    } else if matches!(ox_mode, OxidationMode::Guess) {
        output::print_info(&format!("Guessed oxidation states: {}", describe_states(&bulk)));
    }

    // Miller 指数列表
    let millers = resolve_millers(&args, &bulk)?;

    // (真空, 厚度) 组合并行切面
    let combos: Vec<(f64, f64)> = vacuums
        .iter()
        .flat_map(|&vac| thicknesses.iter().map(move |&thick| (vac, thick)))
        .collect();

    let jobs = if args.jobs == 0 {
        num_cpus::get()
    } else {
        args.jobs
    };
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .unwrap();

    let pb = progress::create_progress_bar(combos.len() as u64, "Generating slabs");
    let batches: Vec<(f64, f64, Vec<Slab>)> = pool.install(|| {
        combos
            .par_iter()
            .map(|&(vac, thick)| {
                let mut slabs = Vec::new();
                for &miller in &millers {
                    match SlabGenerator::new(
                        &bulk,
                        miller,
                        thick,
                        vac,
                        !args.no_lll,
                        !args.no_center,
                    ) {
                        Ok(generator) => slabs.extend(generator.get_slabs()),
                        Err(e) => pb.suspend(|| {
                            output::print_error(&format!(
                                "({} {} {}): {}",
                                miller.0, miller.1, miller.2, e
                            ))
                        }),
                    }
                }
                pb.inc(1);
                (vac, thick, slabs)
            })
            .collect()
    });
    pb.finish_and_clear();

    // 零偶极 / 反演对称筛选；index 为组合内的枚举位置
    let mut provisional: Vec<SlabRecord> = Vec::new();
    for (vac, thick, slabs) in batches {
        for (index, slab) in slabs.into_iter().enumerate() {
            if slab.is_polar(POLARITY_TOL) {
                continue;
            }
            if !args.asymmetric && !slab.has_inversion(args.symprec) {
                continue;
            }
            provisional.push(SlabRecord {
                hkl: slab.hkl_string(),
                slab_t: thick,
                vac_t: vac,
                index,
                slab,
            });
        }
    }

    // 去重：保留第一次出现，记下被丢掉的组合
    let mut unique: Vec<SlabRecord> = Vec::new();
    let mut repeats: Vec<String> = Vec::new();
    let mut oversized: Vec<String> = Vec::new();

    for record in provisional {
        if unique
            .iter()
            .any(|seen| seen.slab.matches(&record.slab, LATTICE_TOL, SITE_TOL))
        {
            repeats.push(record.label());
        } else {
            if record.slab.num_atoms() > args.max_size {
                oversized.push(record.label());
            }
            unique.push(record);
        }
    }

    if !repeats.is_empty() {
        output::print_warn_list(
            "Not all combinations of hkl or slab/vacuum thickness were generated \
             because of repeat structures. The repeat slabs are:",
            &repeats,
        );
    }
    if !oversized.is_empty() {
        output::print_warn_list(
            "Some generated slabs exceed the max size specified. \
             Slabs that exceed the max size are:",
            &oversized,
        );
    }

    if unique.is_empty() {
        output::print_warning("No zero-dipole slabs survived screening, nothing to write");
        return Ok(());
    }

    // 写文件
    let written = if args.fols || args.input_files {
        write_with_folders(&args, &unique)?
    } else {
        write_flat(&args, &unique, &bulk_name)?
    };

    print_summary_table(&unique);
    output::print_done(&format!(
        "Wrote {} slab(s) to '{}'",
        written,
        args.output.display()
    ));

    Ok(())
}

/// 从参数解析氧化态赋值方式
fn resolve_ox_mode(args: &GenerateArgs) -> Result<OxidationMode> {
    if let Some(spec) = &args.ox_states_by_element {
        let map = parse_element_map(spec).map_err(SlabgenError::InvalidArgument)?;
        return Ok(OxidationMode::ByElement(map));
    }
    if let Some(spec) = &args.ox_states_by_site {
        let states = spec
            .split(',')
            .map(|s| s.trim().parse::<f64>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| {
                SlabgenError::InvalidArgument(format!("Invalid site oxidation states '{}'", spec))
            })?;
        return Ok(OxidationMode::BySite(states));
    }
    Ok(OxidationMode::Guess)
}

/// 元素 -> 氧化态 的可读摘要，如 "Na:+1, Cl:-1"
fn describe_states(bulk: &Crystal) -> String {
    let mut states: BTreeMap<&str, f64> = BTreeMap::new();
    for atom in &bulk.atoms {
        states.entry(atom.element.as_str()).or_insert(atom.charge());
    }
    states
        .into_iter()
        .map(|(el, q)| format!("{}:{:+}", el, q))
        .collect::<Vec<_>>()
        .join(", ")
}

/// 单指数或枚举到最大指数
fn resolve_millers(args: &GenerateArgs, bulk: &Crystal) -> Result<Vec<(i32, i32, i32)>> {
    if let Some(spec) = &args.hkl {
        let hkl = parse_hkl(spec).map_err(SlabgenError::InvalidArgument)?;
        let reduced = surface::reduce_miller(hkl)?;
        if reduced != hkl {
            output::print_info(&format!(
                "Reduced Miller index ({} {} {}) -> ({} {} {})",
                hkl.0, hkl.1, hkl.2, reduced.0, reduced.1, reduced.2
            ));
        }
        return Ok(vec![reduced]);
    }

    let max_index = args
        .max_index
        .ok_or_else(|| SlabgenError::InvalidArgument("--hkl or --max-index required".into()))?;
    if max_index < 1 {
        return Err(SlabgenError::InvalidArgument(
            "--max-index must be at least 1".into(),
        ));
    }

    let millers = distinct_miller_indices(bulk, max_index, args.symprec);
    output::print_info(&format!(
        "{} symmetrically distinct Miller indices up to max index {}",
        millers.len(),
        max_index
    ));
    Ok(millers)
}

/// 嵌套目录布局 hkl/slab_vac_index，可选输入文件
fn write_with_folders(args: &GenerateArgs, records: &[SlabRecord]) -> Result<usize> {
    let overrides = build_overrides(args)?;

    for record in records {
        let dir = args.output.join(&record.hkl).join(format!(
            "{}_{}_{}",
            fmt_thickness(record.slab_t),
            fmt_thickness(record.vac_t),
            record.index
        ));
        create_dir(&dir)?;

        if args.input_files {
            let warnings = vasp::write_input_set(
                &record.slab.crystal,
                &dir,
                &PBESOL_SLAB_CONFIG,
                &overrides,
                &args.functional,
            )?;
            for warning in warnings {
                output::print_warning(&warning);
            }
        } else {
            poscar::write_poscar_file(&record.slab.crystal, &dir.join("POSCAR"))?;
        }
    }

    Ok(records.len())
}

/// 平铺布局 <化学式>/POSCAR_hkl_slab_vac_index.vasp
fn write_flat(args: &GenerateArgs, records: &[SlabRecord], bulk_name: &str) -> Result<usize> {
    let dir = args.output.join(bulk_name);
    create_dir(&dir)?;

    for record in records {
        let filename = format!("POSCAR_{}.vasp", record.label());
        poscar::write_poscar_file(&record.slab.crystal, &dir.join(filename))?;
    }

    Ok(records.len())
}

fn create_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| SlabgenError::FileWriteError {
        path: dir.display().to_string(),
        source: e,
    })
}

fn build_overrides(args: &GenerateArgs) -> Result<InputOverrides> {
    let mut overrides = InputOverrides {
        reciprocal_density: args.update_kpoints,
        ..Default::default()
    };
    if let Some(spec) = &args.update_incar {
        overrides.incar = parse_incar_overrides(spec).map_err(SlabgenError::InvalidArgument)?;
    }
    if let Some(spec) = &args.update_potcar {
        overrides.potcar = parse_potcar_overrides(spec).map_err(SlabgenError::InvalidArgument)?;
    }
    Ok(overrides)
}

/// 生成结果汇总表
fn print_summary_table(records: &[SlabRecord]) {
    use tabled::{Table, Tabled};

    #[derive(Tabled)]
    struct SlabRow {
        #[tabled(rename = "(hkl)")]
        hkl: String,
        #[tabled(rename = "Slab (Å)")]
        slab_t: String,
        #[tabled(rename = "Vacuum (Å)")]
        vac_t: String,
        #[tabled(rename = "Index")]
        index: usize,
        #[tabled(rename = "Atoms")]
        atoms: usize,
    }

    let rows: Vec<SlabRow> = records
        .iter()
        .map(|r| SlabRow {
            hkl: r.hkl.clone(),
            slab_t: fmt_thickness(r.slab_t),
            vac_t: fmt_thickness(r.vac_t),
            index: r.index,
            atoms: r.slab.num_atoms(),
        })
        .collect();

    output::print_separator();
    let table = Table::new(&rows);
    println!("{}", table);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_thickness() {
        assert_eq!(fmt_thickness(20.0), "20");
        assert_eq!(fmt_thickness(12.5), "12.5");
        assert_eq!(fmt_thickness(0.0), "0");
    }
}

//! # VASP 输入文件模块
//!
//! 从配置字典组装一套切面静态计算输入：POSCAR + INCAR + KPOINTS +
//! POTCAR.spec，支持用户覆盖。
//!
//! ## 子模块
//! - `config`: PBEsol 默认配置（INCAR 标签、k 点密度、赝势符号表）
//! - `incar`: INCAR 值类型与格式化
//! - `kpoints`: 自动 k 点网格
//! - `potcar`: 赝势符号清单
//!
//! ## 依赖关系
//! - 被 `commands/generate.rs` 调用
//! - 使用 `models/`, `parsers/poscar.rs`

pub mod config;
pub mod incar;
pub mod kpoints;
pub mod potcar;

use crate::error::Result;
use crate::models::Crystal;
use crate::parsers::poscar;
use crate::vasp::config::InputConfig;
use crate::vasp::incar::IncarValue;

use std::path::Path;

/// 用户覆盖项
#[derive(Debug, Clone, Default)]
pub struct InputOverrides {
    /// INCAR 标签覆盖；值为 None 表示删除该标签
    pub incar: Vec<(String, Option<IncarValue>)>,

    /// KPOINTS 倒空间密度覆盖
    pub reciprocal_density: Option<f64>,

    /// POTCAR 符号覆盖（元素 -> 符号）
    pub potcar: Vec<(String, String)>,
}

/// 向目录写入一套完整的 VASP 输入文件
///
/// 返回警告信息（缺失的 POTCAR 映射等），warn-and-continue。
pub fn write_input_set(
    crystal: &Crystal,
    dir: &Path,
    config: &InputConfig,
    overrides: &InputOverrides,
    functional: &str,
) -> Result<Vec<String>> {
    let mut warnings = Vec::new();

    // POSCAR
    poscar::write_poscar_file(crystal, &dir.join("POSCAR"))?;

    // INCAR
    let tags = incar::merge_incar(&config.incar, &overrides.incar);
    std::fs::write(dir.join("INCAR"), incar::to_incar_string(&tags)).map_err(|e| {
        crate::error::SlabgenError::FileWriteError {
            path: dir.join("INCAR").display().to_string(),
            source: e,
        }
    })?;

    // KPOINTS
    let density = overrides
        .reciprocal_density
        .unwrap_or(config.reciprocal_density);
    let grid = kpoints::grid_from_reciprocal_density(crystal, density);
    std::fs::write(
        dir.join("KPOINTS"),
        kpoints::to_kpoints_string(&grid, density),
    )
    .map_err(|e| crate::error::SlabgenError::FileWriteError {
        path: dir.join("KPOINTS").display().to_string(),
        source: e,
    })?;

    // POTCAR.spec
    let (symbols, missing) = potcar::potcar_symbols(crystal, &config.potcar, &overrides.potcar);
    potcar::write_potcar_spec(&dir.join("POTCAR.spec"), functional, &symbols)?;
    for element in missing {
        warnings.push(format!(
            "No POTCAR symbol for element '{}', using bare element name",
            element
        ));
    }

    Ok(warnings)
}

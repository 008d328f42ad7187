//! # generate 子命令 CLI 定义
//!
//! 切面生成的全部参数以及列表型参数的解析函数。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/generate.rs`
//! - 使用 `vasp/incar.rs` 的值类型解析

use crate::vasp::incar::{parse_incar_value, IncarValue};

use clap::{ArgGroup, Args};
use std::collections::HashMap;
use std::path::PathBuf;

/// generate 子命令参数
#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("selection")
        .required(true)
        .args(["hkl", "max_index"]),
))]
pub struct GenerateArgs {
    /// Bulk structure file (POSCAR/CONTCAR, .vasp or .cif)
    pub structure: PathBuf,

    /// Generate slabs for a single Miller index, e.g. "1,0,1"
    #[arg(long)]
    pub hkl: Option<String>,

    /// Generate slabs for all distinct Miller indices up to this maximum
    #[arg(long)]
    pub max_index: Option<i32>,

    /// Minimum slab thicknesses in Angstrom, comma-separated (e.g. "20,40")
    #[arg(short, long)]
    pub thicknesses: String,

    /// Minimum vacuum thicknesses in Angstrom, comma-separated (e.g. "10,20")
    #[arg(short, long)]
    pub vacuums: String,

    /// Write each slab into nested hkl/slab_vacuum_index folders
    #[arg(long)]
    pub fols: bool,

    /// Also write INCAR, KPOINTS and POTCAR.spec into each folder (implies --fols)
    #[arg(long)]
    pub input_files: bool,

    /// Atom count above which a size warning is issued (the slab is still written)
    #[arg(long, default_value_t = 500)]
    pub max_size: usize,

    /// Skip LLL orthogonalization of the slab cell
    #[arg(long)]
    pub no_lll: bool,

    /// Do not center the slab in the middle of the vacuum
    #[arg(long)]
    pub no_center: bool,

    /// Keep all zero-dipole slabs, not only those with an inversion center
    /// (required for slabs cleaved from a non-centrosymmetric bulk)
    #[arg(long)]
    pub asymmetric: bool,

    /// Oxidation states by element, e.g. "Fe:3,O:-2" (default: guessed)
    #[arg(long, conflicts_with = "ox_states_by_site")]
    pub ox_states_by_element: Option<String>,

    /// Oxidation states by site, e.g. "3,3,-2,-2,-2" (default: guessed)
    #[arg(long)]
    pub ox_states_by_site: Option<String>,

    /// Functional recorded in POTCAR.spec
    #[arg(long, default_value = "PBE")]
    pub functional: String,

    /// Override INCAR tags, e.g. "ENCUT=600,ISPIN=2"; empty value removes a tag
    #[arg(long)]
    pub update_incar: Option<String>,

    /// Override the KPOINTS reciprocal density
    #[arg(long)]
    pub update_kpoints: Option<f64>,

    /// Override POTCAR symbols, e.g. "Ti:Ti_pv"
    #[arg(long)]
    pub update_potcar: Option<String>,

    /// Output directory
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,

    /// Number of parallel jobs (0 = auto)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Symmetry detection tolerance (fractional coordinates)
    #[arg(long, default_value_t = 1e-3)]
    pub symprec: f64,
}

/// 解析 Miller 指数 "1,0,-1"（也接受空格分隔）
pub fn parse_hkl(input: &str) -> Result<(i32, i32, i32), String> {
    let parts: Vec<i32> = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<i32>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("Invalid Miller index '{}'. Use e.g. \"1,0,1\"", input))?;

    if parts.len() != 3 {
        return Err(format!(
            "Miller index needs exactly 3 integers, got {} in '{}'",
            parts.len(),
            input
        ));
    }
    Ok((parts[0], parts[1], parts[2]))
}

/// 解析逗号分隔的浮点列表（厚度、真空）
pub fn parse_f64_list(input: &str) -> Result<Vec<f64>, String> {
    let values: Vec<f64> = input
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("Invalid number list '{}'", input))?;

    if values.is_empty() {
        return Err(format!("Empty list '{}'", input));
    }
    if values.iter().any(|v| *v < 0.0) {
        return Err(format!("Negative thickness in '{}'", input));
    }
    Ok(values)
}

/// 解析 "Fe:3,O:-2" 形式的元素映射
pub fn parse_element_map(input: &str) -> Result<HashMap<String, f64>, String> {
    let mut map = HashMap::new();
    for pair in input.split(',').filter(|s| !s.trim().is_empty()) {
        let (el, val) = pair
            .split_once(':')
            .ok_or_else(|| format!("Expected element:value, got '{}'", pair))?;
        let state: f64 = val
            .trim()
            .parse()
            .map_err(|_| format!("Invalid oxidation state '{}'", val))?;
        map.insert(el.trim().to_string(), state);
    }
    if map.is_empty() {
        return Err(format!("Empty element map '{}'", input));
    }
    Ok(map)
}

/// 解析 "TAG=VAL,TAG=" 形式的 INCAR 覆盖（空值表示删除）
pub fn parse_incar_overrides(input: &str) -> Result<Vec<(String, Option<IncarValue>)>, String> {
    let mut overrides = Vec::new();
    for pair in input.split(',').filter(|s| !s.trim().is_empty()) {
        let (tag, val) = pair
            .split_once('=')
            .ok_or_else(|| format!("Expected TAG=VALUE, got '{}'", pair))?;
        let tag = tag.trim().to_string();
        if tag.is_empty() {
            return Err(format!("Empty INCAR tag in '{}'", pair));
        }
        let value = if val.trim().is_empty() {
            None
        } else {
            Some(parse_incar_value(val))
        };
        overrides.push((tag, value));
    }
    Ok(overrides)
}

/// 解析 "Ti:Ti_pv,O:O_s" 形式的 POTCAR 覆盖
pub fn parse_potcar_overrides(input: &str) -> Result<Vec<(String, String)>, String> {
    let mut overrides = Vec::new();
    for pair in input.split(',').filter(|s| !s.trim().is_empty()) {
        let (el, sym) = pair
            .split_once(':')
            .ok_or_else(|| format!("Expected element:symbol, got '{}'", pair))?;
        overrides.push((el.trim().to_string(), sym.trim().to_string()));
    }
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hkl() {
        assert_eq!(parse_hkl("1,0,1").unwrap(), (1, 0, 1));
        assert_eq!(parse_hkl("1 0 -1").unwrap(), (1, 0, -1));
        assert_eq!(parse_hkl(" 2, 1, 0 ").unwrap(), (2, 1, 0));
        assert!(parse_hkl("1,0").is_err());
        assert!(parse_hkl("a,b,c").is_err());
    }

    #[test]
    fn test_parse_f64_list() {
        assert_eq!(parse_f64_list("20,40").unwrap(), vec![20.0, 40.0]);
        assert_eq!(parse_f64_list("12.5").unwrap(), vec![12.5]);
        assert!(parse_f64_list("").is_err());
        assert!(parse_f64_list("20,-5").is_err());
    }

    #[test]
    fn test_parse_element_map() {
        let map = parse_element_map("Fe:3,O:-2").unwrap();
        assert_eq!(map["Fe"], 3.0);
        assert_eq!(map["O"], -2.0);
        assert!(parse_element_map("Fe3").is_err());
    }

    #[test]
    fn test_parse_incar_overrides() {
        let overrides = parse_incar_overrides("ENCUT=600,NSW=,ALGO=Fast").unwrap();
        assert_eq!(overrides[0].0, "ENCUT");
        assert_eq!(overrides[0].1, Some(IncarValue::Int(600)));
        assert_eq!(overrides[1], ("NSW".to_string(), None));
        assert_eq!(
            overrides[2].1,
            Some(IncarValue::Str("Fast".to_string()))
        );
    }

    #[test]
    fn test_parse_potcar_overrides() {
        let overrides = parse_potcar_overrides("Ti:Ti_pv").unwrap();
        assert_eq!(overrides, vec![("Ti".to_string(), "Ti_pv".to_string())]);
        assert!(parse_potcar_overrides("Ti=Ti_pv").is_err());
    }
}

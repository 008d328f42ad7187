//! # POTCAR 符号表
//!
//! 按结构的元素顺序给出赝势符号并写 POTCAR.spec。
//! 赝势数据本身有授权限制，不随工具分发，这里只记录符号清单。
//!
//! ## 依赖关系
//! - 被 `vasp/mod.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{Result, SlabgenError};
use crate::models::Crystal;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// 结构元素顺序对应的赝势符号
///
/// 返回 (符号列表, 表里缺失的元素)。缺失元素退回裸元素符号，
/// 由调用方给出警告。
pub fn potcar_symbols(
    crystal: &Crystal,
    table: &HashMap<&'static str, &'static str>,
    overrides: &[(String, String)],
) -> (Vec<String>, Vec<String>) {
    let mut symbols = Vec::new();
    let mut missing = Vec::new();

    for element in crystal.element_order() {
        let overridden = overrides
            .iter()
            .find(|(el, _)| *el == element)
            .map(|(_, sym)| sym.clone());

        let symbol = match overridden {
            Some(sym) => sym,
            None => match table.get(element.as_str()) {
                Some(sym) => sym.to_string(),
                None => {
                    missing.push(element.clone());
                    element.clone()
                }
            },
        };
        symbols.push(symbol);
    }

    (symbols, missing)
}

/// 写 POTCAR.spec：首行注记泛函，随后每行一个赝势符号
pub fn write_potcar_spec(path: &Path, functional: &str, symbols: &[String]) -> Result<()> {
    let mut content = format!("# functional: {}\n", functional);
    for symbol in symbols {
        content.push_str(symbol);
        content.push('\n');
    }

    fs::write(path, content).map_err(|e| SlabgenError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice};
    use crate::vasp::config::PBESOL_SLAB_CONFIG;

    fn tio2() -> Crystal {
        let lattice = Lattice::from_parameters(4.6, 4.6, 3.0, 90.0, 90.0, 90.0);
        Crystal::new(
            "TiO2",
            lattice,
            vec![
                Atom::new("Ti", [0.0, 0.0, 0.0]),
                Atom::new("O", [0.3, 0.3, 0.0]),
                Atom::new("O", [0.7, 0.7, 0.0]),
            ],
        )
    }

    #[test]
    fn test_symbols_follow_element_order() {
        let (symbols, missing) = potcar_symbols(&tio2(), &PBESOL_SLAB_CONFIG.potcar, &[]);
        assert_eq!(symbols, vec!["Ti_sv", "O"]);
        assert!(missing.is_empty());
    }

    #[test]
    fn test_symbols_with_override() {
        let overrides = vec![("Ti".to_string(), "Ti_pv".to_string())];
        let (symbols, _) = potcar_symbols(&tio2(), &PBESOL_SLAB_CONFIG.potcar, &overrides);
        assert_eq!(symbols, vec!["Ti_pv", "O"]);
    }

    #[test]
    fn test_unknown_element_reported() {
        let lattice = Lattice::from_parameters(4.0, 4.0, 4.0, 90.0, 90.0, 90.0);
        let crystal = Crystal::new(
            "Xx",
            lattice,
            vec![Atom::new("Xx", [0.0, 0.0, 0.0])],
        );
        let (symbols, missing) = potcar_symbols(&crystal, &PBESOL_SLAB_CONFIG.potcar, &[]);
        assert_eq!(symbols, vec!["Xx"]);
        assert_eq!(missing, vec!["Xx"]);
    }
}

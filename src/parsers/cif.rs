//! # CIF 格式解析器
//!
//! 解析 P1 表示的 CIF 文件（显式原子列表，不展开对称操作）。
//!
//! ## 读取内容
//! ```text
//! _cell_length_a     5.64
//! _cell_length_b     5.64
//! _cell_length_c     5.64
//! _cell_angle_alpha  90.0
//! _cell_angle_beta   90.0
//! _cell_angle_gamma  90.0
//!
//! loop_
//! _atom_site_type_symbol
//! _atom_site_fract_x
//! _atom_site_fract_y
//! _atom_site_fract_z
//! Na 0.0 0.0 0.0
//! ...
//! ```
//!
//! ## 依赖关系
//! - 被 `parsers/mod.rs` 使用
//! - 使用 `models/structure.rs`

use crate::error::{Result, SlabgenError};
use crate::models::{Atom, Crystal, Lattice};
use std::fs;
use std::path::Path;

/// 解析 .cif 文件
pub fn parse_cif_file(path: &Path) -> Result<Crystal> {
    let content = fs::read_to_string(path).map_err(|e| SlabgenError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_cif_content(
        &content,
        path.file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("unknown"),
    )
}

/// 从字符串内容解析 CIF 格式
pub fn parse_cif_content(content: &str, default_name: &str) -> Result<Crystal> {
    let lines: Vec<&str> = content.lines().collect();

    let mut name = default_name.to_string();
    let mut cell = [f64::NAN; 6]; // a, b, c, alpha, beta, gamma
    let mut atoms: Vec<Atom> = Vec::new();

    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim();

        if let Some(rest) = line.strip_prefix("data_") {
            if !rest.is_empty() {
                name = rest.to_string();
            }
        } else if line.starts_with("_cell_") {
            parse_cell_item(line, &mut cell);
        } else if line == "loop_" {
            // 收集 loop 列头
            let mut tags: Vec<String> = Vec::new();
            let mut j = i + 1;
            while j < lines.len() && lines[j].trim().starts_with('_') {
                tags.push(lines[j].trim().to_lowercase());
                j += 1;
            }

            if tags.iter().any(|t| t.starts_with("_atom_site")) {
                let cols = SiteColumns::from_tags(&tags).ok_or_else(|| {
                    SlabgenError::ParseError {
                        format: "cif".to_string(),
                        path: default_name.to_string(),
                        reason: "atom_site loop lacks fractional coordinate columns".to_string(),
                    }
                })?;

                // 读数据行直到下一个 loop_/data_/标签行
                while j < lines.len() {
                    let row = lines[j].trim();
                    if row.is_empty()
                        || row.starts_with('_')
                        || row.starts_with("loop_")
                        || row.starts_with("data_")
                        || row.starts_with('#')
                    {
                        break;
                    }
                    let fields: Vec<&str> = row.split_whitespace().collect();
                    if fields.len() >= tags.len() {
                        if let Some(atom) = cols.parse_row(&fields) {
                            atoms.push(atom);
                        }
                    }
                    j += 1;
                }
            }
            i = j;
            continue;
        }

        i += 1;
    }

    for (idx, v) in cell.iter().enumerate() {
        if v.is_nan() {
            let keys = [
                "_cell_length_a",
                "_cell_length_b",
                "_cell_length_c",
                "_cell_angle_alpha",
                "_cell_angle_beta",
                "_cell_angle_gamma",
            ];
            return Err(SlabgenError::ParseError {
                format: "cif".to_string(),
                path: default_name.to_string(),
                reason: format!("Missing {}", keys[idx]),
            });
        }
    }

    if atoms.is_empty() {
        return Err(SlabgenError::ParseError {
            format: "cif".to_string(),
            path: default_name.to_string(),
            reason: "No atom_site entries found".to_string(),
        });
    }

    let lattice = Lattice::from_parameters(cell[0], cell[1], cell[2], cell[3], cell[4], cell[5]);
    Ok(Crystal::new(name, lattice, atoms))
}

fn parse_cell_item(line: &str, cell: &mut [f64; 6]) {
    let mut parts = line.split_whitespace();
    let key = parts.next().unwrap_or("").to_lowercase();
    let value = parts.next().and_then(parse_cif_number);

    let slot = match key.as_str() {
        "_cell_length_a" => 0,
        "_cell_length_b" => 1,
        "_cell_length_c" => 2,
        "_cell_angle_alpha" => 3,
        "_cell_angle_beta" => 4,
        "_cell_angle_gamma" => 5,
        _ => return,
    };
    if let Some(v) = value {
        cell[slot] = v;
    }
}

/// CIF 数值可能带括号不确定度，如 "5.6402(3)"
fn parse_cif_number(s: &str) -> Option<f64> {
    let clean = match s.find('(') {
        Some(pos) => &s[..pos],
        None => s,
    };
    clean.parse().ok()
}

/// atom_site loop 的列位置
struct SiteColumns {
    symbol: usize,
    x: usize,
    y: usize,
    z: usize,
}

impl SiteColumns {
    fn from_tags(tags: &[String]) -> Option<Self> {
        let find = |name: &str| tags.iter().position(|t| t == name);

        // 优先 type_symbol，缺失时退回 label（去掉数字后缀）
        let symbol = find("_atom_site_type_symbol").or_else(|| find("_atom_site_label"))?;
        Some(SiteColumns {
            symbol,
            x: find("_atom_site_fract_x")?,
            y: find("_atom_site_fract_y")?,
            z: find("_atom_site_fract_z")?,
        })
    }

    fn parse_row(&self, fields: &[&str]) -> Option<Atom> {
        let element: String = fields
            .get(self.symbol)?
            .chars()
            .take_while(|c| c.is_ascii_alphabetic())
            .collect();
        if element.is_empty() {
            return None;
        }

        let x = parse_cif_number(fields.get(self.x)?)?;
        let y = parse_cif_number(fields.get(self.y)?)?;
        let z = parse_cif_number(fields.get(self.z)?)?;

        Some(Atom::new(element, [x, y, z]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NACL_CIF: &str = r#"data_NaCl
_cell_length_a     5.6402(3)
_cell_length_b     5.6402
_cell_length_c     5.6402
_cell_angle_alpha  90.0
_cell_angle_beta   90.0
_cell_angle_gamma  90.0

loop_
_atom_site_label
_atom_site_type_symbol
_atom_site_fract_x
_atom_site_fract_y
_atom_site_fract_z
Na1 Na 0.0 0.0 0.0
Na2 Na 0.5 0.5 0.0
Cl1 Cl 0.5 0.0 0.0
Cl2 Cl 0.0 0.5 0.0
"#;

    #[test]
    fn test_parse_cif_basic() {
        let crystal = parse_cif_content(NACL_CIF, "fallback").unwrap();
        assert_eq!(crystal.name, "NaCl");
        assert_eq!(crystal.atoms.len(), 4);

        let (a, _, _, _, _, gamma) = crystal.lattice.parameters();
        assert!((a - 5.6402).abs() < 1e-6);
        assert!((gamma - 90.0).abs() < 1e-6);

        assert_eq!(crystal.atoms[0].element, "Na");
        assert_eq!(crystal.atoms[2].element, "Cl");
        assert!((crystal.atoms[1].position[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_cif_label_only() {
        let content = r#"data_Si
_cell_length_a 5.43
_cell_length_b 5.43
_cell_length_c 5.43
_cell_angle_alpha 90
_cell_angle_beta 90
_cell_angle_gamma 90
loop_
_atom_site_label
_atom_site_fract_x
_atom_site_fract_y
_atom_site_fract_z
Si1 0.0 0.0 0.0
Si2 0.25 0.25 0.25
"#;
        let crystal = parse_cif_content(content, "Si").unwrap();
        assert_eq!(crystal.atoms.len(), 2);
        // 标签去掉数字后缀
        assert_eq!(crystal.atoms[0].element, "Si");
        assert_eq!(crystal.atoms[1].element, "Si");
    }

    #[test]
    fn test_parse_cif_missing_cell() {
        let content = r#"data_X
_cell_length_a 5.43
loop_
_atom_site_label
_atom_site_fract_x
_atom_site_fract_y
_atom_site_fract_z
Si1 0.0 0.0 0.0
"#;
        assert!(parse_cif_content(content, "X").is_err());
    }

    #[test]
    fn test_parse_cif_no_atoms() {
        let content = r#"data_X
_cell_length_a 5.43
_cell_length_b 5.43
_cell_length_c 5.43
_cell_angle_alpha 90
_cell_angle_beta 90
_cell_angle_gamma 90
"#;
        assert!(parse_cif_content(content, "X").is_err());
    }
}

//! # 氧化态赋值
//!
//! 切面极性筛选需要每个原子带氧化态。支持三种赋值方式：
//! 按元素指定、按位点指定、或从常见氧化态表猜测一个电中性组合。
//!
//! ## 数据来源
//! 常见氧化态表按"越常见越靠前"排序，覆盖 H–Pu 的常用元素。
//!
//! ## 依赖关系
//! - 被 `commands/generate.rs` 调用
//! - 使用 `models/structure.rs`
//! - 静态数据表，无外部模块依赖

use crate::error::{Result, SlabgenError};
use crate::models::Crystal;

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

/// 氧化态赋值方式
#[derive(Debug, Clone)]
pub enum OxidationMode {
    /// 从常见氧化态表猜测电中性组合
    Guess,
    /// 按元素指定，如 {"Fe": 3, "O": -2}
    ByElement(HashMap<String, f64>),
    /// 按位点顺序指定，长度必须等于原子数
    BySite(Vec<f64>),
}

/// 常见氧化态表，每个元素按常见程度降序
pub static COMMON_OXIDATION_STATES: LazyLock<HashMap<&'static str, &'static [i32]>> =
    LazyLock::new(|| {
        let mut m: HashMap<&'static str, &'static [i32]> = HashMap::new();

        m.insert("H", &[1, -1]);
        m.insert("Li", &[1]);
        m.insert("Be", &[2]);
        m.insert("B", &[3]);
        m.insert("C", &[4, -4, 2]);
        m.insert("N", &[-3, 3, 5]);
        m.insert("O", &[-2]);
        m.insert("F", &[-1]);
        m.insert("Na", &[1]);
        m.insert("Mg", &[2]);
        m.insert("Al", &[3]);
        m.insert("Si", &[4, -4]);
        m.insert("P", &[5, 3, -3]);
        m.insert("S", &[-2, 6, 4, 2]);
        m.insert("Cl", &[-1, 7, 5, 3, 1]);
        m.insert("K", &[1]);
        m.insert("Ca", &[2]);
        m.insert("Sc", &[3]);
        m.insert("Ti", &[4, 3, 2]);
        m.insert("V", &[5, 4, 3, 2]);
        m.insert("Cr", &[3, 6, 2]);
        m.insert("Mn", &[2, 4, 7, 3, 6]);
        m.insert("Fe", &[3, 2]);
        m.insert("Co", &[2, 3]);
        m.insert("Ni", &[2, 3]);
        m.insert("Cu", &[2, 1]);
        m.insert("Zn", &[2]);
        m.insert("Ga", &[3]);
        m.insert("Ge", &[4, 2, -4]);
        m.insert("As", &[5, 3, -3]);
        m.insert("Se", &[-2, 6, 4]);
        m.insert("Br", &[-1, 5, 3, 1]);
        m.insert("Rb", &[1]);
        m.insert("Sr", &[2]);
        m.insert("Y", &[3]);
        m.insert("Zr", &[4]);
        m.insert("Nb", &[5, 3]);
        m.insert("Mo", &[6, 4, 3]);
        m.insert("Tc", &[7, 4]);
        m.insert("Ru", &[4, 3, 8]);
        m.insert("Rh", &[3]);
        m.insert("Pd", &[2, 4]);
        m.insert("Ag", &[1]);
        m.insert("Cd", &[2]);
        m.insert("In", &[3, 1]);
        m.insert("Sn", &[4, 2]);
        m.insert("Sb", &[3, 5, -3]);
        m.insert("Te", &[-2, 6, 4]);
        m.insert("I", &[-1, 7, 5, 1]);
        m.insert("Cs", &[1]);
        m.insert("Ba", &[2]);
        m.insert("La", &[3]);
        m.insert("Ce", &[3, 4]);
        m.insert("Pr", &[3]);
        m.insert("Nd", &[3]);
        m.insert("Pm", &[3]);
        m.insert("Sm", &[3, 2]);
        m.insert("Eu", &[3, 2]);
        m.insert("Gd", &[3]);
        m.insert("Tb", &[3, 4]);
        m.insert("Dy", &[3]);
        m.insert("Ho", &[3]);
        m.insert("Er", &[3]);
        m.insert("Tm", &[3, 2]);
        m.insert("Yb", &[3, 2]);
        m.insert("Lu", &[3]);
        m.insert("Hf", &[4]);
        m.insert("Ta", &[5]);
        m.insert("W", &[6, 4]);
        m.insert("Re", &[7, 4]);
        m.insert("Os", &[4, 8]);
        m.insert("Ir", &[4, 3]);
        m.insert("Pt", &[2, 4]);
        m.insert("Au", &[3, 1]);
        m.insert("Hg", &[2, 1]);
        m.insert("Tl", &[1, 3]);
        m.insert("Pb", &[2, 4]);
        m.insert("Bi", &[3, 5]);
        m.insert("Th", &[4]);
        m.insert("Pa", &[5]);
        m.insert("U", &[6, 4]);
        m.insert("Np", &[5]);
        m.insert("Pu", &[4, 6]);

        m
    });

/// 给结构装配氧化态
///
/// 猜测模式找不到电中性组合时所有位点记 0 并返回 `Ok(false)`，
/// 由调用方给出警告（warn-and-continue）。
pub fn assign_oxidation_states(crystal: &mut Crystal, mode: &OxidationMode) -> Result<bool> {
    match mode {
        OxidationMode::ByElement(map) => {
            for atom in &mut crystal.atoms {
                let state = map.get(&atom.element).ok_or_else(|| {
                    SlabgenError::InvalidArgument(format!(
                        "No oxidation state supplied for element '{}'",
                        atom.element
                    ))
                })?;
                atom.oxidation = Some(*state);
            }
            Ok(true)
        }
        OxidationMode::BySite(states) => {
            if states.len() != crystal.atoms.len() {
                return Err(SlabgenError::InvalidArgument(format!(
                    "Oxidation state list has {} entries but the structure has {} sites",
                    states.len(),
                    crystal.atoms.len()
                )));
            }
            for (atom, state) in crystal.atoms.iter_mut().zip(states.iter()) {
                atom.oxidation = Some(*state);
            }
            Ok(true)
        }
        OxidationMode::Guess => match guess_oxidation_states(crystal) {
            Some(guessed) => {
                for atom in &mut crystal.atoms {
                    atom.oxidation = Some(guessed[&atom.element] as f64);
                }
                Ok(true)
            }
            None => {
                for atom in &mut crystal.atoms {
                    atom.oxidation = Some(0.0);
                }
                Ok(false)
            }
        },
    }
}

/// 猜测电中性的氧化态组合
///
/// 每个元素取常见氧化态之一，要求总电荷为零；
/// 在所有可行组合里选常见度排名之和最小的。
pub fn guess_oxidation_states(crystal: &Crystal) -> Option<HashMap<String, i32>> {
    let mut counts: BTreeMap<&str, i64> = BTreeMap::new();
    for atom in &crystal.atoms {
        *counts.entry(atom.element.as_str()).or_insert(0) += 1;
    }

    let elements: Vec<(&str, i64)> = counts.into_iter().collect();
    let candidates: Vec<&[i32]> = elements
        .iter()
        .map(|(el, _)| COMMON_OXIDATION_STATES.get(el).copied().unwrap_or(&[]))
        .collect();

    // 任一元素没有候选态就无法猜测
    if candidates.iter().any(|c| c.is_empty()) {
        return None;
    }

    // 元素种类少（一般 <= 5），直接穷举
    let mut best: Option<(usize, Vec<i32>)> = None;
    let mut assignment = vec![0i32; elements.len()];
    search_neutral(
        &elements,
        &candidates,
        0,
        0,
        0,
        &mut assignment,
        &mut best,
    );

    best.map(|(_, states)| {
        elements
            .iter()
            .zip(states.iter())
            .map(|((el, _), st)| (el.to_string(), *st))
            .collect()
    })
}

fn search_neutral(
    elements: &[(&str, i64)],
    candidates: &[&[i32]],
    depth: usize,
    charge: i64,
    score: usize,
    assignment: &mut Vec<i32>,
    best: &mut Option<(usize, Vec<i32>)>,
) {
    if depth == elements.len() {
        if charge == 0 {
            match best {
                Some((best_score, _)) if *best_score <= score => {}
                _ => *best = Some((score, assignment.clone())),
            }
        }
        return;
    }

    let count = elements[depth].1;
    for (rank, &state) in candidates[depth].iter().enumerate() {
        assignment[depth] = state;
        search_neutral(
            elements,
            candidates,
            depth + 1,
            charge + state as i64 * count,
            score + rank,
            assignment,
            best,
        );
    }
}

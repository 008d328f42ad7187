//! # 切面 (slab) 数据模型
//!
//! 带 Miller 指数和切割位置的周期性平板结构，以及生成流程需要的
//! 几何判据：表面法向、偶极、反演对称性和结构等价比较。
//!
//! ## 依赖关系
//! - 被 `surface/slabgen.rs` 构造
//! - 被 `commands/generate.rs` 筛选、去重、输出
//! - 使用 `models/structure.rs`

use crate::models::structure::{cross, dot, norm, pbc_delta, Crystal};

use std::collections::HashMap;

/// 表面切面：真空方向沿 c 轴的周期平板
#[derive(Debug, Clone)]
pub struct Slab {
    /// 平板结构（c 轴含真空层）
    pub crystal: Crystal,

    /// 表面 Miller 指数
    pub miller: (i32, i32, i32),

    /// 切割终止面在取向晶胞中的分数 c 坐标
    pub shift: f64,
}

impl Slab {
    pub fn new(crystal: Crystal, miller: (i32, i32, i32), shift: f64) -> Self {
        Slab {
            crystal,
            miller,
            shift,
        }
    }

    /// 原子数
    pub fn num_atoms(&self) -> usize {
        self.crystal.atoms.len()
    }

    /// Miller 指数的紧凑写法，如 (1,0,-1) -> "10-1"
    pub fn hkl_string(&self) -> String {
        let (h, k, l) = self.miller;
        format!("{}{}{}", h, k, l)
    }

    /// 单位表面法向（a × b 方向）
    pub fn normal(&self) -> [f64; 3] {
        let m = &self.crystal.lattice.matrix;
        let n = cross(&m[0], &m[1]);
        let len = norm(&n);
        [n[0] / len, n[1] / len, n[2] / len]
    }

    /// 表面积 |a × b| (Å²)
    pub fn surface_area(&self) -> f64 {
        let m = &self.crystal.lattice.matrix;
        norm(&cross(&m[0], &m[1]))
    }

    /// 沿法向的偶极矩 (e·Å)，电荷取自氧化态
    pub fn dipole(&self) -> f64 {
        let carts = self.crystal.cart_coords();
        let n = carts.len();
        if n == 0 {
            return 0.0;
        }

        let mut mid = [0.0; 3];
        for r in &carts {
            for t in 0..3 {
                mid[t] += r[t] / n as f64;
            }
        }

        let normal = self.normal();
        let mut dipole = 0.0;
        for (atom, r) in self.crystal.atoms.iter().zip(carts.iter()) {
            let rel = [r[0] - mid[0], r[1] - mid[1], r[2] - mid[2]];
            dipole += atom.charge() * dot(&rel, &normal);
        }
        dipole
    }

    /// 极性判定：单位面积偶极超过阈值 (e/Å) 即为极性面
    pub fn is_polar(&self, tol_dipole_per_unit_area: f64) -> bool {
        self.dipole().abs() / self.surface_area() > tol_dipole_per_unit_area
    }

    /// 反演对称判定：是否存在反演中心把原子集合映回自身
    ///
    /// 候选中心取最少数目元素的像点对中点（含半格平移），
    /// 每个候选对全部原子验证 2c - x 是否落在同种原子上。
    pub fn has_inversion(&self, symprec: f64) -> bool {
        let atoms = &self.crystal.atoms;
        if atoms.is_empty() {
            return true;
        }

        // 按元素分组
        let mut by_element: HashMap<&str, Vec<usize>> = HashMap::new();
        for (i, atom) in atoms.iter().enumerate() {
            by_element.entry(atom.element.as_str()).or_default().push(i);
        }

        // 最少的一组限制候选中心数量
        let rare = by_element
            .values()
            .min_by_key(|v| v.len())
            .expect("non-empty atom list");

        let x0 = atoms[rare[0]].position;
        for &j in rare {
            let xj = atoms[j].position;
            // 反演满足 2c ≡ x0 + xj (mod 1)，半格平移是额外的自由度
            for half in 0..8u32 {
                let t = [
                    (half & 1) as f64 * 0.5,
                    ((half >> 1) & 1) as f64 * 0.5,
                    ((half >> 2) & 1) as f64 * 0.5,
                ];
                let center = [
                    (x0[0] + xj[0]) / 2.0 + t[0],
                    (x0[1] + xj[1]) / 2.0 + t[1],
                    (x0[2] + xj[2]) / 2.0 + t[2],
                ];
                if self.check_inversion_center(&center, symprec) {
                    return true;
                }
            }
        }
        false
    }

    fn check_inversion_center(&self, center: &[f64; 3], symprec: f64) -> bool {
        let atoms = &self.crystal.atoms;
        for atom in atoms {
            let image = [
                2.0 * center[0] - atom.position[0],
                2.0 * center[1] - atom.position[1],
                2.0 * center[2] - atom.position[2],
            ];
            let found = atoms.iter().any(|other| {
                other.element == atom.element
                    && pbc_delta(other.position[0] - image[0]) < symprec
                    && pbc_delta(other.position[1] - image[1]) < symprec
                    && pbc_delta(other.position[2] - image[2]) < symprec
            });
            if !found {
                return false;
            }
        }
        true
    }

    /// 结构等价判定：晶格矩阵一致且原子（元素 + 分数坐标）逐一匹配
    ///
    /// 用于重复切面去重。同一生成管线产生的重复结构坐标完全一致，
    /// 这里只留数值容差，不做约化晶胞匹配。
    pub fn matches(&self, other: &Slab, latt_tol: f64, site_tol: f64) -> bool {
        self.lattice_close(other, latt_tol) && self.sites_match(other, &[0.0; 3], site_tol)
    }

    /// 允许整体刚性平移的结构等价判定
    ///
    /// 同一 Miller 指数的不同切割位置可能给出只差一个平移的终止面，
    /// 候选平移取"首原子映到任一同种原子"。
    pub fn matches_up_to_translation(&self, other: &Slab, latt_tol: f64, site_tol: f64) -> bool {
        if !self.lattice_close(other, latt_tol) || self.num_atoms() != other.num_atoms() {
            return false;
        }
        let first = match self.crystal.atoms.first() {
            Some(a) => a,
            None => return true,
        };
        other
            .crystal
            .atoms
            .iter()
            .filter(|c| c.element == first.element)
            .any(|candidate| {
                let t = [
                    candidate.position[0] - first.position[0],
                    candidate.position[1] - first.position[1],
                    candidate.position[2] - first.position[2],
                ];
                self.sites_match(other, &t, site_tol)
            })
    }

    fn lattice_close(&self, other: &Slab, latt_tol: f64) -> bool {
        let ma = &self.crystal.lattice.matrix;
        let mb = &other.crystal.lattice.matrix;
        for i in 0..3 {
            for j in 0..3 {
                if (ma[i][j] - mb[i][j]).abs() > latt_tol {
                    return false;
                }
            }
        }
        true
    }

    /// self 平移 t 后与 other 的原子是否一一对应
    fn sites_match(&self, other: &Slab, t: &[f64; 3], site_tol: f64) -> bool {
        if self.num_atoms() != other.num_atoms() {
            return false;
        }
        let mut used = vec![false; other.crystal.atoms.len()];
        for atom in &self.crystal.atoms {
            let shifted = [
                atom.position[0] + t[0],
                atom.position[1] + t[1],
                atom.position[2] + t[2],
            ];
            let mut matched = false;
            for (j, candidate) in other.crystal.atoms.iter().enumerate() {
                if used[j] || candidate.element != atom.element {
                    continue;
                }
                if pbc_delta(candidate.position[0] - shifted[0]) < site_tol
                    && pbc_delta(candidate.position[1] - shifted[1]) < site_tol
                    && pbc_delta(candidate.position[2] - shifted[2]) < site_tol
                {
                    used[j] = true;
                    matched = true;
                    break;
                }
            }
            if !matched {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::structure::{Atom, Lattice};

    fn slab_cell() -> Lattice {
        Lattice::from_vectors([[4.0, 0.0, 0.0], [0.0, 4.0, 0.0], [0.0, 0.0, 20.0]])
    }

    #[test]
    fn test_surface_area_and_normal() {
        let slab = Slab::new(
            Crystal::new("t", slab_cell(), vec![Atom::new("Si", [0.0, 0.0, 0.5])]),
            (0, 0, 1),
            0.0,
        );
        assert!((slab.surface_area() - 16.0).abs() < 1e-9);
        let n = slab.normal();
        assert!((n[2].abs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_polar_slab_detected() {
        // Na 层和 Cl 层分居两端：沿 c 有净偶极
        let atoms = vec![
            Atom::new("Na", [0.0, 0.0, 0.4]).with_oxidation(1.0),
            Atom::new("Cl", [0.5, 0.5, 0.6]).with_oxidation(-1.0),
        ];
        let slab = Slab::new(Crystal::new("NaCl", slab_cell(), atoms), (0, 0, 1), 0.0);
        assert!(slab.is_polar(1e-3));
    }

    #[test]
    fn test_nonpolar_slab() {
        // 对称排布：Cl-Mg-Cl，偶极相消
        let atoms = vec![
            Atom::new("Cl", [0.0, 0.0, 0.4]).with_oxidation(-1.0),
            Atom::new("Mg", [0.5, 0.5, 0.5]).with_oxidation(2.0),
            Atom::new("Cl", [0.0, 0.0, 0.6]).with_oxidation(-1.0),
        ];
        let slab = Slab::new(Crystal::new("t", slab_cell(), atoms), (0, 0, 1), 0.0);
        assert!(!slab.is_polar(1e-3));
    }

    #[test]
    fn test_has_inversion_symmetric() {
        let atoms = vec![
            Atom::new("O", [0.1, 0.2, 0.40]),
            Atom::new("Ti", [0.5, 0.5, 0.50]),
            Atom::new("O", [0.9, 0.8, 0.60]),
        ];
        let slab = Slab::new(Crystal::new("t", slab_cell(), atoms), (0, 0, 1), 0.0);
        assert!(slab.has_inversion(1e-4));
    }

    #[test]
    fn test_has_inversion_broken() {
        let atoms = vec![
            Atom::new("O", [0.1, 0.2, 0.40]),
            Atom::new("Ti", [0.5, 0.5, 0.50]),
            Atom::new("O", [0.9, 0.8, 0.63]),
        ];
        let slab = Slab::new(Crystal::new("t", slab_cell(), atoms), (0, 0, 1), 0.0);
        assert!(!slab.has_inversion(1e-4));
    }

    #[test]
    fn test_has_inversion_cell_center() {
        // 反演中心在胞心：x -> (1,1,1) - x
        let atoms = vec![
            Atom::new("Si", [0.2, 0.3, 0.45]),
            Atom::new("Si", [0.8, 0.7, 0.55]),
        ];
        let slab = Slab::new(Crystal::new("t", slab_cell(), atoms), (0, 0, 1), 0.0);
        assert!(slab.has_inversion(1e-4));
    }

    #[test]
    fn test_matches_duplicate() {
        let atoms = vec![
            Atom::new("Si", [0.0, 0.0, 0.45]),
            Atom::new("Si", [0.5, 0.5, 0.55]),
        ];
        let a = Slab::new(
            Crystal::new("a", slab_cell(), atoms.clone()),
            (0, 0, 1),
            0.0,
        );
        // 原子顺序不同仍算同一结构
        let reordered = vec![atoms[1].clone(), atoms[0].clone()];
        let b = Slab::new(Crystal::new("b", slab_cell(), reordered), (0, 0, 1), 0.5);
        assert!(a.matches(&b, 1e-4, 1e-5));
    }

    #[test]
    fn test_matches_rejects_different() {
        let a = Slab::new(
            Crystal::new("a", slab_cell(), vec![Atom::new("Si", [0.0, 0.0, 0.45])]),
            (0, 0, 1),
            0.0,
        );
        let b = Slab::new(
            Crystal::new("b", slab_cell(), vec![Atom::new("Si", [0.0, 0.0, 0.52])]),
            (0, 0, 1),
            0.0,
        );
        assert!(!a.matches(&b, 1e-4, 1e-5));
    }

    #[test]
    fn test_matches_up_to_translation() {
        let atoms_a = vec![
            Atom::new("Na", [0.0, 0.0, 0.45]),
            Atom::new("Cl", [0.5, 0.5, 0.55]),
        ];
        // 面内平移 (0.5, 0) 后的同一结构
        let atoms_b = vec![
            Atom::new("Na", [0.5, 0.0, 0.45]),
            Atom::new("Cl", [0.0, 0.5, 0.55]),
        ];
        let a = Slab::new(Crystal::new("a", slab_cell(), atoms_a), (0, 0, 1), 0.0);
        let b = Slab::new(Crystal::new("b", slab_cell(), atoms_b), (0, 0, 1), 0.5);

        assert!(!a.matches(&b, 1e-4, 1e-5));
        assert!(a.matches_up_to_translation(&b, 1e-4, 1e-5));
    }

    #[test]
    fn test_hkl_string_negative_index() {
        let slab = Slab::new(
            Crystal::new("t", slab_cell(), vec![Atom::new("Si", [0.0, 0.0, 0.5])]),
            (1, 0, -1),
            0.0,
        );
        assert_eq!(slab.hkl_string(), "10-1");
    }
}

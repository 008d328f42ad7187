//! # KPOINTS 生成
//!
//! 由倒空间网格密度自动确定 k 点网格。
//!
//! ## 算法
//! 网格点数 n = 密度 × 倒胞体积，按晶格边长分配：
//! n_i = floor((n·abc)^(1/3) / l_i)，至少为 1。
//! 有奇数分割或六方晶格时用 Γ 心网格，否则 Monkhorst-Pack。
//!
//! ## 依赖关系
//! - 被 `vasp/mod.rs` 使用
//! - 使用 `models/structure.rs`

use crate::models::Crystal;

/// k 点网格
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KpointGrid {
    /// 各方向分割数
    pub divisions: [usize; 3],

    /// Γ 心（否则 Monkhorst-Pack）
    pub gamma_centered: bool,
}

/// 按倒空间密度生成网格
pub fn grid_from_reciprocal_density(crystal: &Crystal, reciprocal_density: f64) -> KpointGrid {
    let recip = crystal.lattice.reciprocal();
    let recip_volume = crate::models::structure::dot(
        &recip[0],
        &crate::models::structure::cross(&recip[1], &recip[2]),
    )
    .abs();

    let ngrid = reciprocal_density * recip_volume;

    let [a, b, c] = crystal.lattice.abc();
    let mult = (ngrid * a * b * c).cbrt();

    let divisions = [
        ((mult / a).floor() as usize).max(1),
        ((mult / b).floor() as usize).max(1),
        ((mult / c).floor() as usize).max(1),
    ];

    let has_odd = divisions.iter().any(|d| d % 2 == 1);
    let gamma_centered = has_odd || crystal.lattice.is_hexagonal();

    KpointGrid {
        divisions,
        gamma_centered,
    }
}

/// KPOINTS 文件内容
pub fn to_kpoints_string(grid: &KpointGrid, reciprocal_density: f64) -> String {
    format!(
        "Automatic mesh, reciprocal density = {}\n0\n{}\n{} {} {}\n0 0 0\n",
        reciprocal_density,
        if grid.gamma_centered {
            "Gamma"
        } else {
            "Monkhorst"
        },
        grid.divisions[0],
        grid.divisions[1],
        grid.divisions[2],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Crystal, Lattice};

    fn cubic_crystal(a: f64) -> Crystal {
        let lattice = Lattice::from_vectors([[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]]);
        Crystal::new("X", lattice, vec![Atom::new("Si", [0.0, 0.0, 0.0])])
    }

    #[test]
    fn test_cubic_grid_isotropic() {
        let crystal = cubic_crystal(4.0);
        let grid = grid_from_reciprocal_density(&crystal, 90.0);

        assert_eq!(grid.divisions[0], grid.divisions[1]);
        assert_eq!(grid.divisions[1], grid.divisions[2]);
        assert!(grid.divisions[0] >= 3);
    }

    #[test]
    fn test_slab_cell_fewer_kpoints_along_c() {
        // 真空拉长 c：c 方向 k 点应该最少
        let lattice = Lattice::from_vectors([
            [4.0, 0.0, 0.0],
            [0.0, 4.0, 0.0],
            [0.0, 0.0, 40.0],
        ]);
        let crystal = Crystal::new("slab", lattice, vec![Atom::new("Si", [0.0, 0.0, 0.5])]);
        let grid = grid_from_reciprocal_density(&crystal, 90.0);

        assert!(grid.divisions[2] < grid.divisions[0]);
        assert_eq!(grid.divisions[2], 1);
    }

    #[test]
    fn test_hexagonal_forces_gamma() {
        let lattice = Lattice::from_parameters(3.0, 3.0, 5.0, 90.0, 90.0, 120.0);
        let crystal = Crystal::new("hex", lattice, vec![Atom::new("C", [0.0, 0.0, 0.0])]);
        let grid = grid_from_reciprocal_density(&crystal, 200.0);

        assert!(grid.gamma_centered);
    }

    #[test]
    fn test_kpoints_string_layout() {
        let grid = KpointGrid {
            divisions: [5, 5, 1],
            gamma_centered: true,
        };
        let s = to_kpoints_string(&grid, 90.0);
        let lines: Vec<&str> = s.lines().collect();

        assert_eq!(lines[1], "0");
        assert_eq!(lines[2], "Gamma");
        assert_eq!(lines[3], "5 5 1");
        assert_eq!(lines[4], "0 0 0");
    }

    #[test]
    fn test_higher_density_more_points() {
        let crystal = cubic_crystal(4.0);
        let low = grid_from_reciprocal_density(&crystal, 50.0);
        let high = grid_from_reciprocal_density(&crystal, 500.0);
        assert!(high.divisions[0] > low.divisions[0]);
    }
}

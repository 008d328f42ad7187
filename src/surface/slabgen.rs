//! # 切面生成器
//!
//! 从体相结构和 Miller 指数切出平板。
//!
//! ## 算法概述
//! 1. 扩展欧几里得构造整数换基 (c1, c2, c3)：
//!    h·c1 = h·c2 = 0（面内），h·c3 = 1（出面）
//! 2. 换基得到取向晶胞，其 c 轴在法向上的投影即层高
//! 3. 沿 c 对原子分数坐标做周期单链聚类，簇间中点为候选切割位置
//! 4. 每个切割位置：堆叠满足最小厚度的层数，再加真空层高
//! 5. 可选 LLL 约化（正交化）和真空居中
//!
//! ## 依赖关系
//! - 被 `commands/generate.rs` 调用
//! - 使用 `models/structure.rs`, `models/slab.rs`
//! - 使用 `surface/miller.rs` 的 gcd

use crate::error::{Result, SlabgenError};
use crate::models::structure::{dot, invert_3x3, norm, wrap_frac, Atom, Crystal, Lattice};
use crate::models::Slab;
use crate::surface::miller::gcd3;

/// 切面生成器：固定体相、Miller 指数和厚度要求
pub struct SlabGenerator {
    miller: (i32, i32, i32),
    min_slab_size: f64,
    min_vacuum_size: f64,
    lll_reduce: bool,
    center_slab: bool,
    /// 终止面聚类容差 (Å)
    cluster_tol: f64,
    bulk_formula: String,
    oriented: Crystal,
    normal: [f64; 3],
    proj_height: f64,
}

impl SlabGenerator {
    pub fn new(
        bulk: &Crystal,
        miller: (i32, i32, i32),
        min_slab_size: f64,
        min_vacuum_size: f64,
        lll_reduce: bool,
        center_slab: bool,
    ) -> Result<Self> {
        let miller = reduce_miller(miller)?;

        if bulk.lattice.volume().abs() < 1e-9 {
            return Err(SlabgenError::DegenerateLattice(bulk.name.clone()));
        }

        // 表面法向取自体相倒格矢
        let g = bulk.lattice.reciprocal_vector(miller);
        let g_len = norm(&g);
        let normal = [g[0] / g_len, g[1] / g_len, g[2] / g_len];

        let basis = slab_basis(&bulk.lattice, miller);
        let oriented = rebase_to(bulk, &basis);

        // h·c3 = 1 保证 c 轴投影恰为面间距
        let proj_height = dot(&oriented.lattice.matrix[2], &normal).abs();

        Ok(SlabGenerator {
            miller,
            min_slab_size,
            min_vacuum_size,
            lll_reduce,
            center_slab,
            cluster_tol: 0.1,
            bulk_formula: bulk.formula(),
            oriented,
            normal,
            proj_height,
        })
    }

    pub fn oriented_cell(&self) -> &Crystal {
        &self.oriented
    }

    /// 取向晶胞的层高（= 面间距 d_hkl）
    pub fn proj_height(&self) -> f64 {
        self.proj_height
    }

    /// 候选切割位置：原子层簇之间的中点（分数 c 坐标）
    pub fn possible_shifts(&self) -> Vec<f64> {
        let zs: Vec<f64> = self
            .oriented
            .atoms
            .iter()
            .map(|a| wrap_frac(a.position[2]))
            .collect();
        let n = zs.len();

        if n == 1 {
            return vec![wrap_frac(zs[0] + 0.5)];
        }

        let mut sorted = zs;
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

        // 单链聚类：沿法向间距超过容差处断开
        let mut clusters: Vec<Vec<f64>> = vec![vec![sorted[0]]];
        for i in 1..n {
            if (sorted[i] - sorted[i - 1]) * self.proj_height > self.cluster_tol {
                clusters.push(Vec::new());
            }
            clusters.last_mut().unwrap().push(sorted[i]);
        }

        // 周期回绕：首尾两簇够近则并为一簇
        if clusters.len() > 1 {
            let wrap_gap = (sorted[0] + 1.0 - sorted[n - 1]) * self.proj_height;
            if wrap_gap <= self.cluster_tol {
                let tail = clusters.pop().unwrap();
                for z in tail {
                    clusters[0].push(z - 1.0);
                }
            }
        }

        // 簇质心作代表
        let mut reps: Vec<f64> = clusters
            .iter()
            .map(|c| wrap_frac(c.iter().sum::<f64>() / c.len() as f64))
            .collect();
        reps.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let m = reps.len();
        let mut shifts: Vec<f64> = (0..m)
            .map(|i| {
                let s = if i == m - 1 {
                    (reps[0] + 1.0 + reps[m - 1]) * 0.5
                } else {
                    (reps[i] + reps[i + 1]) * 0.5
                };
                wrap_frac(s)
            })
            .collect();
        shifts.sort_by(|a, b| a.partial_cmp(b).unwrap());
        shifts.dedup_by(|a, b| (*a - *b).abs() < 1e-8);
        shifts
    }

    /// 按给定切割位置构造平板
    pub fn get_slab(&self, shift: f64) -> Slab {
        let n_slab = ((self.min_slab_size / self.proj_height).ceil() as usize).max(1);
        let n_vac = (self.min_vacuum_size / self.proj_height).ceil() as usize;
        let n_layers = n_slab + n_vac;

        let m = self.oriented.lattice.matrix;
        let new_lattice = Lattice::from_vectors([
            m[0],
            m[1],
            [
                m[2][0] * n_layers as f64,
                m[2][1] * n_layers as f64,
                m[2][2] * n_layers as f64,
            ],
        ]);

        let mut atoms = Vec::with_capacity(self.oriented.atoms.len() * n_slab);
        for layer in 0..n_slab {
            for atom in &self.oriented.atoms {
                let z = wrap_frac(atom.position[2] - shift);
                atoms.push(Atom {
                    element: atom.element.clone(),
                    position: [
                        atom.position[0],
                        atom.position[1],
                        (z + layer as f64) / n_layers as f64,
                    ],
                    oxidation: atom.oxidation,
                });
            }
        }

        let (h, k, l) = self.miller;
        let name = format!("{} ({} {} {})", self.bulk_formula, h, k, l);
        let mut crystal = Crystal::new(name, new_lattice, atoms);

        if self.lll_reduce {
            let reduced = crystal.lattice.lll_reduce();
            crystal.rebase(orient_c_axis(reduced, &self.normal));
        }

        if self.center_slab {
            let avg: f64 =
                crystal.atoms.iter().map(|a| a.position[2]).sum::<f64>() / crystal.atoms.len() as f64;
            for atom in &mut crystal.atoms {
                atom.position[2] += 0.5 - avg;
            }
        }

        Slab::new(crystal, self.miller, shift)
    }

    /// 所有不等价终止面的平板，按切割位置升序
    ///
    /// 不同切割位置可能给出只差一个刚性平移的同一终止面，
    /// 这里先合并掉，只留第一个。
    pub fn get_slabs(&self) -> Vec<Slab> {
        let mut unique: Vec<Slab> = Vec::new();
        for shift in self.possible_shifts() {
            let slab = self.get_slab(shift);
            if !unique
                .iter()
                .any(|seen| seen.matches_up_to_translation(&slab, 1e-4, 1e-5))
            {
                unique.push(slab);
            }
        }
        unique
    }
}

/// Miller 指数 gcd 约化
pub fn reduce_miller(miller: (i32, i32, i32)) -> Result<(i32, i32, i32)> {
    let (h, k, l) = miller;
    if (h, k, l) == (0, 0, 0) {
        return Err(SlabgenError::InvalidMillerIndex("(0 0 0)".to_string()));
    }
    let g = gcd3(h, k, l);
    Ok((h / g, k / g, l / g))
}

fn gcd_i64(a: i64, b: i64) -> i64 {
    if b == 0 {
        a
    } else {
        gcd_i64(b, a.rem_euclid(b))
    }
}

/// 扩展欧几里得：返回 (p, q) 使 p·a + q·b = gcd(a, b)
fn ext_gcd(a: i64, b: i64) -> (i64, i64) {
    if b == 0 {
        (1, 0)
    } else {
        let (x, y) = ext_gcd(b, a.rem_euclid(b));
        (y, x - a.div_euclid(b) * y)
    }
}

/// 构造切面换基矩阵（行向量 c1, c2, c3，整数）
///
/// 满足 h·c1 = h·c2 = 0，h·c3 = 1，det = +1。
/// 一般情形用扩展欧几里得；面内对 (p, q) 做一次取整修正，
/// 让 c1 和 c2 在真实晶格里尽量正交。
pub fn slab_basis(lattice: &Lattice, miller: (i32, i32, i32)) -> [[i64; 3]; 3] {
    let h = miller.0 as i64;
    let k = miller.1 as i64;
    let l = miller.2 as i64;

    let zeros = [h, k, l].iter().filter(|&&v| v == 0).count();

    let (c1, c2, c3): ([i64; 3], [i64; 3], [i64; 3]) = if zeros >= 2 {
        // 轴向表面：直接轮换坐标轴
        if h != 0 {
            ([0, 1, 0], [0, 0, 1], [1, 0, 0])
        } else if k != 0 {
            ([0, 0, 1], [1, 0, 0], [0, 1, 0])
        } else {
            ([1, 0, 0], [0, 1, 0], [0, 0, 1])
        }
    } else {
        let (mut p, mut q) = ext_gcd(k, l);

        let a1 = lattice.matrix[0];
        let a2 = lattice.matrix[1];
        let a3 = lattice.matrix[2];

        let comb = |s: f64, u: &[f64; 3], t: f64, v: &[f64; 3]| -> [f64; 3] {
            [
                s * u[0] + t * v[0],
                s * u[1] + t * v[1],
                s * u[2] + t * v[2],
            ]
        };

        // c1、c2 的夹角修正项
        let ka_ha = comb(k as f64, &a1, -h as f64, &a2);
        let la_ha = comb(l as f64, &a1, -h as f64, &a3);
        let lb_kc = comb(l as f64, &a2, -k as f64, &a3);

        let k1 = dot(&comb(p as f64, &ka_ha, q as f64, &la_ha), &lb_kc);
        let k2 = dot(&comb(l as f64, &ka_ha, -k as f64, &la_ha), &lb_kc);

        if k2.abs() > 1e-10 {
            let i = (-k1 / k2).round() as i64;
            p += i * l;
            q -= i * k;
        }

        let (a, b) = ext_gcd(p * k + q * l, h);

        let g_kl = gcd_i64(l, k).abs();
        (
            [p * k + q * l, -p * h, -q * h],
            [0, l / g_kl, -k / g_kl],
            [b, a * p, a * q],
        )
    };

    let mut basis = [c1, c2, c3];

    // h·c3 = +1
    let d = h * basis[2][0] + k * basis[2][1] + l * basis[2][2];
    debug_assert!(d.abs() == 1);
    if d < 0 {
        for t in 0..3 {
            basis[2][t] = -basis[2][t];
        }
    }

    // 右手系
    let det = basis[0][0] * (basis[1][1] * basis[2][2] - basis[1][2] * basis[2][1])
        - basis[0][1] * (basis[1][0] * basis[2][2] - basis[1][2] * basis[2][0])
        + basis[0][2] * (basis[1][0] * basis[2][1] - basis[1][1] * basis[2][0]);
    debug_assert!(det.abs() == 1);
    if det < 0 {
        for t in 0..3 {
            basis[0][t] = -basis[0][t];
        }
    }

    basis
}

/// 按整数换基矩阵重建晶胞（体积不变，原子折回新胞）
fn rebase_to(bulk: &Crystal, basis: &[[i64; 3]; 3]) -> Crystal {
    let c_f = [
        [basis[0][0] as f64, basis[0][1] as f64, basis[0][2] as f64],
        [basis[1][0] as f64, basis[1][1] as f64, basis[1][2] as f64],
        [basis[2][0] as f64, basis[2][1] as f64, basis[2][2] as f64],
    ];

    let m = bulk.lattice.matrix;
    let mut new_matrix = [[0.0; 3]; 3];
    for i in 0..3 {
        for t in 0..3 {
            new_matrix[i][t] =
                c_f[i][0] * m[0][t] + c_f[i][1] * m[1][t] + c_f[i][2] * m[2][t];
        }
    }

    let inv_c = invert_3x3(&c_f);
    let atoms = bulk
        .atoms
        .iter()
        .map(|atom| {
            let x = atom.position;
            let mut y = [0.0; 3];
            for t in 0..3 {
                y[t] = x[0] * inv_c[0][t] + x[1] * inv_c[1][t] + x[2] * inv_c[2][t];
                y[t] = wrap_frac(y[t]);
            }
            Atom {
                element: atom.element.clone(),
                position: y,
                oxidation: atom.oxidation,
            }
        })
        .collect();

    Crystal::new(bulk.name.clone(), Lattice::from_vectors(new_matrix), atoms)
}

/// LLL 约化后把投影最大的向量轮换到 c 位，保持右手系
fn orient_c_axis(lattice: Lattice, normal: &[f64; 3]) -> Lattice {
    let m = lattice.matrix;
    let projs = [
        dot(&m[0], normal).abs(),
        dot(&m[1], normal).abs(),
        dot(&m[2], normal).abs(),
    ];
    let mut c_idx = 0;
    for i in 1..3 {
        if projs[i] > projs[c_idx] {
            c_idx = i;
        }
    }

    let order = [(c_idx + 1) % 3, (c_idx + 2) % 3, c_idx];
    let mut rows = [m[order[0]], m[order[1]], m[order[2]]];

    let det = dot(
        &rows[0],
        &crate::models::structure::cross(&rows[1], &rows[2]),
    );
    if det < 0.0 {
        rows.swap(0, 1);
    }

    Lattice::from_vectors(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Crystal, Lattice};

    fn triclinic() -> Lattice {
        Lattice::from_parameters(4.1, 5.3, 6.7, 82.0, 95.0, 104.0)
    }

    #[test]
    fn test_slab_basis_invariants() {
        let lattice = triclinic();
        let cases = [
            (1, 0, 0),
            (0, 1, 0),
            (0, 0, 1),
            (-1, 0, 0),
            (1, 1, 0),
            (1, 0, 1),
            (1, 1, 1),
            (2, 1, 0),
            (2, -1, 1),
            (1, -2, 3),
            (3, 2, -1),
        ];
        for &(h, k, l) in &cases {
            let basis = slab_basis(&lattice, (h, k, l));
            let dot_h = |c: &[i64; 3]| h as i64 * c[0] + k as i64 * c[1] + l as i64 * c[2];
            assert_eq!(dot_h(&basis[0]), 0, "h·c1 != 0 for ({},{},{})", h, k, l);
            assert_eq!(dot_h(&basis[1]), 0, "h·c2 != 0 for ({},{},{})", h, k, l);
            assert_eq!(dot_h(&basis[2]), 1, "h·c3 != 1 for ({},{},{})", h, k, l);

            let det = basis[0][0] * (basis[1][1] * basis[2][2] - basis[1][2] * basis[2][1])
                - basis[0][1] * (basis[1][0] * basis[2][2] - basis[1][2] * basis[2][0])
                + basis[0][2] * (basis[1][0] * basis[2][1] - basis[1][1] * basis[2][0]);
            assert_eq!(det, 1, "det != 1 for ({},{},{})", h, k, l);
        }
    }

    #[test]
    fn test_reduce_miller() {
        assert_eq!(reduce_miller((2, 0, 0)).unwrap(), (1, 0, 0));
        assert_eq!(reduce_miller((2, 2, 2)).unwrap(), (1, 1, 1));
        assert_eq!(reduce_miller((-2, 0, 4)).unwrap(), (-1, 0, 2));
        assert!(reduce_miller((0, 0, 0)).is_err());
    }

    fn simple_cubic(a: f64) -> Crystal {
        let lattice = Lattice::from_vectors([[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]]);
        Crystal::new("Po", lattice, vec![Atom::new("Po", [0.0, 0.0, 0.0])])
    }

    fn rock_salt() -> Crystal {
        let a = 5.64;
        let lattice = Lattice::from_vectors([[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]]);
        let atoms = vec![
            Atom::new("Na", [0.0, 0.0, 0.0]).with_oxidation(1.0),
            Atom::new("Na", [0.5, 0.5, 0.0]).with_oxidation(1.0),
            Atom::new("Na", [0.5, 0.0, 0.5]).with_oxidation(1.0),
            Atom::new("Na", [0.0, 0.5, 0.5]).with_oxidation(1.0),
            Atom::new("Cl", [0.5, 0.0, 0.0]).with_oxidation(-1.0),
            Atom::new("Cl", [0.0, 0.5, 0.0]).with_oxidation(-1.0),
            Atom::new("Cl", [0.0, 0.0, 0.5]).with_oxidation(-1.0),
            Atom::new("Cl", [0.5, 0.5, 0.5]).with_oxidation(-1.0),
        ];
        Crystal::new("NaCl", lattice, atoms)
    }

    #[test]
    fn test_proj_height_equals_d_hkl() {
        let bulk = simple_cubic(4.0);
        for &hkl in &[(0, 0, 1), (1, 1, 0), (1, 1, 1), (2, 1, 0)] {
            let generator = SlabGenerator::new(&bulk, hkl, 8.0, 8.0, false, false).unwrap();
            let d = bulk.lattice.d_hkl(hkl);
            assert!(
                (generator.proj_height() - d).abs() < 1e-9,
                "hkl {:?}: proj {} vs d {}",
                hkl,
                generator.proj_height(),
                d
            );
        }
    }

    #[test]
    fn test_oriented_cell_atom_count() {
        // 换基矩阵幺模，取向晶胞原子数不变
        let bulk = rock_salt();
        for &hkl in &[(0, 0, 1), (1, 1, 0), (1, 1, 1), (2, 1, 1)] {
            let generator = SlabGenerator::new(&bulk, hkl, 10.0, 10.0, false, false).unwrap();
            assert_eq!(generator.oriented_cell().atoms.len(), 8, "hkl {:?}", hkl);
        }
    }

    #[test]
    fn test_simple_cubic_001_slab() {
        let bulk = simple_cubic(4.0);
        let generator = SlabGenerator::new(&bulk, (0, 0, 1), 8.0, 8.0, false, true).unwrap();

        let shifts = generator.possible_shifts();
        assert_eq!(shifts.len(), 1);

        let slab = generator.get_slab(shifts[0]);
        // 2 层 slab + 2 层真空
        assert_eq!(slab.num_atoms(), 2);
        let c_height = slab.crystal.lattice.abc()[2];
        assert!((c_height - 16.0).abs() < 1e-9);

        // 居中：原子 z 均值在 0.5
        let avg: f64 = slab
            .crystal
            .atoms
            .iter()
            .map(|a| a.position[2])
            .sum::<f64>()
            / slab.num_atoms() as f64;
        assert!((avg - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_rock_salt_001_terminations() {
        let bulk = rock_salt();
        let generator = SlabGenerator::new(&bulk, (0, 0, 1), 10.0, 10.0, false, true).unwrap();

        // 混合 NaCl 层位于 z = 0 和 z = 1/2，两个候选切割位置
        let shifts = generator.possible_shifts();
        assert_eq!(shifts.len(), 2);

        // 两个终止面互为面内平移，合并后只剩一个
        let a = generator.get_slab(shifts[0]);
        let b = generator.get_slab(shifts[1]);
        assert!(a.matches_up_to_translation(&b, 1e-4, 1e-5));

        let slabs = generator.get_slabs();
        assert_eq!(slabs.len(), 1);

        // 岩盐 (001) 无极性且有反演中心
        assert!(!slabs[0].is_polar(1e-3));
        assert!(slabs[0].has_inversion(1e-4));
    }

    #[test]
    fn test_rock_salt_111_polar() {
        // 岩盐 (111) 交替 Na/Cl 层，所有终止面都有净偶极
        let bulk = rock_salt();
        let generator = SlabGenerator::new(&bulk, (1, 1, 1), 10.0, 10.0, false, true).unwrap();
        let slabs = generator.get_slabs();
        assert!(!slabs.is_empty());
        for slab in &slabs {
            assert!(slab.is_polar(1e-3), "shift {} should be polar", slab.shift);
        }
    }

    #[test]
    fn test_lll_reduce_keeps_atom_count_and_area() {
        let bulk = rock_salt();
        let plain = SlabGenerator::new(&bulk, (1, 1, 0), 10.0, 10.0, false, true).unwrap();
        let reduced = SlabGenerator::new(&bulk, (1, 1, 0), 10.0, 10.0, true, true).unwrap();

        let s_plain = plain.get_slabs();
        let s_red = reduced.get_slabs();
        assert_eq!(s_plain.len(), s_red.len());

        for (a, b) in s_plain.iter().zip(s_red.iter()) {
            assert_eq!(a.num_atoms(), b.num_atoms());
            // 面内胞可能换基但表面积不变
            assert!((a.surface_area() - b.surface_area()).abs() < 1e-6);
        }
    }

    #[test]
    fn test_min_slab_size_honored() {
        let bulk = simple_cubic(4.0);
        for &(size, expected_layers) in &[(4.0, 1usize), (4.1, 2), (8.0, 2), (9.0, 3)] {
            let generator = SlabGenerator::new(&bulk, (0, 0, 1), size, 0.0, false, false).unwrap();
            let slab = generator.get_slab(generator.possible_shifts()[0]);
            assert_eq!(slab.num_atoms(), expected_layers, "min_slab_size {}", size);
        }
    }
}

//! # 晶体结构数据模型
//!
//! 定义统一的晶体结构表示以及切面生成所需的晶格数学：
//! 倒格矢、面间距、分数/笛卡尔坐标转换和 LLL 基约化。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `surface/`, `vasp/`, `convergence/` 使用
//! - 无外部模块依赖

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// 向量叉积
pub fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// 向量点积
pub fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// 向量模长
pub fn norm(a: &[f64; 3]) -> f64 {
    dot(a, a).sqrt()
}

/// 把分数坐标折回 [0, 1)
pub fn wrap_frac(x: f64) -> f64 {
    let w = x - x.floor();
    // 1.0 - 1e-16 之类的舍入结果仍视为 0
    if w >= 1.0 {
        w - 1.0
    } else {
        w
    }
}

/// 周期性分数距离：|d| 折到 [-0.5, 0.5] 后的绝对值
pub fn pbc_delta(d: f64) -> f64 {
    (d - d.round()).abs()
}

/// 晶格参数表示
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lattice {
    /// 晶格向量矩阵 (3x3)，行向量表示 a, b, c
    /// [[a1, a2, a3], [b1, b2, b3], [c1, c2, c3]]
    pub matrix: [[f64; 3]; 3],
}

impl Lattice {
    /// 从晶格参数 (a, b, c, alpha, beta, gamma) 创建晶格
    /// 角度单位：度
    pub fn from_parameters(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        let alpha_rad = alpha.to_radians();
        let beta_rad = beta.to_radians();
        let gamma_rad = gamma.to_radians();

        // 计算晶格向量
        let cos_alpha = alpha_rad.cos();
        let cos_beta = beta_rad.cos();
        let cos_gamma = gamma_rad.cos();
        let sin_gamma = gamma_rad.sin();

        let a_vec = [a, 0.0, 0.0];
        let b_vec = [b * cos_gamma, b * sin_gamma, 0.0];

        let c1 = c * cos_beta;
        let c2 = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let c3 = (c * c - c1 * c1 - c2 * c2).sqrt();
        let c_vec = [c1, c2, c3];

        Lattice {
            matrix: [a_vec, b_vec, c_vec],
        }
    }

    /// 从晶格向量矩阵创建
    pub fn from_vectors(matrix: [[f64; 3]; 3]) -> Self {
        Lattice { matrix }
    }

    /// 获取晶格参数 (a, b, c, alpha, beta, gamma)
    pub fn parameters(&self) -> (f64, f64, f64, f64, f64, f64) {
        let a_vec = self.matrix[0];
        let b_vec = self.matrix[1];
        let c_vec = self.matrix[2];

        let a = norm(&a_vec);
        let b = norm(&b_vec);
        let c = norm(&c_vec);

        let alpha = (dot(&b_vec, &c_vec) / (b * c)).acos().to_degrees();
        let beta = (dot(&a_vec, &c_vec) / (a * c)).acos().to_degrees();
        let gamma = (dot(&a_vec, &b_vec) / (a * b)).acos().to_degrees();

        (a, b, c, alpha, beta, gamma)
    }

    /// 晶格向量长度 (a, b, c)
    pub fn abc(&self) -> [f64; 3] {
        [
            norm(&self.matrix[0]),
            norm(&self.matrix[1]),
            norm(&self.matrix[2]),
        ]
    }

    /// 计算晶格体积（有符号）
    pub fn volume(&self) -> f64 {
        let a = self.matrix[0];
        let b = self.matrix[1];
        let c = self.matrix[2];
        dot(&a, &cross(&b, &c))
    }

    /// 度规张量 G_ij = a_i · a_j
    pub fn metric(&self) -> [[f64; 3]; 3] {
        let mut g = [[0.0; 3]; 3];
        for i in 0..3 {
            for j in 0..3 {
                g[i][j] = dot(&self.matrix[i], &self.matrix[j]);
            }
        }
        g
    }

    /// 晶格矩阵的逆
    pub fn inverse(&self) -> [[f64; 3]; 3] {
        invert_3x3(&self.matrix)
    }

    /// 倒格矢矩阵（含 2π 因子），行向量表示 b1, b2, b3
    pub fn reciprocal(&self) -> [[f64; 3]; 3] {
        let a = self.matrix[0];
        let b = self.matrix[1];
        let c = self.matrix[2];
        let volume = self.volume();

        let factor = 2.0 * PI / volume;
        let b1 = cross(&b, &c);
        let b2 = cross(&c, &a);
        let b3 = cross(&a, &b);

        [
            [b1[0] * factor, b1[1] * factor, b1[2] * factor],
            [b2[0] * factor, b2[1] * factor, b2[2] * factor],
            [b3[0] * factor, b3[1] * factor, b3[2] * factor],
        ]
    }

    /// (hkl) 晶面的面间距 d = 2π/|G|
    pub fn d_hkl(&self, hkl: (i32, i32, i32)) -> f64 {
        let g = self.reciprocal_vector(hkl);
        2.0 * PI / norm(&g)
    }

    /// 倒格矢 G = h·b1 + k·b2 + l·b3（笛卡尔坐标）
    pub fn reciprocal_vector(&self, hkl: (i32, i32, i32)) -> [f64; 3] {
        let recip = self.reciprocal();
        let (h, k, l) = (hkl.0 as f64, hkl.1 as f64, hkl.2 as f64);
        [
            h * recip[0][0] + k * recip[1][0] + l * recip[2][0],
            h * recip[0][1] + k * recip[1][1] + l * recip[2][1],
            h * recip[0][2] + k * recip[1][2] + l * recip[2][2],
        ]
    }

    /// 分数坐标转笛卡尔坐标
    pub fn frac_to_cart(&self, frac: &[f64; 3]) -> [f64; 3] {
        let m = self.matrix;
        [
            frac[0] * m[0][0] + frac[1] * m[1][0] + frac[2] * m[2][0],
            frac[0] * m[0][1] + frac[1] * m[1][1] + frac[2] * m[2][1],
            frac[0] * m[0][2] + frac[1] * m[1][2] + frac[2] * m[2][2],
        ]
    }

    /// 笛卡尔坐标转分数坐标
    pub fn cart_to_frac(&self, cart: &[f64; 3]) -> [f64; 3] {
        let inv = self.inverse();
        [
            inv[0][0] * cart[0] + inv[1][0] * cart[1] + inv[2][0] * cart[2],
            inv[0][1] * cart[0] + inv[1][1] * cart[1] + inv[2][1] * cart[2],
            inv[0][2] * cart[0] + inv[1][2] * cart[1] + inv[2][2] * cart[2],
        ]
    }

    /// 六方晶格判定（a ≈ b, α = β = 90°, γ = 120°），用于 k 点网格选择
    pub fn is_hexagonal(&self) -> bool {
        let (a, b, _, alpha, beta, gamma) = self.parameters();
        (a - b).abs() / a < 0.01
            && (alpha - 90.0).abs() < 1.0
            && (beta - 90.0).abs() < 1.0
            && (gamma - 120.0).abs() < 1.0
    }

    /// LLL 基约化 (δ = 3/4)
    ///
    /// 返回生成同一点阵、更短更正交的基。只做整数行变换，
    /// 所以约化前后的点阵严格相同。
    pub fn lll_reduce(&self) -> Lattice {
        let delta = 0.75;
        let mut basis = self.matrix;

        // Gram-Schmidt 正交化：返回 (b*, mu)
        fn gram_schmidt(b: &[[f64; 3]; 3]) -> ([[f64; 3]; 3], [[f64; 3]; 3]) {
            let mut bstar = [[0.0; 3]; 3];
            let mut mu = [[0.0; 3]; 3];
            for i in 0..3 {
                bstar[i] = b[i];
                for j in 0..i {
                    let denom = dot(&bstar[j], &bstar[j]);
                    mu[i][j] = if denom.abs() < 1e-14 {
                        0.0
                    } else {
                        dot(&b[i], &bstar[j]) / denom
                    };
                    for t in 0..3 {
                        bstar[i][t] -= mu[i][j] * bstar[j][t];
                    }
                }
            }
            (bstar, mu)
        }

        let mut k = 1usize;
        let mut iterations = 0;
        while k < 3 {
            // 维度 3 的 LLL 收敛极快，这个上限只防数值病态输入
            iterations += 1;
            if iterations > 200 {
                break;
            }

            // 尺寸约化
            let (_, mu) = gram_schmidt(&basis);
            for j in (0..k).rev() {
                let q = mu[k][j].round();
                if q != 0.0 {
                    for t in 0..3 {
                        basis[k][t] -= q * basis[j][t];
                    }
                }
            }

            // Lovász 条件
            let (bstar, mu) = gram_schmidt(&basis);
            let lhs = dot(&bstar[k], &bstar[k]);
            let rhs = (delta - mu[k][k - 1] * mu[k][k - 1]) * dot(&bstar[k - 1], &bstar[k - 1]);
            if lhs >= rhs {
                k += 1;
            } else {
                basis.swap(k, k - 1);
                k = if k > 1 { k - 1 } else { 1 };
            }
        }

        Lattice { matrix: basis }
    }
}

/// 3x3 矩阵求逆
pub fn invert_3x3(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);

    if det.abs() < 1e-12 {
        return *m;
    }

    [
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) / det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) / det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) / det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) / det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) / det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) / det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) / det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) / det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) / det,
        ],
    ]
}

/// 原子信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atom {
    /// 元素符号
    pub element: String,

    /// 分数坐标 [x, y, z]
    pub position: [f64; 3],

    /// 氧化态（偶极筛选用；未赋值时视为 0）
    pub oxidation: Option<f64>,
}

impl Atom {
    pub fn new(element: impl Into<String>, position: [f64; 3]) -> Self {
        Atom {
            element: element.into(),
            position,
            oxidation: None,
        }
    }

    pub fn with_oxidation(mut self, state: f64) -> Self {
        self.oxidation = Some(state);
        self
    }

    /// 氧化态，未赋值按 0 处理
    pub fn charge(&self) -> f64 {
        self.oxidation.unwrap_or(0.0)
    }
}

/// 晶体结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crystal {
    /// 结构名称
    pub name: String,

    /// 晶格
    pub lattice: Lattice,

    /// 原子列表
    pub atoms: Vec<Atom>,
}

impl Crystal {
    pub fn new(name: impl Into<String>, lattice: Lattice, atoms: Vec<Atom>) -> Self {
        Crystal {
            name: name.into(),
            lattice,
            atoms,
        }
    }

    /// 计算化学式（元素字母序，计数为 1 时省略）
    pub fn formula(&self) -> String {
        use std::collections::BTreeMap;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

        for atom in &self.atoms {
            *counts.entry(atom.element.as_str()).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(el, count)| {
                if count == 1 {
                    el.to_string()
                } else {
                    format!("{}{}", el, count)
                }
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// 出现顺序的元素列表（POSCAR / POTCAR 排序用）
    pub fn element_order(&self) -> Vec<String> {
        let mut order: Vec<String> = Vec::new();
        for atom in &self.atoms {
            if !order.contains(&atom.element) {
                order.push(atom.element.clone());
            }
        }
        order
    }

    /// 原子的笛卡尔坐标
    pub fn cart_coords(&self) -> Vec<[f64; 3]> {
        self.atoms
            .iter()
            .map(|a| self.lattice.frac_to_cart(&a.position))
            .collect()
    }

    /// 把所有分数坐标折回 [0, 1)
    pub fn wrap_to_cell(&mut self) {
        for atom in &mut self.atoms {
            for t in 0..3 {
                atom.position[t] = wrap_frac(atom.position[t]);
            }
        }
    }

    /// 换基：保持原子笛卡尔位置不变，用新晶格重新表示分数坐标
    pub fn rebase(&mut self, new_lattice: Lattice) {
        let carts = self.cart_coords();
        self.lattice = new_lattice;
        for (atom, cart) in self.atoms.iter_mut().zip(carts.iter()) {
            atom.position = self.lattice.cart_to_frac(cart);
        }
        self.wrap_to_cell();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_from_parameters_cubic() {
        let lattice = Lattice::from_parameters(5.0, 5.0, 5.0, 90.0, 90.0, 90.0);
        let (a, b, c, alpha, beta, gamma) = lattice.parameters();

        assert!((a - 5.0).abs() < 1e-6);
        assert!((b - 5.0).abs() < 1e-6);
        assert!((c - 5.0).abs() < 1e-6);
        assert!((alpha - 90.0).abs() < 1e-6);
        assert!((beta - 90.0).abs() < 1e-6);
        assert!((gamma - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_lattice_volume_cubic() {
        let lattice = Lattice::from_parameters(5.0, 5.0, 5.0, 90.0, 90.0, 90.0);
        let vol = lattice.volume().abs();

        // 5^3 = 125
        assert!((vol - 125.0).abs() < 1e-6);
    }

    #[test]
    fn test_frac_cart_round_trip() {
        let lattice = Lattice::from_parameters(3.0, 4.0, 5.0, 90.0, 100.0, 120.0);
        let frac = [0.1, 0.7, 0.3];
        let cart = lattice.frac_to_cart(&frac);
        let back = lattice.cart_to_frac(&cart);

        for t in 0..3 {
            assert!((frac[t] - back[t]).abs() < 1e-10);
        }
    }

    #[test]
    fn test_d_hkl_cubic() {
        // 立方晶格 d_hkl = a / sqrt(h² + k² + l²)
        let a = 4.0;
        let lattice = Lattice::from_vectors([[a, 0.0, 0.0], [0.0, a, 0.0], [0.0, 0.0, a]]);

        assert!((lattice.d_hkl((1, 0, 0)) - a).abs() < 1e-9);
        assert!((lattice.d_hkl((1, 1, 0)) - a / 2.0_f64.sqrt()).abs() < 1e-9);
        assert!((lattice.d_hkl((1, 1, 1)) - a / 3.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_reciprocal_orthogonality() {
        // b_i · a_j = 2π δ_ij
        let lattice = Lattice::from_parameters(3.1, 4.2, 5.3, 80.0, 95.0, 110.0);
        let recip = lattice.reciprocal();

        for i in 0..3 {
            for j in 0..3 {
                let d = dot(&recip[i], &lattice.matrix[j]);
                let expected = if i == j { 2.0 * PI } else { 0.0 };
                assert!((d - expected).abs() < 1e-9, "b{} · a{} = {}", i, j, d);
            }
        }
    }

    #[test]
    fn test_lll_reduce_preserves_volume() {
        // 故意给一个糟糕的基：c 被剪切得很长
        let lattice = Lattice::from_vectors([
            [4.0, 0.0, 0.0],
            [0.0, 4.0, 0.0],
            [12.0, 8.0, 4.0],
        ]);
        let reduced = lattice.lll_reduce();

        assert!((lattice.volume().abs() - reduced.volume().abs()).abs() < 1e-8);

        // 约化后的基应该更短
        let orig_max = lattice.abc().iter().cloned().fold(0.0_f64, f64::max);
        let red_max = reduced.abc().iter().cloned().fold(0.0_f64, f64::max);
        assert!(red_max <= orig_max + 1e-9);
        assert!(red_max < 5.0, "expected near-orthogonal basis, got {}", red_max);
    }

    #[test]
    fn test_is_hexagonal() {
        let hex = Lattice::from_parameters(3.0, 3.0, 5.0, 90.0, 90.0, 120.0);
        assert!(hex.is_hexagonal());

        let cubic = Lattice::from_parameters(3.0, 3.0, 3.0, 90.0, 90.0, 90.0);
        assert!(!cubic.is_hexagonal());
    }

    #[test]
    fn test_crystal_formula() {
        let lattice = Lattice::from_parameters(5.0, 5.0, 5.0, 90.0, 90.0, 90.0);
        let atoms = vec![
            Atom::new("Na", [0.0, 0.0, 0.0]),
            Atom::new("Na", [0.5, 0.5, 0.0]),
            Atom::new("Cl", [0.5, 0.0, 0.0]),
            Atom::new("Cl", [0.0, 0.5, 0.0]),
        ];
        let crystal = Crystal::new("NaCl", lattice, atoms);

        assert_eq!(crystal.formula(), "Cl2Na2");
    }

    #[test]
    fn test_rebase_keeps_cartesian_positions() {
        let lattice = Lattice::from_vectors([
            [4.0, 0.0, 0.0],
            [0.0, 4.0, 0.0],
            [4.0, 4.0, 8.0],
        ]);
        let atoms = vec![Atom::new("Si", [0.25, 0.25, 0.25])];
        let mut crystal = Crystal::new("Si", lattice, atoms);

        let before = crystal.cart_coords()[0];
        let reduced = crystal.lattice.lll_reduce();
        crystal.rebase(reduced);
        let after = crystal.cart_coords()[0];

        // 允许相差一个晶格平移
        let delta = [
            after[0] - before[0],
            after[1] - before[1],
            after[2] - before[2],
        ];
        let frac_delta = crystal.lattice.cart_to_frac(&delta);
        for t in 0..3 {
            assert!(pbc_delta(frac_delta[t]) < 1e-8);
        }
    }

    #[test]
    fn test_atom_charge_default() {
        let atom = Atom::new("Fe", [0.0, 0.0, 0.0]);
        assert_eq!(atom.charge(), 0.0);
        let atom = atom.with_oxidation(3.0);
        assert_eq!(atom.charge(), 3.0);
    }
}

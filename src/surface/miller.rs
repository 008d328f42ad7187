//! # Miller 指数枚举
//!
//! 找出最大指数内所有对称不等价的 Miller 指数。
//!
//! ## 算法概述
//! 1. 枚举所有元素取值 {-1, 0, 1}、行列式 ±1 的整数矩阵
//! 2. 保留满足 WᵀGW = G（G 为度规张量）的候选旋转
//! 3. 保留能把原子基元映回自身（允许平移）的旋转 -> 空间群旋转部分
//! 4. Miller 指数按 (W⁻¹)ᵀ 变换，取每个等价类的首个代表
//!
//! ## 依赖关系
//! - 被 `commands/generate.rs` 调用
//! - 使用 `models/structure.rs`

use crate::models::structure::{pbc_delta, wrap_frac, Crystal};

/// 三个整数的最大公约数
pub fn gcd3(h: i32, k: i32, l: i32) -> i32 {
    fn gcd(a: i32, b: i32) -> i32 {
        if b == 0 {
            a
        } else {
            gcd(b, a.rem_euclid(b))
        }
    }
    gcd(gcd(h.abs(), k.abs()), l.abs())
}

/// 整数 3x3 行列式
fn det3(m: &[[i32; 3]; 3]) -> i32 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

/// 幺模整数矩阵的逆转置（Miller 指数的变换矩阵）
fn dual_op(w: &[[i32; 3]; 3]) -> [[i32; 3]; 3] {
    let det = det3(w);
    // 伴随矩阵（余子式转置），再除以 det；det = ±1 时除法等于乘法
    let adj = [
        [
            w[1][1] * w[2][2] - w[1][2] * w[2][1],
            w[0][2] * w[2][1] - w[0][1] * w[2][2],
            w[0][1] * w[1][2] - w[0][2] * w[1][1],
        ],
        [
            w[1][2] * w[2][0] - w[1][0] * w[2][2],
            w[0][0] * w[2][2] - w[0][2] * w[2][0],
            w[0][2] * w[1][0] - w[0][0] * w[1][2],
        ],
        [
            w[1][0] * w[2][1] - w[1][1] * w[2][0],
            w[0][1] * w[2][0] - w[0][0] * w[2][1],
            w[0][0] * w[1][1] - w[0][1] * w[1][0],
        ],
    ];
    // inv = adj / det; 转置后得 (W⁻¹)ᵀ
    let mut d = [[0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            d[i][j] = adj[j][i] * det;
        }
    }
    d
}

fn apply_op(op: &[[i32; 3]; 3], hkl: (i32, i32, i32)) -> (i32, i32, i32) {
    (
        op[0][0] * hkl.0 + op[0][1] * hkl.1 + op[0][2] * hkl.2,
        op[1][0] * hkl.0 + op[1][1] * hkl.1 + op[1][2] * hkl.2,
        op[2][0] * hkl.0 + op[2][1] * hkl.1 + op[2][2] * hkl.2,
    )
}

/// 搜索晶体空间群的旋转部分
///
/// 候选限定为元素取 {-1,0,1} 的幺模矩阵（对任何约化晶格都足够），
/// 先用度规张量筛掉不保距的，再检查原子基元是否可映回自身。
pub fn symmetry_rotations(crystal: &Crystal, symprec: f64) -> Vec<[[i32; 3]; 3]> {
    let g = crystal.lattice.metric();
    let g_scale = g[0][0].max(g[1][1]).max(g[2][2]);
    let tol = symprec * g_scale;

    let mut rotations = Vec::new();

    // 3^9 个候选矩阵
    let mut entries = [0i32; 9];
    loop {
        let w = [
            [entries[0] - 1, entries[1] - 1, entries[2] - 1],
            [entries[3] - 1, entries[4] - 1, entries[5] - 1],
            [entries[6] - 1, entries[7] - 1, entries[8] - 1],
        ];

        if det3(&w).abs() == 1 && preserves_metric(&w, &g, tol) && maps_basis(&w, crystal, symprec)
        {
            rotations.push(w);
        }

        // 递增 3 进制计数器
        let mut pos = 0;
        loop {
            if pos == 9 {
                return rotations;
            }
            entries[pos] += 1;
            if entries[pos] < 3 {
                break;
            }
            entries[pos] = 0;
            pos += 1;
        }
    }
}

/// WᵀGW = G 判定
fn preserves_metric(w: &[[i32; 3]; 3], g: &[[f64; 3]; 3], tol: f64) -> bool {
    for i in 0..3 {
        for j in 0..3 {
            let mut val = 0.0;
            for p in 0..3 {
                for q in 0..3 {
                    val += w[p][i] as f64 * g[p][q] * w[q][j] as f64;
                }
            }
            if (val - g[i][j]).abs() > tol {
                return false;
            }
        }
    }
    true
}

/// 旋转 + 某个平移能否把原子基元映回自身
fn maps_basis(w: &[[i32; 3]; 3], crystal: &Crystal, symprec: f64) -> bool {
    let atoms = &crystal.atoms;
    if atoms.is_empty() {
        return true;
    }

    let rotate = |x: &[f64; 3]| -> [f64; 3] {
        [
            w[0][0] as f64 * x[0] + w[0][1] as f64 * x[1] + w[0][2] as f64 * x[2],
            w[1][0] as f64 * x[0] + w[1][1] as f64 * x[1] + w[1][2] as f64 * x[2],
            w[2][0] as f64 * x[0] + w[2][1] as f64 * x[1] + w[2][2] as f64 * x[2],
        ]
    };

    // 候选平移：第一个原子映到任一同种原子
    let x0 = rotate(&atoms[0].position);
    for target in atoms.iter().filter(|a| a.element == atoms[0].element) {
        let shift = [
            wrap_frac(target.position[0] - x0[0]),
            wrap_frac(target.position[1] - x0[1]),
            wrap_frac(target.position[2] - x0[2]),
        ];

        let all_mapped = atoms.iter().all(|atom| {
            let rx = rotate(&atom.position);
            let image = [rx[0] + shift[0], rx[1] + shift[1], rx[2] + shift[2]];
            atoms.iter().any(|other| {
                other.element == atom.element
                    && pbc_delta(other.position[0] - image[0]) < symprec
                    && pbc_delta(other.position[1] - image[1]) < symprec
                    && pbc_delta(other.position[2] - image[2]) < symprec
            })
        });

        if all_mapped {
            return true;
        }
    }
    false
}

/// 枚举对称不等价的 Miller 指数
///
/// 扫描顺序从正指数往下（(1,0,0) 优先于 (-1,0,0)），
/// 只保留 gcd = 1 的约化指数，每个等价类取第一个代表。
pub fn distinct_miller_indices(
    crystal: &Crystal,
    max_index: i32,
    symprec: f64,
) -> Vec<(i32, i32, i32)> {
    let rotations = symmetry_rotations(crystal, symprec);
    let duals: Vec<[[i32; 3]; 3]> = rotations.iter().map(dual_op).collect();

    let mut unique: Vec<(i32, i32, i32)> = Vec::new();

    for h in (-max_index..=max_index).rev() {
        for k in (-max_index..=max_index).rev() {
            for l in (-max_index..=max_index).rev() {
                if (h, k, l) == (0, 0, 0) || gcd3(h, k, l) != 1 {
                    continue;
                }
                let equivalent_seen = unique.iter().any(|&seen| {
                    duals.iter().any(|op| apply_op(op, (h, k, l)) == seen)
                });
                if !equivalent_seen {
                    unique.push((h, k, l));
                }
            }
        }
    }

    unique
}

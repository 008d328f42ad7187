//! # VASP OUTCAR 解析器
//!
//! 解析 VASP 计算输出文件 OUTCAR，提取收敛分析需要的量：
//! 末次总能量、离子数和计算耗时。
//!
//! ## 依赖关系
//! - 被 `convergence/parse.rs` 使用
//! - 无外部模块依赖

use crate::error::{Result, SlabgenError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// OUTCAR 提取结果
#[derive(Debug, Default, Clone)]
pub struct OutcarSummary {
    /// 末次电子步能量 energy(sigma->0) (eV)
    pub final_energy: Option<f64>,

    /// 离子数 NIONS
    pub num_ions: Option<usize>,

    /// 计算耗时 Elapsed time (sec)
    pub elapsed_sec: Option<f64>,

    /// 是否正常收尾（出现 timing 统计块）
    pub is_finished: bool,
}

/// 解析 VASP OUTCAR 文件
pub fn parse_outcar(path: &Path) -> Result<OutcarSummary> {
    let file = File::open(path).map_err(|e| SlabgenError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;

    let reader = BufReader::new(file);
    let mut summary = OutcarSummary::default();

    for line in reader.lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => continue,
        };

        // 检查是否完成
        if line.contains("General timing and accounting informations for this job") {
            summary.is_finished = true;
        }

        // 提取能量，保留最后一次出现
        // "energy  without entropy=     -123.456789  energy(sigma->0) =     -123.456789"
        if line.contains("energy  without entropy") {
            if let Some(pos) = line.find("energy(sigma->0)") {
                let rest = &line[pos..];
                if let Some(val) = extract_number_after(rest, "=") {
                    summary.final_energy = Some(val);
                }
            }
        }

        // 提取离子数
        // "   NIONS =       8"
        if line.contains("NIONS =") {
            if let Some(val) = extract_last_number(&line) {
                summary.num_ions = Some(val as usize);
            }
        }

        // 提取耗时
        // "            Elapsed time (sec):     1234.567"
        if line.contains("Elapsed time (sec):") {
            if let Some(val) = extract_number_after(&line, ":") {
                summary.elapsed_sec = Some(val);
            }
        }
    }

    Ok(summary)
}

/// 从字符串中提取指定标记之后的数字
fn extract_number_after(s: &str, marker: &str) -> Option<f64> {
    if let Some(pos) = s.find(marker) {
        let after = &s[pos + marker.len()..];
        after.trim().split_whitespace().next()?.parse().ok()
    } else {
        None
    }
}

/// 提取字符串中最后一个数字
fn extract_last_number(s: &str) -> Option<f64> {
    s.split_whitespace()
        .filter_map(|w| w.parse::<f64>().ok())
        .last()
}

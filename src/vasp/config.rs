//! # 默认输入配置
//!
//! 切面静态计算的 PBEsol 默认配置：INCAR 标签、KPOINTS 倒空间密度
//! 和各元素推荐的 POTCAR 赝势符号。
//!
//! ## 依赖关系
//! - 被 `vasp/mod.rs` 和 `commands/generate.rs` 使用
//! - 使用 `vasp/incar.rs` 的 IncarValue
//! - 纯静态数据，无外部依赖

use crate::vasp::incar::IncarValue;

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

/// 输入文件生成配置
pub struct InputConfig {
    /// INCAR 标签默认值
    pub incar: BTreeMap<&'static str, IncarValue>,

    /// KPOINTS 倒空间网格密度 (points / Å⁻³ / atom)
    pub reciprocal_density: f64,

    /// 元素 -> POTCAR 赝势符号
    pub potcar: HashMap<&'static str, &'static str>,
}

/// 切面静态计算的 PBEsol 默认配置
pub static PBESOL_SLAB_CONFIG: LazyLock<InputConfig> = LazyLock::new(|| {
    let mut incar: BTreeMap<&'static str, IncarValue> = BTreeMap::new();
    incar.insert("ADDGRID", IncarValue::Bool(false));
    incar.insert("ALGO", IncarValue::Str("Normal".to_string()));
    incar.insert("EDIFF", IncarValue::Float(1e-6));
    incar.insert("EDIFFG", IncarValue::Float(-0.01));
    incar.insert("ENCUT", IncarValue::Int(500));
    incar.insert("GGA", IncarValue::Str("PS".to_string()));
    incar.insert("ISIF", IncarValue::Int(2));
    incar.insert("ISMEAR", IncarValue::Int(0));
    incar.insert("ISYM", IncarValue::Int(2));
    incar.insert("IWAVPR", IncarValue::Int(1));
    incar.insert("LASPH", IncarValue::Bool(true));
    incar.insert("LCHARG", IncarValue::Bool(false));
    incar.insert("LORBIT", IncarValue::Int(11));
    incar.insert("LREAL", IncarValue::Str("auto".to_string()));
    incar.insert("LWAVE", IncarValue::Bool(false));
    incar.insert("NELM", IncarValue::Int(150));
    incar.insert("NSW", IncarValue::Int(0));
    incar.insert("PREC", IncarValue::Str("Accurate".to_string()));
    incar.insert("SIGMA", IncarValue::Float(0.01));

    let potcar: HashMap<&'static str, &'static str> = [
        ("Ac", "Ac"),
        ("Ag", "Ag"),
        ("Al", "Al"),
        ("Ar", "Ar"),
        ("As", "As"),
        ("Au", "Au"),
        ("B", "B"),
        ("Ba", "Ba_sv"),
        ("Be", "Be_sv"),
        ("Bi", "Bi"),
        ("Br", "Br"),
        ("C", "C"),
        ("Ca", "Ca_sv"),
        ("Cd", "Cd"),
        ("Ce", "Ce"),
        ("Cl", "Cl"),
        ("Co", "Co"),
        ("Cr", "Cr_pv"),
        ("Cs", "Cs_sv"),
        ("Cu", "Cu"),
        ("Dy", "Dy_3"),
        ("Er", "Er_3"),
        ("Eu", "Eu"),
        ("F", "F"),
        ("Fe", "Fe_pv"),
        ("Ga", "Ga_d"),
        ("Gd", "Gd"),
        ("Ge", "Ge_d"),
        ("H", "H"),
        ("He", "He"),
        ("Hf", "Hf_pv"),
        ("Hg", "Hg"),
        ("Ho", "Ho_3"),
        ("I", "I"),
        ("In", "In_d"),
        ("Ir", "Ir"),
        ("K", "K_sv"),
        ("Kr", "Kr"),
        ("La", "La"),
        ("Li", "Li_sv"),
        ("Lu", "Lu_3"),
        ("Mg", "Mg_pv"),
        ("Mn", "Mn_pv"),
        ("Mo", "Mo_pv"),
        ("N", "N"),
        ("Na", "Na_pv"),
        ("Nb", "Nb_pv"),
        ("Nd", "Nd_3"),
        ("Ne", "Ne"),
        ("Ni", "Ni_pv"),
        ("Np", "Np"),
        ("O", "O"),
        ("Os", "Os_pv"),
        ("P", "P"),
        ("Pa", "Pa"),
        ("Pb", "Pb_d"),
        ("Pd", "Pd"),
        ("Pm", "Pm_3"),
        ("Pr", "Pr_3"),
        ("Pt", "Pt"),
        ("Pu", "Pu"),
        ("Rb", "Rb_sv"),
        ("Re", "Re_pv"),
        ("Rh", "Rh_pv"),
        ("Ru", "Ru_pv"),
        ("S", "S"),
        ("Sb", "Sb"),
        ("Sc", "Sc_sv"),
        ("Se", "Se"),
        ("Si", "Si"),
        ("Sm", "Sm_3"),
        ("Sn", "Sn_d"),
        ("Sr", "Sr_sv"),
        ("Ta", "Ta_pv"),
        ("Tb", "Tb_3"),
        ("Tc", "Tc_pv"),
        ("Te", "Te"),
        ("Th", "Th"),
        ("Ti", "Ti_sv"),
        ("Tl", "Tl_d"),
        ("Tm", "Tm_3"),
        ("U", "U"),
        ("V", "V_pv"),
        ("W", "W"),
        ("Xe", "Xe"),
        ("Y", "Y_sv"),
        ("Yb", "Yb_2"),
        ("Zn", "Zn"),
        ("Zr", "Zr_sv"),
    ]
    .into_iter()
    .collect();

    InputConfig {
        incar,
        reciprocal_density: 90.0,
        potcar,
    }
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_sanity() {
        let config = &*PBESOL_SLAB_CONFIG;
        assert_eq!(config.incar["ENCUT"], IncarValue::Int(500));
        assert_eq!(config.incar["GGA"], IncarValue::Str("PS".to_string()));
        // slab 静态计算：不做离子弛豫
        assert_eq!(config.incar["NSW"], IncarValue::Int(0));
        assert_eq!(config.reciprocal_density, 90.0);
        assert_eq!(config.potcar["Ti"], "Ti_sv");
        assert_eq!(config.potcar["O"], "O");
    }
}

// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供临时数据库、费率目录与托盘量夹具
// ==========================================

#![allow(dead_code)]

use pallet_mix_modeller::domain::{PalletVolume, PerType, RateTable, RatesSnapshot, TypeRates, VolumeAssignment};
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时数据库文件
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().ok_or("临时路径非 UTF-8")?.to_string();
    Ok((temp_file, db_path))
}

pub fn assignment(values: [(u64, u64); 3]) -> VolumeAssignment {
    PerType::new(
        PalletVolume::new(values[0].0, values[0].1),
        PalletVolume::new(values[1].0, values[1].1),
        PalletVolume::new(values[2].0, values[2].1),
    )
}

/// 库存单托毛利最高的费率表
pub fn stock_favoured_rates() -> RateTable {
    PerType::new(
        TypeRates::new(10.0, 9.0, 10.0, 9.0),
        TypeRates::new(10.0, 9.0, 10.0, 9.0),
        TypeRates::new(10.0, 2.0, 10.0, 2.0),
    )
}

pub fn snapshot(scope_id: &str, types: RateTable) -> RatesSnapshot {
    RatesSnapshot {
        scope_id: scope_id.to_string(),
        scope_label: format!("{} 口径", scope_id),
        types,
    }
}

/// 两个口径的费率目录 JSON
pub const CATALOG_JSON: &str = r#"{
    "p1_p9_avg": {
        "label": "P1-P9 平均",
        "types": {
            "consolidation": { "wh_rev_per_in_pallet": 12.5, "wh_cost_per_in_pallet": 9.0, "trans_rev_per_out_pallet": 21.0, "trans_cost_per_out_pallet": 18.5 },
            "groupage": { "wh_rev_per_in_pallet": 11.0, "wh_cost_per_in_pallet": 8.5, "trans_rev_per_out_pallet": 18.5, "trans_cost_per_out_pallet": 17.0 },
            "stock": { "wh_rev_per_in_pallet": 14.0, "wh_cost_per_in_pallet": 10.0, "trans_rev_per_out_pallet": 17.0, "trans_cost_per_out_pallet": 13.0 }
        }
    },
    "p9": {
        "label": "P9",
        "types": {
            "consolidation": { "wh_rev_per_in_pallet": 13.0, "wh_cost_per_in_pallet": 9.5, "trans_rev_per_out_pallet": 22.0, "trans_cost_per_out_pallet": 19.0 },
            "groupage": { "wh_rev_per_in_pallet": 11.5, "wh_cost_per_in_pallet": 9.0, "trans_rev_per_out_pallet": 19.0, "trans_cost_per_out_pallet": 17.5 },
            "stock": { "wh_rev_per_in_pallet": 14.5, "wh_cost_per_in_pallet": 10.5, "trans_rev_per_out_pallet": 17.5, "trans_cost_per_out_pallet": 13.5 }
        }
    }
}"#;

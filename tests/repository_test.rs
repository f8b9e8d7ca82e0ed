// ==========================================
// Repository 集成测试
// ==========================================
// 测试目标: 费率目录导入/查询、输入快照持久化与兜底
// ==========================================

mod test_helpers;

use pallet_mix_modeller::db::open_and_migrate;
use pallet_mix_modeller::domain::defaults::{current_volumes, seed_allocation_inputs};
use pallet_mix_modeller::repository::{snapshot_keys, InputSnapshotRepository, RateScopeRepository, RepositoryError};
use rusqlite::params;
use std::sync::{Arc, Mutex};
use test_helpers::{assignment, create_test_db, CATALOG_JSON};

fn shared_connection(db_path: &str) -> Arc<Mutex<rusqlite::Connection>> {
    let conn = open_and_migrate(db_path).expect("Failed to open db");
    Arc::new(Mutex::new(conn))
}

#[test]
fn test_rate_catalog_import_and_query() {
    println!("\n=== 测试: 费率目录导入与查询 ===");

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let repo = RateScopeRepository::from_connection(shared_connection(&db_path));

    let count = repo.import_catalog_json(CATALOG_JSON).expect("导入应成功");
    assert_eq!(count, 2, "应导入 2 个口径");

    let scopes = repo.list_scopes().expect("列出口径");
    let ids: Vec<&str> = scopes.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(ids, vec!["p1_p9_avg", "p9"], "口径按 id 排序");
    assert_eq!(scopes[0].label, "P1-P9 平均");

    let rates = repo.get_rates("p9").expect("读取费率");
    assert_eq!(rates.scope_label, "P9");
    assert_eq!(rates.types.stock.wh_rev_per_in_pallet, 14.5);
    assert_eq!(rates.types.consolidation.trans_cost_per_out_pallet, 19.0);

    // 重复导入覆盖而不是新增
    assert_eq!(repo.import_catalog_json(CATALOG_JSON).expect("重复导入"), 2);
    assert_eq!(repo.list_scopes().expect("列出口径").len(), 2);
}

#[test]
fn test_unknown_scope_not_found() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let repo = RateScopeRepository::from_connection(shared_connection(&db_path));

    let result = repo.get_rates("p42");
    assert!(
        matches!(result, Err(RepositoryError::NotFound { ref id, .. }) if id == "p42"),
        "未知口径应返回 NotFound"
    );
}

#[test]
fn test_invalid_catalog_rejected_atomically() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let repo = RateScopeRepository::from_connection(shared_connection(&db_path));

    let negative = CATALOG_JSON.replace("\"wh_rev_per_in_pallet\": 13.0", "\"wh_rev_per_in_pallet\": -13.0");
    assert!(repo.import_catalog_json(&negative).is_err(), "负费率应被拒绝");
    assert!(repo.list_scopes().expect("列出口径").is_empty(), "失败时不应写入任何口径");

    assert!(repo.import_catalog_json("{ not json").is_err());
}

#[test]
fn test_snapshot_defaults_and_roundtrip() {
    println!("\n=== 测试: 输入快照保存与读取 ===");

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let repo = InputSnapshotRepository::from_connection(shared_connection(&db_path));

    // 无快照时使用种子值
    assert_eq!(repo.load_allocation_inputs().expect("读取"), seed_allocation_inputs());
    assert_eq!(repo.load_scenario_volumes().expect("读取"), current_volumes());

    let volumes = assignment([(10, 12), (20, 18), (30, 31)]);
    repo.save_scenario_volumes(&volumes).expect("保存");
    assert_eq!(repo.load_scenario_volumes().expect("读取"), volumes);

    assert!(repo.clear(snapshot_keys::SCENARIO_VOLUMES).expect("清除"));
    assert_eq!(repo.load_scenario_volumes().expect("读取"), current_volumes());
}

#[test]
fn test_corrupt_snapshot_falls_back_to_seed() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = shared_connection(&db_path);
    {
        let guard = conn.lock().expect("lock");
        guard
            .execute(
                "INSERT INTO input_snapshot (snapshot_key, payload_json, saved_at) VALUES (?1, ?2, datetime('now'))",
                params![snapshot_keys::ALLOCATION_INPUTS, "{\"rhd_revenue\": \"oops\""],
            )
            .expect("写入损坏快照");
    }

    let repo = InputSnapshotRepository::from_connection(conn);
    assert!(repo.load_raw(snapshot_keys::ALLOCATION_INPUTS).expect("读取原文").is_some());
    assert_eq!(
        repo.load_allocation_inputs().expect("损坏快照不应报错"),
        seed_allocation_inputs(),
        "解析失败时回退到种子值"
    );
}

#[test]
fn test_snapshots_survive_reopen() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let volumes = assignment([(5, 5), (6, 6), (7, 7)]);

    {
        let repo = InputSnapshotRepository::from_connection(shared_connection(&db_path));
        repo.save_scenario_volumes(&volumes).expect("保存");
    }

    let repo = InputSnapshotRepository::from_connection(shared_connection(&db_path));
    assert_eq!(repo.load_scenario_volumes().expect("读取"), volumes, "重新打开后快照仍在");
}

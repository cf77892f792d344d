// ==========================================
// 参数值持久化集成测试
// ==========================================
// 测试目标: JSON 导出/导入、预设保存/载入/复制、快照恢复
// ==========================================


use param_registry::config::StoreError;
use param_registry::registry::{ParameterReader, SharedRegistry, EXPRESSION_SUFFIX};
use param_registry::ParamValue;
use serde_json::json;
use test_helpers::{create_test_store, scenario_registry};

#[test]
fn test_json_round_trip_keeps_types() {
    let mut registry = scenario_registry();
    registry.set_from_text("epochs_baseline", "(-0.2, 0.0)").unwrap();
    registry.set_from_text("reject", "{'mag': 4e-12}").unwrap();
    registry.set_from_text("tfr_freqs", "np.arange(4, 8)").unwrap();
    let exported = registry.to_json_string().unwrap();

    let dumped: serde_json::Value = serde_json::from_str(&exported).unwrap();
    assert_eq!(dumped["epochs_baseline"], json!({"tuple_type": [-0.2, 0.0]}));
    assert_eq!(dumped["autoreject"], json!({"expr_marker": "ar.get_rejection_threshold(epochs)"}));
    assert_eq!(
        dumped[format!("tfr_freqs{}", EXPRESSION_SUFFIX)],
        json!("np.arange(4, 8)")
    );

    let mut restored = scenario_registry();
    let report = restored.load_values_json(&exported).unwrap();
    assert!(report.is_clean(), "unexpected report: {:?}", report);
    assert_eq!(restored.values(), registry.values());
    assert_eq!(restored.get_f64_list("tfr_freqs").unwrap(), vec![4.0, 5.0, 6.0, 7.0]);
}

#[test]
fn test_load_isolates_bad_values() {
    let mut registry = scenario_registry();
    let report = registry
        .load_values_json(
            r#"{
                "highpass": 250,
                "ica_method": "picard",
                "epochs_baseline": {"tuple_type": [0, 1, 2]},
                "old_param": true
            }"#,
        )
        .unwrap();

    assert_eq!(report.loaded, vec!["ica_method"]);
    assert_eq!(report.dropped, vec!["old_param"]);
    let rejected: Vec<&str> = report.rejected.iter().map(|r| r.key.as_str()).collect();
    assert_eq!(rejected, vec!["highpass", "epochs_baseline"]);
    assert_eq!(report.filled.len(), 5);

    assert_eq!(registry.get("highpass").unwrap(), &ParamValue::Int(1));
    assert_eq!(registry.get_str("ica_method").unwrap(), "picard");
}

#[test]
fn test_presets_persist_between_sessions() {
    param_registry::logging::init_test();
    let (_file, store) = create_test_store().unwrap();

    let mut registry = scenario_registry();
    registry.set("lowpass", ParamValue::Int(70)).unwrap();
    registry.set_from_text("tfr_freqs", "np.arange(1, 4)").unwrap();
    store.save_preset("Default", &registry).unwrap();
    store.copy_preset("Default", "Backup").unwrap();

    registry.set("lowpass", ParamValue::Int(20)).unwrap();
    store.save_preset("Default", &registry).unwrap();

    let mut session = scenario_registry();
    store.load_preset("Backup", &mut session).unwrap();
    assert_eq!(session.get_i64("lowpass").unwrap(), 70);
    assert_eq!(session.expression("tfr_freqs"), Some("np.arange(1, 4)"));

    store.load_preset("Default", &mut session).unwrap();
    assert_eq!(session.get_i64("lowpass").unwrap(), 20);

    let names: Vec<String> = store
        .list_presets()
        .unwrap()
        .into_iter()
        .map(|p| p.name)
        .collect();
    assert_eq!(names, vec!["Backup", "Default"]);
}

#[test]
fn test_snapshot_restore() {
    let (_file, store) = create_test_store().unwrap();
    let registry = scenario_registry();
    store.save_preset("Default", &registry).unwrap();
    let snapshot = store.get_snapshot().unwrap();

    store.delete_preset("Default").unwrap();
    assert!(matches!(
        store.read_preset("Default"),
        Err(StoreError::PresetNotFound(_))
    ));

    let (_other_file, other) = create_test_store().unwrap();
    assert!(other.restore_from_snapshot(&snapshot).unwrap() > 0);
    let mut session = scenario_registry();
    let report = other.load_preset("Default", &mut session).unwrap();
    assert!(report.is_clean(), "unexpected report: {:?}", report);
    assert_eq!(session.values(), registry.values());

    assert!(matches!(
        other.restore_from_snapshot("{\"Broken\": [1, 2]}"),
        Err(StoreError::Format(_))
    ));
}

#[test]
fn test_shared_registry_snapshot() {
    let shared = SharedRegistry::new(scenario_registry());
    let before = shared.snapshot().unwrap();

    let writer = shared.clone();
    std::thread::spawn(move || writer.set("ica_method", "infomax".into()).unwrap())
        .join()
        .unwrap();

    assert_eq!(before.get_str("ica_method").unwrap(), "fastica");
    assert_eq!(shared.snapshot().unwrap().get_str("ica_method").unwrap(), "infomax");
    assert!(shared.set("ica_method", "jade".into()).is_err());

    let keys = shared
        .with_read(|registry| registry.by_group("ICA").to_vec())
        .unwrap();
    assert_eq!(keys, vec!["ica_method", "n_components"]);
}

// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 持久化导入选项驱动导入事务行为
// ==========================================


use csv_record_importer::config::{config_keys, ConfigManager, ImportOptionsReader};
use csv_record_importer::importer::{ColumnSpec, CsvImporter, ImportConfiguration, Mapping};
use csv_record_importer::ImportOptions;
use test_helpers::{create_test_db, material_store, open_shared_connection};

#[test]
fn test_config_manager_creation() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let config_manager = ConfigManager::new(&db_path);
    assert!(
        config_manager.is_ok(),
        "ConfigManager should be created successfully"
    );
}

#[test]
fn test_defaults_when_nothing_stored() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    let options = config_manager
        .load_import_options()
        .expect("Should load import options");
    assert_eq!(options, ImportOptions::default());
}

#[test]
fn test_options_persist_across_managers() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");

    let writer = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    writer
        .set_config_value(config_keys::PARTIAL_SAVE, "true")
        .expect("Failed to store config");
    writer
        .set_config_value(config_keys::SOURCE_ENCODING, " latin1 ")
        .expect("Failed to store config");

    let reader = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    let options = reader.load_import_options().expect("Should load import options");
    assert!(options.partial_save);
    assert_eq!(options.source_encoding.as_deref(), Some("latin1"));
}

#[test]
fn test_stored_partial_save_drives_commit() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_shared_connection(&db_path).expect("Failed to open db");

    let config_manager = ConfigManager::from_connection(conn.clone());
    config_manager
        .set_config_value(config_keys::PARTIAL_SAVE, "1")
        .expect("Failed to store config");
    let options = config_manager
        .load_import_options()
        .expect("Should load import options");

    let materials = material_store(&conn).expect("Failed to create store");
    let mapping = Mapping::new()
        .column("name", ColumnSpec::new())
        .column("fragile", ColumnSpec::new());
    let importer = CsvImporter::new(ImportConfiguration::new(mapping), materials.clone());

    let err = importer
        .import_from_csv("Name,Fragile\nMaterial1,1\n,0\n", &options)
        .unwrap_err();

    assert_eq!(err.as_aggregate().map(|e| e.num_imported), Some(1));
    assert_eq!(materials.count().unwrap(), 1);
}

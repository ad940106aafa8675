// ==========================================
// CSV 导入集成测试
// ==========================================
// 测试目标: 基于 SQLite 文件库验证完整导入流程
// 场景: 模板、新建/更新、校验错误、转换异常、格式错误、编码错误、部分提交
// ==========================================


use csv_record_importer::importer::{ColumnSpec, CsvImporter, ImportConfiguration, Mapping};
use csv_record_importer::logging;
use csv_record_importer::{
    EntityStore, FieldValue, ImportEntity, ImportError, ImportOptions, SqliteRecord,
    SqliteStore, ValueMethods,
};
use test_helpers::{category_store, create_test_db, material_store, open_shared_connection};

/// name / fragile(Fragile?) / category_id 三列映射
fn material_mapping(categories: SqliteStore) -> Mapping {
    Mapping::new()
        .column("name", ColumnSpec::new())
        .column(
            "fragile",
            ColumnSpec::new()
                .named("Fragile?")
                .value_method(ValueMethods::yes_no_value_method()),
        )
        .column(
            "category_id",
            ColumnSpec::new().record_method(move |value, _row, _mapping| {
                Ok(categories.find_by("name", value)?)
            }),
        )
}

fn category_name(categories: &SqliteStore, material: &SqliteRecord) -> Option<String> {
    let id = material.get("category_id").and_then(FieldValue::as_i64)?;
    let category = categories.find(id).ok()??;
    category.get("name").and_then(FieldValue::as_str).map(str::to_string)
}

fn simple_mapping() -> Mapping {
    Mapping::new()
        .column("name", ColumnSpec::new())
        .column("fragile", ColumnSpec::new())
}

#[test]
fn test_basic_import_and_template() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_shared_connection(&db_path).expect("Failed to open db");
    let materials = material_store(&conn).expect("Failed to create store");
    let categories = category_store(&conn).expect("Failed to create store");

    let importer = CsvImporter::new(
        ImportConfiguration::new(material_mapping(categories.clone())),
        materials.clone(),
    );

    let template = importer.csv_import_template().unwrap();
    let mut headings: Vec<&str> = template.trim().split(',').collect();
    headings.sort();
    assert_eq!(headings, vec!["Category", "Fragile?", "Name"]);

    let count = importer
        .import_from_csv(
            "name,fragile?,category\nMaterial1,yes,Category1",
            &ImportOptions::default(),
        )
        .unwrap();
    assert_eq!(count, 1);

    let all = materials.all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].get("name"), Some(&FieldValue::from("Material1")));
    assert_eq!(all[0].get("fragile").and_then(FieldValue::as_bool), Some(true));
    assert_eq!(category_name(&categories, &all[0]).as_deref(), Some("Category1"));
}

#[test]
fn test_create_new_or_update_existing_record() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_shared_connection(&db_path).expect("Failed to open db");
    let materials = material_store(&conn).expect("Failed to create store");
    let categories = category_store(&conn).expect("Failed to create store");

    let lookup = materials.clone();
    let mapping = Mapping::new()
        .column("name", ColumnSpec::new())
        .column(
            "fragile",
            ColumnSpec::new().value_method(|value, _row, _mapping| {
                Ok(FieldValue::Bool(matches!(value.to_lowercase().as_str(), "t" | "true")))
            }),
        )
        .column("category_id", {
            let categories = categories.clone();
            ColumnSpec::new().record_method(move |value, _row, _mapping| {
                Ok(categories.find_by("name", value)?)
            })
        });
    let config = ImportConfiguration::new(mapping).with_find_existing(move |row| {
        let Some(name) = row.get("name") else {
            return Ok(None);
        };
        Ok(lookup.find_by("name", name.as_str())?)
    });

    let mut existing = materials.new_entity();
    existing.assign("name", FieldValue::from("Material1"));
    existing.assign("fragile", FieldValue::Bool(false));
    materials.save(&mut existing).unwrap();

    let importer = CsvImporter::new(config, materials.clone());
    let count = importer
        .import_from_csv(
            "Name,Fragile,Category\nMaterial1,T,Category1\nMaterial2,false,Category2",
            &ImportOptions::default(),
        )
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(materials.count().unwrap(), 2);

    let m1 = materials.find_by("name", "Material1").unwrap().unwrap();
    let m2 = materials.find_by("name", "Material2").unwrap().unwrap();
    assert_eq!(m1.id(), existing.id());
    assert_eq!(m1.get("fragile").and_then(FieldValue::as_bool), Some(true));
    assert_eq!(category_name(&categories, &m1).as_deref(), Some("Category1"));
    assert_eq!(m2.get("fragile").and_then(FieldValue::as_bool), Some(false));
    assert_eq!(category_name(&categories, &m2).as_deref(), Some("Category2"));
}

#[test]
fn test_failed_existing_lookup_does_not_duplicate() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_shared_connection(&db_path).expect("Failed to open db");
    let materials = material_store(&conn).expect("Failed to create store");

    let mut existing = materials.new_entity();
    existing.assign("name", FieldValue::from("Material1"));
    materials.save(&mut existing).unwrap();

    // 查找指向不存在的表，每次查找都失败
    let broken_lookup = SqliteStore::from_connection(conn.clone(), "no_such_table")
        .expect("Failed to create store");
    let config = ImportConfiguration::new(simple_mapping()).with_find_existing(move |row| {
        let Some(name) = row.get("name") else {
            return Ok(None);
        };
        Ok(broken_lookup.find_by("name", name.as_str())?)
    });
    let importer = CsvImporter::new(config, materials.clone());

    let err = importer
        .import_from_csv("Name,Fragile\nMaterial1,1\n", &ImportOptions::default())
        .unwrap_err();

    let aggregate = err.as_aggregate().expect("Expected aggregate import error");
    assert_eq!(aggregate.num_imported, 0);
    assert_eq!(aggregate.errors.len(), 1);
    assert!(aggregate.errors[0]
        .message
        .starts_with("Failed to look up existing record: "));
    assert_eq!(aggregate.errors[0].row, vec!["Material1", "1"]);
    assert_eq!(materials.count().unwrap(), 1);
}

#[test]
fn test_model_validation_error_handling() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_shared_connection(&db_path).expect("Failed to open db");
    let materials = material_store(&conn).expect("Failed to create store");

    let importer = CsvImporter::new(ImportConfiguration::new(simple_mapping()), materials.clone());
    let err = importer
        .import_from_csv("Name,Fragile\nMaterial1,false\n,true", &ImportOptions::default())
        .unwrap_err();

    let aggregate = err.as_aggregate().expect("Expected aggregate import error");
    let mut header = aggregate.header_row.clone();
    header.sort();
    assert_eq!(header.join(","), "Fragile,Name");
    assert_eq!(aggregate.num_imported, 1);
    assert_eq!(aggregate.errors.len(), 1);

    let first = &aggregate.errors[0];
    assert_eq!(
        first.validation.as_ref().map(|v| v.full_messages()),
        Some(vec!["Name can't be blank".to_string()])
    );
    let mut row = first.row.clone();
    row.sort();
    assert_eq!(row.join(","), ",true");

    // 未开启部分提交：成功行随事务一起回滚
    assert_eq!(materials.count().unwrap(), 0);
}

#[test]
fn test_exception_in_value_method() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_shared_connection(&db_path).expect("Failed to open db");
    let materials = material_store(&conn).expect("Failed to create store");

    let mapping = Mapping::new().column("name", ColumnSpec::new()).column(
        "fragile",
        ColumnSpec::new().value_method(|_value, _row, _mapping| anyhow::bail!("tada!")),
    );
    let importer = CsvImporter::new(ImportConfiguration::new(mapping), materials);

    let err = importer
        .import_from_csv("Name,Fragile\nMaterial1,false", &ImportOptions::default())
        .unwrap_err();

    let aggregate = err.as_aggregate().expect("Expected aggregate import error");
    assert_eq!(aggregate.errors[0].message, "Failed to import column 'Fragile': tada!");
    assert_eq!(aggregate.errors[0].row, vec!["Material1", "false"]);
}

#[test]
fn test_missing_reference_is_reported_per_row() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_shared_connection(&db_path).expect("Failed to open db");
    let materials = material_store(&conn).expect("Failed to create store");
    let categories = category_store(&conn).expect("Failed to create store");

    let importer = CsvImporter::new(
        ImportConfiguration::new(material_mapping(categories)),
        materials,
    );
    let err = importer
        .import_from_csv(
            "Name,Fragile?,Category\nMaterial1,yes,Category3",
            &ImportOptions::default(),
        )
        .unwrap_err();

    let aggregate = err.as_aggregate().expect("Expected aggregate import error");
    assert_eq!(
        aggregate.errors[0].message,
        "Failed to import column 'Category': Unable to find referred record of value Category3"
    );
}

#[test]
fn test_malformed_csv_handling() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_shared_connection(&db_path).expect("Failed to open db");
    let materials = material_store(&conn).expect("Failed to create store");

    let importer = CsvImporter::new(ImportConfiguration::new(simple_mapping()), materials.clone());
    let err = importer
        .import_from_csv("Name,\"Fragile\nMaterial1,false", &ImportOptions::default())
        .unwrap_err();

    let aggregate = err.as_aggregate().expect("Expected aggregate import error");
    assert!(aggregate.errors[0].message.starts_with("Invalid CSV format: "));
    assert!(aggregate.errors[0].row.is_empty());
    assert_eq!(aggregate.num_imported, 0);
    assert_eq!(materials.count().unwrap(), 0);
}

#[test]
fn test_invalid_utf8_handling() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_shared_connection(&db_path).expect("Failed to open db");
    let materials = material_store(&conn).expect("Failed to create store");

    let importer = CsvImporter::new(ImportConfiguration::new(simple_mapping()), materials.clone());
    let err = importer
        .import_from_csv(
            b"Name,Fragile\nMaterial1\x94,false".as_slice(),
            &ImportOptions::default(),
        )
        .unwrap_err();

    let aggregate = err.as_aggregate().expect("Expected aggregate import error");
    assert!(aggregate.header_row.is_empty());
    assert_eq!(aggregate.num_imported, 0);
    assert_eq!(aggregate.errors.len(), 1);
    assert!(aggregate.errors[0].is_file_level());
    assert!(aggregate.errors[0]
        .message
        .starts_with("Invalid character encountered in row 2, column 1 in the CSV file: "));
    assert_eq!(materials.count().unwrap(), 0);
}

#[test]
fn test_declared_source_encoding() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_shared_connection(&db_path).expect("Failed to open db");
    let materials = material_store(&conn).expect("Failed to create store");

    let importer = CsvImporter::new(ImportConfiguration::new(simple_mapping()), materials.clone());
    let count = importer
        .import_from_csv(
            b"Name\nCaf\xe9\n".as_slice(),
            &ImportOptions::default().with_source_encoding("windows-1252"),
        )
        .unwrap();

    assert_eq!(count, 1);
    let all = materials.all().unwrap();
    assert_eq!(all[0].get("name"), Some(&FieldValue::from("Café")));
}

#[test]
fn test_partial_save_commits_successful_rows() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_shared_connection(&db_path).expect("Failed to open db");
    let materials = material_store(&conn).expect("Failed to create store");

    let importer = CsvImporter::new(ImportConfiguration::new(simple_mapping()), materials.clone());
    let err = importer
        .import_from_csv(
            "Name,Fragile\nMaterial1,0\n,1\nMaterial3,1\n,0\n",
            &ImportOptions::default().with_partial_save(true),
        )
        .unwrap_err();

    let aggregate = err.as_aggregate().expect("Expected aggregate import error");
    assert_eq!(aggregate.num_imported, 2);
    assert_eq!(aggregate.errors.len(), 2);
    // 错误按行顺序记录
    assert_eq!(aggregate.errors[0].row, vec!["", "1"]);
    assert_eq!(aggregate.errors[1].row, vec!["", "0"]);

    let names: Vec<FieldValue> = materials
        .all()
        .unwrap()
        .iter()
        .filter_map(|m| m.get("name").cloned())
        .collect();
    assert_eq!(names, vec![FieldValue::from("Material1"), FieldValue::from("Material3")]);

    let report = aggregate.error_report_csv().unwrap();
    assert_eq!(
        report,
        "Name,Fragile,Errors\n,1,Name can't be blank\n,0,Name can't be blank\n"
    );
}

#[test]
fn test_template_round_trip() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_shared_connection(&db_path).expect("Failed to open db");
    let materials = material_store(&conn).expect("Failed to create store");
    let categories = category_store(&conn).expect("Failed to create store");

    let importer = CsvImporter::new(
        ImportConfiguration::new(material_mapping(categories)),
        materials.clone(),
    );
    let mut content = importer.csv_import_template().unwrap();
    content.push_str("Material9,no,Category2\n");

    assert_eq!(importer.import_from_csv(content, &ImportOptions::default()).unwrap(), 1);
    assert_eq!(materials.count().unwrap(), 1);
}

#[test]
fn test_store_failure_is_not_a_row_error() {
    logging::init_test();

    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_shared_connection(&db_path).expect("Failed to open db");
    let materials = material_store(&conn).expect("Failed to create store");

    // 映射到不存在的列，INSERT 失败属于存储故障
    let mapping = Mapping::new()
        .column("name", ColumnSpec::new())
        .column("colour", ColumnSpec::new());
    let importer = CsvImporter::new(ImportConfiguration::new(mapping), materials.clone());

    let err = importer
        .import_from_csv(
            "Name,Colour\nMaterial1,red\n",
            &ImportOptions::default().with_partial_save(true),
        )
        .unwrap_err();

    assert!(matches!(err, ImportError::Store(_)));
    assert_eq!(materials.count().unwrap(), 0);
}

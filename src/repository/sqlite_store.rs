// ==========================================
// CSV 批量导入 - SQLite 实体存储实现
// ==========================================
// 职责: 单表实体的创建、校验、插入/更新、查询与事务边界
// 约束: 所有值使用参数化绑定；表名/列名只允许 [A-Za-z0-9_]
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::FieldValue;
use crate::repository::entity_store::{EntityStore, Identifiable, ImportEntity};
use crate::repository::error::{SaveError, StoreError, StoreResult, ValidationErrors};
use rusqlite::{params, Connection, ToSql};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

// ==========================================
// SqliteRecord - 单表记录
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqliteRecord {
    id: Option<i64>,
    fields: BTreeMap<String, FieldValue>,
}

impl SqliteRecord {
    /// 主键（未落库时为 None）
    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn is_new_record(&self) -> bool {
        self.id.is_none()
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldValue> {
        &self.fields
    }
}

impl ImportEntity for SqliteRecord {
    fn assign(&mut self, field: &str, value: FieldValue) {
        self.fields.insert(field.to_string(), value);
    }

    fn get(&self, field: &str) -> Option<&FieldValue> {
        self.fields.get(field)
    }
}

impl Identifiable for SqliteRecord {
    fn identifier(&self) -> FieldValue {
        self.id.map(FieldValue::Integer).unwrap_or(FieldValue::Null)
    }
}

// ==========================================
// SqliteStore - 绑定单表的实体存储
// ==========================================
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    table: String,
    required: Vec<String>,
}

impl SqliteStore {
    /// 打开数据库文件并绑定到表 `table`
    pub fn new(db_path: &str, table: &str) -> StoreResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Self::from_connection(Arc::new(Mutex::new(conn)), table)
    }

    /// 从已有连接创建（多个表的存储可共享同一连接与事务）
    pub fn from_connection(conn: Arc<Mutex<Connection>>, table: &str) -> StoreResult<Self> {
        quote_identifier(table)?;
        Ok(Self {
            conn,
            table: table.to_string(),
            required: Vec::new(),
        })
    }

    /// 声明必填字段，保存时为空则校验失败
    pub fn validates_presence_of(mut self, field: &str) -> Self {
        self.required.push(field.to_string());
        self
    }

    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::LockError(e.to_string()))
    }

    /// 按主键查询
    pub fn find(&self, id: i64) -> StoreResult<Option<SqliteRecord>> {
        self.find_by("id", id)
    }

    /// 按列值查询第一条记录（按主键升序）
    pub fn find_by(
        &self,
        column: &str,
        value: impl Into<FieldValue>,
    ) -> StoreResult<Option<SqliteRecord>> {
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?1 ORDER BY id LIMIT 1",
            quote_identifier(&self.table)?,
            quote_identifier(column)?
        );
        let value = value.into();
        let conn = self.lock()?;
        ensure_column(&conn, &self.table, column)?;
        let mut records = load_records(&conn, &sql, &[&value as &dyn ToSql])?;
        Ok(records.pop())
    }

    /// 查询全部记录（按主键升序）
    pub fn all(&self) -> StoreResult<Vec<SqliteRecord>> {
        let sql = format!("SELECT * FROM {} ORDER BY id", quote_identifier(&self.table)?);
        let conn = self.lock()?;
        load_records(&conn, &sql, &[])
    }

    pub fn count(&self) -> StoreResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(&self.table)?);
        let conn = self.lock()?;
        Ok(conn.query_row(&sql, [], |row| row.get(0))?)
    }

    /// 必填校验
    fn validate(&self, record: &SqliteRecord) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for field in &self.required {
            let blank = record.fields.get(field).map_or(true, FieldValue::is_blank);
            if blank {
                errors.add(field.as_str(), "can't be blank");
            }
        }
        errors
    }

    fn insert(&self, conn: &Connection, record: &SqliteRecord) -> StoreResult<i64> {
        let table = quote_identifier(&self.table)?;
        let sql = if record.fields.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", table)
        } else {
            let columns = record
                .fields
                .keys()
                .map(|c| quote_identifier(c))
                .collect::<StoreResult<Vec<_>>>()?;
            let placeholders = (1..=columns.len())
                .map(|i| format!("?{}", i))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                table,
                columns.join(", "),
                placeholders
            )
        };

        let values: Vec<&dyn ToSql> = record.fields.values().map(|v| v as &dyn ToSql).collect();
        conn.execute(&sql, values.as_slice())?;
        Ok(conn.last_insert_rowid())
    }

    fn update(&self, conn: &Connection, id: i64, record: &SqliteRecord) -> StoreResult<()> {
        if record.fields.is_empty() {
            return Ok(());
        }

        let assignments = record
            .fields
            .keys()
            .enumerate()
            .map(|(idx, c)| Ok(format!("{} = ?{}", quote_identifier(c)?, idx + 1)))
            .collect::<StoreResult<Vec<_>>>()?;
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?{}",
            quote_identifier(&self.table)?,
            assignments.join(", "),
            assignments.len() + 1
        );

        let mut values: Vec<&dyn ToSql> =
            record.fields.values().map(|v| v as &dyn ToSql).collect();
        values.push(&id);
        conn.execute(&sql, values.as_slice())?;
        Ok(())
    }
}

impl EntityStore for SqliteStore {
    type Entity = SqliteRecord;

    fn new_entity(&self) -> SqliteRecord {
        SqliteRecord::default()
    }

    fn save(&self, entity: &mut SqliteRecord) -> Result<(), SaveError> {
        let errors = self.validate(entity);
        if !errors.is_empty() {
            return Err(SaveError::Invalid(errors));
        }

        let conn = self.lock()?;
        match entity.id {
            Some(id) => {
                self.update(&conn, id, entity)?;
                debug!(table = %self.table, id, "记录已更新");
            }
            None => {
                let id = self.insert(&conn, entity)?;
                entity.id = Some(id);
                debug!(table = %self.table, id, "记录已插入");
            }
        }
        Ok(())
    }

    fn begin(&self) -> StoreResult<()> {
        self.execute_transaction_statement("BEGIN")
    }

    fn commit(&self) -> StoreResult<()> {
        self.execute_transaction_statement("COMMIT")
    }

    fn rollback(&self) -> StoreResult<()> {
        self.execute_transaction_statement("ROLLBACK")
    }
}

// rusqlite::Transaction 借用连接的 MutexGuard，无法跨 begin/commit 两次 trait 调用持有；
// 这里直接执行事务语句，并用 is_autocommit 校验事务状态
impl SqliteStore {
    fn execute_transaction_statement(&self, statement: &str) -> StoreResult<()> {
        let conn = self.lock()?;

        let opening = statement == "BEGIN";
        if conn.is_autocommit() != opening {
            let state = if opening { "事务已开启" } else { "没有进行中的事务" };
            return Err(StoreError::DatabaseTransactionError(format!(
                "{}: {}",
                statement, state
            )));
        }

        conn.execute_batch(statement)
            .map_err(|e| StoreError::DatabaseTransactionError(format!("{}: {}", statement, e)))
    }
}

/// 校验列存在于表中
///
/// SQLite 把找不到的双引号标识符当作字符串字面量，拼进 WHERE 不会报错
fn ensure_column(conn: &Connection, table: &str, column: &str) -> StoreResult<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2 COLLATE NOCASE)",
        params![table, column],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(StoreError::InvalidIdentifier(format!("{}.{}", table, column)));
    }
    Ok(())
}

/// 校验并加引号，防止标识符注入
fn quote_identifier(name: &str) -> StoreResult<String> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(StoreError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{}\"", name))
}

fn load_records(
    conn: &Connection,
    sql: &str,
    params: &[&dyn ToSql],
) -> StoreResult<Vec<SqliteRecord>> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let rows = stmt.query_map(params, |row| {
        let mut record = SqliteRecord::default();
        for (idx, column) in columns.iter().enumerate() {
            let value: FieldValue = row.get(idx)?;
            if column == "id" {
                record.id = value.as_i64();
            } else {
                record.fields.insert(column.clone(), value);
            }
        }
        Ok(record)
    })?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }
    Ok(records)
}

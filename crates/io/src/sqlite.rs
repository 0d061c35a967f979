// SQLite-backed table store

use std::path::Path;

use chrono::NaiveDate;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use stocktally_config::SalesSchema;
use stocktally_core::{Dataset, Value};
use stocktally_recon::{SalesFact, SalesFactSource, StoreError, TableStore};

use crate::xlsx::serial_to_datetime;

/// Persisted tables in one SQLite database file.
///
/// Every mutating call commits on its own. Identifiers are always quoted, so
/// table and column names with spaces or Polish characters are fine.
pub struct SqliteStore {
    conn: Connection,
    sales: SalesQuery,
}

impl SqliteStore {
    /// Open (or create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(backend)?;
        log::debug!("opened database {}", path.display());
        Ok(Self {
            conn,
            sales: SalesQuery::default(),
        })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(backend)?;
        Ok(Self {
            conn,
            sales: SalesQuery::default(),
        })
    }

    pub fn with_sales_query(mut self, sales: SalesQuery) -> Self {
        self.sales = sales;
        self
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// User tables, sorted by name.
    pub fn table_names(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .map_err(backend)?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(backend)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(backend)?;
        Ok(names)
    }

    pub fn row_count(&self, table: &str) -> Result<usize, StoreError> {
        self.require(table)?;
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", quote(table)), [], |row| row.get(0))
            .map_err(backend)?;
        Ok(n as usize)
    }

    /// Create `table` with the columns of `sample`. Declared types follow
    /// the non-null values of each column; a column mixing text and numbers
    /// gets no declared type so SQLite stores every value as given.
    pub fn create_table(&mut self, table: &str, sample: &Dataset) -> Result<(), StoreError> {
        if sample.columns().is_empty() {
            return Err(stocktally_core::DatasetError::NoColumns.into());
        }
        let defs: Vec<String> = sample
            .columns()
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let column = sample.rows().iter().map(|r| &r[i]);
                format!("{} {}", quote(name), declared_type(column)).trim_end().to_string()
            })
            .collect();
        let sql = format!("CREATE TABLE {} ({})", quote(table), defs.join(", "));
        self.conn.execute(&sql, []).map_err(backend)?;
        log::info!("created table '{}' with {} column(s)", table, defs.len());
        Ok(())
    }

    fn columns_of(&self, table: &str) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", quote(table)))
            .map_err(backend)?;
        let cols = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .map_err(backend)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(backend)?;
        Ok(cols)
    }

    fn require(&self, table: &str) -> Result<(), StoreError> {
        if self.table_exists(table)? {
            Ok(())
        } else {
            Err(StoreError::UnknownTable(table.to_string()))
        }
    }

    fn insert_rows(tx: &rusqlite::Transaction<'_>, table: &str, data: &Dataset) -> Result<(), StoreError> {
        if data.is_empty() {
            return Ok(());
        }
        let cols: Vec<String> = data.columns().iter().map(|c| quote(c)).collect();
        let placeholders: Vec<String> = (1..=cols.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(table),
            cols.join(", "),
            placeholders.join(", ")
        );
        let mut stmt = tx.prepare(&sql).map_err(backend)?;
        for row in data.rows() {
            stmt.execute(params_from_iter(row.iter().map(to_sql))).map_err(backend)?;
        }
        Ok(())
    }
}

impl TableStore for SqliteStore {
    fn table_exists(&self, table: &str) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table],
                |_| Ok(()),
            )
            .optional()
            .map_err(backend)?;
        Ok(found.is_some())
    }

    fn read_table(&self, table: &str) -> Result<Dataset, StoreError> {
        self.require(table)?;
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {} ORDER BY rowid", quote(table)))
            .map_err(backend)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
        let width = columns.len();

        let mut dataset = Dataset::new(columns);
        let mut rows = stmt.query([]).map_err(backend)?;
        while let Some(row) = rows.next().map_err(backend)? {
            let mut values = Vec::with_capacity(width);
            for i in 0..width {
                values.push(from_sql(row.get_ref(i).map_err(backend)?));
            }
            dataset.push_row(values)?;
        }
        Ok(dataset)
    }

    fn replace_all(&mut self, table: &str, data: &Dataset) -> Result<(), StoreError> {
        self.require(table)?;
        let tx = self.conn.transaction().map_err(backend)?;
        tx.execute(&format!("DELETE FROM {}", quote(table)), []).map_err(backend)?;
        Self::insert_rows(&tx, table, data)?;
        tx.commit().map_err(backend)?;
        Ok(())
    }

    fn append_records(&mut self, table: &str, data: &Dataset) -> Result<(), StoreError> {
        self.require(table)?;
        let known = self.columns_of(table)?;
        if let Some(unknown) = data.columns().iter().find(|c| !known.contains(c)) {
            return Err(StoreError::UnknownColumn {
                table: table.to_string(),
                column: unknown.clone(),
            });
        }
        let tx = self.conn.transaction().map_err(backend)?;
        Self::insert_rows(&tx, table, data)?;
        tx.commit().map_err(backend)?;
        Ok(())
    }

    fn delete_by_key(&mut self, table: &str, key_column: &str, key: &Value) -> Result<usize, StoreError> {
        // IS rather than =, so a NULL key matches NULL
        let sql = format!("DELETE FROM {} WHERE {} IS ?1", quote(table), quote(key_column));
        self.conn
            .execute(&sql, params![to_sql(key)])
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(_, Some(ref msg)) if msg.starts_with("no such column") => {
                    StoreError::UnknownColumn {
                        table: table.to_string(),
                        column: key_column.to_string(),
                    }
                }
                rusqlite::Error::SqliteFailure(_, Some(ref msg)) if msg.starts_with("no such table") => {
                    StoreError::UnknownTable(table.to_string())
                }
                other => backend(other),
            })
    }
}

impl SalesFactSource for SqliteStore {
    fn read_sales_facts(&self) -> Result<Vec<SalesFact>, StoreError> {
        let mut stmt = self.conn.prepare(&self.sales.sql).map_err(backend)?;
        let mut rows = stmt.query([]).map_err(backend)?;

        let mut facts = Vec::new();
        let mut skipped = 0usize;
        while let Some(row) = rows.next().map_err(backend)? {
            let date = from_sql(row.get_ref(0).map_err(backend)?);
            let code = from_sql(row.get_ref(1).map_err(backend)?);
            let name = from_sql(row.get_ref(2).map_err(backend)?);
            let quantity = from_sql(row.get_ref(3).map_err(backend)?);

            match (order_date(&date), quantity.as_i64()) {
                (Some(order_date), Some(quantity)) => facts.push(SalesFact {
                    order_date,
                    product_code: code,
                    product_name: name.to_string(),
                    quantity,
                }),
                _ => skipped += 1,
            }
        }
        if skipped > 0 {
            log::warn!("skipped {} order line(s) without a usable date or quantity", skipped);
        }
        log::debug!("read {} sales fact(s)", facts.len());
        Ok(facts)
    }
}

// ============================================================================
// Sales query
// ============================================================================

/// SELECT joining order lines to their order date and product, columns in
/// the order (date, code, name, quantity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesQuery {
    sql: String,
}

impl SalesQuery {
    pub fn new(schema: &SalesSchema) -> Self {
        let sql = format!(
            "SELECT o.{date}, p.{code}, p.{name}, l.{qty} \
             FROM {lines} l \
             JOIN {orders} o ON l.{line_order} = o.{order_id} \
             JOIN {products} p ON l.{line_code} = p.{code}",
            date = quote(&schema.order_date),
            code = quote(&schema.product_code),
            name = quote(&schema.product_name),
            qty = quote(&schema.line_quantity),
            lines = quote(&schema.lines_table),
            orders = quote(&schema.orders_table),
            line_order = quote(&schema.line_order_id),
            order_id = quote(&schema.order_id),
            products = quote(&schema.products_table),
            line_code = quote(&schema.line_product_code),
        );
        Self { sql }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl Default for SalesQuery {
    fn default() -> Self {
        Self::new(&SalesSchema::default())
    }
}

// ============================================================================
// Value mapping
// ============================================================================

fn backend(e: rusqlite::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

pub(crate) fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Column affinity for a set of values. Affinity rewrites values on insert
/// (a REAL into a TEXT column becomes `"2.5"`), so only a column whose values
/// all share one storage class gets a declared type.
fn declared_type<'a>(values: impl Iterator<Item = &'a Value>) -> &'static str {
    let (mut integer, mut real, mut text) = (false, false, false);
    for value in values {
        match value {
            Value::Null => {}
            Value::Int(_) | Value::Bool(_) => integer = true,
            Value::Float(_) => real = true,
            Value::Date(_) | Value::Text(_) => text = true,
        }
    }
    match (integer, real, text) {
        (_, _, true) if integer || real => "",
        (_, _, true) => "TEXT",
        (_, true, false) => "REAL",
        (true, false, false) => "INTEGER",
        (false, false, false) => "",
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int(n) => SqlValue::Integer(*n),
        Value::Float(f) => SqlValue::Real(*f),
        Value::Date(d) => SqlValue::Text(d.format("%Y-%m-%d").to_string()),
        Value::Text(s) => SqlValue::Text(s.clone()),
    }
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(n) => Value::Int(n),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => Value::Text(String::from_utf8_lossy(bytes).into_owned()),
    }
}

/// Order dates may be ISO text or an Excel serial number.
fn order_date(value: &Value) -> Option<NaiveDate> {
    match value {
        Value::Int(_) | Value::Float(_) => value.as_f64().and_then(serial_to_datetime).map(|dt| dt.date()),
        other => other.as_date(),
    }
}

// Application settings
// Loaded from --config, ./stocktally.toml or ~/.config/stocktally/config.toml

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const APP_DIR: &str = "stocktally";
pub const LOCAL_FILE: &str = "stocktally.toml";

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("inventory.db"),
        }
    }
}

/// One managed table and the export file that feeds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSource {
    pub table: String,
    pub file: PathBuf,
}

impl TableSource {
    pub fn new(table: &str, file: &str) -> Self {
        Self {
            table: table.to_string(),
            file: PathBuf::from(file),
        }
    }
}

fn default_tables() -> Vec<TableSource> {
    [
        ("Suppliers", "suppliers.xlsx"),
        ("Products", "products.xlsx"),
        ("Warehouses", "warehouses.xlsx"),
        ("WarehouseStock", "warehouse_stock.xlsx"),
        ("Customers", "customers.xlsx"),
        ("Orders", "orders.xlsx"),
        ("OrderDetails", "order_details.xlsx"),
        ("Deliveries", "deliveries.xlsx"),
        ("DeliveryDetails", "delivery_details.xlsx"),
    ]
    .into_iter()
    .map(|(table, file)| TableSource::new(table, file))
    .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationSettings {
    /// Upper cumulative share (percent) of tier A.
    pub a_max: f64,
    /// Upper cumulative share (percent) of tier B.
    pub b_max: f64,
    /// Decimal places shown for percentages.
    pub decimals: u32,
}

impl Default for ClassificationSettings {
    fn default() -> Self {
        Self {
            a_max: 20.0,
            b_max: 50.0,
            decimals: 2,
        }
    }
}

/// Table and column names of the order/line/product join that yields sales facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SalesSchema {
    pub orders_table: String,
    pub order_id: String,
    pub order_date: String,
    pub lines_table: String,
    pub line_order_id: String,
    pub line_product_code: String,
    pub line_quantity: String,
    pub products_table: String,
    pub product_code: String,
    pub product_name: String,
}

impl Default for SalesSchema {
    fn default() -> Self {
        Self {
            orders_table: "Orders".into(),
            order_id: "order_id".into(),
            order_date: "order_date".into(),
            lines_table: "OrderDetails".into(),
            line_order_id: "order_id".into(),
            line_product_code: "product_code".into(),
            line_quantity: "quantity".into(),
            products_table: "Products".into(),
            product_code: "product_code".into(),
            product_name: "product_name".into(),
        }
    }
}

impl SalesSchema {
    /// Polish-named schema (`Zamowienia`, `ZamowieniaSzczegoly`, `Produkty`).
    pub fn polish() -> Self {
        Self {
            orders_table: "Zamowienia".into(),
            order_id: "id_zamowienia".into(),
            order_date: "data_zamowienia".into(),
            lines_table: "ZamowieniaSzczegoly".into(),
            line_order_id: "id_zamowienia".into(),
            line_product_code: "kod_produktu".into(),
            line_quantity: "ilosc".into(),
            products_table: "Produkty".into(),
            product_code: "kod_produktu".into(),
            product_name: "nazwa_produktu".into(),
        }
    }

    fn identifiers(&self) -> [(&'static str, &str); 10] {
        [
            ("orders_table", &self.orders_table),
            ("order_id", &self.order_id),
            ("order_date", &self.order_date),
            ("lines_table", &self.lines_table),
            ("line_order_id", &self.line_order_id),
            ("line_product_code", &self.line_product_code),
            ("line_quantity", &self.line_quantity),
            ("products_table", &self.products_table),
            ("product_code", &self.product_code),
            ("product_name", &self.product_name),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Pl,
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Locale::En => "en",
            Locale::Pl => "pl",
        })
    }
}

impl std::str::FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "pl" => Ok(Locale::Pl),
            other => Err(format!("unknown locale '{other}' (expected en or pl)")),
        }
    }
}

// ============================================================================
// Settings
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub locale: Locale,
    /// One of off, error, warn, info, debug, trace. Unset means warn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    /// Directory holding the export files named in `[tables]`.
    pub data_dir: PathBuf,
    pub database: DatabaseSettings,
    /// Table name to export file, processed in document order.
    #[serde(with = "table_map")]
    pub tables: Vec<TableSource>,
    pub classification: ClassificationSettings,
    pub sales: SalesSchema,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            locale: Locale::default(),
            log_level: None,
            data_dir: PathBuf::from("data"),
            database: DatabaseSettings::default(),
            tables: default_tables(),
            classification: ClassificationSettings::default(),
            sales: SalesSchema::default(),
        }
    }
}

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

impl Settings {
    /// Per-user config file: `<config_dir>/stocktally/config.toml`.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
            .join("config.toml")
    }

    /// Locate the config file: explicit path, then `./stocktally.toml`, then
    /// the per-user file. `None` means run on defaults.
    pub fn locate(explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        [PathBuf::from(LOCAL_FILE), Self::config_path()]
            .into_iter()
            .find(|p| p.is_file())
    }

    /// Load and validate settings. An explicit path must exist; the fallback
    /// locations are optional. Relative paths inside a file resolve against
    /// the file's directory.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let Some(path) = Self::locate(explicit) else {
            log::debug!("no config file found, using defaults");
            let settings = Self::default();
            settings.validate()?;
            return Ok((settings, None));
        };

        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let mut settings = Self::from_toml(&text).map_err(|e| match e {
            ConfigError::Parse { message, .. } => ConfigError::Parse {
                path: path.clone(),
                message,
            },
            other => other,
        })?;
        if let Some(base) = path.parent() {
            settings.resolve_relative_to(base);
        }
        log::debug!("loaded config from {}", path.display());
        Ok((settings, Some(path)))
    }

    /// Parse and validate TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: PathBuf::from("<inline>"),
            message: e.message().to_string(),
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.classification;
        if !(c.a_max > 0.0 && c.a_max < c.b_max && c.b_max <= 100.0) {
            return Err(ConfigError::Invalid(format!(
                "classification thresholds must satisfy 0 < a_max < b_max <= 100 (got a_max={}, b_max={})",
                c.a_max, c.b_max
            )));
        }
        if c.decimals > 10 {
            return Err(ConfigError::Invalid(format!(
                "classification.decimals must be at most 10 (got {})",
                c.decimals
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for source in &self.tables {
            if source.table.trim().is_empty() {
                return Err(ConfigError::Invalid("table names must not be empty".into()));
            }
            if source.file.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "table '{}' has an empty file name",
                    source.table
                )));
            }
            if !seen.insert(source.table.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "table '{}' is listed twice",
                    source.table
                )));
            }
        }

        if let Some((field, _)) = self.sales.identifiers().iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("sales.{field} must not be empty")));
        }

        if let Some(level) = &self.log_level {
            if !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "log_level '{level}' is not one of {}",
                    LOG_LEVELS.join(", ")
                )));
            }
        }
        Ok(())
    }

    pub fn resolve_relative_to(&mut self, base: &Path) {
        if base.as_os_str().is_empty() {
            return;
        }
        if self.data_dir.is_relative() {
            self.data_dir = base.join(&self.data_dir);
        }
        if self.database.path.is_relative() {
            self.database.path = base.join(&self.database.path);
        }
    }

    /// Names of the managed tables, in batch order.
    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.table.as_str()).collect()
    }

    pub fn source_for(&self, table: &str) -> Option<&TableSource> {
        self.tables.iter().find(|t| t.table == table)
    }
}

/// `[tables]` as an ordered `table = "file"` map.
mod table_map {
    use std::fmt;
    use std::path::PathBuf;

    use serde::de::{MapAccess, Visitor};
    use serde::ser::SerializeMap;
    use serde::{Deserializer, Serializer};

    use super::TableSource;

    pub fn serialize<S: Serializer>(tables: &[TableSource], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(tables.len()))?;
        for t in tables {
            map.serialize_entry(&t.table, &t.file)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<TableSource>, D::Error> {
        struct Ordered;

        impl<'de> Visitor<'de> for Ordered {
            type Value = Vec<TableSource>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of table name to file name")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut out = Vec::new();
                while let Some((table, file)) = map.next_entry::<String, PathBuf>()? {
                    out.push(TableSource { table, file });
                }
                Ok(out)
            }
        }

        deserializer.deserialize_map(Ordered)
    }
}

use crate::domain::model::{DestinationRow, TableRef};
use crate::domain::ports::{Warehouse, WarehouseSession};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, Config, NoTls};

/// 每個 INSERT 敘述的最大列數 (Postgres 單一敘述參數上限 65535)
const ROWS_PER_STATEMENT: usize = 1000;

#[derive(Debug, Clone)]
pub struct PostgresSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    /// 連線的 application_name，方便在倉儲端辨識
    pub warehouse: String,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PostgresWarehouse {
    settings: PostgresSettings,
}

impl PostgresWarehouse {
    pub fn new(settings: PostgresSettings) -> Self {
        Self { settings }
    }

    fn config(&self) -> Config {
        let mut config = Config::new();
        config
            .host(&self.settings.host)
            .port(self.settings.port)
            .user(&self.settings.user)
            .password(&self.settings.password)
            .dbname(&self.settings.database)
            .application_name(&self.settings.warehouse)
            .connect_timeout(self.settings.connect_timeout);
        config
    }
}

fn describe(e: &tokio_postgres::Error) -> String {
    match e.as_db_error() {
        Some(db) => format!("{} ({})", db.message(), db.code().code()),
        None => e.to_string(),
    }
}

#[async_trait]
impl Warehouse for PostgresWarehouse {
    type Session = PostgresSession;

    async fn connect(&self) -> Result<PostgresSession> {
        tracing::debug!(
            "Connecting to {}:{} database {}",
            self.settings.host,
            self.settings.port,
            self.settings.database
        );

        let (client, connection) = self.config().connect(NoTls).await.map_err(|e| {
            EtlError::LoadConnectionError {
                message: describe(&e),
            }
        })?;

        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!("Warehouse connection error: {}", e);
            }
        });

        tracing::info!("Successfully connected to warehouse.");
        Ok(PostgresSession {
            client: Some(client),
            driver: Some(driver),
        })
    }
}

pub struct PostgresSession {
    client: Option<Client>,
    driver: Option<JoinHandle<()>>,
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `INSERT INTO "SCHEMA"."TABLE" ("COL", ...) VALUES ($1, ...), (...)`
///
/// 資料庫由連線的 dbname 決定，敘述中不帶資料庫名稱
fn insert_statement(table: &TableRef, columns: &[String], row_count: usize) -> String {
    let target = [&table.schema, &table.table]
        .iter()
        .map(|part| quote_identifier(part))
        .collect::<Vec<_>>()
        .join(".");
    let column_list = columns
        .iter()
        .map(|c| quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");

    let width = columns.len();
    let values = (0..row_count)
        .map(|row| {
            let placeholders = (1..=width)
                .map(|col| format!("${}", row * width + col))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({})", placeholders)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!("INSERT INTO {} ({}) VALUES {}", target, column_list, values)
}

fn row_params(rows: &[DestinationRow]) -> Vec<Box<dyn ToSql + Sync + Send>> {
    let mut params: Vec<Box<dyn ToSql + Sync + Send>> = Vec::with_capacity(rows.len() * 5);
    for row in rows {
        params.push(Box::new(row.city.clone()));
        params.push(Box::new(row.temperature_c));
        params.push(Box::new(row.humidity_percent));
        params.push(Box::new(row.description.clone()));
        params.push(Box::new(row.timestamp_utc));
    }
    params
}

#[async_trait]
impl WarehouseSession for PostgresSession {
    async fn append_rows(
        &mut self,
        table: &TableRef,
        columns: &[String],
        rows: &[DestinationRow],
    ) -> Result<u64> {
        let write_error = |message: String| EtlError::LoadWriteError {
            table: table.qualified_name(),
            message,
        };

        let client = self
            .client
            .as_mut()
            .ok_or_else(|| write_error("session already closed".to_string()))?;

        // 所有分段在同一個交易內，失敗時整批回滾
        let transaction = client
            .transaction()
            .await
            .map_err(|e| write_error(describe(&e)))?;

        let mut written = 0u64;
        for chunk in rows.chunks(ROWS_PER_STATEMENT) {
            let statement = insert_statement(table, columns, chunk.len());
            let params = row_params(chunk);
            let refs: Vec<&(dyn ToSql + Sync)> = params
                .iter()
                .map(|p| p.as_ref() as &(dyn ToSql + Sync))
                .collect();

            written += transaction
                .execute(statement.as_str(), &refs)
                .await
                .map_err(|e| write_error(describe(&e)))?;
        }

        transaction
            .commit()
            .await
            .map_err(|e| write_error(describe(&e)))?;

        Ok(written)
    }

    async fn close(&mut self) -> Result<()> {
        // 丟棄 client 後連線驅動會自行結束
        drop(self.client.take());
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                tracing::warn!("Warehouse connection task ended abnormally: {}", e);
            }
        }
        tracing::info!("Warehouse connection closed.");
        Ok(())
    }
}

impl Drop for PostgresSession {
    fn drop(&mut self) {
        drop(self.client.take());
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TomlConfig;

    const LOWERCASE_CONFIG: &str = r#"
[pipeline]
name = "weather_etl_pipeline"

[source]
api_key = "abc123"

[extract]
cities = ["Chennai"]

[load]
account = "127.0.0.1"
user = "etl"
password = "secret"
warehouse = "COMPUTE_WH"
database = "weather_db"
schema = "pipeline"
table = "daily_weather"
"#;

    #[test]
    fn test_insert_statement_numbers_placeholders_per_row() {
        let table = TableRef::new("weather_db", "pipeline", "daily_weather");
        let columns = vec!["CITY".to_string(), "TEMPERATURE_C".to_string()];

        let sql = insert_statement(&table, &columns, 2);

        assert_eq!(
            sql,
            concat!(
                "INSERT INTO \"PIPELINE\".\"DAILY_WEATHER\" (\"CITY\", \"TEMPERATURE_C\") ",
                "VALUES ($1, $2), ($3, $4)"
            )
        );
    }

    #[test]
    fn test_insert_targets_the_connected_database() {
        let config = TomlConfig::from_toml_str(LOWERCASE_CONFIG).unwrap();
        let settings = config.postgres_settings();
        let table = config.table_ref();

        let sql = insert_statement(&table, &["CITY".to_string()], 1);

        assert_eq!(settings.database, "weather_db");
        assert!(sql.starts_with("INSERT INTO \"PIPELINE\".\"DAILY_WEATHER\" "));
        assert!(!sql.contains("WEATHER_DB"));
        assert!(!sql.contains(&settings.database));
    }

    #[test]
    fn test_quote_identifier_escapes_quotes() {
        assert_eq!(quote_identifier("A\"B"), "\"A\"\"B\"");
    }

    #[tokio::test]
    async fn test_unreachable_warehouse_is_connection_error() {
        let warehouse = PostgresWarehouse::new(PostgresSettings {
            host: "127.0.0.1".to_string(),
            port: 1,
            user: "etl".to_string(),
            password: "secret".to_string(),
            database: "weather_db".to_string(),
            warehouse: "COMPUTE_WH".to_string(),
            connect_timeout: Duration::from_secs(2),
        });

        let result = warehouse.connect().await;

        assert!(matches!(result, Err(EtlError::LoadConnectionError { .. })));
    }
}

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// 欄位型別錯誤時視為缺值，讓壞資料留到 transform 階段再丟棄
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

/// 一次成功抓取的原始回應 (OpenWeatherMap current weather 格式)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSourceRecord {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub main: Option<MainReadings>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub weather: Option<Vec<Condition>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MainReadings {
    /// Kelvin
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub temp: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub humidity: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RawSourceRecord {
    /// 回應本體必須是 JSON 物件，其餘內容交給欄位層級的寬鬆解析
    pub fn from_json(value: serde_json::Value) -> std::result::Result<Self, String> {
        if !value.is_object() {
            return Err("response body is not a JSON object".to_string());
        }
        serde_json::from_value(value).map_err(|e| e.to_string())
    }

    /// 記錄中的城市名稱，用於日誌
    pub fn city_label(&self) -> &str {
        self.name.as_deref().unwrap_or("Unknown City")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanRow {
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Temperature_C")]
    pub temperature_c: f64,
    #[serde(rename = "Humidity_Percent")]
    pub humidity_percent: Option<i32>,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Timestamp_UTC")]
    pub timestamp_utc: DateTime<Utc>,
}

impl CleanRow {
    /// 序列化欄位名稱，順序與目的表欄位一致
    pub const FIELD_NAMES: [&'static str; 5] = [
        "City",
        "Temperature_C",
        "Humidity_Percent",
        "Description",
        "Timestamp_UTC",
    ];

    pub fn to_destination_row(&self) -> DestinationRow {
        DestinationRow {
            city: self.city.clone(),
            temperature_c: self.temperature_c,
            humidity_percent: self.humidity_percent,
            description: self.description.clone(),
            timestamp_utc: self.timestamp_utc.naive_utc(),
        }
    }
}

/// 目的表欄位名稱：CleanRow 欄位名轉大寫
pub fn destination_columns() -> Vec<String> {
    CleanRow::FIELD_NAMES
        .iter()
        .map(|name| name.to_uppercase())
        .collect()
}

/// 單次 transform 的結果，所有列共用同一個時間戳
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub stamped_at: DateTime<Utc>,
    pub rows: Vec<CleanRow>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// 依目的表欄位順序排列的一列資料；TIMESTAMP_UTC 為不帶時區的 UTC 時間
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationRow {
    pub city: String,
    pub temperature_c: f64,
    pub humidity_percent: Option<i32>,
    pub description: String,
    pub timestamp_utc: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub database: String,
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(database: &str, schema: &str, table: &str) -> Self {
        Self {
            database: database.to_uppercase(),
            schema: schema.to_uppercase(),
            table: table.to_uppercase(),
        }
    }

    pub fn qualified_name(&self) -> String {
        format!("{}.{}.{}", self.database, self.schema, self.table)
    }
}

impl std::fmt::Display for TableRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub table: String,
    pub rows_written: u64,
}

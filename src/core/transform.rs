use crate::domain::model::{Batch, CleanRow, RawSourceRecord};
use crate::utils::error::{EtlError, RecordValidationError, Result};
use chrono::{DateTime, SubsecRound, Utc};

const KELVIN_OFFSET: f64 = 273.15;

/// Kelvin 轉攝氏，四捨五入到小數點後兩位 (0.5 遠離零)
pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    ((kelvin - KELVIN_OFFSET) * 100.0).round() / 100.0
}

/// 驗證單筆記錄並轉成 CleanRow
pub fn classify_record(
    record: &RawSourceRecord,
    stamped_at: DateTime<Utc>,
) -> std::result::Result<CleanRow, RecordValidationError> {
    let city_label = record.city_label().to_string();

    let kelvin = record
        .main
        .as_ref()
        .and_then(|main| main.temp)
        .ok_or_else(|| RecordValidationError::MissingTemperature {
            city: city_label.clone(),
        })?;

    let first_condition = record
        .weather
        .as_deref()
        .and_then(|conditions| conditions.first())
        .ok_or(RecordValidationError::MissingConditions { city: city_label })?;

    let humidity_percent = record
        .main
        .as_ref()
        .and_then(|main| main.humidity)
        .and_then(|humidity| i32::try_from(humidity).ok());

    Ok(CleanRow {
        city: record.name.clone().unwrap_or_else(|| "Unknown".to_string()),
        temperature_c: kelvin_to_celsius(kelvin),
        humidity_percent,
        description: first_condition
            .description
            .clone()
            .unwrap_or_else(|| "N/A".to_string()),
        timestamp_utc: stamped_at,
    })
}

/// 逐筆分類，丟棄無效記錄；全部無效時回傳 `EmptyBatch`
pub fn transform_records(records: &[RawSourceRecord], stamped_at: DateTime<Utc>) -> Result<Batch> {
    // 倉儲時間精度為微秒
    let stamped_at = stamped_at.trunc_subsecs(6);

    let rows: Vec<CleanRow> = records
        .iter()
        .map(|record| classify_record(record, stamped_at))
        .filter_map(|outcome| match outcome {
            Ok(row) => Some(row),
            Err(e) => {
                let err = EtlError::from(e);
                tracing::warn!(
                    category = ?err.category(),
                    severity = ?err.severity(),
                    "⚠️ Skipping record: {}",
                    err
                );
                None
            }
        })
        .collect();

    let dropped = records.len() - rows.len();
    if rows.is_empty() {
        return Err(EtlError::EmptyBatch { dropped });
    }

    tracing::info!(
        "🧹 Transformed {} record(s) into rows, dropped {}",
        rows.len(),
        dropped
    );

    Ok(Batch { stamped_at, rows })
}

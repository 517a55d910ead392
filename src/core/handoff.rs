//! Wire format for running the stages as separate processes.
//!
//! Raw file: a JSON array of API responses.
//! Batch file: `{"format_version": 1, "columns": [...], "stamped_at": "<RFC 3339>", "rows": [...]}`
//! where every row uses the `CleanRow` field names and RFC 3339 UTC timestamps.

use crate::domain::model::{
    destination_columns, Batch, CleanRow, DestinationRow, RawSourceRecord,
};
use crate::domain::ports::Storage;
use crate::utils::error::{EtlError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const BATCH_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct BatchEnvelope {
    format_version: u32,
    columns: Vec<String>,
    stamped_at: DateTime<Utc>,
    rows: Vec<CleanRow>,
}

pub fn encode_raw(records: &[RawSourceRecord]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(records)?)
}

pub fn decode_raw(data: &[u8]) -> Result<Vec<RawSourceRecord>> {
    let values: Vec<serde_json::Value> = serde_json::from_slice(data)?;
    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            RawSourceRecord::from_json(value).map_err(|reason| EtlError::HandoffFormatError {
                message: format!("raw record {}: {}", index, reason),
            })
        })
        .collect()
}

pub fn encode_batch(batch: &Batch) -> Result<Vec<u8>> {
    let envelope = BatchEnvelope {
        format_version: BATCH_FORMAT_VERSION,
        columns: CleanRow::FIELD_NAMES.iter().map(|c| c.to_string()).collect(),
        stamped_at: batch.stamped_at,
        rows: batch.rows.clone(),
    };
    Ok(serde_json::to_vec_pretty(&envelope)?)
}

/// 解析批次檔並檢查版本與欄位；時間欄位必須是 RFC 3339
pub fn decode_batch(data: &[u8]) -> Result<Batch> {
    let envelope: BatchEnvelope = serde_json::from_slice(data)?;

    if envelope.format_version != BATCH_FORMAT_VERSION {
        return Err(EtlError::HandoffFormatError {
            message: format!(
                "unsupported batch format version {} (expected {})",
                envelope.format_version, BATCH_FORMAT_VERSION
            ),
        });
    }
    if envelope.columns != CleanRow::FIELD_NAMES {
        return Err(EtlError::HandoffFormatError {
            message: format!("unexpected columns {:?}", envelope.columns),
        });
    }

    Ok(Batch {
        stamped_at: envelope.stamped_at,
        rows: envelope.rows,
    })
}

/// 以目的表欄位輸出 CSV (dry run 用)
pub fn write_rows_csv<W: std::io::Write>(rows: &[DestinationRow], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(destination_columns())?;
    for row in rows {
        csv_writer.write_record([
            row.city.clone(),
            format!("{:.2}", row.temperature_c),
            row.humidity_percent.map(|h| h.to_string()).unwrap_or_default(),
            row.description.clone(),
            row.timestamp_utc.format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

pub async fn write_raw<S: Storage>(
    storage: &S,
    path: &str,
    records: &[RawSourceRecord],
) -> Result<()> {
    storage.write_file(path, &encode_raw(records)?).await?;
    tracing::info!("💾 Wrote {} raw record(s) to {}", records.len(), path);
    Ok(())
}

pub async fn read_raw<S: Storage>(storage: &S, path: &str) -> Result<Vec<RawSourceRecord>> {
    let data = storage.read_file(path).await?;
    decode_raw(&data)
}

pub async fn write_batch<S: Storage>(storage: &S, path: &str, batch: &Batch) -> Result<()> {
    storage.write_file(path, &encode_batch(batch)?).await?;
    tracing::info!("💾 Wrote batch of {} row(s) to {}", batch.len(), path);
    Ok(())
}

pub async fn read_batch<S: Storage>(storage: &S, path: &str) -> Result<Batch> {
    let data = storage.read_file(path).await?;
    decode_batch(&data)
}

use crate::domain::model::{destination_columns, Batch, DestinationRow, LoadReport, TableRef};
use crate::domain::ports::{Warehouse, WarehouseSession};
use crate::utils::error::Result;
use futures::future::BoxFuture;

/// 開一條連線執行 `work`，不論成功或失敗都會關閉連線。
///
/// `work` 的錯誤優先回傳；只有在 `work` 成功而關閉失敗時才回傳關閉錯誤。
/// 若整個 future 在中途被取消，連線由 session 的 `Drop` 釋放。
pub async fn with_session<W, T, F>(warehouse: &W, work: F) -> Result<T>
where
    W: Warehouse,
    T: Send,
    F: for<'s> FnOnce(&'s mut W::Session) -> BoxFuture<'s, Result<T>> + Send,
{
    let mut session = warehouse.connect().await?;
    tracing::debug!("🔌 Warehouse session opened");

    let outcome = work(&mut session).await;
    let closed = session.close().await;
    tracing::debug!("🔌 Warehouse session closed");

    match (outcome, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(close_err)) => {
            tracing::warn!("Failed to close warehouse session after error: {}", close_err);
            Err(e)
        }
    }
}

/// 以附加方式寫入目的表；空批次直接返回，不開連線
pub async fn load_batch<W: Warehouse>(
    warehouse: &W,
    table: &TableRef,
    batch: &Batch,
) -> Result<LoadReport> {
    if batch.is_empty() {
        tracing::info!("Received empty batch, nothing to load.");
        return Ok(LoadReport {
            table: table.qualified_name(),
            rows_written: 0,
        });
    }

    let columns = destination_columns();
    let rows: Vec<DestinationRow> = batch.rows.iter().map(|row| row.to_destination_row()).collect();
    let target = table.clone();

    tracing::info!(
        "📤 Appending {} row(s) to {} ({})",
        rows.len(),
        table,
        columns.join(", ")
    );

    let rows_written = with_session(warehouse, move |session| {
        Box::pin(async move { session.append_rows(&target, &columns, &rows).await })
    })
    .await?;

    tracing::info!("✅ Loaded {} row(s) into {}", rows_written, table);

    Ok(LoadReport {
        table: table.qualified_name(),
        rows_written,
    })
}

use crate::domain::model::{Batch, DestinationRow, LoadReport, RawSourceRecord, TableRef};
use crate::utils::error::Result;
use async_trait::async_trait;

/// 階段交接檔案的讀寫
pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 遠端天氣 API：每個來源一次有時限的請求
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// 失敗時回傳 `EtlError::SourceFetchError`
    async fn fetch(&self, city: &str) -> Result<RawSourceRecord>;
}

/// 分析倉儲；每次 `connect` 開一條連線
#[async_trait]
pub trait Warehouse: Send + Sync {
    type Session: WarehouseSession;

    async fn connect(&self) -> Result<Self::Session>;
}

/// 一條倉儲連線。實作必須在 `Drop` 時釋放資源，`close` 可重複呼叫。
#[async_trait]
pub trait WarehouseSession: Send {
    /// 以單一原子操作附加所有列，回傳寫入列數
    async fn append_rows(
        &mut self,
        table: &TableRef,
        columns: &[String],
        rows: &[DestinationRow],
    ) -> Result<u64>;

    async fn close(&mut self) -> Result<()>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<RawSourceRecord>>;
    async fn transform(&self, data: Vec<RawSourceRecord>) -> Result<Batch>;
    async fn load(&self, batch: Batch) -> Result<LoadReport>;
}

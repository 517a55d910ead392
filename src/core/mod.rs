pub mod etl;
pub mod handoff;
pub mod load;
pub mod pipeline;
pub mod transform;

pub use crate::domain::model::{Batch, CleanRow, LoadReport, RawSourceRecord, TableRef};
pub use crate::domain::ports::{Pipeline, Storage, Warehouse, WarehouseSession, WeatherSource};
pub use crate::utils::error::Result;

// Adapters layer: concrete implementations for external systems (weather API, warehouse, files).

pub mod http;
pub mod storage;

pub mod warehouse {
    pub mod memory;
    pub mod postgres;
}

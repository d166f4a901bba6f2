// Adapters layer: concrete implementations for external systems (storage, http, workbook).

pub mod ollama;
pub mod storage;
pub mod workbook;

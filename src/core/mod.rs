pub mod engine;
pub mod naming;
pub mod pipeline;
pub mod prompt;
pub mod range;
pub mod response;
pub mod sampling;

pub use crate::domain::model::{
    AnalysisOutcome, AnalysisResult, CellValue, ColumnKind, ColumnProfile, Grid, Sample,
};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage, Workbook};
pub use crate::utils::error::Result;

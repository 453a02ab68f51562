// Source loading and report rendering

pub mod error;
pub mod load;
pub mod report;

pub use error::IoError;
pub use load::{load_sources, load_table};
pub use report::{report_columns, write_csv, write_json, write_xlsx, ReportColumn, ReportFormat, ReportOptions};

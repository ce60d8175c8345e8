//! External-facing response models

pub mod report;

pub use report::ReportView;

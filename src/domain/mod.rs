pub mod lab;

pub use lab::{LabQuery, LabResult, LabValue, QueryMode};

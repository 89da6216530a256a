pub mod health;
pub mod sas;

pub use health::health_check;
pub use sas::{certificate_sas, report_sas};

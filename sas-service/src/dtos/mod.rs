pub mod response;
pub mod sas;

pub use response::ApiResponse;
pub use sas::SasLinkParams;

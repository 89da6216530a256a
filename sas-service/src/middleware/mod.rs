pub mod logging;

pub use logging::{request_id_middleware, response_log_middleware, REQUEST_ID_HEADER};

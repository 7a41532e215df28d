pub mod error;
pub mod fs;
pub mod http;
pub mod telemetry;

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod rpm;

/// User agent sent with every outbound upstream request.
pub const USER_AGENT: &str = concat!("errata/", env!("CARGO_PKG_VERSION"));

/// Timeout applied to every outbound upstream request.
pub const HTTP_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

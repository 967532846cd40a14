//! Common utilities shared across database drivers.
//!
//! - [`tls`]: TLS configuration derived from the `ssl_mode` setting

pub mod tls;

pub use tls::{SslMode, TlsBuilder};

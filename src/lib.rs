#![deny(
    clippy::explicit_iter_loop,
    clippy::manual_let_else,
    clippy::semicolon_if_nothing_returned,
    clippy::inconsistent_struct_constructor
)]
#![allow(
    clippy::cast_possible_truncation, // Nanosecond timestamps and sizes stay within range
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,      // Metrics averages
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,  // e.g. SenderError in sender module
    clippy::must_use_candidate
)]

pub mod app;
pub mod config;
pub mod domain;
pub mod gateway;
pub mod listener;
pub mod sender;

pub use config::{Config, ConfigError, SenderConfig, UdpConfig};
pub use domain::{ConsistencyLevel, FieldValue, Point, Precision};
pub use gateway::{CloseReport, Gateway, GatewayError, GatewayState, ShutdownPolicy};
pub use sender::{PointsWriter, Sender, SenderError, WriteRequest};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! Sync layer: delivery of finished result sets to external channels.

pub mod http;

pub use http::{Channel, PushError, ResultPusher};

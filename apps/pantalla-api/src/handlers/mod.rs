//! Handlers 模块

pub mod feeds;
pub mod health;
pub mod metrics;

pub use feeds::*;
pub use health::*;
pub use metrics::*;

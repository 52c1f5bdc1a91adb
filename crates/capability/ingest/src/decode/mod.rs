//! 上游消息解码器。

pub mod ais;
pub mod lightning;

pub use ais::{AisDecoder, subscription_payload};
pub use lightning::LightningDecoder;

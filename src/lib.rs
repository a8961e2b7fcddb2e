pub mod config;
pub mod error;
pub mod follow;
pub mod output;

pub mod kafka;

pub use crate::config::{EngineConfig, Settings};
pub use error::{Error, Result};
pub use kafka::{create_consumer, create_producer, Consumer, Producer};

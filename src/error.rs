//! Error types and result handling for kafka-batch.
//!
//! Only setup-time failures are errors here. Conditions that happen while a
//! batch is running (timeouts, end of partition, a rejected submission) are
//! folded into the batch results instead; see [`crate::kafka::consumer`] and
//! [`crate::kafka::producer`].
//!
//! # Example
//!
//! ```rust
//! use kafka_batch::{EngineConfig, Error};
//!
//! let names = ["bootstrap.servers", "group.id"];
//! let values = ["localhost:9092"];
//!
//! match EngineConfig::build(&names, &values) {
//!     Err(Error::ConfigMismatch { names, values }) => {
//!         eprintln!("{} names but {} values", names, values)
//!     }
//!     other => panic!("unexpected: {:?}", other.map(|c| c.len())),
//! }
//! ```

use thiserror::Error;

/// The main error type for kafka-batch operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Option names and option values were not the same length.
    #[error("Configuration mismatch: {names} option names but {values} option values")]
    ConfigMismatch {
        /// Number of option names supplied
        names: usize,
        /// Number of option values supplied
        values: usize,
    },

    /// The transport engine refused an option name or value.
    #[error("Configuration rejected for '{name}': {reason}")]
    ConfigRejected {
        /// The offending option name
        name: String,
        /// The engine's explanation, verbatim
        reason: String,
    },

    /// The transport engine could not create a client session.
    ///
    /// `diagnostic` is the engine's own error text and is never reworded.
    #[error("Client creation failed with error: {diagnostic}")]
    ClientCreationFailed {
        /// Raw engine error text
        diagnostic: String,
    },

    /// Settings file could not be read or deserialized.
    #[error("Settings error: {0}")]
    Settings(#[from] ::config::ConfigError),

    /// A command-line argument could not be parsed.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON serialization error when printing records.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error, typically from stdin/stdout in the CLI.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking worker driving a handle panicked or was cancelled.
    #[error("Worker error: {0}")]
    Worker(#[from] tokio::task::JoinError),

    /// Graceful shutdown was requested (e.g., via Ctrl+C).
    ///
    /// This is not really an error but uses the error mechanism
    /// to cleanly exit the follow loop.
    #[error("Shutdown requested")]
    Shutdown,
}

/// A convenient Result type alias for kafka-batch operations.
pub type Result<T> = std::result::Result<T, Error>;

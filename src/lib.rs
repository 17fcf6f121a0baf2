// slabsim - Slab Allocator Simulation
// Per-size-class block pools with reuse-before-grow

#![warn(rust_2018_idioms)]

pub mod config;
pub mod pool;
pub mod session;

// Re-exports for convenience
pub use config::SimConfig;
pub use pool::{BlockHandle, DeallocOutcome, PoolManager, StatusReport};
pub use session::Session;

/// slabsim error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("I/O error: {0}")]
        Io(#[from] std::io::Error),

        #[error("Configuration error: {0}")]
        Config(String),

        #[error("Invalid argument: {0}")]
        InvalidArgument(String),

        #[error("Serialization error: {0}")]
        Serialization(String),
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

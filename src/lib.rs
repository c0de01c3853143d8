pub mod config;
pub mod error;
pub mod fetch;
pub mod output;
pub mod pipeline;
pub mod release;
pub mod server;
pub mod stats;
pub mod summary;

pub use error::{Error, Result};

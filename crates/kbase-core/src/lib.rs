pub mod config;
pub mod docstore;
pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};

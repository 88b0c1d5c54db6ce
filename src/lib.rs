pub mod data;
pub mod datasets;
pub mod error;
pub mod experiment;
pub mod fetch;

pub use error::{Error, Result};

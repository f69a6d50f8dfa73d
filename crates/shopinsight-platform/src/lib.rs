pub mod client;
pub mod error;
pub mod processing;
pub mod query;

pub use client::*;
pub use error::*;
pub use processing::*;
pub use query::*;

pub mod cache;
pub mod memory;
pub mod redis_cache;

pub use cache::*;
pub use memory::*;
pub use redis_cache::*;

//! Quote cache adapters.

mod in_memory;
mod redis_cache;

pub use in_memory::{CacheWrite, InMemoryQuoteCache};
pub use redis_cache::RedisQuoteCache;

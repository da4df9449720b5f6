pub mod cache;
pub mod densemap;
pub mod executor;
pub mod graph;
pub mod resolve;
pub mod smallmap;
pub mod stats;
mod thread_pool;
pub mod trace;
pub mod version;

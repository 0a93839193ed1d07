//! Asset loading and durable storage for the draw engine.

pub mod bootstrap;
pub mod load;
pub mod storage;

pub use bootstrap::*;
pub use load::*;
pub use storage::*;

pub mod dao;
pub mod memory;
pub mod models;

pub use dao::{EmbeddingStore, PgEmbeddingStore};
pub use memory::MemoryEmbeddingStore;
pub use models::{ImageRecord, NewImage};

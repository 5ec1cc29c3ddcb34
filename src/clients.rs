pub mod catalog;
pub mod chat_model;
pub mod encoder;

pub use catalog::{CatalogTrack, LastfmClient, MusicCatalog};
pub use chat_model::{ChatModel, ChatRequest, GroqChatClient};
pub use encoder::{ClipEncoderClient, VisionEncoder};

pub use super::anime_documents::Entity as AnimeDocuments;
pub use super::response_cache::Entity as ResponseCache;

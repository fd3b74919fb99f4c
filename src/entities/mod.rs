pub mod prelude;

pub mod anime_documents;
pub mod response_cache;

pub mod anime;
pub mod cache;

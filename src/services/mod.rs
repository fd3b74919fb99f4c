pub mod airing;
pub use airing::AiringService;

pub mod anime_service;
pub use anime_service::{AnimeError, AnimeService};

pub mod anime_service_impl;
pub use anime_service_impl::SeaOrmAnimeService;

pub mod cache;
pub use cache::{MemoryCache, StoreCache, TtlCache};

pub mod catalog;
pub use catalog::CatalogService;

pub mod direct_links;
pub use direct_links::{DirectLinkSource, LocalDirectLinks, WorkerDirectLinks};

pub mod reconcile;
pub use reconcile::{Reconciliation, ScrapedAnime, reconcile};

pub mod config;
pub mod error;
pub mod memory;
pub mod output;
pub mod posts;
pub mod provider;
pub mod registry;
pub mod repository;
pub mod rewrite;
pub mod sitemap;
pub mod taxonomies;
pub mod types;
pub mod xml;

pub use config::*;
pub use error::*;
pub use memory::{ContentFile, LiveRepository, MemoryRepository};
pub use output::*;
pub use posts::*;
pub use provider::*;
pub use registry::*;
pub use repository::*;
pub use rewrite::*;
pub use sitemap::*;
pub use taxonomies::*;
pub use types::*;

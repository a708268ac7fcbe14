pub mod api;

#[cfg(not(target_arch = "wasm32"))]
pub mod blocking;

pub use api::{ArchiveApi, RandomEntry, SearchHit, SearchResponse};
#[cfg(not(target_arch = "wasm32"))]
pub use blocking::BlockingArchiveApi;

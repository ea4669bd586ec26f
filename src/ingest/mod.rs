//! Catalog ingestion: genre resolution and the paginated sync pipeline.

pub mod genre_cache;
pub mod pipeline;

pub use genre_cache::GenreCache;
pub use pipeline::{
    DEFAULT_BATCH_SIZE, IngestError, IngestReport, Ingestor, PAGE_SIZE, PREMIERE_CUTOFF,
};

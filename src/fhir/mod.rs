pub mod fetcher;
pub mod normalizer;
pub mod path;

pub use fetcher::{FetchError, LabFetcher};
pub use normalizer::{entry_resource, normalize};

pub mod source;

pub use source::{ContentFetcher, CoverImage, FetchError, SourceClient};

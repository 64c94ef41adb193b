//! Input adapters: uploaded resume files and posting URLs become plain text
//! before anything reaches the pipeline.

pub mod document;
pub mod posting;

pub use document::{extractor_for, DocumentParseError};
pub use posting::{FetchError, HttpPostingFetcher, PostingFetcher};

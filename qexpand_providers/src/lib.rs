#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod client;
pub mod extraction;
pub mod grounding;
pub mod openai;
pub mod retry;

pub use extraction::HttpExtractionClient;
pub use grounding::{HttpDatastoreClient, HttpSearchClient};
pub use openai::OpenAiCompatProvider;
pub use retry::{RetryPolicy, retry_with_backoff};

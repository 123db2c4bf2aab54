#![forbid(unsafe_code)]

pub mod director;
mod error;
pub mod facet;
pub mod fetcher;
pub mod filter;
pub mod fixture;

pub use error::FetchError;
pub use fetcher::{Fetcher, collect};

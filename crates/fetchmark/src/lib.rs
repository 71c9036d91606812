//! Fetchmark - resilient web content fetching with Markdown conversion
//!
//! This crate fetches remote documents over HTTP(S) and converts HTML
//! payloads into structured Markdown. Resilience comes from a URL variation
//! list: each fetch call tries the original URL plus a set of alternate
//! forms (normalized, protocol-swapped, `www.`-toggled, DNS-discovered) in
//! order, each with its own retry budget and exponential backoff, until the
//! first success.
//!
//! ## Outcome contract
//!
//! Every fetch call resolves to exactly one [`FetchOutcome`] record:
//! [`FetchSuccess`] for the variation that worked, or [`FetchFailure`]
//! listing everything that was attempted. Raised [`FetchError`]s are
//! reserved for caller misuse (malformed URLs, domain policy violations)
//! detected before any network activity.
//!
//! ## Example
//!
//! ```no_run
//! use fetchmark::{fetch, FetchOutcome};
//!
//! # async fn run() -> Result<(), fetchmark::FetchError> {
//! match fetch("https://example.com").await? {
//!     FetchOutcome::Success(page) => println!("{}", page.content),
//!     FetchOutcome::Failure(failure) => eprintln!("{}", failure.message),
//! }
//! # Ok(())
//! # }
//! ```

mod agent;
mod client;
pub mod config;
mod convert;
mod dns;
mod error;
mod normalize;
mod types;
mod variations;

pub use agent::{select_user_agent, USER_AGENTS};
pub use client::{fetch, fetch_with_options, Fetcher, FetcherBuilder};
pub use convert::{convert_to_markdown, CodeBlockStyle, ConvertOptions, HeadingStyle};
pub use dns::{CnameAliasSource, HostAliasSource};
pub use error::FetchError;
pub use normalize::{normalize_url, validate_url, MAX_URL_LENGTH};
pub use types::{
    FetchFailure, FetchOptions, FetchOptionsPatch, FetchOutcome, FetchSuccess, RetryPolicy,
    RetryPolicyPatch,
};
pub use variations::{generate_url_variations, generate_url_variations_with_aliases};

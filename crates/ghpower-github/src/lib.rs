//! `ghpower-github`: fetches GitHub profiles and turns them into
//! [`GithubProfile`](ghpower_core::GithubProfile) snapshots.

pub mod client;
pub mod error;
pub mod fetcher;
pub mod snapshot;

pub use client::GithubClient;
pub use error::{FetchError, RateLimit};
pub use fetcher::ProfileFetcher;
pub use snapshot::{GithubRepo, GithubUser, ProfileSnapshot};

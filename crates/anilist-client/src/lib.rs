//! Client library for the AniList GraphQL API.
//!
//! This crate provides a rate-limited, retry-enabled client for anonymous
//! read access to AniList: batched completed-list fetches, planning-list
//! fetches, and a windowed pagination crawler over a media's completers.

pub mod client;
pub mod completers;
pub mod error;
pub mod query;
pub mod rate_limiter;
pub mod response;

pub use client::{AnilistApi, AnilistClient};
pub use completers::CompleterCrawler;
pub use error::ApiError;
pub use query::{QueryDocument, UserSelector};
pub use rate_limiter::RateLimiter;

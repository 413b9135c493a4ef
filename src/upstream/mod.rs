//! Upstream generation API access
//!
//! This module contains the client seam used by the failover coordinator
//! and its implementation for Google's generative-language API:
//! - `types`: the caller payload forwarded upstream
//! - `outcome`: classification of one upstream attempt
//! - `client`: the `UpstreamClient` trait
//! - `google`: the reqwest-based `generateContent` client

pub mod types;
pub mod outcome;
pub mod client;
pub mod google;

pub use types::GenerationRequest;
pub use outcome::Outcome;
pub use client::UpstreamClient;
pub use google::GoogleUpstream;

//! github-remote: the sync store as a branch of a GitHub repository.

pub mod client;
mod wire;

pub use client::{GitHubClient, encode_path};

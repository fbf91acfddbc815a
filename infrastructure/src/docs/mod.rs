//! Documentation fetcher adapter

mod github;

pub use github::GitHubReadmeFetcher;

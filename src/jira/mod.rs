//! Jira API access: wire types, domain types, and the (cached) client.

pub mod api_types;
pub mod cached_client;
pub mod client;
pub mod types;

pub use cached_client::CachedJiraClient;
pub use client::JiraClient;

//! Event-sourced content graph.
//!
//! Content lives in content streams: append-only event histories that fold
//! into a graph of node aggregates varying across a dimension space.
//! Workspaces point at content streams and move changes between each other
//! by rebasing, publishing and discarding.

pub mod config;
pub mod dimension;
pub mod domain;
pub mod event_store;
pub mod logging;
pub mod migration;
pub mod node_type;
pub mod repository;
pub mod workspace;

pub use config::RepositoryConfig;
pub use repository::ContentRepository;

#[cfg(test)]
mod testing;

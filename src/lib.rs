//! Unified listing of container runtime resources.
//!
//! Backends (Docker, Podman, OpenShift) are queried concurrently, their raw
//! records are mapped to displayable items and rendered as fixed-width rows.
//! The [`listing::Engine`] keeps the last snapshot so hosts can address rows
//! by position for inspection and removal.

pub mod backend;
pub mod config;
pub mod error;
pub mod humanize;
pub mod listing;
pub mod model;
pub mod query;
pub mod render;
pub mod store;

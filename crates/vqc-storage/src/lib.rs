//! S3 source-video download client.
//!
//! This crate provides:
//! - The `ObjectStore` seam the worker downloads through
//! - An S3 implementation (AWS or any S3-compatible endpoint)

pub mod client;
pub mod error;

pub use client::{ObjectStore, S3Store, StorageConfig};
pub use error::{StorageError, StorageResult};

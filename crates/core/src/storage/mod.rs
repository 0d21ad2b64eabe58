//! Blob storage for attachment content using Apache OpenDAL.
//!
//! This module provides vendor-agnostic object storage with support for:
//! - S3-compatible: Cloudflare R2, Supabase Storage, AWS S3, DigitalOcean Spaces
//! - Azure Blob Storage
//! - Local filesystem (development only)
//! - Process memory (tests)
//!
//! # Layout
//!
//! ```text
//! blobs/{blob_id}.bin   - raw bytes, streamed in chunks by a WriteHandle
//! blobs/{blob_id}.json  - BlobRecord, written by commit (the commit marker)
//! ```
//!
//! A blob without its `.json` record does not exist as far as readers are
//! concerned; stray `.bin` files are still listed for the orphan sweep.

mod config;
mod error;
mod service;
mod types;

pub use config::{StorageConfig, StorageProvider};
pub use error::StorageError;
pub use service::{StorageService, WriteHandle};
pub use types::{BlobRecord, ByteStream};

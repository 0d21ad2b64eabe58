//! Attachment storage core for ApplyTrack.
//!
//! This crate contains the attachment subsystem with ZERO web or database
//! dependencies. The entity registry it links attachments onto is a trait;
//! the PostgreSQL implementation lives in `applytrack-db`.
//!
//! # Modules
//!
//! - `storage` - Blob store over Apache OpenDAL
//! - `attachment` - Validation, upload, download and deletion pipelines

pub mod attachment;
pub mod storage;

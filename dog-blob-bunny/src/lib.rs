//! # dog-blob-bunny: Bunny Edge Storage service for DogRS
//!
//! `dog-blob-bunny` stores, retrieves and deletes binary objects in a Bunny storage zone
//! and hands out pull-zone URLs for them, behind a backend-agnostic [`StorageService`]
//! contract. Services are interchangeable: the same calls work against Bunny, an
//! in-memory store, or a mirror that fans writes out to several services.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dog_blob_bunny::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> BlobResult<()> {
//! let service = BunnyService::new(BunnyConfig::from_env()?)?;
//!
//! let options = UploadOptions::new()
//!     .with_content_type("application/pdf")
//!     .with_filename("report.pdf")
//!     .with_disposition(DispositionType::Attachment);
//! let body = bytes::Bytes::from_static(b"%PDF");
//! service.upload_bytes("reports/2024/report.pdf", body, options).await?;
//!
//! let data = service.download("reports/2024/report.pdf").await?;
//! let url = service.public_url("reports/2024/report.pdf");
//! # Ok(())
//! # }
//! ```
//!
//! ## Contract
//!
//! ```text
//! ┌──────────────────┐
//! │  Your Service    │  ← Business logic only
//! ├──────────────────┤
//! │  StorageService  │  ← Uniform errors, instrumentation, URLs
//! ├──────────────────┤
//! │  BlobStore       │  ← Backend I/O (Bunny HTTP API, memory)
//! └──────────────────┘
//! ```
//!
//! - `upload` failures always surface as [`BlobError::Integrity`]
//! - `download` failures always surface as [`BlobError::FileNotFound`]
//! - `delete` and `delete_prefixed` are best effort and never fail
//! - `exists` propagates backend errors
//! - Bunny has no signed URLs, so `private_url` equals `public_url`

pub mod adapter;
mod bunny_store;
mod config;
mod error;
pub mod instrument;
mod memory_store;
mod mirror;
pub mod registry;
mod service;
pub mod store;
mod types;
pub mod url;

// Re-export main types for clean API
pub use adapter::BunnyService;
pub use bunny_store::BunnyEdgeStore;
pub use config::{BunnyConfig, ServiceOptions, DEFAULT_STORAGE_HOST};
pub use error::{BlobError, BlobResult};
pub use instrument::{
    EventRecorder, InstrumentEvent, InstrumentPayload, Instrumentation, Operation,
    TracingInstrumentation,
};
pub use memory_store::{MemoryBlobStore, StoredObject};
pub use mirror::MirrorService;
pub use registry::{ServiceConfig, ServiceRegistry};
pub use service::StorageService;
pub use store::{BlobStore, PutOptions};
pub use types::{
    collect_stream, stream_from_bytes, ByteRange, ByteStream, DispositionType, UploadOptions,
    UrlOptions,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        BlobError, BlobResult, BunnyConfig, BunnyService, ByteStream, DispositionType,
        ServiceOptions, StorageService, UploadOptions, UrlOptions,
    };
}

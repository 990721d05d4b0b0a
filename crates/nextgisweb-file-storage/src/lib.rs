//! # nextgisweb-file-storage
//!
//! Durable file objects owned by components, and the temporary upload area
//! clients write to before attaching a file to a resource.
//!
//! - [`model`] - The [`FileObj`] record
//! - [`storage`] - [`FileStorage`], the durable store
//! - [`upload`] - [`FileUpload`], the temporary upload area
//! - [`api`] - The upload HTTP endpoint
//! - [`component`] - The `file_storage` and `file_upload` components

#![allow(clippy::result_large_err)]

pub mod api;
pub mod component;
pub mod model;
pub mod storage;
pub mod upload;

pub use component::{FileStorageComponent, FileUploadComponent};
pub use model::FileObj;
pub use storage::FileStorage;
pub use upload::{FileUpload, UploadMeta};

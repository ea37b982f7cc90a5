//! HTTP transport for the pymescore scoring pipeline.

pub mod rest;

pub use rest::{configure, RestApi, UploadLimit, DEFAULT_MAX_UPLOAD_BYTES};

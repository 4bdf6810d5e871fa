//! Conditional GET and byte-range serving for static resources
//!
//! Evaluates `If-*` request headers against a resource's validators, parses
//! `Range` headers, and writes 200, 206 (single or `multipart/byteranges`),
//! 304, 412 and 416 responses.

pub mod config;
pub mod error;
pub mod http;
pub mod logger;
pub mod resource;

pub use error::{Error, Result};
pub use http::{BufferedResponse, ConditionalGet, HeaderSet, ResponseHandler, Validators, Verdict};
pub use resource::{FileResource, MemoryResource, Metadata, Resource};

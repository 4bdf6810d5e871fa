//! HTTP protocol layer module
//!
//! Conditional request evaluation, byte range handling and response
//! orchestration, independent of any server loop.

pub mod cache;
pub mod conditional;
pub mod headers;
pub mod matcher;
pub mod mime;
pub mod multipart;
pub mod range;
pub mod response;

// Re-export commonly used types
pub use conditional::{ConditionalGet, Validators, Verdict};
pub use headers::{HeaderSet, RequestHeaders};
pub use matcher::{match_etag, modified_since, IntoTimestamp};
pub use multipart::{BoundaryGenerator, MultipartPlan, RandomBoundary};
pub use range::{parse_range_header, ByteRange, RangeParseResult};
pub use response::{BufferedResponse, ResponseHandler, ResponseWriter};

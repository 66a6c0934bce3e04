//! [`ObjectStore`](ferry_transfer::ObjectStore) for Amazon S3 and
//! S3-compatible services.
//!
//! - [`S3Store`] - bucket operations over the REST API with `reqwest`
//! - [`sign`] - SigV4 request signing and presigned URLs
//!
//! Addressing is virtual-hosted by default (`https://{bucket}.s3.{region}.amazonaws.com`);
//! set an endpoint and path style for services such as MinIO.

mod client;
mod error;
pub mod sign;
mod xml;

pub use client::{DEFAULT_REGION, MAX_PRESIGN_TTL, S3Config, S3Store};
pub use error::{Error, Result};
pub use sign::Credentials;

//! XML bodies of the S3 API, via `quick-xml` + `serde`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use ferry_transfer::{CompletedPart, RemoteObject};

use crate::error::{Error, Result};

fn from_xml<T: DeserializeOwned>(body: &str) -> Result<T> {
    quick_xml::de::from_str(body).map_err(|e| Error::Xml(e.to_string()))
}

fn to_xml<T: Serialize>(value: &T) -> Result<String> {
    let body = quick_xml::se::to_string(value).map_err(|e| Error::Xml(e.to_string()))?;
    Ok(format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{body}"))
}

// -----------------------------------------------------------------------
// Error
// -----------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ErrorDocument {
    #[serde(rename = "Code")]
    code:    String,
    #[serde(rename = "Message", default)]
    message: String,
}

/// Parse an error document into [`Error::Service`]. Bodies that are not an
/// error document keep the HTTP status as their code.
pub(crate) fn service_error(status: u16, body: &str) -> Error {
    match from_xml::<ErrorDocument>(body) {
        Ok(doc) => Error::Service {
            status,
            code: doc.code,
            message: doc.message,
        },
        Err(_) => Error::Service {
            status,
            code: format!("Http{status}"),
            message: body.chars().take(200).collect(),
        },
    }
}

/// `CompleteMultipartUpload` may answer 200 with an error document.
pub(crate) fn embedded_error(status: u16, body: &str) -> Option<Error> {
    if !body.contains("<Error>") {
        return None;
    }
    from_xml::<ErrorDocument>(body).ok().map(|doc| Error::Service {
        status,
        code: doc.code,
        message: doc.message,
    })
}

// -----------------------------------------------------------------------
// ListBucketResult (GET /?list-type=2)
// -----------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ListBucketResult {
    #[serde(rename = "Contents", default)]
    contents:                Vec<Contents>,
    #[serde(rename = "IsTruncated", default)]
    is_truncated:            bool,
    #[serde(rename = "NextContinuationToken")]
    next_continuation_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Contents {
    #[serde(rename = "Key")]
    key:  String,
    #[serde(rename = "Size")]
    size: u64,
}

/// Objects of one listing page and the token of the next, if truncated.
pub(crate) fn list_objects(body: &str) -> Result<(Vec<RemoteObject>, Option<String>)> {
    let result: ListBucketResult = from_xml(body)?;
    let objects = result
        .contents
        .into_iter()
        .map(|c| RemoteObject::new(c.key, c.size))
        .collect();
    let next = match (result.is_truncated, result.next_continuation_token) {
        (true, Some(token)) => Some(token),
        (true, None) => return Err(Error::MissingField("NextContinuationToken")),
        (false, _) => None,
    };
    Ok((objects, next))
}

// -----------------------------------------------------------------------
// InitiateMultipartUploadResult (POST /{key}?uploads)
// -----------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct InitiateMultipartUploadResult {
    #[serde(rename = "UploadId")]
    upload_id: String,
}

pub(crate) fn upload_id(body: &str) -> Result<String> {
    let result: InitiateMultipartUploadResult = from_xml(body)?;
    if result.upload_id.is_empty() {
        return Err(Error::MissingField("UploadId"));
    }
    Ok(result.upload_id)
}

// -----------------------------------------------------------------------
// CompleteMultipartUpload (POST /{key}?uploadId=)
// -----------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename = "CompleteMultipartUpload")]
struct CompleteMultipartUpload<'a> {
    #[serde(rename = "Part")]
    parts: Vec<PartEntry<'a>>,
}

#[derive(Serialize)]
struct PartEntry<'a> {
    #[serde(rename = "PartNumber")]
    number: u32,
    #[serde(rename = "ETag")]
    etag:   &'a str,
}

pub(crate) fn complete_multipart(parts: &[CompletedPart]) -> Result<String> {
    to_xml(&CompleteMultipartUpload {
        parts: parts
            .iter()
            .map(|p| PartEntry {
                number: p.number,
                etag:   &p.etag,
            })
            .collect(),
    })
}

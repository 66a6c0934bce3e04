use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::{TryStreamExt, stream};
use reqwest::{Body, Client, Method, Response, StatusCode, Url, header};
use tracing::debug;

use ferry_transfer::{ByteStream, CompletedPart, ListPage, MIB, ObjectStore, ProgressHook, PutOptions, observe};

use crate::error::{Error, Result};
use crate::sign::{Credentials, Signer, UNSIGNED_PAYLOAD, canonical_query, uri_encode};
use crate::xml;

pub const DEFAULT_REGION: &str = "ap-southeast-2";

/// Longest lifetime S3 accepts for a presigned URL.
pub const MAX_PRESIGN_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const STORAGE_CLASS_HEADER: &str = "x-amz-storage-class";

/// Connection settings for one bucket.
///
/// # Examples
///
/// ```
/// use ferry_s3::{Credentials, S3Config};
///
/// let config = S3Config::new("frames", Credentials::new("id", "secret"))
///     .endpoint("http://localhost:9000")
///     .path_style(true);
/// assert_eq!(config.region, "ap-southeast-2");
/// ```
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket:      String,
    pub region:      String,
    /// Base URL of an S3-compatible service. AWS when `None`.
    pub endpoint:    Option<String>,
    /// Put the bucket in the request path instead of the host name.
    pub path_style:  bool,
    pub credentials: Credentials,
}

impl S3Config {
    pub fn new(bucket: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            bucket: bucket.into(),
            region: DEFAULT_REGION.to_string(),
            endpoint: None,
            path_style: false,
            credentials,
        }
    }

    #[must_use]
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    #[must_use]
    pub fn path_style(mut self, path_style: bool) -> Self {
        self.path_style = path_style;
        self
    }
}

/// Where requests for the bucket go.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Address {
    scheme:      String,
    /// Host name, with the port when it is not the scheme's default.
    host:        String,
    /// Encoded `/{bucket}` for path-style addressing, empty otherwise.
    bucket_path: String,
}

impl Address {
    fn resolve(config: &S3Config) -> Result<Self> {
        let (scheme, host) = match &config.endpoint {
            Some(endpoint) => {
                let invalid = |reason: String| Error::InvalidEndpoint {
                    endpoint: endpoint.clone(),
                    reason,
                };
                let url = Url::parse(endpoint).map_err(|e| invalid(e.to_string()))?;
                let host = url.host_str().ok_or_else(|| invalid("no host".into()))?;
                let host = match url.port() {
                    Some(port) => format!("{host}:{port}"),
                    None => host.to_string(),
                };
                (url.scheme().to_string(), host)
            }
            None => ("https".to_string(), format!("s3.{}.amazonaws.com", config.region)),
        };

        Ok(if config.path_style {
            Self {
                scheme,
                host,
                bucket_path: format!("/{}", uri_encode(&config.bucket, true)),
            }
        } else {
            Self {
                scheme,
                host: format!("{}.{host}", config.bucket),
                bucket_path: String::new(),
            }
        })
    }

    fn key_path(&self, key: &str) -> String { format!("{}/{}", self.bucket_path, uri_encode(key, false)) }

    fn bucket_root(&self) -> String {
        if self.bucket_path.is_empty() {
            "/".to_string()
        } else {
            self.bucket_path.clone()
        }
    }

    fn url(&self, path: &str, query: &str) -> String {
        if query.is_empty() {
            format!("{}://{}{path}", self.scheme, self.host)
        } else {
            format!("{}://{}{path}?{query}", self.scheme, self.host)
        }
    }
}

/// First error yielded by an upload body, kept so a local read failure is
/// reported as itself rather than as the transport error it caused.
type BodyFailure = Arc<Mutex<Option<ferry_transfer::Error>>>;

fn streaming_body(body: ByteStream, progress: ProgressHook) -> (Body, BodyFailure) {
    let failure: BodyFailure = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&failure);
    let body = observe(body, progress).map_err(move |e| {
        let message = e.to_string();
        slot.lock().unwrap_or_else(PoisonError::into_inner).get_or_insert(e);
        std::io::Error::other(message)
    });
    (Body::wrap_stream(body), failure)
}

fn take_failure(failure: &BodyFailure) -> Option<ferry_transfer::Error> {
    failure.lock().unwrap_or_else(PoisonError::into_inner).take()
}

fn response_stream(response: Response, op: &'static str) -> ByteStream {
    Box::pin(
        response
            .bytes_stream()
            .map_err(move |e| ferry_transfer::Error::backend(op, e)),
    )
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(xml::service_error(status.as_u16(), &body))
}

/// An [`ObjectStore`] backed by one bucket of an S3-compatible service.
///
/// Requests are signed with SigV4 and stream their bodies unhashed
/// (`UNSIGNED-PAYLOAD`). Nothing is retried.
#[derive(Debug, Clone)]
pub struct S3Store {
    client:  Client,
    signer:  Signer,
    address: Address,
}

impl S3Store {
    pub fn new(config: S3Config) -> Result<Self> { Self::with_client(Client::new(), config) }

    pub fn with_client(client: Client, config: S3Config) -> Result<Self> {
        let address = Address::resolve(&config)?;
        Ok(Self {
            client,
            signer: Signer::new(config.credentials, config.region),
            address,
        })
    }

    /// Presign a GET of `key` as of `now`.
    pub fn presign_at(&self, key: &str, ttl: Duration, now: DateTime<Utc>) -> Result<String> {
        if ttl < Duration::from_secs(1) || ttl > MAX_PRESIGN_TTL {
            return Err(Error::InvalidTtl(ttl));
        }
        let path = self.address.key_path(key);
        let query = self
            .signer
            .presign("GET", &self.address.host, &path, ttl.as_secs(), now)?;
        Ok(self.address.url(&path, &query))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        mut headers: Vec<(String, String)>,
        body: Option<(Body, u64)>,
    ) -> Result<Response> {
        headers.push(("host".to_string(), self.address.host.clone()));
        let signed = self
            .signer
            .sign_headers(method.as_str(), path, query, headers, UNSIGNED_PAYLOAD, Utc::now())?;

        let url = self.address.url(path, &canonical_query(query));
        let mut request = self.client.request(method, url);
        for (name, value) in signed.iter().filter(|(name, _)| name != "host") {
            request = request.header(name, value);
        }
        if let Some((body, len)) = body {
            request = request.header(header::CONTENT_LENGTH, len).body(body);
        }

        check(request.send().await?).await
    }

    fn upload_query(upload_id: &str) -> Vec<(String, String)> { vec![("uploadId".to_string(), upload_id.to_string())] }
}

impl ObjectStore for S3Store {
    const MIN_PART_SIZE: u64 = 5 * MIB;
    const MAX_PARTS: u32 = 10_000;

    async fn put(
        &self,
        key: &str,
        body: ByteStream,
        size_hint: u64,
        options: &PutOptions,
        progress: ProgressHook,
    ) -> ferry_transfer::Result<()> {
        let (body, failure) = streaming_body(body, progress);
        let headers = vec![(STORAGE_CLASS_HEADER.to_string(), options.storage_class.clone())];
        let path = self.address.key_path(key);

        match self.send(Method::PUT, &path, &[], headers, Some((body, size_hint))).await {
            Ok(_) => {
                debug!(key, size = size_hint, "put object");
                Ok(())
            }
            Err(e) => Err(take_failure(&failure).unwrap_or_else(|| e.into_transfer("put"))),
        }
    }

    async fn get(&self, key: &str, progress: ProgressHook) -> ferry_transfer::Result<ByteStream> {
        let path = self.address.key_path(key);
        let response = self
            .send(Method::GET, &path, &[], Vec::new(), None)
            .await
            .map_err(|e| e.into_transfer("get"))?;
        Ok(observe(response_stream(response, "get"), progress))
    }

    async fn get_range(
        &self,
        key: &str,
        offset: u64,
        len: u64,
        progress: ProgressHook,
    ) -> ferry_transfer::Result<ByteStream> {
        if len == 0 {
            let empty: ByteStream = Box::pin(stream::empty());
            return Ok(empty);
        }
        let path = self.address.key_path(key);
        let range = format!("bytes={offset}-{}", offset + len - 1);
        let response = self
            .send(Method::GET, &path, &[], vec![("range".to_string(), range)], None)
            .await
            .map_err(|e| e.into_transfer("get_range"))?;
        if response.status() != StatusCode::PARTIAL_CONTENT {
            return Err(ferry_transfer::Error::backend(
                "get_range",
                format!("expected 206 Partial Content, got {}", response.status()),
            ));
        }
        Ok(observe(response_stream(response, "get_range"), progress))
    }

    async fn delete(&self, key: &str) -> ferry_transfer::Result<()> {
        let path = self.address.key_path(key);
        self.send(Method::DELETE, &path, &[], Vec::new(), None)
            .await
            .map_err(|e| e.into_transfer("delete"))?;
        debug!(key, "deleted object");
        Ok(())
    }

    async fn list_page(&self, prefix: &str, continuation: Option<&str>) -> ferry_transfer::Result<ListPage> {
        let mut query = vec![
            ("list-type".to_string(), "2".to_string()),
            ("prefix".to_string(), prefix.to_string()),
        ];
        if let Some(token) = continuation {
            query.push(("continuation-token".to_string(), token.to_string()));
        }

        let page = async {
            let response = self
                .send(Method::GET, &self.address.bucket_root(), &query, Vec::new(), None)
                .await?;
            let body = response.text().await?;
            xml::list_objects(&body)
        }
        .await
        .map_err(|e| e.into_transfer("list"))?;

        let (objects, next_token) = page;
        Ok(ListPage { objects, next_token })
    }

    fn presign(&self, key: &str, ttl: Duration) -> ferry_transfer::Result<String> {
        self.presign_at(key, ttl, Utc::now())
            .map_err(|e| e.into_transfer("presign"))
    }

    fn object_url(&self, key: &str) -> String { self.address.url(&self.address.key_path(key), "") }

    async fn create_multipart(&self, key: &str, options: &PutOptions) -> ferry_transfer::Result<String> {
        let path = self.address.key_path(key);
        let query = vec![("uploads".to_string(), String::new())];
        let headers = vec![(STORAGE_CLASS_HEADER.to_string(), options.storage_class.clone())];

        let upload_id = async {
            let response = self
                .send(Method::POST, &path, &query, headers, Some((Body::from(Vec::new()), 0)))
                .await?;
            xml::upload_id(&response.text().await?)
        }
        .await
        .map_err(|e| e.into_transfer("create_multipart"))?;

        debug!(key, upload_id = %upload_id, "started multipart upload");
        Ok(upload_id)
    }

    async fn upload_part(
        &self,
        key: &str,
        upload_id: &str,
        part_number: u32,
        body: ByteStream,
        len: u64,
        progress: ProgressHook,
    ) -> ferry_transfer::Result<CompletedPart> {
        let (body, failure) = streaming_body(body, progress);
        let path = self.address.key_path(key);
        let mut query = Self::upload_query(upload_id);
        query.push(("partNumber".to_string(), part_number.to_string()));

        let response = match self.send(Method::PUT, &path, &query, Vec::new(), Some((body, len))).await {
            Ok(response) => response,
            Err(e) => return Err(take_failure(&failure).unwrap_or_else(|| e.into_transfer("upload_part"))),
        };
        let etag = response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::MissingField("ETag").into_transfer("upload_part"))?;

        Ok(CompletedPart {
            number: part_number,
            etag:   etag.to_string(),
        })
    }

    async fn complete_multipart(&self, key: &str, upload_id: &str, parts: &[CompletedPart]) -> ferry_transfer::Result<()> {
        let path = self.address.key_path(key);
        let query = Self::upload_query(upload_id);

        async {
            let document = xml::complete_multipart(parts)?;
            let len = document.len() as u64;
            let response = self
                .send(Method::POST, &path, &query, Vec::new(), Some((Body::from(document), len)))
                .await?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            match xml::embedded_error(status, &body) {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
        .await
        .map_err(|e| e.into_transfer("complete_multipart"))?;

        debug!(key, upload_id, parts = parts.len(), "completed multipart upload");
        Ok(())
    }

    async fn abort_multipart(&self, key: &str, upload_id: &str) -> ferry_transfer::Result<()> {
        let path = self.address.key_path(key);
        self.send(Method::DELETE, &path, &Self::upload_query(upload_id), Vec::new(), None)
            .await
            .map_err(|e| e.into_transfer("abort_multipart"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ferry_transfer::ErrorKind;

    fn credentials() -> Credentials { Credentials::new("AKIDEXAMPLE", "secret") }

    #[test]
    fn test_aws_virtual_hosted_url() {
        let store = S3Store::new(S3Config::new("photos", credentials())).unwrap();
        assert_eq!(
            store.object_url("trips/2024/beach day.jpg"),
            "https://photos.s3.ap-southeast-2.amazonaws.com/trips/2024/beach%20day.jpg"
        );
    }

    #[test]
    fn test_endpoint_path_style_url() {
        let config = S3Config::new("photos", credentials())
            .endpoint("http://localhost:9000")
            .path_style(true);
        let store = S3Store::new(config).unwrap();
        assert_eq!(store.object_url("a/b.jpg"), "http://localhost:9000/photos/a/b.jpg");
        assert_eq!(store.address.bucket_root(), "/photos");
    }

    #[test]
    fn test_endpoint_virtual_hosted_url() {
        let config = S3Config::new("photos", credentials()).endpoint("https://storage.example.com");
        let store = S3Store::new(config).unwrap();
        assert_eq!(store.object_url("a.jpg"), "https://photos.storage.example.com/a.jpg");
        assert_eq!(store.address.bucket_root(), "/");
    }

    #[test]
    fn test_invalid_endpoint() {
        let config = S3Config::new("photos", credentials()).endpoint("not a url");
        assert!(matches!(S3Store::new(config), Err(Error::InvalidEndpoint { .. })));
    }

    #[test]
    fn test_presign_shape() {
        let store = S3Store::new(S3Config::new("photos", credentials()).region("us-east-1")).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
        let url = store.presign_at("a/b.jpg", Duration::from_secs(3600), now).unwrap();

        assert!(url.starts_with("https://photos.s3.us-east-1.amazonaws.com/a/b.jpg?X-Amz-Algorithm=AWS4-HMAC-SHA256"));
        assert!(url.contains("X-Amz-Credential=AKIDEXAMPLE%2F20240301%2Fus-east-1%2Fs3%2Faws4_request"));
        assert!(url.contains("&X-Amz-Date=20240301T120000Z"));
        assert!(url.contains("&X-Amz-Expires=3600"));
        assert!(url.contains("&X-Amz-Signature="));
    }

    #[test]
    fn test_presign_ttl_bounds() {
        let store = S3Store::new(S3Config::new("photos", credentials())).unwrap();
        let now = Utc::now();

        assert!(store.presign_at("k", Duration::from_secs(1), now).is_ok());
        assert!(store.presign_at("k", MAX_PRESIGN_TTL, now).is_ok());
        assert!(matches!(
            store.presign_at("k", Duration::from_millis(500), now),
            Err(Error::InvalidTtl(_))
        ));
        assert!(matches!(
            store.presign_at("k", MAX_PRESIGN_TTL + Duration::from_secs(1), now),
            Err(Error::InvalidTtl(_))
        ));

        let err = store.presign("k", Duration::ZERO).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}

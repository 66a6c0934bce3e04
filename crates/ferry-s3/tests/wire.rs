//! Requests `S3Store` puts on the wire, checked against a canned local server.

use std::sync::Arc;

use bytes::Bytes;
use ferry_s3::{Credentials, S3Config, S3Store};
use ferry_transfer::{ErrorKind, MIB, ObjectStore, Session, TransferOptions, noop_hook};
use futures_util::TryStreamExt;
use tempfile::tempdir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

struct Captured {
    request_line: String,
    headers:      Vec<(String, String)>,
    body:         Vec<u8>,
}

impl Captured {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

fn response(status: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut out = format!(
        "HTTP/1.1 {status}\r\nContent-Length: {}\r\nConnection: close\r\n",
        body.len()
    );
    for (name, value) in headers {
        out.push_str(&format!("{name}: {value}\r\n"));
    }
    out.push_str("\r\n");
    out.push_str(body);
    out
}

/// Answer one connection per canned response, in order.
async fn serve(responses: Vec<String>) -> (String, JoinHandle<Vec<Captured>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let mut seen = Vec::new();
        for response in responses {
            let (mut socket, _) = listener.accept().await.unwrap();
            seen.push(read_request(&mut socket).await);
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }
        seen
    });
    (format!("http://{addr}"), handle)
}

async fn read_request(socket: &mut TcpStream) -> Captured {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed mid-request");
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().unwrap().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let len = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .map_or(0, |(_, v)| v.parse::<usize>().unwrap());
    let mut body = buf[head_end..].to_vec();
    while body.len() < len {
        let n = socket.read(&mut chunk).await.unwrap();
        assert!(n > 0, "connection closed mid-body");
        body.extend_from_slice(&chunk[..n]);
    }

    Captured {
        request_line,
        headers,
        body,
    }
}

fn store(endpoint: &str) -> S3Store {
    let config = S3Config::new("bucket", Credentials::new("AKID", "secret"))
        .region("us-east-1")
        .endpoint(endpoint)
        .path_style(true);
    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    S3Store::with_client(client, config).unwrap()
}

#[tokio::test]
async fn list_page_sends_signed_list_v2_request() {
    let body = "<ListBucketResult><IsTruncated>true</IsTruncated>\
                <Contents><Key>frames/a.webp</Key><Size>3</Size></Contents>\
                <NextContinuationToken>next-tok</NextContinuationToken></ListBucketResult>";
    let (endpoint, server) = serve(vec![response("200 OK", &[], body)]).await;

    let page = store(&endpoint).list_page("frames/", Some("tok")).await.unwrap();
    let seen = server.await.unwrap();

    assert_eq!(page.objects.len(), 1);
    assert_eq!(page.objects[0].key, "frames/a.webp");
    assert_eq!(page.next_token.as_deref(), Some("next-tok"));

    let request = &seen[0];
    assert_eq!(
        request.request_line,
        "GET /bucket?continuation-token=tok&list-type=2&prefix=frames%2F HTTP/1.1"
    );
    assert_eq!(request.header("x-amz-content-sha256"), Some("UNSIGNED-PAYLOAD"));
    let auth = request.header("authorization").unwrap();
    assert!(auth.starts_with("AWS4-HMAC-SHA256 Credential=AKID/"));
    assert!(auth.contains("/us-east-1/s3/aws4_request"));
}

#[tokio::test]
async fn error_document_becomes_backend_error() {
    let body = "<Error><Code>NoSuchKey</Code><Message>The specified key does not exist.</Message></Error>";
    let (endpoint, server) = serve(vec![response("404 Not Found", &[], body)]).await;

    let err = match store(&endpoint).get("missing.bin", noop_hook()).await {
        Ok(_) => panic!("expected an error"),
        Err(err) => err,
    };
    server.await.unwrap();

    assert_eq!(err.kind(), ErrorKind::Backend);
    assert!(err.to_string().contains("NoSuchKey"), "{err}");
}

#[tokio::test]
async fn ranged_get_sends_inclusive_range() {
    let (endpoint, server) = serve(vec![response("206 Partial Content", &[], "2345")]).await;

    let body = store(&endpoint).get_range("data.bin", 2, 4, noop_hook()).await.unwrap();
    let chunks: Vec<Bytes> = body.try_collect().await.unwrap();
    let seen = server.await.unwrap();

    assert_eq!(chunks.concat(), b"2345");
    assert_eq!(seen[0].request_line, "GET /bucket/data.bin HTTP/1.1");
    assert_eq!(seen[0].header("range"), Some("bytes=2-5"));
    assert!(seen[0].header("authorization").unwrap().contains("SignedHeaders=host;range;"));
}

#[tokio::test]
async fn multipart_upload_sequence() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("big.bin");
    let data: Vec<u8> = (0..5 * MIB + 2).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, &data).unwrap();

    let (endpoint, server) = serve(vec![
        response(
            "200 OK",
            &[],
            "<InitiateMultipartUploadResult><UploadId>u-1</UploadId></InitiateMultipartUploadResult>",
        ),
        response("200 OK", &[("ETag", "\"e1\"")], ""),
        response("200 OK", &[("ETag", "\"e2\"")], ""),
        response(
            "200 OK",
            &[],
            "<CompleteMultipartUploadResult><Key>big.bin</Key></CompleteMultipartUploadResult>",
        ),
    ])
    .await;

    let options = TransferOptions::default()
        .multipart_threshold(5 * MIB)
        .part_size(5 * MIB)
        .part_concurrency(1)
        .storage_class("STANDARD_IA");
    let session = Session::new(Arc::new(store(&endpoint)), options).unwrap();
    let url = session.upload_file(&path, None).await.unwrap();
    let seen = server.await.unwrap();

    assert_eq!(url, format!("{endpoint}/bucket/big.bin"));

    assert_eq!(seen[0].request_line, "POST /bucket/big.bin?uploads= HTTP/1.1");
    assert_eq!(seen[0].header("x-amz-storage-class"), Some("STANDARD_IA"));

    assert_eq!(seen[1].request_line, "PUT /bucket/big.bin?partNumber=1&uploadId=u-1 HTTP/1.1");
    assert_eq!(seen[1].body.len() as u64, 5 * MIB);
    assert_eq!(seen[1].body, &data[..(5 * MIB) as usize]);
    assert_eq!(seen[2].request_line, "PUT /bucket/big.bin?partNumber=2&uploadId=u-1 HTTP/1.1");
    assert_eq!(seen[2].body, &data[(5 * MIB) as usize..]);

    assert_eq!(seen[3].request_line, "POST /bucket/big.bin?uploadId=u-1 HTTP/1.1");
    let document = String::from_utf8(seen[3].body.clone()).unwrap();
    assert!(document.contains("<PartNumber>1</PartNumber>"));
    assert!(document.contains("<PartNumber>2</PartNumber>"));
}

#[test]
fn part_size_below_s3_minimum_is_rejected_up_front() {
    let store = Arc::new(store("http://127.0.0.1:9"));
    let err = match Session::new(Arc::clone(&store), TransferOptions::default().part_size(1024)) {
        Ok(_) => panic!("expected a config error"),
        Err(err) => err,
    };
    assert_eq!(err.kind(), ErrorKind::Config);

    assert!(Session::new(store, TransferOptions::default().part_size(5 * MIB)).is_ok());
}

//! OSS client over the S3-compatible API / 基于S3兼容接口的OSS客户端
//!
//! Signing and transport are handled by rust-s3. Endpoints whose host is an
//! IP literal or `localhost` are addressed path-style, everything else
//! virtual-hosted.

use std::collections::HashMap;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bytes::Bytes;
use s3::bucket::Bucket;
use s3::bucket_ops::BucketConfiguration;
use s3::creds::Credentials;
use s3::Region;
use url::{Host, Url};

use crate::storage::ObjectReader;
use super::client::{ObjectClient, OssMetadata};

const USER_META_PREFIX: &str = "x-amz-meta-";
const DEFAULT_REGION: &str = "us-east-1";

/// Endpoint settings resolved once at construction
#[derive(Debug, Clone, PartialEq, Eq)]
struct Endpoint {
    url: String,
    region: String,
    path_style: bool,
}

/// OSS client backed by rust-s3
pub struct S3ObjectClient {
    endpoint: Endpoint,
    credentials: Credentials,
}

impl S3ObjectClient {
    pub fn new(endpoint: &str, access_key_id: &str, access_key_secret: &str) -> Result<Self> {
        let endpoint = parse_endpoint(endpoint)?;
        let credentials = Credentials::new(
            Some(access_key_id),
            Some(access_key_secret),
            None,
            None,
            None,
        )
        .map_err(|e| anyhow!("Failed to create OSS credentials: {}", e))?;

        Ok(Self {
            endpoint,
            credentials,
        })
    }

    fn region(&self) -> Region {
        Region::Custom {
            region: self.endpoint.region.clone(),
            endpoint: self.endpoint.url.clone(),
        }
    }

    /// Bucket handle for one request; building it does no I/O
    fn bucket(&self, name: &str) -> Result<Box<Bucket>> {
        let bucket = Bucket::new(name, self.region(), self.credentials.clone())
            .map_err(|e| anyhow!("Failed to create OSS bucket handle {}: {}", name, e))?;

        Ok(if self.endpoint.path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }

    /// Bucket handle carrying the metadata headers of a write
    fn bucket_with_metadata(&self, name: &str, metadata: &OssMetadata) -> Result<Box<Bucket>> {
        let mut bucket = self.bucket(name)?;
        for (key, value) in metadata_headers(metadata)? {
            bucket.add_header(&key, &value);
        }
        Ok(bucket)
    }
}

/// Resolve scheme, signing region and addressing style from an endpoint
fn parse_endpoint(endpoint: &str) -> Result<Endpoint> {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.is_empty() {
        return Err(anyhow!("OSS endpoint is empty"));
    }

    let raw = if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    };
    let url = Url::parse(&raw).map_err(|e| anyhow!("Invalid OSS endpoint {}: {}", endpoint, e))?;
    let host = url
        .host()
        .ok_or_else(|| anyhow!("OSS endpoint has no host: {}", endpoint))?;

    let (region, path_style) = match host {
        Host::Domain(domain) if domain.eq_ignore_ascii_case("localhost") => {
            (DEFAULT_REGION.to_string(), true)
        }
        // oss-cn-hangzhou.aliyuncs.com signs as oss-cn-hangzhou
        Host::Domain(domain) => {
            let label = domain.split('.').next().unwrap_or_default();
            let region = if label.starts_with("oss-") {
                label.to_string()
            } else {
                DEFAULT_REGION.to_string()
            };
            (region, false)
        }
        Host::Ipv4(_) | Host::Ipv6(_) => (DEFAULT_REGION.to_string(), true),
    };

    Ok(Endpoint {
        url: raw,
        region,
        path_style,
    })
}

fn is_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

fn is_header_value(value: &str) -> bool {
    value.bytes().all(|b| b == b'\t' || (b >= 0x20 && b != 0x7f))
}

/// Headers carrying native metadata on PUT and copy requests
fn metadata_headers(metadata: &OssMetadata) -> Result<Vec<(String, String)>> {
    let mut headers = Vec::new();
    if let Some(ref disposition) = metadata.content_disposition {
        headers.push(("content-disposition".to_string(), disposition.clone()));
    }
    if let Some(ref cache_control) = metadata.cache_control {
        headers.push(("cache-control".to_string(), cache_control.clone()));
    }
    for (key, value) in &metadata.user_metadata {
        let key = key.to_lowercase();
        if !is_token(&key) {
            return Err(anyhow!("Invalid user metadata key: {}", key));
        }
        headers.push((format!("{}{}", USER_META_PREFIX, key), value.clone()));
    }

    if let Some((name, _)) = headers.iter().find(|(_, value)| !is_header_value(value)) {
        return Err(anyhow!("Invalid metadata value for {}", name));
    }
    Ok(headers)
}

/// Native metadata from lowercase response headers
fn metadata_from_headers(headers: &HashMap<String, String>) -> OssMetadata {
    let user_metadata = headers
        .iter()
        .filter_map(|(name, value)| {
            let key = name.strip_prefix(USER_META_PREFIX)?;
            Some((key.to_string(), value.clone()))
        })
        .collect();

    OssMetadata {
        content_type: headers.get("content-type").cloned().unwrap_or_default(),
        content_length: headers
            .get("content-length")
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(-1),
        content_disposition: headers.get("content-disposition").cloned(),
        cache_control: headers.get("cache-control").cloned(),
        user_metadata,
    }
}

fn is_success(code: u16) -> bool {
    (200..300).contains(&code)
}

fn status_error(operation: &str, code: u16, body: &[u8]) -> anyhow::Error {
    let body = String::from_utf8_lossy(body);
    if body.trim().is_empty() {
        anyhow!("OSS {} failed: HTTP {}", operation, code)
    } else {
        anyhow!("OSS {} failed: HTTP {} {}", operation, code, body.trim())
    }
}

#[async_trait]
impl ObjectClient for S3ObjectClient {
    async fn object_exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let (_, code) = self
            .bucket(bucket)?
            .head_object(key)
            .await
            .map_err(|e| anyhow!("OSS head object failed: {}", e))?;

        match code {
            404 => Ok(false),
            code if is_success(code) => Ok(true),
            code => Err(status_error("head object", code, &[])),
        }
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        self.bucket(bucket)?
            .exists()
            .await
            .map_err(|e| anyhow!("OSS bucket lookup failed: {}", e))
    }

    async fn create_bucket(&self, bucket: &str) -> Result<()> {
        let config = BucketConfiguration::default();
        let response = if self.endpoint.path_style {
            Bucket::create_with_path_style(bucket, self.region(), self.credentials.clone(), config).await
        } else {
            Bucket::create(bucket, self.region(), self.credentials.clone(), config).await
        }
        .map_err(|e| anyhow!("OSS create bucket failed: {}", e))?;

        if !response.success() {
            return Err(status_error(
                "create bucket",
                response.response_code,
                response.response_text.as_bytes(),
            ));
        }
        tracing::info!("OSS bucket created: {}", bucket);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<(ObjectReader, OssMetadata)> {
        let response = self
            .bucket(bucket)?
            .get_object(key)
            .await
            .map_err(|e| anyhow!("OSS get object failed: {}", e))?;

        if !is_success(response.status_code()) {
            return Err(status_error("get object", response.status_code(), response.bytes()));
        }

        let headers = response.headers();
        let metadata = metadata_from_headers(&headers);
        // rust-s3 hands back the whole body, wrap it as a reader
        let reader: ObjectReader = Box::new(std::io::Cursor::new(response.bytes().to_vec()));
        Ok((reader, metadata))
    }

    async fn get_object_metadata(&self, bucket: &str, key: &str) -> Result<OssMetadata> {
        let (head, code) = self
            .bucket(bucket)?
            .head_object(key)
            .await
            .map_err(|e| anyhow!("OSS head object failed: {}", e))?;

        if !is_success(code) {
            return Err(status_error("head object", code, &[]));
        }

        Ok(OssMetadata {
            content_type: head.content_type.unwrap_or_default(),
            content_length: head.content_length.unwrap_or(-1),
            content_disposition: head.content_disposition,
            cache_control: head.cache_control,
            user_metadata: head.metadata.unwrap_or_default(),
        })
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        content: Bytes,
        metadata: &OssMetadata,
    ) -> Result<()> {
        let content_type = if metadata.content_type.is_empty() {
            "application/octet-stream"
        } else {
            metadata.content_type.as_str()
        };

        let response = self
            .bucket_with_metadata(bucket, metadata)?
            .put_object_with_content_type(key, &content, content_type)
            .await
            .map_err(|e| anyhow!("OSS put object failed: {}", e))?;

        if !is_success(response.status_code()) {
            return Err(status_error("put object", response.status_code(), response.bytes()));
        }
        Ok(())
    }

    async fn modify_object_metadata(
        &self,
        bucket: &str,
        key: &str,
        metadata: &OssMetadata,
    ) -> Result<()> {
        let mut handle = self.bucket_with_metadata(bucket, metadata)?;
        handle.add_header("x-amz-metadata-directive", "REPLACE");
        if !metadata.content_type.is_empty() {
            if !is_header_value(&metadata.content_type) {
                return Err(anyhow!("Invalid content type: {}", metadata.content_type));
            }
            handle.add_header("content-type", &metadata.content_type);
        }

        // Copy source must be URL encoded
        let source = urlencoding::encode(key);
        tracing::debug!("OSS metadata copy: src={}, dst={}", source, key);

        let code = handle
            .copy_object_internal(&*source, key)
            .await
            .map_err(|e| anyhow!("OSS copy object failed: {}", e))?;

        if !is_success(code) {
            return Err(status_error("copy object", code, &[]));
        }
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        let response = self
            .bucket(bucket)?
            .delete_object(key)
            .await
            .map_err(|e| anyhow!("OSS delete object failed: {}", e))?;

        let code = response.status_code();
        if is_success(code) || code == 404 {
            return Ok(());
        }
        Err(status_error("delete object", code, response.bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Canned reply of the single-request server
    struct Reply {
        status: &'static str,
        headers: Vec<(&'static str, &'static str)>,
        body: &'static str,
    }

    impl Reply {
        fn new(status: &'static str) -> Self {
            Self {
                status,
                headers: Vec::new(),
                body: "",
            }
        }

        fn header(mut self, name: &'static str, value: &'static str) -> Self {
            self.headers.push((name, value));
            self
        }

        fn body(mut self, body: &'static str) -> Self {
            self.body = body;
            self
        }
    }

    /// Serve one connection on a local port; the handle yields the raw
    /// request, lowercased
    async fn serve_once(reply: Reply) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let endpoint = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];

            let header_end = loop {
                let n = socket.read(&mut buf).await.unwrap();
                assert!(n > 0, "connection closed before headers");
                request.extend_from_slice(&buf[..n]);
                if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };

            let head = String::from_utf8_lossy(&request[..header_end]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while request.len() < header_end + body_len {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }

            let mut response = format!("HTTP/1.1 {}\r\nConnection: close\r\n", reply.status);
            if !reply
                .headers
                .iter()
                .any(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            {
                response.push_str(&format!("Content-Length: {}\r\n", reply.body.len()));
            }
            for (name, value) in &reply.headers {
                response.push_str(&format!("{}: {}\r\n", name, value));
            }
            response.push_str("\r\n");
            response.push_str(reply.body);
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();

            String::from_utf8_lossy(&request).to_lowercase()
        });

        (endpoint, handle)
    }

    fn client(endpoint: &str) -> S3ObjectClient {
        S3ObjectClient::new(endpoint, "AKID", "secret").unwrap()
    }

    #[test]
    fn test_parse_endpoint() {
        let endpoint = parse_endpoint("oss-cn-hangzhou.aliyuncs.com").unwrap();
        assert_eq!(endpoint.url, "https://oss-cn-hangzhou.aliyuncs.com");
        assert_eq!(endpoint.region, "oss-cn-hangzhou");
        assert!(!endpoint.path_style);

        let endpoint = parse_endpoint("http://127.0.0.1:9000/").unwrap();
        assert_eq!(endpoint.url, "http://127.0.0.1:9000");
        assert_eq!(endpoint.region, DEFAULT_REGION);
        assert!(endpoint.path_style);

        assert!(parse_endpoint("http://localhost:9000").unwrap().path_style);
        assert!(parse_endpoint("http://[::1]:9000").unwrap().path_style);
        assert!(parse_endpoint("").is_err());
        assert!(parse_endpoint("   ").is_err());
    }

    #[test]
    fn test_metadata_headers() {
        let mut metadata = OssMetadata {
            content_disposition: Some("inline".to_string()),
            cache_control: Some("no-cache".to_string()),
            ..OssMetadata::default()
        };
        metadata.user_metadata.insert("Owner".to_string(), "alice".to_string());

        let headers = metadata_headers(&metadata).unwrap();
        assert!(headers.contains(&("content-disposition".to_string(), "inline".to_string())));
        assert!(headers.contains(&("cache-control".to_string(), "no-cache".to_string())));
        assert!(headers.contains(&("x-amz-meta-owner".to_string(), "alice".to_string())));
    }

    #[test]
    fn test_metadata_headers_rejects_invalid_entries() {
        let mut metadata = OssMetadata::default();
        metadata.user_metadata.insert("bad key".to_string(), "v".to_string());
        assert!(metadata_headers(&metadata).is_err());

        let mut metadata = OssMetadata::default();
        metadata.user_metadata.insert("key".to_string(), "line\nbreak".to_string());
        assert!(metadata_headers(&metadata).is_err());
    }

    #[test]
    fn test_metadata_from_headers() {
        let headers: HashMap<String, String> = [
            ("content-type", "image/png"),
            ("content-length", "42"),
            ("content-disposition", "attachment"),
            ("x-amz-meta-owner", "alice"),
            ("etag", "\"abc\""),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let metadata = metadata_from_headers(&headers);
        assert_eq!(metadata.content_type, "image/png");
        assert_eq!(metadata.content_length, 42);
        assert_eq!(metadata.content_disposition.as_deref(), Some("attachment"));
        assert_eq!(metadata.cache_control, None);
        assert_eq!(metadata.user_metadata.len(), 1);
        assert_eq!(metadata.user_metadata["owner"], "alice");
    }

    #[test]
    fn test_missing_length_header_is_unset() {
        let metadata = metadata_from_headers(&HashMap::new());
        assert_eq!(metadata.content_length, -1);
        assert_eq!(metadata.content_type, "");
    }

    #[tokio::test]
    async fn test_object_exists_signed_path_style_head() {
        let (endpoint, server) = serve_once(Reply::new("200 OK").header("Content-Length", "5")).await;

        assert!(client(&endpoint).object_exists("assets", "a.txt").await.unwrap());

        let request = server.await.unwrap();
        assert!(request.starts_with("head /assets/a.txt http/1.1"), "{}", request);
        assert!(request.contains("authorization: aws4-hmac-sha256 credential=akid/"));
        assert!(request.contains("x-amz-date:"));
    }

    #[tokio::test]
    async fn test_object_exists_not_found_is_false() {
        let (endpoint, server) = serve_once(Reply::new("404 Not Found")).await;

        assert!(!client(&endpoint).object_exists("assets", "missing.txt").await.unwrap());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (endpoint, server) = serve_once(
            Reply::new("403 Forbidden")
                .header("Content-Type", "application/xml")
                .body("<Error><Code>AccessDenied</Code><Message>denied</Message></Error>"),
        )
        .await;

        let err = client(&endpoint).get_object("assets", "a.txt").await.err().unwrap();
        let text = err.to_string();
        assert!(text.contains("403"), "{}", text);
        assert!(text.contains("AccessDenied"), "{}", text);
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_get_object_reads_content_and_metadata() {
        let (endpoint, server) = serve_once(
            Reply::new("200 OK")
                .header("Content-Type", "text/plain")
                .header("Content-Disposition", "inline")
                .header("x-amz-meta-owner", "alice")
                .body("hello"),
        )
        .await;

        let (mut reader, metadata) = client(&endpoint).get_object("assets", "docs/a.txt").await.unwrap();
        let mut content = Vec::new();
        reader.read_to_end(&mut content).await.unwrap();

        assert_eq!(content, b"hello");
        assert_eq!(metadata.content_type, "text/plain");
        assert_eq!(metadata.content_length, 5);
        assert_eq!(metadata.content_disposition.as_deref(), Some("inline"));
        assert_eq!(metadata.user_metadata["owner"], "alice");

        let request = server.await.unwrap();
        assert!(request.starts_with("get /assets/docs/a.txt http/1.1"), "{}", request);
    }

    #[tokio::test]
    async fn test_put_object_sends_metadata_headers() {
        let (endpoint, server) = serve_once(Reply::new("200 OK").header("ETag", "\"abc\"")).await;

        let mut metadata = OssMetadata {
            content_type: "text/plain".to_string(),
            cache_control: Some("max-age=60".to_string()),
            ..OssMetadata::default()
        };
        metadata.user_metadata.insert("owner".to_string(), "alice".to_string());

        client(&endpoint)
            .put_object("assets", "docs/a.txt", Bytes::from_static(b"hello"), &metadata)
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("put /assets/docs/a.txt http/1.1"), "{}", request);
        assert!(request.contains("content-type: text/plain"));
        assert!(request.contains("cache-control: max-age=60"));
        assert!(request.contains("x-amz-meta-owner: alice"));
        assert!(request.ends_with("hello"));
    }

    #[tokio::test]
    async fn test_modify_metadata_replaces_by_self_copy() {
        let (endpoint, server) = serve_once(
            Reply::new("200 OK")
                .header("Content-Type", "application/xml")
                .body("<CopyObjectResult><ETag>\"abc\"</ETag></CopyObjectResult>"),
        )
        .await;

        let mut metadata = OssMetadata {
            content_type: "text/plain".to_string(),
            ..OssMetadata::default()
        };
        metadata.user_metadata.insert("owner".to_string(), "bob".to_string());

        client(&endpoint)
            .modify_object_metadata("assets", "a.txt", &metadata)
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("put /assets/a.txt http/1.1"), "{}", request);
        assert!(request.contains("x-amz-copy-source:"));
        assert!(request.contains("x-amz-metadata-directive: replace"));
        assert!(request.contains("x-amz-meta-owner: bob"));
        assert!(request.contains("content-type: text/plain"));
    }

    #[tokio::test]
    async fn test_delete_object() {
        let (endpoint, server) = serve_once(Reply::new("204 No Content")).await;

        client(&endpoint).delete_object("assets", "a.txt").await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("delete /assets/a.txt http/1.1"), "{}", request);
    }

    #[tokio::test]
    async fn test_create_bucket_path_style() {
        let (endpoint, server) = serve_once(Reply::new("200 OK")).await;

        client(&endpoint).create_bucket("assets").await.unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("put /assets"), "{}", request);
    }
}

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use futures_util::StreamExt;
use ossync_crypto::{http_date, ContentHasher, RequestSigner};
use ossync_protocol::{endpoint_for_bucket, sniff_content_type, ListBucketResult, ListQuery, XmlCodec};
use ossync_types::Digest;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, DATE, ETAG};
use reqwest::{Client, Method, Response, StatusCode};
use tracing::debug;
use url::Url;

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectBody, ObjectHead};
use crate::traits::ObjectStore;

const CONTENT_MD5: &str = "Content-MD5";

/// Object store reached over HTTP(S), every request signed with
/// [`RequestSigner`].
#[derive(Clone, Debug)]
pub struct HttpObjectStore {
    client: Client,
    base_url: String,
    signer: RequestSigner,
}

impl HttpObjectStore {
    /// Build a store for the signer's bucket. `endpoint` may contain one
    /// `%s` placeholder for the bucket name.
    pub fn new(endpoint: &str, signer: RequestSigner) -> StoreResult<Self> {
        Self::with_client(Client::new(), endpoint, signer)
    }

    pub fn with_client(client: Client, endpoint: &str, signer: RequestSigner) -> StoreResult<Self> {
        let base_url = endpoint_for_bucket(endpoint, signer.bucket());
        Url::parse(&base_url).map_err(|e| StoreError::InvalidUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            client,
            base_url,
            signer,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn parse_url(&self, raw: &str) -> StoreResult<Url> {
        Url::parse(raw).map_err(|e| StoreError::InvalidUrl {
            url: raw.to_string(),
            reason: e.to_string(),
        })
    }

    fn object_url(&self, key: &str) -> StoreResult<Url> {
        let mut url = self.parse_url(&self.base_url)?;
        url.set_path(key);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        resource: &str,
        body: Option<Bytes>,
        content_md5: &str,
        content_type: &str,
    ) -> StoreResult<Response> {
        let date = http_date(Utc::now());
        let authorization =
            self.signer
                .authorization(method.as_str(), content_md5, content_type, &date, resource)?;
        debug!(%method, %url, "sending request");

        let mut request = self
            .client
            .request(method, url)
            .header(DATE, date.as_str())
            .header(AUTHORIZATION, authorization);
        if !content_md5.is_empty() {
            request = request.header(CONTENT_MD5, content_md5);
        }
        if !content_type.is_empty() {
            request = request.header(CONTENT_TYPE, content_type);
        }
        if let Some(body) = body {
            request = request.body(body);
        }
        Ok(request.send().await?)
    }
}

/// Pass a 200 response through; turn anything else into a remote error.
async fn expect_ok(response: Response) -> StoreResult<Response> {
    let status = response.status();
    if status == StatusCode::OK {
        return Ok(response);
    }
    let body = response.bytes().await?;
    Err(StoreError::Remote(XmlCodec::decode_error(status.as_u16(), &body)))
}

fn header_str(response: &Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn list_page(&self, query: &ListQuery) -> StoreResult<ListBucketResult> {
        let url = self.parse_url(&format!("{}{}", self.base_url, query.to_path()))?;
        let response = self.send(Method::GET, url, "/", None, "", "").await?;
        let body = expect_ok(response).await?.bytes().await?;
        Ok(XmlCodec::decode_listing(&body)?)
    }

    async fn head(&self, key: &str) -> StoreResult<Option<ObjectHead>> {
        let url = self.object_url(key)?;
        let response = self.send(Method::HEAD, url, key, None, "", "").await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = expect_ok(response).await?;
        Ok(Some(ObjectHead {
            digest: header_str(&response, ETAG).and_then(|etag| Digest::from_etag(&etag)),
            size: header_str(&response, CONTENT_LENGTH).and_then(|len| len.parse().ok()),
            content_type: header_str(&response, CONTENT_TYPE),
        }))
    }

    async fn put(&self, key: &str, body: Bytes, content_md5: &Digest) -> StoreResult<()> {
        let url = self.object_url(key)?;
        let content_type = sniff_content_type(&body);
        let md5 = ContentHasher::content_md5(content_md5);
        let response = self
            .send(Method::PUT, url, key, Some(body), &md5, content_type)
            .await?;
        expect_ok(response).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<ObjectBody> {
        let url = self.object_url(key)?;
        let response = expect_ok(self.send(Method::GET, url, key, None, "", "").await?).await?;
        Ok(ObjectBody {
            content_type: header_str(&response, CONTENT_TYPE),
            content_length: response.content_length(),
            stream: response
                .bytes_stream()
                .map(|chunk| chunk.map_err(StoreError::from))
                .boxed(),
        })
    }

    fn presigned_url(&self, key: &str, expires: i64) -> StoreResult<String> {
        let signature = self.signer.presign_get(key, expires)?;
        let mut url = self.object_url(key)?;
        url.query_pairs_mut()
            .append_pair("OSSAccessKeyId", self.signer.access_key_id())
            .append_pair("Expires", &expires.to_string())
            .append_pair("Signature", &signature);
        Ok(url.into())
    }
}

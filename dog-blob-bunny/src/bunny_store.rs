use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Method, Request, Response, StatusCode};
use serde::Deserialize;

use crate::url::{encode_key, normalize_key, object_key};
use crate::{BlobError, BlobResult, BlobStore, BunnyConfig, PutOptions};

const ACCESS_KEY_HEADER: &str = "AccessKey";
const CHECKSUM_HEADER: &str = "Checksum";

/// Entry returned by a storage directory listing
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct StorageObject {
    object_name: String,
    #[serde(default)]
    is_directory: bool,
}

/// Bunny Edge Storage client speaking the storage HTTP API
#[derive(Clone)]
pub struct BunnyEdgeStore {
    client: Client,
    endpoint: String,
    storage_zone: String,
    access_key: String,
}

impl BunnyEdgeStore {
    /// Build a client from an already validated config
    pub fn new(config: &BunnyConfig) -> BlobResult<Self> {
        config.validate()?;

        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(Self::map_http_error)?;

        Ok(Self {
            client,
            endpoint: config.storage_endpoint(),
            storage_zone: config.storage_zone.clone(),
            access_key: config.access_key.clone(),
        })
    }

    fn map_http_error(err: reqwest::Error) -> BlobError {
        BlobError::backend(err)
    }

    /// URL of a single object; empty names would address the zone root
    fn object_url(&self, name: &str) -> BlobResult<String> {
        let path = object_key(name)?;
        Ok(format!("{}/{}/{}", self.endpoint, self.storage_zone, encode_key(path)))
    }

    /// URL of a directory, always with a trailing slash
    fn directory_url(&self, path: &str) -> BlobResult<String> {
        let path = normalize_key(path)?;
        if path.is_empty() {
            Ok(format!("{}/{}/", self.endpoint, self.storage_zone))
        } else {
            Ok(format!("{}/{}/{}/", self.endpoint, self.storage_zone, encode_key(path)))
        }
    }

    fn build(&self, method: Method, url: String) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header(ACCESS_KEY_HEADER, &self.access_key)
    }

    fn put_request(&self, name: &str, body: Bytes, options: &PutOptions) -> BlobResult<Request> {
        let content_type = options
            .content_type
            .as_deref()
            .unwrap_or("application/octet-stream");

        let mut request = self
            .build(Method::PUT, self.object_url(name)?)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body);

        if let Some(checksum) = &options.checksum {
            request = request.header(CHECKSUM_HEADER, checksum);
        }
        if let Some(disposition) = &options.content_disposition {
            request = request.header(reqwest::header::CONTENT_DISPOSITION, disposition);
        }

        request.build().map_err(Self::map_http_error)
    }

    fn get_request(&self, name: &str) -> BlobResult<Request> {
        self.build(Method::GET, self.object_url(name)?)
            .build()
            .map_err(Self::map_http_error)
    }

    fn delete_request(&self, name: &str) -> BlobResult<Request> {
        self.build(Method::DELETE, self.object_url(name)?)
            .build()
            .map_err(Self::map_http_error)
    }

    fn delete_path_request(&self, prefix: &str) -> BlobResult<Request> {
        if normalize_key(prefix)?.is_empty() {
            return Err(BlobError::invalid("refusing to delete the storage zone root"));
        }
        self.build(Method::DELETE, self.directory_url(prefix)?)
            .build()
            .map_err(Self::map_http_error)
    }

    fn list_request(&self, directory: &str) -> BlobResult<Request> {
        self.build(Method::GET, self.directory_url(directory)?)
            .header(reqwest::header::ACCEPT, "application/json")
            .build()
            .map_err(Self::map_http_error)
    }

    /// Send a request and turn non-success statuses into errors
    async fn execute(&self, request: Request) -> BlobResult<Response> {
        let response = self
            .client
            .execute(request)
            .await
            .map_err(Self::map_http_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().path().to_string();
        let message = response.text().await.unwrap_or_default();
        if status == StatusCode::NOT_FOUND {
            return Err(BlobError::not_found(url));
        }
        Err(BlobError::status(status.as_u16(), message))
    }
}

/// Split a normalized key into its parent directory and file name
fn split_key(name: &str) -> (&str, &str) {
    match name.rsplit_once('/') {
        Some((directory, file)) => (directory, file),
        None => ("", name),
    }
}

#[async_trait]
impl BlobStore for BunnyEdgeStore {
    async fn put(&self, name: &str, body: Bytes, options: &PutOptions) -> BlobResult<()> {
        let request = self.put_request(name, body, options)?;
        self.execute(request).await?;
        Ok(())
    }

    async fn get(&self, name: &str) -> BlobResult<Bytes> {
        let request = self.get_request(name)?;
        let response = self.execute(request).await?;
        response.bytes().await.map_err(Self::map_http_error)
    }

    async fn delete(&self, name: &str) -> BlobResult<()> {
        let request = self.delete_request(name)?;
        self.execute(request).await?;
        Ok(())
    }

    async fn delete_path(&self, prefix: &str) -> BlobResult<()> {
        let request = self.delete_path_request(prefix)?;
        self.execute(request).await?;
        Ok(())
    }

    async fn exists(&self, name: &str) -> BlobResult<bool> {
        let (directory, file) = split_key(object_key(name)?);

        let request = self.list_request(directory)?;
        let response = match self.execute(request).await {
            Ok(response) => response,
            Err(err) if err.is_not_found() => return Ok(false),
            Err(err) => return Err(err),
        };

        let objects: Vec<StorageObject> = response.json().await.map_err(Self::map_http_error)?;
        Ok(objects
            .iter()
            .any(|object| !object.is_directory && object.object_name == file))
    }
}

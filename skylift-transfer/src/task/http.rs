use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Body, Client};
use serde::{Deserialize, Serialize};
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::{error::TransferError, model::UploadItem};

use super::{ObjectTransport, ProgressCallback, UrlIssuer};

const UPLOAD_URL_PATH: &str = "/api/s3/upload-url";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadUrlRequest<'a> {
    content_type: &'a str,
    file_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: Option<T>,
    message: Option<String>,
    success: bool,
}

#[derive(Debug, Deserialize)]
struct PresignedUrl {
    key: Option<String>,
    url: String,
}

/// Requests presigned PUT urls from the storage backend.
pub struct HttpUrlIssuer {
    client: Client,
    endpoint: String,
}

impl HttpUrlIssuer {
    pub fn new(client: Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}{}", endpoint.trim_end_matches('/'), UPLOAD_URL_PATH),
        }
    }
}

#[async_trait]
impl UrlIssuer for HttpUrlIssuer {
    async fn issue(&self, key: &str, content_type: &str) -> Result<String, TransferError> {
        let request = UploadUrlRequest {
            content_type,
            file_name: key,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|error| TransferError::UrlIssueFailed(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::UrlIssueFailed(format!(
                "endpoint responded with {}",
                status
            )));
        }

        let body = response
            .json::<ApiResponse<PresignedUrl>>()
            .await
            .map_err(|error| TransferError::UrlIssueFailed(error.to_string()))?;

        match body {
            ApiResponse {
                success: true,
                data: Some(presigned),
                ..
            } => {
                tracing::trace!("issued url for {:?} as {:?}", key, presigned.key);
                Ok(presigned.url)
            }
            ApiResponse { message, .. } => Err(TransferError::UrlIssueFailed(
                message.unwrap_or_else(|| "response carries no url".to_owned()),
            )),
        }
    }
}

/// Streams the file body to the presigned url.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectTransport for HttpTransport {
    async fn put(
        &self,
        url: &str,
        content_type: &str,
        item: &UploadItem,
        progress: ProgressCallback,
    ) -> Result<u16, TransferError> {
        let file = File::open(&item.source)
            .await
            .map_err(|error| TransferError::TransportFailed(error.to_string()))?;

        let total = item.size;
        let mut sent = 0;
        let stream = ReaderStream::new(file).map(move |chunk| {
            if let Ok(bytes) = &chunk {
                sent += bytes.len() as u64;
                progress(sent, total);
            }
            chunk
        });

        let response = self
            .client
            .put(url)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CONTENT_LENGTH, total)
            .body(Body::wrap_stream(stream))
            .send()
            .await
            .map_err(|error| TransferError::TransportFailed(error.to_string()))?;

        Ok(response.status().as_u16())
    }
}

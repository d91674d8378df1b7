// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Azure Queue Storage REST transport.
//!
//! Two operations are used: `PUT {endpoint}/{queue}` to create a queue and
//! `POST {endpoint}/{queue}/messages` to enqueue a message. Requests are
//! authorized either with a shared key signature or by appending the SAS token
//! to the query string. Message text is base64 encoded inside the XML envelope,
//! which is what queue consumers expect by default.

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Method, StatusCode, Url};
use sha2::Sha256;
use tracing::debug;

use crate::connection::{StorageAccount, StorageCredentials};
use crate::errors::{SinkError, TransportError};
use crate::transport::{QueueMessage, QueueTransport};

const STORAGE_API_VERSION: &str = "2019-12-12";
const XML_CONTENT_TYPE: &str = "application/xml";

#[derive(Clone)]
enum Authorization {
    SharedKey(SharedKeySigner),
    Sas(String),
}

#[derive(Clone)]
pub struct HttpQueueTransport {
    client: reqwest::Client,
    endpoint: Url,
    auth: Authorization,
}

impl HttpQueueTransport {
    pub fn new(account: &StorageAccount) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| SinkError::Configuration(format!("failed to build HTTP client: {e}")))?;
        HttpQueueTransport::with_client(account, client)
    }

    pub fn with_client(account: &StorageAccount, client: reqwest::Client) -> Result<Self, SinkError> {
        let endpoint = Url::parse(account.queue_endpoint()).map_err(|e| {
            SinkError::Configuration(format!(
                "invalid queue endpoint '{}': {e}",
                account.queue_endpoint()
            ))
        })?;
        let auth = match account.credentials() {
            StorageCredentials::SharedKey { account_name, key } => {
                Authorization::SharedKey(SharedKeySigner::new(account_name, key)?)
            }
            StorageCredentials::Sas(token) => Authorization::Sas(token.clone()),
        };
        Ok(HttpQueueTransport {
            client,
            endpoint,
            auth,
        })
    }

    fn url(&self, path: &str) -> Url {
        let mut url = self.endpoint.clone();
        let base = url.path().trim_end_matches('/').to_string();
        url.set_path(&format!("{base}/{path}"));
        if let Authorization::Sas(token) = &self.auth {
            url.set_query(Some(token.as_str()));
        }
        url
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Vec<u8>,
    ) -> Result<reqwest::Response, TransportError> {
        let url = self.url(path);
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let content_type = if body.is_empty() { "" } else { XML_CONTENT_TYPE };

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .header("x-ms-date", &date)
            .header("x-ms-version", STORAGE_API_VERSION);
        if !content_type.is_empty() {
            request = request.header(reqwest::header::CONTENT_TYPE, content_type);
        }
        if let Authorization::SharedKey(signer) = &self.auth {
            let authorization =
                signer.authorization(method.as_str(), body.len(), content_type, &date, url.path());
            request = request.header(reqwest::header::AUTHORIZATION, authorization);
        }

        debug!("{method} {}", url.path());
        Ok(request.body(body).send().await?)
    }
}

#[async_trait]
impl QueueTransport for HttpQueueTransport {
    async fn create_queue_if_not_exists(&self, queue: &str) -> Result<bool, TransportError> {
        let response = self.send(Method::PUT, queue, Vec::new()).await?;
        match response.status() {
            StatusCode::CREATED => Ok(true),
            // 204: already exists with the same metadata, 409: exists with different metadata
            StatusCode::NO_CONTENT | StatusCode::CONFLICT => Ok(false),
            status => Err(status_error(status, response).await),
        }
    }

    async fn put_message(&self, queue: &str, message: &QueueMessage) -> Result<(), TransportError> {
        let body = message_envelope(message);
        let response = self
            .send(Method::POST, &format!("{queue}/messages"), body.into_bytes())
            .await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(status_error(response.status(), response).await)
        }
    }
}

async fn status_error(status: StatusCode, response: reqwest::Response) -> TransportError {
    TransportError::Status {
        status: status.as_u16(),
        body: response.text().await.unwrap_or_default(),
    }
}

fn message_envelope(message: &QueueMessage) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(message.text());
    format!("<QueueMessage><MessageText>{encoded}</MessageText></QueueMessage>")
}

/// Shared Key authorization for the queue service.
#[derive(Clone)]
struct SharedKeySigner {
    account_name: String,
    mac: Hmac<Sha256>,
}

impl SharedKeySigner {
    fn new(account_name: &str, key: &[u8]) -> Result<Self, SinkError> {
        let mac = Hmac::<Sha256>::new_from_slice(key)
            .map_err(|e| SinkError::Configuration(format!("invalid account key: {e}")))?;
        Ok(SharedKeySigner {
            account_name: account_name.to_string(),
            mac,
        })
    }

    fn authorization(
        &self,
        method: &str,
        content_length: usize,
        content_type: &str,
        date: &str,
        path: &str,
    ) -> String {
        let string_to_sign = self.string_to_sign(method, content_length, content_type, date, path);
        let mut mac = self.mac.clone();
        mac.update(string_to_sign.as_bytes());
        let signature = base64::engine::general_purpose::STANDARD.encode(mac.finalize().into_bytes());
        format!("SharedKey {}:{signature}", self.account_name)
    }

    fn string_to_sign(
        &self,
        method: &str,
        content_length: usize,
        content_type: &str,
        date: &str,
        path: &str,
    ) -> String {
        // Content-Length is left empty when zero since storage API version 2015-02-21.
        let content_length = if content_length == 0 {
            String::new()
        } else {
            content_length.to_string()
        };
        // VERB, Content-Encoding, Content-Language, Content-Length, Content-MD5,
        // Content-Type, Date, If-Modified-Since, If-Match, If-None-Match,
        // If-Unmodified-Since, Range, then the canonicalized x-ms headers and resource.
        format!(
            "{method}\n\n\n{content_length}\n\n{content_type}\n\n\n\n\n\n\nx-ms-date:{date}\nx-ms-version:{STORAGE_API_VERSION}\n/{}{path}",
            self.account_name
        )
    }
}

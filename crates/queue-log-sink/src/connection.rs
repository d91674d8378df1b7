// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Storage account credentials and the connection context handed to the sink.

use std::fmt::{self, Debug};
use std::str::FromStr;
use std::sync::Arc;

use base64::Engine;

use crate::errors::SinkError;
use crate::http_transport::HttpQueueTransport;
use crate::transport::{QueueClient, QueueTransport};

pub const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

const DEV_STORE_ACCOUNT_NAME: &str = "devstoreaccount1";
// Well-known key of the local storage emulator, not a secret.
const DEV_STORE_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_STORE_QUEUE_ENDPOINT: &str = "http://127.0.0.1:10001/devstoreaccount1";

#[derive(Clone, PartialEq, Eq)]
pub enum StorageCredentials {
    SharedKey { account_name: String, key: Vec<u8> },
    /// Shared access signature query string, without the leading `?`.
    Sas(String),
}

impl StorageCredentials {
    pub fn shared_key(account_name: &str, base64_key: &str) -> Result<Self, SinkError> {
        let key = base64::engine::general_purpose::STANDARD
            .decode(base64_key.trim())
            .map_err(|e| SinkError::Configuration(format!("AccountKey is not valid base64: {e}")))?;
        Ok(StorageCredentials::SharedKey {
            account_name: account_name.to_string(),
            key,
        })
    }

    pub fn sas(token: &str) -> Result<Self, SinkError> {
        let token = token.trim().trim_start_matches('?');
        if token.is_empty() {
            return Err(SinkError::Configuration(
                "shared access signature is empty".to_string(),
            ));
        }
        Ok(StorageCredentials::Sas(token.to_string()))
    }
}

impl Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageCredentials::SharedKey { account_name, .. } => {
                write!(f, "SharedKey({account_name})")
            }
            StorageCredentials::Sas(_) => write!(f, "Sas"),
        }
    }
}

/// A storage account: its name, how to authenticate, and where its queue
/// service lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAccount {
    account_name: String,
    credentials: StorageCredentials,
    queue_endpoint: String,
}

impl StorageAccount {
    pub fn new(
        account_name: &str,
        credentials: StorageCredentials,
        endpoint_suffix: Option<&str>,
        use_https: bool,
    ) -> Result<Self, SinkError> {
        let account_name = account_name.trim();
        if account_name.is_empty() {
            return Err(SinkError::Configuration(
                "account name is required".to_string(),
            ));
        }
        let scheme = if use_https { "https" } else { "http" };
        let suffix = endpoint_suffix.unwrap_or(DEFAULT_ENDPOINT_SUFFIX);
        Ok(StorageAccount {
            account_name: account_name.to_string(),
            credentials,
            queue_endpoint: format!("{scheme}://{account_name}.queue.{suffix}"),
        })
    }

    /// Account addressed through an explicit queue service endpoint, e.g. an
    /// emulator or a private link host.
    pub fn with_queue_endpoint(
        account_name: &str,
        credentials: StorageCredentials,
        queue_endpoint: &str,
    ) -> Result<Self, SinkError> {
        let queue_endpoint = queue_endpoint.trim().trim_end_matches('/');
        if !(queue_endpoint.starts_with("http://") || queue_endpoint.starts_with("https://")) {
            return Err(SinkError::Configuration(format!(
                "queue endpoint must be an http(s) URL, got '{queue_endpoint}'"
            )));
        }
        Ok(StorageAccount {
            account_name: account_name.trim().to_string(),
            credentials,
            queue_endpoint: queue_endpoint.to_string(),
        })
    }

    /// Account authenticated with a shared access signature over https.
    pub fn from_sas(shared_access_signature: &str, account_name: &str) -> Result<Self, SinkError> {
        StorageAccount::new(
            account_name,
            StorageCredentials::sas(shared_access_signature)?,
            None,
            true,
        )
    }

    pub fn development_storage() -> Self {
        StorageAccount {
            account_name: DEV_STORE_ACCOUNT_NAME.to_string(),
            credentials: StorageCredentials::SharedKey {
                account_name: DEV_STORE_ACCOUNT_NAME.to_string(),
                key: base64::engine::general_purpose::STANDARD
                    .decode(DEV_STORE_ACCOUNT_KEY)
                    .unwrap_or_default(),
            },
            queue_endpoint: DEV_STORE_QUEUE_ENDPOINT.to_string(),
        }
    }

    /// Parses a storage connection string such as
    /// `DefaultEndpointsProtocol=https;AccountName=acct;AccountKey=...;EndpointSuffix=core.windows.net`.
    pub fn parse(connection_string: &str) -> Result<Self, SinkError> {
        connection_string.parse()
    }

    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    pub fn credentials(&self) -> &StorageCredentials {
        &self.credentials
    }

    pub fn queue_endpoint(&self) -> &str {
        &self.queue_endpoint
    }
}

#[derive(Default)]
struct ConnectionStringParts<'a> {
    use_development_storage: bool,
    protocol: Option<&'a str>,
    account_name: Option<&'a str>,
    account_key: Option<&'a str>,
    sas: Option<&'a str>,
    endpoint_suffix: Option<&'a str>,
    queue_endpoint: Option<&'a str>,
}

impl FromStr for StorageAccount {
    type Err = SinkError;

    fn from_str(connection_string: &str) -> Result<Self, Self::Err> {
        if connection_string.trim().is_empty() {
            return Err(SinkError::Configuration(
                "connection string is empty".to_string(),
            ));
        }

        let mut parts = ConnectionStringParts::default();
        for segment in connection_string.split(';').map(str::trim) {
            if segment.is_empty() {
                continue;
            }
            let Some((key, value)) = segment.split_once('=') else {
                return Err(SinkError::Configuration(format!(
                    "connection string segment '{segment}' is not a key=value pair"
                )));
            };
            let value = value.trim();
            match key.trim().to_ascii_lowercase().as_str() {
                "usedevelopmentstorage" => {
                    parts.use_development_storage = value.eq_ignore_ascii_case("true");
                }
                "defaultendpointsprotocol" => parts.protocol = Some(value),
                "accountname" => parts.account_name = Some(value),
                "accountkey" => parts.account_key = Some(value),
                "sharedaccesssignature" => parts.sas = Some(value),
                "endpointsuffix" => parts.endpoint_suffix = Some(value),
                "queueendpoint" => parts.queue_endpoint = Some(value),
                // Blob/table/file endpoints and other settings do not concern queues.
                _ => {}
            }
        }

        if parts.use_development_storage {
            return Ok(StorageAccount::development_storage());
        }

        let credentials = match (parts.account_key, parts.sas) {
            (Some(key), _) => {
                let account_name = parts.account_name.ok_or_else(|| {
                    SinkError::Configuration(
                        "connection string with AccountKey requires AccountName".to_string(),
                    )
                })?;
                StorageCredentials::shared_key(account_name, key)?
            }
            (None, Some(sas)) => StorageCredentials::sas(sas)?,
            (None, None) => {
                return Err(SinkError::Configuration(
                    "connection string must contain AccountKey or SharedAccessSignature"
                        .to_string(),
                ))
            }
        };

        if let Some(endpoint) = parts.queue_endpoint {
            return StorageAccount::with_queue_endpoint(
                parts.account_name.unwrap_or_default(),
                credentials,
                endpoint,
            );
        }

        let account_name = parts.account_name.ok_or_else(|| {
            SinkError::Configuration(
                "connection string requires AccountName or QueueEndpoint".to_string(),
            )
        })?;
        let use_https = match parts.protocol {
            None => true,
            Some(p) if p.eq_ignore_ascii_case("https") => true,
            Some(p) if p.eq_ignore_ascii_case("http") => false,
            Some(p) => {
                return Err(SinkError::Configuration(format!(
                    "unsupported DefaultEndpointsProtocol '{p}'"
                )))
            }
        };
        StorageAccount::new(account_name, credentials, parts.endpoint_suffix, use_https)
    }
}

/// Connection context for the sink: an account plus the transport used to
/// reach its queue service. Cheap to clone.
#[derive(Clone)]
pub struct QueueConnection {
    account: Arc<StorageAccount>,
    transport: Arc<dyn QueueTransport>,
}

impl QueueConnection {
    /// Connects through the default HTTP transport.
    pub fn new(account: StorageAccount) -> Result<Self, SinkError> {
        let transport = HttpQueueTransport::new(&account)?;
        Ok(QueueConnection::with_transport(account, Arc::new(transport)))
    }

    pub fn with_transport(account: StorageAccount, transport: Arc<dyn QueueTransport>) -> Self {
        QueueConnection {
            account: Arc::new(account),
            transport,
        }
    }

    pub fn create_queue_client(&self) -> QueueClient {
        QueueClient::new(Arc::clone(&self.transport))
    }
}

impl Debug for QueueConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueueConnection")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

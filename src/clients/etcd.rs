// calico-upgrade/src/clients/etcd.rs
use anyhow::Context;
use reqwest::{Certificate, Client, Identity, Method, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::fs;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::EtcdConfig;
use crate::errors::{AppError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const READY_KEY_PATH: &str = "v2/keys/calico/v1/Ready";
const KEY_NOT_FOUND: i64 = 100;

#[derive(Debug, Deserialize)]
struct EtcdErrorBody {
    #[serde(rename = "errorCode")]
    error_code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct KeysResponse {
    node: KeyNode,
}

#[derive(Debug, Deserialize)]
struct KeyNode {
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct HealthResponse {
    health: String,
}

/// HTTP connection to the first etcd endpoint that answered the version probe.
#[derive(Debug, Clone)]
pub struct EtcdConnection {
    http: Client,
    endpoint: Url,
    credentials: Option<(String, String)>,
}

impl EtcdConnection {
    /// Builds the HTTP client for `config` and probes each endpoint in order
    /// with `GET /version`, keeping the first one that answers.
    pub async fn connect(config: &EtcdConfig) -> Result<Self> {
        let http = build_http_client(config)?;
        let credentials = config
            .username
            .clone()
            .map(|user| (user, config.password.clone().unwrap_or_default()));

        let mut last_error = String::from("no endpoints configured");
        for endpoint in &config.endpoints {
            let connection = EtcdConnection {
                http: http.clone(),
                endpoint: endpoint.clone(),
                credentials: credentials.clone(),
            };
            match connection.probe().await {
                Ok(()) => {
                    debug!(endpoint = %endpoint, "etcd endpoint reachable");
                    return Ok(connection);
                }
                Err(e) => {
                    warn!(endpoint = %endpoint, error = %e, "etcd endpoint unreachable");
                    last_error = e.to_string();
                }
            }
        }

        Err(AppError::Unreachable {
            endpoints: config
                .endpoints
                .iter()
                .map(Url::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            reason: last_error,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.endpoint.join(path)?)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.credentials {
            Some((user, password)) => builder.basic_auth(user, Some(password)),
            None => builder,
        }
    }

    async fn probe(&self) -> Result<()> {
        let url = self.url("version")?;
        let response = self.request(Method::GET, url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(AppError::UnexpectedStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}

/// Calico v1 data store: etcd v2, accessed through the v2 keys API.
#[derive(Debug, Clone)]
pub struct EtcdV2Store {
    connection: EtcdConnection,
}

impl EtcdV2Store {
    pub fn new(connection: EtcdConnection) -> Self {
        EtcdV2Store { connection }
    }

    pub fn endpoint(&self) -> &Url {
        self.connection.endpoint()
    }

    /// Reads the v1 `Ready` flag. Returns `None` when the key has never been written.
    pub async fn ready(&self) -> Result<Option<bool>> {
        let url = self.connection.url(READY_KEY_PATH)?;
        let response = self
            .connection
            .request(Method::GET, url.clone())
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return match etcd_error(&url, response).await {
                AppError::Etcd {
                    code: KEY_NOT_FOUND,
                    ..
                } => Ok(None),
                other => Err(other),
            };
        }
        if !response.status().is_success() {
            return Err(etcd_error(&url, response).await);
        }

        let body: KeysResponse = response.json().await?;
        Ok(body.node.value.map(|value| value.trim() == "true"))
    }

    /// Sets the v1 `Ready` flag back to `true` so calico/node v2.x resumes processing.
    pub async fn restore_ready(&self) -> Result<()> {
        let url = self.connection.url(READY_KEY_PATH)?;
        let response = self
            .connection
            .request(Method::PUT, url.clone())
            .form(&[("value", "true")])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(etcd_error(&url, response).await);
        }
        debug!(endpoint = %self.endpoint(), "wrote v1 Ready flag");
        Ok(())
    }
}

/// Calico v3 data store: etcd v3.
#[derive(Debug, Clone)]
pub struct EtcdV3Store {
    connection: EtcdConnection,
}

impl EtcdV3Store {
    pub fn new(connection: EtcdConnection) -> Self {
        EtcdV3Store { connection }
    }

    pub fn endpoint(&self) -> &Url {
        self.connection.endpoint()
    }

    pub async fn healthy(&self) -> Result<bool> {
        let url = self.connection.url("health")?;
        let response = self.connection.request(Method::GET, url).send().await?;
        let status = response.status();
        let body: HealthResponse = response.json().await?;
        Ok(status.is_success() && body.health == "true")
    }
}

/// Turns a failed response into an error, preferring the etcd error body when there is one.
async fn etcd_error(url: &Url, response: Response) -> AppError {
    let status = response.status().as_u16();
    match response.json::<EtcdErrorBody>().await {
        Ok(body) => AppError::Etcd {
            code: body.error_code,
            message: body.message,
        },
        Err(_) => AppError::UnexpectedStatus {
            url: url.to_string(),
            status,
        },
    }
}

fn build_http_client(config: &EtcdConfig) -> Result<Client> {
    let mut builder = Client::builder().timeout(REQUEST_TIMEOUT);

    if let Some(ca_file) = &config.ca_cert_file {
        let pem = fs::read(ca_file)
            .with_context(|| format!("Failed to read etcdCACertFile {}", ca_file.display()))?;
        builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
    }

    // Client keys must be PKCS#8 PEM.
    if let (Some(cert_file), Some(key_file)) = (&config.cert_file, &config.key_file) {
        let cert = fs::read(cert_file)
            .with_context(|| format!("Failed to read etcdCertFile {}", cert_file.display()))?;
        let key = fs::read(key_file)
            .with_context(|| format!("Failed to read etcdKeyFile {}", key_file.display()))?;
        builder = builder.identity(Identity::from_pkcs8_pem(&cert, &key)?);
    }

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config() -> anyhow::Result<EtcdConfig> {
        Ok(EtcdConfig {
            endpoints: vec![Url::parse("http://127.0.0.1:1")?],
            username: None,
            password: None,
            key_file: None,
            cert_file: None,
            ca_cert_file: None,
        })
    }

    #[test]
    fn test_missing_ca_file_is_reported() -> anyhow::Result<()> {
        let config = EtcdConfig {
            ca_cert_file: Some(PathBuf::from("/nonexistent/etcd-ca.pem")),
            ..config()?
        };

        let err = build_http_client(&config).unwrap_err();
        assert!(err.to_string().contains("Failed to read etcdCACertFile /nonexistent/etcd-ca.pem"));
        Ok(())
    }

    #[test]
    fn test_missing_client_cert_is_reported() -> anyhow::Result<()> {
        let config = EtcdConfig {
            cert_file: Some(PathBuf::from("/nonexistent/etcd-cert.pem")),
            key_file: Some(PathBuf::from("/nonexistent/etcd-key.pem")),
            ..config()?
        };

        let err = build_http_client(&config).unwrap_err();
        assert!(err.to_string().contains("Failed to read etcdCertFile"));
        Ok(())
    }

    #[test]
    fn test_invalid_ca_pem_is_rejected() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let ca = dir.path().join("ca.pem");
        fs::write(&ca, "not a certificate")?;
        let config = EtcdConfig {
            ca_cert_file: Some(ca),
            ..config()?
        };

        assert!(matches!(build_http_client(&config), Err(AppError::Reqwest(_))));
        Ok(())
    }

    #[tokio::test]
    async fn test_connect_fails_before_probing_when_ca_is_missing() -> anyhow::Result<()> {
        let config = EtcdConfig {
            ca_cert_file: Some(PathBuf::from("/nonexistent/etcd-ca.pem")),
            ..config()?
        };

        let err = EtcdConnection::connect(&config).await.unwrap_err();
        assert!(matches!(err, AppError::Anyhow(_)));
        Ok(())
    }
}

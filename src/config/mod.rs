// calico-upgrade/src/config/mod.rs
use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

pub const DEFAULT_CONFIG_PATH_V3: &str = "/etc/calico/apiconfigv3.cfg";
pub const DEFAULT_CONFIG_PATH_V1: &str = "/etc/calico/apiconfigv1.cfg";
pub const DEFAULT_ETCD_ENDPOINT: &str = "http://127.0.0.1:2379";

const KUBERNETES_DATASTORE: &str = "kubernetes";

/// Which Calico API surface a config file describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V3,
    V1,
}

impl ApiVersion {
    fn api_version(self) -> &'static str {
        match self {
            ApiVersion::V3 => "projectcalico.org/v3",
            ApiVersion::V1 => "v1",
        }
    }

    fn kind(self) -> &'static str {
        match self {
            ApiVersion::V3 => "CalicoAPIConfig",
            ApiVersion::V1 => "calicoApiConfig",
        }
    }

    /// Prefix applied to environment variable names when falling back to the environment.
    fn env_prefix(self) -> &'static str {
        match self {
            ApiVersion::V3 => "",
            ApiVersion::V1 => "APIV1_",
        }
    }

    fn etcd_datastore(self) -> &'static str {
        match self {
            ApiVersion::V3 => "etcdv3",
            ApiVersion::V1 => "etcdv2",
        }
    }

    pub fn default_path(self) -> &'static str {
        match self {
            ApiVersion::V3 => DEFAULT_CONFIG_PATH_V3,
            ApiVersion::V1 => DEFAULT_CONFIG_PATH_V1,
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiVersion::V3 => write!(f, "Calico v3 API"),
            ApiVersion::V1 => write!(f, "Calico v1 API"),
        }
    }
}

// Structs for deserializing apiconfig files
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawApiConfig {
    pub api_version: Option<String>,
    pub kind: Option<String>,
    #[serde(default)]
    pub spec: RawApiSpec,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawApiSpec {
    pub datastore_type: Option<String>,
    pub etcd_endpoints: Option<String>,
    pub etcd_username: Option<String>,
    pub etcd_password: Option<String>,
    pub etcd_key_file: Option<PathBuf>,
    pub etcd_cert_file: Option<PathBuf>,
    #[serde(rename = "etcdCACertFile")]
    pub etcd_ca_cert_file: Option<PathBuf>,
    pub kubeconfig: Option<PathBuf>,
    #[serde(rename = "k8sAPIEndpoint")]
    pub k8s_api_endpoint: Option<String>,
}

impl RawApiSpec {
    /// Builds a spec from environment-style variables, e.g. `ETCD_ENDPOINTS` or
    /// `APIV1_ETCD_ENDPOINTS` depending on `prefix`. Empty values count as unset.
    pub fn from_env_with(prefix: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| {
            lookup(&format!("{}{}", prefix, name)).filter(|value| !value.trim().is_empty())
        };

        RawApiSpec {
            datastore_type: var("DATASTORE_TYPE"),
            etcd_endpoints: var("ETCD_ENDPOINTS"),
            etcd_username: var("ETCD_USERNAME"),
            etcd_password: var("ETCD_PASSWORD"),
            etcd_key_file: var("ETCD_KEY_FILE").map(PathBuf::from),
            etcd_cert_file: var("ETCD_CERT_FILE").map(PathBuf::from),
            etcd_ca_cert_file: var("ETCD_CA_CERT_FILE").map(PathBuf::from),
            kubeconfig: var("KUBECONFIG").map(PathBuf::from),
            k8s_api_endpoint: var("K8S_API_ENDPOINT"),
        }
    }
}

// Application's internal configuration structs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Environment,
}

#[derive(Debug, Clone)]
pub struct EtcdConfig {
    pub endpoints: Vec<Url>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub key_file: Option<PathBuf>,
    pub cert_file: Option<PathBuf>,
    pub ca_cert_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct KubeConfig {
    pub kubeconfig: Option<PathBuf>,
    pub api_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub enum DatastoreConfig {
    Etcd(EtcdConfig),
    Kubernetes(KubeConfig),
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub version: ApiVersion,
    pub source: ConfigSource,
    pub datastore: DatastoreConfig,
}

impl ApiConfig {
    /// Loads the connection configuration for one API version.
    ///
    /// The file at `path` is used when it exists. When it does not and `path` is
    /// the well-known default location, the configuration is taken from the
    /// environment instead. Any other missing path is an error.
    pub fn load(path: &Path, version: ApiVersion) -> Result<Self> {
        Self::load_with_env(path, version, |name| std::env::var(name).ok())
    }

    fn load_with_env(
        path: &Path,
        version: ApiVersion,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path).with_context(|| {
                format!("Failed to read {} config file at {}", version, path.display())
            })?;
            let raw = parse_api_config(&content).with_context(|| {
                format!("Failed to parse {} config file at {}", version, path.display())
            })?;
            return Self::from_raw(raw, version, ConfigSource::File(path.to_path_buf()));
        }

        if path == Path::new(version.default_path()) {
            let spec = RawApiSpec::from_env_with(version.env_prefix(), lookup);
            return Self::from_spec(spec, version, ConfigSource::Environment);
        }

        bail!("{} config file not found at {}", version, path.display())
    }

    pub fn from_raw(raw: RawApiConfig, version: ApiVersion, source: ConfigSource) -> Result<Self> {
        let api_version = raw.api_version.as_deref().unwrap_or_default();
        if api_version != version.api_version() {
            bail!(
                "invalid {} config: expected apiVersion '{}', found '{}'",
                version,
                version.api_version(),
                api_version
            );
        }

        let kind = raw.kind.as_deref().unwrap_or_default();
        if kind != version.kind() {
            bail!(
                "invalid {} config: expected kind '{}', found '{}'",
                version,
                version.kind(),
                kind
            );
        }

        Self::from_spec(raw.spec, version, source)
    }

    fn from_spec(spec: RawApiSpec, version: ApiVersion, source: ConfigSource) -> Result<Self> {
        let datastore_type = spec
            .datastore_type
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(version.etcd_datastore())
            .to_string();

        let datastore = if datastore_type == KUBERNETES_DATASTORE {
            DatastoreConfig::Kubernetes(KubeConfig {
                kubeconfig: spec.kubeconfig,
                api_endpoint: spec.k8s_api_endpoint,
            })
        } else if datastore_type == version.etcd_datastore() {
            DatastoreConfig::Etcd(EtcdConfig::from_spec(spec)?)
        } else {
            bail!(
                "datastoreType '{}' is not supported by the {}; expected '{}' or '{}'",
                datastore_type,
                version,
                version.etcd_datastore(),
                KUBERNETES_DATASTORE
            );
        };

        Ok(ApiConfig {
            version,
            source,
            datastore,
        })
    }

    pub fn is_kdd(&self) -> bool {
        matches!(self.datastore, DatastoreConfig::Kubernetes(_))
    }
}

impl EtcdConfig {
    fn from_spec(spec: RawApiSpec) -> Result<Self> {
        match (&spec.etcd_cert_file, &spec.etcd_key_file) {
            (Some(_), None) | (None, Some(_)) => {
                bail!("etcdCertFile and etcdKeyFile must be supplied together")
            }
            _ => {}
        }

        Ok(EtcdConfig {
            endpoints: parse_endpoints(spec.etcd_endpoints.as_deref())?,
            username: spec.etcd_username,
            password: spec.etcd_password,
            key_file: spec.etcd_key_file,
            cert_file: spec.etcd_cert_file,
            ca_cert_file: spec.etcd_ca_cert_file,
        })
    }
}

/// Parses an apiconfig document. JSON is recognised by its leading brace,
/// everything else is read as YAML.
fn parse_api_config(content: &str) -> Result<RawApiConfig> {
    if content.trim_start().starts_with('{') {
        serde_json::from_str(content).context("Config is not valid JSON")
    } else {
        serde_yaml::from_str(content).context("Config is not valid YAML")
    }
}

/// Parses a comma separated endpoint list, defaulting to the local etcd.
fn parse_endpoints(list: Option<&str>) -> Result<Vec<Url>> {
    let list = list
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_ETCD_ENDPOINT);

    let endpoints = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|endpoint| {
            let url = Url::parse(endpoint)
                .with_context(|| format!("Invalid etcd endpoint '{}'", endpoint))?;
            match url.scheme() {
                "http" | "https" => Ok(url),
                other => Err(anyhow!(
                    "Invalid etcd endpoint '{}': unsupported scheme '{}'",
                    endpoint,
                    other
                )),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    if endpoints.is_empty() {
        bail!("etcdEndpoints does not contain any endpoints");
    }
    Ok(endpoints)
}

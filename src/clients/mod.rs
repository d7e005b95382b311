// calico-upgrade/src/clients/mod.rs
pub(crate) mod etcd;

use std::path::Path;
use tracing::info;

use crate::config::{ApiConfig, ApiVersion, DatastoreConfig, KubeConfig};
use crate::errors::Result;
use crate::migrator::{Migrator, UpgradeMigrator};
use etcd::{EtcdConnection, EtcdV2Store, EtcdV3Store};

/// Capability query: is this client backed by the Kubernetes API datastore (KDD)?
pub trait BackendKind {
    fn is_kdd(&self) -> bool;
}

#[derive(Debug, Clone)]
pub enum ClientV3 {
    Kdd(KubeConfig),
    Etcd(EtcdV3Store),
}

#[derive(Debug, Clone)]
pub enum ClientV1 {
    Kdd(KubeConfig),
    Etcd(EtcdV2Store),
}

impl BackendKind for ClientV1 {
    fn is_kdd(&self) -> bool {
        matches!(self, ClientV1::Kdd(_))
    }
}

/// Source of the two API clients and of the migrator that operates on them.
pub trait Datastore {
    type ClientV3;
    type ClientV1: BackendKind;
    type Migrator: Migrator;

    async fn load_clients(
        &self,
        config_v3: &Path,
        config_v1: &Path,
    ) -> Result<(Self::ClientV3, Self::ClientV1)>;

    fn migrator(&self, client_v3: Self::ClientV3, client_v1: Self::ClientV1) -> Self::Migrator;
}

/// The Calico datastore described by the v3 and v1 apiconfig files.
pub struct CalicoDatastore;

impl Datastore for CalicoDatastore {
    type ClientV3 = ClientV3;
    type ClientV1 = ClientV1;
    type Migrator = UpgradeMigrator;

    async fn load_clients(&self, config_v3: &Path, config_v1: &Path) -> Result<(ClientV3, ClientV1)> {
        load_clients(config_v3, config_v1).await
    }

    fn migrator(&self, client_v3: ClientV3, client_v1: ClientV1) -> UpgradeMigrator {
        UpgradeMigrator::new(client_v3, client_v1)
    }
}

/// Loads both apiconfig files and connects to the datastores they describe.
///
/// Kubernetes clients are built without contacting the cluster; etcd clients
/// are only returned once an endpoint has answered.
pub async fn load_clients(config_v3: &Path, config_v1: &Path) -> Result<(ClientV3, ClientV1)> {
    let api_v3 = ApiConfig::load(config_v3, ApiVersion::V3)?;
    info!(source = ?api_v3.source, kdd = api_v3.is_kdd(), "loaded {} configuration", api_v3.version);
    let api_v1 = ApiConfig::load(config_v1, ApiVersion::V1)?;
    info!(source = ?api_v1.source, kdd = api_v1.is_kdd(), "loaded {} configuration", api_v1.version);

    let client_v3 = match api_v3.datastore {
        DatastoreConfig::Kubernetes(kube) => ClientV3::Kdd(kube),
        DatastoreConfig::Etcd(etcd) => {
            ClientV3::Etcd(EtcdV3Store::new(EtcdConnection::connect(&etcd).await?))
        }
    };
    let client_v1 = match api_v1.datastore {
        DatastoreConfig::Kubernetes(kube) => ClientV1::Kdd(kube),
        DatastoreConfig::Etcd(etcd) => {
            ClientV1::Etcd(EtcdV2Store::new(EtcdConnection::connect(&etcd).await?))
        }
    };

    Ok((client_v3, client_v1))
}

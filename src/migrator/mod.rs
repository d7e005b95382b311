// calico-upgrade/src/migrator/mod.rs
use tracing::{debug, info, warn};

use crate::clients::{ClientV1, ClientV3};
use crate::errors::{AppError, Result};
use crate::utils::feedback::Feedback;

/// The data-migration primitive. Progress is reported through `display`.
pub trait Migrator {
    async fn abort(&mut self, display: &mut dyn Feedback) -> Result<()>;
}

/// Migrator for the Calico v1 to v3 data upgrade.
pub struct UpgradeMigrator {
    client_v3: ClientV3,
    client_v1: ClientV1,
}

impl UpgradeMigrator {
    pub fn new(client_v3: ClientV3, client_v1: ClientV1) -> Self {
        UpgradeMigrator {
            client_v3,
            client_v1,
        }
    }

    /// Reports on the v3 datastore. Never fails: an unhealthy v3 store is a
    /// common reason to abort in the first place.
    async fn check_v3_health(&self, display: &mut dyn Feedback) {
        match &self.client_v3 {
            ClientV3::Kdd(kube) => {
                debug!(kubeconfig = ?kube.kubeconfig, "v3 client uses the Kubernetes datastore");
            }
            ClientV3::Etcd(store) => match store.healthy().await {
                Ok(true) => debug!(endpoint = %store.endpoint(), "Calico v3 datastore is healthy"),
                Ok(false) => {
                    warn!(endpoint = %store.endpoint(), "Calico v3 datastore is unhealthy");
                    display.bullet("warning: the Calico v3 datastore reports that it is unhealthy");
                }
                Err(e) => {
                    warn!(endpoint = %store.endpoint(), error = %e, "Calico v3 health check failed");
                    display.bullet(&format!(
                        "warning: unable to check the health of the Calico v3 datastore: {}",
                        e
                    ));
                }
            },
        }
    }
}

impl Migrator for UpgradeMigrator {
    /// Aborts the upgrade by re-enabling Calico networking through the v1 API.
    ///
    /// Writing the v1 `Ready` flag is idempotent, so re-running after a
    /// successful abort rewrites the same value.
    async fn abort(&mut self, display: &mut dyn Feedback) -> Result<()> {
        let store = match &self.client_v1 {
            ClientV1::Kdd(kube) => {
                info!(
                    kubeconfig = ?kube.kubeconfig,
                    api_endpoint = ?kube.api_endpoint,
                    "Kubernetes datastore has no v1 data to restore"
                );
                return Ok(());
            }
            ClientV1::Etcd(store) => store,
        };

        display.msg("Aborting the upgrade");
        self.check_v3_health(display).await;

        match store.ready().await {
            Ok(Some(true)) => display.bullet("Calico networking for v2.x is not suspended"),
            Ok(_) => display.bullet("Calico networking for v2.x is currently suspended"),
            Err(e) => {
                return Err(AppError::Migration(format!(
                    "unable to read the Calico v1 Ready flag: {}",
                    e
                )));
            }
        }

        display.bullet("re-enabling Calico networking using the v1 API");
        store.restore_ready().await.map_err(|e| {
            AppError::Migration(format!(
                "unable to re-enable Calico networking using the v1 API: {}",
                e
            ))
        })?;

        info!(endpoint = %store.endpoint(), "v1 Ready flag restored");
        Ok(())
    }
}

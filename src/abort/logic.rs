// calico-upgrade/src/abort/logic.rs
use tracing::{error, info, warn};

use crate::cli::AbortOptions;
use crate::clients::{BackendKind, Datastore};
use crate::migrator::Migrator;
use crate::utils::feedback::Feedback;
use crate::utils::prompt::Confirm;

const KDD_NOT_REQUIRED: &str = "It is not necessary to abort the upgrade when using Kubernetes API \
                                as the datastore.  No action was taken.";

const ABORT_ADVISORY: &str = "You are about to abort the upgrade process to Calico v3. At this \
                              point, all calico/node instances and orchestrator plugins (e.g. CNI) \
                              should be running Calico v2.x.";

/// How an abort run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortCompletion {
    /// The migrator aborted the upgrade.
    Aborted,
    /// The v1 datastore is the Kubernetes API; there is nothing to abort.
    NotRequired,
    /// The operator did not confirm.
    Cancelled,
    ClientsUnavailable,
    Failed,
}

impl AbortCompletion {
    pub fn exit_code(self) -> u8 {
        match self {
            AbortCompletion::Aborted | AbortCompletion::NotRequired | AbortCompletion::Cancelled => 0,
            AbortCompletion::ClientsUnavailable | AbortCompletion::Failed => 1,
        }
    }
}

/// Runs the abort workflow against `datastore`.
///
/// 1. Loads the v3 and v1 clients.
/// 2. Stops early when the v1 backend is the Kubernetes API datastore.
/// 3. Shows the advisory and, unless `no_prompts` is set, waits for confirmation.
/// 4. Invokes the migrator's abort exactly once.
///
/// Every outcome is reported through `display`; nothing here exits the process.
pub async fn perform_abort<D: Datastore>(
    datastore: &D,
    options: &AbortOptions,
    display: &mut dyn Feedback,
    prompt: &mut dyn Confirm,
) -> AbortCompletion {
    info!(
        apiconfigv3 = %options.apiconfig_v3.display(),
        apiconfigv1 = %options.apiconfig_v1.display(),
        no_prompts = options.no_prompts,
        "starting upgrade abort"
    );

    let (client_v3, client_v1) = match datastore
        .load_clients(&options.apiconfig_v3, &options.apiconfig_v1)
        .await
    {
        Ok(clients) => clients,
        Err(e) => {
            error!(error = %e, "failed to load Calico API clients");
            display.separator();
            display.msg("Failed to abort the upgrade.");
            display.bullet(&format!("Error accessing the Calico API: {:#}", e));
            display.new_line();
            return AbortCompletion::ClientsUnavailable;
        }
    };

    if client_v1.is_kdd() {
        info!("v1 datastore is the Kubernetes API, nothing to abort");
        display.separator();
        display.msg(KDD_NOT_REQUIRED);
        display.new_line();
        return AbortCompletion::NotRequired;
    }

    let mut migrator = datastore.migrator(client_v3, client_v1);

    display.new_line();
    display.msg(ABORT_ADVISORY);
    display.new_line();

    if !options.no_prompts {
        match prompt.confirm_proceed() {
            Ok(true) => info!("operator confirmed the abort"),
            Ok(false) => {
                info!("operator declined the abort");
                display.new_line();
                display.msg("User cancelled. Exiting.");
                return AbortCompletion::Cancelled;
            }
            Err(e) => {
                warn!(error = %e, "unable to read confirmation");
                display.new_line();
                display.msg("User cancelled. Exiting.");
                return AbortCompletion::Cancelled;
            }
        }
    }

    match migrator.abort(display).await {
        Ok(()) => {
            info!("upgrade aborted");
            display.separator();
            display.msg("Successfully aborted the upgrade process.");
            display.new_line();
            AbortCompletion::Aborted
        }
        Err(e) => {
            error!(error = %e, "upgrade abort failed");
            display.separator();
            display.msg("Failed to abort the upgrade process.");
            display.bullet(&format!("{:#}", e));
            display.new_line();
            AbortCompletion::Failed
        }
    }
}

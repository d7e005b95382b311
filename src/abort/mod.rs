// calico-upgrade/src/abort/mod.rs
pub(crate) mod logic;

use crate::cli::AbortOptions;
use crate::clients::CalicoDatastore;
use crate::utils::feedback::Console;
use crate::utils::prompt::TerminalPrompt;
use logic::AbortCompletion;

/// Public entry point for the abort process.
/// Wires the Calico datastore, stdout feedback and the terminal prompt into the controller.
pub async fn run_abort_flow(options: &AbortOptions) -> AbortCompletion {
    let mut display = Console::stdout();
    let mut prompt = TerminalPrompt::stdio();

    logic::perform_abort(&CalicoDatastore, options, &mut display, &mut prompt).await
}

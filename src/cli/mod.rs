// calico-upgrade/src/cli/mod.rs
use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use std::borrow::Cow;
use std::ffi::OsString;
use std::iter;
use std::path::PathBuf;

use crate::config::{DEFAULT_CONFIG_PATH_V1, DEFAULT_CONFIG_PATH_V3};

const ABORT_LONG_ABOUT: &str = "\
Abort an upgrade that was started using 'calico-upgrade start'. In the event
of a failure that requires an explicit abort, the start command indicates
that the abort command should be executed.

Set the Calico datastore access information in the environment variables or
supply details in a config file. Environment variables are only consulted when
the default config file locations do not exist; the v1 API variables carry an
APIV1_ prefix (e.g. APIV1_ETCD_ENDPOINTS).";

const ABORT_EXAMPLE: &str = "\
Example:
  calico-upgrade abort --apiconfigv3=/path/to/v3/config --apiconfigv1=/path/to/v1/config";

#[derive(Parser, Debug)]
#[command(name = "calico-upgrade")]
#[command(about = "Manage the upgrade of Calico data from the v1 API to the v3 API")]
#[command(version)]
pub struct Cli {
    /// Set the log level
    #[arg(
        short = 'l',
        long,
        global = true,
        default_value = "off",
        value_parser = ["off", "error", "warn", "info", "debug", "trace"]
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Abort an upgrade that was started using 'calico-upgrade start'
    #[command(long_about = ABORT_LONG_ABOUT, after_help = ABORT_EXAMPLE)]
    Abort(AbortOptions),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct AbortOptions {
    /// Path to the file containing connection configuration in YAML or JSON format for the Calico v3 API
    #[arg(long = "apiconfigv3", value_name = "V3_APICONFIG", default_value = DEFAULT_CONFIG_PATH_V3)]
    pub apiconfig_v3: PathBuf,

    /// Path to the file containing connection configuration in YAML or JSON format for the Calico v1 API
    #[arg(long = "apiconfigv1", value_name = "V1_APICONFIG", default_value = DEFAULT_CONFIG_PATH_V1)]
    pub apiconfig_v1: PathBuf,

    /// Do not prompt the user. We do not recommend use of this option unless necessary
    #[arg(long = "no-prompts")]
    pub no_prompts: bool,
}

/// Result of resolving the command line.
#[derive(Debug)]
pub enum Invocation {
    Run(Cli),
    /// Nothing left to do; exit with this status.
    Exit(u8),
}

/// Parses the raw arguments. Help and version output exit 0; any parse error
/// prints a one-line hint to stderr and exits 1.
pub fn resolve<I, T>(args: I) -> Invocation
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let args: Vec<OsString> = args.into_iter().map(Into::into).collect();

    match Cli::try_parse_from(args.clone()) {
        Ok(cli) => Invocation::Run(cli),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                let _ = err.print();
                Invocation::Exit(0)
            }
            _ => {
                eprintln!("{}", usage_hint(&args));
                Invocation::Exit(1)
            }
        },
    }
}

fn usage_hint(args: &[OsString]) -> String {
    let invocation = iter::once(Cow::Borrowed("calico-upgrade"))
        .chain(args.iter().skip(1).map(|arg| arg.to_string_lossy()))
        .collect::<Vec<_>>()
        .join(" ");
    format!(
        "Invalid option: '{}'. Use flag '--help' to read about a specific subcommand.",
        invocation
    )
}

// SPDX-FileCopyrightText: 2026 PwdGuard Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! PwdGuard - native messaging host for the PwdGuard browser extension.
//!
//! Browsers start this binary with the extension origin as its only
//! argument, which selects the `host` subcommand. The other subcommands
//! inspect and maintain the vault from a terminal.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod credentials;
mod host;
mod manifest;
mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pwdguard_config::PwdGuardConfig;

/// PwdGuard - native messaging host for the PwdGuard browser extension.
#[derive(Parser, Debug)]
#[command(
    name = "pwdguard",
    version,
    about,
    long_about = None,
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Arguments the browser passes when it launches the host (the caller's
    /// origin, or the manifest path and extension id on Firefox).
    #[arg(hide = true, num_args = 0..)]
    launch_args: Vec<String>,

    /// Native window handle Chrome passes on Windows.
    #[arg(long = "parent-window", hide = true)]
    parent_window: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the browser over stdin/stdout (the default).
    Host,
    /// List stored credentials, newest first. Passwords are never shown.
    List {
        /// Only show credentials for this domain.
        #[arg(long)]
        domain: Option<String>,
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Delete one stored credential.
    Delete {
        /// Domain the credential belongs to.
        domain: String,
        /// Record id, as shown by `pwdguard list`.
        id: String,
    },
    /// Show vault locations and totals.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Print the native messaging manifest browsers use to find this host.
    Manifest {
        /// Chrome extension id allowed to connect.
        #[arg(long)]
        extension_id: String,
        /// Host executable path written into the manifest. Defaults to this
        /// binary.
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> PwdGuardConfig {
    let loaded = match path {
        Some(path) => pwdguard_config::load_and_validate_path(path),
        None => pwdguard_config::load_and_validate(),
    };
    match loaded {
        Ok(config) => config,
        Err(errors) => {
            pwdguard_config::render_errors(&errors);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref());

    let result = match cli.command {
        None | Some(Commands::Host) => {
            let result =
                host::run_host(&config, &cli.launch_args, cli.parent_window.as_deref()).await;
            if result.is_ok() {
                // A blocked stdin read cannot be cancelled; leave without
                // waiting for the runtime to join it.
                std::process::exit(0);
            }
            result
        }
        Some(Commands::List { domain, json }) => {
            credentials::run_list(&config, domain.as_deref(), json)
        }
        Some(Commands::Delete { domain, id }) => credentials::run_delete(&config, &domain, &id),
        Some(Commands::Status { json }) => status::run_status(&config, json),
        Some(Commands::Manifest { extension_id, path }) => {
            manifest::run_manifest(&extension_id, path)
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(not(target_env = "msvc"))]
    fn jemalloc_is_active() {
        // Only jemalloc supports advancing the stats epoch.
        use tikv_jemalloc_ctl::{epoch, stats};
        epoch::advance().unwrap();
        let allocated = stats::allocated::read().unwrap();
        assert!(allocated > 0, "jemalloc should report non-zero allocation");
    }

    #[test]
    fn default_config_validates() {
        let config = pwdguard_config::load_and_validate_str("").unwrap();
        assert_eq!(config.host.log_level, "info");
    }

    #[test]
    fn no_arguments_selects_host() {
        let cli = Cli::try_parse_from(["pwdguard"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.launch_args.is_empty());
    }

    #[test]
    fn chrome_origin_argument_selects_host() {
        let cli = Cli::try_parse_from([
            "pwdguard",
            "chrome-extension://abcdefghijklmnopabcdefghijklmnop/",
            "--parent-window=0",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(
            cli.launch_args,
            vec!["chrome-extension://abcdefghijklmnopabcdefghijklmnop/"]
        );
        assert_eq!(cli.parent_window.as_deref(), Some("0"));
    }

    #[test]
    fn firefox_launch_arguments_select_host() {
        let cli = Cli::try_parse_from([
            "pwdguard",
            "/usr/lib/mozilla/native-messaging-hosts/com.pwdguard.native.json",
            "pwdguard@example.org",
        ])
        .unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.launch_args.len(), 2);
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["pwdguard", "delete", "example.com", "abc123"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Delete { ref domain, ref id }) if domain == "example.com" && id == "abc123"
        ));

        let cli = Cli::try_parse_from(["pwdguard", "list", "--domain", "example.com"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::List { domain: Some(ref d), json: false }) if d == "example.com"
        ));

        let cli = Cli::try_parse_from(["pwdguard", "manifest", "--extension-id", "abc"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Manifest { .. })));
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["pwdguard", "status", "--config", "/tmp/pg.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/pg.toml")));
        assert!(matches!(cli.command, Some(Commands::Status { json: false })));
    }
}

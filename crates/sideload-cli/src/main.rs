mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::install::InstallOptions;
use commands::{EXIT_FAILURE, EXIT_MANIFEST_ERROR};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "sideload",
    version,
    about = "Download catalog packages and hand them to the host installer"
)]
struct Cli {
    /// Path to the sideload manifest (settings and catalog).
    #[arg(long, default_value = "sideload.toml", global = true)]
    manifest: String,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List catalog items.
    List,
    /// Show one catalog item and where it would be downloaded.
    Show {
        /// Catalog item ID.
        id: String,
    },
    /// Download items, hand them to the installer and wait for the install.
    Install {
        /// Catalog item IDs; several run concurrently.
        #[arg(required = true)]
        ids: Vec<String>,
        /// Launch each package once it is installed.
        #[arg(long, default_value_t = false)]
        auto_launch: bool,
        /// Do not ask before writing to the downloads directory.
        #[arg(short, long, default_value_t = false)]
        yes: bool,
        /// Host backend (overrides the manifest).
        #[arg(long)]
        backend: Option<String>,
        /// Raise a desktop notification when each item finishes.
        #[arg(long, default_value_t = false)]
        notify: bool,
    },
    /// Check whether an item's package is installed (exit 0 if it is).
    Check {
        /// Catalog item ID.
        id: String,
        /// Host backend (overrides the manifest).
        #[arg(long)]
        backend: Option<String>,
    },
    /// Launch an installed item's package.
    Launch {
        /// Catalog item ID.
        id: String,
        /// Host backend (overrides the manifest).
        #[arg(long)]
        backend: Option<String>,
    },
    /// Run diagnostic checks on the manifest and host.
    Doctor {
        /// Host backend (overrides the manifest).
        #[arg(long)]
        backend: Option<String>,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SIDELOAD_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let manifest = sideload_core::expand_tilde(&cli.manifest);
    let json_output = cli.json;

    let result = match cli.command {
        Commands::List => commands::list::run(&manifest, json_output),
        Commands::Show { id } => commands::show::run(&manifest, &id, json_output),
        Commands::Install {
            ids,
            auto_launch,
            yes,
            backend,
            notify,
        } => commands::install::run(
            &manifest,
            &ids,
            &InstallOptions {
                auto_launch,
                yes,
                backend,
                notify,
            },
            json_output,
        ),
        Commands::Check { id, backend } => {
            commands::check::run(&manifest, &id, backend.as_deref(), json_output)
        }
        Commands::Launch { id, backend } => {
            commands::launch::run(&manifest, &id, backend.as_deref(), json_output)
        }
        Commands::Doctor { backend } => {
            commands::doctor::run(&manifest, backend.as_deref(), json_output)
        }
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            let code = if msg.starts_with("manifest error:") {
                EXIT_MANIFEST_ERROR
            } else {
                EXIT_FAILURE
            };
            ExitCode::from(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn install_requires_an_id() {
        assert!(Cli::try_parse_from(["sideload", "install"]).is_err());
        let cli = Cli::try_parse_from(["sideload", "install", "a", "b", "--yes"]).unwrap();
        match cli.command {
            Commands::Install { ids, yes, .. } => {
                assert_eq!(ids, ["a", "b"]);
                assert!(yes);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn manifest_flag_is_global() {
        let cli = Cli::try_parse_from(["sideload", "list", "--manifest", "other.toml"]).unwrap();
        assert_eq!(cli.manifest, "other.toml");
    }
}

//! Claude Focus Server
//!
//! Receives Slack button clicks and thread replies and turns them into
//! terminal focus and keystrokes for the matching Claude session.

mod activity;
mod adapters;
mod auth;
mod cmd_focus;
mod cmd_sessions;
mod cmd_status;
mod config;
mod dispatcher;
mod error;
mod forwarder;
mod logging;
mod paths;
mod process;
mod registry;
mod ssh;
mod state;
mod threads;
mod webhook;

#[cfg(test)]
mod test_support;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::{ConfigOverrides, FocusConfig};
use crate::state::AppState;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "claude-focus-server")]
#[command(about = "Focus and type into Claude terminal sessions from Slack")]
#[command(version)]
struct Cli {
    /// Data directory (default: $CLAUDE_FOCUS_DATA_DIR, then ~/.claude-focus)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the webhook receiver
    Start {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:4000")]
        bind: SocketAddr,

        /// Verify X-Slack-Signature on every webhook
        #[arg(long, env = "SLACK_SIGNING_SECRET", hide_env_values = true)]
        signing_secret: Option<String>,

        /// Path to the macOS focus helper
        #[arg(long, env = "CLAUDE_FOCUS_HELPER")]
        helper_path: Option<PathBuf>,
    },

    /// Focus a session by URL, the same way a Slack button would
    Focus {
        /// A claude-focus:// URL, optionally url:-prefixed or percent-encoded
        url: String,

        /// focus, 1, 2, continue or push
        #[arg(long, default_value = "focus")]
        action: String,

        /// Literal text to type instead of the action's input
        #[arg(long)]
        text: Option<String>,

        /// Path to the macOS focus helper
        #[arg(long, env = "CLAUDE_FOCUS_HELPER")]
        helper_path: Option<PathBuf>,
    },

    /// List registered sessions
    Sessions {
        /// Only sessions registered from this host
        #[arg(long)]
        hostname: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show data dir, adapters and server health
    Status {
        /// Address the server was started with
        #[arg(long, default_value = "127.0.0.1:4000")]
        bind: SocketAddr,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let data_dir = paths::resolve_data_dir(cli.data_dir.as_deref())?;

    match cli.command {
        Commands::Start {
            bind,
            signing_secret,
            helper_path,
        } => {
            start(
                data_dir,
                bind,
                ConfigOverrides {
                    helper_path,
                    signing_secret,
                },
            )
            .await
        }
        Commands::Focus {
            url,
            action,
            text,
            helper_path,
        } => {
            logging::init_cli_logging();
            let config = FocusConfig::resolve(
                &data_dir,
                ConfigOverrides {
                    helper_path,
                    signing_secret: None,
                },
            );
            cmd_focus::run(Arc::new(config), &url, &action, text.as_deref()).await
        }
        Commands::Sessions { hostname, json } => {
            logging::init_cli_logging();
            cmd_sessions::run(&data_dir, hostname, json)
        }
        Commands::Status { bind } => {
            logging::init_cli_logging();
            cmd_status::run(&data_dir, bind).await
        }
    }
}

async fn start(
    data_dir: PathBuf,
    bind: SocketAddr,
    overrides: ConfigOverrides,
) -> anyhow::Result<()> {
    paths::ensure_dirs(&data_dir)?;
    let logging = logging::init_logging(&paths::log_dir(&data_dir))?;
    let _guard = logging.guard;

    info!(
        component = "server",
        event = "server.starting",
        version = VERSION,
        run_id = %logging.run_id,
        bind = %bind,
    );

    let config = Arc::new(FocusConfig::resolve(&data_dir, overrides));
    let state = Arc::new(AppState::new(config));
    let app = webhook::router(state);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!(
        component = "server",
        event = "server.listening",
        bind = %bind,
    );
    axum::serve(listener, app).await?;

    Ok(())
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
    fn data_dir_env_is_left_to_path_resolution() {
        let command = Cli::command();
        let data_dir = command
            .get_arguments()
            .find(|arg| arg.get_id() == "data_dir")
            .unwrap();
        assert!(data_dir.get_env().is_none());

        let cli = Cli::try_parse_from(["claude-focus-server", "sessions", "--data-dir", "/srv/focus"]).unwrap();
        assert_eq!(cli.data_dir.as_deref(), Some(std::path::Path::new("/srv/focus")));
    }
}

//! `claude-focus-server status`: what this machine can focus, and whether
//! the webhook receiver is answering.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::config::{ConfigOverrides, FocusConfig, ReverseLink};
use crate::process;
use crate::registry::{SessionFilter, SessionRegistry};
use crate::VERSION;

pub async fn run(data_dir: &Path, bind: SocketAddr) -> anyhow::Result<()> {
    let config = FocusConfig::resolve(data_dir, ConfigOverrides::default());

    println!();
    println!("  Claude Focus Server v{}", VERSION);
    println!("  Data dir: {}", data_dir.display());

    let sessions = SessionRegistry::new(&config.instances_dir).list_sessions(&SessionFilter::default());
    println!("  Sessions: {} registered", sessions.len());

    match &config.reverse_link {
        ReverseLink::Configured(_) => {
            println!("  Mode: relay (forwarding to {})", config.reverse_link)
        }
        ReverseLink::Invalid(reason) => println!("  Mode: relay, but reverse-link.json is unreadable: {reason}"),
        ReverseLink::Absent => println!("  Mode: local"),
    }

    if config.tmux.socket.exists() {
        println!("  tmux: {} ({})", config.tmux.binary, config.tmux.socket.display());
    } else {
        println!("  tmux: no server socket at {}", config.tmux.socket.display());
    }

    if config.helper_path.is_file() {
        println!("  Focus helper: {}", config.helper_path.display());
    } else {
        println!("  Focus helper: not installed ({})", config.helper_path.display());
    }

    let health_url = format!("http://{bind}/health");
    if check_health(&health_url).await {
        println!("  Health: OK ({health_url})");
    } else {
        println!("  Health: unreachable ({health_url})");
        println!();
        println!("  Server is not running.");
        println!("  Start with: claude-focus-server start --bind {bind}");
    }

    println!();
    Ok(())
}

async fn check_health(url: &str) -> bool {
    let args = ["-s", "--connect-timeout", "1", "--max-time", "2", url];
    process::run("curl", args, Duration::from_secs(3))
        .await
        .is_ok_and(|output| output.success() && output.stdout.trim() == "OK")
}

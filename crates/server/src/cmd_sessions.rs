//! `claude-focus-server sessions`: list what the registry currently sees.

use std::path::Path;

use claude_focus_protocol::SessionDescriptor;
use comfy_table::{presets, Table};

use crate::paths;
use crate::registry::{SessionFilter, SessionRegistry};

pub fn run(data_dir: &Path, hostname: Option<String>, json: bool) -> anyhow::Result<()> {
    let registry = SessionRegistry::new(paths::instances_dir(data_dir));
    let sessions = registry.list_sessions(&SessionFilter { hostname });

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    println!();
    if sessions.is_empty() {
        println!("  No sessions registered in {}", registry.dir().display());
    } else {
        println!("{}", render_table(&sessions));
    }
    println!();
    Ok(())
}

fn render_table(sessions: &[SessionDescriptor]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::NOTHING)
        .set_header(vec!["ID", "NAME", "HOST", "TERMINAL", "REGISTERED"]);
    for s in sessions {
        table.add_row(vec![
            s.id.clone(),
            s.label().to_string(),
            s.hostname.clone(),
            s.terminal_type.to_string(),
            s.registered_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table
}

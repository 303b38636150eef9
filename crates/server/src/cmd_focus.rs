//! `claude-focus-server focus <url>`: run one focus request from a shell.
//!
//! This is the same path a Slack click takes after it has been decoded, so it
//! doubles as the way to test a focus URL by hand.

use std::sync::Arc;

use anyhow::bail;
use claude_focus_protocol::FocusAction;

use crate::config::FocusConfig;
use crate::dispatcher::{Dispatcher, FocusTarget};

pub async fn run(
    config: Arc<FocusConfig>,
    url: &str,
    action: &str,
    text: Option<&str>,
) -> anyhow::Result<()> {
    let Ok(action) = action.parse::<FocusAction>() else {
        bail!("unknown action '{action}' (expected focus, 1, 2, continue or push)");
    };

    let via = match config.reverse_link.configured() {
        Some(link) => format!("via {}@{}", link.mac_user, link.mac_host),
        None => "locally".to_string(),
    };

    let dispatcher = Dispatcher::new(config);
    let result = dispatcher
        .execute(&FocusTarget::Url(url.to_string()), action, text)
        .await;

    if !result.success {
        bail!("{}", result.message);
    }
    println!("  {} ({via})", result.message);
    Ok(())
}

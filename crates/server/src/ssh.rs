//! Non-interactive ssh invocation shared by the forwarder and remote tmux.
//!
//! BatchMode keeps ssh from ever prompting, and ConnectTimeout bounds how long
//! an unreachable host can hold a request. ssh reserves exit code 255 for its
//! own failures, so that code is reported as [`FocusError::RemoteUnreachable`].

use std::time::Duration;

use crate::config::SshSettings;
use crate::error::FocusError;
use crate::process::{self, ProcessOutput};

const SSH_FAILURE_EXIT: i32 = 255;

#[derive(Debug, Clone, Copy)]
pub struct SshTarget<'a> {
    pub user: &'a str,
    pub host: &'a str,
    pub port: u16,
}

impl SshTarget<'_> {
    pub fn destination(&self) -> String {
        format!("{}@{}", self.user, self.host)
    }
}

pub fn ssh_args(target: &SshTarget<'_>, connect_timeout: Duration, remote_command: &str) -> Vec<String> {
    vec![
        "-o".to_string(),
        "BatchMode=yes".to_string(),
        "-o".to_string(),
        format!("ConnectTimeout={}", connect_timeout.as_secs().max(1)),
        "-p".to_string(),
        target.port.to_string(),
        "--".to_string(),
        target.destination(),
        remote_command.to_string(),
    ]
}

/// Run `remote_command` on `target`. `budget` is the time allowed after the
/// connection is up; the connect timeout is added on top.
pub async fn run_remote(
    settings: &SshSettings,
    target: &SshTarget<'_>,
    remote_command: &str,
    budget: Duration,
) -> Result<ProcessOutput, FocusError> {
    let args = ssh_args(target, settings.connect_timeout, remote_command);
    let output = process::run(&settings.binary, &args, settings.connect_timeout + budget).await?;

    match output.exit_code {
        Some(0) => Ok(output),
        Some(SSH_FAILURE_EXIT) => Err(FocusError::RemoteUnreachable {
            host: target.host.to_string(),
            detail: output.diagnostic(),
        }),
        code => Err(FocusError::NonZeroExit {
            program: format!("ssh {}", target.destination()),
            code,
            detail: output.diagnostic(),
        }),
    }
}

/// Quote `value` for a POSIX shell on the remote end.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_are_batch_mode_with_connect_timeout() {
        let target = SshTarget {
            user: "rob",
            host: "studio.local",
            port: 2200,
        };
        let args = ssh_args(&target, Duration::from_secs(5), "true");
        assert_eq!(
            args,
            vec![
                "-o",
                "BatchMode=yes",
                "-o",
                "ConnectTimeout=5",
                "-p",
                "2200",
                "--",
                "rob@studio.local",
                "true"
            ]
        );
    }

    #[test]
    fn destination_is_never_read_as_an_option() {
        let target = SshTarget {
            user: "-oProxyCommand=touch /tmp/x",
            host: "h",
            port: 22,
        };
        let args = ssh_args(&target, Duration::from_secs(5), "true");
        let dest = args.iter().position(|a| a.starts_with("-oProxyCommand")).unwrap();
        assert_eq!(args[dest - 1], "--");
        assert_eq!(args.last().map(String::as_str), Some("true"));
    }

    #[test]
    fn quoting_survives_single_quotes() {
        assert_eq!(shell_quote("main:0.0"), "'main:0.0'");
        assert_eq!(shell_quote("it's"), "'it'\\''s'");
    }
}

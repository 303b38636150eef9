//! Fake `tmux`/`ssh`/helper executables for tests.

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Write an executable `sh` script that appends its argv to `<dir>/<name>.log`
/// and then runs `body`.
pub fn fake_executable(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let log = log_path(dir, name);
    let script = format!(
        "#!/bin/sh\nprintf '%s\\n' \"$*\" >> '{}'\n{}\n",
        log.display(),
        body
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn log_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.log"))
}

/// Invocations recorded by a fake executable, one argv per line.
pub fn invocations(dir: &Path, name: &str) -> Vec<String> {
    std::fs::read_to_string(log_path(dir, name))
        .map(|raw| raw.lines().map(str::to_string).collect())
        .unwrap_or_default()
}

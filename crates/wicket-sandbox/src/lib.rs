//! Command policy filter and bounded shell runner for the bash tool.
//!
//! This is a policy filter, not an isolation boundary: it decides whether a
//! command string is allowed to reach the shell at all, then runs allowed
//! commands with a hard wall-clock timeout and a capped output buffer.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tokio::process::Command;

/// Read-only utilities the model may invoke without further argument checks.
static ALLOWED_COMMANDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    HashSet::from([
        // File system (read-only)
        "ls", "cat", "head", "tail", "find", "tree", "file", "stat", "wc",
        // Text processing
        "grep", "sed", "awk", "cut", "sort", "uniq", "diff", "patch",
        // System info
        "pwd", "whoami", "date", "uptime", "uname", "hostname", "env", "printenv",
        // Process info (read-only)
        "ps", "top", "df", "du", "free",
        // Network (read-only diagnostics)
        "ping", "traceroute", "nslookup", "dig", "host", "whois",
        // Output
        "echo", "printf",
        // Archives (read-only)
        "zip", "unzip", "gzip", "gunzip", "bzip2", "bunzip2",
    ])
});

const GIT_READ_SUBCOMMANDS: [&str; 9] = [
    "status", "log", "diff", "show", "branch", "remote", "ls-files", "ls-tree", "rev-parse",
];

/// Errors returned by the shell runner.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// Command execution exceeded timeout.
    #[error("Command timed out after {0}s")]
    Timeout(u64),
    /// Command produced more output than the buffer cap allows.
    #[error("Command output exceeded {0} bytes")]
    OutputOverflow(usize),
    /// Process execution failed.
    #[error("Failed to execute command: {0}")]
    Execution(String),
}

/// Result from a completed command run.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Child process stdout.
    pub stdout: Vec<u8>,
    /// Child process stderr.
    pub stderr: Vec<u8>,
    /// Child process exit code. -1 when unavailable.
    pub exit_code: i32,
    /// Whether the process exited with success status.
    pub success: bool,
}

/// Decide whether a command string may be executed.
///
/// Default-deny: the command must be free of shell metacharacters that
/// escape the allowlist model, and its base executable (path prefix
/// stripped) must be allowlisted. `git` and `tar` are allowed only with
/// read-only arguments.
pub fn is_command_allowed(command: &str) -> bool {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return false;
    }

    if has_dangerous_shell_features(command) {
        return false;
    }

    let mut tokens = trimmed.split_whitespace();
    let base = match tokens.next() {
        Some(t) => t.to_lowercase(),
        None => return false,
    };
    let cmd_name = base.rsplit('/').next().unwrap_or(&base);

    match cmd_name {
        "git" => {
            let args: Vec<&str> = tokens.collect();
            git_args_allowed(&args)
        }
        "tar" => {
            let args: Vec<&str> = tokens.collect();
            tar_args_allowed(&args)
        }
        other => ALLOWED_COMMANDS.contains(other),
    }
}

fn has_dangerous_shell_features(command: &str) -> bool {
    // Statement separators and chained execution.
    if command.contains(';') || command.contains("&&") || command.contains("||") {
        return true;
    }

    // Pipes, unless every occurrence sits inside a quoted string.
    if has_unquoted('|', command) {
        return true;
    }

    // Redirection.
    if command.contains('>') || command.contains('<') {
        return true;
    }

    // Command substitution.
    if command.contains("$(") || command.contains('`') {
        return true;
    }

    // Background execution.
    if command.trim_end().ends_with('&') {
        return true;
    }

    false
}

/// True if `needle` appears outside of single or double quotes.
fn has_unquoted(needle: char, command: &str) -> bool {
    let mut in_single = false;
    let mut in_double = false;
    for ch in command.chars() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            c if c == needle && !in_single && !in_double => return true,
            _ => {}
        }
    }
    false
}

fn git_args_allowed(args: &[&str]) -> bool {
    match args.first() {
        Some(sub) => GIT_READ_SUBCOMMANDS.contains(sub),
        None => false,
    }
}

fn tar_args_allowed(args: &[&str]) -> bool {
    // Listing only. Creation and extraction can overwrite files.
    args.iter()
        .any(|a| *a == "--list" || (a.starts_with('-') && !a.starts_with("--") && a.contains('t')))
        && !args
            .iter()
            .any(|a| a.starts_with('-') && !a.starts_with("--") && (a.contains('x') || a.contains('c')))
        && !args.iter().any(|a| *a == "--extract" || *a == "--create")
}

/// Execute an allowed command with a wall-clock timeout and output cap.
///
/// The policy check is the caller's responsibility; this function only
/// bounds execution. The child is killed when the timeout elapses.
pub async fn run_command(
    command: &str,
    cwd: &Path,
    timeout: Duration,
    max_output_bytes: usize,
) -> Result<CommandOutput, SandboxError> {
    let (shell, flag) = shell_and_flag();

    let mut cmd = Command::new(shell);
    cmd.arg(flag).arg(command).current_dir(cwd).kill_on_drop(true);

    let output = tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| SandboxError::Timeout(timeout.as_secs()))?
        .map_err(|e| SandboxError::Execution(e.to_string()))?;

    if output.stdout.len() + output.stderr.len() > max_output_bytes {
        return Err(SandboxError::OutputOverflow(max_output_bytes));
    }

    Ok(CommandOutput {
        stdout: output.stdout,
        stderr: output.stderr,
        exit_code: output.status.code().unwrap_or(-1),
        success: output.status.success(),
    })
}

fn shell_and_flag() -> (&'static str, &'static str) {
    if cfg!(target_os = "windows") {
        ("cmd", "/C")
    } else {
        ("/bin/bash", "-c")
    }
}

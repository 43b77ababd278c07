//! External tool invocation (speech engines, ffmpeg).

use std::io;
use std::process::{Command, Output};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("'{program}' was not found on PATH")]
    NotFound { program: String },

    #[error("'{program}' exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("failed to run '{program}': {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Run `program args...` to completion, capturing stdout and stderr.
pub fn run_tool<I, S>(program: &str, args: I) -> Result<Output, ToolError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args);
    debug!(command = ?cmd, "spawning");

    let output = cmd.output().map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => ToolError::NotFound {
            program: program.to_string(),
        },
        _ => ToolError::Io {
            program: program.to_string(),
            source,
        },
    })?;

    if !output.status.success() {
        return Err(ToolError::Failed {
            program: program.to_string(),
            status: output.status.to_string(),
            stderr: last_lines(&output.stderr, 5),
        });
    }
    Ok(output)
}

/// True if `program` can be spawned at all.
pub fn tool_exists(program: &str, check_arg: &str) -> bool {
    Command::new(program)
        .arg(check_arg)
        .output()
        .map(|_| true)
        .unwrap_or(false)
}

fn last_lines(bytes: &[u8], n: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let lines: Vec<&str> = text.lines().collect();
    lines[lines.len().saturating_sub(n)..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_program_is_not_found() {
        let err = run_tool("pulse-no-such-tool-xyz", ["--version"]).unwrap_err();
        assert!(matches!(err, ToolError::NotFound { .. }));
        assert!(!tool_exists("pulse-no-such-tool-xyz", "--version"));
    }

    #[test]
    fn keeps_only_trailing_stderr() {
        assert_eq!(last_lines(b"a\nb\nc\nd", 2), "c\nd");
        assert_eq!(last_lines(b"", 3), "");
    }
}

use std::io::{Seek, SeekFrom, Write};
use std::process::Stdio;

use proofctl_core::{CompilationResult, ErrorMessage, Position};
use tokio::process::Command;

use crate::error::WorkerError;

/// Drives `lake exe repl` as a fresh subprocess for every single
/// verification call. The `{"cmd": code}` command is written to a
/// transient temp file that becomes the child's stdin, the process runs to
/// completion, and its full stdout is parsed as one JSON reply — matching
/// the original worker's `verify_lean4_file`, which never keeps a REPL
/// process alive across tasks. Cheap to construct: holds no process state
/// of its own, just the `lake` invocation config.
#[derive(Clone)]
pub struct LeanRepl {
    lake_path: String,
    lean_workspace: String,
}

impl LeanRepl {
    pub fn new(lake_path: impl Into<String>, lean_workspace: impl Into<String>) -> Self {
        LeanRepl {
            lake_path: lake_path.into(),
            lean_workspace: lean_workspace.into(),
        }
    }

    pub async fn verify(&self, code: &str) -> Result<CompilationResult, WorkerError> {
        let command = serde_json::json!({ "cmd": code });
        let message = serde_json::to_string(&command).map_err(|e| WorkerError::Protocol(e.to_string()))?;

        let mut temp_file = tempfile::NamedTempFile::new().map_err(WorkerError::Spawn)?;
        temp_file.write_all(message.as_bytes()).map_err(WorkerError::Spawn)?;
        temp_file.write_all(b"\r\n\r\n").map_err(WorkerError::Spawn)?;
        temp_file.flush().map_err(WorkerError::Spawn)?;
        temp_file.as_file_mut().seek(SeekFrom::Start(0)).map_err(WorkerError::Spawn)?;
        let stdin_file = temp_file.reopen().map_err(WorkerError::Spawn)?;

        let output = Command::new(&self.lake_path)
            .arg("exe")
            .arg("repl")
            .current_dir(&self.lean_workspace)
            .stdin(Stdio::from(stdin_file))
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(WorkerError::Spawn)?;

        if output.stdout.is_empty() {
            return Err(WorkerError::ProcessExited);
        }
        let value: serde_json::Value =
            serde_json::from_slice(&output.stdout).map_err(|e| WorkerError::Protocol(e.to_string()))?;
        parse_repl_reply(value)
    }
}

fn parse_repl_reply(value: serde_json::Value) -> Result<CompilationResult, WorkerError> {
    let messages = value.get("messages").and_then(|m| m.as_array()).cloned().unwrap_or_default();
    let sorries = value.get("sorries").and_then(|s| s.as_array()).cloned().unwrap_or_default();

    let mut errors = Vec::new();
    for message in &messages {
        let severity = message.get("severity").and_then(|v| v.as_str()).unwrap_or("error").to_string();
        if severity != "error" {
            continue;
        }
        let pos = parse_position(message.get("pos"));
        let end_pos = message.get("endPos").map(|v| parse_position(Some(v)));
        let data = message.get("data").and_then(|v| v.as_str()).unwrap_or_default().to_string();
        errors.push(ErrorMessage {
            severity,
            pos,
            end_pos,
            data,
        });
    }

    Ok(CompilationResult::from_messages(errors, sorries))
}

fn parse_position(value: Option<&serde_json::Value>) -> Position {
    let line = value.and_then(|v| v.get("line")).and_then(|v| v.as_u64()).unwrap_or(1) as u32;
    let column = value.and_then(|v| v.get("column")).and_then(|v| v.as_u64()).unwrap_or(0) as u32;
    Position { line, column }
}

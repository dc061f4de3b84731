//! `qernal functions` commands.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;

use super::{CommandResult, json_of};
use crate::api::ApiClient;
use crate::logs::{self, LogRecord};
use crate::{Error, Result};

/// Result of a single `functions logs` fetch.
#[derive(Debug, Serialize)]
pub struct LogsResult {
    pub data: Vec<LogRecord>,
}

impl CommandResult for LogsResult {
    fn to_json(&self) -> String {
        json_of(self)
    }

    fn to_human(&self) -> String {
        self.data
            .iter()
            .map(logs::format_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Fetch the current log window once.
pub fn logs(client: &ApiClient, project_id: &str, function_id: &str) -> Result<LogsResult> {
    Ok(LogsResult {
        data: client.list_logs(project_id, function_id)?,
    })
}

/// Poll logs until Ctrl-C, printing each new record once.
pub fn watch<W: Write>(
    client: &ApiClient,
    project_id: &str,
    function_id: &str,
    interval: Duration,
    out: &mut W,
) -> Result<usize> {
    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || handler_flag.store(false, Ordering::SeqCst))
        .map_err(|e| Error::Other(format!("failed to install interrupt handler: {}", e)))?;

    tracing::info!(
        project = %project_id,
        function = %function_id,
        interval_secs = interval.as_secs(),
        "watching logs"
    );
    let mut source = || -> Result<Vec<LogRecord>> {
        Ok(client.list_logs(project_id, function_id)?)
    };
    logs::watch(&mut source, out, interval, &running)
}

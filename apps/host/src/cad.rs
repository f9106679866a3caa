//! Headless CAD collaborator.
//!
//! [`JournalCadHost`] stands in for a live drawing session: commands and
//! insertions are validated, then appended to a journal file (one line per
//! operation) instead of being sent to a CAD engine. A CAD integration
//! replaces it with its own [`CommandExecutor`] and [`BlockInserter`].
//!
//! Like a real drawing session it handles one operation at a time; an
//! operation that arrives while another is running gets `HOST_BUSY`.

use bridge_core::error::HandlerError;
use bridge_core::handlers::{BlockInserter, CommandExecutor, CommandOutcome, InsertBlockRequest};

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, TryLockError};
use std::time::SystemTime;

use humantime::format_rfc3339_millis;
use log::{debug, info};

pub struct JournalCadHost {
    journal: Option<PathBuf>,
    session: Mutex<SessionStats>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SessionStats {
    pub commands: u64,
    pub insertions: u64,
}

impl JournalCadHost {
    /// Without a journal path, operations are only logged.
    pub fn new(journal: Option<PathBuf>) -> Self {
        Self {
            journal,
            session: Mutex::new(SessionStats::default()),
        }
    }

    pub fn journal(&self) -> Option<&Path> {
        self.journal.as_deref()
    }

    pub fn stats(&self) -> SessionStats {
        match self.session.lock() {
            Ok(stats) => *stats,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub(crate) fn begin(&self, operation: &str) -> Result<MutexGuard<'_, SessionStats>, HandlerError> {
        match self.session.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => Err(HandlerError::host_busy(format!(
                "Drawing session is busy; {operation} rejected"
            ))),
        }
    }

    fn record(&self, line: &str) -> Result<(), HandlerError> {
        let Some(journal) = &self.journal else {
            info!("CAD journal: {line}");
            return Ok(());
        };

        if let Some(parent) = journal.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                HandlerError::action_error(format!(
                    "Failed to create journal directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(journal)
            .map_err(|e| {
                HandlerError::action_error(format!(
                    "Failed to open journal {}: {e}",
                    journal.display()
                ))
            })?;

        writeln!(file, "{} {line}", format_rfc3339_millis(SystemTime::now())).map_err(|e| {
            HandlerError::action_error(format!("Failed to write journal {}: {e}", journal.display()))
        })?;

        debug!("Journaled: {line}");
        Ok(())
    }
}

impl CommandExecutor for JournalCadHost {
    fn execute(&self, command: &str) -> Result<CommandOutcome, HandlerError> {
        let mut session = self.begin("command")?;

        // Multi-line input would forge extra journal entries.
        if command.contains(['\n', '\r']) {
            return Ok(CommandOutcome::failed(
                "Command must be a single line",
            ));
        }

        self.record(&format!("COMMAND {command}"))?;
        session.commands += 1;

        Ok(CommandOutcome::succeeded(format!(
            "Command '{command}' queued (#{})",
            session.commands
        )))
    }
}

impl BlockInserter for JournalCadHost {
    fn insert_block(&self, request: &InsertBlockRequest) -> Result<bool, HandlerError> {
        let mut session = self.begin("insertion")?;

        let placement = request.placement();
        self.record(&format!(
            "INSERT {} FROM {} AT ({}, {}, {}) SCALE {} ROTATION {}",
            request.block_name,
            request.block_path.display(),
            placement.x,
            placement.y,
            placement.z,
            request.scale(),
            request.rotation()
        ))?;
        session.insertions += 1;

        Ok(true)
    }
}

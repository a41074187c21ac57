//! Shell Module
//!
//! Line-oriented scripts driven through a [`Session`].
//!
//! ## Responsibilities
//! - Parse script lines into commands (see [`parser`] for the grammar)
//! - Queue writes on a session and commit them in the requested mode
//! - Print reads and commit outcomes to an output sink
//! - Remember the ETag last seen for each key, so `replace`, `merge` and
//!   `delete` after a `get` or `query` are checked against that version
//!
//! ## Failure Handling
//! Syntax errors stop the script with `TableError::Script`. Storage failures
//! (conflicts, invalid keys, failed commit groups) are printed as `error:`
//! lines and counted; the script keeps running.

mod command;
mod parser;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::sync::Arc;

use crate::engine::StorageEngine;
use crate::entity::{ETag, Entity};
use crate::error::{Result, TableError};
use crate::operation::{ConflictHandling, OperationKind};
use crate::session::Session;

pub use command::{Command, CommandType};
pub use parser::{parse_line, parse_value};

/// Counters for one script run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShellStats {
    pub commands: usize,
    pub commits: usize,
    /// Storage failures reported as `error:` lines
    pub failures: usize,
}

type EntityKey = (String, String, String);

/// A session plus the state a script accumulates
pub struct Shell<E, W> {
    session: Session<E>,
    conflict: ConflictHandling,
    observed: HashMap<EntityKey, ETag>,
    out: W,
    stats: ShellStats,
}

impl<E: StorageEngine + 'static, W: Write> Shell<E, W> {
    pub fn new(engine: Arc<E>, conflict: ConflictHandling, out: W) -> Self {
        Self {
            session: Session::new(engine),
            conflict,
            observed: HashMap::new(),
            out,
            stats: ShellStats::default(),
        }
    }

    pub fn session(&self) -> &Session<E> {
        &self.session
    }

    pub fn stats(&self) -> ShellStats {
        self.stats
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Run every line of a script
    pub fn run<R: BufRead>(&mut self, reader: R) -> Result<ShellStats> {
        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if let Some(command) = parse_line(index + 1, &line)? {
                self.execute(&command)?;
            }
        }

        if self.session.pending_count() > 0 {
            tracing::warn!(pending = self.session.pending_count(), "script ended with uncommitted writes");
        }
        Ok(self.stats)
    }

    /// Execute one command; storage failures are printed, IO failures returned
    pub fn execute(&mut self, command: &Command) -> Result<()> {
        self.stats.commands += 1;
        tracing::debug!(command = ?command.command_type(), "shell command");

        match self.dispatch(command) {
            Ok(()) => Ok(()),
            Err(TableError::Io(e)) => Err(TableError::Io(e)),
            Err(e) => {
                self.stats.failures += 1;
                writeln!(self.out, "error: {}", e)?;
                Ok(())
            }
        }
    }

    fn dispatch(&mut self, command: &Command) -> Result<()> {
        match command {
            Command::Write {
                kind,
                table,
                partition_key,
                row_key,
                properties,
            } => {
                let entity = Entity::with_properties(partition_key.as_str(), row_key.as_str(), properties.clone());
                match kind {
                    OperationKind::Insert => self.session.add_new(table, entity),
                    OperationKind::Upsert => self.session.upsert(table, entity),
                    OperationKind::Replace => {
                        let entity = self.with_observed(table, entity);
                        self.session.replace(table, entity, self.conflict)
                    }
                    OperationKind::Merge => {
                        let entity = self.with_observed(table, entity);
                        self.session.merge(table, entity, self.conflict)
                    }
                    OperationKind::Delete => self.session.delete(table, partition_key, row_key),
                }
            }

            Command::Delete {
                table,
                partition_key,
                row_key,
            } => {
                let target = self.with_observed(table, Entity::new(partition_key.as_str(), row_key.as_str()));
                if target.etag().is_some() {
                    self.session.delete_entity(table, &target, self.conflict)
                } else {
                    self.session.delete(table, partition_key, row_key)
                }
            }

            Command::DeleteAll { table, partition_key } => self.session.delete_all(table, partition_key),

            Command::Commit { mode } => {
                self.stats.commits += 1;
                let report = self.session.commit_with_report(*mode);
                let committed = report.succeeded().count();
                writeln!(
                    self.out,
                    "committed {}/{} operation(s) in {} group(s)",
                    committed,
                    report.operation_count(),
                    report.groups().len()
                )?;
                let mut failures = 0;
                for (op, e) in report.failed() {
                    failures += 1;
                    writeln!(self.out, "error: {}: {}", op, e)?;
                }
                self.stats.failures += failures;
                Ok(())
            }

            Command::Get {
                table,
                partition_key,
                row_key,
            } => match self.session.get(table, partition_key, row_key) {
                Ok(entity) => self.print_entity(table, &entity),
                Err(e) if e.is_does_not_exist() => {
                    writeln!(self.out, "not found: {}/{}/{}", table, partition_key, row_key)?;
                    Ok(())
                }
                Err(e) => Err(e),
            },

            Command::Query { table, descriptor } => {
                let entities = self.session.scan(table, descriptor)?;
                for entity in &entities {
                    self.print_entity(table, entity)?;
                }
                writeln!(self.out, "{} result(s)", entities.len())?;
                Ok(())
            }
        }
    }

    /// Attach the ETag last seen for this key, if any
    fn with_observed(&self, table: &str, entity: Entity) -> Entity {
        let key = (
            table.to_string(),
            entity.partition_key().to_string(),
            entity.row_key().to_string(),
        );
        let etag = self.observed.get(&key).cloned();
        entity.etag_from(etag)
    }

    fn print_entity(&mut self, table: &str, entity: &Entity) -> Result<()> {
        if let Some(etag) = entity.etag() {
            let key = (
                table.to_string(),
                entity.partition_key().to_string(),
                entity.row_key().to_string(),
            );
            self.observed.insert(key, etag.clone());
        }

        write!(self.out, "{}/{}/{}", table, entity.partition_key(), entity.row_key())?;
        for (name, value) in entity.properties() {
            write!(self.out, " {}={}", name, value)?;
        }
        writeln!(self.out)?;
        Ok(())
    }
}

// =============================================================================
// Entry Points
// =============================================================================

/// Run a script held in memory
pub fn run_script<E, W>(engine: Arc<E>, conflict: ConflictHandling, script: &str, out: W) -> Result<ShellStats>
where
    E: StorageEngine + 'static,
    W: Write,
{
    let mut shell = Shell::new(engine, conflict, out);
    shell.run(script.as_bytes())
}

/// Run a script file
pub fn run_script_file<E, W>(engine: Arc<E>, conflict: ConflictHandling, path: &Path, out: W) -> Result<ShellStats>
where
    E: StorageEngine + 'static,
    W: Write,
{
    let file = File::open(path)?;
    tracing::info!(path = %path.display(), "running script");
    let mut shell = Shell::new(engine, conflict, out);
    shell.run(BufReader::new(file))
}

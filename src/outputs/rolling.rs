//! Rolling file output
//!
//! Writes go to one file at a time. Before every write a single writer, admitted by
//! a spin gate, asks the roller whether the current file must be replaced and swaps
//! in the new target. The write itself happens outside the gate.

use super::roller::{FileNameDecomposition, FileRoller, FormattedPath};
use super::ByteSequenceOutput;
use crate::core::{LoggerError, Result};
use arc_swap::ArcSwapOption;
use crossbeam_utils::Backoff;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

struct Target {
    file: File,
    length: AtomicU64,
    path: FormattedPath,
}

impl Target {
    /// Create a fresh file, or append to it when it already exists.
    fn open(path: FormattedPath) -> Result<Self> {
        let file = match OpenOptions::new().write(true).create_new(true).open(path.path()) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                eprintln!(
                    "[WARN] {} already exists, appending to it",
                    path.path().display()
                );
                OpenOptions::new()
                    .append(true)
                    .open(path.path())
                    .map_err(|e| open_error(&path, e))?
            }
            Err(e) => return Err(open_error(&path, e)),
        };
        let length = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok(Self {
            file,
            length: AtomicU64::new(length),
            path,
        })
    }

    fn write(&self, data: &[u8]) -> io::Result<()> {
        (&self.file).write_all(data)?;
        self.length.fetch_add(data.len() as u64, Ordering::Relaxed);
        Ok(())
    }
}

fn open_error(path: &FormattedPath, e: io::Error) -> LoggerError {
    LoggerError::io_operation(
        "open rolling file",
        format!("Failed to open {}", path.path().display()),
        e,
    )
}

/// Releases the roll gate on drop.
struct GateGuard<'a>(&'a AtomicBool);

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct RollingByteSequenceOutput {
    roller: Arc<dyn FileRoller>,
    name: FileNameDecomposition,
    target: ArcSwapOption<Target>,
    gate: AtomicBool,
    disposed: AtomicBool,
}

impl RollingByteSequenceOutput {
    /// # Errors
    ///
    /// Returns a configuration error when `path` is blank.
    pub fn new(roller: Arc<dyn FileRoller>, path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(LoggerError::config("output", "rolling file path cannot be empty"));
        }
        Ok(Self {
            roller,
            name: FileNameDecomposition::new(path),
            target: ArcSwapOption::empty(),
            gate: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        })
    }

    pub fn roller(&self) -> &Arc<dyn FileRoller> {
        &self.roller
    }

    /// Path of the file currently written to, if one is open.
    pub fn current_path(&self) -> Option<FormattedPath> {
        self.target.load().as_ref().map(|t| t.path.clone())
    }

    pub fn current_size(&self) -> u64 {
        self.target
            .load()
            .as_ref()
            .map_or(0, |t| t.length.load(Ordering::Relaxed))
    }

    fn enter_gate(&self) -> GateGuard<'_> {
        let backoff = Backoff::new();
        while self
            .gate
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            backoff.snooze();
        }
        GateGuard(&self.gate)
    }

    fn acquire_target(&self) -> Result<Arc<Target>> {
        let _gate = self.enter_gate();
        let current = self.target.load_full();
        if let Some(target) = &current {
            let size = target.length.load(Ordering::Relaxed);
            if !self.roller.should_roll(&self.name, Some(target.path.date()), size) {
                return Ok(Arc::clone(target));
            }
        }

        // close our handle before the file is moved
        self.target.store(None);
        let previous = current.as_ref().map(|t| t.path.clone());
        drop(current);

        let next = self.roller.roll(&self.name, previous.as_ref());
        let target = Arc::new(Target::open(next)?);
        self.target.store(Some(Arc::clone(&target)));
        Ok(target)
    }
}

impl ByteSequenceOutput for RollingByteSequenceOutput {
    fn write(&self, data: &[u8]) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(LoggerError::disposed("RollingByteSequenceOutput"));
        }
        let target = self.acquire_target()?;
        target.write(data)?;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        if let Some(target) = self.target.load().as_ref() {
            (&target.file).flush()?;
        }
        Ok(())
    }

    fn dispose(&self) -> Result<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let _gate = self.enter_gate();
        if let Some(target) = self.target.swap(None) {
            (&target.file).flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "rolling-file"
    }
}

impl std::fmt::Debug for RollingByteSequenceOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollingByteSequenceOutput")
            .field("name", &self.name)
            .field("current", &self.current_path())
            .finish_non_exhaustive()
    }
}

//! Standard streams, plain files and TCP collectors

use super::ByteSequenceOutput;
use crate::core::{LoggerError, Result};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const TCP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Out,
    Err,
}

/// Process stdout or stderr.
#[derive(Debug)]
pub struct StdStreamOutput {
    stream: StdStream,
}

impl StdStreamOutput {
    pub fn new(stream: StdStream) -> Self {
        Self { stream }
    }
}

impl ByteSequenceOutput for StdStreamOutput {
    fn write(&self, data: &[u8]) -> Result<()> {
        match self.stream {
            StdStream::Out => io::stdout().lock().write_all(data)?,
            StdStream::Err => io::stderr().lock().write_all(data)?,
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        match self.stream {
            StdStream::Out => io::stdout().flush()?,
            StdStream::Err => io::stderr().flush()?,
        }
        Ok(())
    }

    fn dispose(&self) -> Result<()> {
        self.flush()
    }

    fn name(&self) -> &str {
        match self.stream {
            StdStream::Out => "stdout",
            StdStream::Err => "stderr",
        }
    }
}

/// Plain file opened in append mode on first write.
#[derive(Debug)]
pub struct FileOutput {
    path: PathBuf,
    file: Mutex<Option<File>>,
    disposed: AtomicBool,
}

impl FileOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            file: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSequenceOutput for FileOutput {
    fn write(&self, data: &[u8]) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(LoggerError::disposed("FileOutput"));
        }
        let mut guard = self.file.lock();
        if guard.is_none() {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .map_err(|e| {
                    LoggerError::io_operation(
                        "open log file",
                        format!("Failed to open {}", self.path.display()),
                        e,
                    )
                })?;
            *guard = Some(file);
        }
        if let Some(file) = guard.as_mut() {
            file.write_all(data)?;
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        if let Some(file) = self.file.lock().as_mut() {
            file.flush()?;
        }
        Ok(())
    }

    fn dispose(&self) -> Result<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(mut file) = self.file.lock().take() {
            file.flush()?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

/// Newline-delimited TCP stream to a log collector.
///
/// Addresses are resolved at setup; the connection is opened on first write. A
/// failed write drops the connection so the next write reconnects.
#[derive(Debug)]
pub struct TcpOutput {
    addrs: Vec<SocketAddr>,
    stream: Mutex<Option<TcpStream>>,
    disposed: AtomicBool,
}

impl TcpOutput {
    pub fn new(addrs: Vec<SocketAddr>) -> Self {
        Self {
            addrs,
            stream: Mutex::new(None),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }

    fn connect(&self) -> Result<TcpStream> {
        let stream = TcpStream::connect(&self.addrs[..]).map_err(|e| {
            LoggerError::io_operation(
                "connect log collector",
                format!("Failed to connect to {:?}", self.addrs),
                e,
            )
        })?;
        stream.set_write_timeout(Some(TCP_TIMEOUT))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

impl ByteSequenceOutput for TcpOutput {
    fn write(&self, data: &[u8]) -> Result<()> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(LoggerError::disposed("TcpOutput"));
        }
        let mut guard = self.stream.lock();
        let mut stream = match guard.take() {
            Some(stream) => stream,
            None => self.connect()?,
        };
        match stream.write_all(data) {
            Ok(()) => {
                *guard = Some(stream);
                Ok(())
            }
            // connection stays dropped; the next write reconnects
            Err(e) => Err(LoggerError::io_operation(
                "write log collector",
                format!("Failed to send to {:?}", self.addrs),
                e,
            )),
        }
    }

    fn flush(&self) -> Result<()> {
        let mut guard = self.stream.lock();
        if let Some(stream) = guard.as_mut() {
            if let Err(e) = stream.flush() {
                *guard = None;
                return Err(e.into());
            }
        }
        Ok(())
    }

    fn dispose(&self) -> Result<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(mut stream) = self.stream.lock().take() {
            let _ = stream.flush();
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "tcp"
    }
}

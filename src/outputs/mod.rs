//! Byte outputs written to by payload writers
//!
//! An output is "a place bytes can be appended to": the standard streams, a plain
//! file, a TCP collector or a rolling file. Outputs are chosen at setup time from a
//! URI; a malformed or unknown URI is a configuration error, never a write error.

pub mod roller;
pub mod rolling;
pub mod stream;

pub use roller::{
    DateProvider, DefaultFileRoller, FileNameDecomposition, FileNameFormatter, FileRollTrigger,
    FileRoller, FileRollerOptions, FormattedPath, LocalDateProvider,
};
pub use rolling::RollingByteSequenceOutput;
pub use stream::{FileOutput, StdStream, StdStreamOutput, TcpOutput};

use crate::core::{LoggerError, Result};
use std::net::ToSocketAddrs;
use std::sync::Arc;
use url::Url;

pub const STDOUT_URI: &str = "file:///dev/stdout";
pub const STDERR_URI: &str = "file:///dev/stderr";

/// Query keys recognized on rolling file URIs.
pub mod query_keys {
    pub const ROLL: &str = "roll";
    pub const TRIGGERS: &str = "triggers";
    pub const MAX_SIZE: &str = "max-size";
    pub const COMPRESS: &str = "compress";
}

/// Append-only byte sink shared by the worker and the provider.
pub trait ByteSequenceOutput: Send + Sync {
    /// Append `data`. A single call is written contiguously.
    fn write(&self, data: &[u8]) -> Result<()>;

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Close the output. Calling it more than once has no effect.
    fn dispose(&self) -> Result<()>;

    fn name(&self) -> &str;
}

impl<O: ByteSequenceOutput + ?Sized> ByteSequenceOutput for Arc<O> {
    fn write(&self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn dispose(&self) -> Result<()> {
        (**self).dispose()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<O: ByteSequenceOutput + ?Sized> ByteSequenceOutput for Box<O> {
    fn write(&self, data: &[u8]) -> Result<()> {
        (**self).write(data)
    }

    fn flush(&self) -> Result<()> {
        (**self).flush()
    }

    fn dispose(&self) -> Result<()> {
        (**self).dispose()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Build an output from a name (`stdout`, `stderr`) or a URI.
///
/// Recognized URIs: `file:///dev/stdout`, `file:///dev/stderr`, `file://<path>`,
/// `tcp://<host>:<port>` and rolling files
/// `file://<path>?roll&triggers=date|size&max-size=N&compress=true`.
///
/// # Errors
///
/// `InvalidConfiguration` for a malformed URI or an unresolvable TCP host,
/// `UnsupportedOutput` for any other scheme.
pub fn create_output(uri_or_name: &str) -> Result<Box<dyn ByteSequenceOutput>> {
    if uri_or_name == STDOUT_URI || uri_or_name.eq_ignore_ascii_case("stdout") {
        return Ok(Box::new(StdStreamOutput::new(StdStream::Out)));
    }
    if uri_or_name == STDERR_URI || uri_or_name.eq_ignore_ascii_case("stderr") {
        return Ok(Box::new(StdStreamOutput::new(StdStream::Err)));
    }

    let url = Url::parse(uri_or_name).map_err(|e| {
        LoggerError::config("output", format!("invalid output URI {:?}: {}", uri_or_name, e))
    })?;

    match url.scheme() {
        "file" => {
            let path = url.to_file_path().map_err(|_| {
                LoggerError::config("output", format!("{:?} is not a local file path", uri_or_name))
            })?;
            let query = parse_query(&url);
            let rolling = query
                .iter()
                .find(|(key, _)| key == query_keys::ROLL)
                .is_some_and(|(_, value)| is_truthy(value.as_deref()));
            if rolling {
                let options = roller_options(&query)?;
                let roller = DefaultFileRoller::new(options);
                Ok(Box::new(RollingByteSequenceOutput::new(
                    Arc::new(roller),
                    path.to_string_lossy(),
                )?))
            } else {
                Ok(Box::new(FileOutput::new(path)))
            }
        }
        "tcp" => {
            let host = url.host_str().ok_or_else(|| {
                LoggerError::config("output", format!("{:?} has no host", uri_or_name))
            })?;
            let port = url.port().ok_or_else(|| {
                LoggerError::config("output", format!("{:?} has no port", uri_or_name))
            })?;
            let addrs: Vec<_> = (host, port)
                .to_socket_addrs()
                .map_err(|e| {
                    LoggerError::config("output", format!("could not resolve {:?}: {}", host, e))
                })?
                .collect();
            if addrs.is_empty() {
                return Err(LoggerError::config(
                    "output",
                    format!("could not resolve {:?}", host),
                ));
            }
            Ok(Box::new(TcpOutput::new(addrs)))
        }
        _ => Err(LoggerError::unsupported_output(uri_or_name)),
    }
}

/// Query parameters with lower-cased keys. A key without `=` has no value.
fn parse_query(url: &Url) -> Vec<(String, Option<String>)> {
    url.query()
        .unwrap_or_default()
        .split('&')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((key, value)) => (
                key.to_ascii_lowercase(),
                Some(percent_decode(value)),
            ),
            None => (part.to_ascii_lowercase(), None),
        })
        .collect()
}

fn percent_decode(value: &str) -> String {
    url::form_urlencoded::parse(format!("v={}", value).as_bytes())
        .next()
        .map(|(_, v)| v.into_owned())
        .unwrap_or_default()
}

fn is_truthy(value: Option<&str>) -> bool {
    matches!(value, None | Some("true") | Some("1") | Some("on"))
}

fn roller_options(query: &[(String, Option<String>)]) -> Result<FileRollerOptions> {
    let mut options = FileRollerOptions::default();
    for (key, value) in query {
        match (key.as_str(), value.as_deref()) {
            (query_keys::TRIGGERS, Some(raw)) => {
                options.triggers = raw.parse()?;
            }
            (query_keys::MAX_SIZE, Some(raw)) => {
                options.max_file_size = raw.parse().map_err(|_| {
                    LoggerError::config("output", format!("invalid max-size {:?}", raw))
                })?;
            }
            (query_keys::COMPRESS, raw) => {
                options.compress_rolled = is_truthy(raw);
            }
            _ => {}
        }
    }
    Ok(options)
}

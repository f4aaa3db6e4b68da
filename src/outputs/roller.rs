//! File rolling strategy
//!
//! The roller decides when the current file of a rolling output must be replaced
//! and moves the old file out of the way. Rolled files get a numeric suffix; any
//! file already holding that suffix is shifted one step further first, so
//! `app.2025-01-08.log.1.gz` is always the most recent roll of that day.

use crate::core::{LoggerError, Result};
use chrono::{Local, NaiveDate};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Write};
use std::ops::BitOr;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use std::str::FromStr;
use std::sync::Arc;

const COPY_BUFFER_SIZE: usize = 32 * 1024;

/// Conditions that make a rolling output switch files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileRollTrigger(u8);

impl FileRollTrigger {
    pub const NONE: FileRollTrigger = FileRollTrigger(0);
    /// Local calendar date changed
    pub const DATE: FileRollTrigger = FileRollTrigger(1);
    /// File reached the configured size
    pub const SIZE: FileRollTrigger = FileRollTrigger(2);

    #[inline]
    pub const fn contains(self, other: FileRollTrigger) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }
}

impl Default for FileRollTrigger {
    fn default() -> Self {
        FileRollTrigger::DATE
    }
}

impl BitOr for FileRollTrigger {
    type Output = FileRollTrigger;

    fn bitor(self, rhs: Self) -> Self::Output {
        FileRollTrigger(self.0 | rhs.0)
    }
}

impl FromStr for FileRollTrigger {
    type Err = LoggerError;

    /// Parses `date`, `size` or a combination joined with `,` or `|`.
    fn from_str(s: &str) -> Result<Self> {
        s.split(|c: char| c == ',' || c == '|')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .try_fold(FileRollTrigger::NONE, |acc, part| {
                match part.to_ascii_lowercase().as_str() {
                    "date" => Ok(acc | FileRollTrigger::DATE),
                    "size" => Ok(acc | FileRollTrigger::SIZE),
                    "none" => Ok(acc),
                    _ => Err(LoggerError::config(
                        "triggers",
                        format!("unknown roll trigger {:?}", part),
                    )),
                }
            })
    }
}

/// Path split into "everything before the extension" and the extension.
///
/// Only a dot after the last path separator starts an extension, so
/// `/var/log.d/app` has none.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNameDecomposition {
    path: String,
    dot: Option<usize>,
}

impl FileNameDecomposition {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let dot = path.rfind('.').filter(|&dot| {
            match path.rfind(|c: char| c == '/' || c == MAIN_SEPARATOR) {
                Some(sep) => sep < dot,
                None => true,
            }
        });
        Self { path, dot }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn without_extension(&self) -> &str {
        match self.dot {
            Some(dot) => &self.path[..dot],
            None => &self.path,
        }
    }

    /// Extension including the leading dot, or `""`.
    pub fn extension(&self) -> &str {
        match self.dot {
            Some(dot) => &self.path[dot..],
            None => "",
        }
    }
}

/// Builds the concrete path for a base name, a date and a roll suffix.
pub type FileNameFormatter =
    Arc<dyn Fn(&FileNameDecomposition, NaiveDate, u32) -> FormattedPath + Send + Sync>;

/// `{base}.{yyyy-MM-dd}{ext}` and, for suffix `n > 0`, `{base}.{yyyy-MM-dd}{ext}.{n}`.
pub fn default_file_name_formatter() -> FileNameFormatter {
    Arc::new(|name: &FileNameDecomposition, date: NaiveDate, suffix: u32| {
        let mut path = format!(
            "{}.{}{}",
            name.without_extension(),
            date.format("%Y-%m-%d"),
            name.extension()
        );
        if suffix > 0 {
            path.push('.');
            path.push_str(&suffix.to_string());
        }
        FormattedPath::new(path, name.clone(), date, suffix)
    })
}

/// A concrete file name produced by a [`FileNameFormatter`].
#[derive(Clone, PartialEq, Eq)]
pub struct FormattedPath {
    path: PathBuf,
    name: FileNameDecomposition,
    date: NaiveDate,
    suffix: u32,
}

impl FormattedPath {
    pub fn new(
        path: impl Into<PathBuf>,
        name: FileNameDecomposition,
        date: NaiveDate,
        suffix: u32,
    ) -> Self {
        Self {
            path: path.into(),
            name,
            date,
            suffix,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn suffix(&self) -> u32 {
        self.suffix
    }

    pub fn name(&self) -> &FileNameDecomposition {
        &self.name
    }
}

impl fmt::Debug for FormattedPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FormattedPath").field(&self.path).finish()
    }
}

/// Source of "today" for date-based rolling.
pub trait DateProvider: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalDateProvider;

impl DateProvider for LocalDateProvider {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Clone)]
pub struct FileRollerOptions {
    pub triggers: FileRollTrigger,
    /// Size limit in bytes; `0` disables the size trigger
    pub max_file_size: u64,
    pub compress_rolled: bool,
    pub file_name_formatter: FileNameFormatter,
}

impl Default for FileRollerOptions {
    fn default() -> Self {
        Self {
            triggers: FileRollTrigger::DATE,
            max_file_size: 0,
            compress_rolled: true,
            file_name_formatter: default_file_name_formatter(),
        }
    }
}

impl FileRollerOptions {
    #[must_use = "builder methods return a new value"]
    pub fn with_triggers(mut self, triggers: FileRollTrigger) -> Self {
        self.triggers = triggers;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress_rolled = enabled;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn with_file_name_formatter(mut self, formatter: FileNameFormatter) -> Self {
        self.file_name_formatter = formatter;
        self
    }
}

impl fmt::Debug for FileRollerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileRollerOptions")
            .field("triggers", &self.triggers)
            .field("max_file_size", &self.max_file_size)
            .field("compress_rolled", &self.compress_rolled)
            .finish_non_exhaustive()
    }
}

pub trait FileRoller: Send + Sync {
    fn options(&self) -> &FileRollerOptions;

    fn today(&self) -> NaiveDate;

    /// Whether a file dated `file_date` holding `size` bytes must be replaced.
    fn should_roll(
        &self,
        name: &FileNameDecomposition,
        file_date: Option<NaiveDate>,
        size: u64,
    ) -> bool;

    /// Roll `previous` (if any) and return the path of the file to write next.
    ///
    /// Never fails: rolling problems are reported on stderr and the best available
    /// path is returned.
    fn roll(&self, name: &FileNameDecomposition, previous: Option<&FormattedPath>) -> FormattedPath;
}

pub struct DefaultFileRoller {
    options: FileRollerOptions,
    dates: Arc<dyn DateProvider>,
}

impl DefaultFileRoller {
    pub fn new(options: FileRollerOptions) -> Self {
        Self::with_date_provider(options, Arc::new(LocalDateProvider))
    }

    pub fn with_date_provider(options: FileRollerOptions, dates: Arc<dyn DateProvider>) -> Self {
        Self { options, dates }
    }

    fn format(&self, name: &FileNameDecomposition, date: NaiveDate, suffix: u32) -> FormattedPath {
        (self.options.file_name_formatter)(name, date, suffix)
    }

    /// Move `path` to suffix + 1, shifting whatever occupies that slot first.
    fn do_roll(&self, path: &FormattedPath) -> Result<()> {
        let plain = path.path().to_path_buf();
        let gz = with_gz(&plain);
        let (source, compressed) = if plain.exists() {
            (plain, false)
        } else if gz.exists() {
            (gz, true)
        } else {
            return Ok(());
        };

        let next = self.format(path.name(), path.date(), path.suffix() + 1);
        self.do_roll(&next)?;

        if !compressed && self.options.compress_rolled {
            gzip_copy(&source, &with_gz(next.path()))?;
        } else {
            let target = if compressed {
                with_gz(next.path())
            } else {
                next.path().to_path_buf()
            };
            plain_copy(&source, &target)?;
        }

        fs::remove_file(&source).map_err(|e| {
            LoggerError::file_rotation(
                source.display().to_string(),
                format!("remove failed: {}", e),
            )
        })
    }
}

impl FileRoller for DefaultFileRoller {
    fn options(&self) -> &FileRollerOptions {
        &self.options
    }

    fn today(&self) -> NaiveDate {
        self.dates.today()
    }

    fn should_roll(
        &self,
        _name: &FileNameDecomposition,
        file_date: Option<NaiveDate>,
        size: u64,
    ) -> bool {
        if let Some(date) = file_date {
            if self.options.triggers.contains(FileRollTrigger::DATE) && self.today() != date {
                return true;
            }
        }
        self.options.triggers.contains(FileRollTrigger::SIZE)
            && self.options.max_file_size > 0
            && size >= self.options.max_file_size
    }

    fn roll(
        &self,
        name: &FileNameDecomposition,
        previous: Option<&FormattedPath>,
    ) -> FormattedPath {
        if let Some(previous) = previous {
            if let Err(e) = self.do_roll(previous) {
                eprintln!("[WARN] Failed to roll {}: {}", previous.path().display(), e);
            }
        }
        let candidate = self.format(name, self.today(), 0);
        // targets are created fresh; move a leftover file aside
        if candidate.path().exists() {
            if let Err(e) = self.do_roll(&candidate) {
                eprintln!("[WARN] Failed to roll {}: {}", candidate.path().display(), e);
            }
        }
        candidate
    }
}

impl fmt::Debug for DefaultFileRoller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DefaultFileRoller")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

fn with_gz(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".gz");
    PathBuf::from(os)
}

fn open_target(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            LoggerError::io_operation(
                "roll log file",
                format!("Failed to create {}", path.display()),
                e,
            )
        })
}

fn open_source(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(|e| {
        LoggerError::io_operation(
            "roll log file",
            format!("Failed to open {}", path.display()),
            e,
        )
    })?;
    Ok(BufReader::with_capacity(COPY_BUFFER_SIZE, file))
}

fn gzip_copy(source: &Path, target: &Path) -> Result<()> {
    let mut reader = open_source(source)?;
    let writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, open_target(target)?);
    let mut encoder = GzEncoder::new(writer, Compression::best());
    let copied = io::copy(&mut reader, &mut encoder)
        .and_then(|_| encoder.finish())
        .and_then(|mut writer| writer.flush());
    copied.map_err(|e| {
        let _ = fs::remove_file(target);
        LoggerError::io_operation(
            "compress rolled file",
            format!("Failed to compress {}", source.display()),
            e,
        )
    })
}

fn plain_copy(source: &Path, target: &Path) -> Result<()> {
    let mut reader = open_source(source)?;
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, open_target(target)?);
    io::copy(&mut reader, &mut writer)
        .and_then(|_| writer.flush())
        .map_err(|e| {
            let _ = fs::remove_file(target);
            LoggerError::io_operation(
                "roll log file",
                format!("Failed to copy {}", source.display()),
                e,
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::tempdir;

    struct FixedDate(NaiveDate);

    impl DateProvider for FixedDate {
        fn today(&self) -> NaiveDate {
            self.0
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, d).unwrap()
    }

    fn roller(options: FileRollerOptions, today: NaiveDate) -> DefaultFileRoller {
        DefaultFileRoller::with_date_provider(options, Arc::new(FixedDate(today)))
    }

    #[test]
    fn test_decomposition() {
        let name = FileNameDecomposition::new("/var/log/app.log");
        assert_eq!(name.without_extension(), "/var/log/app");
        assert_eq!(name.extension(), ".log");

        let name = FileNameDecomposition::new("/var/log.d/app");
        assert_eq!(name.without_extension(), "/var/log.d/app");
        assert_eq!(name.extension(), "");

        let name = FileNameDecomposition::new("app");
        assert_eq!(name.extension(), "");
    }

    #[test]
    fn test_default_formatter() {
        let name = FileNameDecomposition::new("/logs/app.log");
        let format = default_file_name_formatter();
        assert_eq!(format(&name, day(8), 0).path(), Path::new("/logs/app.2025-01-08.log"));
        assert_eq!(format(&name, day(8), 3).path(), Path::new("/logs/app.2025-01-08.log.3"));
    }

    #[test]
    fn test_trigger_parsing() {
        assert_eq!("date".parse::<FileRollTrigger>().unwrap(), FileRollTrigger::DATE);
        assert_eq!("SIZE".parse::<FileRollTrigger>().unwrap(), FileRollTrigger::SIZE);
        let both: FileRollTrigger = "date, size".parse().unwrap();
        assert!(both.contains(FileRollTrigger::DATE) && both.contains(FileRollTrigger::SIZE));
        let both: FileRollTrigger = "size|date".parse().unwrap();
        assert_eq!(both, FileRollTrigger::DATE | FileRollTrigger::SIZE);
        assert!("hourly".parse::<FileRollTrigger>().is_err());
    }

    #[test]
    fn test_should_roll_by_date() {
        let roller = roller(FileRollerOptions::default(), day(9));
        let name = FileNameDecomposition::new("app.log");
        assert!(roller.should_roll(&name, Some(day(8)), 0));
        assert!(!roller.should_roll(&name, Some(day(9)), u64::MAX));
        assert!(!roller.should_roll(&name, None, 0));
    }

    #[test]
    fn test_should_roll_by_size() {
        let options = FileRollerOptions::default()
            .with_triggers(FileRollTrigger::SIZE)
            .with_max_file_size(100);
        let sized = roller(options, day(9));
        let name = FileNameDecomposition::new("app.log");
        assert!(!sized.should_roll(&name, Some(day(1)), 99));
        assert!(sized.should_roll(&name, Some(day(9)), 100));

        let unlimited = roller(
            FileRollerOptions::default().with_triggers(FileRollTrigger::SIZE),
            day(9),
        );
        assert!(!unlimited.should_roll(&name, None, u64::MAX));
    }

    #[test]
    fn test_roll_shifts_and_compresses() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("app.log");
        let name = FileNameDecomposition::new(base.to_string_lossy());
        let roller = roller(FileRollerOptions::default(), day(8));

        let first = roller.roll(&name, None);
        fs::write(first.path(), b"first").unwrap();
        let second = roller.roll(&name, Some(&first));
        assert_eq!(second.path(), first.path());
        assert!(!first.path().exists());
        fs::write(second.path(), b"second").unwrap();
        roller.roll(&name, Some(&second));

        let one = dir.path().join("app.2025-01-08.log.1.gz");
        let two = dir.path().join("app.2025-01-08.log.2.gz");
        let mut text = String::new();
        GzDecoder::new(File::open(&one).unwrap()).read_to_string(&mut text).unwrap();
        assert_eq!(text, "second");
        text.clear();
        GzDecoder::new(File::open(&two).unwrap()).read_to_string(&mut text).unwrap();
        assert_eq!(text, "first");
    }

    #[test]
    fn test_roll_without_compression() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("plain.txt");
        let name = FileNameDecomposition::new(base.to_string_lossy());
        let roller = roller(FileRollerOptions::default().with_compression(false), day(8));

        let current = roller.roll(&name, None);
        fs::write(current.path(), b"data").unwrap();
        roller.roll(&name, Some(&current));

        let rolled = dir.path().join("plain.2025-01-08.txt.1");
        assert_eq!(fs::read_to_string(rolled).unwrap(), "data");
    }

    #[test]
    fn test_leftover_candidate_is_moved_aside() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("app.log");
        let name = FileNameDecomposition::new(base.to_string_lossy());
        let roller = roller(FileRollerOptions::default().with_compression(false), day(8));

        let leftover = dir.path().join("app.2025-01-08.log");
        fs::write(&leftover, b"old run").unwrap();
        let candidate = roller.roll(&name, None);
        assert_eq!(candidate.path(), leftover.as_path());
        assert!(!leftover.exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("app.2025-01-08.log.1")).unwrap(),
            "old run"
        );
    }
}

use crate::{
    config::Config,
    log::{log_level::LogLevel, log_msg::LogMsg, logger_handle::LoggerHandle},
};

use std::{
    fs::{self, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    sync::mpsc::{self, TrySendError},
    thread,
    time::{SystemTime, UNIX_EPOCH},
};

/// Flush every 100 lines while debugging so a crash loses little.
#[cfg(feature = "log-debug")]
const FLUSH_BATCH_SIZE: u32 = 100;

/// Flush every 1000 lines otherwise.
#[cfg(not(feature = "log-debug"))]
const FLUSH_BATCH_SIZE: u32 = 1_000;

const DEFAULT_APP_NAME: &str = "rustymeet";

/// Bounded, non-blocking logger writing one file per client process.
///
/// Producers enqueue through [`LoggerHandle`]s; a `logger-worker` thread drains
/// the queue into the file and forwards a sample to the UI log panel. Warn and
/// Error lines are always forwarded, other levels one in `sample_every`.
pub struct Logger {
    handle: LoggerHandle,
    ui_log_rx: mpsc::Receiver<String>,
    _thread: Option<thread::JoinHandle<()>>,
    file_path: PathBuf,
}

impl Logger {
    /// Starts the logger from the `[Logging]` section of the client config.
    ///
    /// `client_log_path` selects the directory (a leading `~` is expanded);
    /// `client_log_filename` prefixes the file name.
    #[must_use]
    pub fn start_client(cap: usize, ui_cap: usize, sample_every: u32, config: &Config) -> Self {
        let app_name = config
            .get_non_empty("Logging", "client_log_filename")
            .unwrap_or(DEFAULT_APP_NAME);

        match config.get_non_empty("Logging", "client_log_path") {
            Some(dir) => Self::start_in_dir(expand_path(dir), app_name, cap, ui_cap, sample_every),
            None => Self::start_default(app_name, cap, ui_cap, sample_every),
        }
    }

    /// Starts the logger in a `logs/` directory next to the executable.
    #[must_use]
    pub fn start_default(app_name: &str, cap: usize, ui_cap: usize, sample_every: u32) -> Self {
        let base = exe_dir_fallback_cwd().join("logs");
        Self::start_in_dir(base, app_name, cap, ui_cap, sample_every)
    }

    /// Starts the logger in `dir`, creating it if missing.
    ///
    /// The file is named `<app_name>-<YYYYMMDD_HHMMSS>-pid<N>.log`. If it cannot
    /// be opened the worker falls back to a temp file, then to a null sink.
    pub fn start_in_dir<D: AsRef<Path>>(
        dir: D,
        app_name: &str,
        cap: usize,
        ui_cap: usize,
        sample_every: u32,
    ) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let _ = fs::create_dir_all(&dir);

        let sample_every = sample_every.max(1);
        let fname = format!(
            "{}-{}-pid{}.log",
            app_name,
            timestamp_for_filename(),
            std::process::id()
        );
        let file_path = dir.join(fname);

        let (tx, rx) = mpsc::sync_channel::<LogMsg>(cap);
        let (ui_tx, ui_rx) = mpsc::sync_channel::<String>(ui_cap);

        let worker_path = file_path.clone();
        let _thread = thread::Builder::new()
            .name("logger-worker".into())
            .spawn(move || run_worker(&worker_path, &rx, &ui_tx, sample_every))
            .ok();

        Self {
            handle: LoggerHandle { tx },
            ui_log_rx: ui_rx,
            _thread,
            file_path,
        }
    }

    /// Enqueues a line without blocking; see [`LoggerHandle::try_log`].
    ///
    /// # Errors
    /// Returns the rejected message when the queue is full or the worker is gone.
    pub fn try_log<S: Into<String>>(
        &self,
        level: LogLevel,
        text: S,
        target: &'static str,
    ) -> Result<(), TrySendError<LogMsg>> {
        self.handle.try_log(level, text, target)
    }

    /// Returns a cloneable sink for handing to managers.
    #[must_use]
    pub fn handle(&self) -> LoggerHandle {
        self.handle.clone()
    }

    /// Pops one sampled line for the UI log panel, if any.
    #[must_use]
    pub fn try_recv_ui(&self) -> Option<String> {
        self.ui_log_rx.try_recv().ok()
    }

    /// Path of the active log file.
    #[must_use]
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }
}

fn open_writer(path: &Path) -> Box<dyn Write + Send> {
    let open = |p: &Path| OpenOptions::new().create(true).append(true).open(p);
    if let Ok(f) = open(path) {
        return Box::new(f);
    }
    match open(&std::env::temp_dir().join("rustymeet-fallback.log")) {
        Ok(f) => Box::new(f),
        Err(_) => Box::new(io::sink()),
    }
}

fn run_worker(
    path: &Path,
    rx: &mpsc::Receiver<LogMsg>,
    ui_tx: &mpsc::SyncSender<String>,
    sample_every: u32,
) {
    let mut out = BufWriter::new(open_writer(path));

    let mut sampled: u32 = 0;
    let mut lines_written: u32 = 0;
    let mut dropped_to_ui: usize = 0;

    while let Ok(m) = rx.recv() {
        let _ = writeln!(&mut out, "{}", m.to_file_line());
        lines_written = lines_written.wrapping_add(1);
        if lines_written.is_multiple_of(FLUSH_BATCH_SIZE) || m.level == LogLevel::Error {
            let _ = out.flush();
        }

        let forward = m.level.is_urgent() || {
            sampled = sampled.wrapping_add(1);
            sampled.is_multiple_of(sample_every)
        };
        if forward && ui_tx.try_send(m.to_ui_line()).is_err() {
            dropped_to_ui += 1;
        }

        if dropped_to_ui >= 10 {
            let _ = ui_tx.try_send(format!(
                "(logger) UI log queue dropped {dropped_to_ui} lines"
            ));
            dropped_to_ui = 0;
        }
    }

    let _ = out.flush();
}

/// Directory of the running executable, or the working directory as a fallback.
fn exe_dir_fallback_cwd() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// `YYYYMMDD_HHMMSS` in UTC, e.g. `20261016_154603`.
fn timestamp_for_filename() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();

    unix_to_utc(secs).map_or_else(
        || format!("unix_{secs}"),
        |tm| {
            format!(
                "{:04}{:02}{:02}_{:02}{:02}{:02}",
                tm.year, tm.mon, tm.day, tm.hour, tm.min, tm.sec
            )
        },
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SimpleUtc {
    year: i32,
    mon: u32,
    day: u32,
    hour: u32,
    min: u32,
    sec: u32,
}

/// Civil-from-days conversion of a UNIX timestamp.
#[allow(clippy::many_single_char_names)]
fn unix_to_utc(mut s: u64) -> Option<SimpleUtc> {
    let sec = u32::try_from(s % 60).ok()?;
    s /= 60;
    let min = u32::try_from(s % 60).ok()?;
    s /= 60;
    let hour = u32::try_from(s % 24).ok()?;
    s /= 24;

    let z: i128 = i128::from(s) + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = mp + if mp < 10 { 3 } else { -9 };

    Some(SimpleUtc {
        year: i32::try_from(y + i128::from(m <= 2)).ok()?,
        mon: u32::try_from(m).ok()?,
        day: u32::try_from(d).ok()?,
        hour,
        min,
        sec,
    })
}

/// Expands a leading `~` to the user's home directory.
pub(crate) fn expand_path(path_str: &str) -> PathBuf {
    let Some(rest) = path_str.strip_prefix('~') else {
        return PathBuf::from(path_str);
    };
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .ok()
        .map(PathBuf::from);

    match home {
        Some(home) if rest.is_empty() => home,
        Some(mut home) if rest.starts_with('/') || rest.starts_with('\\') => {
            home.push(&rest[1..]);
            home
        }
        _ => PathBuf::from(path_str),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]
    use super::*;
    use std::time::{Duration, Instant};

    #[test]
    fn unix_to_utc_converts_known_instants() {
        assert_eq!(
            unix_to_utc(0),
            Some(SimpleUtc { year: 1970, mon: 1, day: 1, hour: 0, min: 0, sec: 0 })
        );
        // 2024-02-29T12:34:56Z
        assert_eq!(
            unix_to_utc(1_709_210_096),
            Some(SimpleUtc { year: 2024, mon: 2, day: 29, hour: 12, min: 34, sec: 56 })
        );
    }

    #[test]
    fn expand_path_leaves_plain_paths_alone() {
        assert_eq!(expand_path("./log"), PathBuf::from("./log"));
        assert_eq!(expand_path("~user/x"), PathBuf::from("~user/x"));
    }

    #[test]
    fn worker_writes_lines_and_forwards_warnings_to_ui() {
        let dir = std::env::temp_dir().join(format!("rustymeet_logger_test_{}", std::process::id()));
        let logger = Logger::start_in_dir(&dir, "unit", 16, 16, 1_000);

        logger
            .try_log(LogLevel::Warn, "join rejected", "test")
            .expect("queue has room");

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut ui_line = None;
        while Instant::now() < deadline {
            if let Some(line) = logger.try_recv_ui() {
                ui_line = Some(line);
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(ui_line.as_deref(), Some("[WARN] join rejected"));

        let name = logger.file_path().file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("unit-"));
        assert!(name.ends_with(".log"));

        drop(logger);
        let _ = fs::remove_dir_all(&dir);
    }
}

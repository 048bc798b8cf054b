//! Captures `log` records per test thread.

use log::{Level, LevelFilter, Log, Metadata, Record};
use std::sync::{Mutex, Once};
use std::thread::{self, ThreadId};

struct CaptureLogger {
    records: Mutex<Vec<(ThreadId, Level, String)>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.records.lock().unwrap().push((
            thread::current().id(),
            record.level(),
            record.args().to_string(),
        ));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger {
    records: Mutex::new(Vec::new()),
};
static INIT: Once = Once::new();

/// Installs the capturing logger and forgets earlier records of the current thread.
pub(crate) fn capture_logs() {
    INIT.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(LevelFilter::Trace);
    });
    let current = thread::current().id();
    LOGGER
        .records
        .lock()
        .unwrap()
        .retain(|(thread_id, _, _)| *thread_id != current);
}

/// Messages at `level` logged by the current thread since the last [`capture_logs`].
pub(crate) fn logged(level: Level) -> Vec<String> {
    let current = thread::current().id();
    LOGGER
        .records
        .lock()
        .unwrap()
        .iter()
        .filter(|(thread_id, record_level, _)| *thread_id == current && *record_level == level)
        .map(|(_, _, message)| message.clone())
        .collect()
}

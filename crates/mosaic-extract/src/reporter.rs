//! Progress reporting sink injected into the orchestrator and platform clients.

use std::io::Write;
use std::sync::Mutex;

use console::style;

/// Severity of a user-facing progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Header,
    Step,
    Info,
    Success,
    Warning,
    Failure,
    Progress,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub kind: EventKind,
    pub message: String,
}

/// Receives progress and status events. Implementations must be cheap and
/// must not fail; a broken terminal never aborts an extraction.
pub trait Reporter: Send + Sync {
    fn report(&self, event: ProgressEvent);

    fn header(&self, message: &str) {
        self.emit(EventKind::Header, message);
    }

    fn step(&self, message: &str) {
        self.emit(EventKind::Step, message);
    }

    fn info(&self, message: &str) {
        self.emit(EventKind::Info, message);
    }

    fn success(&self, message: &str) {
        self.emit(EventKind::Success, message);
    }

    fn warning(&self, message: &str) {
        self.emit(EventKind::Warning, message);
    }

    fn failure(&self, message: &str) {
        self.emit(EventKind::Failure, message);
    }

    fn progress(&self, message: &str) {
        self.emit(EventKind::Progress, message);
    }

    #[doc(hidden)]
    fn emit(&self, kind: EventKind, message: &str) {
        self.report(ProgressEvent {
            kind,
            message: message.to_string(),
        });
    }
}

type Sink = Mutex<Box<dyn Write + Send>>;

/// Line-oriented output: events on stdout, warnings and failures on stderr.
///
/// Styling follows `console`'s terminal detection, so piped output is plain
/// text with the same lines.
pub struct ConsoleReporter {
    out: Sink,
    err: Sink,
}

impl ConsoleReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::with_writers(Box::new(std::io::stdout()), Box::new(std::io::stderr()))
    }

    #[must_use]
    pub fn with_writers(out: Box<dyn Write + Send>, err: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            err: Mutex::new(err),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConsoleReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleReporter").finish_non_exhaustive()
    }
}

fn render(event: &ProgressEvent) -> String {
    let message = event.message.as_str();
    match event.kind {
        EventKind::Header => {
            let rule = "=".repeat(60);
            format!(
                "\n{}\n{}\n{}",
                style(&rule).cyan(),
                style(message).cyan().bold(),
                style(&rule).cyan()
            )
        }
        EventKind::Step => format!("{} {}", style("🔍").blue(), style(message).blue()),
        EventKind::Info => format!("{} {message}", style("ℹ").cyan()),
        EventKind::Success => format!("{} {}", style("✅").green(), style(message).green()),
        EventKind::Warning => format!(
            "{} {}",
            style("⚠").yellow().for_stderr(),
            style(message).yellow().for_stderr()
        ),
        EventKind::Failure => format!(
            "{} {}",
            style("❌").red().for_stderr(),
            style(message).red().for_stderr()
        ),
        EventKind::Progress => format!("   {}", style(message).dim()),
    }
}

impl Reporter for ConsoleReporter {
    fn report(&self, event: ProgressEvent) {
        let line = render(&event);
        let sink = match event.kind {
            EventKind::Warning | EventKind::Failure => &self.err,
            _ => &self.out,
        };
        if let Ok(mut writer) = sink.lock() {
            if let Err(e) = writeln!(writer, "{line}").and_then(|()| writer.flush()) {
                tracing::debug!(error = %e, "reporter write failed");
            }
        }
    }
}

/// Keeps every event in memory; used by tests to assert on reported output.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Messages of every event of the given kind, in order.
    #[must_use]
    pub fn messages(&self, kind: EventKind) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.message)
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
pub(crate) mod capture {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    /// Cloneable in-memory writer standing in for a pipe.
    #[derive(Clone, Default)]
    pub(crate) struct Pipe(Arc<Mutex<Vec<u8>>>);

    impl Write for Pipe {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl Pipe {
        pub(crate) fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }
}

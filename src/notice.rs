//! Host-facing notices.
//!
//! Passes report configuration problems and documented skips to the host
//! through a sink; nothing is returned and nothing is awaited. The binary
//! routes notices to the log; tests record them.

/// A user-visible notice sink provided by the host. Fire-and-forget.
pub trait NoticeSink {
    fn notify(&mut self, title: &str, text: &str);
}

/// Default sink: notices go to the log.
#[derive(Debug, Default)]
pub struct LogSink;

impl NoticeSink for LogSink {
    fn notify(&mut self, title: &str, text: &str) {
        log::info!("[{title}] {text}");
    }
}

/// Recording sink for tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub notices: Vec<(String, String)>,
}

impl NoticeSink for RecordingSink {
    fn notify(&mut self, title: &str, text: &str) {
        self.notices.push((title.to_string(), text.to_string()));
    }
}

use chrono::Utc;
use serde::Serialize;

/// One completed request, in the shape emitted to a [`ReportWriter`].
#[derive(Debug, Clone, Serialize)]
pub struct ReportEvent {
    pub time: String,
    pub method: String,
    pub url: String,
    pub path: String,
    pub proto: String,
    pub status: u16,
    pub content_length: u64,
    pub ms: u64,
    pub host: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwarded_for: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwarded_proto: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

impl ReportEvent {
    /// The current instant, formatted as RFC3339 with nanosecond precision.
    pub fn now_rfc3339() -> String {
        Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Nanos, true)
    }
}

/// Receives one [`ReportEvent`] per completed request. The default
/// configuration has no writer; configuring one is how an operator wires
/// this crate's requests into their own logging/analytics pipeline.
pub trait ReportWriter: Send + Sync {
    fn write(&self, event: &ReportEvent);
}

/// Writes each event as a single line of JSON to the given sink.
pub struct JsonLineWriter<W> {
    sink: std::sync::Mutex<W>,
}

impl<W: std::io::Write + Send> JsonLineWriter<W> {
    pub fn new(sink: W) -> Self {
        JsonLineWriter {
            sink: std::sync::Mutex::new(sink),
        }
    }
}

impl<W: std::io::Write + Send> ReportWriter for JsonLineWriter<W> {
    fn write(&self, event: &ReportEvent) {
        let Ok(line) = serde_json::to_string(event) else {
            return;
        };
        let mut sink = self.sink.lock().expect("report sink poisoned");
        let _ = writeln!(sink, "{line}");
    }
}

//! Cross-restart memory of reported addresses.
//!
//! `SeenSet` is the in-process blacklist; `DetectionLog` is the append-only
//! file it is rebuilt from on startup. The extraction engine never touches
//! either.

use std::{
    collections::HashSet,
    fs::{self, OpenOptions},
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
    domain::IncomingMessage,
    extract::{Detection, DetectionKind},
    utils::iso_timestamp_utc,
    Result,
};

/// Version tag written into JSON detection records.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Addresses already reported during this process lifetime.
#[derive(Clone, Debug, Default)]
pub struct SeenSet {
    inner: HashSet<String>,
}

impl SeenSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.inner.contains(address)
    }

    /// Returns `true` if the address was not seen before.
    pub fn insert(&mut self, address: impl Into<String>) -> bool {
        self.inner.insert(address.into())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Extend<String> for SeenSet {
    fn extend<T: IntoIterator<Item = String>>(&mut self, iter: T) {
        self.inner.extend(iter);
    }
}

/// One persisted detection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub schema_version: String,
    pub address: String,
    pub kind: DetectionKind,
    pub evidence: String,
    pub chat_id: i64,
    pub message_id: i32,
    pub sender: String,
    pub detected_at: String,
}

impl DetectionRecord {
    pub fn new(detection: &Detection, msg: &IncomingMessage) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            address: detection.address.clone(),
            kind: detection.kind,
            evidence: detection.evidence.clone(),
            chat_id: msg.chat_id.0,
            message_id: msg.message_id.0,
            sender: msg.sender_key(),
            detected_at: iso_timestamp_utc(),
        }
    }

    /// Tab-separated line for the plain-text log.
    ///
    /// Evidence is only shown for non-standard detections; newlines in it are
    /// escaped so each record stays on one line.
    pub fn to_line(&self) -> String {
        let extra = match self.kind {
            DetectionKind::Standard => String::new(),
            DetectionKind::Obfuscated => {
                format!(" [OBFUSCATED] (original: {})", one_line(&self.evidence))
            }
            DetectionKind::Split => format!(" [SPLIT] (fragments: {})", one_line(&self.evidence)),
        };
        format!(
            "{}\tfrom: {}\tby: {}\tmsg_id: {}{extra}",
            self.address, self.chat_id, self.sender, self.message_id
        )
    }
}

fn one_line(s: &str) -> String {
    s.replace('\r', "\\r").replace('\n', "\\n")
}

/// Append-only detection log, doubling as the persisted blacklist.
#[derive(Clone, Debug)]
pub struct DetectionLog {
    path: PathBuf,
    json: bool,
}

impl DetectionLog {
    pub fn new(path: impl Into<PathBuf>, json: bool) -> Self {
        Self {
            path: path.into(),
            json,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every address recorded so far, in file order.
    ///
    /// Plain lines contribute their first whitespace-separated token; JSON lines
    /// their `address` field. A missing file is an empty log.
    pub fn load_addresses(&self) -> Result<Vec<String>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut out = Vec::new();
        for raw in contents.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('{') {
                match serde_json::from_str::<DetectionRecord>(line) {
                    Ok(rec) => out.push(rec.address),
                    Err(e) => tracing::warn!(path = %self.path.display(), "skipping bad record: {e}"),
                }
                continue;
            }
            if let Some(token) = line.split_whitespace().next() {
                out.push(token.to_string());
            }
        }
        Ok(out)
    }

    pub fn append(&self, record: &DetectionRecord) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let line = if self.json {
            serde_json::to_string(record)?
        } else {
            record.to_line()
        };
        writeln!(file, "{line}")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatId, MessageId, UserId};
    use chrono::Utc;
    use std::time::Duration;

    const ADDR: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    fn tmp_file(prefix: &str) -> PathBuf {
        let ts = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_nanos();
        let pid = std::process::id();
        PathBuf::from(format!("/tmp/{prefix}-{pid}-{ts}.log"))
    }

    fn msg() -> IncomingMessage {
        IncomingMessage {
            chat_id: ChatId(-4945112939),
            message_id: MessageId(42),
            sender_id: Some(UserId(448480473)),
            sender_username: None,
            text: String::new(),
            date: Utc::now(),
        }
    }

    fn detection(kind: DetectionKind, evidence: &str) -> Detection {
        Detection {
            address: ADDR.to_string(),
            evidence: evidence.to_string(),
            kind,
        }
    }

    #[test]
    fn seen_set_reports_new_inserts() {
        let mut seen = SeenSet::new();
        assert!(seen.insert(ADDR));
        assert!(!seen.insert(ADDR));
        assert!(seen.contains(ADDR));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn line_format_per_kind() {
        let rec = DetectionRecord::new(&detection(DetectionKind::Standard, ADDR), &msg());
        assert_eq!(
            rec.to_line(),
            format!("{ADDR}\tfrom: -4945112939\tby: 448480473\tmsg_id: 42")
        );

        let rec = DetectionRecord::new(&detection(DetectionKind::Obfuscated, "9Wz-D"), &msg());
        assert!(rec.to_line().ends_with(" [OBFUSCATED] (original: 9Wz-D)"));

        let rec = DetectionRecord::new(&detection(DetectionKind::Split, "a\nb"), &msg());
        assert!(rec.to_line().ends_with(" [SPLIT] (fragments: a\\nb)"));
    }

    #[test]
    fn missing_log_loads_empty() {
        let log = DetectionLog::new(tmp_file("caw-missing"), false);
        assert!(log.load_addresses().unwrap().is_empty());
    }

    #[test]
    fn plain_log_round_trips_addresses() {
        let path = tmp_file("caw-plain");
        let log = DetectionLog::new(&path, false);
        log.append(&DetectionRecord::new(
            &detection(DetectionKind::Split, "x + y"),
            &msg(),
        ))
        .unwrap();
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .and_then(|mut f| writeln!(f, "\n   \nLegacyAddr111 trailing words"))
            .unwrap();

        let addrs = log.load_addresses().unwrap();
        assert_eq!(addrs, vec![ADDR.to_string(), "LegacyAddr111".to_string()]);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn json_log_is_readable_back() {
        let path = tmp_file("caw-json");
        let log = DetectionLog::new(&path, true);
        let rec = DetectionRecord::new(&detection(DetectionKind::Obfuscated, "a-b"), &msg());
        log.append(&rec).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        let parsed: DetectionRecord = serde_json::from_str(written.trim()).unwrap();
        assert_eq!(parsed, rec);
        assert_eq!(parsed.schema_version, SCHEMA_VERSION);
        assert_eq!(log.load_addresses().unwrap(), vec![ADDR.to_string()]);
        let _ = std::fs::remove_file(&path);
    }
}

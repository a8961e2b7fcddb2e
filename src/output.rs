use crate::kafka::Record;
use crate::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use clap::ValueEnum;
use serde::Serialize;

/// How record keys and payloads are written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Encoding {
    /// UTF-8 text; invalid sequences are replaced.
    #[default]
    Utf8,
    Base64,
}

#[derive(Serialize)]
struct RecordLine<'a> {
    topic: &'a str,
    partition: i32,
    offset: i64,
    key: String,
    payload: String,
}

impl Encoding {
    fn encode(self, bytes: &[u8]) -> String {
        match self {
            Encoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Encoding::Base64 => STANDARD.encode(bytes),
        }
    }
}

/// Renders a record as a single JSON line.
pub fn record_to_json_line(record: &Record, encoding: Encoding) -> Result<String> {
    let line = RecordLine {
        topic: &record.topic,
        partition: record.partition,
        offset: record.offset,
        key: encoding.encode(&record.key),
        payload: encoding.encode(&record.payload),
    };
    Ok(serde_json::to_string(&line)?)
}

/// Splits an input line into key and payload at the first `separator`. A
/// line without the separator is a payload with an empty key.
pub fn split_key_payload<'a>(line: &'a str, separator: &str) -> (&'a str, &'a str) {
    match line.split_once(separator) {
        Some((key, payload)) => (key, payload),
        None => ("", line),
    }
}

use crate::{Error, Result};
use bytes::Bytes;
use std::fmt;
use std::str::FromStr;

/// Start reading from the first retained record of the partition.
pub const OFFSET_BEGINNING: i64 = -2;
/// Start reading after the last record currently in the partition.
pub const OFFSET_END: i64 = -1;
/// Resume from the group's committed offset.
pub const OFFSET_STORED: i64 = -1000;
/// No offset; the engine falls back to `auto.offset.reset`.
pub const OFFSET_INVALID: i64 = -1001;
/// `OFFSET_TAIL_BASE - n` starts `n` records before the end.
pub const OFFSET_TAIL_BASE: i64 = -2000;

/// A partition of a topic together with a position in it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicPartitionOffset {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
}

impl TopicPartitionOffset {
    pub fn new(topic: impl Into<String>, partition: i32, offset: i64) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
        }
    }
}

impl fmt::Display for TopicPartitionOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.topic, self.partition, self.offset)
    }
}

/// Parses `topic:partition:offset`. The offset may also be one of
/// `earliest`, `latest`, `stored` or `tail-N`.
impl FromStr for TopicPartitionOffset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || {
            Error::InvalidArgument(format!(
                "expected topic:partition:offset, got '{}'",
                s
            ))
        };

        let mut parts = s.rsplitn(3, ':');
        let (Some(offset), Some(partition), Some(topic)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        if topic.is_empty() {
            return Err(invalid());
        }

        let partition: i32 = partition.parse().map_err(|_| invalid())?;
        if partition < 0 {
            return Err(invalid());
        }

        let offset = match offset {
            "earliest" | "beginning" => OFFSET_BEGINNING,
            "latest" | "end" => OFFSET_END,
            "stored" => OFFSET_STORED,
            tail if tail.starts_with("tail-") => {
                let n: i64 = tail["tail-".len()..].parse().map_err(|_| invalid())?;
                if n < 0 {
                    return Err(invalid());
                }
                OFFSET_TAIL_BASE.checked_sub(n).ok_or_else(invalid)?
            }
            raw => raw.parse().map_err(|_| invalid())?,
        };

        Ok(Self::new(topic, partition, offset))
    }
}

/// A record read from the log, reported exactly as the engine returned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    /// Empty when the record had no key.
    pub key: Bytes,
    pub payload: Bytes,
}

/// A record to hand to the producer.
///
/// `partition: None` lets the engine's partitioner pick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRecord {
    pub topic: String,
    pub partition: Option<i32>,
    pub key: Bytes,
    pub payload: Bytes,
}

impl OutboundRecord {
    pub fn new(
        topic: impl Into<String>,
        partition: Option<i32>,
        key: impl Into<Bytes>,
        payload: impl Into<Bytes>,
    ) -> Self {
        Self {
            topic: topic.into(),
            partition,
            key: key.into(),
            payload: payload.into(),
        }
    }

    /// Maps the engine's "unassigned" partition sentinel (`-1`) to `None`.
    pub fn partition_from_raw(raw: i32) -> Option<i32> {
        if raw < 0 {
            None
        } else {
            Some(raw)
        }
    }
}

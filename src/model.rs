use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One stored log row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub region: String,
    pub time: i64,
    pub message: String,
}

/// Row count per region. Only regions that have rows appear.
pub type Stats = BTreeMap<String, u64>;

/// Demo corpus record: `{ "raw": { "time": 1700000000000, "log": "..." } }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DemoRecord {
    #[serde(default)]
    pub raw: RawLog,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLog {
    #[serde(default)]
    pub time: i64,
    #[serde(default)]
    pub log: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsQuery {
    pub region: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsResponse {
    pub region: String,
    pub start: String,
    pub end: String,
    pub count: usize,
    pub logs: Vec<LogEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub time: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EpochQuery {
    pub year: Option<String>,
    pub month: Option<String>,
    pub day: Option<String>,
    pub time: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochResponse {
    pub epoch_ms: i64,
    pub date: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadableQuery {
    pub epoch_ms: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadableResponse {
    pub epoch_ms: i64,
    pub readable: String,
    pub utc: String,
}

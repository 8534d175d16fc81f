use chrono::{SecondsFormat, Utc};
use tracing::debug;

use crate::error::{LogQueryError, Result};
use crate::model::{EpochResponse, HealthResponse, LogsResponse, ReadableResponse, Stats};
use crate::store::LogStore;
use crate::time_codec;

/// Request-shaped operations over an initialized [`LogStore`].
#[derive(Debug, Clone)]
pub struct QueryService {
    store: LogStore,
}

impl QueryService {
    pub fn new(store: LogStore) -> Self {
        Self { store }
    }

    /// All entries of `region` between the two epoch-millisecond bounds,
    /// inclusive. Bounds are echoed back exactly as given.
    pub async fn get_logs(&self, region: &str, start: &str, end: &str) -> Result<LogsResponse> {
        if region.is_empty() || start.is_empty() || end.is_empty() {
            return Err(LogQueryError::InvalidRequest(
                "Missing required parameters: region, start_date, end_date".to_string(),
            ));
        }
        let start_ms = parse_bound("start_date", start)?;
        let end_ms = parse_bound("end_date", end)?;

        let logs = self.store.query(region, start_ms, end_ms).await?;
        debug!(region, count = logs.len(), "get_logs");
        Ok(LogsResponse {
            region: region.to_string(),
            start: start.to_string(),
            end: end.to_string(),
            count: logs.len(),
            logs,
        })
    }

    pub async fn get_stats(&self) -> Result<Stats> {
        self.store.stats().await
    }

    /// Liveness only; the store is not consulted.
    pub fn health(&self) -> HealthResponse {
        HealthResponse {
            status: "healthy".to_string(),
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    pub fn to_epoch(&self, year: &str, month: &str, day: &str, time: &str) -> Result<EpochResponse> {
        if year.is_empty() || month.is_empty() || day.is_empty() || time.is_empty() {
            return Err(LogQueryError::InvalidRequest(
                "Missing parameters: year, month, day, time".to_string(),
            ));
        }
        let conv = time_codec::to_epoch_millis(year, month, day, time)?;
        Ok(EpochResponse {
            epoch_ms: conv.epoch_ms,
            date: conv.date,
        })
    }

    pub fn to_readable(&self, epoch_ms: &str) -> Result<ReadableResponse> {
        if epoch_ms.is_empty() {
            return Err(LogQueryError::InvalidRequest(
                "Missing parameter: epoch_ms".to_string(),
            ));
        }
        let ms = time_codec::parse_epoch_millis(epoch_ms)?;
        let readable = time_codec::to_readable(ms)?;
        Ok(ReadableResponse {
            epoch_ms: ms,
            readable: readable.readable,
            utc: readable.utc,
        })
    }
}

fn parse_bound(name: &str, value: &str) -> Result<i64> {
    value.trim().parse::<i64>().map_err(|_| {
        LogQueryError::InvalidRequest(format!(
            "Invalid {name}: expected epoch milliseconds, got {value:?}"
        ))
    })
}

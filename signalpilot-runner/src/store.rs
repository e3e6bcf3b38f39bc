//! JSONL-backed repository — append-only local persistence.
//!
//! One file per record kind under the data directory, one JSON object per
//! line. The format survives partial writes (a torn final line is skipped on
//! load) and is trivially greppable. Query semantics come from an in-memory
//! index rebuilt at open; the files are the source of truth.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use signalpilot_core::domain::{AnalysisRecord, EvaluationResult, EvaluationSummary, Interval};
use signalpilot_core::repository::{
    AnalysisRepository, RecordPage, RepositoryError, TimeRangeQuery,
};
use signalpilot_core::store::MemoryRepository;

const RECORDS_FILE: &str = "records.jsonl";
const EVALUATIONS_FILE: &str = "evaluations.jsonl";
const SUMMARIES_FILE: &str = "summaries.jsonl";

/// Append-only JSONL store with an in-memory query index.
pub struct JsonlRepository {
    dir: PathBuf,
    index: MemoryRepository,
    // Serializes appends so concurrent writers cannot interleave lines.
    append_lock: Mutex<()>,
}

impl JsonlRepository {
    /// Open (or create) a store under `dir`, replaying existing files into
    /// the index. Malformed lines are logged and skipped, not fatal.
    pub fn open(dir: &Path) -> Result<Self, RepositoryError> {
        fs::create_dir_all(dir).map_err(|e| RepositoryError::Storage(e.to_string()))?;
        let index = MemoryRepository::new();

        for record in read_lines::<AnalysisRecord>(&dir.join(RECORDS_FILE))? {
            if let Err(err) = index.put_record(&record) {
                warn!(uuid = %record.uuid, error = %err, "duplicate record line ignored");
            }
        }
        for result in read_lines::<EvaluationResult>(&dir.join(EVALUATIONS_FILE))? {
            if let Err(err) = index.put_evaluation(&result) {
                warn!(uuid = %result.uuid, error = %err, "duplicate evaluation line ignored");
            }
        }
        for summary in read_lines::<EvaluationSummary>(&dir.join(SUMMARIES_FILE))? {
            if let Err(err) = index.put_summary(&summary) {
                warn!(uuid = %summary.uuid, error = %err, "duplicate summary line ignored");
            }
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            index,
            append_lock: Mutex::new(()),
        })
    }

    fn append<T: Serialize>(&self, file: &str, value: &T) -> Result<(), RepositoryError> {
        let json =
            serde_json::to_string(value).map_err(|e| RepositoryError::Storage(e.to_string()))?;
        let _guard = self
            .append_lock
            .lock()
            .map_err(|_| RepositoryError::Storage("append lock poisoned".into()))?;
        let mut handle = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(file))
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;
        writeln!(handle, "{json}").map_err(|e| RepositoryError::Storage(e.to_string()))?;
        handle
            .flush()
            .map_err(|e| RepositoryError::Storage(e.to_string()))
    }
}

/// Read a JSONL file into typed values, skipping lines that fail to parse.
fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, RepositoryError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let file = fs::File::open(path).map_err(|e| RepositoryError::Storage(e.to_string()))?;
    let mut values = Vec::new();
    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| RepositoryError::Storage(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(value) => values.push(value),
            Err(err) => {
                warn!(path = %path.display(), line = number + 1, error = %err, "skipping malformed line");
            }
        }
    }
    Ok(values)
}

impl AnalysisRepository for JsonlRepository {
    fn put_record(&self, record: &AnalysisRecord) -> Result<(), RepositoryError> {
        // Index first: the idempotency check must pass before the line lands.
        self.index.put_record(record)?;
        self.append(RECORDS_FILE, record)
    }

    fn put_evaluation(&self, result: &EvaluationResult) -> Result<(), RepositoryError> {
        self.index.put_evaluation(result)?;
        self.append(EVALUATIONS_FILE, result)
    }

    fn put_summary(&self, summary: &EvaluationSummary) -> Result<(), RepositoryError> {
        self.index.put_summary(summary)?;
        self.append(SUMMARIES_FILE, summary)
    }

    fn query_records(&self, query: &TimeRangeQuery) -> Result<RecordPage, RepositoryError> {
        self.index.query_records(query)
    }

    fn get_record(&self, uuid: &Uuid) -> Result<AnalysisRecord, RepositoryError> {
        self.index.get_record(uuid)
    }

    fn latest_summary(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<Option<EvaluationSummary>, RepositoryError> {
        self.index.latest_summary(symbol, interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use signalpilot_core::domain::{
        AgentFamily, Confidence, IndicatorAnalysis, Signal,
    };
    use std::collections::BTreeMap;

    fn record(epoch: i64) -> AnalysisRecord {
        let verdict = IndicatorAnalysis {
            recommendation: Signal::Hold,
            confidence: Confidence::from_unit(0.6).unwrap(),
            rationale: "test".into(),
        };
        let mut analyses = BTreeMap::new();
        analyses.insert(AgentFamily::Momentum, verdict.clone());
        AnalysisRecord::new(
            "XBTUSDT",
            Interval::Min15,
            Utc.timestamp_opt(epoch, 0).unwrap(),
            40_000.0,
            analyses,
            verdict,
            None,
        )
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let first = record(1_700_000_000);
        {
            let store = JsonlRepository::open(dir.path()).unwrap();
            store.put_record(&first).unwrap();
            store.put_record(&record(1_700_000_900)).unwrap();
        }

        let reopened = JsonlRepository::open(dir.path()).unwrap();
        let found = reopened.get_record(&first.uuid).unwrap();
        assert_eq!(found.symbol, "XBTUSDT");
    }

    #[test]
    fn duplicate_write_is_a_conflict_and_not_appended_twice() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlRepository::open(dir.path()).unwrap();
        let record = record(1_700_000_000);
        store.put_record(&record).unwrap();
        assert!(matches!(
            store.put_record(&record),
            Err(RepositoryError::Conflict { .. })
        ));

        let text = fs::read_to_string(dir.path().join(RECORDS_FILE)).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn torn_final_line_is_skipped_on_load() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonlRepository::open(dir.path()).unwrap();
            store.put_record(&record(1_700_000_000)).unwrap();
        }
        // Simulate a crash mid-append.
        let path = dir.path().join(RECORDS_FILE);
        let mut handle = OpenOptions::new().append(true).open(&path).unwrap();
        write!(handle, "{{\"uuid\":\"trunc").unwrap();
        drop(handle);

        let reopened = JsonlRepository::open(dir.path()).unwrap();
        let page = reopened
            .query_records(&TimeRangeQuery {
                symbol: "XBTUSDT".into(),
                interval: Interval::Min15,
                start: Utc.timestamp_opt(0, 0).unwrap(),
                end: None,
                direction: signalpilot_core::repository::QueryDirection::Forward,
                recommendation: None,
                limit: 10,
                token: None,
            })
            .unwrap();
        assert_eq!(page.records.len(), 1);
    }
}

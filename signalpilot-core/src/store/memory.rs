//! In-memory repository — the reference implementation of the store
//! contract. Backs the JSONL file store in the runner and every test.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use uuid::Uuid;

use crate::domain::{AnalysisRecord, EvaluationResult, EvaluationSummary, Interval};
use crate::repository::{
    partition_key, sort_key, AnalysisRepository, PageToken, QueryDirection, RecordKind,
    RecordPage, RepositoryError, TimeRangeQuery,
};

#[derive(Default)]
struct Inner {
    /// (partition, sort) -> record. BTreeMap keeps partition scans ordered.
    records: BTreeMap<(String, String), AnalysisRecord>,
    /// uuid -> (partition, sort) index for direct lookup and idempotency.
    record_index: HashMap<Uuid, (String, String)>,
    evaluations: HashMap<Uuid, EvaluationResult>,
    summaries: Vec<EvaluationSummary>,
}

/// Thread-safe in-memory store honoring ordering, pagination, and the
/// at-most-once write condition.
#[derive(Default)]
pub struct MemoryRepository {
    inner: Mutex<Inner>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means a panic mid-write; the store is test/local
        // infrastructure, so propagate the panic rather than limp on.
        self.inner.lock().expect("memory repository lock poisoned")
    }

    pub fn evaluation(&self, uuid: &Uuid) -> Option<EvaluationResult> {
        self.lock().evaluations.get(uuid).cloned()
    }

    pub fn evaluation_count(&self) -> usize {
        self.lock().evaluations.len()
    }
}

impl AnalysisRepository for MemoryRepository {
    fn put_record(&self, record: &AnalysisRecord) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        if inner.record_index.contains_key(&record.uuid) {
            return Err(RepositoryError::Conflict {
                kind: RecordKind::Analysis.prefix(),
                uuid: record.uuid,
            });
        }
        let key = (
            partition_key(RecordKind::Analysis, &record.symbol, record.interval),
            sort_key(&record.timestamp, record.recommendation),
        );
        inner.record_index.insert(record.uuid, key.clone());
        inner.records.insert(key, record.clone());
        Ok(())
    }

    fn put_evaluation(&self, result: &EvaluationResult) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        if inner.evaluations.contains_key(&result.uuid) {
            return Err(RepositoryError::Conflict {
                kind: RecordKind::Evaluation.prefix(),
                uuid: result.uuid,
            });
        }
        inner.evaluations.insert(result.uuid, result.clone());
        Ok(())
    }

    fn put_summary(&self, summary: &EvaluationSummary) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        if inner.summaries.iter().any(|s| s.uuid == summary.uuid) {
            return Err(RepositoryError::Conflict {
                kind: RecordKind::Evaluation.prefix(),
                uuid: summary.uuid,
            });
        }
        inner.summaries.push(summary.clone());
        Ok(())
    }

    fn query_records(&self, query: &TimeRangeQuery) -> Result<RecordPage, RepositoryError> {
        let offset = match &query.token {
            Some(token) => token
                .decode()?
                .parse::<usize>()
                .map_err(|_| RepositoryError::BadToken)?,
            None => 0,
        };

        let inner = self.lock();
        let partition = partition_key(RecordKind::Analysis, &query.symbol, query.interval);

        let mut matches: Vec<AnalysisRecord> = inner
            .records
            .iter()
            .filter(|((part, _), _)| *part == partition)
            .map(|(_, record)| record)
            .filter(|record| {
                record.timestamp >= query.start
                    && query.end.map_or(true, |end| record.timestamp <= end)
                    && query
                        .recommendation
                        .map_or(true, |wanted| record.recommendation == wanted)
            })
            .cloned()
            .collect();

        if query.direction == QueryDirection::Backward {
            matches.reverse();
        }

        let page: Vec<AnalysisRecord> = matches.iter().skip(offset).take(query.limit).cloned().collect();
        let consumed = offset + page.len();
        let next = if consumed < matches.len() {
            Some(PageToken::encode(&consumed.to_string()))
        } else {
            None
        };

        Ok(RecordPage { records: page, next })
    }

    fn get_record(&self, uuid: &Uuid) -> Result<AnalysisRecord, RepositoryError> {
        let inner = self.lock();
        let key = inner
            .record_index
            .get(uuid)
            .ok_or(RepositoryError::NotFound {
                kind: RecordKind::Analysis.prefix(),
                uuid: *uuid,
            })?;
        Ok(inner.records[key].clone())
    }

    fn latest_summary(
        &self,
        symbol: &str,
        interval: Interval,
    ) -> Result<Option<EvaluationSummary>, RepositoryError> {
        let inner = self.lock();
        Ok(inner
            .summaries
            .iter()
            .filter(|s| s.symbol == symbol && s.interval == interval)
            .max_by_key(|s| s.timestamp)
            .cloned())
    }
}

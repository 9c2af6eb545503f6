use serde::Serialize;

/// What happened to a single dictionary row during a sync.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum Outcome {
    SkippedNoFileName,
    SkippedAlreadyMatching,
    Succeeded,
    Failed(String),
}

impl Outcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecordResult {
    pub id: i64,
    pub video_file_name: Option<String>,
    pub outcome: Outcome,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub total: usize,
    pub skipped_no_file_name: usize,
    pub skipped_already_matching: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl SyncStats {
    pub fn record(&mut self, outcome: &Outcome) {
        self.total += 1;
        match outcome {
            Outcome::SkippedNoFileName => self.skipped_no_file_name += 1,
            Outcome::SkippedAlreadyMatching => self.skipped_already_matching += 1,
            Outcome::Succeeded => self.succeeded += 1,
            Outcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn skipped(&self) -> usize {
        self.skipped_no_file_name + self.skipped_already_matching
    }
}

/// Everything one pass over the table produced.
#[derive(Debug, Default, Clone, Serialize)]
pub struct SyncReport {
    pub stats: SyncStats,
    pub records: Vec<RecordResult>,
}

impl SyncReport {
    pub fn push(&mut self, result: RecordResult) {
        self.stats.record(&result.outcome);
        self.records.push(result);
    }

    pub fn outcome_for(&self, id: i64) -> Option<&Outcome> {
        self.records
            .iter()
            .find(|record| record.id == id)
            .map(|record| &record.outcome)
    }

    pub fn failures(&self) -> impl Iterator<Item = &RecordResult> {
        self.records.iter().filter(|record| record.outcome.is_failed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: i64, outcome: Outcome) -> RecordResult {
        RecordResult {
            id,
            video_file_name: None,
            outcome,
        }
    }

    #[test]
    fn test_report_counts_outcomes() {
        let mut report = SyncReport::default();
        report.push(result(1, Outcome::SkippedNoFileName));
        report.push(result(2, Outcome::SkippedAlreadyMatching));
        report.push(result(3, Outcome::Succeeded));
        report.push(result(4, Outcome::Failed("boom".to_string())));

        assert_eq!(report.stats.total, 4);
        assert_eq!(report.stats.skipped(), 2);
        assert_eq!(report.stats.succeeded, 1);
        assert_eq!(report.stats.failed, 1);
        assert_eq!(report.outcome_for(3), Some(&Outcome::Succeeded));
        assert_eq!(report.outcome_for(99), None);
        assert_eq!(report.failures().map(|r| r.id).collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&Outcome::Failed("missing".to_string())).unwrap();
        assert_eq!(json, r#"{"status":"failed","reason":"missing"}"#);

        let json = serde_json::to_string(&Outcome::Succeeded).unwrap();
        assert_eq!(json, r#"{"status":"succeeded"}"#);
    }
}

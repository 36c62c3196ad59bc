use std::fs::{OpenOptions, create_dir_all};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::CliError;

/// How a validation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Valid,
    Rejected,
    Unavailable,
}

impl RunOutcome {
    pub fn exit_code(self) -> u8 {
        match self {
            RunOutcome::Valid => 0,
            RunOutcome::Rejected => 1,
            RunOutcome::Unavailable => 2,
        }
    }
}

impl From<tabgen_validate::Outcome> for RunOutcome {
    fn from(value: tabgen_validate::Outcome) -> Self {
        match value {
            tabgen_validate::Outcome::Rejected => RunOutcome::Rejected,
            tabgen_validate::Outcome::Unavailable => RunOutcome::Unavailable,
        }
    }
}

/// JSON summary of one `tabgen validate` run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: String,
    pub finished_at: String,
    pub spec_path: String,
    pub schema_id: Option<String>,
    pub outcome: RunOutcome,
    pub message: Option<String>,
}

impl RunReport {
    pub fn new(
        run_id: String,
        started_at: DateTime<Utc>,
        spec_path: &Path,
        schema_id: Option<String>,
        outcome: RunOutcome,
        message: Option<String>,
    ) -> Self {
        Self {
            run_id,
            started_at: started_at.to_rfc3339(),
            finished_at: Utc::now().to_rfc3339(),
            spec_path: spec_path.display().to_string(),
            schema_id,
            outcome,
            message,
        }
    }
}

pub fn write_report(path: &Path, report: &RunReport) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    serde_json::to_writer_pretty(file, report)?;
    tracing::info!(event = "report_written", path = %path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_is_written_as_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("reports/run.json");
        let report = RunReport::new(
            "run-1".to_string(),
            Utc::now(),
            Path::new("specs/examples/users_orders.spec.json"),
            Some("http://localhost:5000/schemas-api/1.0.0/generate".to_string()),
            RunOutcome::Rejected,
            Some("bad specification: no primary key defined for table 'Users'".to_string()),
        );

        write_report(&path, &report).expect("write report");

        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read report"))
                .expect("parse report");
        assert_eq!(written["run_id"], "run-1");
        assert_eq!(written["outcome"], "rejected");
        assert_eq!(
            written["schema_id"],
            "http://localhost:5000/schemas-api/1.0.0/generate"
        );
        assert!(written["finished_at"].as_str().is_some());
    }

    #[test]
    fn exit_codes_follow_outcomes() {
        assert_eq!(RunOutcome::Valid.exit_code(), 0);
        assert_eq!(RunOutcome::from(tabgen_validate::Outcome::Rejected).exit_code(), 1);
        assert_eq!(RunOutcome::from(tabgen_validate::Outcome::Unavailable).exit_code(), 2);
    }
}

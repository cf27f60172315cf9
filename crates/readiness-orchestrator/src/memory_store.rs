use async_trait::async_trait;
use parking_lot::RwLock;
use readiness_core::{AnalysisReport, CollabResult, ReportStore, UsageRecord};

/// Process-local [`ReportStore`] for the CLI and tests.
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    reports: RwLock<Vec<(String, AnalysisReport)>>,
    usage: RwLock<Vec<UsageRecord>>,
}

impl MemoryReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self, project_id: &str) -> Vec<AnalysisReport> {
        self.reports
            .read()
            .iter()
            .filter(|(p, _)| p == project_id)
            .map(|(_, r)| r.clone())
            .collect()
    }

    pub fn report(&self, validation_id: &str) -> Option<AnalysisReport> {
        self.reports
            .read()
            .iter()
            .find(|(_, r)| r.validation_id == validation_id)
            .map(|(_, r)| r.clone())
    }

    pub fn usage(&self, project_id: &str) -> Vec<UsageRecord> {
        self.usage
            .read()
            .iter()
            .filter(|u| u.project_id == project_id)
            .cloned()
            .collect()
    }

    pub fn total_cost(&self, project_id: &str) -> f64 {
        self.usage(project_id).iter().map(|u| u.estimated_cost).sum()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn persist_report(&self, report: &AnalysisReport, project_id: &str) -> CollabResult<()> {
        let mut reports = self.reports.write();
        if reports.iter().any(|(_, r)| r.validation_id == report.validation_id) {
            anyhow::bail!("validation {} already stored", report.validation_id);
        }
        reports.push((project_id.to_string(), report.clone()));
        Ok(())
    }

    async fn record_usage(&self, usage: &UsageRecord) -> CollabResult<()> {
        self.usage.write().push(usage.clone());
        Ok(())
    }

    async fn backfill_usage_validation_id(
        &self,
        validation_id: &str,
        project_id: &str,
    ) -> CollabResult<usize> {
        let mut updated = 0;
        for usage in self.usage.write().iter_mut() {
            if usage.project_id == project_id && usage.validation_id.is_none() {
                usage.validation_id = Some(validation_id.to_string());
                updated += 1;
            }
        }
        Ok(updated)
    }
}

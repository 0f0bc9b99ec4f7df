//! `SeaORM` implementation of the `CaseService` trait.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::clients::StatusSource;
use crate::config::TrackerConfig;
use crate::db::{Store, UntrackOutcome};
use crate::models::case::{Case, SyncReport};
use crate::models::user::User;
use crate::models::validation::{normalize_case_id, normalize_case_name};
use crate::services::case_service::{CaseError, CaseService};
use crate::services::notifier::{Notifier, deliver};

/// What happened to a single case during a sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckOutcome {
    Unchanged,
    Changed { notified: usize },
    Failed,
}

#[must_use]
pub fn status_change_message(case: &Case, status: &str) -> String {
    if case.name.is_empty() {
        format!("Your case {} status has changed: {status}", case.id)
    } else {
        format!(
            "Your case {} ({}) status has changed: {status}",
            case.name, case.id
        )
    }
}

pub struct SeaOrmCaseService {
    store: Store,
    source: Arc<dyn StatusSource>,
    notifier: Arc<dyn Notifier>,
    max_concurrent_checks: usize,
}

impl SeaOrmCaseService {
    #[must_use]
    pub fn new(
        store: Store,
        source: Arc<dyn StatusSource>,
        notifier: Arc<dyn Notifier>,
        tracker: &TrackerConfig,
    ) -> Self {
        Self {
            store,
            source,
            notifier,
            max_concurrent_checks: tracker.max_concurrent_checks.max(1),
        }
    }

    async fn user(&self, username: &str) -> Result<User, CaseError> {
        self.store
            .get_user_by_username(username)
            .await?
            .ok_or(CaseError::UserNotFound)
    }

    async fn check_case(&self, case: Case) -> CheckOutcome {
        let status = match self.source.fetch_status(&case.id).await {
            Ok(status) => status,
            Err(e) => {
                metrics::counter!("case_checks_total", "result" => "failed").increment(1);
                warn!(case_id = %case.id, error = %e, "Status check failed");
                return CheckOutcome::Failed;
            }
        };
        metrics::counter!("case_checks_total", "result" => "ok").increment(1);

        if status == case.status {
            if let Err(e) = self.store.touch_case_checked(&case.id).await {
                warn!(case_id = %case.id, error = %e, "Failed to record check time");
            }
            return CheckOutcome::Unchanged;
        }

        // Recipients are loaded before the status is stored: once the new
        // status is written the change is never detected again.
        let users = match self.store.users_tracking_case(&case.id).await {
            Ok(users) => users,
            Err(e) => {
                warn!(case_id = %case.id, error = %e, "Failed to load users of case");
                return CheckOutcome::Failed;
            }
        };

        match self
            .store
            .record_case_status_change(&case.id, &case.status, &status)
            .await
        {
            Ok(true) => {}
            Ok(false) => return CheckOutcome::Unchanged,
            Err(e) => {
                warn!(case_id = %case.id, error = %e, "Failed to store case status");
                return CheckOutcome::Failed;
            }
        }

        metrics::counter!("case_status_changes_total").increment(1);
        info!(case_id = %case.id, status = %status, "Case status changed");

        let message = status_change_message(&case, &status);
        let mut notified = 0;
        for user in &users {
            if deliver(self.notifier.as_ref(), &user.email, &message).await {
                notified += 1;
            }
        }

        CheckOutcome::Changed { notified }
    }
}

#[async_trait]
impl CaseService for SeaOrmCaseService {
    async fn add_case(
        &self,
        username: &str,
        case_id: &str,
        name: &str,
    ) -> Result<Case, CaseError> {
        let checks = [normalize_case_id(case_id), normalize_case_name(name)];
        let errors: Vec<String> = checks
            .iter()
            .filter_map(|r| r.as_ref().err().cloned())
            .collect();
        let [Ok(case_id), Ok(name)] = checks else {
            return Err(CaseError::Validation(errors));
        };

        let user = self.user(username).await?;

        let initial_status = if self.store.get_case(&case_id).await?.is_some() {
            String::new()
        } else {
            match self.source.fetch_status(&case_id).await {
                Ok(status) => status,
                Err(e) => {
                    warn!(case_id = %case_id, error = %e, "Initial status check failed");
                    String::new()
                }
            }
        };

        let outcome = self
            .store
            .track_case(user.id, &case_id, &name, &initial_status)
            .await?;
        debug!(
            case_id = %case_id,
            username = %user.username,
            created = outcome.created,
            linked = outcome.linked,
            "Case tracked"
        );

        self.store
            .get_case(&case_id)
            .await?
            .ok_or_else(|| CaseError::Internal(format!("case {case_id} vanished after insert")))
    }

    async fn delete_cases(
        &self,
        username: &str,
        case_ids: &[String],
    ) -> Result<UntrackOutcome, CaseError> {
        let ids: Vec<String> = case_ids
            .iter()
            .map(|id| id.trim().to_ascii_uppercase())
            .filter(|id| !id.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        if ids.is_empty() {
            return Ok(UntrackOutcome::default());
        }

        let user = self.user(username).await?;
        Ok(self.store.untrack_cases(user.id, &ids).await?)
    }

    async fn list_cases(&self, username: &str) -> Result<Vec<Case>, CaseError> {
        let user = self.user(username).await?;
        Ok(self.store.list_cases_for_user(user.id).await?)
    }

    async fn list_all_cases(&self) -> Result<Vec<Case>, CaseError> {
        Ok(self.store.list_all_cases().await?)
    }

    async fn sync_all(&self) -> Result<SyncReport, CaseError> {
        let cases = self.store.list_all_cases().await?;
        let mut report = SyncReport {
            checked: cases.len(),
            ..SyncReport::default()
        };

        let outcomes = stream::iter(cases)
            .map(|case| self.check_case(case))
            .buffer_unordered(self.max_concurrent_checks)
            .collect::<Vec<_>>()
            .await;

        for outcome in outcomes {
            match outcome {
                CheckOutcome::Unchanged => {}
                CheckOutcome::Changed { notified } => {
                    report.changed += 1;
                    report.notified += notified;
                }
                CheckOutcome::Failed => report.failed += 1,
            }
        }

        info!(
            checked = report.checked,
            changed = report.changed,
            notified = report.notified,
            failed = report.failed,
            "Case sync finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_change_message() {
        let mut case = Case {
            id: "EAC2190012345".to_string(),
            name: String::new(),
            status: String::new(),
            old_status: String::new(),
            checked_at: None,
        };
        assert_eq!(
            status_change_message(&case, "Card Was Produced"),
            "Your case EAC2190012345 status has changed: Card Was Produced"
        );

        case.name = "Mine".to_string();
        assert_eq!(
            status_change_message(&case, "Card Was Produced"),
            "Your case Mine (EAC2190012345) status has changed: Card Was Produced"
        );
    }
}

use crate::entities::{cases, prelude::*, user_cases};
use crate::models::case::Case;
use anyhow::Result;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use tracing::{debug, info};

/// Result of linking a user to a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackOutcome {
    /// The case was not in the registry before.
    pub created: bool,

    /// The user was not already tracking the case.
    pub linked: bool,
}

/// Result of unlinking a user from a set of cases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UntrackOutcome {
    pub unlinked: u64,

    /// Cases dropped from the registry because nobody tracks them anymore.
    pub removed: Vec<String>,
}

/// Repository for the case registry and the user/case links
pub struct CaseRepository {
    conn: DatabaseConnection,
}

impl CaseRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    fn map_model(m: cases::Model) -> Case {
        Case {
            id: m.id,
            name: m.name,
            status: m.status,
            old_status: m.old_status,
            checked_at: m.checked_at,
        }
    }

    pub async fn get(&self, id: &str) -> Result<Option<Case>> {
        let row = Cases::find_by_id(id.to_string()).one(&self.conn).await?;
        Ok(row.map(Self::map_model))
    }

    pub async fn list_for_user(&self, user_id: i32) -> Result<Vec<Case>> {
        let rows = Cases::find()
            .inner_join(UserCases)
            .filter(user_cases::Column::UserId.eq(user_id))
            .order_by_asc(cases::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn list_all(&self) -> Result<Vec<Case>> {
        let rows = Cases::find()
            .order_by_asc(cases::Column::Id)
            .all(&self.conn)
            .await?;

        Ok(rows.into_iter().map(Self::map_model).collect())
    }

    pub async fn count_for_user(&self, user_id: i32) -> Result<u64> {
        let count = UserCases::find()
            .filter(user_cases::Column::UserId.eq(user_id))
            .count(&self.conn)
            .await?;

        Ok(count)
    }

    /// Registers the case if unknown (with `initial_status`), otherwise
    /// renames it, and links it to the user. Both happen in one transaction.
    pub async fn track(
        &self,
        user_id: i32,
        case_id: &str,
        name: &str,
        initial_status: &str,
    ) -> Result<TrackOutcome> {
        let txn = self.conn.begin().await?;
        let now = chrono::Utc::now().to_rfc3339();

        // Write first: a deferred SQLite transaction that reads before
        // writing fails with SQLITE_BUSY instead of waiting for the lock.
        let checked_at = (!initial_status.is_empty()).then(|| now.clone());
        let inserted = Cases::insert(cases::ActiveModel {
            id: Set(case_id.to_string()),
            name: Set(name.to_string()),
            status: Set(initial_status.to_string()),
            old_status: Set(String::new()),
            checked_at: Set(checked_at),
            created_at: Set(now.clone()),
        })
        .on_conflict(
            OnConflict::column(cases::Column::Id)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;
        let created = inserted > 0;

        if !created {
            Cases::update_many()
                .col_expr(cases::Column::Name, Expr::value(name))
                .filter(cases::Column::Id.eq(case_id))
                .filter(cases::Column::Name.ne(name))
                .exec(&txn)
                .await?;
        }

        let link_rows = UserCases::insert(user_cases::ActiveModel {
            user_id: Set(user_id),
            case_id: Set(case_id.to_string()),
            added_at: Set(now),
        })
        .on_conflict(
            OnConflict::columns([user_cases::Column::UserId, user_cases::Column::CaseId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;
        let linked = link_rows > 0;

        txn.commit().await?;

        if created {
            info!("Registered case {}", case_id);
        }
        Ok(TrackOutcome { created, linked })
    }

    /// Unlinks the user from `case_ids` and deletes every case that no
    /// longer has any link, in one transaction.
    pub async fn untrack(&self, user_id: i32, case_ids: &[String]) -> Result<UntrackOutcome> {
        if case_ids.is_empty() {
            return Ok(UntrackOutcome::default());
        }

        let txn = self.conn.begin().await?;

        let unlinked = UserCases::delete_many()
            .filter(user_cases::Column::UserId.eq(user_id))
            .filter(user_cases::Column::CaseId.is_in(case_ids.iter().cloned()))
            .exec(&txn)
            .await?
            .rows_affected;

        let mut removed = Vec::new();
        for case_id in case_ids {
            let remaining = UserCases::find()
                .filter(user_cases::Column::CaseId.eq(case_id.as_str()))
                .count(&txn)
                .await?;

            if remaining == 0 {
                let result = Cases::delete_by_id(case_id.clone()).exec(&txn).await?;
                if result.rows_affected > 0 {
                    removed.push(case_id.clone());
                }
            }
        }

        txn.commit().await?;

        for case_id in &removed {
            info!("Removed untracked case {}", case_id);
        }
        Ok(UntrackOutcome { unlinked, removed })
    }

    /// Compare-and-set of the case status: only succeeds if the stored
    /// status still equals `expected`. The previous status moves to
    /// `old_status`. Returns whether this call performed the change.
    pub async fn record_status_change(
        &self,
        case_id: &str,
        expected: &str,
        status: &str,
    ) -> Result<bool> {
        let now = chrono::Utc::now().to_rfc3339();

        let result = Cases::update_many()
            .col_expr(cases::Column::OldStatus, Expr::col(cases::Column::Status).into())
            .col_expr(cases::Column::Status, Expr::value(status))
            .col_expr(cases::Column::CheckedAt, Expr::value(now))
            .filter(cases::Column::Id.eq(case_id))
            .filter(cases::Column::Status.eq(expected))
            .exec(&self.conn)
            .await?;

        let changed = result.rows_affected > 0;
        if !changed {
            debug!("Status of case {} was updated concurrently", case_id);
        }
        Ok(changed)
    }

    pub async fn touch_checked(&self, case_id: &str) -> Result<()> {
        Cases::update_many()
            .col_expr(
                cases::Column::CheckedAt,
                Expr::value(chrono::Utc::now().to_rfc3339()),
            )
            .filter(cases::Column::Id.eq(case_id))
            .exec(&self.conn)
            .await?;
        Ok(())
    }
}

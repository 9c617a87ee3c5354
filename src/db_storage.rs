use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgConnection, PgPool};

use crate::errors::{AppError, ResultExt};
use crate::models::{
    Contact, ContactUpdate, Followup, FollowupStatus, FollowupView, Metric, NewContact, NewMetric,
};
use crate::store::PipelineStore;
use crate::urgency::classify;

const CONTACT_COLUMNS: &str = "id, company, contact_name, designation, department, email, \
     linkedin, date_contacted, next_followup, status, priority_score, probability, \
     opportunity_value, expected_value, notes, created_at";

const FOLLOWUP_COLUMNS: &str = "id, contact_id, followup_date, days_remaining, urgency, status";

const METRIC_COLUMNS: &str = "id, week, contacts_added, responses, interviews, offers";

/// Postgres-backed pipeline store.
///
/// Follow-up mutations run in one transaction that starts by locking the
/// owning contact row (`SELECT ... FOR UPDATE`), so concurrent mutations of the
/// same contact serialize and `next_followup` never reflects a stale minimum.
#[derive(Clone)]
pub struct PgPipelineStore {
    pool: PgPool,
}

impl PgPipelineStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Owning contact of a follow-up. The link never changes, so it can be read
    /// before the contact lock is taken.
    async fn owner_of(&self, followup_id: i64) -> Result<Option<i64>, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT contact_id FROM followups WHERE id = $1")
            .bind(followup_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::DatabaseError)
    }
}

/// Take the per-contact lock. Returns false when the contact does not exist.
async fn lock_contact(conn: &mut PgConnection, contact_id: i64) -> Result<bool, AppError> {
    let locked = sqlx::query_scalar::<_, i64>("SELECT id FROM contacts WHERE id = $1 FOR UPDATE")
        .bind(contact_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(locked.is_some())
}

/// Re-derive `next_followup` for one contact from its PENDING follow-ups,
/// leaving out `excluding` (the row being mutated). Must run while the
/// contact lock is held. Returns true when the stored value changed.
async fn refresh_next_followup(
    conn: &mut PgConnection,
    contact_id: i64,
    excluding: Option<i64>,
) -> Result<bool, AppError> {
    let next: Option<NaiveDate> = sqlx::query_scalar(
        r#"
        SELECT MIN(followup_date)
        FROM followups
        WHERE contact_id = $1
          AND status = 'PENDING'
          AND ($2::BIGINT IS NULL OR id <> $2)
        "#,
    )
    .bind(contact_id)
    .bind(excluding)
    .fetch_one(&mut *conn)
    .await
    .context("querying next pending follow-up")?;

    let result = sqlx::query(
        "UPDATE contacts SET next_followup = $2 WHERE id = $1 AND next_followup IS DISTINCT FROM $2",
    )
    .bind(contact_id)
    .bind(next)
    .execute(&mut *conn)
    .await
    .context("updating next_followup")?;

    if result.rows_affected() > 0 {
        tracing::debug!("Contact {} next_followup -> {:?}", contact_id, next);
    }

    Ok(result.rows_affected() > 0)
}

fn contact_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Contact with id {} not found", id))
}

fn followup_not_found(id: i64) -> AppError {
    AppError::NotFound(format!("Followup with id {} not found", id))
}

#[async_trait]
impl PipelineStore for PgPipelineStore {
    async fn create_contact(&self, new: NewContact) -> Result<Contact, AppError> {
        let sql = format!(
            r#"
            INSERT INTO contacts (
                company, contact_name, designation, department, email, linkedin,
                date_contacted, status, priority_score, probability,
                opportunity_value, expected_value, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            CONTACT_COLUMNS
        );

        let contact = sqlx::query_as::<_, Contact>(&sql)
            .bind(&new.company)
            .bind(&new.contact_name)
            .bind(&new.designation)
            .bind(&new.department)
            .bind(&new.email)
            .bind(&new.linkedin)
            .bind(new.date_contacted)
            .bind(&new.status)
            .bind(new.priority_score)
            .bind(new.probability)
            .bind(new.opportunity_value)
            .bind(new.expected_value())
            .bind(&new.notes)
            .fetch_one(&self.pool)
            .await
            .context("inserting contact")?;

        tracing::info!("Created contact {} ({})", contact.id, contact.company);
        Ok(contact)
    }

    async fn get_contact(&self, id: i64) -> Result<Contact, AppError> {
        let sql = format!("SELECT {} FROM contacts WHERE id = $1", CONTACT_COLUMNS);
        sqlx::query_as::<_, Contact>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| contact_not_found(id))
    }

    async fn list_contacts(&self) -> Result<Vec<Contact>, AppError> {
        let sql = format!("SELECT {} FROM contacts ORDER BY id", CONTACT_COLUMNS);
        Ok(sqlx::query_as::<_, Contact>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_contact(&self, id: i64, update: ContactUpdate) -> Result<Contact, AppError> {
        let mut tx = self.pool.begin().await?;

        let select = format!(
            "SELECT {} FROM contacts WHERE id = $1 FOR UPDATE",
            CONTACT_COLUMNS
        );
        let mut contact = sqlx::query_as::<_, Contact>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| contact_not_found(id))?;

        contact.apply_update(&update);

        sqlx::query(
            r#"
            UPDATE contacts
            SET company = $2,
                contact_name = $3,
                designation = $4,
                department = $5,
                email = $6,
                linkedin = $7,
                date_contacted = $8,
                status = $9,
                priority_score = $10,
                probability = $11,
                opportunity_value = $12,
                expected_value = $13,
                notes = $14
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&contact.company)
        .bind(&contact.contact_name)
        .bind(&contact.designation)
        .bind(&contact.department)
        .bind(&contact.email)
        .bind(&contact.linkedin)
        .bind(contact.date_contacted)
        .bind(&contact.status)
        .bind(contact.priority_score)
        .bind(contact.probability)
        .bind(contact.opportunity_value)
        .bind(contact.expected_value)
        .bind(&contact.notes)
        .execute(&mut *tx)
        .await
        .context("updating contact")?;

        tx.commit().await?;
        Ok(contact)
    }

    async fn delete_contact(&self, id: i64) -> Result<(), AppError> {
        // follow-ups go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() > 0 {
            tracing::info!("Deleted contact {}", id);
        }
        Ok(())
    }

    async fn create_followup(
        &self,
        contact_id: i64,
        followup_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<Followup, AppError> {
        let classification = classify(followup_date, today);
        let mut tx = self.pool.begin().await?;

        if !lock_contact(&mut tx, contact_id).await? {
            return Err(contact_not_found(contact_id));
        }

        let sql = format!(
            r#"
            INSERT INTO followups (contact_id, followup_date, days_remaining, urgency, status)
            VALUES ($1, $2, $3, $4, 'PENDING')
            RETURNING {}
            "#,
            FOLLOWUP_COLUMNS
        );
        let followup = sqlx::query_as::<_, Followup>(&sql)
            .bind(contact_id)
            .bind(followup_date)
            .bind(classification.days_remaining)
            .bind(classification.urgency.as_str())
            .fetch_one(&mut *tx)
            .await
            .context("inserting follow-up")?;

        refresh_next_followup(&mut tx, contact_id, None).await?;
        tx.commit().await?;

        tracing::info!(
            "Created follow-up {} for contact {} on {} ({})",
            followup.id,
            contact_id,
            followup_date,
            followup.urgency
        );
        Ok(followup)
    }

    async fn set_status(
        &self,
        followup_id: i64,
        status: FollowupStatus,
        today: NaiveDate,
    ) -> Result<Followup, AppError> {
        let contact_id = self
            .owner_of(followup_id)
            .await?
            .ok_or_else(|| followup_not_found(followup_id))?;

        let mut tx = self.pool.begin().await?;
        lock_contact(&mut tx, contact_id).await?;

        let select = format!(
            "SELECT {} FROM followups WHERE id = $1 FOR UPDATE",
            FOLLOWUP_COLUMNS
        );
        let mut followup = sqlx::query_as::<_, Followup>(&select)
            .bind(followup_id)
            .fetch_optional(&mut *tx)
            .await?
            // deleted between the owner lookup and the lock
            .ok_or_else(|| followup_not_found(followup_id))?;

        followup.status = status;
        if status.is_pending() {
            followup.apply_classification(classify(followup.followup_date, today));
        }

        sqlx::query(
            "UPDATE followups SET status = $2, days_remaining = $3, urgency = $4 WHERE id = $1",
        )
        .bind(followup_id)
        .bind(status.as_str())
        .bind(followup.days_remaining)
        .bind(followup.urgency.as_str())
        .execute(&mut *tx)
        .await
        .context("updating follow-up status")?;

        let excluding = (!status.is_pending()).then_some(followup_id);
        refresh_next_followup(&mut tx, contact_id, excluding).await?;
        tx.commit().await?;

        tracing::info!("Follow-up {} -> {}", followup_id, status);
        Ok(followup)
    }

    async fn delete_followup(&self, followup_id: i64) -> Result<(), AppError> {
        let Some(contact_id) = self.owner_of(followup_id).await? else {
            tracing::debug!("Follow-up {} already absent, nothing to delete", followup_id);
            return Ok(());
        };

        let mut tx = self.pool.begin().await?;
        lock_contact(&mut tx, contact_id).await?;

        sqlx::query("DELETE FROM followups WHERE id = $1")
            .bind(followup_id)
            .execute(&mut *tx)
            .await
            .context("deleting follow-up")?;

        refresh_next_followup(&mut tx, contact_id, Some(followup_id)).await?;
        tx.commit().await?;

        tracing::info!("Deleted follow-up {} of contact {}", followup_id, contact_id);
        Ok(())
    }

    async fn list_followups(&self, include_completed: bool) -> Result<Vec<FollowupView>, AppError> {
        let rows = sqlx::query_as::<_, FollowupView>(
            r#"
            SELECT f.id, f.contact_id, f.followup_date, f.days_remaining, f.urgency, f.status,
                   c.company, c.contact_name
            FROM followups f
            JOIN contacts c ON c.id = f.contact_id
            WHERE $1 OR f.status = 'PENDING'
            ORDER BY f.followup_date ASC, f.id ASC
            "#,
        )
        .bind(include_completed)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn followups_for_contact(&self, contact_id: i64) -> Result<Vec<Followup>, AppError> {
        let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM contacts WHERE id = $1")
            .bind(contact_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(contact_not_found(contact_id));
        }

        let sql = format!(
            "SELECT {} FROM followups WHERE contact_id = $1 ORDER BY followup_date ASC, id ASC",
            FOLLOWUP_COLUMNS
        );
        Ok(sqlx::query_as::<_, Followup>(&sql)
            .bind(contact_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn recompute_all_pending(&self, today: NaiveDate) -> Result<usize, AppError> {
        let pending: Vec<(i64, NaiveDate)> = sqlx::query_as(
            "SELECT id, followup_date FROM followups WHERE status = 'PENDING' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .context("loading pending follow-ups")?;

        if pending.is_empty() {
            return Ok(0);
        }

        let mut ids = Vec::with_capacity(pending.len());
        let mut days = Vec::with_capacity(pending.len());
        let mut urgencies = Vec::with_capacity(pending.len());
        for (id, followup_date) in &pending {
            let classification = classify(*followup_date, today);
            ids.push(*id);
            days.push(classification.days_remaining);
            urgencies.push(classification.urgency.as_str().to_string());
        }

        // Each row is updated on its own; rows completed since the read keep their values
        sqlx::query(
            r#"
            UPDATE followups AS f
            SET days_remaining = v.days_remaining,
                urgency = v.urgency
            FROM UNNEST($1::BIGINT[], $2::BIGINT[], $3::TEXT[])
                 AS v(id, days_remaining, urgency)
            WHERE f.id = v.id
              AND f.status = 'PENDING'
            "#,
        )
        .bind(&ids)
        .bind(&days)
        .bind(&urgencies)
        .execute(&self.pool)
        .await
        .context("recomputing follow-up urgency")?;

        Ok(pending.len())
    }

    async fn repair_next_followups(&self) -> Result<usize, AppError> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM contacts ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        let mut repaired = 0;
        for contact_id in ids {
            let mut tx = self.pool.begin().await?;
            if lock_contact(&mut tx, contact_id).await?
                && refresh_next_followup(&mut tx, contact_id, None).await?
            {
                tracing::info!("Repaired next_followup for contact {}", contact_id);
                repaired += 1;
            }
            tx.commit().await?;
        }

        Ok(repaired)
    }

    async fn record_metric(&self, new: NewMetric) -> Result<Metric, AppError> {
        let sql = format!(
            r#"
            INSERT INTO metrics (week, contacts_added, responses, interviews, offers)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            METRIC_COLUMNS
        );
        sqlx::query_as::<_, Metric>(&sql)
            .bind(new.week)
            .bind(new.contacts_added)
            .bind(new.responses)
            .bind(new.interviews)
            .bind(new.offers)
            .fetch_one(&self.pool)
            .await
            .context("inserting metric")
    }

    async fn list_metrics(&self) -> Result<Vec<Metric>, AppError> {
        let sql = format!("SELECT {} FROM metrics ORDER BY week, id", METRIC_COLUMNS);
        Ok(sqlx::query_as::<_, Metric>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }
}

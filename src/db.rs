use sqlx::{postgres::PgPoolOptions, PgPool};

/// Idempotent schema bootstrap, applied in order at startup.
const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS contacts (
        id BIGSERIAL PRIMARY KEY,
        company TEXT NOT NULL,
        contact_name TEXT NOT NULL,
        designation TEXT,
        department TEXT,
        email TEXT,
        linkedin TEXT,
        date_contacted DATE NOT NULL DEFAULT CURRENT_DATE,
        next_followup DATE,
        status TEXT NOT NULL DEFAULT 'New Lead',
        priority_score DOUBLE PRECISION NOT NULL DEFAULT 0,
        probability DOUBLE PRECISION NOT NULL DEFAULT 0
            CHECK (probability >= 0 AND probability <= 1),
        opportunity_value DOUBLE PRECISION NOT NULL DEFAULT 0
            CHECK (opportunity_value >= 0),
        expected_value DOUBLE PRECISION NOT NULL DEFAULT 0,
        notes TEXT,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS followups (
        id BIGSERIAL PRIMARY KEY,
        contact_id BIGINT NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
        followup_date DATE NOT NULL,
        days_remaining BIGINT NOT NULL,
        urgency TEXT NOT NULL,
        status TEXT NOT NULL DEFAULT 'PENDING'
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_followups_contact_pending
        ON followups (contact_id, status, followup_date)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS metrics (
        id BIGSERIAL PRIMARY KEY,
        week DATE NOT NULL,
        contacts_added BIGINT NOT NULL DEFAULT 0,
        responses BIGINT NOT NULL DEFAULT 0,
        interviews BIGINT NOT NULL DEFAULT 0,
        offers BIGINT NOT NULL DEFAULT 0
    )
    "#,
];

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Create tables and indexes that do not exist yet.
    pub async fn ensure_schema(&self) -> anyhow::Result<()> {
        for statement in SCHEMA {
            sqlx::query(*statement).execute(&self.pool).await?;
        }
        tracing::info!("Database schema ready ({} statements)", SCHEMA.len());
        Ok(())
    }
}

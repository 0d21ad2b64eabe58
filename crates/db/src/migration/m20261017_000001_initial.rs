//! Initial database migration.
//!
//! Creates the users and applications tables. Attachment references live in
//! `applications.documents`; blob bytes never touch the database.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        db.execute_unprepared(USERS_SQL).await?;
        db.execute_unprepared(APPLICATIONS_SQL).await?;
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const USERS_SQL: &str = r"
CREATE TABLE users (
    id              UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name            VARCHAR(100) NOT NULL CHECK (char_length(name) >= 2),
    email           VARCHAR(255) NOT NULL UNIQUE,
    created_at      TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at      TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
";

const APPLICATIONS_SQL: &str = r"
CREATE TABLE applications (
    id                  UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    user_id             UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,

    position_title      VARCHAR(200) NOT NULL,
    company             VARCHAR(200) NOT NULL,
    job_requirements    VARCHAR(2000),
    job_qualifications  VARCHAR(2000),
    location            VARCHAR(200),
    application_link    VARCHAR(500),

    current_stage       VARCHAR(32) NOT NULL DEFAULT 'Submitted'
        CHECK (current_stage IN (
            'Submitted', 'Under Review', 'Assessment in Progress', 'Interviews', 'Offer'
        )),
    priority            VARCHAR(16) NOT NULL DEFAULT 'Medium'
        CHECK (priority IN ('Low', 'Medium', 'High')),

    application_date    TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    interview_date_time TIMESTAMPTZ,

    -- Ordered DocumentReference array, appended atomically
    documents           JSONB NOT NULL DEFAULT '[]'::jsonb
        CHECK (jsonb_typeof(documents) = 'array'),

    notes               VARCHAR(5000),
    created_at          TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at          TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX idx_applications_user_stage ON applications(user_id, current_stage);
CREATE INDEX idx_applications_user_priority ON applications(user_id, priority);
CREATE INDEX idx_applications_user_company ON applications(user_id, company);
CREATE INDEX idx_applications_user_date ON applications(user_id, application_date DESC);
";

const TRIGGERS_SQL: &str = r"
CREATE OR REPLACE FUNCTION set_updated_at()
RETURNS TRIGGER AS $$
BEGIN
    NEW.updated_at = NOW();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_users_updated_at
    BEFORE UPDATE ON users
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();

CREATE TRIGGER trg_applications_updated_at
    BEFORE UPDATE ON applications
    FOR EACH ROW EXECUTE FUNCTION set_updated_at();
";

const DROP_ALL_SQL: &str = r"
DROP TABLE IF EXISTS applications CASCADE;
DROP TABLE IF EXISTS users CASCADE;
DROP FUNCTION IF EXISTS set_updated_at() CASCADE;
";

//! Database seeder for ApplyTrack development and testing.
//!
//! Seeds a test user with one application and uploads a sample resume into
//! the configured blob store. Safe to run repeatedly.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use applytrack_core::attachment::{AttachmentService, EntityRegistry};
use applytrack_core::storage::{StorageConfig, StorageService};
use applytrack_db::ApplicationRegistry;
use applytrack_db::entities::{applications, users};
use applytrack_shared::types::ApplicationId;
use applytrack_shared::{AppConfig, telemetry};
use bytes::Bytes;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use tracing::info;
use uuid::Uuid;

/// Test user ID (consistent for all seeds)
const TEST_USER_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0001);
/// Test application ID (consistent for all seeds)
const TEST_APPLICATION_ID: Uuid = Uuid::from_u128(0x0000_0000_0000_0000_0000_0000_0000_0002);

const SAMPLE_RESUME: &[u8] = b"Jordan Example\nBackend Engineer\n\nExperience\n- Built things\n";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    telemetry::init_tracing(&config.logging)?;

    info!("Connecting to database...");
    let db = applytrack_db::connect(&config.database)
        .await
        .context("failed to connect to database")?;

    seed_test_user(&db).await?;
    let application_id = seed_test_application(&db).await?;

    let storage = StorageConfig::from_settings(&config.storage)?;
    let storage = Arc::new(StorageService::from_config(storage)?);
    let service = AttachmentService::new(storage, Arc::new(ApplicationRegistry::new(db)));
    seed_sample_resume(&service, application_id).await?;

    info!("Seeding complete");
    Ok(())
}

async fn seed_test_user(db: &DatabaseConnection) -> anyhow::Result<()> {
    if users::Entity::find_by_id(TEST_USER_ID).one(db).await?.is_some() {
        info!("Test user already exists, skipping");
        return Ok(());
    }

    let now = Utc::now().fixed_offset();
    users::ActiveModel {
        id: Set(TEST_USER_ID),
        name: Set("Test User".to_string()),
        email: Set("test@applytrack.dev".to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    info!(user_id = %TEST_USER_ID, "Seeded test user");
    Ok(())
}

async fn seed_test_application(db: &DatabaseConnection) -> anyhow::Result<ApplicationId> {
    let application_id = ApplicationId::from_uuid(TEST_APPLICATION_ID);

    if applications::Entity::find_by_id(TEST_APPLICATION_ID)
        .one(db)
        .await?
        .is_some()
    {
        info!("Test application already exists, skipping");
        return Ok(application_id);
    }

    applications::ActiveModel {
        id: Set(TEST_APPLICATION_ID),
        user_id: Set(TEST_USER_ID),
        position_title: Set("Backend Engineer".to_string()),
        company: Set("Example Corp".to_string()),
        location: Set(Some("Remote".to_string())),
        current_stage: Set("Submitted".to_string()),
        priority: Set("High".to_string()),
        notes: Set(Some("Seeded for local development".to_string())),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!(%application_id, "Seeded test application");
    Ok(application_id)
}

async fn seed_sample_resume(
    service: &AttachmentService<ApplicationRegistry>,
    application_id: ApplicationId,
) -> anyhow::Result<()> {
    let existing = service.registry().list_attachments(application_id).await?;
    if !existing.is_empty() {
        info!(count = existing.len(), "Attachments already present, skipping");
        return Ok(());
    }

    let body = futures::stream::iter([Ok::<_, std::io::Error>(Bytes::from_static(SAMPLE_RESUME))]);
    let reference = service
        .upload(application_id, "resume", "resume.txt", "text/plain", body)
        .await?;

    info!(document_id = %reference.id, blob_id = %reference.blob_id, "Seeded sample resume");
    Ok(())
}

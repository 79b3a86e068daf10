//! Credential lifecycle for the search API
//!
//! Credentials are appended to the `credentials` table, never mutated in
//! place: the current one is the newest non-revoked, non-expired row, and
//! invalidation flips the revoked flag so the history stays inspectable.
//! Extraction is delegated to an injected collaborator and bounded by a
//! hard timeout so a wedged browser session cannot hang a refresh.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::constants::refresh::EXTRACTION_TIMEOUT_SECS;
use crate::domain::error::{RefreshError, is_auth_status};
use crate::domain::services::{Credential, CredentialExtractor};

#[derive(Clone)]
pub struct CredentialStore {
    pool: Arc<SqlitePool>,
    extraction_timeout: Duration,
}

impl CredentialStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
            extraction_timeout: Duration::from_secs(EXTRACTION_TIMEOUT_SECS),
        }
    }

    /// Override the extraction timeout (tests and callers with slower
    /// extraction paths).
    pub fn with_extraction_timeout(mut self, timeout: Duration) -> Self {
        self.extraction_timeout = timeout;
        self
    }

    /// Most recently stored usable credential, if any
    pub async fn get(&self) -> Result<Option<Credential>, RefreshError> {
        let row = sqlx::query(
            r#"
            SELECT api_key, app_id, extracted_at, expires_at
            FROM credentials
            WHERE revoked = 0 AND (expires_at IS NULL OR expires_at > ?)
            ORDER BY extracted_at DESC
            LIMIT 1
            "#,
        )
        .bind(Utc::now())
        .fetch_optional(&*self.pool)
        .await
        .map_err(storage_error)?;

        Ok(row.map(|row| Credential {
            api_key: row.get("api_key"),
            app_id: row.get("app_id"),
            extracted_at: row.get("extracted_at"),
            expires_at: row.get("expires_at"),
        }))
    }

    /// Return a usable credential, extracting and persisting a fresh one
    /// when none is stored.
    pub async fn ensure(
        &self,
        extractor: &dyn CredentialExtractor,
    ) -> Result<Credential, RefreshError> {
        if let Some(credential) = self.get().await? {
            return Ok(credential);
        }

        let extracted =
            match tokio::time::timeout(self.extraction_timeout, extractor.extract()).await {
                Ok(Ok(extracted)) => extracted,
                Ok(Err(e)) => {
                    return Err(RefreshError::ExtractionFailed(e.to_string()));
                }
                Err(_) => {
                    return Err(RefreshError::ExtractionFailed(format!(
                        "extraction timed out after {}s",
                        self.extraction_timeout.as_secs()
                    )));
                }
            };

        let credential = Credential {
            api_key: extracted.api_key,
            app_id: extracted.app_id,
            extracted_at: Utc::now(),
            expires_at: extracted.expires_at,
        };

        sqlx::query(
            r#"
            INSERT INTO credentials (id, api_key, app_id, extracted_at, expires_at, revoked)
            VALUES (?, ?, ?, ?, ?, 0)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&credential.api_key)
        .bind(&credential.app_id)
        .bind(credential.extracted_at)
        .bind(credential.expires_at)
        .execute(&*self.pool)
        .await
        .map_err(storage_error)?;

        info!("🔑 Extracted and stored a new search credential");
        Ok(credential)
    }

    /// Mark the current credential unusable; the next `ensure` call will
    /// re-extract. Superseded rows are kept as history.
    pub async fn invalidate(&self) -> Result<(), RefreshError> {
        let result = sqlx::query(
            r#"
            UPDATE credentials
            SET revoked = 1
            WHERE id = (
                SELECT id FROM credentials
                WHERE revoked = 0
                ORDER BY extracted_at DESC
                LIMIT 1
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() > 0 {
            warn!("🛑 Current search credential invalidated");
        }
        Ok(())
    }

    /// True for HTTP statuses that mean the credential itself was rejected
    pub fn is_auth_error(status: u16) -> bool {
        is_auth_status(status)
    }
}

fn storage_error(e: sqlx::Error) -> RefreshError {
    RefreshError::CommitFailed(format!("credential store: {e}"))
}

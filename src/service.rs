//! Record Service
//!
//! Validates incoming records and delegates to the cache coordinator. All
//! request-level error mapping happens here.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use crate::cache::{CacheCoordinator, CacheStats, CreateOutcome, DeleteOutcome};
use crate::error::{AppError, Result};
use crate::models::{Collection, GoalRequest, QuizRequest, RecordFields, Snapshot};
use crate::render::Templates;

pub struct RecordService {
    coordinator: Arc<CacheCoordinator>,
    templates: Templates,
}

impl RecordService {
    pub fn new(coordinator: Arc<CacheCoordinator>, templates: Templates) -> Self {
        Self {
            coordinator,
            templates,
        }
    }

    pub fn coordinator(&self) -> &Arc<CacheCoordinator> {
        &self.coordinator
    }

    // == Create ==
    pub async fn create_quiz(&self, request: &QuizRequest) -> Result<()> {
        let (email, fields) = request.validate()?;
        self.create(&email, fields).await
    }

    pub async fn create_goal(&self, request: &GoalRequest) -> Result<()> {
        let (email, fields) = request.validate()?;
        self.create(&email, fields).await
    }

    async fn create(&self, email: &str, fields: RecordFields) -> Result<()> {
        let collection = fields.collection();
        match self
            .coordinator
            .create_record(collection, email, &fields)
            .await?
        {
            CreateOutcome::Created => {
                info!(collection = %collection, email = %email, "record created");
                Ok(())
            }
            CreateOutcome::Duplicate => Err(AppError::Duplicate),
        }
    }

    // == Read ==
    /// Stored payload for `email`: a JSON string for quiz, an object for goal.
    pub async fn get_record(&self, collection: Collection, email: &str) -> Result<Value> {
        if email.is_empty() {
            return Err(AppError::MissingEmail);
        }

        self.coordinator
            .get_record(collection, email)
            .await?
            .map(|fields| fields.to_payload())
            .ok_or(AppError::NotFound)
    }

    pub async fn list_records(&self, collection: Collection) -> Result<Arc<Snapshot>> {
        Ok(self.coordinator.list_records(collection).await?)
    }

    /// Listing rendered into the collection's HTML template.
    pub async fn render_list(&self, collection: Collection) -> Result<String> {
        let snapshot = self.coordinator.list_records(collection).await?;
        Ok(self.templates.render(collection, &snapshot))
    }

    // == Delete ==
    pub async fn delete_record(&self, collection: Collection, email: &str) -> Result<()> {
        if email.is_empty() {
            return Err(AppError::MissingEmail);
        }

        match self.coordinator.delete_record(collection, email).await? {
            DeleteOutcome::Deleted => {
                info!(collection = %collection, email = %email, "record deleted");
                Ok(())
            }
            DeleteOutcome::NotFound => Err(AppError::NotFound),
        }
    }

    // == Bulk Upload ==
    /// Validates the whole batch before writing anything, then upserts it.
    ///
    /// Returns the number of distinct emails written.
    pub async fn bulk_create_goals(&self, requests: &[GoalRequest]) -> Result<usize> {
        let mut records = Vec::with_capacity(requests.len());

        for (index, request) in requests.iter().enumerate() {
            match request.validate() {
                Ok(record) => records.push(record),
                Err(AppError::InvalidEmail) => {
                    return Err(AppError::InvalidEmailAt(
                        request.email.clone().unwrap_or_default(),
                    ));
                }
                Err(AppError::Validation(_)) => {
                    return Err(AppError::Validation(format!(
                        "Invalid user at index {}. data must be {}",
                        index,
                        GoalRequest::SHAPE
                    )));
                }
                Err(e) => return Err(e),
            }
        }

        let count = self
            .coordinator
            .bulk_create(Collection::Goal, records)
            .await?;
        info!(count, "bulk upload written");
        Ok(count)
    }

    pub fn stats(&self) -> CacheStats {
        self.coordinator.stats()
    }
}

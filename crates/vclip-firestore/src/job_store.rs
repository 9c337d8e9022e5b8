//! Repository for `Job` documents — the CAS-guarded system of record for
//! the retention-editing pipeline (spec.md §4.1 `JobStore`).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::info;

use vclip_models::{Job, JobId, JobStatus, JobSummary, PipelineStepState, StepName};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{Document, Value};

const JOBS_COLLECTION: &str = "jobs";

/// Repository for `Job` documents, keyed by `JobId`.
///
/// Every mutating call goes through Firestore's `updateTime` precondition,
/// which plays the role of spec.md's `expectedUpdatedAt` optimistic-lock
/// token: a writer that read a stale document gets a `job_update_conflict`
/// instead of silently clobbering a concurrent update (same idiom as
/// `VideoRepository::update_clip_size_with_retry` in `repos.rs`).
#[derive(Clone)]
pub struct JobStore {
    client: FirestoreClient,
}

impl JobStore {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    fn step_collection(job_id: &JobId) -> String {
        format!("{}/{}/steps", JOBS_COLLECTION, job_id)
    }

    pub async fn get(&self, job_id: &JobId) -> FirestoreResult<Option<Job>> {
        let doc = self
            .client
            .get_document(JOBS_COLLECTION, job_id.as_str())
            .await?;
        doc.as_ref().map(document_to_job).transpose()
    }

    pub async fn create(&self, job: &Job) -> FirestoreResult<()> {
        let fields = job_to_fields(job)?;
        self.client
            .create_document(JOBS_COLLECTION, job.id.as_str(), fields)
            .await?;
        info!(job_id = %job.id, "created job record");
        Ok(())
    }

    /// Apply `mutate` to the current document and persist it, enforcing:
    /// - `expected_updated_at` (if given) matches the stored `updated_at`,
    /// - any status change the mutator makes is a legal transition
    ///   (`JobStatus::can_transition_to`),
    /// - the underlying Firestore document hasn't moved since it was read.
    ///
    /// All three failure modes surface as `job_update_conflict` or
    /// `invalid_status_transition` so callers can distinguish a stale read
    /// from a genuinely illegal status jump.
    pub async fn update(
        &self,
        job_id: &JobId,
        expected_updated_at: Option<DateTime<Utc>>,
        mutate: impl FnOnce(&mut Job),
    ) -> FirestoreResult<Job> {
        let doc = self
            .client
            .get_document(JOBS_COLLECTION, job_id.as_str())
            .await?
            .ok_or_else(|| FirestoreError::not_found(format!("{}/{}", JOBS_COLLECTION, job_id)))?;

        let mut job = document_to_job(&doc)?;

        if let Some(expected) = expected_updated_at {
            if job.updated_at != expected {
                return Err(FirestoreError::job_update_conflict(job_id));
            }
        }

        let previous_status = job.status;
        mutate(&mut job);

        if job.status != previous_status && !previous_status.can_transition_to(job.status) {
            return Err(FirestoreError::invalid_status_transition(
                previous_status.as_str(),
                job.status.as_str(),
            ));
        }

        job.updated_at = Utc::now();
        let fields = job_to_fields(&job)?;

        let updated = self
            .client
            .update_document_with_precondition(
                JOBS_COLLECTION,
                job_id.as_str(),
                fields,
                None,
                doc.update_time.as_deref(),
            )
            .await;

        match updated {
            Ok(_) => Ok(job),
            Err(e) if e.is_precondition_failed() => {
                Err(FirestoreError::job_update_conflict(job_id))
            }
            Err(e) => Err(e),
        }
    }

    /// Convenience wrapper around `update` for the common case of just
    /// advancing status (spec.md §4.1 step transitions).
    pub async fn update_status(&self, job_id: &JobId, next: JobStatus) -> FirestoreResult<Job> {
        self.update(job_id, None, |job| job.status = next).await
    }

    pub async fn get_step_state(
        &self,
        job_id: &JobId,
        step: StepName,
    ) -> FirestoreResult<Option<PipelineStepState>> {
        let doc = self
            .client
            .get_document(&Self::step_collection(job_id), step.as_str())
            .await?;
        doc.as_ref().map(document_to_step_state).transpose()
    }

    /// Upsert a step's state (spec.md §4.1 `updateStepState`). Each step
    /// owns its own document so step retries don't contend with the job's
    /// top-level precondition.
    pub async fn update_step_state(
        &self,
        job_id: &JobId,
        state: &PipelineStepState,
    ) -> FirestoreResult<()> {
        let fields = step_state_to_fields(state)?;
        let update_mask: Vec<String> = fields.keys().cloned().collect();
        match self
            .client
            .create_document(&Self::step_collection(job_id), state.step.as_str(), fields.clone())
            .await
        {
            Ok(_) => Ok(()),
            Err(FirestoreError::AlreadyExists(_)) => {
                self.client
                    .update_document(
                        &Self::step_collection(job_id),
                        state.step.as_str(),
                        fields,
                        Some(update_mask),
                    )
                    .await?;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Jobs whose status is non-terminal and whose `updated_at` is older
    /// than `stale_before` — candidates for the recovery sweep
    /// (spec.md §4.2, `STALE_PIPELINE_MS_DEFAULT`).
    pub async fn find_recoverable(&self, stale_before: DateTime<Utc>) -> FirestoreResult<Vec<Job>> {
        let response = self.client.list_documents(JOBS_COLLECTION, None, None).await?;
        let mut recoverable = Vec::new();
        if let Some(docs) = response.documents {
            for doc in docs {
                let job = document_to_job(&doc)?;
                if job.status.is_recoverable() && job.updated_at < stale_before {
                    recoverable.push(job);
                }
            }
        }
        Ok(recoverable)
    }

    /// Most recently completed jobs, newest first, for calibration lookback
    /// (spec.md §4.11, `HOOK_CALIBRATION_LOOKBACK_JOBS_DEFAULT`).
    pub async fn list_recent_completed(&self, limit: usize) -> FirestoreResult<Vec<JobSummary>> {
        let response = self.client.list_documents(JOBS_COLLECTION, None, None).await?;
        let mut completed = Vec::new();
        if let Some(docs) = response.documents {
            for doc in docs {
                let job = document_to_job(&doc)?;
                if job.status == JobStatus::Completed {
                    completed.push(job_to_summary(&job));
                }
            }
        }
        completed.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        completed.truncate(limit);
        Ok(completed)
    }
}

fn job_to_summary(job: &Job) -> JobSummary {
    JobSummary {
        id: job.id.clone(),
        owner_user_id: job.owner_user_id.clone(),
        status: job.status,
        retention_score: job.retention_score,
        content_format: job
            .analysis
            .get("content_format")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        completed_at: if job.status == JobStatus::Completed {
            Some(job.updated_at)
        } else {
            None
        },
    }
}

fn job_to_fields(job: &Job) -> FirestoreResult<HashMap<String, Value>> {
    json_object_to_fields(job)
}

fn document_to_job(doc: &Document) -> FirestoreResult<Job> {
    fields_to_json_object(doc)
}

fn step_state_to_fields(state: &PipelineStepState) -> FirestoreResult<HashMap<String, Value>> {
    json_object_to_fields(state)
}

fn document_to_step_state(doc: &Document) -> FirestoreResult<PipelineStepState> {
    fields_to_json_object(doc)
}

/// Serializes `value` through `serde_json` and recursively maps the
/// resulting JSON object into Firestore field values. `Job` and
/// `PipelineStepState` carry nested structs and a free-form `analysis`
/// blob that the hand-written per-field mapping in `repos.rs` isn't a good
/// fit for, so this generalizes `ToFirestoreValue`/`FromFirestoreValue` to
/// arbitrary JSON rather than adding dozens of field-by-field conversions.
fn json_object_to_fields<T: serde::Serialize>(value: &T) -> FirestoreResult<HashMap<String, Value>> {
    let json = serde_json::to_value(value).map_err(|e| FirestoreError::SerializationError(e.to_string()))?;
    match json {
        JsonValue::Object(map) => Ok(map
            .into_iter()
            .map(|(k, v)| (k, json_to_firestore_value(&v)))
            .collect()),
        _ => Err(FirestoreError::SerializationError(
            "expected a JSON object at the document root".to_string(),
        )),
    }
}

fn fields_to_json_object<T: serde::de::DeserializeOwned>(doc: &Document) -> FirestoreResult<T> {
    let fields = doc
        .fields
        .as_ref()
        .ok_or_else(|| FirestoreError::InvalidResponse("document has no fields".to_string()))?;
    let object: serde_json::Map<String, JsonValue> = fields
        .iter()
        .map(|(k, v)| (k.clone(), firestore_value_to_json(v)))
        .collect();
    serde_json::from_value(JsonValue::Object(object))
        .map_err(|e| FirestoreError::SerializationError(e.to_string()))
}

fn json_to_firestore_value(value: &JsonValue) -> Value {
    match value {
        JsonValue::Null => Value::NullValue(()),
        JsonValue::Bool(b) => Value::BooleanValue(*b),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::IntegerValue(i.to_string())
            } else {
                Value::DoubleValue(n.as_f64().unwrap_or_default())
            }
        }
        JsonValue::String(s) => Value::StringValue(s.clone()),
        JsonValue::Array(items) => Value::ArrayValue(crate::types::ArrayValue {
            values: Some(items.iter().map(json_to_firestore_value).collect()),
        }),
        JsonValue::Object(map) => Value::MapValue(crate::types::MapValue {
            fields: Some(
                map.iter()
                    .map(|(k, v)| (k.clone(), json_to_firestore_value(v)))
                    .collect(),
            ),
        }),
    }
}

fn firestore_value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::NullValue(_) => JsonValue::Null,
        Value::BooleanValue(b) => JsonValue::Bool(*b),
        Value::IntegerValue(s) => s
            .parse::<i64>()
            .map(JsonValue::from)
            .unwrap_or(JsonValue::Null),
        Value::DoubleValue(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Value::TimestampValue(s) | Value::StringValue(s) | Value::BytesValue(s) | Value::ReferenceValue(s) => {
            JsonValue::String(s.clone())
        }
        Value::GeoPointValue(gp) => serde_json::json!({ "latitude": gp.latitude, "longitude": gp.longitude }),
        Value::ArrayValue(arr) => JsonValue::Array(
            arr.values
                .as_ref()
                .map(|v| v.iter().map(firestore_value_to_json).collect())
                .unwrap_or_default(),
        ),
        Value::MapValue(map) => JsonValue::Object(
            map.fields
                .as_ref()
                .map(|f| f.iter().map(|(k, v)| (k.clone(), firestore_value_to_json(v))).collect())
                .unwrap_or_default(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vclip_models::PriorityLevel;

    #[test]
    fn job_round_trips_through_firestore_field_mapping() {
        let mut job = Job::new("user-1", "uploads/a.mp4", "standard", PriorityLevel::Priority);
        job.retention_score = Some(72.5);
        job.analysis.insert("content_format".into(), JsonValue::String("vlog".into()));

        let fields = job_to_fields(&job).unwrap();
        let doc = Document {
            name: None,
            fields: Some(fields),
            create_time: None,
            update_time: None,
        };
        let back = document_to_job(&doc).unwrap();

        assert_eq!(back.id, job.id);
        assert_eq!(back.retention_score, Some(72.5));
        assert_eq!(
            back.analysis.get("content_format").and_then(|v| v.as_str()),
            Some("vlog")
        );
    }

    #[test]
    fn step_state_round_trips() {
        let mut state = PipelineStepState::pending(StepName::HookSelectAndAudit);
        state.start();
        let fields = step_state_to_fields(&state).unwrap();
        let doc = Document {
            name: None,
            fields: Some(fields),
            create_time: None,
            update_time: None,
        };
        let back = document_to_step_state(&doc).unwrap();
        assert_eq!(back.step, StepName::HookSelectAndAudit);
        assert_eq!(back.attempts, 1);
    }
}

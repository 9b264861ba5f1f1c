//! Job service
//!
//! Browsing, posting and updating jobs, plus the fundi side of the
//! application flow (applying for a job).

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use super::events::{Event, EventBus};
use super::{call, require_id, require_text};
use crate::api::envelope::{decode, decode_page};
use crate::api::{ApiRequest, Transport};
use crate::application::NewApplication;
use crate::error::{ApiError, ApiResult};
use crate::filters::{Filters, JobFilters};
use crate::paged_list::PageSource;
use crate::types::{BudgetType, Job, JobApplication, JobStatus, Page, RecordId};

/// A job a customer is about to post
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewJob {
    pub title: String,
    pub description: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    pub budget_type: BudgetType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl NewJob {
    pub fn validate(&self) -> ApiResult<()> {
        require_text(&self.title, "Job title")?;
        require_text(&self.description, "Job description")?;
        require_text(&self.category, "Job category")?;
        check_budget(self.budget)
    }
}

/// Fields of a job to change; unset fields are left alone
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct JobUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget_type: Option<BudgetType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl JobUpdate {
    pub fn is_empty(&self) -> bool {
        *self == JobUpdate::default()
    }

    pub fn validate(&self) -> ApiResult<()> {
        if self.is_empty() {
            return Err(ApiError::InvalidRequest("Nothing to update".to_string()));
        }
        if let Some(title) = &self.title {
            require_text(title, "Job title")?;
        }
        if let Some(description) = &self.description {
            require_text(description, "Job description")?;
        }
        check_budget(self.budget)
    }
}

fn check_budget(budget: Option<f64>) -> ApiResult<()> {
    match budget {
        Some(amount) if amount <= 0.0 || !amount.is_finite() => Err(ApiError::InvalidRequest(
            format!("Budget must be greater than zero (got {})", amount),
        )),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct JobService {
    transport: Arc<dyn Transport>,
    events: EventBus,
}

impl JobService {
    pub fn new(transport: Arc<dyn Transport>, events: EventBus) -> Self {
        Self { transport, events }
    }

    /// One page of jobs matching `filters`
    pub async fn list(&self, filters: &JobFilters, page: u32, per_page: u32) -> ApiResult<Page<Job>> {
        filters.validate()?;
        let request = ApiRequest::get("/jobs")
            .with_query(filters.to_query())
            .with_page(page, per_page);
        let envelope = call(self.transport.as_ref(), request).await?;
        decode_page(envelope, page, per_page, "jobs")
    }

    pub async fn get(&self, id: &RecordId) -> ApiResult<Job> {
        let id = require_id(id, "Job")?;
        let envelope = call(self.transport.as_ref(), ApiRequest::get(format!("/jobs/{}", id))).await?;
        decode(envelope, "job")
    }

    pub async fn create(&self, job: &NewJob) -> ApiResult<Job> {
        job.validate()?;
        let request = ApiRequest::post("/jobs").with_json(job)?;
        let envelope = call(self.transport.as_ref(), request).await?;
        let created: Job = decode(envelope, "job")?;
        tracing::info!(job_id = %created.id, "Posted job '{}'", created.title);
        Ok(created)
    }

    pub async fn update(&self, id: &RecordId, update: &JobUpdate) -> ApiResult<Job> {
        let id = require_id(id, "Job")?;
        update.validate()?;
        let request = ApiRequest::put(format!("/jobs/{}", id)).with_json(update)?;
        let envelope = call(self.transport.as_ref(), request).await?;
        decode(envelope, "job")
    }

    /// Move a job to `status`
    ///
    /// Transitions other than open → in_progress | cancelled and
    /// in_progress → completed | cancelled are refused without a request.
    pub async fn update_status(&self, job: &Job, status: JobStatus) -> ApiResult<Job> {
        let id = require_id(&job.id, "Job")?;
        if !job.status.can_transition_to(status) {
            return Err(ApiError::InvalidRequest(format!(
                "Job {} is {} and cannot become {}",
                job.id, job.status, status
            )));
        }

        let request = ApiRequest::patch(format!("/jobs/{}/status", id))
            .with_json(&json!({ "status": status }))?;
        let envelope = call(self.transport.as_ref(), request).await?;

        let updated = if envelope.data.is_null() {
            Job {
                status,
                ..job.clone()
            }
        } else {
            decode(envelope, "job")?
        };

        self.events.emit(Event::JobStatusChanged {
            job_id: updated.id.clone(),
            status: updated.status,
        });
        Ok(updated)
    }

    /// Jobs posted by the signed-in customer
    pub async fn mine(&self, page: u32, per_page: u32) -> ApiResult<Page<Job>> {
        let request = ApiRequest::get("/jobs/mine").with_page(page, per_page);
        let envelope = call(self.transport.as_ref(), request).await?;
        decode_page(envelope, page, per_page, "jobs")
    }

    /// Submit an application for `job_id` as the signed-in fundi
    pub async fn apply(&self, job_id: &RecordId, application: &NewApplication) -> ApiResult<JobApplication> {
        let id = require_id(job_id, "Job")?;
        application.validate()?;

        let request = ApiRequest::post(format!("/jobs/{}/apply", id)).with_json(application)?;
        let envelope = call(self.transport.as_ref(), request).await?;
        let submitted: JobApplication = decode::<JobApplication>(envelope, "application")?.normalized();

        tracing::info!(job_id = %job_id, application_id = %submitted.id, "Application submitted");
        self.events.emit(Event::ApplicationSubmitted {
            job_id: job_id.clone(),
            application_id: submitted.id.clone(),
        });
        Ok(submitted)
    }
}

#[async_trait]
impl PageSource<Job, JobFilters> for JobService {
    async fn fetch_page(&self, filters: &JobFilters, page: u32, per_page: u32) -> ApiResult<Page<Job>> {
        self.list(filters, page, per_page).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockTransport;
    use crate::api::Method;
    use crate::types::BudgetBreakdown;
    use serde_json::{json, Value};

    fn job_json(id: u64, status: &str) -> Value {
        json!({
            "id": id,
            "title": format!("Job {}", id),
            "description": "Fix a leaking pipe",
            "category": "Plumbing",
            "budget": 3000,
            "status": status
        })
    }

    fn service() -> (JobService, MockTransport, EventBus) {
        let transport = MockTransport::new();
        let events = EventBus::new(10);
        let service = JobService::new(Arc::new(transport.clone()), events.clone());
        (service, transport, events)
    }

    fn new_job() -> NewJob {
        NewJob {
            title: "Replace kitchen tap".to_string(),
            description: "Tap drips constantly".to_string(),
            category: "Plumbing".to_string(),
            budget: Some(1500.0),
            budget_type: BudgetType::Fixed,
            deadline: None,
            location: Some("Nairobi".to_string()),
        }
    }

    #[tokio::test]
    async fn test_list_sends_filters_and_page() {
        let (service, transport, _) = service();
        transport.respond(
            Method::Get,
            "/jobs",
            json!({
                "success": true,
                "data": [job_json(1, "open"), job_json(2, "open")],
                "meta": {"current_page": 2, "last_page": 4, "total": 8, "per_page": 2}
            }),
        );

        let filters = JobFilters {
            search: Some("pipe".to_string()),
            ..Default::default()
        };
        let page = service.list(&filters, 2, 2).await.unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.total_pages, 4);

        let request = transport.last_call().unwrap();
        assert_eq!(request.query_param("search"), Some("pipe"));
        assert_eq!(request.query_param("page"), Some("2"));
        assert_eq!(request.query_param("per_page"), Some("2"));
    }

    #[tokio::test]
    async fn test_list_rejects_inverted_budget_without_request() {
        let (service, transport, _) = service();
        let filters = JobFilters {
            budget_min: Some(500.0),
            budget_max: Some(100.0),
            ..Default::default()
        };

        let err = service.list(&filters, 1, 20).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_posts_payload() {
        let (service, transport, _) = service();
        transport.route(Method::Post, "/jobs", |request| {
            let body = request.body.clone().unwrap_or_default();
            Ok(json!({
                "success": true,
                "data": {
                    "id": 41,
                    "title": body["title"],
                    "category": body["category"],
                    "status": "open"
                }
            }))
        });

        let job = service.create(&new_job()).await.unwrap();
        assert_eq!(job.id, RecordId::new("41"));
        assert_eq!(job.title, "Replace kitchen tap");

        let body = transport.last_call().unwrap().body.unwrap();
        assert_eq!(body["budget_type"], "fixed");
        assert_eq!(body["location"], "Nairobi");
        assert!(body.get("deadline").is_none());
    }

    #[tokio::test]
    async fn test_create_rejects_empty_title() {
        let (service, transport, _) = service();
        let mut job = new_job();
        job.title = "  ".to_string();

        let err = service.create(&job).await.unwrap_err();
        assert_eq!(err, ApiError::InvalidRequest("Job title cannot be empty".to_string()));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_update_requires_changes() {
        let (service, transport, _) = service();
        let err = service
            .update(&RecordId::new("3"), &JobUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_update_status_checks_transition() {
        let (service, transport, bus) = service();
        let mut events = bus.subscribe();
        transport.respond(
            Method::Patch,
            "/jobs/5/status",
            json!({"success": true, "data": job_json(5, "in_progress")}),
        );

        let job: Job = serde_json::from_value(job_json(5, "open")).unwrap();
        let updated = service.update_status(&job, JobStatus::InProgress).await.unwrap();
        assert_eq!(updated.status, JobStatus::InProgress);
        assert_eq!(transport.last_call().unwrap().body.unwrap(), json!({"status": "in_progress"}));
        assert!(matches!(
            events.recv().await.unwrap(),
            Event::JobStatusChanged { status: JobStatus::InProgress, .. }
        ));

        let err = service.update_status(&job, JobStatus::Completed).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_apply_validates_and_emits() {
        let (service, transport, bus) = service();
        let mut events = bus.subscribe();
        transport.respond(
            Method::Post,
            "/jobs/9/apply",
            json!({
                "success": true,
                "message": "Application submitted",
                "data": {
                    "id": 77,
                    "job_id": 9,
                    "fundi": {"id": 12, "name": "Amani"},
                    "status": "pending"
                }
            }),
        );

        let application = NewApplication {
            message: "I have done this before".to_string(),
            proposed_budget: BudgetBreakdown::new(2000.0, 500.0, 100.0),
            estimated_days: 2,
        };
        let submitted = service.apply(&RecordId::new("9"), &application).await.unwrap();
        assert_eq!(submitted.fundi_id, RecordId::new("12"));

        let body = transport.last_call().unwrap().body.unwrap();
        assert_eq!(body["proposed_budget"]["labor"], 2000.0);
        assert_eq!(body["estimated_days"], 2);
        assert!(matches!(events.recv().await.unwrap(), Event::ApplicationSubmitted { .. }));

        let invalid = NewApplication {
            estimated_days: 0,
            ..application
        };
        assert!(service.apply(&RecordId::new("9"), &invalid).await.is_err());
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test]
    async fn test_get_maps_not_found() {
        let (service, transport, _) = service();
        transport.fail(Method::Get, "/jobs/404", ApiError::NotFound("Job".to_string()));

        let err = service.get(&RecordId::new("404")).await.unwrap_err();
        assert_eq!(err.user_message(), "Job could not be found.");
    }
}

//! Application service
//!
//! The job owner's side of the application flow. Submitting an application
//! lives on [`JobService::apply`](super::jobs::JobService::apply).

use std::sync::Arc;

use serde_json::json;

use super::events::{Event, EventBus};
use super::{call, require_id};
use crate::api::envelope::{decode, decode_list, decode_page};
use crate::api::{ApiRequest, Transport};
use crate::application::{self, check_decision, Decision};
use crate::error::ApiResult;
use crate::types::{JobApplication, Page, RecordId};

#[derive(Clone)]
pub struct ApplicationService {
    transport: Arc<dyn Transport>,
    events: EventBus,
}

impl ApplicationService {
    pub fn new(transport: Arc<dyn Transport>, events: EventBus) -> Self {
        Self { transport, events }
    }

    /// All applications received for a job
    pub async fn list_for_job(&self, job_id: &RecordId) -> ApiResult<Vec<JobApplication>> {
        let id = require_id(job_id, "Job")?;
        let request = ApiRequest::get(format!("/jobs/{}/applications", id));
        let envelope = call(self.transport.as_ref(), request).await?;
        let applications: Vec<JobApplication> = decode_list(envelope, "application")?;
        Ok(applications.into_iter().map(JobApplication::normalized).collect())
    }

    /// Applications submitted by the signed-in fundi
    pub async fn mine(&self, page: u32, per_page: u32) -> ApiResult<Page<JobApplication>> {
        let request = ApiRequest::get("/applications/mine").with_page(page, per_page);
        let envelope = call(self.transport.as_ref(), request).await?;
        let page: Page<JobApplication> = decode_page(envelope, page, per_page, "applications")?;
        Ok(page.map(JobApplication::normalized))
    }

    /// Accept or reject a pending application
    ///
    /// Applications that are already accepted or rejected are refused
    /// without a request.
    pub async fn decide(&self, application: &JobApplication, decision: Decision) -> ApiResult<JobApplication> {
        let id = require_id(&application.id, "Application")?;
        let next = check_decision(application, decision)?;

        let request = ApiRequest::patch(format!("/applications/{}/status", id))
            .with_json(&json!({ "status": next }))?;
        let envelope = call(self.transport.as_ref(), request).await?;

        let decided = if envelope.data.is_null() {
            JobApplication {
                status: next,
                ..application.clone()
            }
        } else {
            decode::<JobApplication>(envelope, "application")?.normalized()
        };

        tracing::info!(application_id = %decided.id, status = %decided.status, "Application decided");
        self.events.emit(Event::ApplicationDecided {
            application_id: decided.id.clone(),
            status: decided.status,
        });
        Ok(decided)
    }

    /// Whether `fundi_id` has already applied for `job_id`
    pub async fn has_applied(&self, job_id: &RecordId, fundi_id: &RecordId) -> ApiResult<bool> {
        let applications = self.list_for_job(job_id).await?;
        Ok(application::has_applied(&applications, fundi_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockTransport;
    use crate::api::Method;
    use crate::error::ApiError;
    use crate::types::ApplicationStatus;

    fn service() -> (ApplicationService, MockTransport, EventBus) {
        let transport = MockTransport::new();
        let events = EventBus::new(10);
        let service = ApplicationService::new(Arc::new(transport.clone()), events.clone());
        (service, transport, events)
    }

    fn pending(id: &str) -> JobApplication {
        serde_json::from_value(json!({
            "id": id,
            "job_id": 3,
            "fundi_id": 8,
            "message": "Can start tomorrow",
            "proposed_budget": {"labor": 1200, "materials": 300, "transport": 0},
            "estimated_days": 1,
            "status": "pending"
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_for_job_normalizes_fundi_ids() {
        let (service, transport, _) = service();
        transport.respond(
            Method::Get,
            "/jobs/3/applications",
            json!({
                "success": true,
                "data": [
                    {"id": 1, "job_id": 3, "fundi": 21, "status": "pending"},
                    {"id": 2, "job_id": 3, "fundi": {"id": 22, "name": "Wanjiru"}, "status": "rejected"}
                ]
            }),
        );

        let applications = service.list_for_job(&RecordId::new("3")).await.unwrap();
        let ids: Vec<&str> = applications.iter().map(|a| a.fundi_id.as_str()).collect();
        assert_eq!(ids, vec!["21", "22"]);
        assert_eq!(
            applications[1].fundi.as_ref().and_then(|f| f.profile()).map(|f| f.name.as_str()),
            Some("Wanjiru")
        );
    }

    #[tokio::test]
    async fn test_decide_patches_status_and_emits() {
        let (service, transport, bus) = service();
        let mut events = bus.subscribe();
        transport.respond(
            Method::Patch,
            "/applications/5/status",
            json!({"success": true, "message": "Application accepted"}),
        );

        let decided = service.decide(&pending("5"), Decision::Accept).await.unwrap();
        assert_eq!(decided.status, ApplicationStatus::Accepted);
        assert_eq!(
            transport.last_call().unwrap().body.unwrap(),
            json!({"status": "accepted"})
        );
        assert_eq!(
            events.recv().await.unwrap(),
            Event::ApplicationDecided {
                application_id: RecordId::new("5"),
                status: ApplicationStatus::Accepted,
            }
        );
    }

    #[tokio::test]
    async fn test_decide_refuses_terminal_application() {
        let (service, transport, _) = service();
        let mut rejected = pending("6");
        rejected.status = ApplicationStatus::Rejected;

        let err = service.decide(&rejected, Decision::Accept).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(_)));
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_mine_is_paged() {
        let (service, transport, _) = service();
        transport.respond(
            Method::Get,
            "/applications/mine",
            json!({
                "success": true,
                "data": {
                    "data": [{"id": 1, "job_id": 3, "fundi": {"id": 8}, "status": "pending"}],
                    "current_page": 1,
                    "last_page": 2,
                    "per_page": 1,
                    "total": 2
                }
            }),
        );

        let page = service.mine(1, 1).await.unwrap();
        assert_eq!(page.items[0].fundi_id, RecordId::new("8"));
        assert!(page.has_more());
    }
}

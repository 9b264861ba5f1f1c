//! Job application lifecycle
//!
//! An application starts `pending` and is moved to `accepted` or `rejected`
//! by the job owner. Both outcomes are terminal. Uniqueness (one application
//! per fundi per job) is enforced by the server; the client only derives
//! "has applied" from a fetched application list.

use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::types::{ApplicationStatus, BudgetBreakdown, JobApplication, RecordId};

const MAX_MESSAGE_CHARS: usize = 1000;

impl ApplicationStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ApplicationStatus::Pending)
    }

    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        matches!(
            (self, next),
            (ApplicationStatus::Pending, ApplicationStatus::Accepted)
                | (ApplicationStatus::Pending, ApplicationStatus::Rejected)
        )
    }
}

/// The job owner's verdict on an application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Accept,
    Reject,
}

impl Decision {
    pub fn target_status(&self) -> ApplicationStatus {
        match self {
            Decision::Accept => ApplicationStatus::Accepted,
            Decision::Reject => ApplicationStatus::Rejected,
        }
    }
}

impl std::str::FromStr for Decision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "accept" | "accepted" => Ok(Decision::Accept),
            "reject" | "rejected" => Ok(Decision::Reject),
            _ => Err(format!("Invalid decision: '{}'. Valid options: accept, reject", s)),
        }
    }
}

/// Check that `application` may be moved by `decision`
pub fn check_decision(application: &JobApplication, decision: Decision) -> ApiResult<ApplicationStatus> {
    let next = decision.target_status();
    if application.status.can_transition_to(next) {
        Ok(next)
    } else {
        Err(ApiError::InvalidRequest(format!(
            "Application {} is already {} and cannot be {}",
            application.id, application.status, next
        )))
    }
}

/// Whether `fundi_id` appears among the applications
pub fn has_applied(applications: &[JobApplication], fundi_id: &RecordId) -> bool {
    applications.iter().any(|application| &application.fundi_id == fundi_id)
}

/// Application a fundi submits for a job
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewApplication {
    pub message: String,
    pub proposed_budget: BudgetBreakdown,
    pub estimated_days: u32,
}

impl NewApplication {
    pub fn validate(&self) -> ApiResult<()> {
        let message = self.message.trim();
        if message.is_empty() {
            return Err(ApiError::InvalidRequest(
                "Application message cannot be empty".to_string(),
            ));
        }
        if message.chars().count() > MAX_MESSAGE_CHARS {
            return Err(ApiError::InvalidRequest(format!(
                "Application message exceeds {} characters",
                MAX_MESSAGE_CHARS
            )));
        }

        let budget = &self.proposed_budget;
        for (label, amount) in [
            ("labor", budget.labor),
            ("materials", budget.materials),
            ("transport", budget.transport),
        ] {
            if amount < 0.0 || !amount.is_finite() {
                return Err(ApiError::InvalidRequest(format!(
                    "Proposed {} cost must be a positive amount (got {})",
                    label, amount
                )));
            }
        }
        if budget.total() <= 0.0 {
            return Err(ApiError::InvalidRequest(
                "Proposed budget must be greater than zero".to_string(),
            ));
        }
        if self.estimated_days == 0 {
            return Err(ApiError::InvalidRequest(
                "Estimated duration must be at least one day".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn application(id: &str, fundi_id: &str, status: ApplicationStatus) -> JobApplication {
        JobApplication {
            id: RecordId::new(id),
            job_id: RecordId::new("7"),
            fundi_id: RecordId::new(fundi_id),
            fundi: None,
            message: "I can do this".to_string(),
            proposed_budget: BudgetBreakdown::new(1000.0, 0.0, 0.0),
            estimated_days: 1,
            status,
            created_at: None,
        }
    }

    fn new_application() -> NewApplication {
        NewApplication {
            message: "Available this week".to_string(),
            proposed_budget: BudgetBreakdown::new(2500.0, 800.0, 200.0),
            estimated_days: 2,
        }
    }

    #[test]
    fn test_has_applied_finds_matching_fundi() {
        let applications = vec![
            application("1", "10", ApplicationStatus::Pending),
            application("2", "11", ApplicationStatus::Pending),
            application("3", "12", ApplicationStatus::Rejected),
        ];

        assert!(has_applied(&applications, &RecordId::new("11")));
        assert!(!has_applied(&applications, &RecordId::new("13")));
        assert!(!has_applied(&[], &RecordId::new("11")));
    }

    #[test]
    fn test_pending_transitions() {
        let pending = ApplicationStatus::Pending;
        assert!(pending.can_transition_to(ApplicationStatus::Accepted));
        assert!(pending.can_transition_to(ApplicationStatus::Rejected));
        assert!(!pending.can_transition_to(ApplicationStatus::Pending));
        assert!(!pending.is_terminal());
    }

    #[test]
    fn test_terminal_states_do_not_move() {
        for status in [ApplicationStatus::Accepted, ApplicationStatus::Rejected] {
            assert!(status.is_terminal());
            assert!(!status.can_transition_to(ApplicationStatus::Accepted));
            assert!(!status.can_transition_to(ApplicationStatus::Rejected));
            assert!(!status.can_transition_to(ApplicationStatus::Pending));
        }
    }

    #[test]
    fn test_check_decision() {
        let pending = application("1", "10", ApplicationStatus::Pending);
        assert_eq!(
            check_decision(&pending, Decision::Accept).unwrap(),
            ApplicationStatus::Accepted
        );

        let accepted = application("2", "10", ApplicationStatus::Accepted);
        let err = check_decision(&accepted, Decision::Reject).unwrap_err();
        assert!(matches!(err, ApiError::InvalidRequest(ref m) if m.contains("already accepted")));
    }

    #[test]
    fn test_decision_from_str() {
        assert_eq!("accept".parse::<Decision>().unwrap(), Decision::Accept);
        assert_eq!("REJECTED".parse::<Decision>().unwrap(), Decision::Reject);
        assert!("maybe".parse::<Decision>().is_err());
    }

    #[test]
    fn test_new_application_valid() {
        assert!(new_application().validate().is_ok());
    }

    #[test]
    fn test_new_application_rejects_blank_message() {
        let mut app = new_application();
        app.message = "   ".to_string();
        assert!(app.validate().is_err());
    }

    #[test]
    fn test_new_application_rejects_bad_budget() {
        let mut app = new_application();
        app.proposed_budget = BudgetBreakdown::new(-5.0, 10.0, 0.0);
        let err = app.validate().unwrap_err();
        assert!(err.to_string().contains("labor"));

        app.proposed_budget = BudgetBreakdown::default();
        assert!(app.validate().is_err());
    }

    #[test]
    fn test_new_application_rejects_zero_days() {
        let mut app = new_application();
        app.estimated_days = 0;
        assert!(app.validate().is_err());
    }
}

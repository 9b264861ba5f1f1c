//! Fundi directory and profile editing

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::{call, require_id, require_text};
use crate::api::envelope::{decode, decode_page};
use crate::api::{ApiRequest, Transport};
use crate::error::{ApiError, ApiResult};
use crate::filters::{Filters, FundiFilters};
use crate::paged_list::PageSource;
use crate::types::{Fundi, Page, RecordId};

/// Profile fields a fundi can change; unset fields are left alone
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
}

impl ProfileUpdate {
    pub fn validate(&self) -> ApiResult<()> {
        if *self == ProfileUpdate::default() {
            return Err(ApiError::InvalidRequest("Nothing to update".to_string()));
        }
        if let Some(name) = &self.name {
            require_text(name, "Name")?;
        }
        if let Some(rate) = self.hourly_rate {
            if rate < 0.0 || !rate.is_finite() {
                return Err(ApiError::InvalidRequest(format!(
                    "Hourly rate must be a positive amount (got {})",
                    rate
                )));
            }
        }
        if let Some(skills) = &self.skills {
            if skills.iter().any(|skill| skill.trim().is_empty()) {
                return Err(ApiError::InvalidRequest("Skills cannot be blank".to_string()));
            }
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct FundiService {
    transport: Arc<dyn Transport>,
}

impl FundiService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn list(&self, filters: &FundiFilters, page: u32, per_page: u32) -> ApiResult<Page<Fundi>> {
        filters.validate()?;
        let request = ApiRequest::get("/fundis")
            .with_query(filters.to_query())
            .with_page(page, per_page);
        let envelope = call(self.transport.as_ref(), request).await?;
        decode_page(envelope, page, per_page, "fundis")
    }

    pub async fn get(&self, id: &RecordId) -> ApiResult<Fundi> {
        let id = require_id(id, "Fundi")?;
        let envelope = call(self.transport.as_ref(), ApiRequest::get(format!("/fundis/{}", id))).await?;
        decode(envelope, "fundi")
    }

    pub async fn update_profile(&self, id: &RecordId, update: &ProfileUpdate) -> ApiResult<Fundi> {
        let id = require_id(id, "Fundi")?;
        update.validate()?;
        let request = ApiRequest::put(format!("/fundis/{}", id)).with_json(update)?;
        let envelope = call(self.transport.as_ref(), request).await?;
        let fundi: Fundi = decode(envelope, "fundi")?;
        tracing::info!(fundi_id = %fundi.id, "Profile updated");
        Ok(fundi)
    }
}

#[async_trait]
impl PageSource<Fundi, FundiFilters> for FundiService {
    async fn fetch_page(&self, filters: &FundiFilters, page: u32, per_page: u32) -> ApiResult<Page<Fundi>> {
        self.list(filters, page, per_page).await
    }
}

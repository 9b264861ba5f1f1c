//! Portfolio items: past work a fundi shows to customers

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{call, require_id, require_text};
use crate::api::envelope::{decode, decode_page};
use crate::api::{ApiRequest, Transport};
use crate::error::{ApiError, ApiResult};
use crate::filters::{Filters, PortfolioFilters};
use crate::paged_list::PageSource;
use crate::types::{Page, Portfolio, RecordId};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NewPortfolioItem {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub media_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl NewPortfolioItem {
    pub fn validate(&self) -> ApiResult<()> {
        require_text(&self.title, "Portfolio title")?;
        check_cost(self.cost)
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct PortfolioUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_urls: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl PortfolioUpdate {
    pub fn validate(&self) -> ApiResult<()> {
        if *self == PortfolioUpdate::default() {
            return Err(ApiError::InvalidRequest("Nothing to update".to_string()));
        }
        if let Some(title) = &self.title {
            require_text(title, "Portfolio title")?;
        }
        check_cost(self.cost)
    }
}

fn check_cost(cost: Option<f64>) -> ApiResult<()> {
    match cost {
        Some(amount) if amount < 0.0 || !amount.is_finite() => Err(ApiError::InvalidRequest(
            format!("Cost must be a positive amount (got {})", amount),
        )),
        _ => Ok(()),
    }
}

#[derive(Clone)]
pub struct PortfolioService {
    transport: Arc<dyn Transport>,
}

impl PortfolioService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn list(
        &self,
        filters: &PortfolioFilters,
        page: u32,
        per_page: u32,
    ) -> ApiResult<Page<Portfolio>> {
        filters.validate()?;
        let request = ApiRequest::get("/portfolios")
            .with_query(filters.to_query())
            .with_page(page, per_page);
        let envelope = call(self.transport.as_ref(), request).await?;
        decode_page(envelope, page, per_page, "portfolio")
    }

    pub async fn get(&self, id: &RecordId) -> ApiResult<Portfolio> {
        let id = require_id(id, "Portfolio item")?;
        let request = ApiRequest::get(format!("/portfolios/{}", id));
        let envelope = call(self.transport.as_ref(), request).await?;
        decode(envelope, "portfolio item")
    }

    /// Add an item to the signed-in fundi's portfolio
    pub async fn create(&self, item: &NewPortfolioItem) -> ApiResult<Portfolio> {
        item.validate()?;
        let request = ApiRequest::post("/portfolios").with_json(item)?;
        let envelope = call(self.transport.as_ref(), request).await?;
        let created: Portfolio = decode(envelope, "portfolio item")?;
        tracing::info!(portfolio_id = %created.id, "Portfolio item added");
        Ok(created)
    }

    pub async fn update(&self, id: &RecordId, update: &PortfolioUpdate) -> ApiResult<Portfolio> {
        let id = require_id(id, "Portfolio item")?;
        update.validate()?;
        let request = ApiRequest::put(format!("/portfolios/{}", id)).with_json(update)?;
        let envelope = call(self.transport.as_ref(), request).await?;
        decode(envelope, "portfolio item")
    }

    pub async fn delete(&self, id: &RecordId) -> ApiResult<()> {
        let id = require_id(id, "Portfolio item")?;
        call(self.transport.as_ref(), ApiRequest::delete(format!("/portfolios/{}", id))).await?;
        tracing::info!(portfolio_id = %id, "Portfolio item deleted");
        Ok(())
    }
}

#[async_trait]
impl PageSource<Portfolio, PortfolioFilters> for PortfolioService {
    async fn fetch_page(
        &self,
        filters: &PortfolioFilters,
        page: u32,
        per_page: u32,
    ) -> ApiResult<Page<Portfolio>> {
        self.list(filters, page, per_page).await
    }
}

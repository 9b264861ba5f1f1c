//! Trade categories

use std::sync::Arc;

use super::call;
use crate::api::envelope::decode_list;
use crate::api::{ApiRequest, Transport};
use crate::error::ApiResult;
use crate::types::Category;

#[derive(Clone)]
pub struct CategoryService {
    transport: Arc<dyn Transport>,
}

impl CategoryService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn list(&self) -> ApiResult<Vec<Category>> {
        let envelope = call(self.transport.as_ref(), ApiRequest::get("/categories")).await?;
        decode_list(envelope, "category")
    }
}

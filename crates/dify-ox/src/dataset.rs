use admin_ox_common::{
    PageParam, PageResult,
    request_builder::{Endpoint, HttpMethod},
};
use bon::Builder;
use serde::{Deserialize, Serialize};

use crate::{Dify, DifyRequestError};

/// Who can see a knowledge base
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetPermission {
    OnlyMe,
    AllTeamMembers,
    PartialMembers,
}

/// A Dify knowledge base
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// Absent until the dataset has been created
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[builder(into)]
    pub name: String,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub permission: DatasetPermission,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source_type: Option<String>,
    /// `high_quality` or `economy`
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexing_technique: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

/// Filters for [`Dify::list_datasets`]
#[derive(Debug, Clone, Default, PartialEq, Builder)]
pub struct DatasetQuery {
    #[builder(default)]
    pub page: PageParam,
    #[builder(into)]
    pub name: Option<String>,
    pub permission: Option<DatasetPermission>,
    #[builder(into)]
    pub data_source_type: Option<String>,
}

impl DatasetQuery {
    fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params = self.page.to_query_params();
        if let Some(ref name) = self.name {
            params.push(("name".to_string(), name.clone()));
        }
        if let Some(ref permission) = self.permission {
            // Serializing a unit variant to a JSON string cannot fail
            if let Ok(serde_json::Value::String(value)) = serde_json::to_value(permission) {
                params.push(("permission".to_string(), value));
            }
        }
        if let Some(ref data_source_type) = self.data_source_type {
            params.push(("dataSourceType".to_string(), data_source_type.clone()));
        }
        params
    }
}

impl Dify {
    pub async fn list_datasets(
        &self,
        query: &DatasetQuery,
    ) -> Result<PageResult<Dataset>, DifyRequestError> {
        self.throttle().await;
        let endpoint = Endpoint::new("dify/dataset/list", HttpMethod::Get)
            .with_query_params(query.to_query_params());
        self.request_helper().get(&endpoint).await
    }

    pub async fn get_dataset(&self, id: &str) -> Result<Dataset, DifyRequestError> {
        self.throttle().await;
        let endpoint = Endpoint::new("dify/dataset/get", HttpMethod::Get)
            .with_query_params(vec![("id".to_string(), id.to_string())]);
        self.request_helper().get(&endpoint).await
    }

    /// Create a knowledge base and return its id
    pub async fn create_dataset(&self, dataset: &Dataset) -> Result<String, DifyRequestError> {
        self.throttle().await;
        let endpoint = Endpoint::new("dify/dataset/create", HttpMethod::Post);
        self.request_helper().send(&endpoint, Some(dataset)).await
    }

    pub async fn update_dataset(&self, dataset: &Dataset) -> Result<(), DifyRequestError> {
        if dataset.id.is_none() {
            return Err(DifyRequestError::InvalidRequest(
                "dataset id is required for update".to_string(),
            ));
        }
        self.throttle().await;
        let endpoint = Endpoint::new("dify/dataset/update", HttpMethod::Put);
        self.request_helper().send_unit(&endpoint, Some(dataset)).await
    }

    pub async fn delete_dataset(&self, id: &str) -> Result<(), DifyRequestError> {
        self.throttle().await;
        let endpoint = Endpoint::new("dify/dataset/delete", HttpMethod::Delete)
            .with_query_params(vec![("id".to_string(), id.to_string())]);
        self.request_helper().send_unit::<()>(&endpoint, None).await
    }

    /// Spreadsheet export of the datasets matching `query`
    pub async fn export_datasets(&self, query: &DatasetQuery) -> Result<bytes::Bytes, DifyRequestError> {
        self.throttle().await;
        let endpoint = Endpoint::new("dify/dataset/export-excel", HttpMethod::Get)
            .with_query_params(query.to_query_params());
        self.request_helper().download(&endpoint).await
    }
}

use admin_ox_common::{
    MultipartForm, PageParam, PageResult,
    request_builder::{Endpoint, HttpMethod},
};
use bon::Builder;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{Dify, DifyRequestError};

/// A document inside a knowledge base, as reported by Dify
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub position: u32,
    #[serde(default)]
    pub tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub data_source_type: String,
    #[serde(default)]
    pub data_source_info: Value,
    #[serde(default)]
    pub dataset_process_rule_id: Option<String>,
    #[serde(default)]
    pub created_from: String,
    #[serde(default)]
    pub created_by: String,
    /// Unix seconds
    #[serde(default)]
    pub created_at: i64,
    /// `waiting`, `parsing`, `indexing`, `completed`, `error`, ...
    #[serde(default)]
    pub indexing_status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled_by: Option<String>,
    #[serde(default)]
    pub display_status: String,
    #[serde(default)]
    pub word_count: u64,
    #[serde(default)]
    pub hit_count: u64,
    #[serde(default)]
    pub doc_form: String,
}

impl Document {
    #[must_use]
    pub fn is_indexed(&self) -> bool {
        self.indexing_status == "completed"
    }
}

/// Filters for [`Dify::list_documents`]
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct DocumentQuery {
    #[builder(into)]
    pub dataset_id: String,
    #[builder(default)]
    pub page: PageParam,
    #[builder(into)]
    pub keyword: Option<String>,
    pub enabled: Option<bool>,
}

impl DocumentQuery {
    fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params = self.page.to_query_params();
        if let Some(ref keyword) = self.keyword {
            params.push(("keyword".to_string(), keyword.clone()));
        }
        if let Some(enabled) = self.enabled {
            params.push(("enabled".to_string(), enabled.to_string()));
        }
        params
    }
}

/// Create a document from text or an already uploaded source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCreateRequest {
    #[builder(into)]
    pub dataset_id: String,
    #[builder(into)]
    pub name: String,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// `upload_file`, `notion_import`, `website_crawl`, ...
    #[builder(into)]
    pub data_source_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source_info: Option<Value>,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexing_technique: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_rule: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct DocumentUpdateRequest {
    #[builder(into)]
    pub id: String,
    #[builder(into)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl Dify {
    /// Documents of one dataset. The backend does not page this listing, so
    /// `total` is the number of documents returned.
    pub async fn list_documents(
        &self,
        query: &DocumentQuery,
    ) -> Result<PageResult<Document>, DifyRequestError> {
        self.throttle().await;
        let endpoint = Endpoint::new(
            format!("dify/dataset/{}/documents", query.dataset_id),
            HttpMethod::Get,
        )
        .with_query_params(query.to_query_params());

        let documents: Option<Vec<Document>> = self.request_helper().get_optional(&endpoint).await?;
        Ok(PageResult::from_list(documents.unwrap_or_default()))
    }

    pub async fn get_document(
        &self,
        dataset_id: &str,
        document_id: &str,
    ) -> Result<Document, DifyRequestError> {
        self.throttle().await;
        let endpoint = Endpoint::new(
            format!("dify/dataset/{dataset_id}/documents/{document_id}"),
            HttpMethod::Get,
        );
        self.request_helper().get(&endpoint).await
    }

    pub async fn create_document(&self, request: &DocumentCreateRequest) -> Result<(), DifyRequestError> {
        self.throttle().await;
        let endpoint = Endpoint::new(
            format!("dify/dataset/{}/documents", request.dataset_id),
            HttpMethod::Post,
        );
        self.request_helper().send_unit(&endpoint, Some(request)).await
    }

    /// Upload a file as a new document. The MIME type is guessed from
    /// `file_name`; `name` overrides the document name.
    pub async fn create_document_by_file(
        &self,
        dataset_id: &str,
        file_name: &str,
        data: Vec<u8>,
        name: Option<&str>,
    ) -> Result<Document, DifyRequestError> {
        let mime_type = mime_guess::from_path(file_name).first_or_octet_stream();
        let mut form =
            MultipartForm::new().file_from_bytes_with_mime("file", file_name, data, mime_type.as_ref())?;
        if let Some(name) = name {
            form = form.text("name", name);
        }

        self.throttle().await;
        let endpoint = Endpoint::new(
            format!("dify/dataset/{dataset_id}/document/create-by-file"),
            HttpMethod::Post,
        );
        self.request_helper().upload(&endpoint, form.build()).await
    }

    pub async fn update_document(
        &self,
        dataset_id: &str,
        request: &DocumentUpdateRequest,
    ) -> Result<(), DifyRequestError> {
        self.throttle().await;
        let endpoint = Endpoint::new(
            format!("dify/dataset/{dataset_id}/documents/{}", request.id),
            HttpMethod::Put,
        );
        self.request_helper().send_unit(&endpoint, Some(request)).await
    }

    pub async fn delete_document(&self, dataset_id: &str, document_id: &str) -> Result<(), DifyRequestError> {
        self.throttle().await;
        let endpoint = Endpoint::new(
            format!("dify/dataset/{dataset_id}/document/{document_id}"),
            HttpMethod::Delete,
        );
        self.request_helper().send_unit::<()>(&endpoint, None).await
    }

    pub async fn toggle_document_status(
        &self,
        dataset_id: &str,
        document_id: &str,
        enabled: bool,
    ) -> Result<(), DifyRequestError> {
        self.throttle().await;
        let endpoint = Endpoint::new(
            format!("dify/dataset/{dataset_id}/documents/{document_id}/status"),
            HttpMethod::Put,
        );
        self.request_helper()
            .send_unit(&endpoint, Some(&json!({ "enabled": enabled })))
            .await
    }

    /// Queue the document for re-indexing
    pub async fn reprocess_document(&self, dataset_id: &str, document_id: &str) -> Result<(), DifyRequestError> {
        self.throttle().await;
        let endpoint = Endpoint::new(
            format!("dify/dataset/{dataset_id}/documents/{document_id}/reprocess"),
            HttpMethod::Post,
        );
        self.request_helper().send_unit::<()>(&endpoint, None).await
    }

    pub async fn export_documents(&self, query: &DocumentQuery) -> Result<bytes::Bytes, DifyRequestError> {
        self.throttle().await;
        let endpoint = Endpoint::new(
            format!("dify/dataset/{}/documents/export-excel", query.dataset_id),
            HttpMethod::Get,
        )
        .with_query_params(query.to_query_params());
        self.request_helper().download(&endpoint).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_tolerates_sparse_payload() {
        let document: Document = serde_json::from_value(json!({
            "id": "d-1",
            "name": "pasta.md",
            "indexing_status": "completed",
            "enabled": true
        }))
        .unwrap();
        assert!(document.is_indexed());
        assert_eq!(document.word_count, 0);
        assert_eq!(document.data_source_info, Value::Null);
    }

    #[test]
    fn test_document_query_params() {
        let query = DocumentQuery::builder()
            .dataset_id("ds-1")
            .keyword("soup")
            .enabled(true)
            .build();

        assert_eq!(
            query.to_query_params(),
            vec![
                ("pageNo".to_string(), "1".to_string()),
                ("pageSize".to_string(), "10".to_string()),
                ("keyword".to_string(), "soup".to_string()),
                ("enabled".to_string(), "true".to_string()),
            ]
        );
    }

    #[test]
    fn test_create_request_is_camel_case() {
        let request = DocumentCreateRequest::builder()
            .dataset_id("ds-1")
            .name("notes")
            .text("Boil water.")
            .data_source_type("upload_file")
            .build();

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "datasetId": "ds-1",
                "name": "notes",
                "text": "Boil water.",
                "dataSourceType": "upload_file"
            })
        );
    }
}

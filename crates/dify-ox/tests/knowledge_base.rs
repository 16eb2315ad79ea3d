use dify_ox::{
    Credentials, Dataset, DatasetQuery, Dify, DifyRequestError, DocumentQuery, PageParam,
    dataset::DatasetPermission,
    document::{DocumentCreateRequest, DocumentUpdateRequest},
};
use serde_json::json;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, body_string_contains, header, header_regex, method, path, query_param},
};

async fn client() -> (MockServer, Dify) {
    let server = MockServer::start().await;
    let client = Dify::new(
        server.uri(),
        Credentials::builder().access_token("tok").tenant_id("1").build(),
    );
    (server, client)
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"code": 0, "data": data, "msg": ""}))
}

#[tokio::test]
async fn test_list_datasets_forwards_filters() {
    let (server, client) = client().await;

    Mock::given(method("GET"))
        .and(path("/dify/dataset/list"))
        .and(query_param("pageNo", "2"))
        .and(query_param("pageSize", "5"))
        .and(query_param("permission", "only_me"))
        .and(header("authorization", "Bearer tok"))
        .and(header("tenant-id", "1"))
        .respond_with(ok(json!({
            "list": [{"id": "ds-1", "name": "Recipes", "permission": "only_me", "documentCount": 3}],
            "total": 6
        })))
        .mount(&server)
        .await;

    let query = DatasetQuery::builder()
        .page(PageParam::new(2, 5))
        .permission(DatasetPermission::OnlyMe)
        .build();
    let page = client.list_datasets(&query).await.unwrap();

    assert_eq!(page.total, 6);
    assert_eq!(page.list[0].id.as_deref(), Some("ds-1"));
    assert_eq!(page.list[0].document_count, Some(3));
}

#[tokio::test]
async fn test_dataset_lifecycle() {
    let (server, client) = client().await;

    Mock::given(method("POST"))
        .and(path("/dify/dataset/create"))
        .and(body_json(json!({"name": "Recipes", "permission": "all_team_members"})))
        .respond_with(ok(json!("ds-9")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/dify/dataset/get"))
        .and(query_param("id", "ds-9"))
        .respond_with(ok(json!({"id": "ds-9", "name": "Recipes", "permission": "all_team_members"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/dify/dataset/update"))
        .respond_with(ok(json!(true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/dify/dataset/delete"))
        .and(query_param("id", "ds-9"))
        .respond_with(ok(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    let draft = Dataset::builder()
        .name("Recipes")
        .permission(DatasetPermission::AllTeamMembers)
        .build();
    let id = client.create_dataset(&draft).await.unwrap();
    assert_eq!(id, "ds-9");

    let mut dataset = client.get_dataset(&id).await.unwrap();
    dataset.description = Some("Family recipes".to_string());
    client.update_dataset(&dataset).await.unwrap();
    client.delete_dataset(&id).await.unwrap();
}

#[tokio::test]
async fn test_update_without_id_is_rejected_locally() {
    let (server, client) = client().await;

    let draft = Dataset::builder()
        .name("Recipes")
        .permission(DatasetPermission::OnlyMe)
        .build();
    let result = client.update_dataset(&draft).await;

    assert!(matches!(result, Err(DifyRequestError::InvalidRequest(_))));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_export_datasets_returns_file_bytes() {
    let (server, client) = client().await;

    Mock::given(method("GET"))
        .and(path("/dify/dataset/export-excel"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(b"PK\x03\x04sheet".to_vec(), "application/vnd.ms-excel"),
        )
        .mount(&server)
        .await;

    let bytes = client.export_datasets(&DatasetQuery::default()).await.unwrap();
    assert_eq!(&bytes[..], b"PK\x03\x04sheet");
}

#[tokio::test]
async fn test_export_failure_reported_as_envelope() {
    let (server, client) = client().await;

    Mock::given(method("GET"))
        .and(path("/dify/dataset/export-excel"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"code": 403, "msg": "no permission"})),
        )
        .mount(&server)
        .await;

    let result = client.export_datasets(&DatasetQuery::default()).await;
    assert!(matches!(result, Err(DifyRequestError::Api { code: 403, .. })));
}

#[tokio::test]
async fn test_list_documents_wraps_bare_list() {
    let (server, client) = client().await;

    Mock::given(method("GET"))
        .and(path("/dify/dataset/ds-1/documents"))
        .and(query_param("keyword", "egg"))
        .respond_with(ok(json!([
            {"id": "d-1", "name": "eggs.md", "indexing_status": "completed", "enabled": true},
            {"id": "d-2", "name": "soup.md", "indexing_status": "indexing", "enabled": true}
        ])))
        .mount(&server)
        .await;

    let query = DocumentQuery::builder().dataset_id("ds-1").keyword("egg").build();
    let page = client.list_documents(&query).await.unwrap();

    assert_eq!(page.total, 2);
    assert!(page.list[0].is_indexed());
    assert!(!page.list[1].is_indexed());
}

#[tokio::test]
async fn test_list_documents_with_null_data_is_empty() {
    let (server, client) = client().await;

    Mock::given(method("GET"))
        .and(path("/dify/dataset/ds-1/documents"))
        .respond_with(ok(serde_json::Value::Null))
        .mount(&server)
        .await;

    let query = DocumentQuery::builder().dataset_id("ds-1").build();
    let page = client.list_documents(&query).await.unwrap();

    assert!(page.list.is_empty());
    assert_eq!(page.total, 0);
}

#[tokio::test]
async fn test_create_document_by_file_uploads_multipart() {
    let (server, client) = client().await;

    Mock::given(method("POST"))
        .and(path("/dify/dataset/ds-1/document/create-by-file"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains("filename=\"eggs.md\""))
        .and(body_string_contains("Boil for seven minutes."))
        .and(body_string_contains("Egg guide"))
        .respond_with(ok(json!({"id": "d-7", "name": "Egg guide", "indexing_status": "waiting"})))
        .expect(1)
        .mount(&server)
        .await;

    let document = client
        .create_document_by_file(
            "ds-1",
            "eggs.md",
            b"Boil for seven minutes.".to_vec(),
            Some("Egg guide"),
        )
        .await
        .unwrap();

    assert_eq!(document.id, "d-7");
    assert_eq!(document.indexing_status, "waiting");
}

#[tokio::test]
async fn test_document_mutations() {
    let (server, client) = client().await;

    Mock::given(method("POST"))
        .and(path("/dify/dataset/ds-1/documents"))
        .and(body_json(json!({
            "datasetId": "ds-1",
            "name": "notes",
            "text": "Salt the water.",
            "dataSourceType": "upload_file"
        })))
        .respond_with(ok(json!(true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/dify/dataset/ds-1/documents/d-1"))
        .and(body_json(json!({"id": "d-1", "name": "renamed"})))
        .respond_with(ok(json!(true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/dify/dataset/ds-1/documents/d-1/status"))
        .and(body_json(json!({"enabled": false})))
        .respond_with(ok(json!(true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/dify/dataset/ds-1/documents/d-1/reprocess"))
        .respond_with(ok(json!(true)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/dify/dataset/ds-1/document/d-1"))
        .respond_with(ok(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    let create = DocumentCreateRequest::builder()
        .dataset_id("ds-1")
        .name("notes")
        .text("Salt the water.")
        .data_source_type("upload_file")
        .build();
    client.create_document(&create).await.unwrap();

    let update = DocumentUpdateRequest::builder().id("d-1").name("renamed").build();
    client.update_document("ds-1", &update).await.unwrap();
    client.toggle_document_status("ds-1", "d-1", false).await.unwrap();
    client.reprocess_document("ds-1", "d-1").await.unwrap();
    client.delete_document("ds-1", "d-1").await.unwrap();
}

#[tokio::test]
async fn test_get_document_error_status() {
    let (server, client) = client().await;

    Mock::given(method("GET"))
        .and(path("/dify/dataset/ds-1/documents/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "code": "not_found",
            "message": "Document not found.",
            "status": 404
        })))
        .mount(&server)
        .await;

    let error = client.get_document("ds-1", "missing").await.unwrap_err();

    assert_eq!(error.status(), Some(404));
    assert_eq!(error.to_string(), "HTTP error! status: 404: Document not found.");
}

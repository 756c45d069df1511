//! End-to-end report aggregation.

use super::*;
use serde_json::json;
use wiremock::matchers::query_param;

const PROJECTS: &str = "/project/v1/hubs/b.acct/projects";
const ISSUE_TYPES: &str = "/construction/issues/v1/projects/p1/issue-types";
const ISSUES: &str = "/construction/issues/v1/projects/p1/issues";
const DATA: &str = "/data/v1/projects/b.p1";

async fn mount_project(server: &MockServer) {
    mount_get(
        server,
        PROJECTS,
        json!({"data": [
            {"id": "b.p0", "attributes": {"name": "Other"}},
            {"id": "b.p1", "attributes": {"name": "DEV TASK 1 Project"}}
        ]}),
    )
    .await;
    mount_get(
        server,
        ISSUE_TYPES,
        json!({"results": [
            {"id": "t1", "name": "Quality", "subtypes": [{"id": "s1", "name": "Clash"}]}
        ]}),
    )
    .await;
}

/// Plan sheet `doc1` living in `Project Files/Plans`.
async fn mount_plan_document(server: &MockServer) {
    mount_get(
        server,
        &format!("{}/items/doc1/tip", DATA),
        json!({"data": {
            "id": "doc1:v3",
            "type": "versions",
            "attributes": {"name": "plan.pdf", "fileType": "pdf"},
            "links": {"webView": {"href": "https://acc.example/docs/doc1?x=1"}}
        }}),
    )
    .await;
    mount_get(
        server,
        &format!("{}/items/doc1/parent", DATA),
        json!({"data": {"id": "fplans", "type": "folders"}}),
    )
    .await;
    mount_get(
        server,
        &format!("{}/folders/fplans", DATA),
        json!({"data": {"id": "fplans", "type": "folders", "attributes": {"displayName": "Plans"}}}),
    )
    .await;
    mount_get(
        server,
        &format!("{}/folders/fplans/parent", DATA),
        json!({"data": {"id": "froot", "type": "folders"}}),
    )
    .await;
    mount_get(
        server,
        &format!("{}/folders/froot", DATA),
        json!({"data": {"id": "froot", "type": "folders", "attributes": {"name": "Project Files"}}}),
    )
    .await;
    mount_status(server, &format!("{}/folders/froot/parent", DATA), 404).await;
}

#[tokio::test]
async fn test_collect_rows_end_to_end() {
    let server = MockServer::start().await;
    mount_project(&server).await;
    mount_plan_document(&server).await;

    Mock::given(method("GET"))
        .and(path(ISSUES))
        .and(query_param("offset", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{
                "id": "i1",
                "issueTypeId": "t1",
                "issueSubtypeId": "s1",
                "status": "open",
                "dueDate": "2025-08-20T10:00:00Z",
                "startDate": "2025-08-01",
                "title": "  Door clash ",
                "description": "Frame overlaps wall\n",
                "placements": [{"lineageUrn": "doc1", "viewable": {"guid": "g123"}}],
                "linkedDocuments": [{"urn": "doc2", "details": {"viewable": {"id": "g999"}}}]
            }],
            "pagination": {"limit": 100, "offset": 0, "totalResults": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_get(
        &server,
        &format!("{}/items/doc2/tip", DATA),
        json!({"data": {"id": "doc2:v1", "type": "versions", "attributes": {"name": "notes.txt", "fileType": "txt"}}}),
    )
    .await;
    mount_status(&server, &format!("{}/items/doc2/parent", DATA), 404).await;
    mount_get(
        &server,
        &format!("{}/i1/comments", ISSUES),
        json!({"results": [
            {"createdAt": "2025-08-02T09:00:00Z", "body": "Second"},
            {"createdAt": "2025-08-01T09:00:00Z", "body": "First\r\n"}
        ]}),
    )
    .await;

    let client = test_client(&server, store_with_token("token"));
    let rows = client.collect_rows_for("DEV TASK 1 Project").await.unwrap();

    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(row.project_id, "b.p1");
    assert_eq!(row.project_name, "DEV TASK 1 Project");
    assert_eq!(row.document_id, "doc1");
    assert_eq!(row.document_name, "plan.pdf");
    assert_eq!(row.document_path, "Project Files/Plans");
    assert_eq!(
        row.web_link,
        "https://acc.example/docs/doc1?x=1&viewableGuid=g123"
    );
    assert_eq!(row.issue_id, "i1");
    assert_eq!(row.issue_type, "Quality");
    assert_eq!(row.issue_sub_type, "Clash");
    assert_eq!(row.issue_status, "open");
    assert_eq!(row.issue_due_date, "2025-08-20");
    assert_eq!(row.issue_start_date, "2025-08-01");
    assert_eq!(row.issue_title, "Door clash");
    assert_eq!(row.issue_description, "Frame overlaps wall");
    assert_eq!(row.issue_comments, "First, Second");
}

#[tokio::test]
async fn test_shared_document_is_resolved_once() {
    let server = MockServer::start().await;
    mount_project(&server).await;

    Mock::given(method("GET"))
        .and(path(format!("{}/items/doc1/tip", DATA)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {
            "id": "doc1:v3",
            "type": "versions",
            "attributes": {"name": "plan.pdf", "fileType": "pdf"},
            "links": {"webView": {"href": "https://acc.example/docs/doc1"}}
        }})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/items/doc1/parent", DATA)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let issues: Vec<Value> = (1..=3)
        .map(|n| {
            json!({
                "id": format!("i{}", n),
                "issueTypeId": "t1",
                "placements": [{"lineageUrn": "doc1"}]
            })
        })
        .collect();
    mount_get(
        &server,
        ISSUES,
        json!({"results": issues, "pagination": {"totalResults": 3}}),
    )
    .await;
    for n in 1..=3 {
        mount_get(
            &server,
            &format!("{}/i{}/comments", ISSUES, n),
            json!({"results": [{"createdAt": "2025-01-01T00:00:00Z", "body": format!("note {}", n)}]}),
        )
        .await;
    }

    let client = test_client(&server, store_with_token("token"));
    let rows = client.collect_rows_for("DEV TASK 1 Project").await.unwrap();

    assert_eq!(rows.len(), 3);
    let ids: Vec<_> = rows.iter().map(|r| r.issue_id.as_str()).collect();
    assert_eq!(ids, vec!["i1", "i2", "i3"]);
    assert!(rows.iter().all(|r| r.document_path.is_empty()));
    assert_eq!(rows[2].issue_comments, "note 3");
    assert_eq!(rows[0].web_link, "https://acc.example/docs/doc1");
}

#[tokio::test]
async fn test_issues_are_read_across_offset_pages() {
    let server = MockServer::start().await;
    mount_project(&server).await;
    mount_plan_document(&server).await;

    let config = IssueReportConfig::builder()
        .base_url(server.uri())
        .client_id("client")
        .client_secret("secret")
        .redirect_uri("http://localhost:8000/auth/callback/")
        .account_id("acct")
        .issues_page_size(2)
        .backoff_base(Duration::ZERO)
        .backoff_max(Duration::ZERO)
        .build()
        .unwrap();

    for (offset, ids) in [("0", vec!["i1", "i2"]), ("2", vec!["i3"])] {
        let results: Vec<Value> = ids
            .iter()
            .map(|id| json!({"id": id, "placements": [{"lineageUrn": "doc1"}]}))
            .collect();
        Mock::given(method("GET"))
            .and(path(ISSUES))
            .and(query_param("offset", offset))
            .and(query_param("limit", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": results,
                "pagination": {"totalResults": 3}
            })))
            .expect(1)
            .mount(&server)
            .await;
    }
    for id in ["i1", "i2", "i3"] {
        mount_get(
            &server,
            &format!("{}/{}/comments", ISSUES, id),
            json!({"results": []}),
        )
        .await;
    }

    let client = IssueReportClient::new(config, store_with_token("token")).unwrap();
    let rows = client.collect_rows_for("DEV TASK 1 Project").await.unwrap();

    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.issue_comments.is_empty()));
    assert!(rows.iter().all(|r| r.issue_type.is_empty()));
}

#[tokio::test]
async fn test_unknown_project_is_not_found() {
    let server = MockServer::start().await;
    mount_project(&server).await;

    let client = test_client(&server, store_with_token("token"));
    let error = client.collect_rows_for("Missing").await.unwrap_err();

    assert_eq!(error.status_code().map(|s| s.as_u16()), Some(404));
}

#[tokio::test]
async fn test_signed_url_for_first_pdf() {
    let server = MockServer::start().await;
    mount_project(&server).await;
    mount_get(
        &server,
        &format!("{}/b.p1/topFolders", PROJECTS),
        json!({"data": [{"id": "froot", "type": "folders"}]}),
    )
    .await;
    mount_get(
        &server,
        &format!("{}/folders/froot/contents", DATA),
        json!({
            "data": [],
            "included": [
                {"type": "versions", "attributes": {"name": "readme.txt"}},
                {
                    "type": "versions",
                    "attributes": {"name": "sheet.pdf", "fileType": "pdf"},
                    "relationships": {"storage": {"data": {
                        "id": "urn:adsk.objects:os.object:wip.dm.prod/abc.pdf"
                    }}}
                }
            ]
        }),
    )
    .await;
    mount_get(
        &server,
        "/oss/v2/buckets/wip.dm.prod/objects/abc.pdf/signeds3download",
        json!({"status": "complete", "url": "https://s3.example/abc.pdf?sig=xyz"}),
    )
    .await;

    let client = test_client(&server, store_with_token("token"));
    let url = client
        .signed_url_for_first_pdf("DEV TASK 1 Project")
        .await
        .unwrap();

    assert_eq!(url, "https://s3.example/abc.pdf?sig=xyz");
}

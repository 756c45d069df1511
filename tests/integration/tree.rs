//! Folder traversal over paged contents.

use super::*;
use serde_json::json;
use wiremock::matchers::query_param;

const DATA: &str = "/data/v1/projects/b.p1";

fn version(name: &str, file_type: &str) -> Value {
    json!({"type": "versions", "attributes": {"name": name, "fileType": file_type}})
}

#[tokio::test]
async fn test_list_all_pdf_names_follows_pages_and_survives_cycles() {
    let server = MockServer::start().await;

    mount_get(
        &server,
        "/project/v1/hubs/b.acct/projects/b.p1/topFolders",
        json!({"data": [
            {"id": "froot", "type": "folders"},
            {"id": "fshared", "type": "folders"}
        ]}),
    )
    .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/folders/froot/contents", DATA)))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "fsub", "type": "folders"}],
            "included": [version("b.pdf", "pdf")]
        })))
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/folders/froot/contents", DATA)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "doc", "type": "items"}],
            "included": [version("a.pdf", "pdf"), version("readme.txt", "txt")],
            "links": {"next": {"href": format!("{}{}/folders/froot/contents?page=2", server.uri(), DATA)}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("{}/folders/fsub/contents", DATA)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "froot", "type": "folders"},
                {"id": "fshared", "type": "folders"}
            ],
            "included": [version("C.PDF", ""), version("b.pdf", "pdf")]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(format!("{}/folders/fshared/contents", DATA)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "fsub", "type": "folders"}],
            "included": [version("shared.pdf", "pdf")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server, store_with_token("token"));
    let names = client.list_all_pdf_names("b.p1").await.unwrap();

    let names: Vec<_> = names.into_iter().collect();
    assert_eq!(names, vec!["C.PDF", "a.pdf", "b.pdf", "shared.pdf"]);
}

#[tokio::test]
async fn test_folder_listing_failure_aborts_walk() {
    let server = MockServer::start().await;

    mount_get(
        &server,
        "/project/v1/hubs/b.acct/projects/b.p1/topFolders",
        json!({"data": [{"id": "froot", "type": "folders"}]}),
    )
    .await;
    mount_status(&server, &format!("{}/folders/froot/contents", DATA), 403).await;

    let client = test_client(&server, store_with_token("token"));
    let error = client.list_all_pdf_names("b.p1").await.unwrap_err();

    assert_eq!(error.status_code().map(|s| s.as_u16()), Some(403));
}

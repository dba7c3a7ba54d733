use autoreply::credentials::CredentialStore;
use autoreply::gmail_api::{AuthSession, GmailClient, MailboxApi, NoPrompt, Token};
use autoreply::Error;
use chrono::{Duration, Utc};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

// Build a client through the normal auth path with an unexpired token
async fn authenticated_client(server: &MockServer) -> (TempDir, GmailClient) {
    let dir = tempfile::tempdir().unwrap();
    let credentials = json!({
        "installed": {
            "client_id": "cid",
            "client_secret": "csecret",
            "auth_uri": format!("{}/auth", server.uri()),
            "token_uri": format!("{}/token", server.uri()),
            "redirect_uris": ["urn:ietf:wg:oauth:2.0:oob"]
        }
    });
    let token = Token {
        access_token: "test_token".to_string(),
        refresh_token: Some("refresh".to_string()),
        expiry: Some(Utc::now() + Duration::hours(1)),
        ..Token::default()
    };
    std::fs::write(dir.path().join("credentials.json"), credentials.to_string()).unwrap();
    std::fs::write(
        dir.path().join("token.json"),
        serde_json::to_string(&token).unwrap(),
    )
    .unwrap();

    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "emailAddress": "me@x.com"
        })))
        .mount(server)
        .await;

    let store = CredentialStore::new(
        dir.path().join("credentials.json"),
        dir.path().join("token.json"),
    );
    let client = AuthSession::new(store, NoPrompt)
        .with_api_base(format!("{}/gmail/v1/users/me", server.uri()))
        .authenticate()
        .await
        .unwrap();
    (dir, client)
}

#[tokio::test]
async fn test_list_labels_sends_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/labels"))
        .and(header("authorization", "Bearer test_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "labels": [
                {"id": "INBOX", "name": "INBOX", "type": "system"},
                {"id": "Label_7", "name": "Recruiters", "type": "user"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let (_dir, client) = authenticated_client(&server).await;

    let labels = client.list_labels().await.unwrap();
    assert_eq!(labels.len(), 2);
    assert_eq!(labels[1].id, "Label_7");
    assert_eq!(labels[1].name, "Recruiters");
}

#[tokio::test]
async fn test_list_labels_without_labels_field_is_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/labels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    let (_dir, client) = authenticated_client(&server).await;

    assert!(client.list_labels().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_messages_follows_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages"))
        .and(query_param("q", "is:unread"))
        .and(query_param("labelIds", "Label_7"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{"id": "M3", "threadId": "T3"}],
            "resultSizeEstimate": 1
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages"))
        .and(query_param("q", "is:unread"))
        .and(query_param("labelIds", "Label_7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                {"id": "M1", "threadId": "T1"},
                {"id": "M2", "threadId": "T2"}
            ],
            "nextPageToken": "page-2",
            "resultSizeEstimate": 3
        })))
        .expect(1)
        .mount(&server)
        .await;
    let (_dir, client) = authenticated_client(&server).await;

    let refs = client
        .list_messages("is:unread", &["Label_7".to_string()])
        .await
        .unwrap();
    let ids: Vec<&str> = refs.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["M1", "M2", "M3"]);
    assert_eq!(refs[2].thread_id, "T3");
}

#[tokio::test]
async fn test_list_messages_stops_on_repeated_page_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages"))
        .and(query_param("pageToken", "page-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{"id": "M2", "threadId": "T2"}],
            "nextPageToken": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [{"id": "M1", "threadId": "T1"}],
            "nextPageToken": "page-2"
        })))
        .expect(1)
        .mount(&server)
        .await;
    let (_dir, client) = authenticated_client(&server).await;

    let refs = client
        .list_messages("is:unread", &["Label_7".to_string()])
        .await
        .unwrap();
    let ids: Vec<&str> = refs.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["M1", "M2"]);
}

#[tokio::test]
async fn test_list_messages_with_no_matches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resultSizeEstimate": 0
        })))
        .mount(&server)
        .await;
    let (_dir, client) = authenticated_client(&server).await;

    let refs = client
        .list_messages("is:unread", &["Label_7".to_string()])
        .await
        .unwrap();
    assert!(refs.is_empty());
}

#[tokio::test]
async fn test_get_message_404_is_message_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages/M2"))
        .and(query_param("format", "full"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": {"code": 404, "message": "Requested entity was not found."}
        })))
        .mount(&server)
        .await;
    let (_dir, client) = authenticated_client(&server).await;

    let err = client.get_message("M2").await.unwrap_err();
    assert!(matches!(err, Error::MessageNotFound(id) if id == "M2"));
}

#[tokio::test]
async fn test_get_message_server_error_is_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages/M1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .mount(&server)
        .await;
    let (_dir, client) = authenticated_client(&server).await;

    match client.get_message("M1").await.unwrap_err() {
        Error::Transport { operation, detail } => {
            assert_eq!(operation, "messages.get");
            assert!(detail.contains("500"));
            assert!(detail.contains("backend error"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_send_posts_raw_and_thread_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gmail/v1/users/me/messages/send"))
        .and(body_json(json!({"raw": "RnJvbTogbWU", "threadId": "T1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "R1",
            "threadId": "T1",
            "labelIds": ["SENT"]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let (_dir, client) = authenticated_client(&server).await;

    let sent = client.send_message("RnJvbTogbWU", "T1").await.unwrap();
    assert_eq!(sent.id, "R1");
    assert_eq!(sent.thread_id, "T1");
}

#[tokio::test]
async fn test_modify_removes_unread_label() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gmail/v1/users/me/messages/M1/modify"))
        .and(body_json(json!({"removeLabelIds": ["UNREAD"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "M1"})))
        .expect(1)
        .mount(&server)
        .await;
    let (_dir, client) = authenticated_client(&server).await;

    client
        .modify_message("M1", &[], &["UNREAD".to_string()])
        .await
        .unwrap();
}

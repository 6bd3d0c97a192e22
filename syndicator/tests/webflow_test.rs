use mockito::Matcher;
use syndicator::platform::webflow::WebflowClient;
use syndicator::platform::{ContentPlatform, ImageRef, ItemFieldData, ORIGINAL_LINK_FIELD};

fn page_query(offset: &str, limit: &str) -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("offset".into(), offset.into()),
        Matcher::UrlEncoded("limit".into(), limit.into()),
    ])
}

fn field_data() -> ItemFieldData {
    ItemFieldData {
        name: "Reworded".to_string(),
        author_name: None,
        post_summary: "Summary".to_string(),
        rich_text: "<p>Summary</p>".to_string(),
        main_image: ImageRef { url: "https://img.test/1.png".to_string() },
        thumbnail_image: ImageRef { url: "https://img.test/1.png".to_string() },
        original_link: "https://blog.acme.test/posts/1".to_string(),
    }
}

#[tokio::test]
async fn test_list_items_follows_pagination() {
    let mut server = mockito::Server::new_async().await;

    let first = server
        .mock("GET", "/collections/c1/items")
        .match_query(page_query("0", "2"))
        .match_header("authorization", "Bearer wf-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{
                "items": [
                    {{"id": "a", "fieldData": {{"name": "A", "{field}": "https://blog.acme.test/posts/1"}}}},
                    {{"id": "b", "fieldData": {{"name": "B"}}}}
                ],
                "pagination": {{"limit": 2, "offset": 0, "total": 3}}
            }}"#,
            field = ORIGINAL_LINK_FIELD
        ))
        .create_async()
        .await;

    let second = server
        .mock("GET", "/collections/c1/items")
        .match_query(page_query("2", "2"))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{
                "items": [
                    {{"id": "c", "fieldData": {{"{field}": "https://blog.acme.test/posts/3"}}}}
                ],
                "pagination": {{"limit": 2, "offset": 2, "total": 3}}
            }}"#,
            field = ORIGINAL_LINK_FIELD
        ))
        .create_async()
        .await;

    let client = WebflowClient::new(server.url(), "c1", "wf-key").with_page_size(2);
    let items = client.list_items().await.expect("list items");

    let ids: Vec<_> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(items[0].original_link(), Some("https://blog.acme.test/posts/1"));
    assert_eq!(items[1].original_link(), None);
    assert_eq!(items[2].original_link(), Some("https://blog.acme.test/posts/3"));

    first.assert_async().await;
    second.assert_async().await;
}

#[tokio::test]
async fn test_list_items_without_pagination_is_single_page() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("GET", "/collections/c1/items")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"items": [{"id": "a", "fieldData": {}}]}"#)
        .expect(1)
        .create_async()
        .await;

    let client = WebflowClient::new(server.url(), "c1", "wf-key");
    let items = client.list_items().await.expect("list items");

    assert_eq!(items.len(), 1);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_list_items_error_status() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("GET", "/collections/c1/items")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"message": "Unauthorized"}"#)
        .create_async()
        .await;

    let client = WebflowClient::new(server.url(), "c1", "bad-key");
    let err = client.list_items().await.unwrap_err();

    assert!(err.to_string().contains("401"));
}

#[tokio::test]
async fn test_create_item_sends_field_data() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/collections/c1/items")
        .match_header("authorization", "Bearer wf-key")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "fieldData": {
                "name": "Reworded",
                "post-summary": "Summary",
                "rich-text": "<p>Summary</p>",
                "main-image-2": {"url": "https://img.test/1.png"},
                "thumbnail-image": {"url": "https://img.test/1.png"},
                "autopostgeneratororiginallink": "https://blog.acme.test/posts/1"
            }
        })))
        .with_status(202)
        .with_header("content-type", "application/json")
        .with_body(r#"{"id": "item-9", "isDraft": false, "fieldData": {}}"#)
        .create_async()
        .await;

    let client = WebflowClient::new(server.url(), "c1", "wf-key");
    let created = client.create_item(&field_data()).await.expect("create item");

    assert_eq!(created.id, "item-9");
    mock.assert_async().await;
}

#[tokio::test]
async fn test_create_item_failure_is_an_error() {
    let mut server = mockito::Server::new_async().await;

    let _mock = server
        .mock("POST", "/collections/c1/items")
        .with_status(400)
        .with_body(r#"{"message": "Validation Error"}"#)
        .create_async()
        .await;

    let client = WebflowClient::new(server.url(), "c1", "wf-key");
    let err = client.create_item(&field_data()).await.unwrap_err();

    assert!(err.to_string().contains("400"));
}

#[tokio::test]
async fn test_publish_items_sends_ids() {
    let mut server = mockito::Server::new_async().await;

    let mock = server
        .mock("POST", "/collections/c1/items/publish")
        .match_body(Matcher::Json(serde_json::json!({"itemIds": ["item-9"]})))
        .with_status(202)
        .with_header("content-type", "application/json")
        .with_body(r#"{"publishedItemIds": ["item-9"]}"#)
        .create_async()
        .await;

    let client = WebflowClient::new(server.url(), "c1", "wf-key");
    client
        .publish_items(&["item-9".to_string()])
        .await
        .expect("publish");

    mock.assert_async().await;
}

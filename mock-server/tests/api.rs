use std::sync::Arc;

use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use md5::{Digest, Md5};
use mock_server::{app, app_with, Directory};
use tokio::sync::RwLock;
use tower::ServiceExt;

async fn body_text(response: axum::response::Response) -> String {
    let bytes: bytes::Bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn xml_request(body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri("/xmlrpc.php")
        .header(http::header::CONTENT_TYPE, "text/xml")
        .body(body.to_string())
        .unwrap()
}

fn method_call(method: &str, params: &[&str]) -> String {
    let params: String = params
        .iter()
        .map(|p| format!("<param><value>{p}</value></param>"))
        .collect();
    format!("<?xml version=\"1.0\"?><methodCall><methodName>{method}</methodName><params>{params}</params></methodCall>")
}

fn password_digest(password: &str) -> String {
    hex::encode(Md5::digest(password.as_bytes()))
}

// --- read operations ---

#[tokio::test]
async fn feed_count_is_returned_as_string() {
    let resp = app()
        .oneshot(xml_request(&method_call("syndic8.GetFeedCount", &[])))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "text/xml");
    let body = body_text(resp).await;
    assert!(body.contains("<methodResponse>"));
    assert!(body.contains("<string>4</string>"), "{body}");
}

#[tokio::test]
async fn find_feeds_returns_sorted_ids() {
    let call = method_call(
        "syndic8.FindFeeds",
        &["<string>cooking</string>", "<string>sitename</string>", "<int>-1</int>"],
    );
    let body = body_text(app().oneshot(xml_request(&call)).await.unwrap()).await;

    let ids: Vec<&str> = body
        .match_indices("<int>")
        .map(|(i, _)| &body[i + 5..i + 6])
        .collect();
    assert_eq!(ids, vec!["3", "2", "1"]);
}

#[tokio::test]
async fn untyped_params_are_strings() {
    let call = method_call("syndic8.GetCategoryChildren", &["NIF", "Technology"]);
    let body = body_text(app().oneshot(xml_request(&call)).await.unwrap()).await;
    assert!(body.contains("<string>PDA</string>"));
    assert!(body.contains("<string>Linux</string>"));
}

// --- faults ---

#[tokio::test]
async fn unknown_method_is_a_fault_not_an_http_error() {
    let resp = app()
        .oneshot(xml_request(&method_call("syndic8.NoSuchThing", &[])))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_text(resp).await;
    assert!(body.contains("<fault>"));
    assert!(body.contains("<int>-32601</int>"));
}

#[tokio::test]
async fn malformed_body_is_a_parse_fault() {
    let resp = app().oneshot(xml_request("{\"not\": \"xml\"}")).await.unwrap();
    let body = body_text(resp).await;
    assert!(body.contains("<int>-32700</int>"));
}

#[tokio::test]
async fn account_methods_require_credentials() {
    let call = method_call("syndic8.GetSubscriptionLists", &["<nil/>", "<nil/>"]);
    let body = body_text(app().oneshot(xml_request(&call)).await.unwrap()).await;
    assert!(body.contains("<int>100</int>"));
}

#[tokio::test]
async fn wrong_route_is_404() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/RPC2")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- subscription lifecycle ---

#[tokio::test]
async fn subscription_list_lifecycle() {
    use tower::Service;

    let db = Arc::new(RwLock::new(Directory::seeded()));
    let mut app = app_with(db.clone()).into_service();
    let digest = password_digest("p455w3rd");
    let user = "<string>joebob</string>";
    let pass = format!("<string>{digest}</string>");
    let pass = pass.as_str();

    // create
    let call = method_call(
        "syndic8.CreateSubscriptionList",
        &[user, pass, "<string>Joebob's Links</string>", "<boolean>0</boolean>"],
    );
    let resp = ServiceExt::ready(&mut app).await.unwrap().call(xml_request(&call)).await.unwrap();
    assert!(body_text(resp).await.contains("<string>1</string>"));

    // subscribe to a feed by data URL
    let call = method_call(
        "syndic8.SubscribeFeed",
        &[user, pass, "<string>http://pablotron.org/rss/</string>", "<int>1</int>", "<boolean>0</boolean>"],
    );
    let resp = ServiceExt::ready(&mut app).await.unwrap().call(xml_request(&call)).await.unwrap();
    assert!(body_text(resp).await.contains("<int>1</int>"));

    // list contents
    let call = method_call("syndic8.GetSubscribed", &[user, pass, "<int>1</int>", "<nil/>"]);
    let resp = ServiceExt::ready(&mut app).await.unwrap().call(xml_request(&call)).await.unwrap();
    let body = body_text(resp).await;
    assert!(body.contains("http://pablotron.org/rss/"));

    // delete
    let call = method_call("syndic8.DeleteSubscriptionList", &[user, pass, "<int>1</int>"]);
    let resp = ServiceExt::ready(&mut app).await.unwrap().call(xml_request(&call)).await.unwrap();
    assert!(body_text(resp).await.contains("<int>1</int>"));

    // gone
    let call = method_call("syndic8.GetSubscribed", &[user, pass, "<int>1</int>", "<nil/>"]);
    let resp = ServiceExt::ready(&mut app).await.unwrap().call(xml_request(&call)).await.unwrap();
    assert!(body_text(resp).await.contains("<int>102</int>"));

    // pings are recorded on the shared directory
    let call = method_call("weblogUpdates.Ping", &["Pablotron", "http://pablotron.org/"]);
    ServiceExt::ready(&mut app).await.unwrap().call(xml_request(&call)).await.unwrap();
    assert_eq!(
        db.read().await.pings(),
        &[("Pablotron".to_string(), "http://pablotron.org/".to_string())]
    );
}

use std::sync::Arc;
use std::time::Duration;

use item_catalog_lib::models::{CreateItemPayload, IdentityProfile};
use item_catalog_lib::{
    build_router, AppState, CatalogCore, Database, FakeIdentityProvider, FieldPolicy, IdentityProvider,
    SessionManager,
};
use serde_json::Value;
use tempfile::{tempdir, TempDir};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

const COOKIE_NAME: &str = "catalog_session";

struct TestApp {
    addr: std::net::SocketAddr,
    catalog: Arc<CatalogCore>,
    identity: Arc<FakeIdentityProvider>,
    _dir: TempDir,
}

async fn spawn_app(identity: FakeIdentityProvider) -> TestApp {
    let dir = tempdir().expect("tempdir");
    let db = Database::new(&dir.path().join("catalog.sqlite")).expect("open db");
    let catalog = Arc::new(CatalogCore::new(Arc::new(db), FieldPolicy::default(), 10));
    let identity = Arc::new(identity);
    let provider: Arc<dyn IdentityProvider> = identity.clone();
    let state = AppState::new(
        catalog.clone(),
        SessionManager::new(Duration::from_secs(3600)),
        provider,
        COOKIE_NAME,
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    let app = build_router(state);
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });
    TestApp {
        addr,
        catalog,
        identity,
        _dir: dir,
    }
}

async fn send_raw(
    addr: std::net::SocketAddr,
    method: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: &str,
) -> (u16, String, String) {
    let mut stream = tokio::net::TcpStream::connect(addr)
        .await
        .expect("connect server");
    let mut req = format!("{method} {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n");
    for (k, v) in headers {
        req.push_str(&format!("{k}: {v}\r\n"));
    }
    if method != "GET" {
        req.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    req.push_str("\r\n");
    req.push_str(body);
    stream
        .write_all(req.as_bytes())
        .await
        .expect("write request");
    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    let (head, body) = response
        .split_once("\r\n\r\n")
        .expect("http response must have separator");
    let status = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse::<u16>().ok())
        .expect("http status");
    (status, head.to_string(), body.to_string())
}

fn header<'a>(head: &'a str, name: &str) -> Option<&'a str> {
    head.lines().skip(1).find_map(|line| {
        let (key, value) = line.split_once(':')?;
        key.trim().eq_ignore_ascii_case(name).then(|| value.trim())
    })
}

fn attr_value<'a>(html: &'a str, attr: &str) -> &'a str {
    let marker = format!("{attr}=\"");
    let start = html.find(&marker).expect("attribute present") + marker.len();
    let rest = &html[start..];
    &rest[..rest.find('"').expect("attribute closed")]
}

fn profile(email: &str, name: &str) -> IdentityProfile {
    IdentityProfile {
        email: email.to_string(),
        name: name.to_string(),
        picture_url: String::new(),
    }
}

/// Walks the login page and gconnect handshake; returns the `Cookie` header value.
async fn login(app: &TestApp, email: &str, name: &str) -> String {
    let (status, head, body) = send_raw(app.addr, "GET", "/login/", &[], "").await;
    assert_eq!(status, 200);
    let set_cookie = header(&head, "set-cookie").expect("session cookie issued");
    let cookie = set_cookie.split(';').next().expect("cookie pair").to_string();
    assert!(cookie.starts_with("catalog_session="));
    let state = attr_value(&body, "data-state").to_string();

    let code = format!("code-for-{email}");
    app.identity.register_code(&code, profile(email, name)).await;
    let (status, head, body) = send_raw(
        app.addr,
        "POST",
        &format!("/gconnect?state={state}"),
        &[("Cookie", cookie.as_str()), ("Content-Type", "application/octet-stream")],
        &code,
    )
    .await;
    assert_eq!(status, 200, "gconnect failed: {body}");
    let signed_in = header(&head, "set-cookie")
        .and_then(|value| value.split(';').next())
        .expect("rotated session cookie")
        .to_string();
    assert_ne!(signed_in, cookie);
    signed_in
}

async fn post_form(app: &TestApp, path: &str, cookie: Option<&str>, body: &str) -> (u16, String, String) {
    let mut headers = vec![("Content-Type", "application/x-www-form-urlencoded")];
    if let Some(cookie) = cookie {
        headers.push(("Cookie", cookie));
    }
    send_raw(app.addr, "POST", path, &headers, body).await
}

#[tokio::test]
async fn json_projection_groups_items_by_category() {
    let app = spawn_app(FakeIdentityProvider::default()).await;
    let owner = app
        .catalog
        .sign_in(&profile("owner@example.com", "Owner"))
        .expect("owner");
    for (name, category) in [("Snowboard", "Snowboarding"), ("Soccerball", "Soccer"), ("Cleats", "Soccer")] {
        app.catalog
            .create_item(
                &CreateItemPayload {
                    name: name.to_string(),
                    description: format!("{name} description"),
                    category: category.to_string(),
                },
                owner.id,
            )
            .expect("create");
    }

    let (status, _, body) = send_raw(app.addr, "GET", "/catalog/JSON/", &[], "").await;
    assert_eq!(status, 200);
    let json: Value = serde_json::from_str(&body).expect("catalog json");
    let categories = json["categories"].as_array().expect("categories");
    let names: Vec<&str> = categories.iter().filter_map(|c| c["name"].as_str()).collect();
    assert_eq!(names, vec!["Snowboarding", "Soccer"]);
    assert_eq!(categories[1]["items"].as_array().map(Vec::len), Some(2));
    let item = categories[0]["items"][0].as_object().expect("item object");
    let mut keys: Vec<&str> = item.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["category", "description", "name"]);

    let (status, _, body) = send_raw(app.addr, "GET", "/catalog/Soccer/JSON/", &[], "").await;
    assert_eq!(status, 200);
    let json: Value = serde_json::from_str(&body).expect("category json");
    assert_eq!(json["category"], "Soccer");

    let (status, _, body) = send_raw(app.addr, "GET", "/catalog/Curling/JSON/", &[], "").await;
    assert_eq!(status, 404);
    let json: Value = serde_json::from_str(&body).expect("error json");
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn anonymous_writes_redirect_to_login() {
    let app = spawn_app(FakeIdentityProvider::default()).await;
    let (status, head, _) = post_form(
        &app,
        "/catalog/create/",
        None,
        "name=Kite&description=red&category=Beach",
    )
    .await;
    assert_eq!(status, 303);
    assert_eq!(header(&head, "location"), Some("/login/"));
    assert!(app.catalog.list_categories().expect("categories").is_empty());
}

#[tokio::test]
async fn gconnect_rejects_mismatched_state() {
    let app = spawn_app(FakeIdentityProvider::default()).await;
    let (_, head, _) = send_raw(app.addr, "GET", "/login/", &[], "").await;
    let cookie = header(&head, "set-cookie")
        .and_then(|value| value.split(';').next())
        .expect("cookie")
        .to_string();
    app.identity
        .register_code("code-1", profile("mallory@example.com", "Mallory"))
        .await;

    let (status, _, _) = send_raw(
        app.addr,
        "POST",
        "/gconnect?state=forged",
        &[("Cookie", cookie.as_str())],
        "code-1",
    )
    .await;
    assert_eq!(status, 401);
    assert!(app.identity.codes.lock().await.contains_key("code-1"));
}

#[tokio::test]
async fn owner_moves_and_deletes_item_and_empty_categories_disappear() {
    let app = spawn_app(FakeIdentityProvider::default()).await;
    let cookie = login(&app, "alice@example.com", "Alice").await;

    let (status, head, _) = post_form(
        &app,
        "/catalog/create/",
        Some(cookie.as_str()),
        "name=Kite&description=red+kite&category=Beach",
    )
    .await;
    assert_eq!(status, 303);
    let location = header(&head, "location").expect("location").to_string();
    assert!(location.starts_with("/catalog/Beach/Kite/"), "unexpected redirect {location}");
    let item_id: i64 = location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .and_then(|id| id.parse().ok())
        .expect("item id");

    let (status, _, body) = send_raw(app.addr, "GET", &location, &[("Cookie", cookie.as_str())], "").await;
    assert_eq!(status, 200);
    assert!(body.contains(&format!("/catalog/Kite/{item_id}/edit/")));

    let (status, head, _) = post_form(
        &app,
        &format!("/catalog/Kite/{item_id}/edit/"),
        Some(cookie.as_str()),
        "name=Kite&description=red+kite&category=Park",
    )
    .await;
    assert_eq!(status, 303);
    assert_eq!(
        header(&head, "location"),
        Some(format!("/catalog/Park/Kite/{item_id}/").as_str())
    );
    let (status, _, _) = send_raw(app.addr, "GET", "/catalog/Beach/JSON/", &[], "").await;
    assert_eq!(status, 404);

    let (status, head, _) = post_form(&app, &format!("/catalog/Kite/{item_id}/delete/"), Some(cookie.as_str()), "").await;
    assert_eq!(status, 303);
    assert_eq!(header(&head, "location"), Some("/catalog/"));
    assert!(app.catalog.list_categories().expect("categories").is_empty());
}

#[tokio::test]
async fn non_owner_cannot_edit_or_delete() {
    let app = spawn_app(FakeIdentityProvider::default()).await;
    let alice = login(&app, "alice@example.com", "Alice").await;
    let (_, head, _) = post_form(
        &app,
        "/catalog/create/",
        Some(alice.as_str()),
        "name=Glove&description=leather&category=Baseball",
    )
    .await;
    let location = header(&head, "location").expect("location").to_string();
    let item_id = location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .expect("item id")
        .to_string();

    let bob = login(&app, "bob@example.com", "Bob").await;
    let (status, _, body) = send_raw(app.addr, "GET", &location, &[("Cookie", bob.as_str())], "").await;
    assert_eq!(status, 200);
    assert!(!body.contains("/edit/"));

    let (status, _, _) = post_form(
        &app,
        &format!("/catalog/Glove/{item_id}/edit/"),
        Some(bob.as_str()),
        "name=Stolen&description=&category=Heist",
    )
    .await;
    assert_eq!(status, 403);
    let (status, _, _) = post_form(&app, &format!("/catalog/Glove/{item_id}/delete/"), Some(bob.as_str()), "").await;
    assert_eq!(status, 403);

    let names: Vec<String> = app
        .catalog
        .list_categories()
        .expect("categories")
        .into_iter()
        .map(|category| category.name)
        .collect();
    assert_eq!(names, vec!["Baseball".to_string()]);
}

#[tokio::test]
async fn disconnect_revokes_token_and_signs_out() {
    let app = spawn_app(FakeIdentityProvider::default()).await;
    let cookie = login(&app, "alice@example.com", "Alice").await;

    let (status, head, _) = send_raw(app.addr, "GET", "/gdisconnect", &[("Cookie", cookie.as_str())], "").await;
    assert_eq!(status, 303);
    assert_eq!(header(&head, "location"), Some("/catalog/"));
    assert_eq!(app.identity.revoked.lock().await.len(), 1);
    let fresh = header(&head, "set-cookie")
        .and_then(|value| value.split(';').next())
        .expect("fresh session cookie")
        .to_string();
    assert_ne!(fresh, cookie);
    let (status, _, body) = send_raw(app.addr, "GET", "/catalog/", &[("Cookie", fresh.as_str())], "").await;
    assert_eq!(status, 200);
    assert!(body.contains("Successfully disconnected."));
    assert!(body.contains("href=\"/login/\""));

    let (status, head, _) = post_form(
        &app,
        "/catalog/create/",
        Some(cookie.as_str()),
        "name=Kite&description=&category=Beach",
    )
    .await;
    assert_eq!(status, 303);
    assert_eq!(header(&head, "location"), Some("/login/"));

    let (status, _, _) = send_raw(app.addr, "GET", "/gdisconnect", &[("Cookie", cookie.as_str())], "").await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn failed_revocation_still_signs_out_locally() {
    let app = spawn_app(FakeIdentityProvider::with_failing_revoke()).await;
    let cookie = login(&app, "alice@example.com", "Alice").await;

    let (status, _, body) = send_raw(app.addr, "GET", "/gdisconnect", &[("Cookie", cookie.as_str())], "").await;
    assert_eq!(status, 400);
    assert!(body.contains("signed out locally"));

    let (status, head, _) = send_raw(app.addr, "GET", "/catalog/create/", &[("Cookie", cookie.as_str())], "").await;
    assert_eq!(status, 303);
    assert_eq!(header(&head, "location"), Some("/login/"));
}

#[tokio::test]
async fn invalid_form_flashes_and_returns_to_form() {
    let app = spawn_app(FakeIdentityProvider::default()).await;
    let cookie = login(&app, "alice@example.com", "Alice").await;

    let (status, head, _) = post_form(
        &app,
        "/catalog/create/",
        Some(cookie.as_str()),
        "name=&description=nameless&category=Beach",
    )
    .await;
    assert_eq!(status, 303);
    assert_eq!(header(&head, "location"), Some("/catalog/create/"));
    assert!(app.catalog.list_categories().expect("categories").is_empty());

    let (status, _, body) = send_raw(app.addr, "GET", "/catalog/create/", &[("Cookie", cookie.as_str())], "").await;
    assert_eq!(status, 200);
    assert!(body.contains("class=\"flashes\""));
}

#[tokio::test]
async fn sign_in_rotates_the_session_token() {
    let app = spawn_app(FakeIdentityProvider::default()).await;
    let (_, head, body) = send_raw(app.addr, "GET", "/login/", &[], "").await;
    let anonymous = header(&head, "set-cookie")
        .and_then(|value| value.split(';').next())
        .expect("cookie")
        .to_string();
    let state = attr_value(&body, "data-state").to_string();
    app.identity
        .register_code("code-2", profile("alice@example.com", "Alice"))
        .await;

    let (status, head, _) = send_raw(
        app.addr,
        "POST",
        &format!("/gconnect?state={state}"),
        &[("Cookie", anonymous.as_str())],
        "code-2",
    )
    .await;
    assert_eq!(status, 200);
    let signed_in = header(&head, "set-cookie")
        .and_then(|value| value.split(';').next())
        .expect("rotated cookie")
        .to_string();
    assert_ne!(signed_in, anonymous);

    let (status, head, _) = send_raw(app.addr, "GET", "/catalog/create/", &[("Cookie", anonymous.as_str())], "").await;
    assert_eq!(status, 303);
    assert_eq!(header(&head, "location"), Some("/login/"));
    let (status, _, _) = send_raw(app.addr, "GET", "/catalog/create/", &[("Cookie", signed_in.as_str())], "").await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn reserved_category_names_are_rejected() {
    let app = spawn_app(FakeIdentityProvider::default()).await;
    let cookie = login(&app, "alice@example.com", "Alice").await;

    for category in ["JSON", "create"] {
        let (status, head, _) = post_form(
            &app,
            "/catalog/create/",
            Some(cookie.as_str()),
            &format!("name=Thing&description=&category={category}"),
        )
        .await;
        assert_eq!(status, 303);
        assert_eq!(header(&head, "location"), Some("/catalog/create/"));
    }
    assert!(app.catalog.list_categories().expect("categories").is_empty());

    let (status, _, body) = send_raw(app.addr, "GET", "/catalog/create/", &[("Cookie", cookie.as_str())], "").await;
    assert_eq!(status, 200);
    assert!(body.contains("reserved"));
}

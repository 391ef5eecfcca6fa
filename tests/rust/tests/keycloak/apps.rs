//! App ("client") API tests

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tests::fixtures::group_json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use krs_keycloak::{AppAccess, KeycloakError, NewApp};

use super::common::{admin, setup};

fn client_json(id: &str, client_id: &str, app: bool) -> Value {
    let attributes = if app {
        json!({"app": "app"})
    } else {
        json!({})
    };
    json!({
        "id": id,
        "clientId": client_id,
        "rootUrl": format!("https://{client_id}.example.com"),
        "optionalClientScopes": [],
        "attributes": attributes,
    })
}

/// `myapp` with roles `read` and `write`
async fn mount_myapp(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(admin("clients")))
        .and(query_param("clientId", "myapp"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([client_json("c-myapp", "myapp", true)])),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(admin("clients/c-myapp/client-secret")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"type": "secret", "value": "hunter2"})),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(admin("clients/c-myapp/roles")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "r-read", "name": "read"},
            {"id": "r-write", "name": "write"},
        ])))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_list_apps_skips_plain_clients() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path(admin("clients")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            client_json("c-1", "myapp", true),
            client_json("c-2", "account", false),
        ])))
        .mount(&server)
        .await;

    let apps = client.list_apps().await.unwrap();

    assert_eq!(apps.keys().cloned().collect::<Vec<_>>(), vec!["myapp"]);
}

#[tokio::test]
async fn test_app_info_includes_secret_and_roles() {
    let (server, client) = setup().await;
    mount_myapp(&server).await;

    let details = client.app_info("myapp").await.unwrap();

    assert_eq!(details.app.id, "c-myapp");
    assert_eq!(details.client_secret, "hunter2");
    assert_eq!(details.roles, vec!["read", "write"]);
}

#[tokio::test]
async fn test_unknown_app_is_not_found() {
    let (server, client) = setup().await;
    Mock::given(method("GET"))
        .and(path(admin("clients")))
        .and(query_param("clientId", "ghost"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let err = client.app_info("ghost").await.unwrap_err();

    assert!(matches!(err, KeycloakError::NotFound { kind: "app", .. }));
}

#[tokio::test]
async fn test_create_existing_app_is_noop() {
    let (server, client) = setup().await;
    mount_myapp(&server).await;

    // No POST is mounted; a create attempt would fail with 404
    let created = client
        .create_app(&NewApp::new("myapp", "https://myapp.example.com").with_access(AppAccess::None))
        .await
        .unwrap();

    assert!(!created);
}

#[tokio::test]
async fn test_create_app_validates_before_any_request() {
    let (_server, client) = setup().await;

    let err = client
        .create_app(&NewApp::new("", "https://myapp.example.com"))
        .await
        .unwrap_err();

    assert!(matches!(err, KeycloakError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_add_role_mapping() {
    let (server, client) = setup().await;
    mount_myapp(&server).await;
    Mock::given(method("GET"))
        .and(path(admin("group-by-path/inst/fooU")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(group_json("g-foo", "/inst/fooU", vec![])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(admin("groups/g-foo/role-mappings/clients/c-myapp")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(admin("groups/g-foo/role-mappings/clients/c-myapp")))
        .and(body_json(json!([{"id": "r-write", "name": "write"}])))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let added = client
        .add_app_role_mapping("myapp", "write", "/inst/fooU")
        .await
        .unwrap();

    assert!(added);
}

#[tokio::test]
async fn test_existing_role_mapping_is_noop() {
    let (server, client) = setup().await;
    mount_myapp(&server).await;
    Mock::given(method("GET"))
        .and(path(admin("group-by-path/inst/fooU")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(group_json("g-foo", "/inst/fooU", vec![])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(admin("groups/g-foo/role-mappings/clients/c-myapp")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "r-read", "name": "read"}])),
        )
        .mount(&server)
        .await;

    let added = client
        .add_app_role_mapping("myapp", "read", "/inst/fooU")
        .await
        .unwrap();

    assert!(!added);
}

#[tokio::test]
async fn test_role_mapping_for_unknown_role_rejected() {
    let (server, client) = setup().await;
    mount_myapp(&server).await;

    let err = client
        .add_app_role_mapping("myapp", "admin", "/inst/fooU")
        .await
        .unwrap_err();

    assert!(matches!(err, KeycloakError::NotFound { kind: "role", .. }));
}

#[tokio::test]
async fn test_get_role_mappings_groups_by_role() {
    let (server, client) = setup().await;
    mount_myapp(&server).await;
    Mock::given(method("GET"))
        .and(path(admin("groups")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            group_json("g-inst", "/inst", vec![group_json("g-foo", "/inst/fooU", vec![])]),
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(admin("groups/g-inst/role-mappings/clients/c-myapp")))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"id": "r-read", "name": "read"}])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(admin("groups/g-foo/role-mappings/clients/c-myapp")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "r-read", "name": "read"},
            {"id": "r-write", "name": "write"},
        ])))
        .mount(&server)
        .await;

    let mappings = client.get_app_role_mappings("myapp", None).await.unwrap();

    assert_eq!(mappings["read"], vec!["/inst", "/inst/fooU"]);
    assert_eq!(mappings["write"], vec!["/inst/fooU"]);

    let only_write = client
        .get_app_role_mappings("myapp", Some("write"))
        .await
        .unwrap();
    assert_eq!(only_write.keys().cloned().collect::<Vec<_>>(), vec!["write"]);
}

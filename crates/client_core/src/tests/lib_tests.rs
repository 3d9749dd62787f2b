use super::*;
use std::sync::Mutex;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::{TimeZone, Utc};
use shared::domain::{BookedRoom, BookingId, BookingStatus, Role, RoomId};
use tokio::net::TcpListener;

async fn spawn_server(app: Router) -> String {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{addr}")
}

fn client_for(server_url: &str) -> (HttpApiClient, Arc<MemorySessionStore>) {
    let store = Arc::new(MemorySessionStore::default());
    let client = HttpApiClient::new(server_url, Arc::clone(&store) as Arc<dyn SessionStore>)
        .expect("valid server url");
    (client, store)
}

fn admin_viewer() -> CurrentUser {
    CurrentUser {
        user_id: UserId(1),
        username: "admin".to_string(),
        role: Role::Admin,
    }
}

fn guest_viewer() -> CurrentUser {
    CurrentUser {
        user_id: UserId(7),
        username: "alice".to_string(),
        role: Role::User,
    }
}

fn sample_rooms() -> Vec<Room> {
    vec![
        Room {
            id: RoomId(1),
            room_number: "101".to_string(),
            room_type: "STANDARD".to_string(),
            price: 90.0,
            available: true,
        },
        Room {
            id: RoomId(2),
            room_number: "102".to_string(),
            room_type: "DELUXE".to_string(),
            price: 150.0,
            available: false,
        },
    ]
}

fn sample_bookings() -> Vec<Booking> {
    vec![Booking {
        id: BookingId(11),
        room: Some(BookedRoom {
            id: Some(RoomId(2)),
            room_number: Some("102".to_string()),
            room_type: Some("DELUXE".to_string()),
            price: Some(150.0),
        }),
        user: None,
        check_in_date: Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
        check_out_date: Utc.with_ymd_and_hms(2024, 2, 4, 0, 0, 0).unwrap(),
        status: BookingStatus::Completed,
    }]
}

async fn handle_login(Json(credentials): Json<Credentials>) -> Json<AuthSession> {
    Json(AuthSession {
        token: "service-token".to_string(),
        user_id: UserId(7),
        username: credentials.username,
        role: Role::Admin,
    })
}

#[tokio::test]
async fn login_persists_token_and_current_user() {
    let server_url = spawn_server(Router::new().route("/auth/login", post(handle_login))).await;
    let (client, store) = client_for(&server_url);

    let session = client
        .login(&Credentials {
            username: "alice".to_string(),
            password: "secret".to_string(),
        })
        .await
        .expect("login");

    assert_eq!(session.token, "service-token");
    assert_eq!(store.token().as_deref(), Some("service-token"));
    let user = store.current_user().expect("stored user");
    assert_eq!(user.user_id, UserId(7));
    assert_eq!(user.username, "alice");
    assert!(user.is_privileged());
}

#[tokio::test]
async fn login_failure_surfaces_the_service_message() {
    let app = Router::new().route(
        "/auth/login",
        post(|| async {
            (
                StatusCode::UNAUTHORIZED,
                Json(serde_json::json!({ "error": "Invalid credentials" })),
            )
        }),
    );
    let server_url = spawn_server(app).await;
    let (client, store) = client_for(&server_url);

    let err = client
        .login(&Credentials {
            username: "alice".to_string(),
            password: "nope".to_string(),
        })
        .await
        .expect_err("login should fail");

    assert_eq!(err.to_string(), "Invalid credentials");
    assert_eq!(err.http_status(), Some(401));
    assert_eq!(store.token(), None);
    assert_eq!(store.current_user(), None);
}

#[tokio::test]
async fn non_json_failure_falls_back_to_the_http_status() {
    let app = Router::new().route(
        "/rooms",
        get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let server_url = spawn_server(app).await;
    let (client, _store) = client_for(&server_url);

    let err = client.get_rooms().await.expect_err("should fail");

    assert_eq!(err.to_string(), "HTTP 500");
    assert_eq!(err.http_status(), Some(500));
}

#[derive(Clone, Default)]
struct CapturedAuth {
    header: Arc<Mutex<Option<String>>>,
}

async fn rooms_recording_auth(
    State(captured): State<CapturedAuth>,
    headers: HeaderMap,
) -> Json<Vec<Room>> {
    let auth = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    *captured.header.lock().expect("capture lock") = auth;
    Json(sample_rooms())
}

#[tokio::test]
async fn authenticated_reads_carry_the_stored_bearer_token() {
    let captured = CapturedAuth::default();
    let app = Router::new()
        .route("/rooms", get(rooms_recording_auth))
        .with_state(captured.clone());
    let server_url = spawn_server(app).await;
    let (client, store) = client_for(&server_url);

    store.store_token("secret-token");
    let rooms = client.get_rooms().await.expect("rooms");

    assert_eq!(rooms.len(), 2);
    assert_eq!(
        captured.header.lock().expect("capture lock").as_deref(),
        Some("Bearer secret-token")
    );
}

#[tokio::test]
async fn register_posts_the_full_registration_payload() {
    let app = Router::new().route(
        "/auth/register",
        post(|Json(registration): Json<RegistrationRequest>| async move {
            assert_eq!(registration.username, "bob");
            assert_eq!(registration.email, "bob@example.com");
            assert_eq!(registration.confirm_password, registration.password);
            assert_eq!(registration.role, Role::User);
            Json(serde_json::json!({ "message": "Registration successful" }))
        }),
    );
    let server_url = spawn_server(app).await;
    let (client, _store) = client_for(&server_url);

    client
        .register(&RegistrationRequest {
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            password: "secret99".to_string(),
            confirm_password: "secret99".to_string(),
            role: Role::User,
        })
        .await
        .expect("register");
}

#[tokio::test]
async fn loader_joins_rooms_and_bookings_for_privileged_viewers() {
    let app = Router::new()
        .route("/rooms", get(|| async { Json(sample_rooms()) }))
        .route("/bookings", get(|| async { Json(sample_bookings()) }));
    let server_url = spawn_server(app).await;
    let (client, _store) = client_for(&server_url);

    let loader = DashboardLoader::new(Arc::new(client));
    let stats = loader.load(&admin_viewer()).await.expect("load");

    assert!(stats.privileged);
    assert_eq!(stats.total_rooms, 2);
    assert_eq!(stats.available_rooms, 1);
    assert_eq!(stats.occupancy_rate, 50.0);
    assert_eq!(stats.total_bookings, 1);
    // 3 nights at 150.
    assert_eq!(stats.total_revenue, 450.0);
}

#[tokio::test]
async fn loader_scopes_bookings_to_unprivileged_viewers() {
    let requested_user = Arc::new(Mutex::new(None::<i64>));
    let recorded = Arc::clone(&requested_user);
    let app = Router::new()
        .route("/rooms", get(|| async { Json(sample_rooms()) }))
        .route(
            "/bookings/user/:user_id",
            get(move |Path(user_id): Path<i64>| {
                let recorded = Arc::clone(&recorded);
                async move {
                    *recorded.lock().expect("capture lock") = Some(user_id);
                    Json(Vec::<Booking>::new())
                }
            }),
        );
    let server_url = spawn_server(app).await;
    let (client, _store) = client_for(&server_url);

    let loader = DashboardLoader::new(Arc::new(client));
    let stats = loader.load(&guest_viewer()).await.expect("load");

    assert!(!stats.privileged);
    assert_eq!(*requested_user.lock().expect("capture lock"), Some(7));
}

#[tokio::test]
async fn loader_fails_wholesale_when_either_read_fails() {
    let app = Router::new()
        .route("/rooms", get(|| async { Json(sample_rooms()) }))
        .route(
            "/bookings",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "error": "bookings unavailable" })),
                )
            }),
        );
    let server_url = spawn_server(app).await;
    let (client, _store) = client_for(&server_url);

    let loader = DashboardLoader::new(Arc::new(client));
    let err = loader.load(&admin_viewer()).await.expect_err("should fail");

    assert_eq!(err.to_string(), "bookings unavailable");
    assert_eq!(err.http_status(), Some(500));
}

#[tokio::test]
async fn malformed_booking_records_still_aggregate() {
    let app = Router::new()
        .route("/rooms", get(|| async { Json(sample_rooms()) }))
        .route(
            "/bookings",
            get(|| async {
                Json(serde_json::json!([{
                    "id": 3,
                    "checkInDate": "2024-02-01T00:00:00Z",
                    "checkOutDate": "2024-02-03T00:00:00Z",
                    "status": "COMPLETED",
                }]))
            }),
        );
    let server_url = spawn_server(app).await;
    let (client, _store) = client_for(&server_url);

    let loader = DashboardLoader::new(Arc::new(client));
    let stats = loader.load(&admin_viewer()).await.expect("load");

    assert_eq!(stats.total_bookings, 1);
    assert_eq!(stats.total_revenue, 0.0);
    assert!(!stats.anomalies.is_empty());
    assert_eq!(stats.recent_activity[0].room_label(), "#");
}

#[tokio::test]
async fn missing_api_client_reports_the_service_unavailable() {
    let err = MissingApiClient
        .login(&Credentials {
            username: "alice".to_string(),
            password: "pass".to_string(),
        })
        .await
        .expect_err("should be unavailable");

    assert!(matches!(err, RequestError::Transport(_)));
}

#[test]
fn rejects_an_unparseable_server_url() {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::default());
    let err = HttpApiClient::new("not a url", store).expect_err("should reject");
    assert!(matches!(err, RequestError::InvalidBaseUrl(_)));
}

#[test]
fn session_store_clear_drops_token_and_user() {
    let store = MemorySessionStore::default();
    store.store_token("tok");
    store.store_current_user(&guest_viewer());
    assert!(store.token().is_some());

    store.clear();

    assert_eq!(store.token(), None);
    assert_eq!(store.current_user(), None);
}

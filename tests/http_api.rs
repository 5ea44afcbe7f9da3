use clubdesk::models::{Action, LoggedResource};
use clubdesk::services::component_service::NewComponent;
use clubdesk::services::schedule_service::NewSchedule;
use clubdesk::services::user_service::{self, NewUser, ProfileUpdate};
use clubdesk::{build_app, new_store, AppConfig, AppState, ClientError, ClubClient};
use chrono::Utc;

const CONFIG: &str = r#"{
    "port": 0,
    "log_level": "info",
    "snapshot_path": "unused.json",
    "snapshot_interval": 60,
    "server_version": "9.9.9",
    "admin_username": "admin",
    "admin_password": "admin-pw"
}"#;

async fn spawn_server() -> String {
    let cfg = AppConfig::from_json(CONFIG).expect("config");
    let store = new_store();
    user_service::bootstrap_admin(&store, &cfg.admin_username, &cfg.admin_password)
        .expect("bootstrap admin");

    let app = build_app(AppState::new(store, Some(3600)), cfg);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move { axum::serve(listener, app).await.expect("serve app") });

    format!("http://{addr}")
}

async fn admin(base: &str) -> ClubClient {
    let mut client = ClubClient::new(base);
    client.login("admin", "admin-pw").await.expect("admin login");
    client
}

async fn member(base: &str, admin: &ClubClient, username: &str) -> ClubClient {
    admin
        .create_user(&NewUser {
            username: username.into(),
            password: format!("{username}-pw"),
            name: Some(username.to_uppercase()),
            ..NewUser::default()
        })
        .await
        .expect("create member");

    let mut client = ClubClient::new(base);
    client
        .login(username, &format!("{username}-pw"))
        .await
        .expect("member login");
    client
}

#[tokio::test]
async fn requests_without_valid_token_are_unauthenticated() {
    let base = spawn_server().await;

    let anon = ClubClient::new(&base);
    assert!(matches!(anon.me().await, Err(ClientError::Unauthenticated)));

    let forged = ClubClient::new(&base).with_token("deadbeef");
    assert!(matches!(forged.key_state().await, Err(ClientError::Unauthenticated)));

    let mut wrong = ClubClient::new(&base);
    assert!(matches!(
        wrong.login("admin", "nope").await,
        Err(ClientError::Unauthenticated)
    ));

    let mut admin = admin(&base).await;
    let me = admin.me().await.expect("me");
    assert!(me.is_admin());

    admin.logout().await.expect("logout");
    assert!(matches!(admin.me().await, Err(ClientError::Unauthenticated)));
}

#[tokio::test]
async fn key_register_take_block_release() {
    let base = spawn_server().await;
    let admin = admin(&base).await;
    let alice = member(&base, &admin, "alice").await;
    let bob = member(&base, &admin, "bob").await;

    let state = alice.toggle_key().await.expect("alice takes key");
    assert!(state.is_in_use && state.held_by_me);
    assert!(state.taken_at.is_some());

    let err = bob.toggle_key().await.expect_err("bob is blocked");
    assert_eq!(err.conflict_code(), Some("key_held"));

    let seen_by_bob = bob.key_state().await.expect("state");
    assert!(seen_by_bob.is_in_use);
    assert!(!seen_by_bob.held_by_me);
    assert_eq!(seen_by_bob.current_holder.as_deref(), Some("ALICE"));

    let state = alice.toggle_key().await.expect("alice returns key");
    assert!(!state.is_in_use);
    assert!(state.current_holder_id.is_none());
    assert!(state.taken_at.is_none());

    let history = admin.key_history().await.expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].action, Action::Returned);

    assert!(matches!(bob.key_history().await, Err(ClientError::Forbidden(_))));
}

#[tokio::test]
async fn concurrent_key_takers_get_exactly_one_winner() {
    let base = spawn_server().await;
    let admin = admin(&base).await;

    let mut clients = Vec::new();
    for i in 0..6 {
        clients.push(member(&base, &admin, &format!("racer{i}")).await);
    }

    let handles: Vec<_> = clients
        .into_iter()
        .map(|c| tokio::spawn(async move { c.toggle_key().await }))
        .collect();

    let mut winners = 0;
    for h in handles {
        match h.await.expect("join") {
            Ok(state) => {
                assert!(state.held_by_me);
                winners += 1;
            }
            Err(e) => assert_eq!(e.conflict_code(), Some("key_held")),
        }
    }
    assert_eq!(winners, 1);
}

#[tokio::test]
async fn component_checkout_scenario() {
    let base = spawn_server().await;
    let admin = admin(&base).await;
    let alice = member(&base, &admin, "alice").await;
    let bob = member(&base, &admin, "bob").await;

    let c = admin
        .create_component(&NewComponent {
            name: "ESP32".into(),
            description: Some("dev board".into()),
            image: None,
            quantity: 5,
        })
        .await
        .expect("create component");

    let v = alice.use_component(&c.id, 3).await.expect("alice uses 3");
    assert_eq!((v.component.in_use, v.available, v.held_by_me), (3, 2, 3));

    let err = bob.use_component(&c.id, 3).await.expect_err("only 2 left");
    assert_eq!(err.conflict_code(), Some("insufficient_stock"));

    let v = bob.use_component(&c.id, 2).await.expect("bob uses 2");
    assert_eq!((v.component.in_use, v.available), (5, 0));

    let r = alice.return_component(&c.id).await.expect("alice returns");
    assert_eq!(r.returned, 3);
    assert_eq!(r.component.component.in_use, 2);

    let again = alice.return_component(&c.id).await.expect_err("nothing left");
    assert_eq!(again.conflict_code(), Some("nothing_to_return"));

    let bobs = bob.my_holdings().await.expect("holdings");
    assert_eq!(bobs.len(), 1);
    assert_eq!(bobs[0].quantity, 2);

    let listed = bob.list_components().await.expect("list");
    assert_eq!(listed[0].held_by_me, 2);
    assert_eq!(listed[0].available, 3);

    let log = admin.usage_log().await.expect("usage log");
    assert_eq!(log.len(), 3);
    assert_eq!(log[0].action, Action::Returned);
    assert_eq!(log[0].quantity, 3);
    assert!(matches!(alice.usage_log().await, Err(ClientError::Forbidden(_))));
}

#[tokio::test]
async fn invalid_requests_leave_state_untouched() {
    let base = spawn_server().await;
    let admin = admin(&base).await;
    let alice = member(&base, &admin, "alice").await;

    let c = admin
        .create_component(&NewComponent {
            name: "Relay".into(),
            description: None,
            image: None,
            quantity: 2,
        })
        .await
        .expect("create component");

    assert!(matches!(
        alice.use_component(&c.id, 0).await,
        Err(ClientError::Rejected { status: 400, .. })
    ));
    assert!(matches!(
        alice.use_component("no-such-id", 1).await,
        Err(ClientError::NotFound(_))
    ));
    assert!(matches!(
        alice
            .create_component(&NewComponent {
                name: "Sneaky".into(),
                description: None,
                image: None,
                quantity: 1,
            })
            .await,
        Err(ClientError::Forbidden(_))
    ));

    let listed = alice.list_components().await.expect("list");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].component.in_use, 0);
    assert!(admin.usage_log().await.expect("log").is_empty());
}

#[tokio::test]
async fn presence_and_schedule_flow() {
    let base = spawn_server().await;
    let admin = admin(&base).await;
    let alice = member(&base, &admin, "alice").await;
    let bob = member(&base, &admin, "bob").await;

    let p = alice.toggle_presence().await.expect("arrive");
    assert!(p.is_present);
    let present = bob.present_members().await.expect("members");
    assert_eq!(present.len(), 1);
    assert_eq!(present[0].username, "alice");
    assert!(!bob.my_presence().await.expect("bob presence").is_present);

    let alice_id = alice.me().await.expect("me").id;
    let item = admin
        .create_schedule(&NewSchedule {
            date: Utc::now(),
            task: "Restock resistors".into(),
            assigned_to: vec![alice_id],
        })
        .await
        .expect("create schedule");

    assert!(matches!(
        bob.complete_schedule(&item.id).await,
        Err(ClientError::Forbidden(_))
    ));
    assert!(bob.list_schedule(true).await.expect("bob's").is_empty());

    let done = alice.complete_schedule(&item.id).await.expect("complete");
    assert!(done.completed);

    let mine = alice.list_schedule(true).await.expect("alice's");
    assert_eq!(mine.len(), 1);
    assert!(mine[0].completed);

    let history = admin.presence_history().await.expect("presence history");
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn admin_manages_users() {
    let base = spawn_server().await;
    let admin = admin(&base).await;
    let bob = member(&base, &admin, "bob").await;

    let updated = bob
        .update_me(&ProfileUpdate {
            department: Some("EE".into()),
            ..ProfileUpdate::default()
        })
        .await
        .expect("update profile");
    assert_eq!(updated.department.as_deref(), Some("EE"));

    let dup = admin
        .create_user(&NewUser {
            username: "bob".into(),
            password: "x".into(),
            ..NewUser::default()
        })
        .await
        .expect_err("duplicate");
    assert_eq!(dup.conflict_code(), Some("conflict"));

    assert!(matches!(bob.list_users().await, Err(ClientError::Forbidden(_))));
    assert_eq!(admin.list_users().await.expect("users").len(), 2);

    admin.delete_user(&updated.id).await.expect("delete bob");
    assert!(matches!(bob.me().await, Err(ClientError::Unauthenticated)));
}

#[tokio::test]
async fn collection_routes_accept_both_slash_forms() {
    let base = spawn_server().await;
    let admin = admin(&base).await;
    let token = admin.token().expect("token").to_string();

    let http = reqwest::Client::new();
    for path in ["/users", "/users/", "/components", "/components/", "/schedule", "/schedule/"] {
        let status = http
            .get(format!("{base}{path}"))
            .bearer_auth(&token)
            .send()
            .await
            .expect("send")
            .status();
        assert_eq!(status.as_u16(), 200, "GET {path}");
    }

    let version: serde_json::Value = http
        .get(format!("{base}/system/version"))
        .send()
        .await
        .expect("send")
        .json()
        .await
        .expect("json");
    assert_eq!(version["version"], "9.9.9");
}

#[tokio::test]
async fn full_usage_trail_merges_key_and_components() {
    let base = spawn_server().await;
    let admin = admin(&base).await;
    let alice = member(&base, &admin, "alice").await;

    let c = admin
        .create_component(&NewComponent {
            name: "Multimeter".into(),
            description: None,
            image: None,
            quantity: 1,
        })
        .await
        .expect("create component");

    alice.toggle_key().await.expect("take key");
    alice.use_component(&c.id, 1).await.expect("use");
    alice.toggle_key().await.expect("return key");

    let trail = admin.full_usage_log().await.expect("full log");
    assert_eq!(trail.len(), 3);
    assert_eq!(trail[0].resource, LoggedResource::LabKey);
    assert_eq!(trail[0].action, Action::Returned);
    assert!(matches!(trail[1].resource, LoggedResource::Component { .. }));
    assert_eq!(trail[2].action, Action::Taken);

    assert!(matches!(
        alice.full_usage_log().await,
        Err(ClientError::Forbidden(_))
    ));
}

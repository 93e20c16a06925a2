use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use userdir_lib::{
    ApiConfig, ApiError, ConfirmationGate, FormController, GateState, Gender, HttpClient,
    ListStore, Profile, ProfileDraft, ProfileId, Refresh, Resource, StoreError, Submission,
    User, UserDraft, UserId, UserSummary,
};

#[derive(Default)]
struct Backend {
    users: Vec<User>,
    profiles: Vec<Profile>,
    next_user: u64,
    next_profile: u64,
    requests: usize,
    fail_with: Option<StatusCode>,
    // Answer a missing profile with 200 and a `null` body.
    null_for_missing_profile: bool,
    // PATCH /users answers with the row alone, no embedded profile.
    bare_user_rows: bool,
}

type Db = Arc<Mutex<Backend>>;
type Reply<T> = Result<Json<T>, (StatusCode, Json<Value>)>;

fn reject(status: StatusCode) -> (StatusCode, Json<Value>) {
    (
        status,
        Json(json!({ "message": status.canonical_reason().unwrap_or("error") })),
    )
}

impl Backend {
    fn seeded(ids: &[u64]) -> Self {
        let users = ids
            .iter()
            .map(|&id| User {
                id: UserId(id),
                username: format!("user_{}", (b'a' + id as u8) as char),
                phone: format!("90000000{:02}", id),
                profile: None,
            })
            .collect();
        Self {
            users,
            next_user: ids.iter().max().copied().unwrap_or(0) + 1,
            next_profile: 1,
            ..Default::default()
        }
    }

    fn enter(&mut self) -> Result<(), (StatusCode, Json<Value>)> {
        self.requests += 1;
        match self.fail_with.take() {
            Some(status) => Err(reject(status)),
            None => Ok(()),
        }
    }

    fn view(&self, user: &User) -> User {
        let mut user = user.clone();
        user.profile = self
            .profiles
            .iter()
            .find(|p| p.user_id == user.id)
            .cloned();
        user
    }

    fn username_taken(&self, username: &str, except: Option<UserId>) -> bool {
        self.users
            .iter()
            .any(|u| u.username == username && Some(u.id) != except)
    }
}

fn taken() -> (StatusCode, Json<Value>) {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({ "errors": { "username": ["Username already taken"] } })),
    )
}

async fn list_users(State(db): State<Db>) -> Reply<Vec<User>> {
    let mut db = db.lock();
    db.enter()?;
    Ok(Json(db.users.iter().map(|u| db.view(u)).collect()))
}

async fn create_user(State(db): State<Db>, Json(draft): Json<UserDraft>) -> Reply<User> {
    let mut db = db.lock();
    db.enter()?;
    if db.username_taken(&draft.username, None) {
        return Err(taken());
    }
    let user = User {
        id: UserId(db.next_user),
        username: draft.username,
        phone: draft.phone,
        profile: None,
    };
    db.next_user += 1;
    db.users.push(user.clone());
    Ok(Json(user))
}

async fn get_user(State(db): State<Db>, Path(id): Path<u64>) -> Reply<User> {
    let mut db = db.lock();
    db.enter()?;
    let user = db
        .users
        .iter()
        .find(|u| u.id == UserId(id))
        .ok_or_else(|| reject(StatusCode::NOT_FOUND))?;
    Ok(Json(db.view(user)))
}

async fn update_user(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(draft): Json<UserDraft>,
) -> Reply<User> {
    let mut db = db.lock();
    db.enter()?;
    if db.username_taken(&draft.username, Some(UserId(id))) {
        return Err(taken());
    }
    let user = db
        .users
        .iter_mut()
        .find(|u| u.id == UserId(id))
        .ok_or_else(|| reject(StatusCode::NOT_FOUND))?;
    user.username = draft.username;
    user.phone = draft.phone;
    let user = user.clone();
    if db.bare_user_rows {
        return Ok(Json(user));
    }
    Ok(Json(db.view(&user)))
}

async fn delete_user(State(db): State<Db>, Path(id): Path<u64>) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let mut db = db.lock();
    db.enter()?;
    let before = db.users.len();
    db.users.retain(|u| u.id != UserId(id));
    if db.users.len() == before {
        return Err(reject(StatusCode::NOT_FOUND));
    }
    db.profiles.retain(|p| p.user_id != UserId(id));
    Ok(StatusCode::NO_CONTENT)
}

async fn list_profiles(State(db): State<Db>) -> Reply<Vec<Profile>> {
    let mut db = db.lock();
    db.enter()?;
    Ok(Json(db.profiles.clone()))
}

async fn create_profile(State(db): State<Db>, Json(draft): Json<ProfileDraft>) -> Reply<Profile> {
    let mut db = db.lock();
    db.enter()?;
    let user_id = draft
        .user_id()
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST))?;
    if !db.users.iter().any(|u| u.id == user_id) {
        return Err(reject(StatusCode::NOT_FOUND));
    }
    if db.profiles.iter().any(|p| p.user_id == user_id) {
        return Err(reject(StatusCode::CONFLICT));
    }
    let profile = Profile {
        id: ProfileId(db.next_profile),
        user_id,
        email: draft.email,
        gender: Gender::from(draft.gender),
        address: draft.address,
        pincode: draft.pincode,
        city: draft.city,
        state: draft.state,
        country: draft.country,
        user: None,
    };
    db.next_profile += 1;
    db.profiles.push(profile.clone());
    Ok(Json(profile))
}

async fn get_profile(State(db): State<Db>, Path(user_id): Path<u64>) -> Reply<Value> {
    let mut db = db.lock();
    db.enter()?;
    let found = db.profiles.iter().find(|p| p.user_id == UserId(user_id));
    let profile = match found {
        Some(profile) => profile,
        None if db.null_for_missing_profile => return Ok(Json(Value::Null)),
        None => return Err(reject(StatusCode::NOT_FOUND)),
    };
    let owner = db
        .users
        .iter()
        .find(|u| u.id == profile.user_id)
        .ok_or_else(|| reject(StatusCode::INTERNAL_SERVER_ERROR))?;

    // Profile reads embed the owner and omit userId.
    let mut body = serde_json::to_value(profile).unwrap();
    let body_map = body.as_object_mut().unwrap();
    body_map.remove("userId");
    body_map.insert(
        "user".to_string(),
        serde_json::to_value(UserSummary {
            id: owner.id,
            username: owner.username.clone(),
            phone: owner.phone.clone(),
        })
        .unwrap(),
    );
    Ok(Json(body))
}

async fn update_profile(
    State(db): State<Db>,
    Path(user_id): Path<u64>,
    Json(draft): Json<ProfileDraft>,
) -> Reply<Profile> {
    let mut db = db.lock();
    db.enter()?;
    let profile = db
        .profiles
        .iter_mut()
        .find(|p| p.user_id == UserId(user_id))
        .ok_or_else(|| reject(StatusCode::NOT_FOUND))?;
    profile.email = draft.email;
    profile.gender = Gender::from(draft.gender);
    profile.address = draft.address;
    profile.pincode = draft.pincode;
    profile.city = draft.city;
    profile.state = draft.state;
    profile.country = draft.country;
    Ok(Json(profile.clone()))
}

async fn delete_profile(
    State(db): State<Db>,
    Path(user_id): Path<u64>,
) -> Result<StatusCode, (StatusCode, Json<Value>)> {
    let mut db = db.lock();
    db.enter()?;
    let before = db.profiles.len();
    db.profiles.retain(|p| p.user_id != UserId(user_id));
    if db.profiles.len() == before {
        return Err(reject(StatusCode::NOT_FOUND));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn serve(backend: Backend) -> (HttpClient, Db) {
    let db: Db = Arc::new(Mutex::new(backend));
    let app = Router::new()
        .route("/api/users", get(list_users).post(create_user))
        .route(
            "/api/users/:id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route("/api/profiles", get(list_profiles).post(create_profile))
        .route(
            "/api/profiles/:user_id",
            get(get_profile).patch(update_profile).delete(delete_profile),
        )
        .with_state(db.clone());

    let server = axum::Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0)))
        .serve(app.into_make_service());
    let addr = server.local_addr();
    tokio::spawn(server);

    let config = ApiConfig::new(&format!("http://{}/", addr)).unwrap();
    (HttpClient::new(&config).unwrap(), db)
}

fn profile_draft(user_id: u64) -> ProfileDraft {
    let mut draft = ProfileDraft::for_user(UserId(user_id));
    draft.email = "john@host.com".into();
    draft.gender = "Male".into();
    draft.address = "12 Lake Road".into();
    draft.pincode = "560001".into();
    draft.city = "Bengaluru".into();
    draft.state = "Karnataka".into();
    draft.country = "India".into();
    draft
}

#[tokio::test]
async fn created_user_is_listed_exactly_once() {
    let (client, _db) = serve(Backend::seeded(&[1, 2])).await;
    let store = ListStore::new();
    store.refresh(&client).await.unwrap();

    let mut form = FormController::<User>::create();
    form.load(UserDraft::new("john_doe", "9876543210"));
    let submission = form.submit_into(&client, &store).await.unwrap();
    let Submission::Committed(created) = submission else {
        panic!("expected commit, got {:?}", submission);
    };
    assert_eq!(created.id, UserId(3));

    assert_eq!(store.refresh(&client).await.unwrap(), Refresh::Applied(3));
    let matches = store
        .snapshot()
        .into_iter()
        .filter(|u| u.username == "john_doe")
        .count();
    assert_eq!(matches, 1);
}

#[tokio::test]
async fn invalid_user_sends_nothing() {
    let (client, db) = serve(Backend::seeded(&[])).await;

    let mut form = FormController::<User>::create();
    form.load(UserDraft::new("john doe", "123"));
    let Submission::Invalid(errors) = form.submit(&client).await else {
        panic!("expected validation failure");
    };

    assert_eq!(errors.len(), 2);
    assert_eq!(
        errors.get("username"),
        Some("Username can only contain letters, underscores (_), or hyphens (-)")
    );
    assert_eq!(db.lock().requests, 0);
}

#[tokio::test]
async fn delete_waits_for_confirmation() {
    let (client, db) = serve(Backend::seeded(&[4, 5, 6])).await;
    let store = ListStore::<User>::new();
    store.refresh(&client).await.unwrap();
    let mut gate = ConfirmationGate::new();

    gate.request(UserId(5));
    assert_eq!(gate.state(), GateState::PendingConfirmation(UserId(5)));
    gate.cancel();
    assert_eq!(gate.state(), GateState::Idle);
    assert_eq!(store.len(), 3);
    assert_eq!(db.lock().users.len(), 3);

    gate.request(UserId(5));
    let removed = gate
        .confirm_with(|id| store.remove(&client, id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(removed.id, UserId(5));
    assert_eq!(gate.state(), GateState::Idle);

    let left: Vec<UserId> = store.snapshot().iter().map(|u| u.id).collect();
    assert_eq!(left, vec![UserId(4), UserId(6)]);
    store.refresh(&client).await.unwrap();
    assert!(store.find_by_id(UserId(5)).is_none());
}

#[tokio::test]
async fn failed_delete_leaves_user_listed() {
    let (client, db) = serve(Backend::seeded(&[1])).await;
    let store = ListStore::<User>::new();
    store.refresh(&client).await.unwrap();

    db.lock().fail_with = Some(StatusCode::INTERNAL_SERVER_ERROR);
    let err = store.remove(&client, UserId(1)).await.unwrap_err();
    assert!(matches!(err, StoreError::Api(ApiError::Server { .. })));
    assert!(store.find_by_id(UserId(1)).is_some());
}

#[tokio::test]
async fn second_profile_is_refused() {
    let (client, db) = serve(Backend::seeded(&[1])).await;

    let mut form = FormController::<Profile>::create_with(profile_draft(1));
    assert!(form.submit(&client).await.is_committed());

    let mut again = FormController::<Profile>::create_with(profile_draft(1));
    assert!(matches!(
        again.submit(&client).await,
        Submission::Failed(ApiError::Conflict)
    ));
    assert_eq!(db.lock().profiles.len(), 1);
}

#[tokio::test]
async fn profile_lookup_resolves_owner_from_embedded_user() {
    let (client, _db) = serve(Backend::seeded(&[1, 2])).await;
    Resource::<Profile>::create(&client, &profile_draft(2))
        .await
        .unwrap();

    let profile = Resource::<Profile>::get(&client, UserId(2)).await.unwrap();
    assert_eq!(profile.user_id, UserId(2));
    assert_eq!(profile.user.unwrap().username, "user_c");

    assert!(matches!(
        Resource::<Profile>::get(&client, UserId(1)).await,
        Err(ApiError::NotFound)
    ));
}

#[tokio::test]
async fn null_profile_body_means_no_profile() {
    let mut backend = Backend::seeded(&[1]);
    backend.null_for_missing_profile = true;
    let (client, db) = serve(backend).await;

    assert!(matches!(
        Resource::<Profile>::get(&client, UserId(1)).await,
        Err(ApiError::NotFound)
    ));

    let mut form = FormController::<Profile>::create_with(profile_draft(1));
    assert!(form.submit(&client).await.is_committed());
    assert_eq!(db.lock().profiles.len(), 1);
}

#[tokio::test]
async fn user_edit_keeps_profile_missing_from_response() {
    let mut backend = Backend::seeded(&[1]);
    backend.bare_user_rows = true;
    let (client, _db) = serve(backend).await;
    Resource::<Profile>::create(&client, &profile_draft(1))
        .await
        .unwrap();

    let store = ListStore::<User>::new();
    store.refresh(&client).await.unwrap();
    let before = store.find_by_id(UserId(1)).unwrap();
    assert!(before.has_profile());

    let mut form = FormController::edit(&before);
    form.set("username", "john_doe").unwrap();
    let submission = form.submit_into(&client, &store).await.unwrap();
    assert!(submission.is_committed());

    let after = store.find_by_id(UserId(1)).unwrap();
    assert_eq!(after.username, "john_doe");
    assert_eq!(after.profile, before.profile);
}

#[tokio::test]
async fn profile_edit_and_delete_update_the_listing() {
    let (client, _db) = serve(Backend::seeded(&[1])).await;
    let users = ListStore::<User>::new();
    Resource::<Profile>::create(&client, &profile_draft(1))
        .await
        .unwrap();
    users.refresh(&client).await.unwrap();
    assert!(users.find_by_id(UserId(1)).unwrap().has_profile());

    let mut form = FormController::<Profile>::fetch(&client, UserId(1))
        .await
        .unwrap();
    form.set("city", "Mysuru").unwrap();
    let Submission::Committed(updated) = form.submit(&client).await else {
        panic!("expected commit");
    };
    assert_eq!(updated.city, "Mysuru");

    let profiles = ListStore::<Profile>::new();
    profiles.refresh(&client).await.unwrap();
    profiles.remove(&client, UserId(1)).await.unwrap();
    users.patch(UserId(1), |u| u.profile = None);
    assert!(!users.find_by_id(UserId(1)).unwrap().has_profile());

    users.refresh(&client).await.unwrap();
    assert!(!users.find_by_id(UserId(1)).unwrap().has_profile());
}

#[tokio::test]
async fn deleting_user_removes_its_profile() {
    let (client, db) = serve(Backend::seeded(&[1])).await;
    Resource::<Profile>::create(&client, &profile_draft(1))
        .await
        .unwrap();

    Resource::<User>::delete(&client, UserId(1)).await.unwrap();
    assert!(db.lock().profiles.is_empty());
    assert!(matches!(
        Resource::<Profile>::get(&client, UserId(1)).await,
        Err(ApiError::NotFound)
    ));
}

#[tokio::test]
async fn server_field_errors_render_inline() {
    let (client, _db) = serve(Backend::seeded(&[1])).await;

    let mut form = FormController::<User>::create();
    form.load(UserDraft::new("user_b", "9876543210"));
    assert!(matches!(
        form.submit(&client).await,
        Submission::Failed(ApiError::Validation { .. })
    ));
    assert_eq!(form.error("username"), Some("Username already taken"));
    assert_eq!(form.value("username"), Some("user_b"));
}

#[tokio::test]
async fn unreachable_service_is_a_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ApiConfig::new(&format!("http://{}", addr)).unwrap();
    let client = HttpClient::new(&config).unwrap();
    let err = Resource::<User>::list(&client).await.unwrap_err();
    assert!(matches!(err, ApiError::Network { .. }));
    assert!(err.is_retryable());
}

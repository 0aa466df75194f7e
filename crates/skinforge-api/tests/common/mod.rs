// All items in this module are shared test helpers. Not every test binary
// uses every helper, so we suppress dead_code warnings at the item level.
#![allow(dead_code)]

use std::collections::HashSet;
use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_json::json;

use skinforge_api::engine::authenticator::Authenticator;
use skinforge_api::engine::generator::Generator;
use skinforge_api::engine::scheduler::{now_sec, AccountScheduler, SchedulerConfig};
use skinforge_api::engine::tempfiles::TempRoots;
use skinforge_core::ids::OptimusEncoder;
use skinforge_core::secrets::SecretCodec;
use skinforge_core::types::DbId;
use skinforge_db::catalog::{Catalog, CatalogError};
use skinforge_db::models::account::Account;
use skinforge_db::models::skin::{CreateSkin, Skin, SkinFilter};

/// Profile UUID (short form) the mock upstream reports for pool accounts.
pub const ACCOUNT_PROFILE_UUID: &str = "11112222333344445555666677778888";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> skinforge_api::config::ServerConfig {
    skinforge_api::config::ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        server_name: "test-node".to_string(),
        error_threshold: 10,
        min_account_delay_secs: 200,
        follow_hosts: vec!["127.0.0.1".to_string()],
        temp_dir: std::env::temp_dir(),
        optimus_prime: 1_580_030_173,
        optimus_inverse: 59_260_789,
        optimus_random: 1_163_945_558,
        credential_key: [42u8; 32],
        mojang: skinforge_mojang::MojangConfig::default(),
    }
}

/// Encoder triple used across the tests.
pub fn test_encoder() -> OptimusEncoder {
    OptimusEncoder::new(1_580_030_173, 59_260_789, 1_163_945_558)
}

pub fn test_codec() -> SecretCodec {
    SecretCodec::new([42u8; 32])
}

// ---------------------------------------------------------------------------
// Test images
// ---------------------------------------------------------------------------

/// A textured (poorly compressible) skin PNG.
pub fn test_png(width: u32, height: u32, seed: u32) -> Vec<u8> {
    png_with(width, height, seed, |_| {})
}

/// Same, with a pixel-level edit applied before encoding.
pub fn png_with(width: u32, height: u32, seed: u32, edit: impl Fn(&mut RgbaImage)) -> Vec<u8> {
    let mut img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            ((x * 7 + y * 13 + seed) % 256) as u8,
            ((x * 3 + y * 29 + seed * 5) % 256) as u8,
            ((x * 17 + y * 5) % 256) as u8,
            255,
        ])
    });
    edit(&mut img);
    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    buf
}

// ---------------------------------------------------------------------------
// In-memory catalog
// ---------------------------------------------------------------------------

/// Mutex-guarded in-memory catalog mirroring the PostgreSQL semantics.
#[derive(Default)]
pub struct MemoryCatalog {
    pub skins: Mutex<Vec<Skin>>,
    pub accounts: Mutex<Vec<Account>>,
}

impl MemoryCatalog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_skin(&self, skin: Skin) {
        self.skins.lock().unwrap().push(skin);
    }

    pub fn push_account(&self, account: Account) {
        self.accounts.lock().unwrap().push(account);
    }

    pub fn skin(&self, id: DbId) -> Option<Skin> {
        self.skins.lock().unwrap().iter().find(|s| s.id == id).cloned()
    }

    pub fn account(&self, id: DbId) -> Option<Account> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned()
    }

    pub fn skin_count(&self) -> usize {
        self.skins.lock().unwrap().len()
    }

    fn matches(skin: &Skin, filter: &SkinFilter) -> bool {
        skin.name == filter.name
            && skin.variant == filter.variant
            && skin.visibility == filter.visibility
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn find_skin_by_id(
        &self,
        id: DbId,
        filter: &SkinFilter,
    ) -> Result<Option<Skin>, CatalogError> {
        Ok(self
            .skins
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == id && Self::matches(s, filter))
            .cloned())
    }

    async fn find_skin_by_texture(
        &self,
        texture_url: &str,
        texture_hash: &str,
        filter: &SkinFilter,
    ) -> Result<Option<Skin>, CatalogError> {
        Ok(self
            .skins
            .lock()
            .unwrap()
            .iter()
            .find(|s| {
                (s.texture_url == texture_url
                    || s.texture_hash.as_deref() == Some(texture_hash))
                    && Self::matches(s, filter)
            })
            .cloned())
    }

    async fn find_skin_by_uuid(
        &self,
        uuid: &str,
        filter: &SkinFilter,
    ) -> Result<Option<Skin>, CatalogError> {
        Ok(self
            .skins
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.uuid == uuid && Self::matches(s, filter))
            .cloned())
    }

    async fn find_skin_by_hash(
        &self,
        phash: &str,
        filter: &SkinFilter,
    ) -> Result<Option<Skin>, CatalogError> {
        Ok(self
            .skins
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.phash == phash && Self::matches(s, filter))
            .cloned())
    }

    async fn insert_skin(&self, input: &CreateSkin) -> Result<Skin, CatalogError> {
        let mut skins = self.skins.lock().unwrap();
        if skins.iter().any(|s| s.id == input.id) {
            return Err(CatalogError::Conflict(format!(
                "skin id {} already exists",
                input.id
            )));
        }
        let skin = Skin {
            id: input.id,
            name: input.name.clone(),
            uuid: input.uuid.clone(),
            variant: input.variant,
            visibility: input.visibility,
            phash: input.phash.clone(),
            value: input.value.clone(),
            signature: input.signature.clone(),
            texture_url: input.texture_url.clone(),
            texture_hash: input.texture_hash.clone(),
            mojang_hash: input.mojang_hash.clone(),
            created_at: chrono::Utc::now(),
            generate_duration_ms: input.generate_duration_ms,
            account_id: input.account_id,
            duplicate_count: 0,
            view_count: 0,
            via: input.via.clone(),
            user_agent: input.user_agent.clone(),
            source: input.source.clone(),
        };
        skins.push(skin.clone());
        Ok(skin)
    }

    async fn exists_skin_id(&self, id: DbId) -> Result<bool, CatalogError> {
        Ok(self.skins.lock().unwrap().iter().any(|s| s.id == id))
    }

    async fn increment_duplicate(&self, id: DbId) -> Result<Option<Skin>, CatalogError> {
        let mut skins = self.skins.lock().unwrap();
        Ok(skins.iter_mut().find(|s| s.id == id).map(|s| {
            s.duplicate_count += 1;
            s.clone()
        }))
    }

    async fn find_eligible_account(
        &self,
        server_name: &str,
        error_threshold: i32,
        locked: &[DbId],
        now_sec: i64,
    ) -> Result<Option<Account>, CatalogError> {
        let locked: HashSet<DbId> = locked.iter().copied().collect();
        let mut candidates: Vec<Account> = self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| {
                a.enabled
                    && a.error_counter < error_threshold
                    && a.time_added_sec < now_sec - 60
                    && a.last_used_sec < now_sec - 100
                    && a.last_selected_sec < now_sec - 50
                    && a.forced_timeout_at_sec < now_sec - 500
                    && match a.request_server.as_deref() {
                        None | Some("default") => true,
                        Some(server) => server == server_name,
                    }
                    && !locked.contains(&a.id)
            })
            .cloned()
            .collect();
        candidates.sort_by_key(|a| (a.last_used_sec, a.last_selected_sec, a.same_texture_counter));
        Ok(candidates.into_iter().next())
    }

    async fn update_account(&self, account: &Account) -> Result<(), CatalogError> {
        let mut accounts = self.accounts.lock().unwrap();
        match accounts.iter_mut().find(|a| a.id == account.id) {
            Some(stored) => {
                *stored = account.clone();
                Ok(())
            }
            None => Err(CatalogError::Backend(format!(
                "account {} does not exist",
                account.id
            ))),
        }
    }

    async fn count_usable_accounts(&self, error_threshold: i32) -> Result<i64, CatalogError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.enabled && a.error_counter < error_threshold)
            .count() as i64)
    }

    async fn health_check(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Mock upstream
// ---------------------------------------------------------------------------

/// Controllable fake of the four upstream hosts plus an image host.
pub struct MockUpstream {
    /// Access tokens `validate` accepts.
    pub valid_tokens: Mutex<HashSet<String>>,
    /// Whether `refresh` succeeds.
    pub refresh_ok: AtomicBool,
    /// Whether `authenticate` succeeds.
    pub login_ok: AtomicBool,
    /// Whether the origin IP counts as trusted (location probe).
    pub location_trusted: AtomicBool,
    /// Pending security challenge IDs, drained by a successful answer POST.
    pub challenge_ids: Mutex<Vec<i64>>,
    /// Whether the skin-change endpoint succeeds.
    pub skin_change_ok: AtomicBool,
    pub login_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub validate_calls: AtomicUsize,
    pub skin_change_calls: AtomicUsize,
    /// Bearer token seen on the most recent skin-change call.
    pub last_skin_change_token: Mutex<Option<String>>,
    /// PNG the texture host serves as "what upstream stored".
    pub stored_texture: Mutex<Vec<u8>>,
    /// Base URL, filled in once the listener is bound.
    pub base_url: Mutex<String>,
}

impl MockUpstream {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            valid_tokens: Mutex::new(HashSet::new()),
            refresh_ok: AtomicBool::new(true),
            login_ok: AtomicBool::new(true),
            location_trusted: AtomicBool::new(true),
            challenge_ids: Mutex::new(Vec::new()),
            skin_change_ok: AtomicBool::new(true),
            login_calls: AtomicUsize::new(0),
            refresh_calls: AtomicUsize::new(0),
            validate_calls: AtomicUsize::new(0),
            skin_change_calls: AtomicUsize::new(0),
            last_skin_change_token: Mutex::new(None),
            stored_texture: Mutex::new(test_png(64, 64, 99)),
            base_url: Mutex::new(String::new()),
        })
    }

    pub fn base_url(&self) -> String {
        self.base_url.lock().unwrap().clone()
    }

    pub fn texture_url(&self) -> String {
        format!("{}/texture/currentskin", self.base_url())
    }

    fn bearer(headers: &HeaderMap) -> Option<String> {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|v| v.to_string())
    }
}

async fn mock_authenticate(
    State(mock): State<Arc<MockUpstream>>,
    Json(body): Json<serde_json::Value>,
) -> impl IntoResponse {
    mock.login_calls.fetch_add(1, Ordering::SeqCst);
    assert_eq!(body["agent"]["name"], "Minecraft");
    if !mock.login_ok.load(Ordering::SeqCst) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "ForbiddenOperationException"})),
        );
    }
    let token = format!("login-token-{}", mock.login_calls.load(Ordering::SeqCst));
    mock.valid_tokens.lock().unwrap().insert(token.clone());
    (StatusCode::OK, Json(json!({ "accessToken": token })))
}

async fn mock_validate(
    State(mock): State<Arc<MockUpstream>>,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    mock.validate_calls.fetch_add(1, Ordering::SeqCst);
    let token = body["accessToken"].as_str().unwrap_or_default();
    if mock.valid_tokens.lock().unwrap().contains(token) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::FORBIDDEN
    }
}

async fn mock_refresh(
    State(mock): State<Arc<MockUpstream>>,
    Json(_body): Json<serde_json::Value>,
) -> impl IntoResponse {
    mock.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if !mock.refresh_ok.load(Ordering::SeqCst) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"error": "invalid token"})),
        );
    }
    let token = format!("refreshed-token-{}", mock.refresh_calls.load(Ordering::SeqCst));
    mock.valid_tokens.lock().unwrap().insert(token.clone());
    (StatusCode::OK, Json(json!({ "accessToken": token })))
}

async fn mock_location_get(State(mock): State<Arc<MockUpstream>>) -> StatusCode {
    if mock.location_trusted.load(Ordering::SeqCst) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::FORBIDDEN
    }
}

async fn mock_challenges(State(mock): State<Arc<MockUpstream>>) -> impl IntoResponse {
    let challenges: Vec<serde_json::Value> = mock
        .challenge_ids
        .lock()
        .unwrap()
        .iter()
        .map(|id| {
            json!({
                "answer": { "id": id },
                "question": { "id": 1, "question": "What is your favorite pet's name?" }
            })
        })
        .collect();
    Json(challenges)
}

async fn mock_location_post(
    State(mock): State<Arc<MockUpstream>>,
    Json(answers): Json<Vec<serde_json::Value>>,
) -> StatusCode {
    let expected = mock.challenge_ids.lock().unwrap().len();
    if answers.len() == expected && expected > 0 {
        mock.location_trusted.store(true, Ordering::SeqCst);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::FORBIDDEN
    }
}

async fn mock_change_skin(
    State(mock): State<Arc<MockUpstream>>,
    headers: HeaderMap,
) -> impl IntoResponse {
    mock.skin_change_calls.fetch_add(1, Ordering::SeqCst);
    *mock.last_skin_change_token.lock().unwrap() = MockUpstream::bearer(&headers);
    if mock.skin_change_ok.load(Ordering::SeqCst) {
        (StatusCode::OK, Json(json!({})))
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": "upstream exploded"})),
        )
    }
}

async fn mock_current_profile(State(_mock): State<Arc<MockUpstream>>) -> impl IntoResponse {
    Json(json!({ "id": ACCOUNT_PROFILE_UUID, "name": "PoolAccount" }))
}

async fn mock_signed_profile(
    State(mock): State<Arc<MockUpstream>>,
    Path(uuid): Path<String>,
) -> impl IntoResponse {
    let payload = json!({
        "textures": {
            "SKIN": {
                "url": mock.texture_url(),
                "metadata": { "model": "slim" }
            }
        }
    });
    Json(json!({
        "id": uuid,
        "name": "SomeUser",
        "properties": [{
            "name": "textures",
            "value": BASE64.encode(payload.to_string()),
            "signature": "signed-by-upstream"
        }]
    }))
}

async fn mock_texture(State(mock): State<Arc<MockUpstream>>) -> impl IntoResponse {
    let bytes = mock.stored_texture.lock().unwrap().clone();
    ([(header::CONTENT_TYPE, "image/png")], bytes)
}

async fn mock_image_ok(State(_mock): State<Arc<MockUpstream>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], test_png(64, 64, 7))
}

async fn mock_image_big(State(_mock): State<Arc<MockUpstream>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "image/png")], vec![0u8; 25_000])
}

async fn mock_image_redirect() -> impl IntoResponse {
    (
        StatusCode::FOUND,
        [(header::LOCATION, "/skins/ok.png")],
    )
}

/// Spawn the mock upstream on a loopback port and return its handle.
pub async fn spawn_mock_upstream() -> Arc<MockUpstream> {
    let mock = MockUpstream::new();

    let router = Router::new()
        .route("/authenticate", post(mock_authenticate))
        .route("/validate", post(mock_validate))
        .route("/refresh", post(mock_refresh))
        .route(
            "/user/security/location",
            get(mock_location_get).post(mock_location_post),
        )
        .route("/user/security/challenges", get(mock_challenges))
        .route("/minecraft/profile/skins", post(mock_change_skin))
        .route("/minecraft/profile", get(mock_current_profile))
        .route("/session/minecraft/profile/{uuid}", get(mock_signed_profile))
        .route("/texture/currentskin", get(mock_texture))
        .route("/skins/ok.png", get(mock_image_ok))
        .route("/skins/big.png", get(mock_image_big))
        .route("/skins/redirect", get(mock_image_redirect))
        .with_state(Arc::clone(&mock));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    *mock.base_url.lock().unwrap() = format!("http://{addr}");

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    mock
}

// ---------------------------------------------------------------------------
// Engine harness
// ---------------------------------------------------------------------------

/// A fully wired engine over the in-memory catalog and the mock upstream.
pub struct TestEnv {
    pub catalog: Arc<MemoryCatalog>,
    pub scheduler: Arc<AccountScheduler>,
    pub generator: Arc<Generator>,
    pub upstream: Arc<MockUpstream>,
    pub mojang: Arc<skinforge_mojang::MojangClient>,
    pub codec: SecretCodec,
    _temp: tempfile::TempDir,
}

impl TestEnv {
    pub async fn new() -> Self {
        let upstream = spawn_mock_upstream().await;
        let base = upstream.base_url();

        let catalog = MemoryCatalog::new();
        let catalog_dyn: Arc<dyn Catalog> = Arc::clone(&catalog) as Arc<dyn Catalog>;

        let scheduler = Arc::new(AccountScheduler::new(
            Arc::clone(&catalog_dyn),
            SchedulerConfig {
                server_name: "test-node".to_string(),
                error_threshold: 10,
                min_account_delay_secs: 200,
            },
        ));

        let mojang_config = skinforge_mojang::MojangConfig {
            auth_base: base.clone(),
            account_base: base.clone(),
            services_base: base.clone(),
            session_base: base.clone(),
            timeout: std::time::Duration::from_secs(5),
        };
        let mojang = Arc::new(skinforge_mojang::MojangClient::new(mojang_config).unwrap());

        let codec = test_codec();
        let authenticator = Authenticator::new(
            Arc::clone(&mojang),
            codec.clone(),
            Arc::clone(&catalog_dyn),
        );

        let temp = tempfile::tempdir().unwrap();
        let roots = TempRoots::create(temp.path()).unwrap();

        let generator = Arc::new(
            Generator::new(
                Arc::clone(&catalog_dyn),
                Arc::clone(&scheduler),
                authenticator,
                Arc::clone(&mojang),
                roots,
                test_encoder(),
                vec!["127.0.0.1".to_string()],
                std::time::Duration::from_secs(5),
            )
            .unwrap(),
        );

        Self {
            catalog,
            scheduler,
            generator,
            upstream,
            mojang,
            codec,
            _temp: temp,
        }
    }

    /// The catalog as the trait object the engine components take.
    pub fn catalog_dyn(&self) -> Arc<dyn Catalog> {
        Arc::clone(&self.catalog) as Arc<dyn Catalog>
    }

    /// A fresh authenticator over this environment's upstream and catalog.
    pub fn authenticator(&self) -> Authenticator {
        Authenticator::new(
            Arc::clone(&self.mojang),
            self.codec.clone(),
            self.catalog_dyn(),
        )
    }

    /// Seed an eligible account with an encrypted password and no tokens.
    pub fn seed_account(&self, id: DbId) -> Account {
        let now = now_sec();
        let account = Account {
            id,
            username: format!("account{id}@example.com"),
            encrypted_password: self.codec.encrypt("hunter2").unwrap(),
            encrypted_security_answer: Some(self.codec.encrypt("Fluffy").unwrap()),
            client_token: None,
            access_token: None,
            request_ip: None,
            request_server: None,
            last_used_sec: now - 200,
            last_selected_sec: now - 100,
            forced_timeout_at_sec: 0,
            time_added_sec: now - 3600,
            error_counter: 0,
            success_counter: 0,
            total_error_counter: 0,
            total_success_counter: 0,
            same_texture_counter: 0,
            enabled: true,
        };
        self.catalog.push_account(account.clone());
        account
    }

    /// Full application router over this environment, with the production
    /// middleware stack.
    pub fn app(&self) -> axum::Router {
        let config = test_config();
        let state = skinforge_api::state::AppState {
            catalog: self.catalog_dyn(),
            scheduler: Arc::clone(&self.scheduler),
            generator: Arc::clone(&self.generator),
            config: Arc::new(config.clone()),
        };
        skinforge_api::router::build_app_router(state, &config)
    }

    /// Seed an existing catalog skin for duplicate-probe tests.
    pub fn seed_skin(&self, id: DbId, name: &str, phash: &str) -> Skin {
        let skin = Skin {
            id,
            name: name.to_string(),
            uuid: "99998888-7777-6666-5555-444433332222".to_string(),
            variant: skinforge_core::types::SkinVariant::Classic,
            visibility: skinforge_core::types::SkinVisibility::Public,
            phash: phash.to_string(),
            value: "stored-value".to_string(),
            signature: "stored-signature".to_string(),
            texture_url: "https://textures.minecraft.net/texture/abcdef012345".to_string(),
            texture_hash: Some("abcdef012345".to_string()),
            mojang_hash: None,
            created_at: chrono::Utc::now(),
            generate_duration_ms: 1200,
            account_id: 1,
            duplicate_count: 0,
            view_count: 0,
            via: "api".to_string(),
            user_agent: "test".to_string(),
            source: "upload".to_string(),
        };
        self.catalog.push_skin(skin.clone());
        skin
    }
}

//! The end-to-end generation pipeline.
//!
//! Three entry points share one skeleton: resolve the input to image bytes
//! or a remote texture reference, probe for duplicates at every stage where
//! a candidate identifier exists, and only then lease an account, drive the
//! upstream skin change, and persist the signed result.

use std::sync::Arc;
use std::time::Instant;

use skinforge_core::error::GenerateError;
use skinforge_core::ids::OptimusEncoder;
use skinforge_core::types::{DuplicateSource, SkinVariant};
use skinforge_core::{images, metric_names, phash, urls};
use skinforge_db::catalog::{Catalog, CatalogError};
use skinforge_db::models::skin::{CreateSkin, Skin};
use skinforge_mojang::{decode_textures, MojangClient, MojangError};
use uuid::Uuid;

use super::authenticator::Authenticator;
use super::detector::DuplicateDetector;
use super::scheduler::{AccountLease, AccountScheduler, FailureKind, ReleaseOutcome};
use super::tempfiles::{self, TempKind, TempRoots};
use super::{ClientInfo, EngineError, GenerateOptions};

/// Redirect budget for the stage-A URL follow.
const MAX_REDIRECTS: usize = 5;

/// Size cap when re-fetching what the upstream stored. The upstream may
/// re-encode, so this is looser than the input cap.
const UPSTREAM_FETCH_MAX_BYTES: usize = 1 << 20;

/// Provenance tag recorded for direct uploads.
const SOURCE_UPLOAD: &str = "upload";

/// The result of a generation request.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub skin: Skin,
    /// Set when a duplicate probe short-circuited the pipeline.
    pub duplicate: Option<DuplicateSource>,
}

/// What the upstream skin-change call should carry.
enum UpstreamInput {
    Url(String),
    File(Vec<u8>),
}

/// The generation orchestrator.
pub struct Generator {
    catalog: Arc<dyn Catalog>,
    scheduler: Arc<AccountScheduler>,
    authenticator: Authenticator,
    detector: DuplicateDetector,
    mojang: Arc<MojangClient>,
    temp: TempRoots,
    /// Redirects are followed manually against the allowlist.
    http: reqwest::Client,
    encoder: OptimusEncoder,
    follow_hosts: Vec<String>,
}

impl Generator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<dyn Catalog>,
        scheduler: Arc<AccountScheduler>,
        authenticator: Authenticator,
        mojang: Arc<MojangClient>,
        temp: TempRoots,
        encoder: OptimusEncoder,
        follow_hosts: Vec<String>,
        timeout: std::time::Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .user_agent(skinforge_mojang::client::USER_AGENT)
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()?;
        Ok(Self {
            detector: DuplicateDetector::new(Arc::clone(&catalog)),
            catalog,
            scheduler,
            authenticator,
            mojang,
            temp,
            http,
            encoder,
            follow_hosts,
        })
    }

    // ── Entry points ─────────────────────────────────────────────────────

    /// Generate from a remote image URL.
    pub async fn from_url(
        &self,
        url: &str,
        options: &GenerateOptions,
        client: &ClientInfo,
    ) -> Result<GenerationOutcome, EngineError> {
        let started = Instant::now();
        let filter = options.filter();

        // Known catalog/texture links resolve without any download.
        if let Some((skin, source)) = self.detector.probe_source_url(url, &filter).await? {
            self.emit_metric(metric_names::INPUT_URL, started, Some(source));
            return Ok(GenerationOutcome {
                skin,
                duplicate: Some(source),
            });
        }

        let resolved = self.follow_url(url).await?;
        if resolved != url {
            if let Some((skin, source)) = self.detector.probe_source_url(&resolved, &filter).await?
            {
                self.emit_metric(metric_names::INPUT_URL, started, Some(source));
                return Ok(GenerationOutcome {
                    skin,
                    duplicate: Some(source),
                });
            }
        }

        let handle = self.temp.acquire(TempKind::UrlDownload)?;
        let bytes = tempfiles::download_to(
            &self.http,
            &resolved,
            &handle,
            images::MAX_IMAGE_BYTES,
        )
        .await?;

        let validated = images::validate(&bytes, options.variant)?;
        let hash = phash::phash(&validated.image);
        if let Some((skin, source)) = self.detector.probe_image_hash(&hash, &filter).await? {
            self.emit_metric(metric_names::INPUT_URL, started, Some(source));
            return Ok(GenerationOutcome {
                skin,
                duplicate: Some(source),
            });
        }

        let skin = self
            .change_and_persist(
                UpstreamInput::Url(resolved.clone()),
                validated.variant,
                Some(hash),
                None,
                options,
                client,
                resolved,
                started,
            )
            .await?;
        self.emit_metric(metric_names::INPUT_URL, started, None);
        Ok(GenerationOutcome {
            skin,
            duplicate: None,
        })
    }

    /// Generate from uploaded PNG bytes.
    pub async fn from_upload(
        &self,
        bytes: &[u8],
        options: &GenerateOptions,
        client: &ClientInfo,
    ) -> Result<GenerationOutcome, EngineError> {
        let started = Instant::now();
        let filter = options.filter();

        let handle = self.temp.acquire(TempKind::Upload)?;
        handle.write_bytes(bytes).await?;

        let validated = images::validate(bytes, options.variant)?;
        let hash = phash::phash(&validated.image);
        if let Some((skin, source)) = self.detector.probe_image_hash(&hash, &filter).await? {
            self.emit_metric(metric_names::INPUT_UPLOAD, started, Some(source));
            return Ok(GenerationOutcome {
                skin,
                duplicate: Some(source),
            });
        }

        let skin = self
            .change_and_persist(
                UpstreamInput::File(bytes.to_vec()),
                validated.variant,
                Some(hash),
                None,
                options,
                client,
                SOURCE_UPLOAD.to_string(),
                started,
            )
            .await?;
        self.emit_metric(metric_names::INPUT_UPLOAD, started, None);
        Ok(GenerationOutcome {
            skin,
            duplicate: None,
        })
    }

    /// Generate from an existing user's current skin.
    pub async fn from_user(
        &self,
        user: Uuid,
        options: &GenerateOptions,
        client: &ClientInfo,
    ) -> Result<GenerationOutcome, EngineError> {
        let started = Instant::now();
        let filter = options.filter();
        let long_uuid = user.hyphenated().to_string();
        let short_uuid = user.simple().to_string();

        if let Some((skin, source)) = self.detector.probe_user_uuid(&long_uuid, &filter).await? {
            self.emit_metric(metric_names::INPUT_USER, started, Some(source));
            return Ok(GenerationOutcome {
                skin,
                duplicate: Some(source),
            });
        }

        // Resolve the user's current texture; the upstream change then pulls
        // from that URL like any other URL input.
        let profile = self
            .mojang
            .signed_profile(&short_uuid, client.ip.as_deref())
            .await
            .map_err(|e| {
                tracing::debug!(uuid = %long_uuid, error = %e, "User profile fetch failed");
                GenerateError::InvalidSkinData
            })?;
        let textures = profile
            .textures_property()
            .ok_or(GenerateError::InvalidSkinData)
            .and_then(|p| decode_textures(&p.value).map_err(|_| GenerateError::InvalidSkinData))?;
        let texture_url = textures.skin_url.ok_or(GenerateError::InvalidSkinData)?;

        let variant = match options.variant {
            SkinVariant::Unknown => {
                if textures.slim_model {
                    SkinVariant::Slim
                } else {
                    SkinVariant::Classic
                }
            }
            explicit => explicit,
        };

        let skin = self
            .change_and_persist(
                UpstreamInput::Url(texture_url),
                variant,
                None,
                Some(long_uuid.clone()),
                options,
                client,
                long_uuid,
                started,
            )
            .await?;
        self.emit_metric(metric_names::INPUT_USER, started, None);
        Ok(GenerationOutcome {
            skin,
            duplicate: None,
        })
    }

    // ── URL follow ───────────────────────────────────────────────────────

    /// HEAD-follow a URL within the host allowlist and verify the final
    /// response advertises an acceptable PNG.
    async fn follow_url(&self, url: &str) -> Result<String, EngineError> {
        let mut current = reqwest::Url::parse(url)
            .map_err(|e| GenerateError::InvalidImageUrl(format!("malformed URL: {e}")))?;
        self.check_host(&current)?;

        for _ in 0..=MAX_REDIRECTS {
            let response = self
                .http
                .head(current.clone())
                .send()
                .await
                .map_err(|e| GenerateError::InvalidImageUrl(format!("follow failed: {e}")))?;

            if response.status().is_redirection() {
                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| {
                        GenerateError::InvalidImageUrl("redirect without location".to_string())
                    })?;
                current = current.join(location).map_err(|e| {
                    GenerateError::InvalidImageUrl(format!("malformed redirect: {e}"))
                })?;
                self.check_host(&current)?;
                continue;
            }

            if !response.status().is_success() {
                return Err(GenerateError::InvalidImageUrl(format!(
                    "URL returned status {}",
                    response.status()
                ))
                .into());
            }

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            if !content_type.starts_with(images::PNG_MIME) {
                return Err(GenerateError::InvalidImage(format!(
                    "content type must be {}, got {content_type}",
                    images::PNG_MIME
                ))
                .into());
            }

            // Read the advertised header; the body size hint is always zero
            // on a HEAD response.
            let advertised = response
                .headers()
                .get(reqwest::header::CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<usize>().ok());
            if let Some(length) = advertised {
                if length < images::MIN_IMAGE_BYTES || length > images::MAX_IMAGE_BYTES {
                    return Err(GenerateError::InvalidImage(format!(
                        "image size must be between {} and {} bytes, got {length}",
                        images::MIN_IMAGE_BYTES,
                        images::MAX_IMAGE_BYTES
                    ))
                    .into());
                }
            }

            return Ok(current.to_string());
        }

        Err(GenerateError::InvalidImageUrl("too many redirects".to_string()).into())
    }

    fn check_host(&self, url: &reqwest::Url) -> Result<(), EngineError> {
        let host = url
            .host_str()
            .ok_or_else(|| GenerateError::InvalidImageUrl("URL has no host".to_string()))?;
        let allowed = self
            .follow_hosts
            .iter()
            .any(|h| host == h || host.ends_with(&format!(".{h}")));
        if !allowed {
            return Err(
                GenerateError::InvalidImageUrl(format!("host {host} is not allowed")).into(),
            );
        }
        Ok(())
    }

    // ── Upstream change and persistence ──────────────────────────────────

    /// Lease an account, drive the upstream change, persist the result.
    /// Any failure after the lease is recorded against the account.
    #[allow(clippy::too_many_arguments)]
    async fn change_and_persist(
        &self,
        input: UpstreamInput,
        variant: SkinVariant,
        input_hash: Option<String>,
        owner_uuid: Option<String>,
        options: &GenerateOptions,
        client: &ClientInfo,
        source: String,
        started: Instant,
    ) -> Result<Skin, EngineError> {
        let mut lease = self.scheduler.acquire().await?;

        let result = self
            .drive_upstream(
                &mut lease, input, variant, input_hash, owner_uuid, options, client, source,
                started,
            )
            .await;

        match result {
            Ok(skin) => {
                self.scheduler
                    .release(lease, ReleaseOutcome::Success)
                    .await?;
                Ok(skin)
            }
            Err(err) => {
                let kind = match &err {
                    EngineError::Generate(GenerateError::Auth(_))
                    | EngineError::Generate(GenerateError::CredentialUnreadable) => {
                        FailureKind::Auth
                    }
                    _ => FailureKind::Upstream,
                };
                if let Err(release_err) = self
                    .scheduler
                    .release(lease, ReleaseOutcome::Failure(kind))
                    .await
                {
                    tracing::error!(error = %release_err, "Failed to record account failure");
                }
                Err(err)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn drive_upstream(
        &self,
        lease: &mut AccountLease,
        input: UpstreamInput,
        variant: SkinVariant,
        input_hash: Option<String>,
        owner_uuid: Option<String>,
        options: &GenerateOptions,
        client: &ClientInfo,
        source: String,
        started: Instant,
    ) -> Result<Skin, EngineError> {
        let account_id = lease.account.id;

        self.authenticator
            .ensure_authenticated(&mut lease.account, client.ip.as_deref())
            .await?;
        let access = lease
            .account
            .access_token
            .clone()
            .ok_or_else(|| GenerateError::Auth("login produced no access token".to_string()))?;
        let ip = lease.account.request_ip.clone().or_else(|| client.ip.clone());

        match &input {
            UpstreamInput::Url(url) => {
                self.mojang
                    .change_skin_url(&access, variant.as_str(), url, ip.as_deref())
                    .await
            }
            UpstreamInput::File(bytes) => {
                self.mojang
                    .change_skin_file(&access, variant.as_str(), bytes.clone(), ip.as_deref())
                    .await
            }
        }
        .map_err(skin_change_error)?;

        // Re-read the profile for the new signed descriptor.
        let profile = self
            .mojang
            .current_profile(&access, ip.as_deref())
            .await
            .map_err(skin_change_error)?;
        let signed = self
            .mojang
            .signed_profile(&profile.id, ip.as_deref())
            .await
            .map_err(skin_change_error)?;
        let property = signed
            .textures_property()
            .ok_or(GenerateError::InvalidSkinData)?;
        let textures =
            decode_textures(&property.value).map_err(|_| GenerateError::InvalidSkinData)?;
        let texture_url = textures.skin_url.ok_or(GenerateError::InvalidSkinData)?;

        // Independent fingerprint of what the upstream actually stored.
        let fetch_handle = self.temp.acquire(TempKind::UpstreamFetch)?;
        let stored_bytes = tempfiles::download_to(
            &self.http,
            &texture_url,
            &fetch_handle,
            UPSTREAM_FETCH_MAX_BYTES,
        )
        .await?;
        let stored_image = image::load_from_memory(&stored_bytes)
            .map_err(|_| GenerateError::InvalidSkinData)?;
        let mojang_hash = phash::phash(&stored_image);

        // User-input skins are owned by the requested user; otherwise the
        // pool account's profile now wears the texture.
        let owner_uuid = owner_uuid.unwrap_or_else(|| {
            Uuid::parse_str(&profile.id)
                .map(|u| u.hyphenated().to_string())
                .unwrap_or_else(|_| profile.id.clone())
        });

        let record = CreateSkin {
            id: 0, // allocated per attempt below
            name: options.name.clone(),
            uuid: owner_uuid,
            variant,
            visibility: options.visibility,
            phash: input_hash.unwrap_or_else(|| mojang_hash.clone()),
            value: property.value.clone(),
            signature: property.signature.clone().unwrap_or_default(),
            texture_hash: urls::texture_hash(&texture_url),
            texture_url,
            mojang_hash: Some(mojang_hash),
            generate_duration_ms: started.elapsed().as_millis() as i64,
            account_id,
            via: client.via.clone(),
            user_agent: client.user_agent.clone(),
            source,
        };

        let skin = self.insert_with_fresh_id(record).await?;
        tracing::info!(skin_id = skin.id, account_id, "Persisted new skin");
        Ok(skin)
    }

    /// Allocate an ID and insert, redrawing when a concurrent request wins
    /// the same ID. The catalog's unique index is the arbiter.
    async fn insert_with_fresh_id(&self, mut record: CreateSkin) -> Result<Skin, EngineError> {
        for _ in 0..super::ids::MAX_ID_TRIES {
            record.id = super::ids::allocate(self.catalog.as_ref(), &self.encoder).await?;
            match self.catalog.insert_skin(&record).await {
                Ok(skin) => return Ok(skin),
                Err(CatalogError::Conflict(_)) => {
                    tracing::warn!(id = record.id, "Lost id race, reallocating");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(GenerateError::FailedToCreateId(super::ids::MAX_ID_TRIES).into())
    }

    fn emit_metric(&self, input: &'static str, started: Instant, duplicate: Option<DuplicateSource>) {
        tracing::info!(
            metric = metric_names::METRIC_GENERATE_DURATION,
            input,
            duration_ms = started.elapsed().as_millis() as u64,
            duplicate = duplicate.map(|s| s.as_str()).unwrap_or("none"),
            "Generation request finished",
        );
    }
}

/// Upstream failures while changing or re-reading the skin.
fn skin_change_error(e: MojangError) -> EngineError {
    match e {
        MojangError::Api { status, body } => {
            GenerateError::SkinChangeFailed(format!("upstream returned {status}: {body}")).into()
        }
        MojangError::Request(e) => GenerateError::SkinChangeFailed(e.to_string()).into(),
    }
}


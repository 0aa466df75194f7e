//! REST client for the upstream profile-service endpoints.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::json;

/// User agent sent on every upstream request.
pub const USER_AGENT: &str = "MineSkin.org";

/// Agent tag the auth server expects in login payloads.
const AGENT_NAME: &str = "Minecraft";

/// Default timeout for all outbound calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Base URLs and timeout for the upstream hosts.
#[derive(Debug, Clone)]
pub struct MojangConfig {
    /// Auth server, e.g. `https://authserver.mojang.com`.
    pub auth_base: String,
    /// Account API (security challenges), e.g. `https://api.mojang.com`.
    pub account_base: String,
    /// Services API (profile + skin change), e.g.
    /// `https://api.minecraftservices.com`.
    pub services_base: String,
    /// Session server (signed profiles), e.g.
    /// `https://sessionserver.mojang.com`.
    pub session_base: String,
    pub timeout: Duration,
}

impl Default for MojangConfig {
    fn default() -> Self {
        Self {
            auth_base: "https://authserver.mojang.com".to_string(),
            account_base: "https://api.mojang.com".to_string(),
            services_base: "https://api.minecraftservices.com".to_string(),
            session_base: "https://sessionserver.mojang.com".to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Errors from the upstream client.
#[derive(Debug, thiserror::Error)]
pub enum MojangError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The upstream returned a non-2xx status code.
    #[error("Upstream API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for the error report.
        body: String,
    },
}

/// Response from `authenticate` and `refresh`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
}

/// One entry from the security challenge list.
#[derive(Debug, Deserialize)]
pub struct SecurityChallenge {
    pub answer: ChallengeAnswerId,
}

/// The answer slot identifier inside a challenge entry.
#[derive(Debug, Deserialize)]
pub struct ChallengeAnswerId {
    pub id: i64,
}

/// An answer submitted back to the challenge endpoint.
#[derive(Debug, Serialize)]
pub struct SecurityAnswer {
    pub id: i64,
    pub answer: String,
}

/// Minimal profile returned by the services API for the bearer account.
#[derive(Debug, Deserialize)]
pub struct MinimalProfile {
    /// Profile UUID without hyphens.
    pub id: String,
    pub name: String,
}

/// HTTP client for one upstream profile service.
///
/// Cheap to clone; the inner `reqwest::Client` pools connections.
#[derive(Clone)]
pub struct MojangClient {
    http: reqwest::Client,
    config: MojangConfig,
}

impl MojangClient {
    pub fn new(config: MojangConfig) -> Result<Self, MojangError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Attach the per-account origin headers the upstream expects.
    fn with_origin(
        &self,
        req: reqwest::RequestBuilder,
        request_ip: Option<&str>,
    ) -> reqwest::RequestBuilder {
        match request_ip {
            Some(ip) => req
                .header("X-Forwarded-For", ip)
                .header("REMOTE_ADDR", ip),
            None => req,
        }
    }

    /// Pass through a 2xx response; anything else becomes an
    /// [`MojangError::Api`] carrying the body.
    async fn expect_2xx(response: reqwest::Response) -> Result<reqwest::Response, MojangError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(MojangError::Api {
            status: status.as_u16(),
            body,
        })
    }

    // ── Auth server ──────────────────────────────────────────────────────

    /// `POST /authenticate` with the decrypted password.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        client_token: &str,
        request_ip: Option<&str>,
    ) -> Result<AuthResponse, MojangError> {
        let body = json!({
            "agent": { "name": AGENT_NAME, "version": 1 },
            "username": username,
            "password": password,
            "clientToken": client_token,
            "requestUser": true,
        });
        let req = self
            .http
            .post(format!("{}/authenticate", self.config.auth_base))
            .json(&body);
        let response = Self::expect_2xx(self.with_origin(req, request_ip).send().await?).await?;
        Ok(response.json().await?)
    }

    /// `POST /validate`; 2xx means the access token is still good.
    pub async fn validate(
        &self,
        access_token: &str,
        client_token: &str,
        request_ip: Option<&str>,
    ) -> Result<(), MojangError> {
        let body = json!({
            "accessToken": access_token,
            "clientToken": client_token,
            "requestUser": true,
        });
        let req = self
            .http
            .post(format!("{}/validate", self.config.auth_base))
            .json(&body);
        Self::expect_2xx(self.with_origin(req, request_ip).send().await?).await?;
        Ok(())
    }

    /// `POST /refresh`; exchanges an expired access token for a fresh one.
    pub async fn refresh(
        &self,
        access_token: &str,
        client_token: &str,
        request_ip: Option<&str>,
    ) -> Result<AuthResponse, MojangError> {
        let body = json!({
            "accessToken": access_token,
            "clientToken": client_token,
            "requestUser": true,
        });
        let req = self
            .http
            .post(format!("{}/refresh", self.config.auth_base))
            .json(&body);
        let response = Self::expect_2xx(self.with_origin(req, request_ip).send().await?).await?;
        Ok(response.json().await?)
    }

    // ── Security challenges ──────────────────────────────────────────────

    /// `GET /user/security/location`; 2xx means the origin IP is trusted.
    pub async fn security_location_ok(
        &self,
        access_token: &str,
        request_ip: Option<&str>,
    ) -> Result<bool, MojangError> {
        let req = self
            .http
            .get(format!("{}/user/security/location", self.config.account_base))
            .bearer_auth(access_token);
        let response = self.with_origin(req, request_ip).send().await?;
        Ok(response.status().is_success())
    }

    /// `GET /user/security/challenges`; the pending question set.
    pub async fn security_challenges(
        &self,
        access_token: &str,
        request_ip: Option<&str>,
    ) -> Result<Vec<SecurityChallenge>, MojangError> {
        let req = self
            .http
            .get(format!(
                "{}/user/security/challenges",
                self.config.account_base
            ))
            .bearer_auth(access_token);
        let response = Self::expect_2xx(self.with_origin(req, request_ip).send().await?).await?;
        Ok(response.json().await?)
    }

    /// `POST /user/security/location` with the answer array.
    pub async fn submit_security_answers(
        &self,
        access_token: &str,
        answers: &[SecurityAnswer],
        request_ip: Option<&str>,
    ) -> Result<(), MojangError> {
        let req = self
            .http
            .post(format!("{}/user/security/location", self.config.account_base))
            .bearer_auth(access_token)
            .json(answers);
        Self::expect_2xx(self.with_origin(req, request_ip).send().await?).await?;
        Ok(())
    }

    // ── Skin change ──────────────────────────────────────────────────────

    /// `POST /minecraft/profile/skins` with a JSON `{variant, url}` body.
    pub async fn change_skin_url(
        &self,
        access_token: &str,
        variant: &str,
        url: &str,
        request_ip: Option<&str>,
    ) -> Result<(), MojangError> {
        let body = json!({ "variant": variant, "url": url });
        let req = self
            .http
            .post(format!(
                "{}/minecraft/profile/skins",
                self.config.services_base
            ))
            .bearer_auth(access_token)
            .json(&body);
        Self::expect_2xx(self.with_origin(req, request_ip).send().await?).await?;
        Ok(())
    }

    /// `POST /minecraft/profile/skins` with a multipart `{variant, file}`
    /// body carrying the PNG bytes.
    pub async fn change_skin_file(
        &self,
        access_token: &str,
        variant: &str,
        png_bytes: Vec<u8>,
        request_ip: Option<&str>,
    ) -> Result<(), MojangError> {
        let file = reqwest::multipart::Part::bytes(png_bytes)
            .file_name("skin.png")
            .mime_str("image/png")?;
        let form = reqwest::multipart::Form::new()
            .text("variant", variant.to_string())
            .part("file", file);
        let req = self
            .http
            .post(format!(
                "{}/minecraft/profile/skins",
                self.config.services_base
            ))
            .bearer_auth(access_token)
            .multipart(form);
        Self::expect_2xx(self.with_origin(req, request_ip).send().await?).await?;
        Ok(())
    }

    // ── Profiles ─────────────────────────────────────────────────────────

    /// `GET /minecraft/profile` for the bearer account.
    pub async fn current_profile(
        &self,
        access_token: &str,
        request_ip: Option<&str>,
    ) -> Result<MinimalProfile, MojangError> {
        let req = self
            .http
            .get(format!("{}/minecraft/profile", self.config.services_base))
            .bearer_auth(access_token);
        let response = Self::expect_2xx(self.with_origin(req, request_ip).send().await?).await?;
        Ok(response.json().await?)
    }

    /// `GET /session/minecraft/profile/{uuid}?unsigned=false` — the signed
    /// texture descriptor for any profile.
    pub async fn signed_profile(
        &self,
        short_uuid: &str,
        request_ip: Option<&str>,
    ) -> Result<crate::profile::SignedProfile, MojangError> {
        let req = self.http.get(format!(
            "{}/session/minecraft/profile/{}?unsigned=false",
            self.config.session_base, short_uuid
        ));
        let response = Self::expect_2xx(self.with_origin(req, request_ip).send().await?).await?;
        tracing::debug!(uuid = short_uuid, "Fetched signed profile");
        Ok(response.json().await?)
    }
}

//! Per-account token lifecycle against the upstream auth server.
//!
//! `ensure_authenticated` walks the token state machine: a stored access
//! token is validated; an invalid one is refreshed; a failed refresh falls
//! back to a full login with the decrypted password. Security-question
//! challenges are completed on demand after any of the three paths.

use std::sync::Arc;

use skinforge_core::error::GenerateError;
use skinforge_core::secrets::{SecretCodec, SecretError};
use skinforge_db::catalog::Catalog;
use skinforge_db::models::account::Account;
use skinforge_mojang::client::SecurityAnswer;
use skinforge_mojang::{MojangClient, MojangError};

use super::EngineError;

/// Drives the validate → refresh → login state machine.
pub struct Authenticator {
    mojang: Arc<MojangClient>,
    codec: SecretCodec,
    catalog: Arc<dyn Catalog>,
}

impl Authenticator {
    pub fn new(mojang: Arc<MojangClient>, codec: SecretCodec, catalog: Arc<dyn Catalog>) -> Self {
        Self {
            mojang,
            codec,
            catalog,
        }
    }

    /// Ensure the account holds a working access token, persisting any token
    /// changes. `fallback_ip` is used when the account has no pinned IP.
    pub async fn ensure_authenticated(
        &self,
        account: &mut Account,
        fallback_ip: Option<&str>,
    ) -> Result<(), EngineError> {
        let pinned = account.request_ip.clone();
        let ip = pinned.as_deref().or(fallback_ip);

        if let (Some(access), Some(client_token)) =
            (account.access_token.clone(), account.client_token.clone())
        {
            match self.mojang.validate(&access, &client_token, ip).await {
                Ok(()) => {
                    self.complete_challenges(account, ip).await?;
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(
                        account_id = account.id,
                        error = %e,
                        "Access token no longer valid",
                    );
                }
            }

            match self.mojang.refresh(&access, &client_token, ip).await {
                Ok(resp) => {
                    account.access_token = Some(resp.access_token);
                    self.catalog.update_account(account).await?;
                    tracing::debug!(account_id = account.id, "Refreshed access token");
                    self.complete_challenges(account, ip).await?;
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(
                        account_id = account.id,
                        error = %e,
                        "Refresh failed, falling back to login",
                    );
                    account.access_token = None;
                }
            }
        }

        self.login(account, ip).await?;
        self.complete_challenges(account, ip).await?;
        Ok(())
    }

    /// Full login with the decrypted password and the account's stable
    /// client token (generated on first use).
    async fn login(&self, account: &mut Account, ip: Option<&str>) -> Result<(), EngineError> {
        let password = self.decrypt(&account.encrypted_password)?;

        let client_token = match &account.client_token {
            Some(token) => token.clone(),
            None => {
                let token = uuid::Uuid::new_v4().to_string();
                account.client_token = Some(token.clone());
                token
            }
        };

        match self
            .mojang
            .authenticate(&account.username, &password, &client_token, ip)
            .await
        {
            Ok(resp) => {
                account.access_token = Some(resp.access_token);
                self.catalog.update_account(account).await?;
                tracing::info!(account_id = account.id, "Logged in");
                Ok(())
            }
            Err(MojangError::Api { status, body }) => Err(GenerateError::Auth(format!(
                "login rejected ({status}): {body}"
            ))
            .into()),
            Err(e) => Err(GenerateError::Auth(e.to_string()).into()),
        }
    }

    /// Complete the security-question challenge for the current origin IP.
    ///
    /// A 2xx on the location probe means the IP is already trusted. Otherwise
    /// the single stored answer is submitted for each pending question and
    /// the probe is retried.
    async fn complete_challenges(
        &self,
        account: &Account,
        ip: Option<&str>,
    ) -> Result<(), EngineError> {
        let access = account
            .access_token
            .as_deref()
            .ok_or_else(|| GenerateError::Auth("no access token after login".to_string()))?;

        if self
            .mojang
            .security_location_ok(access, ip)
            .await
            .map_err(auth_error)?
        {
            return Ok(());
        }

        let challenges = self
            .mojang
            .security_challenges(access, ip)
            .await
            .map_err(auth_error)?;
        if challenges.is_empty() {
            return Err(
                GenerateError::Auth("location rejected with no pending challenges".into()).into(),
            );
        }

        let answer = match &account.encrypted_security_answer {
            Some(stored) => self.decrypt(stored)?,
            None => {
                return Err(GenerateError::Auth(
                    "security challenge pending but no answer on file".into(),
                )
                .into());
            }
        };

        let answers: Vec<SecurityAnswer> = challenges
            .iter()
            .map(|c| SecurityAnswer {
                id: c.answer.id,
                answer: answer.clone(),
            })
            .collect();
        self.mojang
            .submit_security_answers(access, &answers, ip)
            .await
            .map_err(auth_error)?;

        if !self
            .mojang
            .security_location_ok(access, ip)
            .await
            .map_err(auth_error)?
        {
            return Err(GenerateError::Auth("security answers were not accepted".into()).into());
        }

        tracing::info!(account_id = account.id, "Completed security challenges");
        Ok(())
    }

    fn decrypt(&self, stored: &str) -> Result<String, EngineError> {
        self.codec.decrypt(stored).map_err(|e: SecretError| {
            tracing::error!(error = %e, "Failed to decrypt stored credential");
            GenerateError::CredentialUnreadable.into()
        })
    }
}

/// Map an upstream transport/API failure on the auth path.
fn auth_error(e: MojangError) -> EngineError {
    GenerateError::Auth(e.to_string()).into()
}

use super::{FirebaseConfig, rest_error, transport};
use crate::{
    APP_USER_AGENT,
    provider::{
        IdentityProvider, ProviderError, SessionBroadcaster, SessionSubscription, TokenSource,
    },
    session::Identity,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::json;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{Instrument, debug, info_span, instrument};

struct ProviderSession {
    identity: Identity,
    id_token: SecretString,
    refresh_token: SecretString,
}

#[derive(Default)]
struct Sessions {
    current: Option<ProviderSession>,
    staged: Option<ProviderSession>,
}

impl Sessions {
    fn token_for(&self, identity_id: &str) -> Option<SecretString> {
        [self.current.as_ref(), self.staged.as_ref()]
            .into_iter()
            .flatten()
            .find(|session| session.identity.id == identity_id)
            .map(|session| session.id_token.clone())
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenResponse {
    id_token: String,
    #[serde(default)]
    refresh_token: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    email_verified: bool,
    created_at: Option<String>,
    last_login_at: Option<String>,
}

impl LookupUser {
    fn into_identity(self) -> Identity {
        Identity {
            id: self.local_id,
            email: self.email,
            email_verified: self.email_verified,
            created_at: parse_millis(self.created_at.as_deref()),
            last_sign_in_at: parse_millis(self.last_login_at.as_deref()),
        }
    }
}

#[derive(Deserialize)]
struct EmailResponse {
    #[serde(default)]
    email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

fn parse_millis(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|millis| millis.parse::<i64>().ok())
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
}

/// Identity provider backed by the Identity Toolkit REST API.
///
/// Sessions are client-side: ID and refresh tokens are held in memory, and
/// signing out just drops them.
pub struct FirebaseAuth {
    client: Client,
    config: FirebaseConfig,
    sessions: Mutex<Sessions>,
    broadcaster: SessionBroadcaster,
}

impl FirebaseAuth {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: FirebaseConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.timeout)
            .build()
            .context("failed to build identity toolkit client")?;

        Ok(Self {
            client,
            config,
            sessions: Mutex::new(Sessions::default()),
            broadcaster: SessionBroadcaster::new(),
        })
    }

    fn sessions(&self) -> MutexGuard<'_, Sessions> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn call<B, R>(&self, method: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned + Send,
    {
        let url = self.config.endpoint(method);
        let span = info_span!("identity_toolkit.request", http.method = "POST", rpc = method);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.expose_secret())])
            .json(body)
            .send()
            .instrument(span)
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(rpc = method, %status, "identity toolkit rejected request");
            return Err(rest_error(status, &body));
        }

        response
            .json::<R>()
            .await
            .map_err(|err| ProviderError::Response(err.without_url().to_string()))
    }

    async fn password_session(
        &self,
        method: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<ProviderSession, ProviderError> {
        let tokens: TokenResponse = self
            .call(
                method,
                &Credentials {
                    email,
                    password: password.expose_secret(),
                    return_secure_token: true,
                },
            )
            .await?;

        let id_token = SecretString::from(tokens.id_token);
        let identity = self.lookup(&id_token).await?;
        Ok(ProviderSession {
            identity,
            id_token,
            refresh_token: SecretString::from(tokens.refresh_token),
        })
    }

    async fn lookup(&self, id_token: &SecretString) -> Result<Identity, ProviderError> {
        let response: LookupResponse = self
            .call("lookup", &json!({ "idToken": id_token.expose_secret() }))
            .await?;
        response
            .users
            .into_iter()
            .next()
            .map(LookupUser::into_identity)
            .ok_or_else(|| ProviderError::Response("lookup returned no user".to_string()))
    }

    /// Whether a refresh token is held for the current session.
    #[must_use]
    pub fn has_refresh_token(&self) -> bool {
        self.sessions()
            .current
            .as_ref()
            .is_some_and(|session| !session.refresh_token.expose_secret().is_empty())
    }
}

#[async_trait]
impl IdentityProvider for FirebaseAuth {
    fn subscribe_session_changes(&self) -> SessionSubscription {
        self.broadcaster.subscribe()
    }

    #[instrument(skip(self, password))]
    async fn create_account(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, ProviderError> {
        let session = self.password_session("signUp", email, password).await?;
        let identity = session.identity.clone();
        {
            let mut sessions = self.sessions();
            sessions.staged = None;
            sessions.current = Some(session);
        }
        self.broadcaster.publish(Some(identity.clone()));
        Ok(identity)
    }

    #[instrument(skip(self, password))]
    async fn authenticate(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<Identity, ProviderError> {
        let session = self
            .password_session("signInWithPassword", email, password)
            .await?;
        let identity = session.identity.clone();
        self.sessions().staged = Some(session);
        Ok(identity)
    }

    async fn establish_session(&self, identity: &Identity) -> Result<(), ProviderError> {
        let established = {
            let mut sessions = self.sessions();
            match sessions.staged.take() {
                Some(staged) if staged.identity.id == identity.id => {
                    let established = staged.identity.clone();
                    sessions.current = Some(staged);
                    established
                }
                other => {
                    sessions.staged = other;
                    return Err(ProviderError::NoStagedSession);
                }
            }
        };
        self.broadcaster.publish(Some(established));
        Ok(())
    }

    fn discard_staged_session(&self) {
        self.sessions().staged = None;
    }

    async fn sign_out_current(&self) -> Result<(), ProviderError> {
        let had_current = {
            let mut sessions = self.sessions();
            sessions.staged = None;
            sessions.current.take().is_some()
        };
        if had_current {
            self.broadcaster.publish(None);
        }
        Ok(())
    }

    #[instrument(skip(self, identity), fields(identity_id = %identity.id))]
    async fn send_verification_message(&self, identity: &Identity) -> Result<(), ProviderError> {
        let id_token = self
            .sessions()
            .token_for(&identity.id)
            .ok_or(ProviderError::NoActiveSession)?;
        let _: EmailResponse = self
            .call(
                "sendOobCode",
                &json!({
                    "requestType": "VERIFY_EMAIL",
                    "idToken": id_token.expose_secret(),
                }),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn apply_verification_code(&self, code: &str) -> Result<(), ProviderError> {
        let _: EmailResponse = self.call("update", &json!({ "oobCode": code })).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn send_password_reset_message(&self, email: &str) -> Result<(), ProviderError> {
        let _: EmailResponse = self
            .call(
                "sendOobCode",
                &json!({ "requestType": "PASSWORD_RESET", "email": email }),
            )
            .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn verify_reset_code(&self, code: &str) -> Result<String, ProviderError> {
        let response: EmailResponse = self
            .call("resetPassword", &json!({ "oobCode": code }))
            .await?;
        Ok(response.email)
    }

    #[instrument(skip_all)]
    async fn confirm_password_reset(
        &self,
        code: &str,
        new_password: &SecretString,
    ) -> Result<(), ProviderError> {
        let _: EmailResponse = self
            .call(
                "resetPassword",
                &json!({
                    "oobCode": code,
                    "newPassword": new_password.expose_secret(),
                }),
            )
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TokenSource for FirebaseAuth {
    async fn id_token(&self, identity_id: &str) -> Option<SecretString> {
        self.sessions().token_for(identity_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthError, AuthService};
    use serde_json::Value;
    use std::{net::TcpListener, sync::Arc};
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }

    fn auth_for(server: &MockServer) -> Result<FirebaseAuth> {
        FirebaseAuth::new(FirebaseConfig::new(secret("test-key")).with_auth_url(server.uri()))
    }

    async fn mount_sign_in(server: &MockServer, method_name: &str, verified: bool) {
        Mock::given(method("POST"))
            .and(path(format!("/v1/accounts:{method_name}")))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(serde_json::json!({
                "email": "a@x.com",
                "returnSecureToken": true
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "localId": "uid-1",
                "email": "a@x.com",
                "idToken": "id-token-1",
                "refreshToken": "refresh-1",
                "expiresIn": "3600"
            })))
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/accounts:lookup"))
            .and(body_partial_json(serde_json::json!({ "idToken": "id-token-1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "users": [{
                    "localId": "uid-1",
                    "email": "a@x.com",
                    "emailVerified": verified,
                    "createdAt": "1714550400000",
                    "lastLoginAt": "1714550400000"
                }]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn sign_up_publishes_unverified_identity() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_sign_in(&server, "signUp", false).await;

        let auth = auth_for(&server)?;
        let mut subscription = auth.subscribe_session_changes();
        assert_eq!(subscription.recv().await, Some(None));

        let identity = auth.create_account("a@x.com", &secret("secret1")).await?;
        assert_eq!(identity.id, "uid-1");
        assert!(!identity.email_verified);
        assert_eq!(
            identity.created_at,
            Utc.timestamp_millis_opt(1_714_550_400_000).single()
        );
        assert_eq!(subscription.recv().await, Some(Some(identity.clone())));
        assert!(auth.has_refresh_token());
        assert_eq!(
            auth.id_token("uid-1")
                .await
                .map(|token| token.expose_secret().to_string()),
            Some("id-token-1".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn unverified_sign_in_is_never_published() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        mount_sign_in(&server, "signInWithPassword", false).await;

        let auth = Arc::new(auth_for(&server)?);
        let mut subscription = auth.subscribe_session_changes();
        assert_eq!(subscription.recv().await, Some(None));

        let service = AuthService::new(auth.clone());
        assert_eq!(
            service.sign_in("a@x.com", &secret("secret1")).await,
            Err(AuthError::EmailNotVerified)
        );
        assert!(auth.id_token("uid-1").await.is_none());

        drop(auth);
        drop(service);
        assert_eq!(subscription.recv().await, None);
        Ok(())
    }

    #[tokio::test]
    async fn rest_errors_map_to_taxonomy() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signUp"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "code": 400, "message": "EMAIL_EXISTS", "errors": [] }
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:sendOobCode"))
            .and(body_partial_json(serde_json::json!({ "requestType": "PASSWORD_RESET" })))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "code": 400, "message": "EMAIL_NOT_FOUND" }
            })))
            .mount(&server)
            .await;

        let service = AuthService::new(Arc::new(auth_for(&server)?));
        assert_eq!(
            service.sign_up("a@x.com", &secret("secret1")).await,
            Err(AuthError::AccountExists)
        );
        assert_eq!(
            service.request_password_reset("ghost@x.com").await,
            Err(AuthError::AccountNotFound)
        );
        Ok(())
    }

    #[tokio::test]
    async fn verify_reset_code_returns_email() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:resetPassword"))
            .and(body_partial_json(serde_json::json!({ "oobCode": "reset-code" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "email": "a@x.com",
                "requestType": "PASSWORD_RESET"
            })))
            .mount(&server)
            .await;

        let auth = auth_for(&server)?;
        assert_eq!(auth.verify_reset_code("reset-code").await?, "a@x.com");

        let requests = server.received_requests().await.unwrap_or_default();
        let body: Value = serde_json::from_slice(&requests[0].body)?;
        assert!(body.get("newPassword").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn unreachable_backend_is_transport_error() -> Result<()> {
        let auth = FirebaseAuth::new(
            FirebaseConfig::new(secret("test-key")).with_auth_url("http://127.0.0.1:9"),
        )?;
        assert!(matches!(
            auth.send_password_reset_message("a@x.com").await,
            Err(ProviderError::Transport(_))
        ));
        Ok(())
    }
}

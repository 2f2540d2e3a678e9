use crate::{
    APP_USER_AGENT,
    profile::ProfileRecord,
    provider::{ProfileStore, RecordAccess, StoreError, TokenSource},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tracing::{Instrument, info_span};
use url::Url;

const RECORD_ROOT: &str = "userList";

/// Profile store on the Realtime Database REST API, authorised with the ID
/// token of the identity whose record is accessed.
pub struct RealtimeDatabase {
    client: Client,
    base_url: Url,
    tokens: Arc<dyn TokenSource>,
}

impl RealtimeDatabase {
    /// # Errors
    /// Returns an error if `database_url` is not an absolute URL or the HTTP
    /// client cannot be built.
    pub fn new(database_url: &str, tokens: Arc<dyn TokenSource>, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(database_url)
            .with_context(|| format!("invalid database URL: {database_url}"))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("database URL cannot be a base: {database_url}");
        }

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("failed to build database client")?;

        Ok(Self {
            client,
            base_url,
            tokens,
        })
    }

    /// `{base}/userList/{identity_id}.json`, with the id percent-encoded.
    fn record_url(&self, identity_id: &str) -> Result<Url, StoreError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| StoreError::Transport("database URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(RECORD_ROOT)
            .push(&format!("{identity_id}.json"));
        Ok(url)
    }
}

/// The ID token captured in `access`, as a query value.
fn bearer(access: &RecordAccess) -> Result<&str, StoreError> {
    access
        .token()
        .map(|token| token.expose_secret())
        .ok_or(StoreError::Unauthorized)
}

fn status_error(status: StatusCode, body: &str) -> StoreError {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        StoreError::Unauthorized
    } else {
        StoreError::Transport(format!("{status} {}", body.trim()))
    }
}

fn transport(err: reqwest::Error) -> StoreError {
    StoreError::Transport(err.without_url().to_string())
}

#[async_trait]
impl ProfileStore for RealtimeDatabase {
    async fn authorize(&self, identity_id: &str) -> Result<RecordAccess, StoreError> {
        let token = self
            .tokens
            .id_token(identity_id)
            .await
            .ok_or(StoreError::Unauthorized)?;
        Ok(RecordAccess::new(identity_id, Some(token)))
    }

    async fn read_record(
        &self,
        access: &RecordAccess,
    ) -> Result<Option<ProfileRecord>, StoreError> {
        let identity_id = access.identity_id();
        let url = self.record_url(identity_id)?;
        let token = bearer(access)?;
        let span = info_span!("profile_store.read", http.method = "GET", identity_id);

        let response = self
            .client
            .get(url)
            .query(&[("auth", token)])
            .send()
            .instrument(span)
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let value: Value = response
            .json()
            .await
            .map_err(|err| StoreError::Malformed(err.without_url().to_string()))?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|err| StoreError::Malformed(err.to_string()))
    }

    async fn write_record(
        &self,
        access: &RecordAccess,
        record: &ProfileRecord,
    ) -> Result<(), StoreError> {
        let identity_id = access.identity_id();
        let url = self.record_url(identity_id)?;
        let token = bearer(access)?;
        let span = info_span!("profile_store.write", http.method = "PUT", identity_id);

        let response = self
            .client
            .put(url)
            .query(&[("auth", token)])
            .json(record)
            .send()
            .instrument(span)
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use serde_json::json;
    use std::net::TcpListener;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FixedToken;

    #[async_trait]
    impl TokenSource for FixedToken {
        async fn id_token(&self, identity_id: &str) -> Option<SecretString> {
            (identity_id == "uid-1").then(|| SecretString::from("id-token-1".to_string()))
        }
    }

    fn can_bind_localhost() -> bool {
        TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn database(server: &MockServer) -> Result<RealtimeDatabase> {
        RealtimeDatabase::new(&server.uri(), Arc::new(FixedToken), Duration::from_secs(5))
    }

    #[test]
    fn record_url_encodes_identity() -> Result<()> {
        let database = RealtimeDatabase::new(
            "https://demo.firebaseio.com/",
            Arc::new(FixedToken),
            Duration::from_secs(5),
        )?;
        assert_eq!(
            database.record_url("uid-1").map(String::from).ok(),
            Some("https://demo.firebaseio.com/userList/uid-1.json".to_string())
        );
        assert_eq!(
            database.record_url("../x").map(String::from).ok(),
            Some("https://demo.firebaseio.com/userList/..%2Fx.json".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn read_null_is_absent() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userList/uid-1.json"))
            .and(query_param("auth", "id-token-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(Value::Null))
            .mount(&server)
            .await;

        let database = database(&server)?;
        let access = database.authorize("uid-1").await?;
        assert_eq!(database.read_record(&access).await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn read_existing_record() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/userList/uid-1.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "displayName": "Ada",
                "email": "a@x.com",
                "createdAt": "Wed, 01 May 2024 08:00:00 GMT"
            })))
            .mount(&server)
            .await;

        let database = database(&server)?;
        let access = database.authorize("uid-1").await?;
        let record = database.read_record(&access).await?;
        assert_eq!(
            record.map(|record| record.display_name),
            Some("Ada".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn write_puts_camel_case_record() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/userList/uid-1.json"))
            .and(query_param("auth", "id-token-1"))
            .and(body_partial_json(json!({
                "displayName": "Ada",
                "email": "a@x.com"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let record = ProfileRecord {
            display_name: "Ada".to_string(),
            email: "a@x.com".to_string(),
            ..ProfileRecord::default()
        };
        let database = database(&server)?;
        let access = database.authorize("uid-1").await?;
        database.write_record(&access, &record).await?;
        Ok(())
    }

    #[tokio::test]
    async fn denied_access_is_unauthorized() -> Result<()> {
        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "Permission denied"
            })))
            .mount(&server)
            .await;

        let database = database(&server)?;
        let access = database.authorize("uid-1").await?;
        assert_eq!(
            database.read_record(&access).await,
            Err(StoreError::Unauthorized)
        );
        assert_eq!(
            database.authorize("someone-else").await.err(),
            Some(StoreError::Unauthorized)
        );
        assert_eq!(
            database
                .read_record(&RecordAccess::new("uid-1", None))
                .await,
            Err(StoreError::Unauthorized)
        );
        Ok(())
    }

    #[tokio::test]
    async fn sign_out_during_save_still_writes() -> Result<()> {
        use crate::{
            profile::{ProfileDraft, ProfileService},
            provider::{
                IdentityProvider,
                firebase::{FirebaseAuth, FirebaseConfig},
            },
        };

        if !can_bind_localhost() {
            eprintln!("Skipping test: cannot bind localhost");
            return Ok(());
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:signInWithPassword"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "localId": "uid-1",
                "email": "a@x.com",
                "idToken": "id-token-1",
                "refreshToken": "refresh-1"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/accounts:lookup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "users": [{ "localId": "uid-1", "email": "a@x.com", "emailVerified": true }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/userList/uid-1.json"))
            .and(query_param("auth", "id-token-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(Value::Null)
                    .set_delay(Duration::from_millis(300)),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/userList/uid-1.json"))
            .and(query_param("auth", "id-token-1"))
            .and(body_partial_json(json!({ "displayName": "Ada" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let auth = Arc::new(FirebaseAuth::new(
            FirebaseConfig::new(SecretString::from("test-key".to_string()))
                .with_auth_url(server.uri()),
        )?);
        let identity = auth
            .authenticate("a@x.com", &SecretString::from("secret1".to_string()))
            .await?;
        auth.establish_session(&identity).await?;

        let database = RealtimeDatabase::new(&server.uri(), auth.clone(), Duration::from_secs(5))?;
        let profiles = ProfileService::new(Arc::new(database));
        let draft = ProfileDraft::default().with_display_name("Ada");

        let (saved, signed_out) = tokio::join!(profiles.save(&identity, &draft), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            auth.sign_out_current().await
        });
        signed_out?;
        assert_eq!(saved?.display_name, "Ada");
        assert!(auth.id_token("uid-1").await.is_none());
        Ok(())
    }
}

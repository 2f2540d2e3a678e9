//! One browsing session: connected backends plus the session state holder.

use crate::{
    auth::{AuthError, AuthService, Locale},
    cli::globals::{Backend, GlobalArgs},
    gate::{self, GateDecision},
    profile::ProfileService,
    provider::{
        IdentityProvider, ProfileStore, TokenSource,
        firebase::{FirebaseAuth, FirebaseConfig, RealtimeDatabase},
        memory::{InMemoryIdentityProvider, InMemoryProfileStore},
    },
    session::{Identity, SessionHolder, SessionSnapshot},
};
use anyhow::{Context, Result, anyhow};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tokio::time::timeout;
use tracing::{debug, warn};

const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

pub struct Portal {
    pub auth: AuthService,
    profiles: Option<ProfileService>,
    session: SessionHolder,
    locale: Locale,
}

type Backends = (Arc<dyn IdentityProvider>, Option<Arc<dyn ProfileStore>>);

fn connect(globals: &GlobalArgs) -> Result<Backends> {
    match globals.backend {
        Backend::Memory => {
            let provider: Arc<dyn IdentityProvider> = Arc::new(InMemoryIdentityProvider::new());
            let store: Arc<dyn ProfileStore> = Arc::new(InMemoryProfileStore::new());
            Ok((provider, Some(store)))
        }
        Backend::Firebase => {
            let config = FirebaseConfig::new(globals.api_key.clone())
                .with_auth_url(globals.auth_url.clone())
                .with_timeout(globals.timeout);
            let auth = Arc::new(FirebaseAuth::new(config)?);

            let store = match &globals.database_url {
                Some(url) => {
                    let tokens: Arc<dyn TokenSource> = auth.clone();
                    let database: Arc<dyn ProfileStore> =
                        Arc::new(RealtimeDatabase::new(url, tokens, globals.timeout)?);
                    Some(database)
                }
                None => None,
            };
            let provider: Arc<dyn IdentityProvider> = auth;
            Ok((provider, store))
        }
    }
}

impl Portal {
    /// Connect the configured backend and wait for the first session report.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be set up or never reports.
    pub async fn open(globals: &GlobalArgs) -> Result<Self> {
        let (provider, store) = connect(globals)?;

        let session = SessionHolder::start(provider.as_ref());
        let snapshot = timeout(SETTLE_TIMEOUT, session.settled())
            .await
            .context("identity provider did not report a session")?;
        debug!(signed_in = snapshot.is_signed_in(), "session settled");

        Ok(Self {
            auth: AuthService::new(provider),
            profiles: store.map(ProfileService::new),
            session,
            locale: globals.locale,
        })
    }

    #[must_use]
    pub const fn locale(&self) -> Locale {
        self.locale
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.session.snapshot()
    }

    /// # Errors
    /// Returns an error if no profile store is configured.
    pub fn profiles(&self) -> Result<&ProfileService> {
        self.profiles
            .as_ref()
            .context("missing required argument: --database-url (needed for profile commands)")
    }

    /// Sign in and wait until the session holder reports the identity.
    ///
    /// # Errors
    /// Returns the localized sign-in failure, or an error if the session
    /// change never arrives.
    pub async fn sign_in(&self, email: &str, password: &SecretString) -> Result<Identity> {
        let identity = self
            .auth
            .sign_in(email, password)
            .await
            .map_err(|err| self.user_error(&err))?;
        self.await_identity(&identity).await?;
        Ok(identity)
    }

    /// Wait until the holder's snapshot carries `identity`.
    ///
    /// # Errors
    /// Returns an error if the change does not arrive in time.
    pub async fn await_identity(&self, identity: &Identity) -> Result<SessionSnapshot> {
        timeout(
            SETTLE_TIMEOUT,
            self.session.wait_for(|snapshot| {
                snapshot
                    .current_identity()
                    .is_some_and(|current| current.id == identity.id)
            }),
        )
        .await
        .context("session change was not observed")
    }

    /// Gate decision for `path` against the latest snapshot.
    #[must_use]
    pub fn navigate(&self, path: &str) -> GateDecision {
        gate::evaluate(&self.session.snapshot(), path)
    }

    /// Localized error for the user; the technical detail goes to the log.
    #[must_use]
    pub fn user_error(&self, err: &AuthError) -> anyhow::Error {
        debug!("operation failed: {err}");
        anyhow!(err.localized(self.locale))
    }

    /// End the browsing session: sign out and stop listening.
    pub async fn close(self) {
        if self.session.snapshot().is_signed_in()
            && let Err(err) = self.auth.sign_out().await
        {
            warn!("sign-out on exit failed: {err}");
        }
        self.session.shutdown();
    }
}

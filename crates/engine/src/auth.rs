//! Authentication and mediated-deposit authorization.
//!
//! A request carries HTTP Basic credentials and, optionally, an On-Behalf-Of
//! target when one user deposits for another. Both checks run before any
//! payload byte is examined, so a rejected request never triggers an ingest.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use scabbard_config::{OboValidation, SecurityPolicy, SwordConfig, UserConfig};
use std::sync::Arc;

/// Credentials presented on a request.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}
impl Credentials {
    pub fn new(username: impl Into<String>, secret: impl Into<String>) -> Self {
        Self { username: username.into(), secret: secret.into() }
    }
}

/// The authenticated identity a request acts as, valid for the lifetime of
/// that request only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Principal {
    /// The authenticated depositor.
    pub identity: String,
    /// The party the deposit is made on behalf of, when mediated.
    pub on_behalf_of: Option<String>,
}

/// Shared handle to an authenticator.
pub type AuthHandle = Arc<dyn Authenticator + Send + Sync>;

/// Verifies credentials and authorizes mediated deposits.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Verify credentials and produce a [`Principal`].
    async fn authenticate(&self, credentials: &Credentials) -> Result<Principal>;

    /// Authorize the principal to deposit on behalf of `target`, extending
    /// the principal with the mediation target on success.
    async fn authorize_on_behalf_of(&self, principal: Principal, target: &str) -> Result<Principal>;
}

/// Authenticator backed by the static user directory in configuration.
pub struct ConfigAuthenticator {
    policy: SecurityPolicy,
    users: Vec<UserConfig>,
    obo_targets: Vec<String>,
}

impl ConfigAuthenticator {
    pub fn new(policy: SecurityPolicy, users: Vec<UserConfig>, obo_targets: Vec<String>) -> Self {
        Self { policy, users, obo_targets }
    }

    pub fn from_config(config: &SwordConfig) -> Self {
        Self::new(config.security.clone(), config.users.clone(), config.obo_targets.clone())
    }
}

#[async_trait]
impl Authenticator for ConfigAuthenticator {
    #[tracing::instrument(skip_all, fields(username = %credentials.username))]
    async fn authenticate(&self, credentials: &Credentials) -> Result<Principal> {
        if !self.policy.authenticate {
            // The switch exists so a deployment can be exercised without
            // credential checks; requests pass through as the identity
            // they claim.
            let identity = if credentials.username.is_empty() {
                "anonymous".to_string()
            } else {
                credentials.username.clone()
            };
            return Ok(Principal { identity, on_behalf_of: None });
        }
        let known = self
            .users
            .iter()
            .any(|user| user.username == credentials.username && user.password == credentials.secret);
        if !known {
            tracing::warn!("authentication failed");
            exn::bail!(ErrorKind::InvalidCredentials);
        }
        Ok(Principal { identity: credentials.username.clone(), on_behalf_of: None })
    }

    #[tracing::instrument(skip_all, fields(identity = %principal.identity, obo = %target))]
    async fn authorize_on_behalf_of(&self, principal: Principal, target: &str) -> Result<Principal> {
        if !self.policy.mediation {
            exn::bail!(ErrorKind::MediationNotPermitted);
        }
        if self.policy.obo_validation == OboValidation::KnownTargets {
            // Checking the target against the directory only means anything
            // when the depositor's own identity has been verified.
            if !self.policy.authenticate {
                exn::bail!(ErrorKind::AuthDisabled);
            }
            if !self.obo_targets.iter().any(|known| known == target) {
                exn::bail!(ErrorKind::UnknownOboTarget(target.to_string()));
            }
        }
        Ok(Principal { on_behalf_of: Some(target.to_string()), ..principal })
    }
}

//! # Google OAuth 2.0 implementation
//!
//! Implements the Google Authorization Code flow with PKCE.
//!
//! ## Types
//!
//! - [`OAuthProvider`]: the seam the web routes call through, so tests can stand in a
//!   fake provider.
//! - [`GoogleUser`]: deserialization target for the Google userinfo response
//!   (`googleapis.com/oauth2/v3/userinfo`).
//! - [`ConfiguredClient`]: a fully-typed `oauth2::Client` alias with auth and token
//!   endpoints set.
//! - [`GoogleOAuth`]: the provider that wraps an [`OAuthConfig`].
//!
//! ## Flow
//!
//! 1. **[`authorize_url`](OAuthProvider::authorize_url)**: builds an authorization URL
//!    requesting the `openid`, `email`, and `profile` scopes, with a random CSRF state
//!    and PKCE challenge. The state and verifier come back as a [`PendingOAuth`] which
//!    the caller keeps in the session.
//!
//! 2. **[`exchange_code`](OAuthProvider::exchange_code)**: called by the
//!    `/auth/google/callback` route after it has matched the returned state against
//!    the pending one. It exchanges the code + PKCE verifier for an access token and
//!    fetches the profile. Only a verified email is accepted.

use async_trait::async_trait;
use oauth2::basic::BasicClient;
use oauth2::{
    AuthorizationCode, CsrfToken, EndpointNotSet, EndpointSet, PkceCodeChallenge,
    PkceCodeVerifier, Scope, TokenResponse,
};
use reqwest::Client;
use serde::Deserialize;

use super::config::OAuthConfig;
use super::resolver::ExternalProfile;
use super::session::PendingOAuth;
use crate::error::OAuthError;

const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Short provider name, e.g. `"google"`.
    fn name(&self) -> &'static str;

    /// Consent URL plus the state to keep until the callback.
    fn authorize_url(&self) -> (String, PendingOAuth);

    /// Trade an authorization code for the user's verified profile.
    async fn exchange_code(&self, code: &str, pending: PendingOAuth) -> Result<ExternalProfile, OAuthError>;
}

/// Google user info from API.
#[derive(Debug, Deserialize)]
struct GoogleUser {
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Google OAuth handler.
pub struct GoogleOAuth {
    config: OAuthConfig,
    http: Client,
}

impl GoogleOAuth {
    pub fn new(config: OAuthConfig) -> Result<Self, OAuthError> {
        // Token endpoint responses must not be followed as redirects.
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self { config, http })
    }

    fn create_client(&self) -> ConfiguredClient {
        BasicClient::new(self.config.client_id.clone())
            .set_client_secret(self.config.client_secret.clone())
            .set_auth_uri(self.config.auth_url.clone())
            .set_token_uri(self.config.token_url.clone())
            .set_redirect_uri(self.config.redirect_url.clone())
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuth {
    fn name(&self) -> &'static str {
        "google"
    }

    fn authorize_url(&self) -> (String, PendingOAuth) {
        let client = self.create_client();
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (auth_url, csrf_state) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        let pending = PendingOAuth {
            state: csrf_state.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        };
        (auth_url.to_string(), pending)
    }

    async fn exchange_code(&self, code: &str, pending: PendingOAuth) -> Result<ExternalProfile, OAuthError> {
        let client = self.create_client();

        let token_result = client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pending.pkce_verifier))
            .request_async(&self.http)
            .await
            .map_err(|e| OAuthError::Exchange(e.to_string()))?;

        let access_token = token_result.access_token().secret();

        let google_user: GoogleUser = self
            .http
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        match google_user.email {
            Some(email) if google_user.email_verified => Ok(ExternalProfile {
                provider: self.name(),
                email,
            }),
            _ => Err(OAuthError::UnverifiedEmail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::GoogleSettings;

    fn google() -> GoogleOAuth {
        let settings = GoogleSettings {
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            callback_url: "http://localhost:3000/auth/google/callback".into(),
        };
        GoogleOAuth::new(OAuthConfig::google(&settings).unwrap()).unwrap()
    }

    #[test]
    fn test_authorize_url_requests_profile_and_email() {
        let (url, pending) = google().authorize_url();
        let url = oauth2::url::Url::parse(&url).unwrap();
        let params: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(params["client_id"], "client-id");
        assert_eq!(params["state"], pending.state);
        assert_eq!(params["code_challenge_method"], "S256");
        let scopes: Vec<&str> = params["scope"].split(' ').collect();
        assert!(scopes.contains(&"profile"));
        assert!(scopes.contains(&"email"));
    }

    #[test]
    fn test_each_flow_gets_fresh_state() {
        let provider = google();
        let (_, first) = provider.authorize_url();
        let (_, second) = provider.authorize_url();
        assert_ne!(first.state, second.state);
        assert_ne!(first.pkce_verifier, second.pkce_verifier);
    }

    #[test]
    fn test_userinfo_parsing() {
        let user: GoogleUser =
            serde_json::from_str(r#"{"sub":"1","email":"a@x.com","email_verified":true}"#).unwrap();
        assert_eq!(user.email.as_deref(), Some("a@x.com"));
        assert!(user.email_verified);

        let user: GoogleUser = serde_json::from_str(r#"{"sub":"1"}"#).unwrap();
        assert!(user.email.is_none());
        assert!(!user.email_verified);
    }
}

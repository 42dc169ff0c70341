//! OAuth provider configuration.

use oauth2::{AuthUrl, ClientId, ClientSecret, RedirectUrl, TokenUrl};

use crate::error::OAuthError;
use crate::settings::GoogleSettings;

/// OAuth provider configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: ClientId,
    pub client_secret: ClientSecret,
    pub auth_url: AuthUrl,
    pub token_url: TokenUrl,
    pub redirect_url: RedirectUrl,
}

impl OAuthConfig {
    /// Google OAuth config from the loaded settings.
    pub fn google(settings: &GoogleSettings) -> Result<Self, OAuthError> {
        Ok(Self {
            client_id: ClientId::new(settings.client_id.clone()),
            client_secret: ClientSecret::new(settings.client_secret.clone()),
            auth_url: AuthUrl::new("https://accounts.google.com/o/oauth2/v2/auth".to_string())?,
            token_url: TokenUrl::new("https://oauth2.googleapis.com/token".to_string())?,
            redirect_url: RedirectUrl::new(settings.callback_url.clone())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_config() {
        let settings = GoogleSettings {
            client_id: "id".into(),
            client_secret: "secret".into(),
            callback_url: "http://localhost:3000/auth/google/callback".into(),
        };
        let config = OAuthConfig::google(&settings).unwrap();
        assert_eq!(config.client_id.as_str(), "id");
        assert_eq!(
            config.redirect_url.as_str(),
            "http://localhost:3000/auth/google/callback"
        );
    }

    #[test]
    fn test_invalid_callback_url() {
        let settings = GoogleSettings {
            client_id: "id".into(),
            client_secret: "secret".into(),
            callback_url: "not a url".into(),
        };
        assert!(matches!(
            OAuthConfig::google(&settings),
            Err(OAuthError::InvalidUrl(_))
        ));
    }
}

use std::path::Path;

use chrono::Utc;

use crate::{config, error::TokenError, types::Token};

pub const TOKEN_FILE: &str = "token.json";

/// Seconds before the recorded expiry at which a token is no longer used.
const EXPIRY_MARGIN_SECS: u64 = 240;

pub struct TokenManager {
    token: Token,
}

impl TokenManager {
    pub fn new(token: Token) -> Self {
        TokenManager { token }
    }

    /// Uses `GPHOTOS_ACCESS_TOKEN` when set, otherwise reads `path`.
    pub async fn load(path: &Path) -> Result<Self, TokenError> {
        if let Some(access_token) = config::access_token() {
            return Ok(Self::new(Token {
                access_token,
                refresh_token: None,
                scope: None,
                expires_in: 0,
                obtained_at: Utc::now().timestamp() as u64,
            }));
        }

        let content = async_fs::read_to_string(path)
            .await
            .map_err(|_| TokenError::Missing(path.to_path_buf()))?;
        let token: Token = serde_json::from_str(&content)
            .map_err(|e| TokenError::Invalid(path.to_path_buf(), e.to_string()))?;
        Ok(Self { token })
    }

    pub fn access_token(&self) -> Result<&str, TokenError> {
        if self.is_expired() {
            return Err(TokenError::Expired);
        }
        Ok(&self.token.access_token)
    }

    // expires_in == 0 marks a token without a known lifetime
    fn is_expired(&self) -> bool {
        if self.token.expires_in == 0 {
            return false;
        }
        let now = Utc::now().timestamp() as u64;
        let deadline = self
            .token
            .obtained_at
            .saturating_add(self.token.expires_in)
            .saturating_sub(EXPIRY_MARGIN_SECS);
        now >= deadline
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(expires_in: u64, obtained_at: u64) -> Token {
        Token {
            access_token: "ya29.test".to_string(),
            refresh_token: None,
            scope: None,
            expires_in,
            obtained_at,
        }
    }

    #[test]
    fn fresh_token_is_usable() {
        let now = Utc::now().timestamp() as u64;
        let mgr = TokenManager::new(token(3600, now));
        assert_eq!(mgr.access_token().unwrap(), "ya29.test");
    }

    #[test]
    fn token_inside_expiry_margin_is_refused() {
        let now = Utc::now().timestamp() as u64;
        let mgr = TokenManager::new(token(3600, now - 3500));
        assert!(matches!(mgr.access_token(), Err(TokenError::Expired)));
    }

    #[test]
    fn token_without_lifetime_never_expires() {
        let mgr = TokenManager::new(token(0, 0));
        assert!(mgr.access_token().is_ok());
    }
}

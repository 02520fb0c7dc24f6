//! Signed team cookie and one-shot flash cookie.

use axum::http::{HeaderMap, header};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, instrument, warn};

use crate::ConfigError;
use crate::views::Flash;

type HmacSha256 = Hmac<Sha256>;

/// Cookie carrying the signed team name.
pub const TEAM_COOKIE: &str = "team";

/// Cookie carrying pending advisory messages.
pub const FLASH_COOKIE: &str = "flash";

const FLASH_MAX_AGE_SECONDS: u32 = 60;

/// Signs and verifies team session tokens.
///
/// A token is `base64url(name) "." base64url(hmac_sha256(key, name))`.
#[derive(Clone)]
pub struct SessionSigner {
    mac: HmacSha256,
}

impl std::fmt::Debug for SessionSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSigner").finish_non_exhaustive()
    }
}

impl SessionSigner {
    /// Creates a signer keyed by `secret`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the key is rejected.
    pub fn new(secret: &str) -> Result<Self, ConfigError> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| ConfigError::new(format!("Invalid secret key: {}", e)))?;
        Ok(Self { mac })
    }

    /// Token for a team name.
    pub fn sign(&self, team: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(team.as_bytes());
        let signature = mac.finalize().into_bytes();
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(team.as_bytes()),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    /// Team name from a token, `None` if the token was tampered with.
    #[instrument(skip(self, token))]
    pub fn verify(&self, token: &str) -> Option<String> {
        let (payload, signature) = token.split_once('.')?;
        let payload = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac.clone();
        mac.update(&payload);
        if mac.verify_slice(&signature).is_err() {
            warn!("Rejected team cookie with bad signature");
            return None;
        }
        String::from_utf8(payload).ok()
    }

    /// Team name from the request cookies.
    pub fn team_from(&self, headers: &HeaderMap) -> Option<String> {
        let team = cookie(headers, TEAM_COOKIE).and_then(|token| self.verify(token));
        debug!(team = ?team, "Session resolved");
        team
    }

    /// `Set-Cookie` value storing the team.
    pub fn team_cookie(&self, team: &str) -> String {
        format!(
            "{TEAM_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
            self.sign(team)
        )
    }
}

/// Value of a request cookie.
pub fn cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// `Set-Cookie` value carrying messages to the next page, `None` when empty.
pub fn flash_cookie(flashes: &[Flash]) -> Option<String> {
    if flashes.is_empty() {
        return None;
    }
    let json = serde_json::to_vec(flashes).ok()?;
    Some(format!(
        "{FLASH_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={FLASH_MAX_AGE_SECONDS}",
        URL_SAFE_NO_PAD.encode(json)
    ))
}

/// `Set-Cookie` value clearing the flash cookie.
pub fn clear_flash_cookie() -> String {
    format!("{FLASH_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0")
}

/// Messages pending in the request. Unreadable values count as none.
pub fn take_flashes(headers: &HeaderMap) -> Vec<Flash> {
    cookie(headers, FLASH_COOKIE)
        .filter(|value| !value.is_empty())
        .and_then(|value| URL_SAFE_NO_PAD.decode(value).ok())
        .and_then(|json| serde_json::from_slice(&json).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views::FlashLevel;
    use axum::http::HeaderValue;

    #[test]
    fn test_signed_team_round_trips() {
        let signer = SessionSigner::new("secret").unwrap();
        let token = signer.sign("Red Foxes");
        assert_eq!(signer.verify(&token).as_deref(), Some("Red Foxes"));
    }

    #[test]
    fn test_tampered_token_is_rejected() {
        let signer = SessionSigner::new("secret").unwrap();
        let token = signer.sign("Red Foxes");
        let (_, signature) = token.split_once('.').unwrap();
        let forged = format!("{}.{}", URL_SAFE_NO_PAD.encode("Blue Owls"), signature);
        assert_eq!(signer.verify(&forged), None);

        let other = SessionSigner::new("other").unwrap();
        assert_eq!(other.verify(&token), None);
        assert_eq!(signer.verify("garbage"), None);
    }

    #[test]
    fn test_cookie_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("a=1; team=abc.def; flash="),
        );
        assert_eq!(cookie(&headers, "team"), Some("abc.def"));
        assert_eq!(cookie(&headers, "missing"), None);
        assert!(take_flashes(&headers).is_empty());
    }

    #[test]
    fn test_flash_cookie_is_readable() {
        let flashes = vec![Flash::new(FlashLevel::Danger, "Try again.")];
        let set_cookie = flash_cookie(&flashes).unwrap();
        let pair = set_cookie.split(';').next().unwrap().to_string();

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_str(&pair).unwrap());
        assert_eq!(take_flashes(&headers), flashes);
        assert_eq!(flash_cookie(&[]), None);
    }
}

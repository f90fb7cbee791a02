//! Service-account authentication for the Sheets API.
//!
//! Mints an RS256-signed JWT assertion from the key file, exchanges it at the
//! key's `token_uri` for a short-lived access token, and caches the token
//! until shortly before it expires.
//!
//! JSON keys carry everything. Legacy `.p12` keys only hold the private key,
//! so the account email comes from configuration.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use openssl::pkcs12::Pkcs12;
use openssl::provider::Provider;
use rsa::RsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::pkcs8::DecodePrivateKey;
use rsa::signature::{SignatureEncoding, Signer};
use rsvp_core::error::{Result, RsvpError};
use serde::Deserialize;
use sha2::Sha256;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tokio::sync::Mutex;

/// Read-only access is all the relay needs.
pub const SHEETS_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the reported expiry.
const EXPIRY_SLACK_SECS: i64 = 60;
/// Google protects every downloaded `.p12` key with this password.
const P12_PASSWORD: &str = "notasecret";

/// Anything that can hand out a bearer token for the Sheets API.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// The fields of a Google service-account JSON key that the relay uses.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".into()
}

impl ServiceAccountKey {
    /// Load a key file, JSON or `.p12`. `p12_email` is the issuer used for
    /// `.p12` keys and ignored otherwise.
    pub fn load(path: &Path, p12_email: &str) -> Result<Self> {
        if is_p12(path) {
            Self::from_p12_file(path, p12_email)
        } else {
            Self::from_file(path)
        }
    }

    /// Read a JSON key file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RsvpError::Auth(format!("Read service account key {}: {e}", path.display()))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| RsvpError::Auth(format!("Parse service account key: {e}")))
    }

    /// Read a `.p12` key issued to `client_email`.
    pub fn from_p12_file(path: &Path, client_email: &str) -> Result<Self> {
        if client_email.trim().is_empty() {
            return Err(RsvpError::Config(format!(
                "P12 key {} needs GOOGLE_SERVICE_ACCOUNT_EMAIL",
                path.display()
            )));
        }
        let der = std::fs::read(path).map_err(|e| {
            RsvpError::Auth(format!("Read service account key {}: {e}", path.display()))
        })?;
        Self::from_p12_der(&der, client_email)
    }

    /// Extract the private key from DER-encoded PKCS#12 bytes.
    pub fn from_p12_der(der: &[u8], client_email: &str) -> Result<Self> {
        load_legacy_ciphers();
        let parsed = Pkcs12::from_der(der)
            .and_then(|p12| p12.parse2(P12_PASSWORD))
            .map_err(|e| RsvpError::Auth(format!("Parse P12 key: {e}")))?;
        let pkey = parsed
            .pkey
            .ok_or_else(|| RsvpError::Auth("P12 key holds no private key".into()))?;
        let pem = pkey
            .private_key_to_pem_pkcs8()
            .map_err(|e| RsvpError::Auth(format!("Export P12 private key: {e}")))?;
        let private_key = String::from_utf8(pem)
            .map_err(|e| RsvpError::Auth(format!("Export P12 private key: {e}")))?;

        Ok(Self {
            client_email: client_email.trim().to_string(),
            private_key,
            token_uri: default_token_uri(),
        })
    }

    /// `base64url(header).base64url(claims)` — the part that gets signed.
    pub fn signing_input(&self, scope: &str, issued_at: i64) -> String {
        let header = serde_json::json!({ "alg": "RS256", "typ": "JWT" });
        let claims = serde_json::json!({
            "iss": self.client_email,
            "scope": scope,
            "aud": self.token_uri,
            "iat": issued_at,
            "exp": issued_at + ASSERTION_LIFETIME_SECS,
        });
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(claims.to_string())
        )
    }

    /// Build the signed JWT assertion.
    pub fn assertion(&self, scope: &str, issued_at: i64) -> Result<String> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(&self.private_key)
            .map_err(|e| RsvpError::Auth(format!("Invalid private key: {e}")))?;
        let signer = SigningKey::<Sha256>::new(private_key);
        let input = self.signing_input(scope, issued_at);
        let signature = signer
            .try_sign(input.as_bytes())
            .map_err(|e| RsvpError::Auth(format!("Sign assertion: {e}")))?;
        Ok(format!(
            "{input}.{}",
            URL_SAFE_NO_PAD.encode(signature.to_bytes())
        ))
    }
}

fn is_p12(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("p12"))
}

/// Google's `.p12` files use RC2/3DES, which OpenSSL 3 keeps in the legacy
/// provider. Loaded once, alongside the default provider.
fn load_legacy_ciphers() {
    static LEGACY: OnceLock<Option<Provider>> = OnceLock::new();
    LEGACY.get_or_init(|| match Provider::try_load(None, "legacy", true) {
        Ok(provider) => Some(provider),
        Err(e) => {
            tracing::debug!("OpenSSL legacy provider unavailable: {e}");
            None
        }
    });
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: i64,
}

impl CachedToken {
    fn is_fresh(&self, now: i64) -> bool {
        now < self.expires_at - EXPIRY_SLACK_SECS
    }
}

/// Token source backed by a service-account key file.
///
/// The key is read lazily, so a missing or broken key file fails the first
/// fetch rather than process startup.
pub struct ServiceAccountAuth {
    key_path: PathBuf,
    p12_email: String,
    scope: String,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountAuth {
    pub fn new(key_path: impl Into<PathBuf>) -> Self {
        Self {
            key_path: key_path.into(),
            p12_email: String::new(),
            scope: SHEETS_READONLY_SCOPE.to_string(),
            http: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }

    /// Issuer for a `.p12` key file.
    pub fn with_p12_email(mut self, email: impl Into<String>) -> Self {
        self.p12_email = email.into();
        self
    }

    async fn mint(&self) -> Result<CachedToken> {
        let key = ServiceAccountKey::load(&self.key_path, &self.p12_email)?;
        let now = chrono::Utc::now().timestamp();
        let assertion = key.assertion(&self.scope, now)?;

        let resp = self
            .http
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .timeout(std::time::Duration::from_secs(30))
            .send()
            .await
            .map_err(|e| RsvpError::Auth(format!("Token request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RsvpError::Auth(format!("Token endpoint {status}: {body}")));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| RsvpError::Auth(format!("Token response: {e}")))?;

        tracing::debug!(
            "🔑 Access token minted for {} (expires in {}s)",
            key.client_email,
            token.expires_in
        );
        Ok(CachedToken {
            token: token.access_token,
            expires_at: now + token.expires_in,
        })
    }
}

#[async_trait]
impl TokenSource for ServiceAccountAuth {
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        let now = chrono::Utc::now().timestamp();
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
            return Ok(token.token.clone());
        }
        let fresh = self.mint().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}

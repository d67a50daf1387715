//! Application default credentials from a JSON key file.
//!
//! Two file types are understood: a service-account key (exchanged for an
//! access token with a signed RS256 JWT assertion) and the gcloud
//! `authorized_user` file (exchanged with its refresh token). Both post a
//! form to the OAuth token endpoint named in, or defaulted for, the file.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ring::rand::SystemRandom;
use ring::signature::{RSA_PKCS1_SHA256, RsaKeyPair};
use serde::Deserialize;

use crate::auth::TokenResponse;
use crate::error::{FetchError, FetchResult};

/// Environment variable naming an explicit credentials file.
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

const WELL_KNOWN_FILE: &str = "application_default_credentials.json";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const COMPUTE_SCOPE: &str = "https://www.googleapis.com/auth/compute.readonly";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME: Duration = Duration::from_secs(3600);

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CredentialsFile {
    ServiceAccount(ServiceAccountFile),
    AuthorizedUser(AuthorizedUser),
}

#[derive(Deserialize)]
struct ServiceAccountFile {
    client_email: String,
    private_key: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

/// A service account with its parsed signing key.
pub struct ServiceAccount {
    client_email: String,
    token_uri: String,
    key: RsaKeyPair,
}

/// gcloud user credentials (`gcloud auth application-default login`).
#[derive(Deserialize)]
pub struct AuthorizedUser {
    client_id: String,
    client_secret: String,
    refresh_token: String,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

/// Credentials loaded from a key file.
pub enum Credentials {
    ServiceAccount(ServiceAccount),
    AuthorizedUser(AuthorizedUser),
}

impl Credentials {
    pub fn from_file(path: &Path) -> FetchResult<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| FetchError::Auth(format!("read {}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> FetchResult<Self> {
        let file: CredentialsFile = serde_json::from_str(json)
            .map_err(|e| FetchError::Auth(format!("credentials file: {e}")))?;

        match file {
            CredentialsFile::ServiceAccount(sa) => {
                let pem = pem::parse(sa.private_key.as_bytes())
                    .map_err(|e| FetchError::Auth(format!("private key: {e}")))?;
                let key = RsaKeyPair::from_pkcs8(pem.contents())
                    .map_err(|e| FetchError::Auth(format!("private key: {e}")))?;
                Ok(Self::ServiceAccount(ServiceAccount {
                    client_email: sa.client_email,
                    token_uri: sa.token_uri,
                    key,
                }))
            }
            CredentialsFile::AuthorizedUser(user) => Ok(Self::AuthorizedUser(user)),
        }
    }

    /// Who these credentials authenticate as. Never secret.
    pub fn principal(&self) -> &str {
        match self {
            Self::ServiceAccount(sa) => &sa.client_email,
            Self::AuthorizedUser(user) => &user.client_id,
        }
    }

    /// Trade the credentials for a fresh access token.
    pub(crate) async fn exchange(&self, http: &reqwest::Client) -> FetchResult<TokenResponse> {
        let resp = match self {
            Self::ServiceAccount(sa) => {
                let assertion = sa.assertion(SystemTime::now())?;
                http.post(&sa.token_uri)
                    .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
                    .send()
                    .await
            }
            Self::AuthorizedUser(user) => {
                http.post(&user.token_uri)
                    .form(&[
                        ("grant_type", "refresh_token"),
                        ("client_id", user.client_id.as_str()),
                        ("client_secret", user.client_secret.as_str()),
                        ("refresh_token", user.refresh_token.as_str()),
                    ])
                    .send()
                    .await
            }
        }
        .map_err(|e| FetchError::Auth(format!("token endpoint: {e}")))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::Auth(format!("token endpoint: {e}")))?;
        if !status.is_success() {
            return Err(FetchError::Auth(
                FetchError::status(status.as_u16(), &body).to_string(),
            ));
        }
        serde_json::from_str(&body).map_err(|e| FetchError::Auth(e.to_string()))
    }
}

impl ServiceAccount {
    /// Signed JWT asserting this account for the read-only Compute scope.
    fn assertion(&self, now: SystemTime) -> FetchResult<String> {
        let iat = now
            .duration_since(UNIX_EPOCH)
            .map_err(|e| FetchError::Auth(e.to_string()))?
            .as_secs();
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let claims = serde_json::json!({
            "iss": self.client_email,
            "scope": COMPUTE_SCOPE,
            "aud": self.token_uri,
            "iat": iat,
            "exp": iat + ASSERTION_LIFETIME.as_secs(),
        });
        let claims = URL_SAFE_NO_PAD.encode(claims.to_string());
        let signing_input = format!("{header}.{claims}");

        let mut signature = vec![0; self.key.public().modulus_len()];
        self.key
            .sign(
                &RSA_PKCS1_SHA256,
                &SystemRandom::new(),
                signing_input.as_bytes(),
                &mut signature,
            )
            .map_err(|_| FetchError::Auth("failed to sign assertion".to_string()))?;

        Ok(format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }
}

/// Location of the gcloud application-default credentials file, whether
/// or not it exists. `lookup` reads environment variables.
pub fn well_known_file(lookup: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    let var = |name: &str| lookup(name).filter(|v| !v.is_empty()).map(PathBuf::from);

    if let Some(dir) = var("CLOUDSDK_CONFIG") {
        return Some(dir.join(WELL_KNOWN_FILE));
    }
    let config_dir = if cfg!(windows) {
        var("APPDATA")?.join("gcloud")
    } else {
        var("HOME")?.join(".config").join("gcloud")
    };
    Some(config_dir.join(WELL_KNOWN_FILE))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ring::signature::{RSA_PKCS1_2048_8192_SHA256, UnparsedPublicKey};

    pub(crate) const TEST_KEY: &str = include_str!("../tests/fixtures/rsa-2048.pem");

    pub(crate) fn service_account_json(token_uri: &str) -> String {
        serde_json::json!({
            "type": "service_account",
            "project_id": "my-proj",
            "private_key_id": "abc123",
            "private_key": TEST_KEY,
            "client_email": "exporter@my-proj.iam.gserviceaccount.com",
            "client_id": "1234",
            "token_uri": token_uri,
        })
        .to_string()
    }

    fn decode_segment(segment: &str) -> serde_json::Value {
        serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
    }

    #[test]
    fn service_account_assertion_is_signed_jwt() {
        let creds = Credentials::from_json(&service_account_json(DEFAULT_TOKEN_URI)).unwrap();
        let Credentials::ServiceAccount(sa) = &creds else {
            panic!("expected a service account");
        };
        assert_eq!(creds.principal(), "exporter@my-proj.iam.gserviceaccount.com");

        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let jwt = sa.assertion(now).unwrap();
        let parts: Vec<&str> = jwt.split('.').collect();
        assert_eq!(parts.len(), 3);

        let header = decode_segment(parts[0]);
        assert_eq!(header["alg"], "RS256");

        let claims = decode_segment(parts[1]);
        assert_eq!(claims["iss"], "exporter@my-proj.iam.gserviceaccount.com");
        assert_eq!(claims["aud"], DEFAULT_TOKEN_URI);
        assert_eq!(claims["scope"], COMPUTE_SCOPE);
        assert_eq!(claims["iat"], 1_700_000_000u64);
        assert_eq!(claims["exp"], 1_700_003_600u64);

        let signature = URL_SAFE_NO_PAD.decode(parts[2]).unwrap();
        let public_key = UnparsedPublicKey::new(&RSA_PKCS1_2048_8192_SHA256, sa.key.public().as_ref());
        let signed = format!("{}.{}", parts[0], parts[1]);
        assert!(public_key.verify(signed.as_bytes(), &signature).is_ok());
    }

    #[test]
    fn authorized_user_file_is_parsed() {
        let creds = Credentials::from_json(
            r#"{
                "type": "authorized_user",
                "client_id": "client.apps.googleusercontent.com",
                "client_secret": "secret",
                "refresh_token": "1//refresh"
            }"#,
        )
        .unwrap();

        let Credentials::AuthorizedUser(user) = &creds else {
            panic!("expected user credentials");
        };
        assert_eq!(creds.principal(), "client.apps.googleusercontent.com");
        assert_eq!(user.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn unusable_files_are_rejected() {
        for json in [
            "",
            "{}",
            r#"{"type":"external_account"}"#,
            r#"{"type":"service_account","client_email":"a@b","private_key":"not a key"}"#,
        ] {
            assert!(
                matches!(Credentials::from_json(json), Err(FetchError::Auth(_))),
                "accepted {json:?}"
            );
        }
    }

    #[test]
    fn missing_file_is_auth_error() {
        let result = Credentials::from_file(Path::new("/nonexistent/gcpstate/key.json"));
        assert!(matches!(result, Err(FetchError::Auth(_))));
    }

    #[test]
    fn well_known_file_location() {
        let env = |vars: &'static [(&'static str, &'static str)]| {
            move |name: &str| {
                vars.iter()
                    .find(|(k, _)| *k == name)
                    .map(|(_, v)| v.to_string())
            }
        };

        assert_eq!(
            well_known_file(env(&[("CLOUDSDK_CONFIG", "/etc/gcloud"), ("HOME", "/home/u")])),
            Some(PathBuf::from("/etc/gcloud").join(WELL_KNOWN_FILE))
        );
        assert_eq!(well_known_file(env(&[])), None);
        if !cfg!(windows) {
            assert_eq!(
                well_known_file(env(&[("CLOUDSDK_CONFIG", ""), ("HOME", "/home/u")])),
                Some(PathBuf::from("/home/u/.config/gcloud").join(WELL_KNOWN_FILE))
            );
        }
    }
}

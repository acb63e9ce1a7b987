//! Service-principal credentials for the PDF Services API.
//!
//! Both values come from the process environment. A run never proceeds with a
//! partial or placeholder credential: if either variable is unset, empty, or
//! only whitespace, [`Credentials::from_lookup`] fails before anything touches
//! the network.

use crate::error::ConversionError;
use std::fmt;
use std::sync::Arc;

/// Environment variable holding the client id.
pub const CLIENT_ID_VAR: &str = "PDF_SERVICES_CLIENT_ID";
/// Environment variable holding the client secret.
pub const CLIENT_SECRET_VAR: &str = "PDF_SERVICES_CLIENT_SECRET";

/// Looks up an environment-style variable by name.
///
/// The runner defaults to the process environment; tests and embedding
/// applications can substitute their own source.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Lookup backed by the real process environment.
pub fn process_env() -> EnvLookup {
    Arc::new(|name| std::env::var(name).ok())
}

/// Client id / secret pair authenticating this program to the service.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    client_id: String,
    client_secret: String,
}

impl Credentials {
    /// Build credentials from explicit values, rejecting empty ones.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Result<Self, ConversionError> {
        let (id, secret) = (client_id.into(), client_secret.into());
        Self::from_lookup(|name| match name {
            CLIENT_ID_VAR => Some(id.clone()),
            CLIENT_SECRET_VAR => Some(secret.clone()),
            _ => None,
        })
    }

    /// Read both credentials through `lookup`.
    ///
    /// Values are trimmed; a value that is empty after trimming counts as
    /// missing. The error lists every missing variable, not just the first.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConversionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let client_id = read(CLIENT_ID_VAR);
        let client_secret = read(CLIENT_SECRET_VAR);

        match (client_id, client_secret) {
            (Some(client_id), Some(client_secret)) => Ok(Self {
                client_id,
                client_secret,
            }),
            (id, secret) => {
                let mut missing = Vec::new();
                if id.is_none() {
                    missing.push(CLIENT_ID_VAR);
                }
                if secret.is_none() {
                    missing.push(CLIENT_SECRET_VAR);
                }
                Err(ConversionError::MissingCredentials { missing })
            }
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn client_secret(&self) -> &str {
        &self.client_secret
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn both_present() {
        let vars = env(&[(CLIENT_ID_VAR, "id-123"), (CLIENT_SECRET_VAR, "s3cret")]);
        let creds = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(creds.client_id(), "id-123");
        assert_eq!(creds.client_secret(), "s3cret");
    }

    #[test]
    fn values_are_trimmed() {
        let vars = env(&[(CLIENT_ID_VAR, " id \n"), (CLIENT_SECRET_VAR, "\tsecret ")]);
        let creds = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(creds.client_id(), "id");
        assert_eq!(creds.client_secret(), "secret");
    }

    #[test]
    fn missing_secret_is_reported() {
        let vars = env(&[(CLIENT_ID_VAR, "id")]);
        match Credentials::from_lookup(|k| vars.get(k).cloned()) {
            Err(ConversionError::MissingCredentials { missing }) => {
                assert_eq!(missing, vec![CLIENT_SECRET_VAR]);
            }
            other => panic!("expected MissingCredentials, got {other:?}"),
        }
    }

    #[test]
    fn empty_and_blank_values_count_as_missing() {
        let vars = env(&[(CLIENT_ID_VAR, ""), (CLIENT_SECRET_VAR, "   ")]);
        match Credentials::from_lookup(|k| vars.get(k).cloned()) {
            Err(ConversionError::MissingCredentials { missing }) => {
                assert_eq!(missing, vec![CLIENT_ID_VAR, CLIENT_SECRET_VAR]);
            }
            other => panic!("expected MissingCredentials, got {other:?}"),
        }
    }

    #[test]
    fn new_rejects_empty_id() {
        assert!(Credentials::new("", "secret").is_err());
        assert!(Credentials::new("id", "secret").is_ok());
    }

    #[test]
    fn debug_redacts_secret() {
        let creds = Credentials::new("visible-id", "hidden-secret").unwrap();
        let dbg = format!("{creds:?}");
        assert!(dbg.contains("visible-id"));
        assert!(!dbg.contains("hidden-secret"));
    }

    #[test]
    fn process_env_reads_the_real_environment() {
        // cargo sets this for the test process
        let lookup = process_env();
        assert_eq!(
            lookup("CARGO_MANIFEST_DIR").as_deref(),
            Some(env!("CARGO_MANIFEST_DIR"))
        );
        assert_eq!(lookup("PDF2XLSX_SURELY_UNSET_VARIABLE"), None);
    }
}

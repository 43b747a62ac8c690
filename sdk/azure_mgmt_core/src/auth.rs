use crate::error::{ArmError, ArmResult};
use secrecy::{ExposeSecret, SecretString};

/// Environment variable holding a pre-acquired Resource Manager access token.
pub const ACCESS_TOKEN_ENV: &str = "AZURE_ACCESS_TOKEN";

/// Credentials attached to every Resource Manager request.
///
/// Token acquisition is left to the caller; this type only carries a token
/// that was obtained elsewhere (Azure CLI, managed identity, a service
/// principal flow) and turns it into an `Authorization` header.
#[derive(Clone)]
pub enum ArmCredential {
    /// A bearer access token for `https://management.azure.com/`.
    BearerToken(SecretString),

    /// No `Authorization` header. Useful against local emulators and mocks.
    Anonymous,
}

impl ArmCredential {
    /// Create a credential from the `AZURE_ACCESS_TOKEN` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ArmError::MissingConfig`] when the variable is unset, empty
    /// or only whitespace.
    pub fn from_env() -> ArmResult<Self> {
        match std::env::var(ACCESS_TOKEN_ENV) {
            Ok(token) if !token.trim().is_empty() => {
                Ok(Self::BearerToken(SecretString::from(token.trim().to_string())))
            }
            _ => Err(ArmError::MissingConfig(format!(
                "no credential configured. Pass one to the builder or set {ACCESS_TOKEN_ENV}."
            ))),
        }
    }

    /// Create a bearer token credential.
    pub fn bearer_token(token: impl Into<String>) -> Self {
        Self::BearerToken(SecretString::from(token.into()))
    }

    /// Create a credential that sends no `Authorization` header.
    pub fn anonymous() -> Self {
        Self::Anonymous
    }

    /// Resolve the credential to an authorization header value, if any.
    pub fn resolve(&self) -> ArmResult<Option<String>> {
        match self {
            Self::BearerToken(token) => {
                let token = token.expose_secret();
                if token.is_empty() {
                    return Err(ArmError::Auth("bearer token is empty".into()));
                }
                Ok(Some(format!("Bearer {token}")))
            }
            Self::Anonymous => Ok(None),
        }
    }
}

impl std::fmt::Debug for ArmCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BearerToken(_) => write!(f, "ArmCredential::BearerToken(****)"),
            Self::Anonymous => write!(f, "ArmCredential::Anonymous"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn bearer_token_resolves_to_header() {
        let credential = ArmCredential::bearer_token("abc");
        assert_eq!(credential.resolve().unwrap().as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn anonymous_resolves_to_nothing() {
        assert!(ArmCredential::anonymous().resolve().unwrap().is_none());
    }

    #[test]
    fn empty_token_is_rejected() {
        let err = ArmCredential::bearer_token("").resolve().unwrap_err();
        assert!(matches!(err, ArmError::Auth(_)));
    }

    #[test]
    fn debug_output_redacts_token() {
        let credential = ArmCredential::bearer_token("super-secret");
        let debug = format!("{credential:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("****"));
    }

    #[test]
    #[serial]
    fn from_env_reads_token() {
        let original = std::env::var(ACCESS_TOKEN_ENV).ok();
        std::env::set_var(ACCESS_TOKEN_ENV, "env-token");

        let credential = ArmCredential::from_env().expect("should read env");
        assert_eq!(
            credential.resolve().unwrap().as_deref(),
            Some("Bearer env-token")
        );

        match original {
            Some(val) => std::env::set_var(ACCESS_TOKEN_ENV, val),
            None => std::env::remove_var(ACCESS_TOKEN_ENV),
        }
    }

    #[test]
    #[serial]
    fn from_env_without_token_fails() {
        let original = std::env::var(ACCESS_TOKEN_ENV).ok();
        std::env::remove_var(ACCESS_TOKEN_ENV);

        let err = ArmCredential::from_env().unwrap_err();
        assert!(matches!(err, ArmError::MissingConfig(_)));

        if let Some(val) = original {
            std::env::set_var(ACCESS_TOKEN_ENV, val);
        }
    }

    #[test]
    #[serial]
    fn from_env_with_blank_token_is_missing_config() {
        let original = std::env::var(ACCESS_TOKEN_ENV).ok();
        std::env::set_var(ACCESS_TOKEN_ENV, "   ");

        let err = ArmCredential::from_env().unwrap_err();
        assert!(matches!(err, ArmError::MissingConfig(_)));
        assert!(err.to_string().contains(ACCESS_TOKEN_ENV));

        match original {
            Some(val) => std::env::set_var(ACCESS_TOKEN_ENV, val),
            None => std::env::remove_var(ACCESS_TOKEN_ENV),
        }
    }
}

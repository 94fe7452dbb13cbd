use std::fmt;
use std::str::FromStr;

use url::Url;

/// A Key Vault key URL, `https://{vault}/keys/{name}[/{version}]`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyVaultKeyId {
    /// `https://{vault}/`, always with a trailing slash
    pub key_vault_base_url: String,
    pub name: String,
    pub version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseKeyVaultKeyIdError {
    #[error("parsing Key Vault key ID {0:?}: {1}")]
    InvalidUrl(String, url::ParseError),
    #[error("Key Vault key ID {0:?} must use https")]
    NotHttps(String),
    #[error("Key Vault key ID {0:?} has no host")]
    MissingHost(String),
    #[error("Key Vault key ID {0:?} must look like https://{{vault}}/keys/{{name}}[/{{version}}]")]
    UnexpectedPath(String),
}

impl KeyVaultKeyId {
    pub fn parse(input: &str) -> Result<Self, ParseKeyVaultKeyIdError> {
        let url = Url::parse(input)
            .map_err(|e| ParseKeyVaultKeyIdError::InvalidUrl(input.to_string(), e))?;
        if url.scheme() != "https" {
            return Err(ParseKeyVaultKeyIdError::NotHttps(input.to_string()));
        }
        let host = url
            .host_str()
            .ok_or_else(|| ParseKeyVaultKeyIdError::MissingHost(input.to_string()))?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();

        let (name, version) = match segments.as_slice() {
            ["keys", name] => (name.to_string(), None),
            ["keys", name, version] => (name.to_string(), Some(version.to_string())),
            _ => return Err(ParseKeyVaultKeyIdError::UnexpectedPath(input.to_string())),
        };

        let base = match url.port() {
            Some(port) => format!("https://{}:{}/", host, port),
            None => format!("https://{}/", host),
        };

        Ok(Self {
            key_vault_base_url: base,
            name,
            version,
        })
    }

    /// The same key without a version, as used for automatic key rotation
    pub fn versionless(&self) -> Self {
        Self {
            version: None,
            ..self.clone()
        }
    }
}

impl FromStr for KeyVaultKeyId {
    type Err = ParseKeyVaultKeyIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for KeyVaultKeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}keys/{}", self.key_vault_base_url, self.name)?;
        if let Some(version) = &self.version {
            write!(f, "/{}", version)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_versioned_key() {
        let id = KeyVaultKeyId::parse("https://vault1.vault.azure.net/keys/key1/abc123").unwrap();
        assert_eq!(id.key_vault_base_url, "https://vault1.vault.azure.net/");
        assert_eq!(id.name, "key1");
        assert_eq!(id.version.as_deref(), Some("abc123"));
        assert_eq!(id.to_string(), "https://vault1.vault.azure.net/keys/key1/abc123");
    }

    #[test]
    fn parses_versionless_key() {
        let id = KeyVaultKeyId::parse("https://vault1.vault.azure.net/keys/key1").unwrap();
        assert_eq!(id.version, None);
        assert_eq!(
            KeyVaultKeyId::parse("https://vault1.vault.azure.net/keys/key1/v2")
                .unwrap()
                .versionless(),
            id
        );
    }

    #[test]
    fn rejects_other_shapes() {
        assert!(matches!(
            KeyVaultKeyId::parse("not a url"),
            Err(ParseKeyVaultKeyIdError::InvalidUrl(..))
        ));
        assert!(matches!(
            KeyVaultKeyId::parse("http://vault1.vault.azure.net/keys/key1"),
            Err(ParseKeyVaultKeyIdError::NotHttps(_))
        ));
        assert!(matches!(
            KeyVaultKeyId::parse("https://vault1.vault.azure.net/secrets/s1"),
            Err(ParseKeyVaultKeyIdError::UnexpectedPath(_))
        ));
        assert!(KeyVaultKeyId::parse("https://vault1.vault.azure.net/keys/a/b/c").is_err());
    }
}

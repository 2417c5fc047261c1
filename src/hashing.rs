use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroizing;

/// Stand-in for an absent field when fingerprinting a row.
pub const NULL_PLACEHOLDER: &str = "nan";

/// MD5 over the `|`-joined field values. Stable identity for a row, not a security boundary.
pub fn row_fingerprint<S: AsRef<str>>(values: &[Option<S>]) -> String {
    let joined = values
        .iter()
        .map(|v| v.as_ref().map_or(NULL_PLACEHOLDER, |s| s.as_ref()))
        .collect::<Vec<_>>()
        .join("|");
    format!("{:x}", md5::compute(joined.as_bytes()))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DigestAlgorithm {
    #[default]
    Sha256,
    Sha512,
    Md5,
}

/// Run-scoped hashing secret. Wiped on drop and never printed.
#[derive(Clone)]
pub struct Salt(Zeroizing<String>);

impl Salt {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Zeroizing::new(value.into()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn expose(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Salt(<redacted>)")
    }
}

/// Hex digest of `salt || value`, or `None` when there is nothing to hash.
pub fn salted_hash(value: Option<&str>, salt: &Salt, algorithm: DigestAlgorithm) -> Option<String> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    let mut input = Zeroizing::new(String::with_capacity(salt.expose().len() + value.len()));
    input.push_str(salt.expose());
    input.push_str(value);
    let digest = match algorithm {
        DigestAlgorithm::Sha256 => hex::encode(Sha256::digest(input.as_bytes())),
        DigestAlgorithm::Sha512 => hex::encode(Sha512::digest(input.as_bytes())),
        DigestAlgorithm::Md5 => format!("{:x}", md5::compute(input.as_bytes())),
    };
    Some(digest)
}

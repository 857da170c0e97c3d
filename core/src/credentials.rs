//! Login credentials for authenticated directory calls.
//!
//! The service accepts the hex MD5 digest of a password in place of the
//! password itself, so the plaintext is hashed once when the credentials are
//! built and only the digest is kept.

use std::fmt;

use md5::{Digest, Md5};

use crate::value::Value;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    username: Option<String>,
    password_digest: Option<String>,
}

impl Credentials {
    pub fn new(username: Option<&str>, password: Option<&str>) -> Self {
        Self {
            username: username.map(str::to_string),
            password_digest: password.map(digest_password),
        }
    }

    /// Credentials for anonymous use of the read-only operations.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password_digest(&self) -> Option<&str> {
        self.password_digest.as_deref()
    }

    /// The two leading arguments of every authenticated call. Missing parts
    /// are sent as `nil` and left for the service to reject.
    pub(crate) fn auth_args(&self) -> [Value; 2] {
        [
            Value::from(self.username.as_deref()),
            Value::from(self.password_digest.as_deref()),
        ]
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password_digest", &self.password_digest.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Lowercase hex MD5 of `password`.
pub fn digest_password(password: &str) -> String {
    hex::encode(Md5::digest(password.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_matches_known_vector() {
        assert_eq!(digest_password("password"), "5f4dcc3b5aa765d61d8327deb882cf99");
        assert_eq!(digest_password(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn plaintext_is_never_stored() {
        let creds = Credentials::new(Some("joebob"), Some("p455w3rd"));
        assert_eq!(creds.username(), Some("joebob"));
        let stored = creds.password_digest().unwrap();
        assert_ne!(stored, "p455w3rd");
        assert_eq!(stored.len(), 32);
    }

    #[test]
    fn same_password_same_digest() {
        let a = Credentials::new(Some("a"), Some("secret"));
        let b = Credentials::new(Some("b"), Some("secret"));
        assert_eq!(a.password_digest(), b.password_digest());
    }

    #[test]
    fn anonymous_auth_args_are_nil() {
        assert_eq!(Credentials::anonymous().auth_args(), [Value::Nil, Value::Nil]);
    }

    #[test]
    fn debug_redacts_digest() {
        let creds = Credentials::new(Some("joebob"), Some("p455w3rd"));
        let printed = format!("{creds:?}");
        assert!(printed.contains("joebob"));
        assert!(!printed.contains(&digest_password("p455w3rd")));
    }
}

//! Generated key material.

use std::fmt;

use zeroize::Zeroizing;

use super::TransportAlgorithm;

/// The person or bot a signing key is issued to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyHolder {
    pub name: String,
    pub email: String,
}

impl KeyHolder {
    /// `Name <email>` user id, as written into OpenPGP keys and SSH comments.
    pub fn user_id(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }
}

/// Text encoding of a key pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFormat {
    /// ASCII-armored OpenPGP blocks.
    OpenPgp,
    /// OpenSSH private key + `authorized_keys` public line.
    OpenSsh(TransportAlgorithm),
}

/// One private/public key pair in portable text form.
///
/// The private half is wiped from memory when the pair is dropped.
#[derive(Clone)]
pub struct KeyPair {
    pub format: KeyFormat,
    pub private: Zeroizing<String>,
    pub public: String,
}

impl KeyPair {
    pub fn new(format: KeyFormat, private: impl Into<String>, public: impl Into<String>) -> Self {
        Self {
            format,
            private: Zeroizing::new(private.into()),
            public: public.into(),
        }
    }

    /// Secret field names for the private and public halves.
    pub fn field_names(&self) -> (String, String) {
        match self.format {
            KeyFormat::OpenPgp => ("gpg-private-key".to_string(), "gpg-public-key".to_string()),
            KeyFormat::OpenSsh(algorithm) => {
                let base = algorithm.field_name();
                (base.to_string(), format!("{base}.pub"))
            }
        }
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("format", &self.format)
            .field("private", &"[REDACTED]")
            .field("public", &self.public)
            .finish()
    }
}

/// Everything generated in one run: the signing pair and, optionally, a
/// separate SSH transport pair used as the deploy key.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub signing: KeyPair,
    pub transport: Option<KeyPair>,
}

impl KeyMaterial {
    /// The OpenSSH public key to register as a deploy key.
    ///
    /// Prefers the transport pair, falling back to the signing pair when it
    /// is itself an OpenSSH key.
    pub fn deploy_public_key(&self) -> Option<&str> {
        self.transport
            .iter()
            .chain(std::iter::once(&self.signing))
            .find(|pair| matches!(pair.format, KeyFormat::OpenSsh(_)))
            .map(|pair| pair.public.trim_end())
    }

    /// All pairs, signing first.
    pub fn pairs(&self) -> impl Iterator<Item = &KeyPair> {
        std::iter::once(&self.signing).chain(self.transport.iter())
    }
}

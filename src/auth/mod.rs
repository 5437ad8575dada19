//! Master password authentication: the persisted credential, the
//! brute-force lockout, the session key cache, and the prompt seam.

pub mod lockout;
pub mod master;
pub mod session;

pub use lockout::{FailureOutcome, LockoutPolicy, LockoutState};
pub use master::{MasterCredential, MasterCredentialRecord};
pub use session::{SessionCache, SessionKey};

use zeroize::Zeroizing;

use crate::errors::Result;

/// Where the vault gets passwords from.
///
/// `ask` returns `Ok(None)` when the user cancels. `ask_new` is only used
/// to bootstrap a missing master password; the default declines.
pub trait PasswordPrompt {
    fn ask(&mut self, purpose: &str) -> Result<Option<Zeroizing<String>>>;

    fn ask_new(&mut self) -> Result<Option<Zeroizing<String>>> {
        Ok(None)
    }
}

impl<F> PasswordPrompt for F
where
    F: FnMut(&str) -> Option<Zeroizing<String>>,
{
    fn ask(&mut self, purpose: &str) -> Result<Option<Zeroizing<String>>> {
        Ok(self(purpose))
    }
}

/// A prompt that always answers with the same password and, when asked
/// to bootstrap, offers it as the new master password too.
///
/// Used for `SHOPVAULT_PASSWORD` and in tests.
#[derive(Clone)]
pub struct FixedPassword(Zeroizing<String>);

impl FixedPassword {
    pub fn new(password: impl Into<String>) -> Self {
        Self(Zeroizing::new(password.into()))
    }
}

impl PasswordPrompt for FixedPassword {
    fn ask(&mut self, _purpose: &str) -> Result<Option<Zeroizing<String>>> {
        Ok(Some(self.0.clone()))
    }

    fn ask_new(&mut self) -> Result<Option<Zeroizing<String>>> {
        Ok(Some(self.0.clone()))
    }
}

impl std::fmt::Debug for FixedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FixedPassword(<redacted>)")
    }
}

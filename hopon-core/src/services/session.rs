//! Session service - the signed-in identity
//!
//! A login passes the email through the identity gate and remembers the
//! result in session.json. Every mutating command asks for the session
//! identity first.

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::result::{Error, Result};
use crate::domain::{Identity, IdentityGate};

const SESSION_FILE: &str = "session.json";

pub struct SessionService {
    path: PathBuf,
    gate: IdentityGate,
}

impl SessionService {
    pub fn new(hopon_dir: &Path, gate: IdentityGate) -> Self {
        Self {
            path: hopon_dir.join(SESSION_FILE),
            gate,
        }
    }

    /// Validate `raw_email` and make it the current identity
    pub fn login(&self, raw_email: &str, user_id: Option<&str>) -> Result<Identity> {
        let mut identity = self.gate.validate(raw_email)?;
        if let Some(id) = user_id.map(str::trim).filter(|id| !id.is_empty()) {
            identity = identity.with_user_id(id);
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&identity)?)?;
        Ok(identity)
    }

    /// Forget the current identity. Returns whether one was signed in
    pub fn logout(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path)?;
        Ok(true)
    }

    /// The signed-in identity, if any
    ///
    /// A session whose email no longer passes the gate (for example after
    /// the allowed domains changed) counts as signed out.
    pub fn current(&self) -> Result<Option<Identity>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&self.path)?;
        let stored: Identity = match serde_json::from_str(&content) {
            Ok(identity) => identity,
            Err(e) => {
                eprintln!("[hopon] Ignoring unreadable session file: {}", e);
                return Ok(None);
            }
        };

        match self.gate.validate(&stored.email) {
            Ok(mut identity) => {
                identity.user_id = stored.user_id;
                Ok(Some(identity))
            }
            Err(_) => Ok(None),
        }
    }

    /// The signed-in identity, or `NotLoggedIn`
    pub fn require(&self) -> Result<Identity> {
        self.current()?.ok_or(Error::NotLoggedIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn service(dir: &Path) -> SessionService {
        SessionService::new(dir, IdentityGate::new(["vitstudent.ac.in"]))
    }

    #[test]
    fn test_login_persists_identity() {
        let dir = tempdir().unwrap();
        let identity = service(dir.path())
            .login("  Rahul.Nair2023@VITSTUDENT.ac.in ", None)
            .unwrap();
        assert_eq!(identity.email, "rahul.nair2023@vitstudent.ac.in");

        // A fresh service sees the same session
        let current = service(dir.path()).current().unwrap().unwrap();
        assert_eq!(current, identity);
    }

    #[test]
    fn test_login_keeps_user_id() {
        let dir = tempdir().unwrap();
        let sessions = service(dir.path());
        sessions
            .login("a.b2023@vitstudent.ac.in", Some("uid-42"))
            .unwrap();
        let current = sessions.require().unwrap();
        assert_eq!(current.user_id.as_deref(), Some("uid-42"));
    }

    #[test]
    fn test_rejected_login_leaves_no_session() {
        let dir = tempdir().unwrap();
        let sessions = service(dir.path());

        assert!(matches!(
            sessions.login("someone@gmail.com", None),
            Err(Error::DomainNotAllowed(_))
        ));
        assert!(matches!(sessions.login("not-an-email", None), Err(Error::InvalidFormat(_))));
        assert!(matches!(sessions.require(), Err(Error::NotLoggedIn)));
    }

    #[test]
    fn test_logout() {
        let dir = tempdir().unwrap();
        let sessions = service(dir.path());
        sessions.login("a.b2023@vitstudent.ac.in", None).unwrap();

        assert!(sessions.logout().unwrap());
        assert!(!sessions.logout().unwrap());
        assert!(sessions.current().unwrap().is_none());
    }

    #[test]
    fn test_session_revalidated_against_gate() {
        let dir = tempdir().unwrap();
        service(dir.path())
            .login("a.b2023@vitstudent.ac.in", None)
            .unwrap();

        let stricter = SessionService::new(dir.path(), IdentityGate::new(["vit.ac.in"]));
        assert!(stricter.current().unwrap().is_none());
    }

    #[test]
    fn test_corrupt_session_is_signed_out() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(SESSION_FILE), "{ nope").unwrap();
        assert!(service(dir.path()).current().unwrap().is_none());
    }
}

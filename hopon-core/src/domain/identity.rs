//! Identity domain model and the email gate that produces it

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::result::{Error, Result};

/// Default allow-listed domain for campus accounts
pub const DEFAULT_ALLOWED_DOMAIN: &str = "vitstudent.ac.in";

/// A validated caller: the normalized email, optionally paired with a
/// stable user id issued by the hosted backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl Identity {
    /// Build an identity from an email that is already normalized
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            user_id: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Whether two identities denote the same person
    ///
    /// Stable user ids win when both sides carry one; otherwise emails are
    /// compared.
    pub fn matches(&self, other: &Identity) -> bool {
        match (&self.user_id, &other.user_id) {
            (Some(a), Some(b)) => a == b,
            _ => self.email.eq_ignore_ascii_case(&other.email),
        }
    }
}

fn email_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9\-]+(\.[a-z0-9\-]+)*\.[a-z]{2,}$")
            .expect("email pattern is valid")
    })
}

/// Validates raw email input against an allow-list of domains
#[derive(Debug, Clone)]
pub struct IdentityGate {
    allowed_domains: Vec<String>,
}

impl Default for IdentityGate {
    fn default() -> Self {
        Self::new([DEFAULT_ALLOWED_DOMAIN])
    }
}

impl IdentityGate {
    pub fn new<I, S>(allowed_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_domains = allowed_domains
            .into_iter()
            .map(|d| d.as_ref().trim().trim_start_matches('@').to_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { allowed_domains }
    }

    pub fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }

    /// Validate a raw email and produce an identity
    ///
    /// Input is trimmed and lower-cased. The domain must equal an allowed
    /// domain or be a sub-domain of one.
    pub fn validate(&self, raw_email: &str) -> Result<Identity> {
        let email = raw_email.trim().to_lowercase();
        if email.is_empty() {
            return Err(Error::InvalidFormat("please enter your email".to_string()));
        }
        if !email_shape().is_match(&email) {
            return Err(Error::InvalidFormat(format!("'{}' is not an email address", email)));
        }

        // Shape check guarantees exactly one '@'
        let domain = email.rsplit('@').next().unwrap_or_default();
        let allowed = self.allowed_domains.iter().any(|allowed| {
            domain == allowed
                || domain
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        });
        if !allowed {
            return Err(Error::DomainNotAllowed(format!(
                "use your campus email (@{})",
                self.allowed_domains.join(", @")
            )));
        }

        Ok(Identity::new(email))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_campus_email_passes() {
        let gate = IdentityGate::default();
        let identity = gate.validate("a.b2022@vitstudent.ac.in").unwrap();
        assert_eq!(identity.email, "a.b2022@vitstudent.ac.in");
        assert!(identity.user_id.is_none());
    }

    #[test]
    fn test_input_is_normalized() {
        let gate = IdentityGate::default();
        let identity = gate.validate("  Riya.Sharma2023@VITSTUDENT.AC.IN \n").unwrap();
        assert_eq!(identity.email, "riya.sharma2023@vitstudent.ac.in");
    }

    #[test]
    fn test_foreign_domain_rejected() {
        let gate = IdentityGate::default();
        let err = gate.validate("a.b2022@gmail.com").unwrap_err();
        assert!(matches!(err, Error::DomainNotAllowed(_)));
    }

    #[test]
    fn test_empty_rejected() {
        let gate = IdentityGate::default();
        assert!(matches!(gate.validate(""), Err(Error::InvalidFormat(_))));
        assert!(matches!(gate.validate("   "), Err(Error::InvalidFormat(_))));
    }

    #[test]
    fn test_malformed_rejected() {
        let gate = IdentityGate::default();
        for raw in ["vitstudent.ac.in", "a@b", "two@@vitstudent.ac.in", "a b@vitstudent.ac.in"] {
            assert!(
                matches!(gate.validate(raw), Err(Error::InvalidFormat(_))),
                "{} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_lookalike_domain_rejected() {
        let gate = IdentityGate::default();
        let err = gate.validate("x.y2021@evilvitstudent.ac.in").unwrap_err();
        assert!(matches!(err, Error::DomainNotAllowed(_)));
    }

    #[test]
    fn test_subdomain_accepted() {
        let gate = IdentityGate::new(["vit.ac.in"]);
        assert!(gate.validate("prof@cse.vit.ac.in").is_ok());
        assert!(gate.validate("prof@vit.ac.in").is_ok());
    }

    #[test]
    fn test_multiple_domains() {
        let gate = IdentityGate::new(["@vitstudent.ac.in", "VIT.AC.IN", ""]);
        assert_eq!(gate.allowed_domains(), &["vitstudent.ac.in", "vit.ac.in"]);
        assert!(gate.validate("staff@vit.ac.in").is_ok());
    }

    #[test]
    fn test_identity_matching_prefers_user_id() {
        let a = Identity::new("a@vitstudent.ac.in").with_user_id("u1");
        let same_id = Identity::new("renamed@vitstudent.ac.in").with_user_id("u1");
        let other_id = Identity::new("a@vitstudent.ac.in").with_user_id("u2");
        let email_only = Identity::new("A@vitstudent.ac.in");

        assert!(a.matches(&same_id));
        assert!(!a.matches(&other_id));
        assert!(a.matches(&email_only));
    }
}

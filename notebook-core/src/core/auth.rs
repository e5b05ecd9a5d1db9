//! Login gate: who may open a notebook, and the session they get.
//!
//! The identity provider is external; it hands back an [`Identity`] after
//! an interactive sign-in. [`AccessPolicy::admit`] turns that identity into
//! a [`Session`], which callers pass explicitly wherever an owner id is
//! needed.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::core::error::{NotebookError, Result};

/// A signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

/// Which identities are allowed in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AccessPolicy {
    /// Any signed-in identity.
    Open,
    /// Only identities whose email is listed (compared case-insensitively).
    AllowList(Vec<String>),
}

/// An admitted identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    identity: Identity,
}

impl AccessPolicy {
    /// Builds a policy from configured emails; an empty list means [`AccessPolicy::Open`].
    pub fn from_emails(emails: &[String]) -> Self {
        if emails.is_empty() {
            Self::Open
        } else {
            Self::AllowList(emails.to_vec())
        }
    }

    /// Admits `identity` or rejects it with [`NotebookError::Authorization`].
    pub fn admit(&self, identity: Identity) -> Result<Session> {
        if identity.uid.trim().is_empty() {
            return Err(NotebookError::Authorization(
                "identity has no user id".to_string(),
            ));
        }

        if let Self::AllowList(allowed) = self {
            let permitted = identity.email.as_deref().is_some_and(|email| {
                allowed
                    .iter()
                    .any(|candidate| candidate.eq_ignore_ascii_case(email.trim()))
            });
            if !permitted {
                warn!("rejected sign-in for {}", identity.uid);
                return Err(NotebookError::Authorization(
                    "this notebook is restricted to a specific user".to_string(),
                ));
            }
        }

        info!("signed in {}", identity.uid);
        Ok(Session { identity })
    }
}

impl Session {
    /// The owner id used for every workbook this session creates or reads.
    pub fn owner_id(&self) -> &str {
        &self.identity.uid
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(uid: &str, email: Option<&str>) -> Identity {
        Identity {
            uid: uid.to_string(),
            display_name: Some("Drew".to_string()),
            email: email.map(str::to_string),
            photo_url: None,
        }
    }

    #[test]
    fn test_open_policy_admits_anyone() {
        let session = AccessPolicy::Open.admit(identity("u1", None)).unwrap();
        assert_eq!(session.owner_id(), "u1");
    }

    #[test]
    fn test_allow_list_is_case_insensitive() {
        let policy = AccessPolicy::from_emails(&["owner@example.com".to_string()]);
        let session = policy
            .admit(identity("u1", Some("Owner@Example.com")))
            .unwrap();
        assert_eq!(session.identity().display_name.as_deref(), Some("Drew"));
    }

    #[test]
    fn test_allow_list_rejects_others() {
        let policy = AccessPolicy::from_emails(&["owner@example.com".to_string()]);
        let err = policy
            .admit(identity("u2", Some("stranger@example.com")))
            .unwrap_err();
        assert!(matches!(err, NotebookError::Authorization(_)));
        assert!(policy.admit(identity("u3", None)).is_err());
    }

    #[test]
    fn test_blank_uid_is_rejected() {
        assert!(AccessPolicy::Open.admit(identity("  ", None)).is_err());
    }

    #[test]
    fn test_identity_uses_provider_field_names() {
        let json = serde_json::to_string(&identity("u1", Some("a@b.c"))).unwrap();
        assert!(json.contains("displayName"));
        assert!(json.contains("photoURL"));
    }
}

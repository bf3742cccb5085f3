//! Authorization hook consulted before every action.

use engine::{Action, Error};

/// External collaborator deciding whether an action may proceed.
///
/// Denials surface as 403 JSON:API error documents.
pub trait Authorizer: Send + Sync {
    fn authorize(
        &self,
        action: Action,
        resource_type: &str,
        id: Option<&str>,
    ) -> Result<(), Error>;
}

/// The default policy: everything is allowed.
pub struct AllowAll;

impl Authorizer for AllowAll {
    fn authorize(&self, _: Action, _: &str, _: Option<&str>) -> Result<(), Error> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DenyWrites;

    impl Authorizer for DenyWrites {
        fn authorize(
            &self,
            action: Action,
            resource_type: &str,
            _: Option<&str>,
        ) -> Result<(), Error> {
            match action {
                Action::List | Action::Show => Ok(()),
                _ => Err(Error::Forbidden(format!(
                    "write access to `{resource_type}` denied"
                ))),
            }
        }
    }

    #[test]
    fn deny_policy_maps_to_forbidden() {
        let authorizer = DenyWrites;
        assert!(authorizer.authorize(Action::Show, "users", None).is_ok());
        let err = authorizer
            .authorize(Action::Delete, "users", Some("u1"))
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }
}

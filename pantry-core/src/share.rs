//! Share payloads.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{Timestamp, UserId, ValidationError};

/// One grantee with read access to a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Share {
    pub user_id: UserId,
    pub email: String,
    pub created_at: Timestamp,
}

/// Body of `POST /api/recipes/{id}/shares`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct CreateShareRequest {
    /// Shape check only; the identity provider decides whether the address exists.
    #[validate(email)]
    pub email: String,
}

impl CreateShareRequest {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        Validate::validate(self).map_err(|_| ValidationError::InvalidEmail {
            email: self.email.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_addresses() {
        assert!(CreateShareRequest::new("a@x.com").validate().is_ok());
        assert!(CreateShareRequest::new("first.last@mail.example.org")
            .validate()
            .is_ok());
    }

    #[test]
    fn rejects_malformed_addresses() {
        for email in [
            "",
            "a",
            "a@",
            "@x.com",
            "a@@x.com",
            "a b@x.com",
            "a@.com",
            "a@x..com",
            "a@x.com.",
            "a@-x-.com",
            "a\"b@x.com",
            "a@x_y.com",
        ] {
            assert!(
                CreateShareRequest::new(email).validate().is_err(),
                "{email} should be rejected"
            );
        }
    }

    #[test]
    fn single_label_domains_are_accepted() {
        assert!(CreateShareRequest::new("a@localhost").validate().is_ok());
    }

    #[test]
    fn rejection_carries_the_address() {
        assert_eq!(
            CreateShareRequest::new("a@x..com").validate(),
            Err(ValidationError::InvalidEmail {
                email: "a@x..com".to_string()
            })
        );
    }

    #[test]
    fn share_parses_wire_shape() {
        let share: Share = serde_json::from_str(
            r#"{"userId":"user_9","email":"a@x.com","createdAt":"2024-01-12T10:00:00Z"}"#,
        )
        .unwrap();
        assert_eq!(share.user_id.as_str(), "user_9");
        assert_eq!(share.email, "a@x.com");
    }
}

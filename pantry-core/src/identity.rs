//! Identity types for recipes and users.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Server-assigned recipe identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(Uuid);

impl RecipeId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Random identifier, used by fake servers and fixtures.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for RecipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RecipeId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl From<Uuid> for RecipeId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

/// Identity-provider user identifier (e.g. `user_2abc...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_id_parses_and_displays() {
        let id = RecipeId::new_random();
        let parsed: RecipeId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert!("not-a-uuid".parse::<RecipeId>().is_err());
    }

    #[test]
    fn ids_serialize_transparently() {
        let user = UserId::new("user_123");
        assert_eq!(serde_json::to_string(&user).unwrap(), "\"user_123\"");

        let uuid = Uuid::new_v4();
        let id = RecipeId::new(uuid);
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{}\"", uuid));
    }
}

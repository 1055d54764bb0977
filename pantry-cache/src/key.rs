//! Structured cache keys and invalidation patterns.

use pantry_core::RecipeId;
use std::fmt;

/// Which recipe list a `recipes:*` key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecipeScope {
    /// Recipes owned by the signed-in user.
    Mine,
    /// Recipes other users shared with the signed-in user.
    Shared,
}

impl RecipeScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mine => "mine",
            Self::Shared => "shared",
        }
    }
}

/// Identifier of one cached query result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// `recipes:{scope}`
    Recipes(RecipeScope),
    /// `recipe:{id}`
    Recipe(RecipeId),
    /// `recipe:{id}:shares`
    RecipeShares(RecipeId),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recipes(scope) => write!(f, "recipes:{}", scope.as_str()),
            Self::Recipe(id) => write!(f, "recipe:{}", id),
            Self::RecipeShares(id) => write!(f, "recipe:{}:shares", id),
        }
    }
}

/// A set of keys, used for invalidation and write barriers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyPattern {
    /// Exactly one key.
    Key(CacheKey),
    /// Every `recipes:*` list.
    AllRecipeLists,
    /// `recipe:{id}` and everything under it (`recipe:{id}:shares`).
    RecipeFamily(RecipeId),
    /// Every key.
    All,
}

impl KeyPattern {
    pub fn matches(&self, key: &CacheKey) -> bool {
        match (self, key) {
            (Self::All, _) => true,
            (Self::Key(expected), key) => expected == key,
            (Self::AllRecipeLists, CacheKey::Recipes(_)) => true,
            (Self::AllRecipeLists, CacheKey::Recipe(_) | CacheKey::RecipeShares(_)) => false,
            (Self::RecipeFamily(id), CacheKey::Recipe(key_id))
            | (Self::RecipeFamily(id), CacheKey::RecipeShares(key_id)) => id == key_id,
            (Self::RecipeFamily(_), CacheKey::Recipes(_)) => false,
        }
    }
}

impl From<CacheKey> for KeyPattern {
    fn from(key: CacheKey) -> Self {
        Self::Key(key)
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => key.fmt(f),
            Self::AllRecipeLists => f.write_str("recipes:*"),
            Self::RecipeFamily(id) => write!(f, "recipe:{}*", id),
            Self::All => f.write_str("*"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_key() -> impl Strategy<Value = CacheKey> {
        // Small id space so pairs of keys collide often.
        let id = (0u128..4).prop_map(|n| RecipeId::new(uuid::Uuid::from_u128(n)));
        prop_oneof![
            Just(CacheKey::Recipes(RecipeScope::Mine)),
            Just(CacheKey::Recipes(RecipeScope::Shared)),
            id.clone().prop_map(CacheKey::Recipe),
            id.prop_map(CacheKey::RecipeShares),
        ]
    }

    #[test]
    fn display_matches_wire_names() {
        let id = RecipeId::new_random();
        assert_eq!(CacheKey::Recipes(RecipeScope::Mine).to_string(), "recipes:mine");
        assert_eq!(CacheKey::Recipe(id).to_string(), format!("recipe:{}", id));
        assert_eq!(
            CacheKey::RecipeShares(id).to_string(),
            format!("recipe:{}:shares", id)
        );
    }

    #[test]
    fn recipe_family_covers_detail_and_shares_only() {
        let id = RecipeId::new_random();
        let other = RecipeId::new_random();
        let family = KeyPattern::RecipeFamily(id);

        assert!(family.matches(&CacheKey::Recipe(id)));
        assert!(family.matches(&CacheKey::RecipeShares(id)));
        assert!(!family.matches(&CacheKey::Recipe(other)));
        assert!(!family.matches(&CacheKey::Recipes(RecipeScope::Shared)));
    }

    proptest! {
        #[test]
        fn all_matches_everything(key in arb_key()) {
            prop_assert!(KeyPattern::All.matches(&key));
        }

        #[test]
        fn exact_pattern_matches_only_itself(a in arb_key(), b in arb_key()) {
            prop_assert_eq!(KeyPattern::Key(a).matches(&b), a == b);
        }

        #[test]
        fn list_pattern_matches_only_lists(key in arb_key()) {
            prop_assert_eq!(
                KeyPattern::AllRecipeLists.matches(&key),
                matches!(key, CacheKey::Recipes(_))
            );
        }
    }
}

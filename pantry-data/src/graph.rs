//! The invalidation graph: which cached views each mutation makes stale.

use pantry_cache::{CacheKey, KeyPattern, RecipeScope};
use pantry_core::RecipeId;
use std::fmt;

/// Every write the data layer can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Compute-only; nothing is persisted.
    GenerateRecipe,
    SaveRecipe,
    ShareRecipe(RecipeId),
    UnshareRecipe(RecipeId),
}

impl MutationKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::GenerateRecipe => "generate-recipe",
            Self::SaveRecipe => "save-recipe",
            Self::ShareRecipe(_) => "share-recipe",
            Self::UnshareRecipe(_) => "unshare-recipe",
        }
    }

    /// Keys made stale by a successful run of this mutation.
    pub fn invalidates(&self) -> Vec<KeyPattern> {
        match *self {
            Self::GenerateRecipe => Vec::new(),
            Self::SaveRecipe => vec![KeyPattern::Key(CacheKey::Recipes(RecipeScope::Mine))],
            Self::ShareRecipe(id) | Self::UnshareRecipe(id) => vec![
                KeyPattern::Key(CacheKey::Recipe(id)),
                KeyPattern::Key(CacheKey::RecipeShares(id)),
            ],
        }
    }

    /// True if a successful run of this mutation makes `key` stale.
    pub fn affects(&self, key: &CacheKey) -> bool {
        self.invalidates().iter().any(|pattern| pattern.matches(key))
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShareRecipe(id) | Self::UnshareRecipe(id) => write!(f, "{}({})", self.name(), id),
            _ => f.write_str(self.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINE: CacheKey = CacheKey::Recipes(RecipeScope::Mine);
    const SHARED: CacheKey = CacheKey::Recipes(RecipeScope::Shared);

    #[test]
    fn generate_invalidates_nothing() {
        assert!(MutationKind::GenerateRecipe.invalidates().is_empty());
        assert!(!MutationKind::GenerateRecipe.affects(&MINE));
    }

    #[test]
    fn save_invalidates_only_my_recipes() {
        let id = RecipeId::new_random();
        let save = MutationKind::SaveRecipe;
        assert!(save.affects(&MINE));
        assert!(!save.affects(&SHARED));
        assert!(!save.affects(&CacheKey::Recipe(id)));
        assert!(!save.affects(&CacheKey::RecipeShares(id)));
    }

    #[test]
    fn share_and_unshare_invalidate_detail_and_share_list() {
        let id = RecipeId::new_random();
        let other = RecipeId::new_random();
        for kind in [MutationKind::ShareRecipe(id), MutationKind::UnshareRecipe(id)] {
            assert!(kind.affects(&CacheKey::Recipe(id)));
            assert!(kind.affects(&CacheKey::RecipeShares(id)));
            assert!(!kind.affects(&CacheKey::Recipe(other)));
            assert!(!kind.affects(&CacheKey::RecipeShares(other)));
            assert!(!kind.affects(&MINE));
            assert!(!kind.affects(&SHARED));
        }
    }

    #[test]
    fn display_names_the_recipe() {
        let id = RecipeId::new_random();
        assert_eq!(MutationKind::SaveRecipe.to_string(), "save-recipe");
        assert_eq!(
            MutationKind::UnshareRecipe(id).to_string(),
            format!("unshare-recipe({})", id)
        );
    }
}

//! Plain-text output.

use pantry_core::{Recipe, Share};
use std::fmt::Write;

pub fn recipe(recipe: &Recipe) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", recipe.title);
    match recipe.id {
        Some(id) => {
            let _ = writeln!(out, "  id: {}", id);
        }
        None => {
            let _ = writeln!(out, "  (not saved)");
        }
    }
    if let Some(owner) = &recipe.owner_email {
        let _ = writeln!(out, "  shared by: {}", owner);
    }
    if let Some(timing) = timing(recipe) {
        let _ = writeln!(out, "  {}", timing);
    }

    let _ = writeln!(out, "\nIngredients:");
    for ingredient in &recipe.ingredients {
        let _ = writeln!(out, "  - {}", ingredient);
    }
    let _ = writeln!(out, "\nInstructions:");
    for (n, step) in recipe.instructions.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}", n + 1, step);
    }
    out
}

fn timing(recipe: &Recipe) -> Option<String> {
    let parts: Vec<String> = [
        recipe.prep_time_minutes.map(|m| format!("prep {} min", m)),
        recipe.cook_time_minutes.map(|m| format!("cook {} min", m)),
        recipe.servings.map(|s| format!("serves {}", s)),
    ]
    .into_iter()
    .flatten()
    .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

pub fn recipe_list(recipes: &[Recipe]) -> String {
    if recipes.is_empty() {
        return "No recipes.\n".to_string();
    }
    let mut out = String::new();
    for recipe in recipes {
        let id = recipe.id.map(|id| id.to_string()).unwrap_or_default();
        match &recipe.owner_email {
            Some(owner) => {
                let _ = writeln!(out, "{}  {}  ({})", id, recipe.title, owner);
            }
            None => {
                let _ = writeln!(out, "{}  {}", id, recipe.title);
            }
        }
    }
    out
}

pub fn share_list(shares: &[Share]) -> String {
    if shares.is_empty() {
        return "Not shared with anyone.\n".to_string();
    }
    let mut out = String::new();
    for share in shares {
        let _ = writeln!(
            out,
            "{}  {}  since {}",
            share.user_id,
            share.email,
            share.created_at.format("%Y-%m-%d")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pantry_core::{RecipeId, UserId};

    fn stew() -> Recipe {
        Recipe {
            id: None,
            owner_id: None,
            owner_email: None,
            title: "Stew".to_string(),
            ingredients: vec!["beef".to_string(), "carrot".to_string()],
            instructions: vec!["Brown the beef.".to_string(), "Simmer.".to_string()],
            prep_time_minutes: Some(15),
            cook_time_minutes: None,
            servings: Some(4),
            created_at: None,
        }
    }

    #[test]
    fn unsaved_recipe_is_marked() {
        let text = recipe(&stew());
        assert!(text.starts_with("Stew\n  (not saved)\n"));
        assert!(text.contains("prep 15 min, serves 4"));
        assert!(text.contains("  2. Simmer."));
    }

    #[test]
    fn shared_recipes_show_owner() {
        let id = RecipeId::new_random();
        let shared = Recipe {
            id: Some(id),
            owner_email: Some("chef@example.com".to_string()),
            ..stew()
        };
        assert_eq!(
            recipe_list(&[shared]),
            format!("{}  Stew  (chef@example.com)\n", id)
        );
        assert_eq!(recipe_list(&[]), "No recipes.\n");
    }

    #[test]
    fn shares_render_one_per_line() {
        let share = Share {
            user_id: UserId::new("user_2"),
            email: "a@x.com".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
        };
        assert_eq!(share_list(&[share]), "user_2  a@x.com  since 2024-03-01\n");
    }
}

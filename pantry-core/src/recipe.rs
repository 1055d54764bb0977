//! Recipe payloads.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{RecipeId, Timestamp, UserId, ValidationError};

/// A recipe as seen by the client.
///
/// Generated recipes come back from the service without `id`, `owner_id` or
/// `created_at`; the server assigns all three when the recipe is saved. An
/// absent `id` therefore means "not yet persisted".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecipeId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
    /// Only populated when the viewer is not the owner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_email: Option<String>,
    pub title: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

impl Recipe {
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Build the body used to save this recipe. Server-owned fields are dropped.
    pub fn to_save_request(&self) -> SaveRecipeRequest {
        SaveRecipeRequest {
            title: self.title.clone(),
            ingredients: self.ingredients.clone(),
            instructions: self.instructions.clone(),
            prep_time_minutes: self.prep_time_minutes,
            cook_time_minutes: self.cook_time_minutes,
            servings: self.servings,
        }
    }
}

/// Body of `POST /api/recipes/generate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRecipeRequest {
    #[validate(custom(function = "validate_ingredients"))]
    pub ingredients: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dietary_restrictions: Option<Vec<String>>,
}

impl GenerateRecipeRequest {
    pub fn new<I, S>(ingredients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ingredients: ingredients.into_iter().map(Into::into).collect(),
            dietary_restrictions: None,
        }
    }

    pub fn with_dietary_restrictions<I, S>(mut self, restrictions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dietary_restrictions = Some(restrictions.into_iter().map(Into::into).collect());
        self
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        Validate::validate(self).map_err(|_| ValidationError::EmptyIngredients)
    }
}

/// Body of `POST /api/recipes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecipeRequest {
    #[validate(length(min = 1))]
    pub title: String,
    #[validate(custom(function = "validate_ingredients"))]
    pub ingredients: Vec<String>,
    #[validate(length(min = 1))]
    pub instructions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time_minutes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub servings: Option<u32>,
}

impl SaveRecipeRequest {
    /// Same rules as the service. Reports the first failing field in body order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        Validate::validate(self).map_err(|report| {
            let failed = report.field_errors();
            if failed.contains_key("title") {
                ValidationError::RequiredFieldMissing { field: "title" }
            } else if failed.contains_key("ingredients") {
                ValidationError::EmptyIngredients
            } else {
                ValidationError::RequiredFieldMissing {
                    field: "instructions",
                }
            }
        })
    }
}

fn validate_ingredients(ingredients: &[String]) -> Result<(), validator::ValidationError> {
    if ingredients.iter().any(|s| !s.trim().is_empty()) {
        Ok(())
    } else {
        Err(validator::ValidationError::new(
            "at_least_one_non_empty_ingredient",
        ))
    }
}

//! Recipe service endpoints, bound to typed resource clients.

use pantry_client::{ClientError, RequestGateway, ResourceClient};
use pantry_core::{
    CreateShareRequest, GenerateRecipeRequest, Recipe, RecipeId, SaveRecipeRequest, Share, UserId,
};

pub const RECIPES_PATH: &str = "/api/recipes";
pub const SHARED_RECIPES_PATH: &str = "/api/recipes/shared";
const GENERATE_SUBPATH: &str = "generate";
const SHARES_SEGMENT: &str = "shares";

/// Raw calls with no caching or invalidation.
#[derive(Clone)]
pub struct RecipeApi {
    recipes: ResourceClient<Recipe>,
    shared: ResourceClient<Recipe>,
}

impl RecipeApi {
    pub fn new(gateway: RequestGateway) -> Self {
        Self {
            recipes: ResourceClient::new(gateway.clone(), RECIPES_PATH),
            shared: ResourceClient::new(gateway, SHARED_RECIPES_PATH),
        }
    }

    /// `POST /api/recipes/generate`. The result has no id.
    pub async fn generate(&self, request: &GenerateRecipeRequest) -> Result<Recipe, ClientError> {
        self.recipes.post(request, Some(GENERATE_SUBPATH)).await
    }

    pub async fn save(&self, request: &SaveRecipeRequest) -> Result<Recipe, ClientError> {
        self.recipes.post(request, None).await
    }

    pub async fn mine(&self) -> Result<Vec<Recipe>, ClientError> {
        self.recipes.get_all().await
    }

    pub async fn shared_with_me(&self) -> Result<Vec<Recipe>, ClientError> {
        self.shared.get_all().await
    }

    pub async fn recipe(&self, id: RecipeId) -> Result<Recipe, ClientError> {
        self.recipes.get(id).await
    }

    pub async fn shares(&self, id: RecipeId) -> Result<Vec<Share>, ClientError> {
        self.shares_client(id)?.get_all().await
    }

    /// `POST /api/recipes/{id}/shares`; the service answers `201` with no body.
    pub async fn share(&self, id: RecipeId, request: &CreateShareRequest) -> Result<(), ClientError> {
        let subpath = format!("{}/{}", id, SHARES_SEGMENT);
        self.recipes
            .post::<CreateShareRequest, ()>(request, Some(&subpath))
            .await
    }

    pub async fn unshare(&self, id: RecipeId, user_id: &UserId) -> Result<(), ClientError> {
        self.shares_client(id)?.delete(user_id).await
    }

    fn shares_client(&self, id: RecipeId) -> Result<ResourceClient<Share>, ClientError> {
        self.recipes.nested(id, SHARES_SEGMENT)
    }
}

//! The facade UI collaborators use: read hooks and write hooks over one cache.

use pantry_cache::{CacheKey, CacheStore, RecipeScope};
use pantry_client::{ClientConfig, ClientError, CredentialProvider, RequestGateway};
use pantry_core::{
    CreateShareRequest, GenerateRecipeRequest, Recipe, RecipeId, SaveRecipeRequest, Share, UserId,
};

use crate::api::RecipeApi;
use crate::coordinator::MutationCoordinator;
use crate::error::DataError;
use crate::graph::MutationKind;
use crate::mutation::Mutation;
use crate::query::Query;

/// Recipe reads and writes for one signed-in session.
///
/// Cheap to clone; clones share the cache and the credential provider.
#[derive(Clone)]
pub struct RecipeDataLayer {
    api: RecipeApi,
    cache: CacheStore<ClientError>,
    coordinator: MutationCoordinator,
    credentials: CredentialProvider,
}

impl RecipeDataLayer {
    pub fn new(
        gateway: RequestGateway,
        cache: CacheStore<ClientError>,
        credentials: CredentialProvider,
    ) -> Self {
        Self {
            api: RecipeApi::new(gateway),
            coordinator: MutationCoordinator::new(cache.clone()),
            cache,
            credentials,
        }
    }

    /// HTTP-backed layer for `config`, authenticating through `credentials`.
    pub fn from_config(
        config: &ClientConfig,
        credentials: CredentialProvider,
    ) -> Result<Self, ClientError> {
        let gateway = RequestGateway::from_config(config, credentials.clone())?;
        let cache = CacheStore::new(config.cache.clone());
        Ok(Self::new(gateway, cache, credentials))
    }

    pub fn api(&self) -> &RecipeApi {
        &self.api
    }

    pub fn cache(&self) -> &CacheStore<ClientError> {
        &self.cache
    }

    pub fn credentials(&self) -> &CredentialProvider {
        &self.credentials
    }

    // Read hooks

    pub fn my_recipes(&self) -> Query<Vec<Recipe>> {
        let api = self.api.clone();
        Query::new(
            self.cache.clone(),
            CacheKey::Recipes(RecipeScope::Mine),
            move || {
                let api = api.clone();
                async move { api.mine().await }
            },
        )
    }

    pub fn shared_recipes(&self) -> Query<Vec<Recipe>> {
        let api = self.api.clone();
        Query::new(
            self.cache.clone(),
            CacheKey::Recipes(RecipeScope::Shared),
            move || {
                let api = api.clone();
                async move { api.shared_with_me().await }
            },
        )
    }

    /// Recipe detail. Disabled until an id is known.
    pub fn recipe(&self, id: Option<RecipeId>) -> Query<Recipe> {
        let Some(id) = id else {
            return Query::disabled(self.cache.clone());
        };
        let api = self.api.clone();
        Query::new(self.cache.clone(), CacheKey::Recipe(id), move || {
            let api = api.clone();
            async move { api.recipe(id).await }
        })
    }

    /// Grantees of a recipe. Disabled until an id is known.
    pub fn recipe_shares(&self, id: Option<RecipeId>) -> Query<Vec<Share>> {
        let Some(id) = id else {
            return Query::disabled(self.cache.clone());
        };
        let api = self.api.clone();
        Query::new(self.cache.clone(), CacheKey::RecipeShares(id), move || {
            let api = api.clone();
            async move { api.shares(id).await }
        })
    }

    // Writes

    /// Generate a recipe from ingredients. Nothing is persisted or invalidated.
    pub async fn generate_recipe(&self, request: GenerateRecipeRequest) -> Result<Recipe, DataError> {
        request.validate()?;
        let api = self.api.clone();
        self.coordinator
            .run(MutationKind::GenerateRecipe, async move {
                api.generate(&request).await
            })
            .await
    }

    pub async fn save_recipe(&self, request: SaveRecipeRequest) -> Result<Recipe, DataError> {
        request.validate()?;
        let api = self.api.clone();
        self.coordinator
            .run(MutationKind::SaveRecipe, async move { api.save(&request).await })
            .await
    }

    pub async fn share_recipe(
        &self,
        id: RecipeId,
        request: CreateShareRequest,
    ) -> Result<(), DataError> {
        request.validate()?;
        let api = self.api.clone();
        self.coordinator
            .run(MutationKind::ShareRecipe(id), async move {
                api.share(id, &request).await
            })
            .await
    }

    pub async fn unshare_recipe(&self, id: RecipeId, user_id: UserId) -> Result<(), DataError> {
        let api = self.api.clone();
        self.coordinator
            .run(MutationKind::UnshareRecipe(id), async move {
                api.unshare(id, &user_id).await
            })
            .await
    }

    // Write hooks

    pub fn generate_mutation(&self) -> Mutation<GenerateRecipeRequest, Recipe> {
        let layer = self.clone();
        Mutation::new(move |request: GenerateRecipeRequest| {
            let layer = layer.clone();
            async move { layer.generate_recipe(request).await }
        })
    }

    pub fn save_mutation(&self) -> Mutation<SaveRecipeRequest, Recipe> {
        let layer = self.clone();
        Mutation::new(move |request: SaveRecipeRequest| {
            let layer = layer.clone();
            async move { layer.save_recipe(request).await }
        })
    }

    pub fn share_mutation(&self) -> Mutation<(RecipeId, CreateShareRequest), ()> {
        let layer = self.clone();
        Mutation::new(move |(id, request): (RecipeId, CreateShareRequest)| {
            let layer = layer.clone();
            async move { layer.share_recipe(id, request).await }
        })
    }

    pub fn unshare_mutation(&self) -> Mutation<(RecipeId, UserId), ()> {
        let layer = self.clone();
        Mutation::new(move |(id, user_id): (RecipeId, UserId)| {
            let layer = layer.clone();
            async move { layer.unshare_recipe(id, user_id).await }
        })
    }

    /// End the session: drop the credential source and every cached view.
    pub fn sign_out(&self) {
        self.credentials.clear();
        let cleared = self.cache.clear();
        tracing::info!(entries = cleared, "Signed out");
    }
}

//! Pantry Test Utilities
//!
//! Shared test infrastructure for the Pantry workspace:
//! - An in-memory fake of the recipe service, reachable in-process or over HTTP
//! - Transports and credential sources for driving the client stack
//! - Proptest generators for request and identity types
//! - Fixtures and assertions for common scenarios

pub mod http;
pub mod service;
pub mod transport;

pub use http::{spawn_http_server, FakeServer};
pub use service::{FakeRecipeService, FakeUser, HeldRequests, RecordedRequest};
pub use transport::{InMemoryTransport, UnreachableTransport};

// Re-export core types for convenience
pub use pantry_cache::{CacheConfig, CacheKey, CacheStore, KeyPattern, RecipeScope};
pub use pantry_client::{
    ClientError, CredentialProvider, CredentialSource, Method, RequestGateway, StaticToken,
};
pub use pantry_core::{
    CreateShareRequest, GenerateRecipeRequest, Recipe, RecipeId, SaveRecipeRequest, Share,
    Timestamp, UserId, ValidationError,
};
pub use pantry_data::{DataError, MutationKind, RecipeDataLayer};

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Pantry request and identity types.

    use super::*;
    use proptest::prelude::*;
    use uuid::Uuid;

    pub fn arb_recipe_id() -> impl Strategy<Value = RecipeId> {
        any::<u128>().prop_map(|n| RecipeId::new(Uuid::from_u128(n)))
    }

    /// Ids drawn from a small pool, so generated keys collide often.
    pub fn arb_pooled_recipe_id(pool: u128) -> impl Strategy<Value = RecipeId> {
        (0..pool.max(1)).prop_map(|n| RecipeId::new(Uuid::from_u128(n)))
    }

    pub fn arb_ingredient() -> impl Strategy<Value = String> {
        "[a-z]{2,12}( [a-z]{2,8})?"
    }

    /// Surrounding whitespace and blank entries included, as typed by users.
    pub fn arb_raw_ingredient() -> impl Strategy<Value = String> {
        prop_oneof![
            3 => arb_ingredient(),
            1 => arb_ingredient().prop_map(|s| format!("  {}\t", s)),
            1 => Just(String::new()),
            1 => Just("   ".to_string()),
        ]
    }

    pub fn arb_generate_request() -> impl Strategy<Value = GenerateRecipeRequest> {
        (
            prop::collection::vec(arb_ingredient(), 1..6),
            prop::option::of(prop::collection::vec("[a-z]{4,10}", 0..3)),
        )
            .prop_map(|(ingredients, restrictions)| {
                let request = GenerateRecipeRequest::new(ingredients);
                match restrictions {
                    Some(restrictions) => request.with_dietary_restrictions(restrictions),
                    None => request,
                }
            })
    }

    pub fn arb_save_request() -> impl Strategy<Value = SaveRecipeRequest> {
        (
            "[A-Z][a-z]{2,10}( [a-z]{2,10}){0,3}",
            prop::collection::vec(arb_ingredient(), 1..8),
            prop::collection::vec("[A-Z][a-z ]{5,30}\\.", 1..6),
            prop::option::of(0u32..120),
            prop::option::of(0u32..240),
            prop::option::of(1u32..12),
        )
            .prop_map(
                |(title, ingredients, instructions, prep, cook, servings)| SaveRecipeRequest {
                    title,
                    ingredients,
                    instructions,
                    prep_time_minutes: prep,
                    cook_time_minutes: cook,
                    servings,
                },
            )
    }

    pub fn arb_email() -> impl Strategy<Value = String> {
        ("[a-z]{1,10}", "[a-z]{2,8}", "(com|org|net)")
            .prop_map(|(local, domain, tld)| format!("{}@{}.{}", local, domain, tld))
    }

    pub fn arb_recipe_scope() -> impl Strategy<Value = RecipeScope> {
        prop_oneof![Just(RecipeScope::Mine), Just(RecipeScope::Shared)]
    }

    pub fn arb_cache_key(pool: u128) -> impl Strategy<Value = CacheKey> {
        prop_oneof![
            arb_recipe_scope().prop_map(CacheKey::Recipes),
            arb_pooled_recipe_id(pool).prop_map(CacheKey::Recipe),
            arb_pooled_recipe_id(pool).prop_map(CacheKey::RecipeShares),
        ]
    }

    pub fn arb_mutation_kind(pool: u128) -> impl Strategy<Value = MutationKind> {
        prop_oneof![
            Just(MutationKind::GenerateRecipe),
            Just(MutationKind::SaveRecipe),
            arb_pooled_recipe_id(pool).prop_map(MutationKind::ShareRecipe),
            arb_pooled_recipe_id(pool).prop_map(MutationKind::UnshareRecipe),
        ]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built sessions, requests and credential sources.

    use super::*;
    use pantry_client::{credential_fn, CredentialError};
    use std::sync::Arc;
    use std::time::Duration;

    pub const CREDENTIAL_TIMEOUT: Duration = Duration::from_secs(2);

    pub fn egg_and_rice() -> GenerateRecipeRequest {
        GenerateRecipeRequest::new(["egg", "rice"])
    }

    pub fn omelette() -> SaveRecipeRequest {
        SaveRecipeRequest {
            title: "Omelette".to_string(),
            ingredients: vec!["egg".to_string(), "butter".to_string()],
            instructions: vec!["Whisk the eggs.".to_string(), "Fry in butter.".to_string()],
            prep_time_minutes: Some(5),
            cook_time_minutes: Some(5),
            servings: Some(1),
        }
    }

    pub fn titled(title: &str) -> SaveRecipeRequest {
        SaveRecipeRequest {
            title: title.to_string(),
            ..omelette()
        }
    }

    /// Provider that presents `user`'s token.
    pub fn signed_in(user: &FakeUser) -> CredentialProvider {
        let credentials = CredentialProvider::new(CREDENTIAL_TIMEOUT);
        credentials.set_source(Arc::new(StaticToken::new(user.token.clone())));
        credentials
    }

    /// Provider with no source installed.
    pub fn signed_out() -> CredentialProvider {
        CredentialProvider::new(CREDENTIAL_TIMEOUT)
    }

    /// A source whose every resolution fails.
    pub fn failing_source() -> Arc<dyn CredentialSource> {
        Arc::new(credential_fn(|| async {
            Err(CredentialError::Provider("session store unavailable".to_string()))
        }))
    }

    /// A source that takes `delay` to answer with `token`.
    pub fn slow_source(token: String, delay: Duration) -> Arc<dyn CredentialSource> {
        Arc::new(credential_fn(move || {
            let token = token.clone();
            async move {
                tokio::time::sleep(delay).await;
                Ok(Some(pantry_client::Credential::new(token)))
            }
        }))
    }

    pub fn in_memory_gateway(
        service: &FakeRecipeService,
        credentials: CredentialProvider,
    ) -> RequestGateway {
        RequestGateway::new(
            Arc::new(InMemoryTransport::new(service.clone())),
            credentials,
        )
    }

    /// A data layer talking to `service` with its own cache.
    pub fn layer_with(
        service: &FakeRecipeService,
        credentials: CredentialProvider,
        config: CacheConfig,
    ) -> RecipeDataLayer {
        let gateway = in_memory_gateway(service, credentials.clone());
        RecipeDataLayer::new(gateway, CacheStore::new(config), credentials)
    }

    /// A data layer signed in as `user`.
    pub fn layer_for(service: &FakeRecipeService, user: &FakeUser) -> RecipeDataLayer {
        layer_with(service, signed_in(user), CacheConfig::default())
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions on data-layer outcomes.

    use super::*;
    use std::fmt::Debug;

    /// Assert the call failed with an HTTP `status`.
    #[track_caller]
    pub fn assert_http_status<T: Debug>(result: &Result<T, DataError>, status: u16) {
        match result {
            Err(err) if err.status() == Some(status) => {}
            other => panic!("Expected HTTP {} error, got: {:?}", status, other),
        }
    }

    /// Assert the call was rejected before any request was made.
    #[track_caller]
    pub fn assert_validation_error<T: Debug>(result: &Result<T, DataError>) {
        match result {
            Err(DataError::Validation(_)) => {}
            other => panic!("Expected validation error, got: {:?}", other),
        }
    }

    /// Assert the service saw exactly `expected` calls to `method path`.
    #[track_caller]
    pub fn assert_requests(service: &FakeRecipeService, method: Method, path: &str, expected: usize) {
        let seen = service.request_count(method, path);
        assert_eq!(
            seen, expected,
            "Expected {} {} {} time(s), saw {}",
            method, path, expected, seen
        );
    }
}

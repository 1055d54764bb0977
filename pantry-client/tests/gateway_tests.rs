//! Gateway behavior against the fake recipe service.

use async_trait::async_trait;
use pantry_client::{
    ApiRequest, ApiResponse, ClientError, CredentialProvider, HttpTransport, Method,
    RequestGateway, ResourceClient, StaticToken, Transport,
};
use pantry_core::{CreateShareRequest, Recipe, RecipeId, Share};
use pantry_test_utils::fixtures::{
    egg_and_rice, failing_source, in_memory_gateway, omelette, signed_in, signed_out, slow_source,
};
use pantry_test_utils::{spawn_http_server, FakeRecipeService, UnreachableTransport};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const RECIPES: &str = "/api/recipes";

#[tokio::test]
async fn attaches_bearer_of_active_source() {
    let service = FakeRecipeService::new();
    let alice = service.add_user("alice@example.com");
    let gateway = in_memory_gateway(&service, signed_in(&alice));

    let mine: Vec<Recipe> = gateway.list(RECIPES).await.unwrap();
    assert!(mine.is_empty());

    let requests = service.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].bearer.as_deref(), Some(alice.token.as_str()));
}

#[tokio::test]
async fn failing_source_dispatches_unauthenticated() {
    let service = FakeRecipeService::new();
    let credentials = signed_out();
    credentials.set_source(failing_source());
    let gateway = in_memory_gateway(&service, credentials);

    // Public route still succeeds.
    let generated: Recipe = gateway
        .create(&format!("{}/generate", RECIPES), &egg_and_rice(), None)
        .await
        .unwrap();
    assert!(!generated.is_persisted());

    let err = gateway.list::<Recipe>(RECIPES).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert!(service.requests().iter().all(|r| r.bearer.is_none()));
}

#[tokio::test]
async fn slow_source_times_out_to_unauthenticated() {
    let service = FakeRecipeService::new();
    let alice = service.add_user("alice@example.com");
    let credentials = CredentialProvider::new(Duration::from_millis(20));
    credentials.set_source(slow_source(alice.token.clone(), Duration::from_secs(5)));
    let gateway = in_memory_gateway(&service, credentials);

    let err = gateway.list::<Recipe>(RECIPES).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert_eq!(service.requests()[0].bearer, None);
}

#[tokio::test]
async fn source_swap_applies_to_later_requests() {
    let service = FakeRecipeService::new();
    let alice = service.add_user("alice@example.com");
    let bob = service.add_user("bob@example.com");
    let credentials = signed_in(&alice);
    let gateway = in_memory_gateway(&service, credentials.clone());

    let _: Vec<Recipe> = gateway.list(RECIPES).await.unwrap();
    credentials.set_source(Arc::new(StaticToken::new(bob.token.clone())));
    let _: Vec<Recipe> = gateway.list(RECIPES).await.unwrap();
    credentials.clear();
    let _ = gateway.list::<Recipe>(RECIPES).await;

    let bearers: Vec<_> = service.requests().into_iter().map(|r| r.bearer).collect();
    assert_eq!(
        bearers,
        vec![Some(alice.token.clone()), Some(bob.token.clone()), None]
    );
}

#[tokio::test]
async fn server_error_message_is_surfaced() {
    let service = FakeRecipeService::new();
    let alice = service.add_user("alice@example.com");
    service.fail_next(Method::Get, RECIPES, 500, "database unavailable");
    let gateway = in_memory_gateway(&service, signed_in(&alice));

    let err = gateway.list::<Recipe>(RECIPES).await.unwrap_err();
    assert_eq!(
        err,
        ClientError::Http {
            status: 500,
            message: "database unavailable".to_string()
        }
    );

    // Injected failures are one-shot.
    assert!(gateway.list::<Recipe>(RECIPES).await.is_ok());
}

#[tokio::test]
async fn transport_failure_is_a_network_error() {
    let gateway = RequestGateway::new(Arc::new(UnreachableTransport), signed_out());

    let err = gateway.list::<Recipe>(RECIPES).await.unwrap_err();
    assert!(matches!(err, ClientError::Network { .. }));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn http_transport_round_trip() {
    let service = FakeRecipeService::new();
    let alice = service.add_user("alice@example.com");
    let bob = service.add_user("bob@example.com");
    let server = spawn_http_server(service.clone()).await.unwrap();

    let transport = HttpTransport::with_timeout(&server.base_url(), Duration::from_secs(5)).unwrap();
    let gateway = RequestGateway::new(Arc::new(transport), signed_in(&alice));
    let recipes: ResourceClient<Recipe> = ResourceClient::new(gateway, RECIPES);

    let saved: Recipe = recipes.post(&omelette(), None).await.unwrap();
    let id = saved.id.expect("saved recipe has an id");
    assert_eq!(recipes.get(id).await.unwrap().title, "Omelette");
    assert_eq!(recipes.get_all().await.unwrap().len(), 1);

    let shares = recipes.nested::<Share>(id, "shares").unwrap();
    let _: () = shares
        .post(&CreateShareRequest::new(bob.email.clone()), None)
        .await
        .unwrap();
    let listed = shares.get_all().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].email, bob.email);

    shares.delete(&bob.id).await.unwrap();
    assert!(shares.get_all().await.unwrap().is_empty());

    let err = shares
        .post::<_, ()>(&CreateShareRequest::new("nobody@example.com"), None)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        ClientError::Http {
            status: 404,
            message: "User with this email not found".to_string()
        }
    );
}

/// Records every request and answers with the request body merged into
/// `{"id": <last path segment>}`.
#[derive(Default)]
struct EchoTransport {
    seen: Mutex<Vec<ApiRequest>>,
}

impl EchoTransport {
    fn seen(&self) -> Vec<ApiRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for EchoTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ClientError> {
        let id = request.path.rsplit('/').next().unwrap_or_default().to_string();
        let mut body = request.body.clone().unwrap_or_else(|| serde_json::json!({}));
        body["id"] = serde_json::Value::String(id);
        self.seen.lock().unwrap().push(request);
        Ok(ApiResponse::json(200, &body))
    }
}

#[tokio::test]
async fn update_sends_patch_with_body_and_bearer() {
    let transport = Arc::new(EchoTransport::default());
    let credentials = CredentialProvider::default();
    credentials.set_source(Arc::new(StaticToken::new("tok-alice")));
    let gateway = RequestGateway::new(transport.clone(), credentials);
    let id = RecipeId::new_random();

    let updated: Recipe = gateway.update(RECIPES, id, &omelette()).await.unwrap();
    assert_eq!(updated.id, Some(id));
    assert_eq!(updated.title, "Omelette");
    assert_eq!(updated.servings, Some(1));

    let seen = transport.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, Method::Patch);
    assert_eq!(seen[0].path, format!("{}/{}", RECIPES, id));
    assert_eq!(seen[0].bearer_token(), Some("tok-alice"));
    assert_eq!(
        seen[0].body,
        Some(serde_json::to_value(omelette()).unwrap())
    );
}

#[tokio::test]
async fn resource_patch_decodes_the_collection_type() {
    let transport = Arc::new(EchoTransport::default());
    let gateway = RequestGateway::new(transport.clone(), CredentialProvider::default());
    let recipes = ResourceClient::<Recipe>::new(gateway, RECIPES);
    let id = RecipeId::new_random();

    let patched = recipes
        .patch(id, &serde_json::json!({
            "title": "Fried rice",
            "ingredients": ["rice", "egg"],
            "instructions": ["Fry."],
        }))
        .await
        .unwrap();
    assert_eq!(patched.id, Some(id));
    assert_eq!(patched.title, "Fried rice");
    assert_eq!(patched.ingredients, vec!["rice", "egg"]);

    let seen = transport.seen();
    assert_eq!(seen[0].method, Method::Patch);
    assert_eq!(seen[0].path, format!("{}/{}", RECIPES, id));
    assert_eq!(seen[0].bearer_token(), None);

    let err = recipes
        .patch(id, &serde_json::json!({ "title": "No ingredients" }))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Decode { .. }));
}

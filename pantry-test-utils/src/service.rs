//! In-memory stand-in for the recipe service.
//!
//! Routes, status codes and error bodies follow the real service: `{error}`
//! payloads on failure, `201`/`204` with empty bodies for share writes, and
//! owner-or-grantee access rules on recipe reads.

use chrono::{Duration as ChronoDuration, Utc};
use pantry_client::{ApiResponse, Method};
use pantry_core::{
    CreateShareRequest, GenerateRecipeRequest, Recipe, RecipeId, SaveRecipeRequest, Share,
    Timestamp, UserId,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;

/// A registered account on the fake service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeUser {
    pub id: UserId,
    pub email: String,
    pub token: String,
}

/// One request as the service received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    /// Bearer token, when an `Authorization` header was sent.
    pub bearer: Option<String>,
}

#[derive(Debug, Clone)]
struct ShareRow {
    recipe_id: RecipeId,
    user_id: UserId,
    created_at: Timestamp,
}

#[derive(Debug, Clone)]
struct Failure {
    method: Method,
    path: String,
    status: u16,
    message: String,
}

struct ServiceState {
    users: Vec<FakeUser>,
    /// Insertion order; listings reverse it for newest-first.
    recipes: Vec<Recipe>,
    shares: Vec<ShareRow>,
    requests: Vec<RecordedRequest>,
    failures: Vec<Failure>,
    epoch: Timestamp,
    ticks: i64,
}

impl ServiceState {
    /// Strictly increasing timestamps so ordering never ties.
    fn now(&mut self) -> Timestamp {
        self.ticks += 1;
        self.epoch + ChronoDuration::seconds(self.ticks)
    }

    fn user_by_token(&self, token: &str) -> Option<&FakeUser> {
        self.users.iter().find(|user| user.token == token)
    }

    fn user_by_id(&self, id: &UserId) -> Option<&FakeUser> {
        self.users.iter().find(|user| &user.id == id)
    }

    fn user_by_email(&self, email: &str) -> Option<&FakeUser> {
        self.users
            .iter()
            .find(|user| user.email.eq_ignore_ascii_case(email))
    }

    fn is_grantee(&self, recipe_id: RecipeId, user_id: &UserId) -> bool {
        self.shares
            .iter()
            .any(|row| row.recipe_id == recipe_id && &row.user_id == user_id)
    }

    /// The recipe as `viewer` sees it, with `owner_email` set for non-owners.
    fn view(&self, recipe: &Recipe, viewer: &UserId) -> Recipe {
        let mut view = recipe.clone();
        if recipe.owner_id.as_ref() != Some(viewer) {
            view.owner_email = recipe
                .owner_id
                .as_ref()
                .and_then(|owner| self.user_by_id(owner))
                .map(|owner| owner.email.clone());
        }
        view
    }
}

/// Shared handle to the fake service. Clones share state.
#[derive(Clone)]
pub struct FakeRecipeService {
    state: Arc<Mutex<ServiceState>>,
    gate: Arc<watch::Sender<bool>>,
}

impl Default for FakeRecipeService {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds every request that arrives until dropped.
pub struct HeldRequests {
    gate: Arc<watch::Sender<bool>>,
}

impl HeldRequests {
    pub fn release(self) {}
}

impl Drop for HeldRequests {
    fn drop(&mut self) {
        self.gate.send_replace(true);
    }
}

impl FakeRecipeService {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            state: Arc::new(Mutex::new(ServiceState {
                users: Vec::new(),
                recipes: Vec::new(),
                shares: Vec::new(),
                requests: Vec::new(),
                failures: Vec::new(),
                epoch: Utc::now(),
                ticks: 0,
            })),
            gate: Arc::new(gate),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ServiceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register an account. Its token is what a client sends as bearer.
    pub fn add_user(&self, email: &str) -> FakeUser {
        let mut state = self.lock();
        let n = state.users.len() + 1;
        let user = FakeUser {
            id: UserId::new(format!("user_{}", n)),
            email: email.to_string(),
            token: format!("token-{}", n),
        };
        state.users.push(user.clone());
        user
    }

    /// Store a recipe owned by `owner` without going through a request.
    pub fn seed_recipe(&self, owner: &FakeUser, request: &SaveRecipeRequest) -> Recipe {
        let mut state = self.lock();
        let recipe = persist(&mut state, &owner.id, request);
        state.recipes.push(recipe.clone());
        recipe
    }

    /// Answer the next matching request with `status` and `{error: message}`.
    pub fn fail_next(&self, method: Method, path: impl Into<String>, status: u16, message: &str) {
        self.lock().failures.push(Failure {
            method,
            path: path.into(),
            status,
            message: message.to_string(),
        });
    }

    /// Stop answering requests until the returned guard is dropped. Requests
    /// are still recorded on arrival.
    pub fn hold(&self) -> HeldRequests {
        self.gate.send_replace(false);
        HeldRequests {
            gate: Arc::clone(&self.gate),
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().requests.clone()
    }

    pub fn request_count(&self, method: Method, path: &str) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|request| request.method == method && request.path == path)
            .count()
    }

    pub fn recipe_count(&self) -> usize {
        self.lock().recipes.len()
    }

    pub fn share_count(&self, recipe_id: RecipeId) -> usize {
        self.lock()
            .shares
            .iter()
            .filter(|row| row.recipe_id == recipe_id)
            .count()
    }

    /// Record, wait while held, then answer.
    pub async fn dispatch(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: Option<&Value>,
    ) -> ApiResponse {
        self.lock().requests.push(RecordedRequest {
            method,
            path: path.to_string(),
            bearer: bearer.map(str::to_string),
        });

        let mut open = self.gate.subscribe();
        let _ = open.wait_for(|open| *open).await;

        self.handle(method, path, bearer, body)
    }

    /// Answer immediately, without recording or holding.
    pub fn handle(
        &self,
        method: Method,
        path: &str,
        bearer: Option<&str>,
        body: Option<&Value>,
    ) -> ApiResponse {
        let mut state = self.lock();

        if let Some(index) = state
            .failures
            .iter()
            .position(|failure| failure.method == method && failure.path == path)
        {
            let failure = state.failures.remove(index);
            return error(failure.status, &failure.message);
        }

        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
        let route = match segments.as_slice() {
            ["api", "recipes", rest @ ..] => rest,
            _ => return error(404, "Not found"),
        };

        // Generation is the one public route.
        if let (["generate"], Method::Post) = (route, method) {
            return generate(body);
        }

        let Some(user) = bearer.and_then(|token| state.user_by_token(token)).cloned() else {
            return error(401, "Unauthorized");
        };

        match (route, method) {
            ([], Method::Get) => list_mine(&state, &user),
            ([], Method::Post) => save(&mut state, &user, body),
            (["shared"], Method::Get) => list_shared(&state, &user),
            ([id], Method::Get) => with_recipe_id(id, |id| get_recipe(&state, &user, id)),
            ([id, "shares"], Method::Get) => {
                with_recipe_id(id, |id| list_shares(&state, &user, id))
            }
            ([id, "shares"], Method::Post) => {
                with_recipe_id(id, |id| create_share(&mut state, &user, id, body))
            }
            ([id, "shares", grantee], Method::Delete) => with_recipe_id(id, |id| {
                delete_share(&mut state, &user, id, &UserId::new(*grantee))
            }),
            _ => error(405, "Method not allowed"),
        }
    }
}

fn error(status: u16, message: &str) -> ApiResponse {
    ApiResponse::json(status, &json!({ "error": message }))
}

fn ok_json<T: serde::Serialize>(value: &T) -> ApiResponse {
    match serde_json::to_value(value) {
        Ok(value) => ApiResponse::json(200, &value),
        Err(err) => error(500, &err.to_string()),
    }
}

fn parse_body<T: DeserializeOwned>(body: Option<&Value>) -> Result<T, ApiResponse> {
    let body = body.ok_or_else(|| error(400, "Missing JSON body"))?;
    serde_json::from_value(body.clone()).map_err(|_| error(400, "Invalid JSON body"))
}

fn with_recipe_id(raw: &str, f: impl FnOnce(RecipeId) -> ApiResponse) -> ApiResponse {
    match RecipeId::from_str(raw) {
        Ok(id) => f(id),
        Err(_) => error(400, "Invalid recipe id"),
    }
}

fn persist(state: &mut ServiceState, owner: &UserId, request: &SaveRecipeRequest) -> Recipe {
    Recipe {
        id: Some(RecipeId::new_random()),
        owner_id: Some(owner.clone()),
        owner_email: None,
        title: request.title.clone(),
        ingredients: request.ingredients.clone(),
        instructions: request.instructions.clone(),
        prep_time_minutes: request.prep_time_minutes,
        cook_time_minutes: request.cook_time_minutes,
        servings: request.servings,
        created_at: Some(state.now()),
    }
}

fn generate(body: Option<&Value>) -> ApiResponse {
    let request: GenerateRecipeRequest = match parse_body(body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    if let Err(err) = request.validate() {
        return error(400, &err.to_string());
    }

    let ingredients: Vec<String> = request
        .ingredients
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let recipe = Recipe {
        id: None,
        owner_id: None,
        owner_email: None,
        title: format!("{} bowl", ingredients.join(" and ")),
        instructions: vec![
            format!("Prepare the {}.", ingredients.join(", ")),
            "Combine and cook until done.".to_string(),
        ],
        ingredients,
        prep_time_minutes: Some(10),
        cook_time_minutes: Some(20),
        servings: Some(2),
        created_at: None,
    };
    ok_json(&recipe)
}

fn save(state: &mut ServiceState, user: &FakeUser, body: Option<&Value>) -> ApiResponse {
    let request: SaveRecipeRequest = match parse_body(body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    if let Err(err) = request.validate() {
        return error(400, &err.to_string());
    }
    let recipe = persist(state, &user.id, &request);
    state.recipes.push(recipe.clone());
    ok_json(&recipe)
}

fn list_mine(state: &ServiceState, user: &FakeUser) -> ApiResponse {
    let mine: Vec<Recipe> = state
        .recipes
        .iter()
        .rev()
        .filter(|recipe| recipe.owner_id.as_ref() == Some(&user.id))
        .cloned()
        .collect();
    ok_json(&mine)
}

fn list_shared(state: &ServiceState, user: &FakeUser) -> ApiResponse {
    let shared: Vec<Recipe> = state
        .shares
        .iter()
        .rev()
        .filter(|row| row.user_id == user.id)
        .filter_map(|row| {
            state
                .recipes
                .iter()
                .find(|recipe| recipe.id == Some(row.recipe_id))
        })
        .map(|recipe| state.view(recipe, &user.id))
        .collect();
    ok_json(&shared)
}

/// Owner or grantee may read; others get `403`.
fn find_readable<'a>(
    state: &'a ServiceState,
    user: &FakeUser,
    id: RecipeId,
) -> Result<&'a Recipe, ApiResponse> {
    let recipe = state
        .recipes
        .iter()
        .find(|recipe| recipe.id == Some(id))
        .ok_or_else(|| error(404, "Recipe not found"))?;
    if recipe.owner_id.as_ref() == Some(&user.id) || state.is_grantee(id, &user.id) {
        Ok(recipe)
    } else {
        Err(error(403, "Access denied"))
    }
}

/// Only the owner may manage shares.
fn find_owned<'a>(
    state: &'a ServiceState,
    user: &FakeUser,
    id: RecipeId,
) -> Result<&'a Recipe, ApiResponse> {
    let recipe = state
        .recipes
        .iter()
        .find(|recipe| recipe.id == Some(id))
        .ok_or_else(|| error(404, "Recipe not found"))?;
    if recipe.owner_id.as_ref() == Some(&user.id) {
        Ok(recipe)
    } else {
        Err(error(403, "Access denied"))
    }
}

fn get_recipe(state: &ServiceState, user: &FakeUser, id: RecipeId) -> ApiResponse {
    match find_readable(state, user, id) {
        Ok(recipe) => ok_json(&state.view(recipe, &user.id)),
        Err(response) => response,
    }
}

fn list_shares(state: &ServiceState, user: &FakeUser, id: RecipeId) -> ApiResponse {
    if let Err(response) = find_owned(state, user, id) {
        return response;
    }
    let shares: Vec<Share> = state
        .shares
        .iter()
        .filter(|row| row.recipe_id == id)
        .filter_map(|row| {
            state.user_by_id(&row.user_id).map(|grantee| Share {
                user_id: row.user_id.clone(),
                email: grantee.email.clone(),
                created_at: row.created_at,
            })
        })
        .collect();
    ok_json(&shares)
}

fn create_share(
    state: &mut ServiceState,
    user: &FakeUser,
    id: RecipeId,
    body: Option<&Value>,
) -> ApiResponse {
    let request: CreateShareRequest = match parse_body(body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    if let Err(err) = request.validate() {
        return error(400, &err.to_string());
    }
    let Some(grantee) = state.user_by_email(&request.email).map(|u| u.id.clone()) else {
        return error(404, "User with this email not found");
    };
    if let Err(response) = find_owned(state, user, id) {
        return response;
    }
    if !state.is_grantee(id, &grantee) {
        let created_at = state.now();
        state.shares.push(ShareRow {
            recipe_id: id,
            user_id: grantee,
            created_at,
        });
    }
    ApiResponse::empty(201)
}

fn delete_share(
    state: &mut ServiceState,
    user: &FakeUser,
    id: RecipeId,
    grantee: &UserId,
) -> ApiResponse {
    if let Err(response) = find_owned(state, user, id) {
        return response;
    }
    let before = state.shares.len();
    state
        .shares
        .retain(|row| !(row.recipe_id == id && &row.user_id == grantee));
    if state.shares.len() == before {
        return error(404, "Share not found");
    }
    ApiResponse::empty(204)
}

//! `pantry` command-line client.

mod render;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, WrapErr};
use color_eyre::Result;
use pantry_client::{ClientConfig, CredentialProvider, StaticToken};
use pantry_core::{CreateShareRequest, GenerateRecipeRequest, RecipeId, UserId};
use pantry_data::RecipeDataLayer;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pantry")]
#[command(about = "Generate, save and share recipes")]
#[command(version)]
struct Cli {
    /// TOML config file (otherwise `PANTRY_CONFIG`, then `PANTRY_*` variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bearer token for the signed-in user
    #[arg(long, env = "PANTRY_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,

    /// Print raw JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a recipe from ingredients
    Generate {
        #[arg(required = true)]
        ingredients: Vec<String>,

        /// Dietary restriction, repeatable
        #[arg(long = "diet")]
        dietary_restrictions: Vec<String>,

        /// Save the generated recipe to your collection
        #[arg(long)]
        save: bool,
    },
    /// List your recipes
    Mine,
    /// List recipes shared with you
    Shared,
    /// Show one recipe
    Show { id: RecipeId },
    /// List who a recipe is shared with
    Shares { id: RecipeId },
    /// Share a recipe with another user by email
    Share { id: RecipeId, email: String },
    /// Stop sharing a recipe with a user
    Unshare { id: RecipeId, user_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ClientConfig::load(cli.config.as_deref()).wrap_err("invalid configuration")?;

    let credentials = CredentialProvider::from_config(&config);
    if let Some(token) = cli.token.as_deref().filter(|t| !t.trim().is_empty()) {
        credentials.set_source(Arc::new(StaticToken::new(token)));
    } else {
        tracing::debug!("No PANTRY_TOKEN set; requests are unauthenticated");
    }
    let layer = RecipeDataLayer::from_config(&config, credentials)
        .wrap_err("failed to build HTTP client")?;

    run(&layer, cli.command, cli.json).await
}

async fn run(layer: &RecipeDataLayer, command: Command, json: bool) -> Result<()> {
    match command {
        Command::Generate {
            ingredients,
            dietary_restrictions,
            save,
        } => {
            let mut request = GenerateRecipeRequest::new(ingredients);
            if !dietary_restrictions.is_empty() {
                request = request.with_dietary_restrictions(dietary_restrictions);
            }
            let generated = layer.generate_recipe(request).await?;
            let recipe = if save {
                layer.save_recipe(generated.to_save_request()).await?
            } else {
                generated
            };
            emit(json, &recipe, render::recipe)
        }
        Command::Mine => {
            let recipes = layer.my_recipes().fetch().await?.unwrap_or_default();
            emit(json, &recipes, |r| render::recipe_list(r))
        }
        Command::Shared => {
            let recipes = layer.shared_recipes().fetch().await?.unwrap_or_default();
            emit(json, &recipes, |r| render::recipe_list(r))
        }
        Command::Show { id } => {
            let recipe = layer
                .recipe(Some(id))
                .fetch()
                .await?
                .ok_or_else(|| eyre!("recipe {} not found", id))?;
            emit(json, &recipe, render::recipe)
        }
        Command::Shares { id } => {
            let shares = layer.recipe_shares(Some(id)).fetch().await?.unwrap_or_default();
            emit(json, &shares, |s| render::share_list(s))
        }
        Command::Share { id, email } => {
            layer
                .share_recipe(id, CreateShareRequest::new(email.clone()))
                .await?;
            println!("Shared {} with {}", id, email);
            Ok(())
        }
        Command::Unshare { id, user_id } => {
            layer.unshare_recipe(id, UserId::new(user_id.clone())).await?;
            println!("Stopped sharing {} with {}", id, user_id);
            Ok(())
        }
    }
}

fn emit<T, F>(json: bool, value: &T, text: F) -> Result<()>
where
    T: serde::Serialize,
    F: FnOnce(&T) -> String,
{
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        print!("{}", text(value));
    }
    Ok(())
}

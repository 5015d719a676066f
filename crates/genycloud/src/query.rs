//! Recipe resolution from device queries

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::client::CloudClient;
use crate::error::CloudError;
use crate::recipe::{DeviceQuery, Recipe};

/// Maps a device query to the recipe it designates
#[async_trait]
pub trait RecipeResolver: Send + Sync {
    /// `None` when the query matches no recipe
    async fn get_recipe_from_query(&self, query: &DeviceQuery) -> Result<Option<Recipe>, CloudError>;
}

/// Resolves `recipeUUID` (preferred) or `recipeName` against the cloud catalog
pub struct CloudRecipeResolver {
    client: Arc<dyn CloudClient>,
}

impl CloudRecipeResolver {
    pub fn new(client: Arc<dyn CloudClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RecipeResolver for CloudRecipeResolver {
    async fn get_recipe_from_query(&self, query: &DeviceQuery) -> Result<Option<Recipe>, CloudError> {
        if let Some(uuid) = query.recipe_uuid() {
            debug!("Resolving recipe by uuid {}", uuid);
            return self.client.recipe_by_uuid(uuid).await;
        }

        if let Some(name) = query.recipe_name() {
            debug!("Resolving recipe by name {}", name);
            let recipes = self.client.recipes_by_name(name).await?;
            return Ok(recipes.into_iter().find(|recipe| recipe.name == name));
        }

        debug!("Query {} names no recipe", query);
        Ok(None)
    }
}

//! Cloud service client contract
//!
//! The transport to the provider's API is opaque to this crate. Anything that
//! can answer these calls (a CLI wrapper, an HTTP client, a test double) can
//! back the recipe resolver and the instance services.

use async_trait::async_trait;

use crate::error::CloudError;
use crate::instance::Instance;
use crate::recipe::Recipe;

#[async_trait]
pub trait CloudClient: Send + Sync {
    /// Look up a recipe by uuid
    async fn recipe_by_uuid(&self, uuid: &str) -> Result<Option<Recipe>, CloudError>;

    /// List recipes whose name matches `name`
    async fn recipes_by_name(&self, name: &str) -> Result<Vec<Recipe>, CloudError>;

    /// List all instances visible to the account
    async fn instances(&self) -> Result<Vec<Instance>, CloudError>;

    /// Fetch one instance
    async fn instance(&self, uuid: &str) -> Result<Instance, CloudError>;

    /// Start a new instance from a recipe without waiting for it to boot
    async fn start_instance(&self, recipe_uuid: &str, name: &str) -> Result<Instance, CloudError>;

    /// Open an adb tunnel to an instance
    async fn adb_connect(&self, uuid: &str) -> Result<Instance, CloudError>;

    /// Stop and delete an instance
    async fn stop_instance(&self, uuid: &str) -> Result<Instance, CloudError>;
}

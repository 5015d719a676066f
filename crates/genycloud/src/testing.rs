//! Test doubles shared by the unit tests of this crate

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::client::CloudClient;
use crate::error::CloudError;
use crate::instance::{Instance, InstanceState, DISCONNECTED_ADB_SERIAL};
use crate::recipe::Recipe;

pub fn an_instance(uuid: &str) -> Instance {
    Instance {
        uuid: uuid.to_string(),
        name: None,
        state: InstanceState::Online,
        adb_name: format!("adb-{}", uuid),
        recipe_uuid: None,
    }
}

#[derive(Default)]
struct CloudState {
    recipes: Vec<Recipe>,
    instances: Vec<Instance>,
    polls: HashMap<String, u32>,
    started: Vec<String>,
    connected: Vec<String>,
    fail_with: Option<CloudError>,
}

/// In-memory cloud. Started instances come up as `CREATING` without an adb
/// serial and turn `ONLINE` after `boot_after_polls` calls to `instance`.
pub struct MockCloudClient {
    state: Mutex<CloudState>,
    boot_after_polls: u32,
}

impl MockCloudClient {
    pub fn new() -> Self {
        Self::booting_after(1)
    }

    pub fn booting_after(polls: u32) -> Self {
        Self {
            state: Mutex::new(CloudState::default()),
            boot_after_polls: polls,
        }
    }

    pub fn add_recipe(&self, recipe: Recipe) {
        self.state.lock().recipes.push(recipe);
    }

    pub fn add_instance(&self, instance: Instance) {
        self.state.lock().instances.push(instance);
    }

    pub fn fail_with(&self, error: CloudError) {
        self.state.lock().fail_with = Some(error);
    }

    pub fn started(&self) -> Vec<String> {
        self.state.lock().started.clone()
    }

    pub fn connected(&self) -> Vec<String> {
        self.state.lock().connected.clone()
    }

    pub fn stored(&self, uuid: &str) -> Option<Instance> {
        self.state.lock().instances.iter().find(|i| i.uuid == uuid).cloned()
    }

    fn check(&self) -> Result<(), CloudError> {
        match &self.state.lock().fail_with {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    fn update(&self, uuid: &str, change: impl FnOnce(&mut Instance)) -> Result<Instance, CloudError> {
        let mut state = self.state.lock();
        let instance = state
            .instances
            .iter_mut()
            .find(|i| i.uuid == uuid)
            .ok_or_else(|| CloudError::InstanceNotFound(uuid.to_string()))?;
        change(instance);
        Ok(instance.clone())
    }
}

#[async_trait]
impl CloudClient for MockCloudClient {
    async fn recipe_by_uuid(&self, uuid: &str) -> Result<Option<Recipe>, CloudError> {
        self.check()?;
        Ok(self.state.lock().recipes.iter().find(|r| r.uuid == uuid).cloned())
    }

    async fn recipes_by_name(&self, name: &str) -> Result<Vec<Recipe>, CloudError> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .recipes
            .iter()
            .filter(|r| r.name.contains(name))
            .cloned()
            .collect())
    }

    async fn instances(&self) -> Result<Vec<Instance>, CloudError> {
        self.check()?;
        Ok(self.state.lock().instances.clone())
    }

    async fn instance(&self, uuid: &str) -> Result<Instance, CloudError> {
        self.check()?;
        let polls = {
            let mut state = self.state.lock();
            let polls = state.polls.entry(uuid.to_string()).or_insert(0);
            *polls += 1;
            *polls
        };
        let boot_after = self.boot_after_polls;
        self.update(uuid, |instance| {
            if polls >= boot_after && !instance.is_terminated() {
                instance.state = InstanceState::Online;
            }
        })
    }

    async fn start_instance(&self, recipe_uuid: &str, name: &str) -> Result<Instance, CloudError> {
        self.check()?;
        let mut state = self.state.lock();
        let instance = Instance {
            uuid: format!("new-{}", state.started.len() + 1),
            name: Some(name.to_string()),
            state: InstanceState::Creating,
            adb_name: DISCONNECTED_ADB_SERIAL.to_string(),
            recipe_uuid: Some(recipe_uuid.to_string()),
        };
        state.started.push(instance.uuid.clone());
        state.instances.push(instance.clone());
        Ok(instance)
    }

    async fn adb_connect(&self, uuid: &str) -> Result<Instance, CloudError> {
        self.check()?;
        let instance = self.update(uuid, |instance| {
            instance.adb_name = "localhost:5555".to_string();
        })?;
        self.state.lock().connected.push(uuid.to_string());
        Ok(instance)
    }

    async fn stop_instance(&self, uuid: &str) -> Result<Instance, CloudError> {
        self.check()?;
        self.update(uuid, |instance| {
            instance.state = InstanceState::Deleted;
        })
    }
}

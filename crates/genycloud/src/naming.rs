//! Instance naming
//!
//! Instances started by one test session share a name family
//! `<prefix>.<session>.<unique>`, which is how a session recognizes idle
//! instances it may reuse without touching anybody else's.

use cloudroid_core::NamingConfig;

#[derive(Debug, Clone)]
pub struct InstanceNaming {
    prefix: String,
    session_id: String,
}

impl InstanceNaming {
    pub fn new(prefix: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            session_id: session_id.into(),
        }
    }

    /// Naming for a config, generating a session id when none is set
    pub fn from_config(config: &NamingConfig) -> Self {
        let session_id = config
            .session_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());
        Self::new(config.prefix.clone(), session_id)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn family_prefix(&self) -> String {
        format!("{}.{}.", self.prefix, self.session_id)
    }

    /// A fresh, unique name within this session's family
    pub fn generate_name(&self) -> String {
        let unique = uuid::Uuid::new_v4().simple().to_string();
        format!("{}{}", self.family_prefix(), &unique[..8])
    }

    pub fn is_family_member(&self, name: &str) -> bool {
        name.starts_with(&self.family_prefix())
    }
}

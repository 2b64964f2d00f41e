use anyhow::Result;
use async_trait::async_trait;
use shared::User;

use super::traits::GroupDirectory;
use crate::config::DirectoryConfig;

/// Group directory built from the `[directory]` section of the config file
#[derive(Clone)]
pub struct ConfigGroupDirectory {
    config: DirectoryConfig,
}

impl ConfigGroupDirectory {
    pub fn new(config: DirectoryConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl GroupDirectory for ConfigGroupDirectory {
    async fn members_of(&self, group: &str) -> Result<Option<Vec<User>>> {
        let members: Vec<User> = self
            .config
            .users
            .iter()
            .filter(|user| user.groups.iter().any(|g| g == group))
            .map(|user| User {
                id: user.id.clone(),
                display_name: user.display_name.clone(),
                email: user
                    .email
                    .as_ref()
                    .map(|email| email.trim().to_string())
                    .filter(|email| !email.is_empty()),
            })
            .collect();

        // Groups only exist through their members here
        if members.is_empty() {
            Ok(None)
        } else {
            Ok(Some(members))
        }
    }

    async fn is_admin(&self, user_id: &str) -> Result<bool> {
        Ok(self.config.admins.iter().any(|admin| admin == user_id))
    }
}

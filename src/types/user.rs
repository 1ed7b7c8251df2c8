use serde::{Deserialize, Serialize};

/// Profile handed over by the authentication collaborator.
///
/// Only `user_id` matters to the store; it is the partition key for every
/// collection. The remaining fields are carried for display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    #[serde(alias = "uid")]
    pub user_id: String,
    pub display_name: String,
    pub email: String,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
}

impl UserProfile {
    pub fn new(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Self::default()
        }
    }
}

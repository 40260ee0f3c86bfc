use serde::{Deserialize, Serialize};
use twilight_model::id::RoleId;

/// Per guild settings owned by the Core plugin, stored as one JSON document per guild.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GuildSettings {
    pub prefix: String,
    #[serde(default)]
    pub server_mod_role: Option<RoleId>,
}

impl Default for GuildSettings {
    fn default() -> Self {
        GuildSettings {
            prefix: "!".to_string(),
            server_mod_role: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn older_documents_without_a_mod_role_still_load() {
        let settings: GuildSettings = serde_json::from_str(r#"{"prefix": "?"}"#).unwrap();
        assert_eq!(settings.prefix, "?");
        assert_eq!(settings.server_mod_role, None);
    }
}

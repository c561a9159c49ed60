//! Team and user models.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A team member as listed inside a [`Team`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TeamMember {
    pub user_id: String,
    pub username: String,
    pub is_active: bool,
}

/// A team with its members, ordered by user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Globally unique team name.
    pub team_name: String,

    #[serde(default)]
    pub members: Vec<TeamMember>,
}

impl Team {
    /// Check the team payload before it is written.
    ///
    /// The name must be non-blank and member ids must be non-blank and unique.
    pub fn validate(&self) -> Result<(), String> {
        if self.team_name.trim().is_empty() {
            return Err("team_name is required".into());
        }

        let mut seen = std::collections::HashSet::new();
        for member in &self.members {
            if member.user_id.trim().is_empty() {
                return Err("member user_id is required".into());
            }
            if !seen.insert(member.user_id.as_str()) {
                return Err(format!("duplicate member user_id: {}", member.user_id));
            }
        }

        Ok(())
    }
}

/// A user record with its team reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub team_name: String,
    pub is_active: bool,
}

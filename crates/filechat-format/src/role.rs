//! Roles and the headings that introduce them in a transcript file.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Author of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Every role, in the order they usually appear in a conversation.
    pub const ALL: [Role; 3] = [Role::System, Role::User, Role::Assistant];

    /// The heading text used for this role (without the leading `# `).
    pub fn heading(self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }

    /// Look up a role by its heading text. Matching is case-sensitive.
    pub fn from_heading(heading: &str) -> Option<Role> {
        Role::ALL.into_iter().find(|role| role.heading() == heading)
    }

    /// The role name as used by chat completion APIs.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// The full heading line, e.g. `# User`.
    pub fn heading_line(self) -> String {
        format!("# {}", self.heading())
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_heading(role.heading()), Some(role));
        }
    }

    #[test]
    fn test_headings_are_unique() {
        let mut headings: Vec<&str> = Role::ALL.iter().map(|r| r.heading()).collect();
        headings.sort();
        headings.dedup();
        assert_eq!(headings.len(), Role::ALL.len());
    }

    #[test]
    fn test_unknown_heading() {
        assert_eq!(Role::from_heading("user"), None);
        assert_eq!(Role::from_heading("Tool"), None);
        assert_eq!(Role::from_heading(""), None);
    }

    #[test]
    fn test_api_names() {
        assert_eq!("assistant".parse::<Role>(), Ok(Role::Assistant));
        assert!("Assistant".parse::<Role>().is_err());
        assert_eq!(Role::System.to_string(), "system");
        assert_eq!(
            serde_json::to_string(&Role::User).unwrap(),
            "\"user\"".to_string()
        );
    }
}

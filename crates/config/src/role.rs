//! Role files: `<config_dir>/roles/<name>.md`, optional YAML frontmatter
//! between `---` markers, body is the system-prompt text.

use std::fs;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::paths;

const DEFAULT_ROLE_BODY: &str = include_str!("../defaults/roles/default.md");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RoleFrontmatter {
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Role {
    pub name: String,
    pub body: String,
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

impl Role {
    pub fn validate(&self) -> Result<()> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                bail!("role '{}': temperature {} is out of range [0, 2]", self.name, t);
            }
        }
        if let Some(m) = &self.model {
            if m.is_empty() {
                bail!("role '{}': model must be a non-empty string", self.name);
            }
        }
        Ok(())
    }

    /// Serialize back to the on-disk frontmatter + body form.
    pub fn to_markdown(&self) -> Result<String> {
        let fm = RoleFrontmatter {
            model: self.model.clone(),
            temperature: self.temperature,
        };
        if fm.model.is_none() && fm.temperature.is_none() {
            return Ok(self.body.clone());
        }
        let yaml = serde_yaml::to_string(&fm).context("serialize role frontmatter")?;
        Ok(format!("---\n{yaml}---\n{}", self.body))
    }
}

/// Parse a role file's raw content into (frontmatter, body).
pub fn parse_role_file(content: &str) -> Result<(RoleFrontmatter, String)> {
    if !content.starts_with("---") {
        return Ok((RoleFrontmatter::default(), content.to_string()));
    }

    let mut parts = content.splitn(3, "---");
    let _empty = parts.next();
    let frontmatter_text = parts.next().context("invalid frontmatter format")?;
    let body = parts.next().context("invalid frontmatter format")?;

    let metadata: RoleFrontmatter = if frontmatter_text.trim().is_empty() {
        RoleFrontmatter::default()
    } else {
        serde_yaml::from_str(frontmatter_text.trim())
            .with_context(|| "invalid YAML in role frontmatter".to_string())?
    };

    Ok((metadata, body.trim().to_string()))
}

pub fn name_is_valid(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Seed `roles/default.md` on first run, matching the original's
/// `ensure_default_roles`.
pub fn ensure_default_roles() -> Result<()> {
    let dir = paths::roles_dir();
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    let default_path = paths::role_path("default");
    if !default_path.exists() {
        fs::write(&default_path, DEFAULT_ROLE_BODY)
            .with_context(|| format!("write {}", default_path.display()))?;
    }
    Ok(())
}

/// Load a role by name from `<config_dir>/roles/<name>.md`.
pub fn load_role(name: &str) -> Result<Role> {
    if !name_is_valid(name) {
        bail!("invalid role name '{name}': must match ^[A-Za-z0-9_-]+$");
    }
    ensure_default_roles()?;

    let path = paths::role_path(name);
    if !path.exists() {
        bail!("role '{name}' not found at {}", path.display());
    }
    let content = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let (fm, body) = parse_role_file(&content)?;
    let role = Role {
        name: name.to_string(),
        body,
        model: fm.model,
        temperature: fm.temperature,
    };
    role.validate()?;
    Ok(role)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_frontmatter_and_body() {
        let content = "---\nmodel: gpt-5\ntemperature: 0.4\n---\nYou are a careful assistant.";
        let (fm, body) = parse_role_file(content).unwrap();
        assert_eq!(fm.model.as_deref(), Some("gpt-5"));
        assert_eq!(fm.temperature, Some(0.4));
        assert_eq!(body, "You are a careful assistant.");
    }

    #[test]
    fn no_frontmatter_is_whole_body() {
        let content = "Just a plain role body.";
        let (fm, body) = parse_role_file(content).unwrap();
        assert_eq!(fm, RoleFrontmatter::default());
        assert_eq!(body, content);
    }

    #[test]
    fn role_round_trips_through_markdown() {
        let role = Role {
            name: "debug".to_string(),
            body: "Be terse.".to_string(),
            model: Some("gpt-5-mini".to_string()),
            temperature: Some(0.2),
        };
        let rendered = role.to_markdown().unwrap();
        let (fm, body) = parse_role_file(&rendered).unwrap();
        let round_tripped = Role {
            name: role.name.clone(),
            body,
            model: fm.model,
            temperature: fm.temperature,
        };
        assert_eq!(round_tripped, role);
    }

    #[test]
    fn rejects_invalid_role_names() {
        assert!(!name_is_valid(""));
        assert!(!name_is_valid("has space"));
        assert!(!name_is_valid("has/slash"));
        assert!(name_is_valid("my-role_1"));
    }

    #[test]
    fn validate_rejects_out_of_range_temperature() {
        let role = Role {
            name: "x".to_string(),
            body: String::new(),
            model: None,
            temperature: Some(3.0),
        };
        assert!(role.validate().is_err());
    }
}

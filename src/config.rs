use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

use crate::export::{ExportFormat, Quality};
use crate::jira::api_types::IssueFieldMap;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub jira: JiraConfig,
  pub default_project: Option<String>,
  #[serde(default)]
  pub deck: DeckConfig,
  #[serde(default)]
  pub export: ExportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraConfig {
  pub url: String,
  pub email: String,
  /// Custom field id for the epic link (e.g., "customfield_10014")
  pub epic_field: Option<String>,
  /// Custom field id for story points (e.g., "customfield_10016")
  pub story_points_field: Option<String>,
  /// Custom field id holding curated release notes, if the instance has one
  pub release_notes_field: Option<String>,
  /// Minutes before cached API responses go stale (default 5)
  pub cache_ttl_minutes: Option<i64>,
}

/// A corporate slide appended to every deck.
#[derive(Debug, Clone, Deserialize)]
pub struct CorporateSlide {
  pub title: String,
  pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeckConfig {
  pub corporate_slides: Vec<CorporateSlide>,
  /// Upper bound on demo-story slides per deck
  pub max_demo_stories: usize,
}

impl Default for DeckConfig {
  fn default() -> Self {
    Self {
      corporate_slides: Vec::new(),
      max_demo_stories: 4,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
  pub format: ExportFormat,
  pub quality: Quality,
  /// Where exported artifacts land; defaults to the working directory
  pub output_dir: Option<PathBuf>,
}

impl Default for ExportConfig {
  fn default() -> Self {
    Self {
      format: ExportFormat::Pdf,
      quality: Quality::default(),
      output_dir: None,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./sprintdeck.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/sprintdeck/config.yaml
  /// 4. ~/.config/sprintdeck/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/sprintdeck/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("sprintdeck.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("sprintdeck").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Url::parse(&config.jira.url)
      .map_err(|e| eyre!("Invalid Jira URL '{}': {}", config.jira.url, e))?;

    Ok(config)
  }

  /// Get the Jira API token from environment variables.
  ///
  /// Checks SPRINTDECK_JIRA_TOKEN first, then JIRA_API_TOKEN as fallback.
  pub fn get_api_token() -> Result<String> {
    std::env::var("SPRINTDECK_JIRA_TOKEN")
      .or_else(|_| std::env::var("JIRA_API_TOKEN"))
      .map_err(|_| {
        eyre!(
          "Jira API token not found. Set SPRINTDECK_JIRA_TOKEN or JIRA_API_TOKEN environment variable."
        )
      })
  }

  /// Resolve the custom-field layout for this instance.
  pub fn issue_field_map(&self) -> IssueFieldMap {
    let defaults = IssueFieldMap::default();
    IssueFieldMap {
      epic: self.jira.epic_field.clone().unwrap_or(defaults.epic),
      story_points: self
        .jira
        .story_points_field
        .clone()
        .unwrap_or(defaults.story_points),
      release_notes: self.jira.release_notes_field.clone(),
    }
  }
}

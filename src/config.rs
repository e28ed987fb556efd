//! Process-wide settings, read once at startup and never mutated.
//!
//! Deployments that export `AZURE_DEVOPS_PAT` are configured entirely from the
//! environment. Otherwise a JSON file is read: the `--config` path, then
//! `./config.json`, then `<config dir>/devops-testgen/config.json`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::devops::{
    AzureDevOpsClient, ProjectTarget, StoreProvider, WorkItemStore, DEFAULT_BASE_URL,
};
use crate::error::{Error, Result};
use crate::llm::client::{default_max_tokens, default_model, default_temperature};
use crate::llm::{Provider, ProviderConfig};

const PAT_VAR: &str = "AZURE_DEVOPS_PAT";
const LOCAL_CONFIG: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub azure_devops: AzureDevOpsConfig,
    #[serde(default)]
    pub openai: ProviderConfig,
    #[serde(default)]
    pub test_case: TestCaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AzureDevOpsConfig {
    pub organization: String,
    pub project: String,
    pub personal_access_token: String,
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestCaseConfig {
    #[serde(default = "default_max_title_length")]
    pub max_title_length: usize,
}

impl Default for TestCaseConfig {
    fn default() -> Self {
        Self {
            max_title_length: default_max_title_length(),
        }
    }
}

fn default_max_title_length() -> usize {
    255
}

/// Organization/project supplied with a single request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectOverride {
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
}

impl AzureDevOpsConfig {
    /// Default project with any non-empty override fields applied on top.
    pub fn target(&self, overrides: Option<&ProjectOverride>) -> ProjectTarget {
        let pick = |value: Option<&String>, fallback: &String| {
            value
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .unwrap_or(fallback.as_str())
                .to_string()
        };

        ProjectTarget {
            organization: pick(
                overrides.and_then(|o| o.organization.as_ref()),
                &self.organization,
            ),
            project: pick(overrides.and_then(|o| o.project.as_ref()), &self.project),
        }
    }

    pub fn connect(&self, target: ProjectTarget) -> Result<AzureDevOpsClient> {
        let base = self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        AzureDevOpsClient::with_base_url(&self.personal_access_token, target, base)
    }
}

impl StoreProvider for AzureDevOpsConfig {
    fn open(&self, target: ProjectTarget) -> Result<Box<dyn WorkItemStore>> {
        Ok(Box::new(self.connect(target)?))
    }
}

impl AppConfig {
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let from_env = env::var(PAT_VAR).map(|v| !v.is_empty()).unwrap_or(false);

        let cfg = if explicit.is_none() && from_env {
            info!("loading configuration from environment variables");
            Self::from_env(|key| env::var(key).ok())?
        } else {
            let path = resolve_config_path(explicit)?;
            info!(path = %path.display(), "loading configuration file");
            Self::from_file(&path)?
        };

        cfg.validate()?;
        info!(
            organization = %cfg.azure_devops.organization,
            project = %cfg.azure_devops.project,
            model = %cfg.openai.model,
            "configuration loaded"
        );
        Ok(cfg)
    }

    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let provider = match lookup("LLM_PROVIDER") {
            Some(name) => name.parse()?,
            None => Provider::default(),
        };

        Ok(Self {
            azure_devops: AzureDevOpsConfig {
                organization: text("AZURE_DEVOPS_ORGANIZATION", "default-org"),
                project: text("AZURE_DEVOPS_PROJECT", "Default Project"),
                personal_access_token: text(PAT_VAR, ""),
                base_url: lookup("AZURE_DEVOPS_BASE_URL"),
            },
            openai: ProviderConfig {
                provider,
                model: lookup("OPENAI_MODEL").unwrap_or_else(default_model),
                api_key: text("OPENAI_API_KEY", ""),
                base_url: lookup("OPENAI_BASE_URL"),
                max_tokens: parse_var(&lookup, "OPENAI_MAX_TOKENS", default_max_tokens())?,
                temperature: parse_var(&lookup, "OPENAI_TEMPERATURE", default_temperature())?,
            },
            test_case: TestCaseConfig {
                max_title_length: parse_var(
                    &lookup,
                    "TEST_CASE_MAX_TITLE_LENGTH",
                    default_max_title_length(),
                )?,
            },
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| Error::Config(format!("invalid JSON in {}: {e}", path.display())))
    }

    pub fn validate(&self) -> Result<()> {
        if self.azure_devops.personal_access_token.trim().is_empty() {
            return Err(Error::Config("personal_access_token is empty".into()));
        }
        if self.test_case.max_title_length < 3 {
            return Err(Error::Config(format!(
                "max_title_length must be at least 3, got {}",
                self.test_case.max_title_length
            )));
        }
        Ok(())
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("{key}='{raw}': {e}"))),
        None => Ok(default),
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let local = PathBuf::from(LOCAL_CONFIG);
    if local.exists() {
        return Ok(local);
    }

    let user = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("devops-testgen")
        .join(LOCAL_CONFIG);
    if user.exists() {
        return Ok(user);
    }

    Err(Error::Config(format!(
        "no configuration found: set {PAT_VAR} or create {LOCAL_CONFIG}"
    )))
}

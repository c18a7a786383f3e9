//! `--interactive-config` wizard: a minimal provider/key/model prompt flow.
//!
//! Grounded on the shape of `original_source/whai/config.py`'s config
//! section (`default_provider`, per-provider `api_key`/`api_base`/
//! `default_model`) and on the teacher's use of `dialoguer` for interactive
//! onboarding prompts, narrowed to the handful of fields SPEC_FULL actually
//! models (no memory/personality/channel setup).

use anyhow::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Select};

use whai_config::{AppConfig, LlmSection, ProviderConfig};

const PROVIDERS: [&str; 5] = ["openai", "anthropic", "azure_openai", "ollama", "gemini"];

pub fn run() -> Result<()> {
    let theme = ColorfulTheme::default();

    let provider_idx = Select::with_theme(&theme)
        .with_prompt("Default LLM provider")
        .items(&PROVIDERS)
        .default(0)
        .interact()?;
    let provider = PROVIDERS[provider_idx].to_string();

    let mut provider_cfg = ProviderConfig::default();

    if provider != "ollama" {
        let api_key: String = Input::with_theme(&theme)
            .with_prompt(format!("{provider} API key"))
            .allow_empty(true)
            .interact_text()?;
        if !api_key.is_empty() {
            provider_cfg.api_key = Some(api_key);
        }
    }

    let api_base: String = Input::with_theme(&theme)
        .with_prompt("API base URL (leave blank for provider default)")
        .allow_empty(true)
        .interact_text()?;
    if !api_base.is_empty() {
        provider_cfg.api_base = Some(api_base);
    }

    if provider == "azure_openai" {
        let api_version: String = Input::with_theme(&theme)
            .with_prompt("Azure API version")
            .default("2024-02-01".to_string())
            .interact_text()?;
        provider_cfg.api_version = Some(api_version);
    }

    let default_model: String = Input::with_theme(&theme)
        .with_prompt("Default model")
        .default(whai_config::FALLBACK_MODEL.to_string())
        .interact_text()?;
    provider_cfg.default_model = Some(default_model);

    let default_role: String = Input::with_theme(&theme)
        .with_prompt("Default role")
        .default("default".to_string())
        .interact_text()?;

    let mut config = AppConfig {
        llm: LlmSection { default_provider: provider.clone(), providers: Default::default() },
        roles: Default::default(),
    };
    config.llm.providers.insert(provider, provider_cfg);
    config.roles.default_role = Some(default_role);

    config.validate().map_err(anyhow::Error::from)?;
    config.save()?;

    crate::ui::info(&format!("Configuration saved to {}", whai_config::paths::config_path().display()));
    Ok(())
}

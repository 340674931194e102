use anyhow::{Result, anyhow, bail};
use async_openai::{Client, config::OpenAIConfig};

use super::secrets::{
    API_KEY_ENV, ApiKeySource, get_api_key_from_sources, prompt_for_api_key, store_api_key,
};

/// Build a client from the configured key, prompting for one if nothing is
/// configured yet. Generation is never attempted without a credential.
pub fn ensure_client(reason: &str) -> Result<Client<OpenAIConfig>> {
    let lookup = get_api_key_from_sources()?;
    let key = match lookup.api_key {
        Some(api_key) => api_key,
        None => {
            let api_key = prompt_for_api_key(reason)?;
            if api_key.is_empty() {
                bail!(
                    "No API key provided. Set {} or run `cardforge llm --set <KEY>`.",
                    API_KEY_ENV
                );
            }
            store_api_key(&api_key)?;
            api_key
        }
    };

    Ok(initialize_client(&key))
}

pub async fn test_configured_api_key() -> Result<ApiKeySource> {
    let lookup = get_api_key_from_sources()?;
    let (key, source) = match (lookup.api_key, lookup.source) {
        (Some(key), Some(source)) => (key, source),
        _ => bail!(
            "No API key configured. Set {} or run `cardforge llm --set <KEY>`.",
            API_KEY_ENV
        ),
    };
    let client = initialize_client(&key);
    healthcheck_client(&client).await?;
    Ok(source)
}

fn initialize_client(api_key: &str) -> Client<OpenAIConfig> {
    let config = OpenAIConfig::new().with_api_key(api_key);
    Client::with_config(config)
}

async fn healthcheck_client(client: &Client<OpenAIConfig>) -> Result<()> {
    client
        .models()
        .list()
        .await
        .map_err(|err| anyhow!("Failed to validate API key with OpenAI: {err}"))?;
    Ok(())
}

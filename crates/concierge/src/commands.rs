//! Concierge command implementations

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use concierge_agent::{AgentLoop, ToolRegistry};
use concierge_calendar::{
    CalendarClient, CredentialManager, CredentialStatus, CredentialStore, GoogleOAuth,
};
use concierge_config::{self, Config, ProviderConfig};
use concierge_provider::OpenAiProvider;
use concierge_session::{Role, Transcript};

const OPENROUTER_BASE: &str = "https://openrouter.ai/api/v1";
const OPENAI_BASE: &str = "https://api.openai.com/v1";

/// Read line from stdin
fn read_line() -> Result<String> {
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// Read password from stdin (masked input)
fn read_password() -> Result<String> {
    match rpassword::read_password() {
        Ok(secret) => Ok(secret.trim().to_string()),
        Err(_) => read_line(),
    }
}

fn prompt(label: &str) -> Result<()> {
    print!("{}", label);
    std::io::stdout().flush()?;
    Ok(())
}

fn credential_manager(config: &Config) -> Result<Arc<CredentialManager>> {
    let flow = GoogleOAuth::from_config(&config.calendar)
        .context("Failed to set up the Google OAuth client")?;
    let store = CredentialStore::new(config.calendar.token_path());
    Ok(Arc::new(CredentialManager::new(store, Arc::new(flow))))
}

/// Wire provider, calendar and tools into a planning loop
fn build_agent(config: &Config) -> Result<AgentLoop<OpenAiProvider>> {
    let api_key = config.api_key().context(
        "No API key configured. Run `concierge setup` or set OPENAI_API_KEY / OPENROUTER_API_KEY",
    )?;
    let provider = OpenAiProvider::new(api_key, config.api_base(), Some(config.default_model()));
    debug!("◆ oracle at {}", provider.api_base());

    let calendar = CalendarClient::from_config(&config.calendar, credential_manager(config)?)
        .context("Failed to set up the calendar client")?;
    let tools = ToolRegistry::new(Arc::new(calendar));

    Ok(AgentLoop::with_config(provider, tools, config))
}

fn print_message(role: Role, content: &str) {
    let tag = match role {
        Role::User => "you",
        Role::Assistant => "concierge",
    };
    println!("◆ {}: {}\n", tag, content);
}

fn print_transcript(transcript: &Transcript) {
    for message in transcript.messages() {
        print_message(message.role(), message.content());
    }
}

/// Chat with the concierge
pub async fn chat_command(message: Option<String>) -> Result<()> {
    let config = Config::load().await?;
    let agent = build_agent(&config)?;
    let mut transcript = Transcript::new();

    if let Some(msg) = message {
        let answer = agent.respond(&mut transcript, &msg).await;
        println!("{}", answer);
        return Ok(());
    }

    println!("◆ Travel concierge (type 'exit' to quit, /reset for a new trip, /history to review)");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    print_transcript(&transcript);

    loop {
        prompt("you> ")?;

        let mut input = String::new();
        if std::io::stdin().read_line(&mut input)? == 0 {
            // stdin closed
            break;
        }

        let input = input.trim();
        match input {
            "" => continue,
            "exit" | "quit" => break,
            "/reset" => {
                transcript.reset();
                println!();
                print_transcript(&transcript);
                continue;
            }
            "/history" => {
                println!();
                print_transcript(&transcript);
                continue;
            }
            _ => {}
        }

        println!("◆ Thinking...");
        let answer = agent.respond(&mut transcript, input).await;
        println!();
        print_message(Role::Assistant, &answer);
    }

    info!("◆ chat ended after {} messages", transcript.len());
    Ok(())
}

/// Run the calendar credential flow now
pub async fn auth_command() -> Result<()> {
    let config = Config::load().await?;

    println!("◆ Google Calendar authorization");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let secrets = config.calendar.client_secrets_path();
    if !secrets.exists() {
        anyhow::bail!(
            "OAuth client secrets not found at {}. Download them from the Google Cloud console",
            secrets.display()
        );
    }

    let manager = credential_manager(&config)?;
    let credential = manager
        .credential()
        .await
        .context("Calendar authorization failed")?;

    println!("✓ Calendar access granted");
    if let Some(expiry) = credential.expiry {
        println!("  Token valid until {}", expiry.format("%Y-%m-%d %H:%M UTC"));
    }
    println!("  Saved to {}", manager.store().path().display());

    Ok(())
}

fn present(path: &Path) -> &'static str {
    if path.exists() {
        "[OK]"
    } else {
        "[Missing]"
    }
}

/// Show status
pub async fn status_command() -> Result<()> {
    let config_path = concierge_config::config_path();

    println!("◆ Concierge Status");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Config:    {} {}", config_path.display(), present(&config_path));

    let config = Config::load().await?;
    println!("Model:     {}", config.default_model());
    println!(
        "API Key:   {}",
        if config.configured_api_key().is_some() {
            "[Set]"
        } else if config.has_api_key() {
            "[From environment]"
        } else {
            "[Missing]"
        }
    );
    println!("Max steps: {}", config.max_tool_iterations());

    let secrets = config.calendar.client_secrets_path();
    println!("Calendar:  {} ({})", config.calendar.calendar_id, config.calendar.time_zone);
    println!("  Client secrets: {} {}", secrets.display(), present(&secrets));

    let token_state = match credential_manager(&config)?.status().await {
        CredentialStatus::Missing => "[Not authorized]".to_string(),
        CredentialStatus::Valid { expiry: Some(at) } => {
            format!("[Valid until {}]", at.format("%Y-%m-%d %H:%M UTC"))
        }
        CredentialStatus::Valid { expiry: None } => "[Valid]".to_string(),
        CredentialStatus::Expired { refreshable: true } => "[Expired, will refresh]".to_string(),
        CredentialStatus::Expired { refreshable: false } => {
            "[Expired, run `concierge auth`]".to_string()
        }
    };
    println!(
        "  Token:          {} {}",
        config.calendar.token_path().display(),
        token_state
    );

    println!("\n◆ Ready");
    Ok(())
}

/// Initialize config and data directory
pub async fn init_command() -> Result<()> {
    println!("◆ Initializing Concierge...");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let config = concierge_config::init()
        .await
        .context("Failed to write default config")?;

    println!("\n◆ Concierge initialized");
    println!("  Config: {}", concierge_config::config_path().display());
    println!("\nNext steps:");
    println!("  1. Add your API key: concierge setup");
    println!(
        "  2. Put your Google OAuth client secrets at {}",
        config.calendar.client_secrets_path().display()
    );
    println!("  3. Start planning:   concierge chat");

    Ok(())
}

/// Check a key against the provider's model listing
async fn validate_api_key(api_base: &str, api_key: &str) -> bool {
    let client = reqwest::Client::new();
    match client
        .get(format!("{}/models", api_base))
        .bearer_auth(api_key)
        .send()
        .await
    {
        Ok(response) => response.status().is_success(),
        Err(e) => {
            debug!("◆ key validation request failed: {}", e);
            false
        }
    }
}

/// Interactive setup wizard
pub async fn setup_command() -> Result<()> {
    println!("◆ Concierge Setup Wizard");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!();

    // Step 1: API key
    println!("Step 1: LLM API Key");
    println!("An OpenAI key (sk-...) or an OpenRouter key (sk-or-...) both work.");
    println!();

    let api_key = loop {
        prompt("Enter your API key: ")?;
        let key = read_password()?;

        if key.is_empty() {
            println!("API key cannot be empty. Please try again.");
            continue;
        }

        let api_base = if key.starts_with("sk-or-") {
            OPENROUTER_BASE
        } else {
            OPENAI_BASE
        };

        prompt("Validating API key... ")?;
        if validate_api_key(api_base, &key).await {
            println!("✓ Valid!");
            break key;
        }

        println!("✗ Invalid");
        prompt("The API key appears to be invalid. Try again? (Y/n/skip): ")?;
        match read_line()?.to_lowercase().as_str() {
            "skip" | "s" => {
                println!("Keeping the key without validation.");
                break key;
            }
            "n" | "no" => anyhow::bail!("Setup cancelled"),
            _ => {}
        }
    };
    let is_openrouter = api_key.starts_with("sk-or-");
    println!();

    // Step 2: model
    let default_model = if is_openrouter {
        "openai/gpt-4o-mini"
    } else {
        "gpt-4o-mini"
    };
    println!("Step 2: Model");
    prompt(&format!("Model ID [{}]: ", default_model))?;
    let model = match read_line()? {
        m if m.is_empty() => default_model.to_string(),
        m => m,
    };
    println!();

    // Step 3: calendar client secrets
    let config_path = concierge_config::config_path();
    let mut config = if config_path.exists() {
        Config::load().await.unwrap_or_default()
    } else {
        Config::default()
    };

    println!("Step 3: Google Calendar (optional)");
    prompt(&format!(
        "Path to OAuth client secrets [{}]: ",
        config.calendar.client_secrets
    ))?;
    let secrets = read_line()?;
    if !secrets.is_empty() {
        config.calendar.client_secrets = secrets;
    }
    println!();

    // Step 4: save
    println!("Step 4: Saving Configuration");
    let provider = ProviderConfig {
        api_key,
        api_base: None,
    };
    if is_openrouter {
        config.providers.openrouter = ProviderConfig {
            api_base: Some(OPENROUTER_BASE.to_string()),
            ..provider
        };
        config.providers.openai = ProviderConfig::default();
    } else {
        config.providers.openai = provider;
        config.providers.openrouter = ProviderConfig::default();
    }
    config.assistant.defaults.model = model;

    config.save().await.context("Failed to save config")?;
    println!("✓ Saved to {}", config_path.display());
    println!();

    println!("Setup complete! ✓");
    println!();
    println!("Next steps:");
    println!("  - Authorize your calendar: concierge auth");
    println!("  - Plan a trip:             concierge chat");
    println!("  - Check status:            concierge status");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_agent_wires_all_tools() {
        let mut config = Config::default();
        config.providers.openai.api_key = "sk-test".to_string();

        let agent = build_agent(&config).unwrap();
        assert_eq!(agent.tools().definitions().len(), 5);
        assert_eq!(agent.settings().max_iterations, 15);
    }

    #[test]
    fn test_present_marker() {
        assert_eq!(present(Path::new("/definitely/not/here")), "[Missing]");
        assert_eq!(present(Path::new("/")), "[OK]");
    }
}

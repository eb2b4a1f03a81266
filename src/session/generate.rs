//! Generators for system messages and function definitions.
//!
//! Both are a single completion call against the generator model configured
//! under `[generator]`. A blank prompt never reaches the network.

use crate::config::GeneratorConfig;
use crate::errors::PlaygroundResult;
use crate::llm::provider::LlmProvider;
use crate::llm::request::{build_request, PendingTurn};
use crate::llm::types::SamplingConfig;

const SYSTEM_MESSAGE_INSTRUCTION: &str =
    "Act as a generator of system messages for a chat assistant. Reply with the system message text only.";
const FUNCTION_DEFINITION_INSTRUCTION: &str =
    "Act as a generator of JSON function definitions. Reply with a single JSON object only.";

pub const NO_SYSTEM_MESSAGE: &str = "(no response)";
pub const NO_DEFINITION: &str = "(no definition)";

fn generator_sampling(cfg: &GeneratorConfig, max_tokens: u32) -> SamplingConfig {
    SamplingConfig {
        temperature: Some(cfg.temperature),
        max_tokens: Some(max_tokens),
        ..SamplingConfig::for_model(cfg.model.clone())
    }
}

async fn generate(
    provider: &dyn LlmProvider,
    instruction: &str,
    user_text: &str,
    sampling: &SamplingConfig,
    fallback: &str,
) -> PlaygroundResult<String> {
    let request = build_request(Some(instruction), &[], sampling, PendingTurn::User(user_text));
    let completion = provider.create_chat_completion(&request).await?;
    Ok(completion.content().unwrap_or(fallback).trim().to_string())
}

/// Asks the generator model to write a system message from `prompt`.
pub async fn generate_system_message(
    provider: &dyn LlmProvider,
    cfg: &GeneratorConfig,
    prompt: &str,
) -> PlaygroundResult<Option<String>> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Ok(None);
    }
    let sampling = generator_sampling(cfg, cfg.system_message_max_tokens);
    let text = generate(provider, SYSTEM_MESSAGE_INSTRUCTION, prompt, &sampling, NO_SYSTEM_MESSAGE).await?;
    tracing::info!(model = %cfg.model, chars = text.len(), "system message generated");
    Ok(Some(text))
}

/// Asks the generator model for a JSON function definition matching
/// `description`. The text is returned as-is; validate it with
/// `FunctionDefinition::parse` before storing it.
pub async fn generate_function_definition(
    provider: &dyn LlmProvider,
    cfg: &GeneratorConfig,
    description: &str,
) -> PlaygroundResult<Option<String>> {
    let description = description.trim();
    if description.is_empty() {
        return Ok(None);
    }
    let sampling = generator_sampling(cfg, cfg.function_max_tokens);
    let user_text = format!("Create a JSON definition for: {description}");
    let text = generate(provider, FUNCTION_DEFINITION_INSTRUCTION, &user_text, &sampling, NO_DEFINITION).await?;
    tracing::info!(model = %cfg.model, chars = text.len(), "function definition generated");
    Ok(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::types::{Role, TokenLimit};
    use crate::session::functions::FunctionDefinition;
    use crate::session::testing::ScriptedProvider;

    #[tokio::test]
    async fn blank_prompt_makes_no_call() {
        let provider = ScriptedProvider::new();
        let cfg = GeneratorConfig::default();
        assert_eq!(generate_system_message(&provider, &cfg, "  ").await.unwrap(), None);
        assert_eq!(generate_function_definition(&provider, &cfg, "").await.unwrap(), None);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn system_message_uses_generator_settings() {
        let provider = ScriptedProvider::new().reply("  You are a terse pirate.\n");
        let cfg = GeneratorConfig::default();
        let text = generate_system_message(&provider, &cfg, "pirate, short answers").await.unwrap();
        assert_eq!(text.as_deref(), Some("You are a terse pirate."));

        let request = &provider.requests()[0];
        assert_eq!(request.model, "gpt-3.5-turbo");
        assert_eq!(request.temperature, 0.7);
        assert_eq!(request.token_limit, Some(TokenLimit::MaxTokens(150)));
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.messages[1].content, "pirate, short answers");
    }

    #[tokio::test]
    async fn function_definition_can_be_parsed() {
        let provider = ScriptedProvider::new().reply(r#"{"name": "get_time", "parameters": {"type": "object"}}"#);
        let cfg = GeneratorConfig::default();
        let text = generate_function_definition(&provider, &cfg, "current time in a timezone")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(FunctionDefinition::parse(&text).unwrap().name, "get_time");

        let request = &provider.requests()[0];
        assert_eq!(request.token_limit, Some(TokenLimit::MaxTokens(200)));
        assert!(request.messages[1].content.ends_with("current time in a timezone"));
    }

    #[tokio::test]
    async fn failures_propagate() {
        let provider = ScriptedProvider::new().http_error(401);
        let err = generate_system_message(&provider, &GeneratorConfig::default(), "x")
            .await
            .unwrap_err();
        assert_eq!(err.http_status(), Some(401));
    }
}

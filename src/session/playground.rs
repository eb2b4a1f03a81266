use std::sync::Arc;

use crate::config::{AppConfig, CompareConfig, GeneratorConfig};
use crate::conversation::{Message, MessageId};
use crate::errors::PlaygroundResult;
use crate::llm::models::augment_with_capability_models;
use crate::llm::provider::LlmProvider;
use crate::llm::types::{ModelList, SamplingConfig};
use crate::session::column::Column;
use crate::session::compare::{CompareCoordinator, CompareReplies, Side};
use crate::session::functions::{load_example_functions, FunctionDefinition};
use crate::session::generate;
use crate::session::history::HistoryLog;

/// What a send produced.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// Blank input or nothing to send.
    Ignored,
    Single(Option<Message>),
    Compare(CompareReplies),
}

/// Everything one playground window owns: the provider handle, the main
/// column, the optional compare pair and the history log.
pub struct PlaygroundSession {
    provider: Arc<dyn LlmProvider>,
    main: Column,
    compare: Option<CompareCoordinator>,
    history: HistoryLog,
    sampling_defaults: SamplingConfig,
    compare_config: CompareConfig,
    generator: GeneratorConfig,
}

impl PlaygroundSession {
    pub fn new(provider: Arc<dyn LlmProvider>, config: &AppConfig) -> Self {
        tracing::info!(provider = provider.name(), model = %config.sampling.model, "session started");
        Self {
            provider,
            main: Column::new(config.sampling.clone(), config.session.system_message.clone()),
            compare: None,
            history: HistoryLog::new(),
            sampling_defaults: config.sampling.clone(),
            compare_config: config.compare.clone(),
            generator: config.generator.clone(),
        }
    }

    pub fn main(&self) -> &Column {
        &self.main
    }

    pub fn main_mut(&mut self) -> &mut Column {
        &mut self.main
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn is_comparing(&self) -> bool {
        self.compare.is_some()
    }

    pub fn compare_mut(&mut self) -> Option<&mut CompareCoordinator> {
        self.compare.as_mut()
    }

    /// Column addressed by `side`, or the main column for `None`.
    /// `None` when a side is asked for outside compare mode.
    pub fn column_mut(&mut self, side: Option<Side>) -> Option<&mut Column> {
        match side {
            None => Some(&mut self.main),
            Some(side) => self.compare.as_mut().map(|c| c.column_mut(side)),
        }
    }

    /// Sends `text` to the main column, or to both sides in compare mode.
    pub async fn send(&mut self, text: &str) -> TurnOutcome {
        let before = self.main.conversation.len();
        let outcome = match self.compare.as_mut() {
            Some(compare) => match compare
                .send(&mut self.main.conversation, self.provider.as_ref(), text)
                .await
            {
                Some(replies) => TurnOutcome::Compare(replies),
                None => TurnOutcome::Ignored,
            },
            None => {
                if text.trim().is_empty() {
                    TurnOutcome::Ignored
                } else {
                    TurnOutcome::Single(self.main.send(self.provider.as_ref(), text).await)
                }
            }
        };
        self.record_since(before);
        outcome
    }

    /// Reports the function result attached to assistant turn `id` in the
    /// column picked by `side`.
    pub async fn send_function_result(&mut self, side: Option<Side>, id: MessageId) -> Option<Message> {
        let provider = Arc::clone(&self.provider);
        let column = self.column_mut(side)?;
        let reply = column.send_function_result(provider.as_ref(), id).await;
        if let Some(message) = &reply {
            self.history.record(message);
        }
        reply
    }

    /// Attaches the definition called `name` to assistant turn `id` in the
    /// column picked by `side`. The column's own functions are searched
    /// first, then the main column's. False when the column, the definition
    /// or an assistant turn with that id is missing.
    pub fn attach_function(&mut self, side: Option<Side>, id: MessageId, name: &str) -> bool {
        let from_main = self.main.functions.get(name).map(|f| f.json_definition.clone());
        let Some(column) = self.column_mut(side) else {
            return false;
        };
        let Some(json) = column.functions.get(name).map(|f| f.json_definition.clone()).or(from_main) else {
            tracing::debug!(function = name, "no such function");
            return false;
        };
        column.conversation.attach_function(id, &json)
    }

    fn record_since(&mut self, start: usize) {
        for message in self.main.conversation.messages().iter().skip(start) {
            self.history.record(message);
        }
    }

    /// Clears the main transcript. Compare sides and history are kept.
    pub fn clear(&mut self) {
        self.main.clear();
        tracing::info!("main conversation cleared");
    }

    /// Starts compare mode with both sides copied from the main transcript.
    /// Already comparing: keeps the current pair.
    pub fn enter_compare(&mut self) -> &mut CompareCoordinator {
        let main = &self.main;
        let defaults = &self.sampling_defaults;
        let cfg = &self.compare_config;
        self.compare.get_or_insert_with(|| {
            CompareCoordinator::enter(
                &main.conversation,
                SamplingConfig {
                    model: cfg.left_model.clone(),
                    ..defaults.clone()
                },
                SamplingConfig {
                    model: cfg.right_model.clone(),
                    ..defaults.clone()
                },
                &main.system_message,
            )
        })
    }

    pub fn exit_compare(&mut self) -> Option<CompareCoordinator> {
        let previous = self.compare.take();
        if previous.is_some() {
            tracing::info!("leaving compare mode");
        }
        previous
    }

    /// Remote model listing plus the capability-only ids.
    pub async fn list_models(&self) -> PlaygroundResult<ModelList> {
        let mut list = self.provider.list_models().await?;
        augment_with_capability_models(&mut list);
        Ok(list)
    }

    /// Generates a system message and installs it on the main column.
    pub async fn generate_system_message(&mut self, prompt: &str) -> PlaygroundResult<Option<String>> {
        let generated = generate::generate_system_message(self.provider.as_ref(), &self.generator, prompt).await?;
        if let Some(text) = &generated {
            self.main.system_message = text.clone();
        }
        Ok(generated)
    }

    /// Generates a definition and adds it to the main column's functions
    /// once it parses.
    pub async fn generate_function(&mut self, description: &str) -> PlaygroundResult<Option<FunctionDefinition>> {
        let Some(text) = generate::generate_function_definition(self.provider.as_ref(), &self.generator, description).await?
        else {
            return Ok(None);
        };
        let function = FunctionDefinition::parse(&text)?;
        self.main.functions.add(function.clone());
        Ok(Some(function))
    }

    /// Adds the bundled example definitions to the main column.
    pub fn load_examples(&mut self) -> PlaygroundResult<usize> {
        let examples = load_example_functions()?;
        let count = examples.len();
        for function in examples {
            self.main.functions.add(function);
        }
        Ok(count)
    }
}

use serde::{Deserialize, Serialize};

use crate::errors::{PlaygroundError, PlaygroundResult};
use crate::llm::request::declared_name;
pub use crate::llm::request::UNNAMED_FUNCTION;

/// A callable contract the user can attach to an assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    /// Raw text as authored or generated.
    pub json_definition: String,
}

impl FunctionDefinition {
    /// Validates `json` and extracts its name. Invalid JSON is rejected and
    /// nothing is created.
    pub fn parse(json: &str) -> PlaygroundResult<Self> {
        let value: serde_json::Value =
            serde_json::from_str(json).map_err(|e| PlaygroundError::InvalidFunctionDefinition(e.to_string()))?;
        Ok(Self {
            name: declared_name(&value).to_string(),
            json_definition: json.to_string(),
        })
    }
}

/// Flat list of function definitions owned by one column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionLibrary {
    functions: Vec<FunctionDefinition>,
}

impl FunctionLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, function: FunctionDefinition) {
        tracing::debug!(function = %function.name, "function added");
        self.functions.push(function);
    }

    /// Replaces the definition registered under `name`. Returns false when
    /// no such definition exists.
    pub fn update(&mut self, name: &str, function: FunctionDefinition) -> bool {
        match self.functions.iter_mut().find(|f| f.name == name) {
            Some(slot) => {
                *slot = function;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.functions.len();
        self.functions.retain(|f| f.name != name);
        before != self.functions.len()
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDefinition> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FunctionDefinition> {
        self.functions.iter()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Loads the example definitions from prompts/functions/examples.json.
/// The JSON is embedded at compile time via include_str!.
pub fn load_example_functions() -> PlaygroundResult<Vec<FunctionDefinition>> {
    let json = include_str!("../../prompts/functions/examples.json");
    let values: Vec<serde_json::Value> = serde_json::from_str(json)
        .map_err(|e| PlaygroundError::Config(format!("Failed to parse example functions: {e}")))?;
    values
        .iter()
        .map(|v| -> PlaygroundResult<FunctionDefinition> {
            let text = serde_json::to_string_pretty(v)?;
            FunctionDefinition::parse(&text)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::request::function_name;

    #[test]
    fn parse_extracts_name() {
        let f = FunctionDefinition::parse(r#"{"name": "get_time", "parameters": {}}"#).unwrap();
        assert_eq!(f.name, "get_time");
        assert_eq!(f.json_definition, r#"{"name": "get_time", "parameters": {}}"#);
    }

    #[test]
    fn parse_falls_back_to_placeholder_name() {
        assert_eq!(FunctionDefinition::parse("{}").unwrap().name, UNNAMED_FUNCTION);
        assert_eq!(FunctionDefinition::parse(r#"{"name": ""}"#).unwrap().name, UNNAMED_FUNCTION);
        assert_eq!(FunctionDefinition::parse("[1, 2]").unwrap().name, UNNAMED_FUNCTION);
    }

    #[test]
    fn stored_name_matches_the_name_sent_with_the_function_turn() {
        let padded = FunctionDefinition::parse(r#"{"name": "  get_weather  "}"#).unwrap();
        assert_eq!(padded.name, "get_weather");
        assert_eq!(function_name(&padded.json_definition), padded.name);

        let blank = FunctionDefinition::parse(r#"{"name": "   "}"#).unwrap();
        assert_eq!(blank.name, UNNAMED_FUNCTION);
        assert_eq!(function_name(&blank.json_definition), "unnamed_function");
    }

    #[test]
    fn invalid_json_is_rejected() {
        let err = FunctionDefinition::parse("{ name: get_time").unwrap_err();
        assert!(matches!(err, PlaygroundError::InvalidFunctionDefinition(_)));
    }

    #[test]
    fn library_add_update_remove() {
        let mut lib = FunctionLibrary::new();
        lib.add(FunctionDefinition::parse(r#"{"name": "a"}"#).unwrap());
        lib.add(FunctionDefinition::parse(r#"{"name": "b"}"#).unwrap());
        assert_eq!(lib.len(), 2);

        let replacement = FunctionDefinition::parse(r#"{"name": "a", "description": "new"}"#).unwrap();
        assert!(lib.update("a", replacement));
        assert!(lib.get("a").unwrap().json_definition.contains("new"));
        assert!(!lib.update("zzz", FunctionDefinition::parse("{}").unwrap()));

        assert!(lib.remove("b"));
        assert!(!lib.remove("b"));
        let names: Vec<&str> = lib.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a"]);
    }

    #[test]
    fn examples_load() {
        let examples = load_example_functions().unwrap();
        let names: Vec<&str> = examples.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["get_weather", "get_stock_price"]);
        assert!(examples[1].json_definition.contains("\"symbol\""));
    }
}

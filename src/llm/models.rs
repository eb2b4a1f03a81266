use crate::llm::types::{ModelInfo, ModelList};

/// Non-chat capability ids the model selector always offers.
/// They are never sent to the completion endpoint.
pub const CAPABILITY_MODELS: [&str; 4] = ["tts-1", "tts-1-hd", "image-dalle", "whisper-1"];

pub fn is_capability_model(id: &str) -> bool {
    CAPABILITY_MODELS.contains(&id)
}

/// Appends each capability id that the listing does not already contain.
pub fn augment_with_capability_models(list: &mut ModelList) {
    for id in CAPABILITY_MODELS {
        if !list.data.iter().any(|m| m.id == id) {
            list.data.push(ModelInfo {
                id: id.to_string(),
                object: "model".to_string(),
            });
        }
    }
}

use super::LlmError;

/// Text generation against a named model.
pub trait LlmClient: Send + Sync {
    fn generate(&self, model: &str, prompt: &str, system: Option<&str>) -> Result<String, LlmError>;

    fn is_model_available(&self, model: &str) -> Result<bool, LlmError>;

    fn list_models(&self) -> Result<Vec<String>, LlmError>;
}

/// Chat with base64-encoded images attached to the user message.
pub trait VisionClient: Send + Sync {
    fn chat_with_images(
        &self,
        model: &str,
        prompt: &str,
        images: &[String],
        system: Option<&str>,
    ) -> Result<String, LlmError>;
}

use toolwire_model::{ModelMessage, ModelRequest, ModelTool};

/// The messages exchanged during one agent invocation.
#[derive(Clone, Default, Debug)]
pub(crate) struct Conversation {
    messages: Vec<ModelMessage>,
}

impl Conversation {
    #[inline]
    pub fn push(&mut self, msg: ModelMessage) {
        self.messages.push(msg);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Snapshots the conversation into a request.
    pub fn to_request(
        &self,
        tools: Vec<ModelTool>,
        temperature: Option<f32>,
    ) -> ModelRequest {
        ModelRequest {
            messages: self.messages.clone(),
            tools,
            temperature,
        }
    }
}

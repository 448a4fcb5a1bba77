use supportdesk_core::{ChatHistory, ChatRole};

use crate::llm::ChatMessage;

/// Prior turns as model messages, oldest first.
pub fn history_messages(turns: &[ChatHistory]) -> Vec<ChatMessage> {
    turns
        .iter()
        .map(|turn| match turn.role {
            ChatRole::User => ChatMessage::user(turn.content.clone()),
            ChatRole::Assistant => ChatMessage::assistant(turn.content.clone()),
        })
        .collect()
}

pub fn request_messages(instructions: String, history: &[ChatMessage], question: &str) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ChatMessage::system(instructions));
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(question));
    messages
}

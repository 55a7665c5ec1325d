use std::collections::VecDeque;

use super::{ChatMessage, Role};

/// Rolling conversation history.
///
/// Holds at most one system message, always reported first, plus user and
/// assistant turns. The total count, system message included, never exceeds
/// `max_len`; the oldest turns are evicted first and the system message is
/// never evicted.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    system: Option<ChatMessage>,
    turns: VecDeque<ChatMessage>,
    max_len: usize,
}

impl ConversationContext {
    pub fn new(max_len: usize) -> Self {
        Self {
            system: None,
            turns: VecDeque::new(),
            max_len: max_len.max(1),
        }
    }

    pub fn set_system_message(&mut self, content: impl Into<String>) {
        self.system = Some(ChatMessage::system(content));
        self.evict();
    }

    /// Appends a turn. A system-role message replaces the current system entry.
    pub fn push(&mut self, message: ChatMessage) {
        if message.role == Role::System {
            self.set_system_message(message.content);
            return;
        }
        self.turns.push_back(message);
        self.evict();
    }

    pub fn clear(&mut self) {
        self.system = None;
        self.turns.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.turns.len() + usize::from(self.system.is_some())
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.system
            .iter()
            .chain(self.turns.iter())
            .cloned()
            .collect()
    }

    fn evict(&mut self) {
        let budget = self.max_len - usize::from(self.system.is_some());
        while self.turns.len() > budget {
            self.turns.pop_front();
        }
    }
}

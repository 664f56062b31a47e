use crate::models::message::ChatMessage;

/// Fixed prologue followed by a window of the most recent turns. The request
/// being resolved and every turn after it are never evicted, so the window may
/// run over `max_turns` until the next request starts.
#[derive(Debug, Clone)]
pub struct Conversation {
    prologue: Vec<ChatMessage>,
    turns: Vec<ChatMessage>,
    max_turns: usize,
    pushed: usize,
    request_start: Option<usize>,
}

/// Position in a conversation, taken with [`Conversation::checkpoint`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(usize);

impl Conversation {
    pub fn new(prologue: Vec<ChatMessage>, max_turns: usize) -> Self {
        Self {
            prologue,
            turns: Vec::new(),
            max_turns: max_turns.max(1),
            pushed: 0,
            request_start: None,
        }
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.turns.push(message);
        self.pushed += 1;

        let excess = self.turns.len().saturating_sub(self.max_turns);
        let evictable = self.request_start.unwrap_or(self.turns.len());
        let evicted = excess.min(evictable);
        self.turns.drain(..evicted);
        if let Some(start) = self.request_start.as_mut() {
            *start -= evicted;
        }
    }

    /// Pushes a new user request and pins it until the next one.
    pub fn push_request(&mut self, message: ChatMessage) {
        self.request_start = None;
        self.push(message);
        self.request_start = Some(self.turns.len() - 1);
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.prologue.iter().chain(self.turns.iter()).cloned().collect()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.turns.last().or_else(|| self.prologue.last())
    }

    #[cfg(test)]
    pub fn turn_count(&self) -> usize {
        self.turns.len()
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.pushed)
    }

    /// Drops every turn pushed after `checkpoint` that is still in the window.
    pub fn rollback(&mut self, checkpoint: Checkpoint) {
        let added = self.pushed.saturating_sub(checkpoint.0);
        let keep = self.turns.len().saturating_sub(added);
        self.turns.truncate(keep);
        self.pushed = checkpoint.0.min(self.pushed);
        if self.request_start.is_some_and(|start| start >= self.turns.len()) {
            self.request_start = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_keeps_prologue() {
        let mut conversation = Conversation::new(vec![ChatMessage::system("rules")], 2);
        for i in 0..5 {
            conversation.push(ChatMessage::user(format!("m{}", i)));
        }
        let contents: Vec<String> = conversation.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["rules", "m3", "m4"]);
    }

    #[test]
    fn test_rollback_discards_failed_turn() {
        let mut conversation = Conversation::new(Vec::new(), 10);
        conversation.push(ChatMessage::user("keep"));
        let checkpoint = conversation.checkpoint();
        conversation.push(ChatMessage::user("noise"));
        conversation.push(ChatMessage::system("fix your json"));
        conversation.rollback(checkpoint);

        assert_eq!(conversation.turn_count(), 1);
        assert_eq!(conversation.last().unwrap().content, "keep");
    }

    #[test]
    fn test_request_survives_its_own_retries() {
        let mut conversation = Conversation::new(vec![ChatMessage::system("rules")], 2);
        conversation.push(ChatMessage::user("old"));
        conversation.push_request(ChatMessage::user("train yolo"));
        for _ in 0..3 {
            conversation.push(ChatMessage::assistant("oops"));
            conversation.push(ChatMessage::system("fix your json"));
        }

        let messages = conversation.messages();
        assert_eq!(messages[1].content, "train yolo");
        assert_eq!(conversation.turn_count(), 7);

        // The next request releases the pin and the window shrinks again.
        conversation.push_request(ChatMessage::user("query yolo"));
        let contents: Vec<String> = conversation.messages().into_iter().map(|m| m.content).collect();
        assert_eq!(contents, vec!["rules", "fix your json", "query yolo"]);
    }
}

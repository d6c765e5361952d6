//! The seven entity families sharing the sync engine's common row shape.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Note,
    Task,
    TaskList,
    TaskListCategory,
    Chat,
    Comment,
    ChatMessage,
}

impl Family {
    pub const ALL: [Family; 7] = [
        Family::Note,
        Family::Task,
        Family::TaskList,
        Family::TaskListCategory,
        Family::Chat,
        Family::Comment,
        Family::ChatMessage,
    ];

    /// Postgres table name.
    pub const fn table(self) -> &'static str {
        match self {
            Family::Note => "notes",
            Family::Task => "tasks",
            Family::TaskList => "task_lists",
            Family::TaskListCategory => "task_list_categories",
            Family::Chat => "chats",
            Family::Comment => "comments",
            Family::ChatMessage => "chat_messages",
        }
    }

    /// `{family}` URL path segment.
    pub const fn url_segment(self) -> &'static str {
        match self {
            Family::Note => "notes",
            Family::Task => "tasks",
            Family::TaskList => "task-lists",
            Family::TaskListCategory => "task-list-categories",
            Family::Chat => "chats",
            Family::Comment => "comments",
            Family::ChatMessage => "chat-messages",
        }
    }

    pub fn from_url_segment(segment: &str) -> Option<Family> {
        Some(match segment {
            "notes" => Family::Note,
            "tasks" => Family::Task,
            "task-lists" => Family::TaskList,
            "task-list-categories" => Family::TaskListCategory,
            "chats" => Family::Chat,
            "comments" => Family::Comment,
            "chat-messages" => Family::ChatMessage,
            _ => return None,
        })
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url_segment())
    }
}

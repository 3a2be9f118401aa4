//! Action verbs understood by the dispatcher

use std::fmt;

/// A resolved dispatcher action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// `get` / `find`: query rendered nodes
    Get,
    /// `compiled` / `store`: snapshot the compiled-template cache
    Compiled,
    /// `clear` / `empty` / `remove`: remove rendered nodes
    Remove,
    /// Any other verb: compile, render and insert
    Add,
}

impl Action {
    /// Resolve a verb case-insensitively
    ///
    /// Returns `None` for a blank verb, which callers treat as a no-op.
    /// Unrecognized non-blank verbs resolve to [`Action::Add`].
    pub fn resolve(verb: &str) -> Option<Action> {
        let verb = verb.trim();
        if verb.is_empty() {
            return None;
        }
        let action = match verb.to_ascii_uppercase().as_str() {
            "GET" | "FIND" => Action::Get,
            "COMPILED" | "STORE" => Action::Compiled,
            "CLEAR" | "EMPTY" | "REMOVE" => Action::Remove,
            _ => Action::Add,
        };
        Some(action)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Action::Get => "get",
            Action::Compiled => "compiled",
            Action::Remove => "remove",
            Action::Add => "add",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_families() {
        assert_eq!(Action::resolve("get"), Some(Action::Get));
        assert_eq!(Action::resolve("FIND"), Some(Action::Get));
        assert_eq!(Action::resolve("Compiled"), Some(Action::Compiled));
        assert_eq!(Action::resolve("store"), Some(Action::Compiled));
        assert_eq!(Action::resolve("clear"), Some(Action::Remove));
        assert_eq!(Action::resolve("Empty"), Some(Action::Remove));
        assert_eq!(Action::resolve("REMOVE"), Some(Action::Remove));
    }

    #[test]
    fn test_anything_else_is_add() {
        assert_eq!(Action::resolve("add"), Some(Action::Add));
        assert_eq!(Action::resolve("append"), Some(Action::Add));
        assert_eq!(Action::resolve("getter"), Some(Action::Add));
    }

    #[test]
    fn test_blank_is_none() {
        assert_eq!(Action::resolve(""), None);
        assert_eq!(Action::resolve("   "), None);
    }
}

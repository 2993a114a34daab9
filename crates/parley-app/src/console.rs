//! Line-oriented terminal front end.

use std::sync::Mutex;

use parley_presence::{LocalIdentity, TypingRoster, TypingSession};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

/// One-line summary of who is typing.
pub fn describe(roster: &TypingRoster) -> String {
    let labels = roster.labels();
    match labels.as_slice() {
        [] => "nobody is typing".to_string(),
        [one] => format!("{one} is typing…"),
        [first, second] => format!("{first} and {second} are typing…"),
        many => format!("{} people are typing…", many.len()),
    }
}

/// Print roster changes, skipping repeats of the previous line.
pub fn print_roster_changes(session: &TypingSession) {
    let last = Mutex::new(String::new());
    session.on_roster_change(move |roster| {
        let line = describe(roster);
        let mut last = last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if *last != line {
            println!("[{}] {line}", chrono::Local::now().format("%H:%M:%S"));
            *last = line;
        }
    });
}

/// What a line of input asks for.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Typing,
    Stop,
    Quit,
    Ignore,
}

pub fn classify(line: &str) -> Input {
    match line.trim() {
        "" => Input::Ignore,
        "/stop" => Input::Stop,
        "/quit" => Input::Quit,
        _ => Input::Typing,
    }
}

/// Read stdin until `/quit`, EOF, or Ctrl-C. Each line is a burst of typing.
pub async fn run(session: Option<&TypingSession>, identity: &LocalIdentity) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                debug!("Interrupted");
                return;
            }
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => return,
            Err(e) => {
                warn!(error = %e, "Failed to read stdin");
                return;
            }
        };

        match (classify(&line), session) {
            (Input::Quit, _) => return,
            (Input::Ignore, _) | (_, None) => {}
            (Input::Stop, Some(session)) => session.stop_typing(),
            (Input::Typing, Some(session)) => session.start_typing(identity.profile()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_presence::PresenceTable;
    use serde_json::json;
    use std::collections::HashMap;

    fn roster(typists: &[&str]) -> TypingRoster {
        let state: HashMap<String, Vec<serde_json::Value>> = typists
            .iter()
            .map(|name| {
                (
                    name.to_string(),
                    vec![json!({"isTyping": true, "username": name})],
                )
            })
            .collect();
        TypingRoster::from_table("c1", &PresenceTable::from_state(state), "me", "User")
    }

    #[test]
    fn describes_roster_sizes() {
        assert_eq!(describe(&roster(&[])), "nobody is typing");
        assert_eq!(describe(&roster(&["alice"])), "alice is typing…");
        assert_eq!(describe(&roster(&["alice", "bob"])), "alice and bob are typing…");
        assert_eq!(describe(&roster(&["alice", "bob", "carol"])), "3 people are typing…");
    }

    #[test]
    fn classifies_commands() {
        assert_eq!(classify("  "), Input::Ignore);
        assert_eq!(classify("/stop"), Input::Stop);
        assert_eq!(classify(" /quit "), Input::Quit);
        assert_eq!(classify("hello"), Input::Typing);
    }
}

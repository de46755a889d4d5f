// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Terminal rendering of the session state and command parsing.
//!
//! Everything here is a pure function of its input; the binary wires it
//! to stdin/stdout and the [`SessionController`](crate::services::SessionController).

use crate::models::{Notification, NotificationLevel, SessionState};

/// A user action typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SignIn,
    Edit,
    Cancel,
    Save(String),
    Refresh,
    SignOut,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  signin        sign in with Google
  edit          edit the display name
  save <name>   save a new display name
  cancel        stop editing
  refresh       reload the display name
  signout       sign out
  quit          exit";

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "signin" | "login" => Command::SignIn,
        "edit" => Command::Edit,
        "cancel" => Command::Cancel,
        "save" if rest.is_empty() => return Err("usage: save <name>".to_string()),
        "save" => Command::Save(rest.to_string()),
        "refresh" => Command::Refresh,
        "signout" | "logout" => Command::SignOut,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("unknown command: {other} (try `help`)")),
    };

    Ok(Some(command))
}

/// Why `save` cannot run in `state`, or `None` when it can. `save` enters
/// edit mode itself, so only signed-out and in-flight states refuse it.
pub fn save_hint(state: &SessionState) -> Option<&'static str> {
    match state {
        SessionState::SignedOut => Some("sign in first (signin)"),
        SessionState::SigningIn => Some("still signing in"),
        SessionState::SignedIn(s) if s.saving => Some("still saving the previous name"),
        SessionState::SignedIn(_) => None,
    }
}

/// Render the screen for `state`.
pub fn render(state: &SessionState) -> String {
    match state {
        SessionState::SignedOut => "[ Sign in with Google ]   (signin)".to_string(),
        SessionState::SigningIn => "Signing in...".to_string(),
        SessionState::SignedIn(s) => {
            let name_line = match (&s.pending_display_name, s.saving) {
                (Some(pending), _) => format!("name:  [{pending}]   (save <name> | cancel)"),
                (None, true) => format!("name:  {}   (saving...)", s.profile.display_name),
                (None, false) => format!("name:  {}   (edit)", s.profile.display_name),
            };
            let photo = if s.profile.photo_url.is_empty() {
                "-"
            } else {
                s.profile.photo_url.as_str()
            };
            format!(
                "email: {}\nphoto: {}\n{}\n(signout)",
                s.identity.email, photo, name_line
            )
        }
    }
}

pub fn render_notification(notification: &Notification) -> String {
    match notification.level {
        NotificationLevel::Info => format!("* {}", notification.message),
        NotificationLevel::Error => format!("! {}", notification.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Identity, ProfileRecord, SignedIn};

    fn signed_in() -> SignedIn {
        SignedIn::new(
            Identity {
                id: "u1".to_string(),
                email: "a@x.com".to_string(),
                photo_url: None,
                token: "t".to_string(),
            },
            ProfileRecord {
                id: "u1".to_string(),
                email: "a@x.com".to_string(),
                photo_url: String::new(),
                display_name: "Alice".to_string(),
            },
        )
    }

    #[test]
    fn save_hint_only_when_save_cannot_run() {
        assert!(save_hint(&SessionState::SignedOut).is_some());
        assert!(save_hint(&SessionState::SigningIn).is_some());

        let mut s = signed_in();
        assert_eq!(save_hint(&SessionState::SignedIn(s.clone())), None);

        s.pending_display_name = Some("Bob".to_string());
        assert_eq!(save_hint(&SessionState::SignedIn(s.clone())), None);

        s.pending_display_name = None;
        s.saving = true;
        assert_eq!(
            save_hint(&SessionState::SignedIn(s)),
            Some("still saving the previous name")
        );
    }

    #[test]
    fn parses_commands() {
        assert_eq!(parse_command("  "), Ok(None));
        assert_eq!(parse_command("signin"), Ok(Some(Command::SignIn)));
        assert_eq!(parse_command("LOGOUT"), Ok(Some(Command::SignOut)));
        assert_eq!(
            parse_command("save  Alicia Smith "),
            Ok(Some(Command::Save("Alicia Smith".to_string())))
        );
        assert!(parse_command("save").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn renders_each_state() {
        assert!(render(&SessionState::SignedOut).contains("Sign in with Google"));
        assert_eq!(render(&SessionState::SigningIn), "Signing in...");

        let mut s = signed_in();
        let screen = render(&SessionState::SignedIn(s.clone()));
        assert!(screen.contains("email: a@x.com"));
        assert!(screen.contains("photo: -"));
        assert!(screen.contains("name:  Alice   (edit)"));

        s.pending_display_name = Some("Ali".to_string());
        assert!(render(&SessionState::SignedIn(s.clone())).contains("[Ali]"));

        s.pending_display_name = None;
        s.saving = true;
        assert!(render(&SessionState::SignedIn(s)).contains("(saving...)"));
    }

    #[test]
    fn notifications_are_prefixed_by_level() {
        assert_eq!(
            render_notification(&Notification::error("Failed to update name: x")),
            "! Failed to update name: x"
        );
        assert_eq!(
            render_notification(&Notification::info("Name updated")),
            "* Name updated"
        );
    }
}

//! Terminal chat.
//!
//! The session opens on the profile editor; once a valid profile is saved
//! every line is a question. `/profile` edits the profile again, `/quit` or
//! Ctrl-D leaves.

use std::sync::Arc;

use coach_core::{Gender, UserProfile};
use coach_rag::RetrievalChain;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::error;

use crate::error::SessionError;
use crate::session::{CoachStore, SessionContext, Tab};

enum Input {
    Line(String),
    Quit,
}

fn read(editor: &mut DefaultEditor, prompt: &str) -> anyhow::Result<Input> {
    match editor.readline(prompt) {
        Ok(line) => {
            if !line.trim().is_empty() {
                let _ = editor.add_history_entry(line.as_str());
            }
            Ok(Input::Line(line))
        }
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(Input::Quit),
        Err(e) => Err(e.into()),
    }
}

/// Parse a yes/no answer; blank keeps `current`.
pub fn parse_yes_no(input: &str, current: bool) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "" => Some(current),
        "y" | "yes" | "si" | "sí" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Parse a whole number; blank keeps `current`, anything else unparsable is
/// rejected.
pub fn parse_number(input: &str, current: Option<u32>) -> Option<Option<u32>> {
    let input = input.trim();
    if input.is_empty() {
        return Some(current);
    }
    input.parse().ok().map(Some)
}

fn shown<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn ask_until<T>(
    editor: &mut DefaultEditor,
    prompt: &str,
    parse: impl Fn(&str) -> Option<T>,
) -> anyhow::Result<Option<T>> {
    loop {
        let Input::Line(line) = read(editor, prompt)? else {
            return Ok(None);
        };
        match parse(&line) {
            Some(value) => return Ok(Some(value)),
            None => println!("  could not understand '{}', try again", line.trim()),
        }
    }
}

/// Walk through every profile field; `None` when the user quits midway.
fn edit_profile(
    editor: &mut DefaultEditor,
    current: &UserProfile,
) -> anyhow::Result<Option<UserProfile>> {
    println!("Edit profile (press Enter to keep the value in brackets)");

    let gender_prompt =
        format!("gender (male/female/other) [{}]: ", shown(current.gender.map(|g| g.as_str())));
    let parse_gender = |s: &str| {
        if s.trim().is_empty() {
            Some(current.gender)
        } else {
            s.parse::<Gender>().ok().map(Some)
        }
    };
    let Some(gender) = ask_until(editor, &gender_prompt, parse_gender)? else {
        return Ok(None);
    };

    let age_prompt = format!("age [{}]: ", shown(current.age));
    let Some(age) = ask_until(editor, &age_prompt, |s| parse_number(s, current.age))? else {
        return Ok(None);
    };
    let height_prompt = format!("height in cm [{}]: ", shown(current.height));
    let Some(height) = ask_until(editor, &height_prompt, |s| parse_number(s, current.height))? else {
        return Ok(None);
    };
    let weight_prompt = format!("weight in kg [{}]: ", shown(current.weight));
    let Some(weight) = ask_until(editor, &weight_prompt, |s| parse_number(s, current.weight))? else {
        return Ok(None);
    };

    let injury_prompt =
        format!("current injury? (y/n) [{}]: ", if current.injury { "y" } else { "n" });
    let Some(injury) = ask_until(editor, &injury_prompt, |s| parse_yes_no(s, current.injury))? else {
        return Ok(None);
    };
    let injury_description = if injury {
        let prompt = format!("describe the injury [{}]: ", current.injury_description);
        let Input::Line(line) = read(editor, &prompt)? else {
            return Ok(None);
        };
        match line.trim() {
            "" => current.injury_description.clone(),
            text => text.to_string(),
        }
    } else {
        String::new()
    };

    Ok(Some(UserProfile { gender, age, height, weight, injury, injury_description }))
}

/// Run the chat loop until the user leaves.
pub async fn run(
    store: Arc<dyn CoachStore>,
    chain: RetrievalChain,
    user_id: Option<String>,
) -> anyhow::Result<()> {
    let mut session = SessionContext::load(store.as_ref(), user_id).await?;
    let mut editor = DefaultEditor::new()?;
    println!("Session {} (use --user-id to resume it later)", session.user_id);
    for message in &session.history {
        println!("{}> {}", message.role, message.content);
    }

    loop {
        if session.active_tab == Tab::EditProfile {
            let Some(profile) = edit_profile(&mut editor, &session.profile)? else {
                return Ok(());
            };
            match session.save_profile(store.as_ref(), profile).await {
                Ok(()) => println!("Profile saved. Ask me anything about your training."),
                Err(SessionError::InvalidProfile(issues)) => {
                    for issue in issues {
                        println!("  - {issue}");
                    }
                }
                Err(e) => return Err(e.into()),
            }
            continue;
        }

        let Input::Line(line) = read(&mut editor, "you> ")? else {
            return Ok(());
        };
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => return Ok(()),
            "/profile" => {
                session.active_tab = Tab::EditProfile;
                continue;
            }
            _ => {}
        }

        match session.ask(store.as_ref(), &chain, &line).await {
            Ok(answer) => println!("coach> {answer}"),
            Err(e) => {
                error!(error = %e, "turn failed");
                println!("coach> sorry, something went wrong: {e}");
            }
        }
    }
}

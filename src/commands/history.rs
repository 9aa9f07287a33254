use crate::cli::parse_switch;
use crate::error::{NarrativeError, Result};
use crate::safety::CrisisFilter;
use crate::session::{Role, SessionCache};
use colored::Colorize;
use prettytable::{format, row, Table};

const PREVIEW_CHARS: usize = 40;

/// Show a child's cached conversations, most recent first
pub fn show_history(cache: &SessionCache, child_id: i64) -> Result<()> {
    let index = cache.session_index(child_id);
    if index.is_empty() {
        println!("{}", "No conversations cached for this child.".yellow());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row![
        "Character".bold(),
        "Session".bold(),
        "Messages".bold(),
        "Last message".bold(),
        "Updated".bold()
    ]);

    for entry in &index {
        let context = cache.load(child_id, &entry.character_id);
        let last = context
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| preview(&m.text))
            .unwrap_or_else(|| "-".to_string());
        table.add_row(row![
            entry.character_id.cyan(),
            entry
                .session_id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "offline".to_string()),
            entry.message_count,
            last,
            entry.updated_at.format("%Y-%m-%d %H:%M")
        ]);
    }

    println!("\nConversations:");
    table.printstd();

    for context in cache.cached_contexts(child_id) {
        if !context.summary.is_empty() {
            println!("\n{} {}", context.character_id.cyan().bold(), context.summary);
        }
    }
    println!();
    Ok(())
}

/// Show crisis alerts recorded for a child
pub fn show_alerts(crisis: &CrisisFilter, child_id: i64) -> Result<()> {
    let alerts = crisis.alerts(child_id);
    if alerts.is_empty() {
        println!("{}", "No safety alerts recorded.".green());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row!["When".bold(), "Character".bold(), "Message".bold()]);
    for alert in &alerts {
        table.add_row(row![
            alert.timestamp.format("%Y-%m-%d %H:%M"),
            alert.character_id,
            alert.message.red()
        ]);
    }

    println!(
        "\n{}",
        format!("{} safety alert(s) for child {}", alerts.len(), child_id)
            .red()
            .bold()
    );
    table.printstd();
    println!();
    Ok(())
}

/// Show or update a child's display preferences
///
/// # Errors
///
/// Returns error for values other than on/off, or if the store write fails
pub fn handle_prefs(
    cache: &SessionCache,
    child_id: i64,
    reduced_motion: Option<String>,
    sound: Option<String>,
) -> Result<()> {
    let mut preferences = cache.preferences(child_id);
    let mut changed = false;

    if let Some(value) = reduced_motion {
        preferences.reduced_motion = switch_value("--reduced-motion", &value)?;
        changed = true;
    }
    if let Some(value) = sound {
        preferences.sound = switch_value("--sound", &value)?;
        changed = true;
    }
    if changed {
        cache.set_preferences(child_id, &preferences)?;
        println!("{}", "Preferences saved.".green());
    }

    println!("Reduced motion: {}", on_off(preferences.reduced_motion));
    println!("Sound:          {}", on_off(preferences.sound));
    println!(
        "Theme:          {}",
        preferences.theme.as_deref().unwrap_or("(default)")
    );
    Ok(())
}

fn switch_value(flag: &str, value: &str) -> Result<bool> {
    parse_switch(value).ok_or_else(|| {
        NarrativeError::Config(format!("{} expects on or off, got {}", flag, value)).into()
    })
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS - 3).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{CacheSettings, SessionContext};
    use crate::storage::LocalStore;
    use crate::test_utils::MockService;
    use std::sync::Arc;

    fn cache() -> SessionCache {
        SessionCache::new(
            LocalStore::temporary().unwrap(),
            Arc::new(MockService::new()),
            CacheSettings::default(),
        )
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let long = "ஆ".repeat(50);
        let short = preview(&long);
        assert_eq!(short.chars().count(), PREVIEW_CHARS);
        assert!(short.ends_with("..."));
        assert_eq!(preview("hi"), "hi");
    }

    #[test]
    fn test_handle_prefs_updates_values() {
        let cache = cache();
        handle_prefs(&cache, 1, Some("on".to_string()), Some("off".to_string())).unwrap();
        let prefs = cache.preferences(1);
        assert!(prefs.reduced_motion);
        assert!(!prefs.sound);
    }

    #[test]
    fn test_handle_prefs_rejects_bad_value() {
        let cache = cache();
        let result = handle_prefs(&cache, 1, Some("sometimes".to_string()), None);
        crate::test_utils::assert_error_contains(result, "expects on or off");
        assert!(!cache.preferences(1).reduced_motion);
    }

    #[test]
    fn test_show_history_and_alerts() {
        let cache = cache();
        assert!(show_history(&cache, 1).is_ok());
        cache.save(&SessionContext::new(1, "rita")).unwrap();
        assert!(show_history(&cache, 1).is_ok());

        let crisis = CrisisFilter::new(cache.store().clone());
        assert!(show_alerts(&crisis, 1).is_ok());
        crisis.scan("I want to die", 1, "rita");
        assert!(show_alerts(&crisis, 1).is_ok());
    }
}

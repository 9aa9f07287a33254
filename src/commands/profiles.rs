//! Profile, character, theme, dashboard and health commands

use crate::characters;
use crate::cli::{ChildCommand, ThemeCommand};
use crate::client::{ChatService, ChildProfile, CreateChildRequest, ParentDashboard};
use crate::error::{NarrativeError, Result};
use crate::session::SessionCache;
use colored::Colorize;
use prettytable::{format, row, Table};

/// Handle `children` subcommands
pub async fn handle_children(service: &dyn ChatService, command: ChildCommand) -> Result<()> {
    match command {
        ChildCommand::List => {
            let children = service.list_children().await?;
            if children.is_empty() {
                println!("{}", "No child profiles yet.".yellow());
                println!(
                    "Create one with {}",
                    "neuronarrative children create --name <NAME>".cyan()
                );
                return Ok(());
            }
            println!("\nChild profiles:");
            children_table(&children).printstd();
            println!();
        }
        ChildCommand::Create { name, avatar, age } => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(NarrativeError::Config("Child name cannot be empty".to_string()).into());
            }
            let child = service
                .create_child(&CreateChildRequest { name, avatar, age })
                .await?;
            println!(
                "{}",
                format!("Created profile {} {} (id {})", child.avatar, child.name, child.id).green()
            );
        }
        ChildCommand::Show { id } => {
            let child = service.get_child(id).await?;
            print_child(&child);
        }
        ChildCommand::Delete { id } => {
            service.delete_child(id).await?;
            println!("{}", format!("Deleted profile {}", id).green());
        }
    }
    Ok(())
}

fn children_table(children: &[ChildProfile]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row![
        "ID".bold(),
        "Avatar".bold(),
        "Name".bold(),
        "Level".bold(),
        "XP".bold()
    ]);
    for child in children {
        table.add_row(row![
            child.id.to_string().cyan(),
            child.avatar,
            child.name,
            child.level,
            child.xp
        ]);
    }
    table
}

fn print_child(child: &ChildProfile) {
    println!("\n{} {}", child.avatar, child.name.bold());
    println!("  Level:  {}", child.level);
    println!("  XP:     {} / {}", child.xp, child.xp_for_level());
    println!("  Streak: {} day(s)", child.streak);
    if let Some(age) = child.age {
        println!("  Age:    {}", age);
    }
    if child.badges.is_empty() {
        println!("  Badges: none yet");
    } else {
        println!("  Badges:");
        for badge in &child.badges {
            println!("    🏆 {}", badge.badge_name);
        }
    }
    println!();
}

/// List characters, merging the service catalog with local presentation
///
/// Falls back to the built-in catalog when the service is unreachable.
pub async fn list_characters(service: &dyn ChatService) -> Result<()> {
    let remote = match service.list_characters().await {
        Ok(remote) => remote,
        Err(e) => {
            tracing::warn!("Could not fetch characters, showing built-in list: {:#}", e);
            Default::default()
        }
    };

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.add_row(row!["".bold(), "ID".bold(), "Name".bold(), "Helps with".bold()]);

    for info in characters::CHARACTERS {
        let (name, role) = match remote.get(info.id) {
            Some(character) => (character.name.clone(), character.role.clone()),
            None => (
                super::terminal_view::display_name(info.id),
                info.description.to_string(),
            ),
        };
        table.add_row(row![info.emoji, info.id.cyan(), name, role]);
    }
    for (id, character) in remote.iter().filter(|(id, _)| characters::find(id).is_none()) {
        table.add_row(row![
            character.emoji.as_deref().unwrap_or(characters::emoji_for(id)),
            id.cyan(),
            character.name,
            character.role
        ]);
    }

    println!("\nCharacters:");
    table.printstd();
    println!();
    Ok(())
}

/// Handle `themes` subcommands
///
/// Setting a theme stores it in the child's preferences even when the
/// service cannot be reached.
pub async fn handle_themes(
    service: &dyn ChatService,
    cache: &SessionCache,
    command: ThemeCommand,
) -> Result<()> {
    match command {
        ThemeCommand::List => {
            let themes = service.list_themes().await?;
            if themes.is_empty() {
                println!("{}", "No themes available.".yellow());
                return Ok(());
            }
            let mut table = Table::new();
            table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
            table.add_row(row!["ID".bold(), "Name".bold(), "Colors".bold()]);
            for (id, theme) in &themes {
                let colors = theme
                    .colors
                    .iter()
                    .map(|(k, v)| format!("{}={}", k, v))
                    .collect::<Vec<_>>()
                    .join(" ");
                table.add_row(row![id.cyan(), theme.name, colors]);
            }
            println!("\nThemes:");
            table.printstd();
            println!();
        }
        ThemeCommand::Set { child, theme } => {
            apply_theme(service, cache, child, &theme).await?;
            println!("{}", format!("Theme set to {} for child {}", theme, child).green());
        }
    }
    Ok(())
}

/// Save a theme preference and tell the service about it
///
/// # Errors
///
/// Returns error if the preference cannot be stored locally
pub async fn apply_theme(
    service: &dyn ChatService,
    cache: &SessionCache,
    child_id: i64,
    theme: &str,
) -> Result<()> {
    let mut preferences = cache.preferences(child_id);
    preferences.theme = Some(theme.to_string());
    cache.set_preferences(child_id, &preferences)?;

    if let Err(e) = service.set_theme(child_id, theme).await {
        tracing::warn!("Failed to set theme on the service: {:#}", e);
    }
    Ok(())
}

/// Show the parent dashboard
pub async fn show_dashboard(service: &dyn ChatService, child_id: i64) -> Result<()> {
    let dashboard = service.parent_dashboard(child_id).await?;
    print_dashboard(&dashboard);
    Ok(())
}

fn print_dashboard(dashboard: &ParentDashboard) {
    let title = if dashboard.child_name.is_empty() {
        "Parent dashboard".to_string()
    } else {
        format!("Parent dashboard: {}", dashboard.child_name)
    };
    println!("\n{}", title.bold());
    println!(
        "  Level {}  |  {} XP  |  {} day streak",
        dashboard.level, dashboard.xp, dashboard.streak
    );
    println!("  Sessions:            {}", dashboard.total_sessions);
    println!("  Conversations:       {}", dashboard.total_conversations);
    println!("  Avg turns / session: {:.1}", dashboard.avg_turns_per_session);
    println!("  Emoji accuracy:      {:.0}%", dashboard.emoji_accuracy);

    if !dashboard.emotion_distribution.is_empty() {
        let mut emotions: Vec<_> = dashboard.emotion_distribution.iter().collect();
        emotions.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));
        println!("\n{}", "Emotions expressed".bold());
        for (emotion, count) in emotions {
            println!("  {:<10} {}", emotion, count);
        }
    }

    if !dashboard.recent_sessions.is_empty() {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
        table.add_row(row![
            "Character".bold(),
            "Turns".bold(),
            "Minutes".bold(),
            "Started".bold()
        ]);
        for session in &dashboard.recent_sessions {
            table.add_row(row![
                session.character,
                session.turn_count,
                session
                    .duration_minutes
                    .map(|m| format!("{:.1}", m))
                    .unwrap_or_else(|| "-".to_string()),
                session.start_time.as_deref().unwrap_or("-")
            ]);
        }
        println!("\n{}", "Recent sessions".bold());
        table.printstd();
    }

    if !dashboard.badges.is_empty() {
        println!("\n{}", "Badges".bold());
        for badge in &dashboard.badges {
            println!("  🏆 {}", badge.badge_name);
        }
    }

    if !dashboard.recommendations.is_empty() {
        println!("\n{}", "Recommendations".bold());
        for recommendation in &dashboard.recommendations {
            println!("  • {}", recommendation);
        }
    }
    println!();
}

/// Check that the service and its language model are reachable
///
/// # Errors
///
/// Returns error if the service cannot be reached
pub async fn check_health(service: &dyn ChatService) -> Result<()> {
    let health = service.health().await?;
    println!("Service:        {}", health.status.green());
    let model = if health.ollama_available {
        "available".green()
    } else {
        "unavailable".red()
    };
    println!("Language model: {}", model);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CacheSettings;
    use crate::storage::LocalStore;
    use crate::test_utils::{test_child, MockService};
    use std::sync::Arc;

    #[test]
    fn test_children_table_has_header_and_rows() {
        let table = children_table(&[test_child()]);
        assert_eq!(table.len(), 2);
    }

    #[tokio::test]
    async fn test_create_rejects_blank_name() {
        let service = MockService::new();
        let result = handle_children(
            &service,
            ChildCommand::Create {
                name: "  ".to_string(),
                avatar: "👦".to_string(),
                age: None,
            },
        )
        .await;
        crate::test_utils::assert_error_contains(result, "cannot be empty");
    }

    #[tokio::test]
    async fn test_list_characters_without_remote_catalog() {
        let service = MockService::new();
        assert!(list_characters(&service).await.is_ok());
    }

    #[tokio::test]
    async fn test_apply_theme_stores_preference() {
        let service = Arc::new(MockService::new());
        let cache = SessionCache::new(
            LocalStore::temporary().unwrap(),
            service.clone(),
            CacheSettings::default(),
        );
        apply_theme(service.as_ref(), &cache, 1, "space").await.unwrap();
        assert_eq!(cache.preferences(1).theme.as_deref(), Some("space"));
    }

    #[tokio::test]
    async fn test_health_and_dashboard() {
        let service = MockService::new();
        assert!(check_health(&service).await.is_ok());
        assert!(show_dashboard(&service, 1).await.is_ok());
    }
}

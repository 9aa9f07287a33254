/*!
Command handlers for the CLI

This module provides the handlers invoked by the CLI entrypoint:

- `chat`       - Interactive chat with a character
- `profiles`   - Children, characters, themes, dashboard and health
- `history`    - Cached conversations, safety alerts and preferences

The chat handler wires the library components together (service client,
session cache, crisis filter, orchestrator) and renders through
`terminal_view`.
*/

use crate::cli::Commands;
use crate::client::{create_client, ChatService, ChildProfile};
use crate::config::Config;
use crate::error::{NarrativeError, Result};
use crate::safety::CrisisFilter;
use crate::session::{CacheSettings, SessionCache};
use crate::storage::LocalStore;
use std::sync::Arc;

// Special commands parser for the chat
pub mod special_commands;

// Terminal implementation of the chat view
pub mod terminal_view;

// Non-chat screens
pub mod profiles;

// Local history, alerts and preferences
pub mod history;

/// Run a non-interactive command
///
/// # Errors
///
/// Returns error if the store cannot be opened or the command fails
pub async fn run_command(config: Config, command: Commands) -> Result<()> {
    match command {
        Commands::Chat {
            child,
            character,
            theme,
            voice,
        } => chat::run_chat(config, child, character, theme, voice).await,
        Commands::Children { command } => {
            let service = create_client(&config.service)?;
            profiles::handle_children(service.as_ref(), command).await
        }
        Commands::Characters => {
            let service = create_client(&config.service)?;
            profiles::list_characters(service.as_ref()).await
        }
        Commands::Themes { command } => {
            let service = create_client(&config.service)?;
            let cache = open_cache(&config, Arc::clone(&service))?;
            profiles::handle_themes(service.as_ref(), &cache, command).await
        }
        Commands::Dashboard { child } => {
            let service = create_client(&config.service)?;
            profiles::show_dashboard(service.as_ref(), child).await
        }
        Commands::Health => {
            let service = create_client(&config.service)?;
            profiles::check_health(service.as_ref()).await
        }
        Commands::History { child } => {
            let service = create_client(&config.service)?;
            let cache = open_cache(&config, service)?;
            history::show_history(&cache, child)
        }
        Commands::Alerts { child } => {
            let store = LocalStore::from_config(&config.storage)?;
            history::show_alerts(&CrisisFilter::new(store), child)
        }
        Commands::Prefs {
            child,
            reduced_motion,
            sound,
        } => {
            let service = create_client(&config.service)?;
            let cache = open_cache(&config, service)?;
            history::handle_prefs(&cache, child, reduced_motion, sound)
        }
    }
}

fn open_cache(config: &Config, service: Arc<dyn ChatService>) -> Result<SessionCache> {
    let store = LocalStore::from_config(&config.storage)?;
    Ok(SessionCache::new(
        store,
        service,
        CacheSettings::from(&config.chat),
    ))
}

/// Profile used when the service cannot provide one
fn offline_profile(child_id: i64) -> ChildProfile {
    ChildProfile {
        id: child_id,
        name: format!("Child {}", child_id),
        avatar: "👦".to_string(),
        level: 1,
        xp: 0,
        streak: 0,
        age: None,
        badges: Vec::new(),
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat handler.
    //!
    //! Input is read by `rustyline` on a dedicated thread and forwarded as
    //! [`UiEvent`]s; the loop multiplexes those with engagement timer events
    //! and hands both to the [`ChatOrchestrator`].

    use super::*;
    use crate::client::EngagementOption;
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::commands::terminal_view::{format_xp_bar, TerminalSpeaker, TerminalView};
    use crate::orchestrator::{AppState, ChatOrchestrator, Collaborators, OrchestratorSettings};
    use crate::view::{NullSpeaker, Speaker};
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use tokio::sync::mpsc;

    /// Input from the terminal
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum UiEvent {
        /// A line was entered
        Line(String),
        /// Ctrl-C
        Interrupted,
        /// Ctrl-D or the terminal went away
        Closed,
    }

    /// What the loop should do after handling a line
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LoopControl {
        Continue,
        Exit,
    }

    /// Start an interactive chat
    ///
    /// # Errors
    ///
    /// Returns error if the store or terminal cannot be opened
    pub async fn run_chat(
        config: Config,
        child_id: i64,
        character: String,
        theme: Option<String>,
        voice: bool,
    ) -> Result<()> {
        tracing::info!("Starting chat for child {} with {}", child_id, character);

        let service = create_client(&config.service)?;
        let cache = Arc::new(open_cache(&config, Arc::clone(&service))?);
        let crisis = CrisisFilter::new(cache.store().clone());

        let child = match service.get_child(child_id).await {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!("Could not load profile {}, continuing offline: {:#}", child_id, e);
                offline_profile(child_id)
            }
        };

        let preferences = cache.preferences(child_id);
        let theme = match theme {
            Some(theme) => {
                profiles::apply_theme(service.as_ref(), &cache, child_id, &theme).await?;
                theme
            }
            None => preferences
                .theme
                .clone()
                .unwrap_or_else(|| config.chat.default_theme.clone()),
        };

        let mut settings = OrchestratorSettings::from(&config.chat);
        settings.voice_output = (settings.voice_output || voice) && preferences.sound;
        let speaker: Arc<dyn Speaker> = if settings.voice_output {
            Arc::new(TerminalSpeaker)
        } else {
            Arc::new(NullSpeaker)
        };

        let (orchestrator, mut engagement_events) = ChatOrchestrator::new(
            Collaborators {
                service,
                cache,
                crisis,
                view: Arc::new(TerminalView::new(preferences.reduced_motion)),
                speaker,
            },
            settings,
            AppState::for_child(&child, theme.clone(), config.chat.default_mode.clone()),
        );

        print_welcome_banner(&child, &theme);
        orchestrator.open_chat(&character).await?;

        let (mut input, ready) = spawn_reader(format!("{} > ", child.avatar))?;

        loop {
            tokio::select! {
                Some(event) = engagement_events.recv() => {
                    orchestrator.handle_engagement_event(event).await?;
                }
                event = input.recv() => {
                    let control = match event {
                        Some(UiEvent::Line(line)) => handle_line(&orchestrator, &line).await?,
                        Some(UiEvent::Interrupted) => {
                            println!("CTRL-C");
                            LoopControl::Exit
                        }
                        Some(UiEvent::Closed) | None => LoopControl::Exit,
                    };
                    if control == LoopControl::Exit {
                        break;
                    }
                    let _ = ready.send(());
                }
            }
        }

        if orchestrator.is_open() {
            orchestrator.end_session().await?;
        }
        println!("Goodbye!");
        Ok(())
    }

    /// Handle one line of chat input
    ///
    /// # Errors
    ///
    /// Returns error if no chat is open
    pub async fn handle_line(orchestrator: &ChatOrchestrator, line: &str) -> Result<LoopControl> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            orchestrator.note_activity();
            return Ok(LoopControl::Continue);
        }

        let command = match parse_special_command(trimmed) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e.to_string().red());
                orchestrator.note_activity();
                return Ok(LoopControl::Continue);
            }
        };

        match command {
            SpecialCommand::None => {
                orchestrator.send_text(trimmed).await?;
            }
            SpecialCommand::Feel(feeling) => {
                orchestrator.select_emotion(feeling).await?;
                println!("Feeling: {}", feeling.label());
            }
            SpecialCommand::Voice(path) => {
                orchestrator.send_recording(&path).await?;
            }
            SpecialCommand::Say(transcript) => {
                orchestrator.send_transcript(&transcript).await?;
            }
            SpecialCommand::Continue => {
                orchestrator
                    .choose_engagement_option(EngagementOption::Continue)
                    .await?;
            }
            SpecialCommand::Shift => {
                orchestrator
                    .choose_engagement_option(EngagementOption::Shift)
                    .await?;
            }
            SpecialCommand::Break => {
                orchestrator
                    .choose_engagement_option(EngagementOption::Break)
                    .await?;
                return Ok(LoopControl::Exit);
            }
            SpecialCommand::Status => print_status(orchestrator),
            SpecialCommand::Help => {
                orchestrator.note_activity();
                print_help();
            }
            SpecialCommand::Exit => {
                orchestrator.end_session().await?;
                return Ok(LoopControl::Exit);
            }
        }
        Ok(LoopControl::Continue)
    }

    /// Read lines on a blocking thread
    ///
    /// The reader waits for a signal on the returned sender before prompting
    /// again, so output of the previous turn is printed first.
    fn spawn_reader(
        prompt: String,
    ) -> Result<(
        mpsc::UnboundedReceiver<UiEvent>,
        std::sync::mpsc::Sender<()>,
    )> {
        let (tx, rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();
        let (init_tx, init_rx) = std::sync::mpsc::channel::<std::result::Result<(), String>>();

        std::thread::spawn(move || {
            let mut rl = match DefaultEditor::new() {
                Ok(rl) => {
                    let _ = init_tx.send(Ok(()));
                    rl
                }
                Err(e) => {
                    let _ = init_tx.send(Err(e.to_string()));
                    return;
                }
            };
            read_lines(&mut rl, &prompt, &tx, &ready_rx);
        });

        match init_rx.recv() {
            Ok(Ok(())) => Ok((rx, ready_tx)),
            Ok(Err(e)) => Err(NarrativeError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("Failed to open terminal: {}", e),
            ))
            .into()),
            Err(_) => Err(NarrativeError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "Terminal reader exited during startup",
            ))
            .into()),
        }
    }

    fn read_lines(
        rl: &mut DefaultEditor,
        prompt: &str,
        tx: &mpsc::UnboundedSender<UiEvent>,
        ready: &std::sync::mpsc::Receiver<()>,
    ) {
        loop {
            let event = match rl.readline(prompt) {
                Ok(line) => {
                    let _ = rl.add_history_entry(line.as_str());
                    UiEvent::Line(line)
                }
                Err(ReadlineError::Interrupted) => UiEvent::Interrupted,
                Err(ReadlineError::Eof) => UiEvent::Closed,
                Err(e) => {
                    tracing::error!("Failed to read input: {}", e);
                    UiEvent::Closed
                }
            };
            let last = !matches!(event, UiEvent::Line(_));
            if tx.send(event).is_err() || last {
                break;
            }
            if ready.recv().is_err() {
                break;
            }
        }
    }

    fn print_welcome_banner(child: &ChildProfile, theme: &str) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                 NeuroNarrative - Let's chat!                 ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Hi {} {}!", child.avatar, child.name.bold());
        println!("Theme: {}", theme.cyan());
        println!("Type '/help' for commands, '/end' to finish\n");
    }

    fn print_status(orchestrator: &ChatOrchestrator) {
        let state = orchestrator.state();
        println!("\n{}", "Session status".bold());
        println!(
            "Character: {}",
            state.character_id.as_deref().unwrap_or("-").cyan()
        );
        println!(
            "Session:   {}",
            state
                .session_id
                .as_ref()
                .map(|id| id.to_string())
                .unwrap_or_else(|| "offline".to_string())
        );
        println!("XP:        {}", format_xp_bar(state.xp, state.xp_for_level()));
        println!(
            "Feeling:   {}",
            state
                .selected_feeling
                .map(|f| f.label())
                .unwrap_or_else(|| "-".to_string())
        );
        println!(
            "Idle timeout: {}s\n",
            orchestrator.timer().timeout().as_secs()
        );
    }

}

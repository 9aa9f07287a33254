use neuronarrative::client::{EngagementPrompts, SessionEndResponse};
use neuronarrative::config::{Config, ServiceConfig};
use neuronarrative::emotion::EmotionTag;
use neuronarrative::session::ChatMessage;
use neuronarrative::storage::LocalStore;
use neuronarrative::view::ChatView;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn create_temp_store() -> (LocalStore, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let store = LocalStore::open(tmp.path().join("store")).expect("failed to open local store");
    (store, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

#[allow(dead_code)]
pub fn service_config(base_url: &str) -> ServiceConfig {
    ServiceConfig {
        base_url: base_url.to_string(),
        timeout_seconds: 5,
        ..Default::default()
    }
}

#[allow(dead_code)]
pub fn config_for(base_url: &str, store: &TempDir) -> Config {
    let mut config = Config::default();
    config.service = service_config(base_url);
    config.storage.path = Some(store.path().join("store"));
    config
}

/// View that remembers what was rendered
#[allow(dead_code)]
#[derive(Default)]
pub struct CapturingView {
    messages: Mutex<Vec<ChatMessage>>,
    emotions: Mutex<Vec<EmotionTag>>,
    xp: Mutex<Vec<(u32, u32)>>,
    badges: Mutex<Vec<String>>,
    greetings: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl CapturingView {
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.lock().unwrap().clone()
    }

    pub fn emotions(&self) -> Vec<EmotionTag> {
        self.emotions.lock().unwrap().clone()
    }

    pub fn xp(&self) -> Vec<(u32, u32)> {
        self.xp.lock().unwrap().clone()
    }

    pub fn badges(&self) -> Vec<String> {
        self.badges.lock().unwrap().clone()
    }

    pub fn greetings(&self) -> Vec<String> {
        self.greetings.lock().unwrap().clone()
    }
}

impl ChatView for CapturingView {
    fn show_greeting(&self, _character_id: &str, text: &str) {
        self.greetings.lock().unwrap().push(text.to_string());
    }

    fn show_message(&self, message: &ChatMessage) {
        self.messages.lock().unwrap().push(message.clone());
    }

    fn show_typing(&self) {}

    fn hide_typing(&self) {}

    fn set_ai_emotion(&self, emotion: EmotionTag) {
        self.emotions.lock().unwrap().push(emotion);
    }

    fn update_xp(&self, xp: u32, _xp_for_level: u32, gained: u32) {
        self.xp.lock().unwrap().push((xp, gained));
    }

    fn show_badges(&self, badges: &[String]) {
        self.badges.lock().unwrap().extend(badges.iter().cloned());
    }

    fn suggest_input(&self, _text: &str) {}

    fn show_engagement_prompt(&self, _prompts: &EngagementPrompts) {}

    fn hide_engagement_prompt(&self) {}

    fn show_session_summary(&self, _summary: &SessionEndResponse) {}

    fn alert(&self, _message: &str) {}
}

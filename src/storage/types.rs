use serde::{Deserialize, Serialize};

/// Display preferences stored per child
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Preferences {
    /// Skip decorative animation (typing dots, emotion transitions)
    #[serde(default)]
    pub reduced_motion: bool,
    /// Play sounds and speak responses
    #[serde(default = "default_sound")]
    pub sound: bool,
    /// Last theme chosen for this child
    #[serde(default)]
    pub theme: Option<String>,
}

fn default_sound() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            reduced_motion: false,
            sound: default_sound(),
            theme: None,
        }
    }
}

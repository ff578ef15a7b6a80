//! Per-session display settings, fixed at startup

use crate::config::DisplayConfig;
use crate::ui::spinner::SpinnerStyle;
use crate::ui::theme::Theme;

/// Immutable presentation settings threaded into every render
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub theme: Theme,
    pub spinner: SpinnerStyle,
    pub show_facts: bool,
}

impl SessionConfig {
    pub fn from_display(display: &DisplayConfig) -> Self {
        Self {
            theme: Theme::from_name(&display.theme),
            spinner: SpinnerStyle::from_name(&display.spinner),
            show_facts: display.show_facts,
        }
    }
}

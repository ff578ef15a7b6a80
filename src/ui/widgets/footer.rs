//! Footer widget with keybindings and flavor text

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::Widget,
};

use crate::core::session::SessionConfig;
use crate::core::state::AppState;

pub struct Footer<'a> {
    state: &'a AppState,
    session: &'a SessionConfig,
}

impl<'a> Footer<'a> {
    pub fn new(state: &'a AppState, session: &'a SessionConfig) -> Self {
        Self { state, session }
    }
}

impl<'a> Widget for Footer<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let styles = &self.session.theme.styles;

        let bindings = if self.state.is_running() {
            vec![("↑/↓", "Navigate"), ("q", "Quit")]
        } else {
            vec![
                ("↑/↓", "Navigate"),
                ("Space", "Select"),
                ("r", "Update"),
                ("l", "Reload"),
                ("q", "Quit"),
            ]
        };

        let mut spans = Vec::new();
        for (i, (key, action)) in bindings.iter().enumerate() {
            if i > 0 {
                spans.push(Span::styled("  ", styles.keybind));
            }
            spans.push(Span::styled(format!("[{}]", key), styles.keybind_key));
            spans.push(Span::styled(format!(" {}", action), styles.keybind));
        }

        let line = Line::from(spans);
        buf.set_line(area.x + 1, area.y, &line, area.width.saturating_sub(2));

        if !self.session.show_facts || area.height < 2 {
            return;
        }
        if let Some(fact) = &self.state.fact {
            let span = Span::styled(format!("Did you know? : {}", fact), styles.help);
            buf.set_span(area.x + 1, area.y + 1, &span, area.width.saturating_sub(2));
        }
    }
}

//! Selection count or batch progress

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::{Line, Span},
    widgets::Widget,
};

use crate::core::session::SessionConfig;
use crate::core::state::AppState;

pub struct StatusLine<'a> {
    state: &'a AppState,
    session: &'a SessionConfig,
}

impl<'a> StatusLine<'a> {
    pub fn new(state: &'a AppState, session: &'a SessionConfig) -> Self {
        Self { state, session }
    }
}

impl<'a> Widget for StatusLine<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let styles = &self.session.theme.styles;

        let spans = if self.state.is_running() {
            let frame = self.session.spinner.frame(self.state.spinner_frame);
            let mut spans = vec![
                Span::styled("Processing: ", styles.text),
                Span::styled(frame, styles.spinner),
            ];
            if let Some(progress) = &self.state.progress {
                spans.push(Span::styled(
                    format!("  {} {}", progress.name, progress.stage),
                    styles.help,
                ));
            }
            spans
        } else if !self.state.selected.is_empty() {
            vec![Span::styled(
                format!(
                    "{} containers selected, press r to update",
                    self.state.selected.len()
                ),
                styles.text,
            )]
        } else {
            return;
        };

        buf.set_line(area.x + 1, area.y, &Line::from(spans), area.width.saturating_sub(2));
    }
}

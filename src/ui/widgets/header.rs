//! Header widget

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Widget,
};

use crate::core::session::SessionConfig;
use crate::core::state::AppState;

pub struct Header<'a> {
    state: &'a AppState,
    session: &'a SessionConfig,
}

impl<'a> Header<'a> {
    pub fn new(state: &'a AppState, session: &'a SessionConfig) -> Self {
        Self { state, session }
    }
}

impl<'a> Widget for Header<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let theme = &self.session.theme;
        if area.height < 2 {
            return;
        }

        let title = Line::from(vec![
            Span::styled(" Tusk", theme.styles.title),
            Span::styled(
                format!("  🐳 {} running", self.state.inventory.len()),
                Style::default().fg(theme.colors.fg_muted),
            ),
        ]);
        buf.set_line(area.x, area.y + 1, &title, area.width);

        if area.height > 2 {
            let subtitle = Span::styled(" container updates done quick ⚡", theme.styles.subtitle);
            buf.set_span(area.x, area.y + 2, &subtitle, area.width);
        }

        // Time on the right of the title row
        let time = chrono::Local::now().format("%H:%M").to_string();
        let time_span = Span::styled(&time, Style::default().fg(theme.colors.fg_muted));
        let time_x = area.x + area.width.saturating_sub(time.len() as u16 + 1);
        buf.set_span(time_x, area.y + 1, &time_span, time.len() as u16);
    }
}

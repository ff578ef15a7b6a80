//! Outcome of the last batch, one row per container in selection order

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

use crate::core::session::SessionConfig;
use crate::core::state::AppState;
use crate::update::UpdateOutcome;

pub struct ReportPanel<'a> {
    state: &'a AppState,
    session: &'a SessionConfig,
}

impl<'a> ReportPanel<'a> {
    pub fn new(state: &'a AppState, session: &'a SessionConfig) -> Self {
        Self { state, session }
    }
}

impl<'a> Widget for ReportPanel<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(report) = &self.state.last_report else {
            return;
        };
        let theme = &self.session.theme;

        let title = format!(
            " LAST UPDATE · {} · {}ms ",
            report.summary(),
            report.duration_ms()
        );
        let block = Block::default()
            .title(Span::styled(title, theme.styles.panel_title))
            .borders(Borders::ALL)
            .border_style(theme.styles.panel_border)
            .style(Style::default().bg(theme.colors.bg_primary));

        let inner = block.inner(area);
        block.render(area, buf);

        for (i, entry) in report.entries.iter().take(inner.height as usize).enumerate() {
            let (icon, style) = match &entry.outcome {
                UpdateOutcome::Updated { .. } => ("✓", theme.styles.outcome_updated),
                UpdateOutcome::Failed(e) if e.left_stopped() => ("⚠", theme.styles.notification_warning),
                UpdateOutcome::Failed(_) => ("✗", theme.styles.outcome_failed),
            };
            let line = Line::from(vec![
                Span::styled(format!(" {} ", icon), style),
                Span::styled(entry.describe(), theme.styles.text),
            ]);
            buf.set_line(inner.x, inner.y + i as u16, &line, inner.width);
        }
    }
}

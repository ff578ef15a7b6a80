//! Inventory table with selection marks

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Rect},
    style::Style,
    text::Span,
    widgets::{Block, Borders, Cell, Row, StatefulWidget, Table, TableState, Widget},
};

use crate::core::session::SessionConfig;
use crate::core::state::AppState;

pub struct ContainerTable<'a> {
    state: &'a AppState,
    session: &'a SessionConfig,
}

impl<'a> ContainerTable<'a> {
    pub fn new(state: &'a AppState, session: &'a SessionConfig) -> Self {
        Self { state, session }
    }

    fn rows(&self) -> Vec<Row<'a>> {
        let theme = &self.session.theme;
        self.state
            .inventory
            .iter()
            .enumerate()
            .map(|(i, container)| {
                let marked = self.state.selected.contains(&i);
                let mark = if marked { "x" } else { "" };
                Row::new(vec![
                    Cell::from(mark).style(theme.styles.row_marked),
                    Cell::from(container.display_name().to_string()),
                    Cell::from(container.image.clone()),
                    Cell::from(container.ports_label()),
                ])
                .style(theme.styles.row)
            })
            .collect()
    }
}

impl<'a> Widget for ContainerTable<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let theme = &self.session.theme;

        let block = Block::default()
            .title(Span::styled(" CONTAINERS ", theme.styles.panel_title))
            .borders(Borders::ALL)
            .border_style(theme.styles.panel_border)
            .style(Style::default().bg(theme.colors.bg_primary));

        if self.state.inventory.is_empty() {
            let inner = block.inner(area);
            block.render(area, buf);
            if inner.height == 0 {
                return;
            }

            let (msg, style) = match &self.state.fetch_error {
                Some(error) => (error.as_str(), theme.styles.outcome_failed),
                None => ("No running containers", theme.styles.help),
            };
            let span = Span::styled(msg, style);
            buf.set_span(inner.x + 1, inner.y, &span, inner.width.saturating_sub(2));
            return;
        }

        let widths = [
            Constraint::Length(2),
            Constraint::Percentage(20),
            Constraint::Percentage(35),
            Constraint::Min(20),
        ];
        let header = Row::new(vec!["", "Name", "Image", "Ports"]).style(theme.styles.table_header);

        let table = Table::new(self.rows(), widths)
            .header(header)
            .block(block)
            .highlight_style(theme.styles.row_cursor);

        let mut table_state = TableState::default().with_selected(Some(self.state.cursor));
        StatefulWidget::render(table, area, buf, &mut table_state);
    }
}

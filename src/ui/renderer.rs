//! Main UI renderer

use ratatui::{
    layout::{Alignment, Rect},
    style::Style,
    text::Span,
    widgets::{Block, Paragraph, Wrap},
    Frame,
};

use crate::core::session::SessionConfig;
use crate::core::state::{AppState, NotificationLevel};
use crate::ui::layout::{LayoutManager, MIN_HEIGHT, MIN_WIDTH};
use crate::ui::widgets::*;

pub struct Renderer;

impl Renderer {
    pub fn render(frame: &mut Frame, state: &AppState, session: &SessionConfig) {
        let area = frame.area();
        let theme = &session.theme;

        // Clear background
        frame.render_widget(
            Block::default().style(Style::default().bg(theme.colors.bg_primary)),
            area,
        );

        if !LayoutManager::fits(area) {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!("Terminal too small, need {}x{}", MIN_WIDTH, MIN_HEIGHT),
                    theme.styles.help,
                ))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
                area,
            );
            return;
        }

        let layout = LayoutManager::compute(area, state);

        frame.render_widget(Header::new(state, session), layout.header);
        frame.render_widget(ContainerTable::new(state, session), layout.table);
        frame.render_widget(StatusLine::new(state, session), layout.status);
        if let Some(report_area) = layout.report {
            frame.render_widget(ReportPanel::new(state, session), report_area);
        }
        frame.render_widget(Footer::new(state, session), layout.footer);

        Self::render_notifications(frame, state, session);
    }

    fn render_notifications(frame: &mut Frame, state: &AppState, session: &SessionConfig) {
        let theme = &session.theme;
        let area = frame.area();

        // Show notifications in top-right corner
        let mut y = 1;
        for notification in state.notifications.iter().rev().take(3) {
            if y >= area.height {
                break;
            }

            let (icon, style) = match notification.level {
                NotificationLevel::Info => ("ℹ", theme.styles.notification_info),
                NotificationLevel::Success => ("✓", theme.styles.notification_success),
                NotificationLevel::Warning => ("⚠", theme.styles.notification_warning),
                NotificationLevel::Error => ("✗", theme.styles.notification_error),
            };

            let msg = format!(" {} {} ", icon, notification.message);
            let width = (msg.chars().count() as u16).min(area.width.saturating_sub(2)).min(60);
            let x = area.width.saturating_sub(width + 2);

            let notification_area = Rect {
                x,
                y,
                width,
                height: 1,
            };

            frame.render_widget(
                Paragraph::new(Span::styled(msg, style))
                    .style(Style::default().bg(theme.colors.bg_tertiary)),
                notification_area,
            );

            y += 2;
        }
    }
}

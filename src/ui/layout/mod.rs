//! Layout management system

use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::core::state::AppState;

/// Most report rows shown before the panel stops growing
const MAX_REPORT_ROWS: u16 = 8;

/// Header, smallest table, status line and footer
pub const MIN_HEIGHT: u16 = 3 + 5 + 1 + 2;
pub const MIN_WIDTH: u16 = 40;

/// Computed layout rects for all panels
#[derive(Debug, Clone, Default)]
pub struct ComputedLayout {
    pub header: Rect,
    pub table: Rect,
    pub status: Rect,
    pub report: Option<Rect>,
    pub footer: Rect,
}

pub struct LayoutManager;

impl LayoutManager {
    pub fn fits(area: Rect) -> bool {
        area.width >= MIN_WIDTH && area.height >= MIN_HEIGHT
    }

    /// Compute all panel rects based on terminal size and state
    pub fn compute(area: Rect, state: &AppState) -> ComputedLayout {
        // the report panel only takes rows the fixed panels do not need
        let spare = area.height.saturating_sub(MIN_HEIGHT);
        let report_height = state
            .last_report
            .as_ref()
            .map(|r| ((r.entries.len() as u16).min(MAX_REPORT_ROWS) + 2).min(spare))
            .filter(|&h| h >= 2)
            .unwrap_or(0);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),             // Title + subtitle
                Constraint::Min(5),                // Inventory table
                Constraint::Length(1),             // Status line
                Constraint::Length(report_height), // Last batch
                Constraint::Length(2),             // Keys + fact
            ])
            .split(area);

        ComputedLayout {
            header: chunks[0],
            table: chunks[1],
            status: chunks[2],
            report: (report_height > 0).then_some(chunks[3]),
            footer: chunks[4],
        }
    }
}

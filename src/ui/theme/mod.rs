//! Color themes

use ratatui::style::{Color, Modifier, Style};

/// Complete theme definition
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    pub colors: ThemeColors,
    pub styles: ThemeStyles,
}

#[derive(Debug, Clone)]
pub struct ThemeColors {
    pub bg_primary: Color,
    pub bg_secondary: Color,
    pub bg_tertiary: Color,

    pub fg_primary: Color,
    pub fg_muted: Color,

    pub accent_primary: Color,
    pub accent_secondary: Color,

    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,

    pub border: Color,
    pub selection: Color,
}

#[derive(Debug, Clone)]
pub struct ThemeStyles {
    pub title: Style,
    pub subtitle: Style,
    pub text: Style,
    pub help: Style,
    pub spinner: Style,
    pub panel_title: Style,
    pub panel_border: Style,
    pub table_header: Style,
    pub row: Style,
    pub row_cursor: Style,
    pub row_marked: Style,
    pub keybind: Style,
    pub keybind_key: Style,
    pub outcome_updated: Style,
    pub outcome_failed: Style,
    pub notification_info: Style,
    pub notification_success: Style,
    pub notification_warning: Style,
    pub notification_error: Style,
}

impl Theme {
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "classic" => Self::classic(),
            "gruvbox" => Self::gruvbox(),
            "nord" => Self::nord(),
            _ => Self::tokyo_night(), // Default
        }
    }

    /// Tokyo Night theme (default)
    pub fn tokyo_night() -> Self {
        let colors = ThemeColors {
            bg_primary: Color::Rgb(26, 27, 38),
            bg_secondary: Color::Rgb(36, 40, 59),
            bg_tertiary: Color::Rgb(41, 46, 66),

            fg_primary: Color::Rgb(192, 202, 245),
            fg_muted: Color::Rgb(86, 95, 137),

            accent_primary: Color::Rgb(122, 162, 247),
            accent_secondary: Color::Rgb(187, 154, 247),

            success: Color::Rgb(158, 206, 106),
            warning: Color::Rgb(224, 175, 104),
            error: Color::Rgb(247, 118, 142),
            info: Color::Rgb(125, 207, 255),

            border: Color::Rgb(59, 66, 97),
            selection: Color::Rgb(52, 59, 88),
        };

        Self::from_colors("Tokyo Night", colors)
    }

    /// 256-color palette for terminals without true color
    pub fn classic() -> Self {
        let colors = ThemeColors {
            bg_primary: Color::Reset,
            bg_secondary: Color::Reset,
            bg_tertiary: Color::Indexed(236),

            fg_primary: Color::Indexed(252),
            fg_muted: Color::Indexed(241),

            accent_primary: Color::Indexed(69),
            accent_secondary: Color::Indexed(229),

            success: Color::Indexed(114),
            warning: Color::Indexed(214),
            error: Color::Indexed(203),
            info: Color::Indexed(117),

            border: Color::Indexed(240),
            selection: Color::Indexed(57),
        };

        Self::from_colors("Classic", colors)
    }

    /// Gruvbox theme
    pub fn gruvbox() -> Self {
        let colors = ThemeColors {
            bg_primary: Color::Rgb(40, 40, 40),
            bg_secondary: Color::Rgb(60, 56, 54),
            bg_tertiary: Color::Rgb(80, 73, 69),

            fg_primary: Color::Rgb(235, 219, 178),
            fg_muted: Color::Rgb(168, 153, 132),

            accent_primary: Color::Rgb(131, 165, 152),
            accent_secondary: Color::Rgb(211, 134, 155),

            success: Color::Rgb(184, 187, 38),
            warning: Color::Rgb(250, 189, 47),
            error: Color::Rgb(251, 73, 52),
            info: Color::Rgb(131, 165, 152),

            border: Color::Rgb(80, 73, 69),
            selection: Color::Rgb(102, 92, 84),
        };

        Self::from_colors("Gruvbox", colors)
    }

    /// Nord theme
    pub fn nord() -> Self {
        let colors = ThemeColors {
            bg_primary: Color::Rgb(46, 52, 64),
            bg_secondary: Color::Rgb(59, 66, 82),
            bg_tertiary: Color::Rgb(67, 76, 94),

            fg_primary: Color::Rgb(236, 239, 244),
            fg_muted: Color::Rgb(216, 222, 233),

            accent_primary: Color::Rgb(136, 192, 208),
            accent_secondary: Color::Rgb(129, 161, 193),

            success: Color::Rgb(163, 190, 140),
            warning: Color::Rgb(235, 203, 139),
            error: Color::Rgb(191, 97, 106),
            info: Color::Rgb(136, 192, 208),

            border: Color::Rgb(67, 76, 94),
            selection: Color::Rgb(76, 86, 106),
        };

        Self::from_colors("Nord", colors)
    }

    fn from_colors(name: &str, colors: ThemeColors) -> Self {
        let styles = ThemeStyles {
            title: Style::default()
                .fg(colors.fg_primary)
                .add_modifier(Modifier::BOLD),
            subtitle: Style::default()
                .fg(colors.fg_primary)
                .add_modifier(Modifier::ITALIC),
            text: Style::default().fg(colors.fg_primary),
            help: Style::default().fg(colors.fg_muted),
            spinner: Style::default().fg(colors.accent_primary),
            panel_title: Style::default()
                .fg(colors.accent_primary)
                .add_modifier(Modifier::BOLD),
            panel_border: Style::default().fg(colors.border),
            table_header: Style::default()
                .fg(colors.fg_muted)
                .add_modifier(Modifier::BOLD),
            row: Style::default().fg(colors.fg_primary),
            row_cursor: Style::default()
                .fg(colors.accent_secondary)
                .bg(colors.selection),
            row_marked: Style::default()
                .fg(colors.success)
                .add_modifier(Modifier::BOLD),
            keybind: Style::default().fg(colors.fg_muted),
            keybind_key: Style::default()
                .fg(colors.accent_secondary)
                .add_modifier(Modifier::BOLD),
            outcome_updated: Style::default().fg(colors.success),
            outcome_failed: Style::default().fg(colors.error),
            notification_info: Style::default().fg(colors.info),
            notification_success: Style::default().fg(colors.success),
            notification_warning: Style::default().fg(colors.warning),
            notification_error: Style::default().fg(colors.error),
        };

        Self {
            name: name.to_string(),
            colors,
            styles,
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::tokyo_night()
    }
}

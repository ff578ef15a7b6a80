//! Progress spinner frames

/// Spinner animations selectable from the display config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpinnerStyle {
    Line,
    Dot,
    #[default]
    MiniDot,
    Jump,
    Pulse,
    Points,
    Globe,
    Moon,
    Monkey,
}

impl SpinnerStyle {
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "line" => Self::Line,
            "dot" => Self::Dot,
            "jump" => Self::Jump,
            "pulse" => Self::Pulse,
            "points" => Self::Points,
            "globe" => Self::Globe,
            "moon" => Self::Moon,
            "monkey" => Self::Monkey,
            _ => Self::MiniDot,
        }
    }

    pub fn frames(self) -> &'static [&'static str] {
        match self {
            Self::Line => &["|", "/", "-", "\\"],
            Self::Dot => &["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"],
            Self::MiniDot => &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"],
            Self::Jump => &["⢄", "⢂", "⢁", "⡁", "⡈", "⡐", "⡠"],
            Self::Pulse => &["█", "▓", "▒", "░"],
            Self::Points => &["∙∙∙", "●∙∙", "∙●∙", "∙∙●"],
            Self::Globe => &["🌍", "🌎", "🌏"],
            Self::Moon => &["🌑", "🌒", "🌓", "🌔", "🌕", "🌖", "🌗", "🌘"],
            Self::Monkey => &["🙈", "🙉", "🙊"],
        }
    }

    pub fn frame(self, tick: usize) -> &'static str {
        let frames = self.frames();
        frames[tick % frames.len()]
    }
}

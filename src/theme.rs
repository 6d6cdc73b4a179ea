//! Dashboard palette
//! Built-in colors, optionally overridden by hex strings from the config file

use ratatui::style::Color;

use crate::config::ThemeOverrides;

/// Theme colors for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,       // Active borders, selected nav item
    pub positive: Color,     // Gains, completed, connected
    pub negative: Color,     // Losses, failed, errors
    pub pending: Color,      // Pending transactions, paused strategies, warnings
    pub info: Color,         // Next execution, informational toasts
    pub text: Color,         // Primary text
    pub text_dim: Color,     // Secondary labels
    pub bg_selected: Color,  // Selection background
    pub inactive: Color,     // Inactive borders
    pub header: Color,       // Table headers and section titles
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Rgb(137, 180, 250),
            positive: Color::Rgb(166, 218, 149),
            negative: Color::Rgb(243, 139, 168),
            pending: Color::Rgb(249, 226, 175),
            info: Color::Rgb(116, 199, 236),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            bg_selected: Color::Rgb(69, 71, 90),
            inactive: Color::Rgb(88, 91, 112),
            header: Color::Rgb(203, 166, 247),
        }
    }
}

impl Theme {
    /// Default palette with any valid overrides applied
    pub fn from_overrides(overrides: &ThemeOverrides) -> Self {
        let mut theme = Self::default();
        let apply = |slot: &mut Color, value: &Option<String>| {
            if let Some(raw) = value {
                match Self::parse_hex_color(raw) {
                    Some(color) => *slot = color,
                    None => tracing::warn!("Ignoring invalid theme color {:?}", raw),
                }
            }
        };

        apply(&mut theme.accent, &overrides.accent);
        apply(&mut theme.positive, &overrides.positive);
        apply(&mut theme.negative, &overrides.negative);
        apply(&mut theme.pending, &overrides.pending);
        apply(&mut theme.text, &overrides.text);
        apply(&mut theme.text_dim, &overrides.text_dim);
        theme
    }

    /// Color for a change string such as "+5.2%" or "-1.3%"
    pub fn change_color(&self, change: &str) -> Color {
        if change.trim_start().starts_with('-') {
            self.negative
        } else {
            self.positive
        }
    }

    /// Parse a hex color string (#RRGGBB or #RGB)
    pub fn parse_hex_color(s: &str) -> Option<Color> {
        let s = s.trim().trim_start_matches('#');

        if !s.is_ascii() {
            return None;
        }

        if s.len() == 6 {
            let r = u8::from_str_radix(&s[0..2], 16).ok()?;
            let g = u8::from_str_radix(&s[2..4], 16).ok()?;
            let b = u8::from_str_radix(&s[4..6], 16).ok()?;
            Some(Color::Rgb(r, g, b))
        } else if s.len() == 3 {
            let r = u8::from_str_radix(&s[0..1], 16).ok()? * 17;
            let g = u8::from_str_radix(&s[1..2], 16).ok()? * 17;
            let b = u8::from_str_radix(&s[2..3], 16).ok()? * 17;
            Some(Color::Rgb(r, g, b))
        } else {
            None
        }
    }
}

//! Fixed terminal palette, loosely after the sky/blue look of the web
//! dashboard this client replaces. No theme files are read.

use ratatui::style::Color;

/// Theme colors for the UI
#[derive(Debug, Clone)]
pub struct Theme {
    pub accent: Color,        // Active borders, highlights
    pub accent_bright: Color, // Selected model, result species
    pub danger: Color,        // Fallback notices
    pub success: Color,       // Confidence gauge
    pub text: Color,          // Primary text
    pub text_dim: Color,      // Labels, hints
    pub bg_selected: Color,   // Focused field background
    pub inactive: Color,      // Inactive borders
    pub header: Color,        // Title text
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: Color::Rgb(14, 165, 233),
            accent_bright: Color::Rgb(125, 211, 252),
            danger: Color::Rgb(243, 139, 168),
            success: Color::Rgb(166, 218, 149),
            text: Color::Rgb(205, 214, 244),
            text_dim: Color::Rgb(147, 153, 178),
            bg_selected: Color::Rgb(49, 65, 94),
            inactive: Color::Rgb(88, 91, 112),
            header: Color::Rgb(56, 189, 248),
        }
    }
}

//! Terminal styling helpers.
//!
//! Text output uses a handful of ANSI colors when the terminal allows it and
//! plain text otherwise.

/// ANSI escape codes used by the text renderers.
pub mod colors {
    /// Reset all styling.
    pub const RESET: &str = "\x1b[0m";
    /// Bold white for headings and totals.
    pub const WHITE_BOLD: &str = "\x1b[1;97m";
    /// Gray for coordinates and secondary details.
    pub const GRAY: &str = "\x1b[90m";
    /// Cyan for category headings.
    pub const CYAN: &str = "\x1b[36m";
    /// Green for reachable legs.
    pub const GREEN: &str = "\x1b[32m";
    /// Red for unreachable legs.
    pub const RED: &str = "\x1b[31m";
}

/// Resolved color codes, either ANSI sequences or empty strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorPalette {
    pub reset: &'static str,
    pub white_bold: &'static str,
    pub gray: &'static str,
    pub cyan: &'static str,
    pub green: &'static str,
    pub red: &'static str,
}

impl ColorPalette {
    #[must_use]
    pub const fn colored() -> Self {
        Self {
            reset: colors::RESET,
            white_bold: colors::WHITE_BOLD,
            gray: colors::GRAY,
            cyan: colors::CYAN,
            green: colors::GREEN,
            red: colors::RED,
        }
    }

    #[must_use]
    pub const fn plain() -> Self {
        Self {
            reset: "",
            white_bold: "",
            gray: "",
            cyan: "",
            green: "",
            red: "",
        }
    }

    /// `colored()` when [`supports_color`] allows it, otherwise `plain()`.
    #[must_use]
    pub fn detect() -> Self {
        if supports_color() {
            Self::colored()
        } else {
            Self::plain()
        }
    }
}

impl Default for ColorPalette {
    fn default() -> Self {
        Self::detect()
    }
}

/// Whether ANSI colors should be written.
///
/// Respects `NO_COLOR` (https://no-color.org/) and `TERM=dumb`.
#[must_use]
pub fn supports_color() -> bool {
    color_allowed(
        std::env::var_os("NO_COLOR").is_some(),
        std::env::var("TERM").ok().as_deref(),
    )
}

fn color_allowed(no_color: bool, term: Option<&str>) -> bool {
    !no_color && !term.is_some_and(|t| t.eq_ignore_ascii_case("dumb"))
}

/// Render a count with comma-separated digit groups, e.g. `12,480`.
///
/// ```
/// # use tourroute_cli::terminal::group_digits;
/// assert_eq!(group_digits(640), "640");
/// assert_eq!(group_digits(2_500_000), "2,500,000");
/// ```
#[must_use]
pub fn group_digits(count: usize) -> String {
    let digits = count.to_string();
    let head = match digits.len() % 3 {
        0 => 3,
        rem => rem,
    };
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    grouped.push_str(&digits[..head]);
    for chunk in digits.as_bytes()[head..].chunks(3) {
        grouped.push(',');
        grouped.extend(chunk.iter().map(|&b| char::from(b)));
    }
    grouped
}

/// Human-readable distance: meters below one kilometer, kilometers above.
#[must_use]
pub fn format_distance(meters: f64) -> String {
    if !meters.is_finite() {
        return "unreachable".to_string();
    }
    if meters < 1000.0 {
        format!("{meters:.0} m")
    } else {
        format!("{:.2} km", meters / 1000.0)
    }
}

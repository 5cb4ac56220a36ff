//! Output formatters for the Jigsaw CLI
//!
//! - **Human**: colored, readable output for terminal use
//! - **JSON**: one JSON object per command for scripting and jq

use serde::Serialize;
use std::io::{self, Write};

use chrono::{DateTime, Utc};

use crate::entitlements::{PlayDecision, PremiumFeatures, PremiumStatus, UNLIMITED};
use crate::tracker::{CategoryAccess, EntitlementSummary};

/// Available output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Human => write!(f, "human"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// Trait for output formatters
pub trait OutputFormatter: Send + Sync {
    fn format_status(&self, status: &EntitlementSummary, writer: &mut dyn Write)
        -> io::Result<()>;

    fn format_decision(&self, decision: &PlayDecision, writer: &mut dyn Write) -> io::Result<()>;

    fn format_remaining(&self, remaining: i64, writer: &mut dyn Write) -> io::Result<()>;

    fn format_category(
        &self,
        category_id: &str,
        unlocked: bool,
        writer: &mut dyn Write,
    ) -> io::Result<()>;

    fn format_categories(
        &self,
        categories: &[CategoryAccess],
        writer: &mut dyn Write,
    ) -> io::Result<()>;

    fn format_features(&self, features: &PremiumFeatures, writer: &mut dyn Write)
        -> io::Result<()>;

    fn format_activation(&self, expires_at: DateTime<Utc>, writer: &mut dyn Write)
        -> io::Result<()>;

    fn format_message(&self, message: &str, writer: &mut dyn Write) -> io::Result<()>;

    fn format_error(&self, error: &str, writer: &mut dyn Write) -> io::Result<()>;
}

// =============================================================================
// Human Formatter
// =============================================================================

pub struct HumanFormatter {
    use_color: bool,
}

impl HumanFormatter {
    pub fn new(use_color: bool) -> Self {
        Self { use_color }
    }

    fn colorize(&self, text: &str, color_code: &str) -> String {
        if self.use_color {
            format!("\x1b[{}m{}\x1b[0m", color_code, text)
        } else {
            text.to_string()
        }
    }

    fn remaining_text(&self, remaining: i64) -> String {
        if remaining == UNLIMITED {
            return self.colorize("unlimited", "32");
        }
        let color = match remaining {
            0 => "31",
            1 | 2 => "33",
            _ => "32",
        };
        self.colorize(&remaining.to_string(), color)
    }

    fn check(&self, on: bool) -> String {
        if on {
            self.colorize("yes", "32")
        } else {
            self.colorize("no", "90")
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_status(
        &self,
        status: &EntitlementSummary,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        let plan = match status.premium {
            PremiumStatus::Active { expires_at } => self.colorize(
                &format!("Premium (until {})", expires_at.format("%Y-%m-%d %H:%M UTC")),
                "1;33",
            ),
            PremiumStatus::Expired { expired_at } => format!(
                "Free {}",
                self.colorize(
                    &format!("(premium expired {})", expired_at.format("%Y-%m-%d")),
                    "90"
                )
            ),
            PremiumStatus::Inactive => "Free".to_string(),
        };
        writeln!(writer, "{} {}", self.colorize("Plan:", "1"), plan)?;
        if !status.premium.is_enabled() {
            writeln!(
                writer,
                "{} {}/{}",
                self.colorize("Played today:", "1"),
                status.record.daily_puzzles_used,
                status.daily_limit
            )?;
        }
        writeln!(
            writer,
            "{} {}",
            self.colorize("Remaining:", "1"),
            self.remaining_text(status.remaining_puzzles)
        )?;
        writeln!(
            writer,
            "{} {}",
            self.colorize("Day:", "1"),
            status.record.last_reset_date
        )
    }

    fn format_decision(&self, decision: &PlayDecision, writer: &mut dyn Write) -> io::Result<()> {
        if decision.allowed {
            writeln!(writer, "{}", self.colorize("Ready to play.", "32"))
        } else {
            writeln!(
                writer,
                "{}",
                self.colorize(decision.reason.as_deref().unwrap_or("Not allowed."), "33")
            )
        }
    }

    fn format_remaining(&self, remaining: i64, writer: &mut dyn Write) -> io::Result<()> {
        writeln!(
            writer,
            "Puzzles remaining today: {}",
            self.remaining_text(remaining)
        )
    }

    fn format_category(
        &self,
        category_id: &str,
        unlocked: bool,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        if unlocked {
            writeln!(writer, "{} is {}", category_id, self.colorize("unlocked", "32"))
        } else {
            writeln!(
                writer,
                "{} is {} {}",
                category_id,
                self.colorize("locked", "31"),
                self.colorize("(upgrade to Premium to unlock all categories)", "90")
            )
        }
    }

    fn format_categories(
        &self,
        categories: &[CategoryAccess],
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        for access in categories {
            let state = if access.unlocked {
                self.colorize("open", "32")
            } else {
                self.colorize("premium", "33")
            };
            writeln!(
                writer,
                "{} {:<10} {:<10} {}",
                access.category.icon, access.category.id, access.category.name, state
            )?;
        }
        Ok(())
    }

    fn format_features(
        &self,
        features: &PremiumFeatures,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        let rows = [
            ("Unlimited puzzles", features.unlimited_puzzles),
            ("All categories", features.all_categories),
            ("No ads", features.no_ads),
            ("Custom puzzles", features.custom_puzzles),
            ("Offline mode", features.offline_mode),
        ];
        for (label, on) in rows {
            writeln!(writer, "{:<18} {}", label, self.check(on))?;
        }
        Ok(())
    }

    fn format_activation(
        &self,
        expires_at: DateTime<Utc>,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        writeln!(
            writer,
            "{} Active until {}",
            self.colorize("Premium activated!", "1;32"),
            expires_at.format("%Y-%m-%d %H:%M UTC")
        )
    }

    fn format_message(&self, message: &str, writer: &mut dyn Write) -> io::Result<()> {
        writeln!(writer, "{}", message)
    }

    fn format_error(&self, error: &str, writer: &mut dyn Write) -> io::Result<()> {
        writeln!(writer, "{}: {}", self.colorize("Error", "1;31"), error)
    }
}

// =============================================================================
// JSON Formatter
// =============================================================================

#[derive(Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }

    fn emit<T: Serialize>(&self, value: &T, writer: &mut dyn Write) -> io::Result<()> {
        let json = serde_json::to_string(value)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{}", json)
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_status(
        &self,
        status: &EntitlementSummary,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        self.emit(status, writer)
    }

    fn format_decision(&self, decision: &PlayDecision, writer: &mut dyn Write) -> io::Result<()> {
        self.emit(decision, writer)
    }

    fn format_remaining(&self, remaining: i64, writer: &mut dyn Write) -> io::Result<()> {
        self.emit(
            &serde_json::json!({
                "remaining": remaining,
                "unlimited": remaining == UNLIMITED,
            }),
            writer,
        )
    }

    fn format_category(
        &self,
        category_id: &str,
        unlocked: bool,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        self.emit(
            &serde_json::json!({ "category": category_id, "unlocked": unlocked }),
            writer,
        )
    }

    fn format_categories(
        &self,
        categories: &[CategoryAccess],
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        self.emit(&categories, writer)
    }

    fn format_features(
        &self,
        features: &PremiumFeatures,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        self.emit(features, writer)
    }

    fn format_activation(
        &self,
        expires_at: DateTime<Utc>,
        writer: &mut dyn Write,
    ) -> io::Result<()> {
        self.emit(
            &serde_json::json!({ "premium": true, "premiumExpiry": expires_at }),
            writer,
        )
    }

    fn format_message(&self, message: &str, writer: &mut dyn Write) -> io::Result<()> {
        self.emit(&serde_json::json!({ "message": message }), writer)
    }

    fn format_error(&self, error: &str, writer: &mut dyn Write) -> io::Result<()> {
        self.emit(&serde_json::json!({ "error": error }), writer)
    }
}

/// Create a formatter for the given format
pub fn create_formatter(format: OutputFormat, use_color: bool) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Human => Box::new(HumanFormatter::new(use_color)),
        OutputFormat::Json => Box::new(JsonFormatter::new()),
    }
}

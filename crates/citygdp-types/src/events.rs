use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::{Account, Feedback, InsightsSummary, ReportView};

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// First frame on every connection; the session starts anonymous.
    Hello { authenticated: bool },

    /// Signup succeeded. The session is NOT logged in by this.
    Registered { account: Account },

    LoggedIn { account: Account },

    LoggedOut,

    Profile { account: Account },

    Report { view: ReportView },

    Insights { insights: InsightsSummary },

    FeedbackAccepted { id: i64 },

    FeedbackList { entries: Vec<Feedback> },

    ChatReply { reply: String, history: Vec<String> },

    /// Any rejected command. `code` is stable, `message` is for display.
    Error { code: String, message: String },
}

impl GatewayEvent {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    Register {
        username: String,
        email: String,
        password: String,
    },

    Login { email: String, password: String },

    Logout,

    /// Current account of this connection
    Profile,

    /// Select a dashboard view; unknown or missing falls back to the homepage
    Report {
        #[serde(default)]
        view: Option<String>,
    },

    /// Filtered insights; omitted filters take the dashboard defaults
    Insights {
        #[serde(default = "default_insight_cities")]
        cities: Vec<String>,
        #[serde(default = "default_year_from")]
        year_from: u16,
        #[serde(default = "default_year_to")]
        year_to: u16,
        #[serde(default = "default_insight_sectors")]
        sectors: Vec<String>,
    },

    SubmitFeedback {
        rating: u8,
        feedback: String,
        #[serde(default)]
        contact_email: Option<String>,
    },

    /// The session user's own recent feedback
    ListFeedback {
        #[serde(default = "default_feedback_limit")]
        limit: u32,
    },

    Chat { query: String },
}

impl GatewayCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Register { .. } => "Register",
            Self::Login { .. } => "Login",
            Self::Logout => "Logout",
            Self::Profile => "Profile",
            Self::Report { .. } => "Report",
            Self::Insights { .. } => "Insights",
            Self::SubmitFeedback { .. } => "SubmitFeedback",
            Self::ListFeedback { .. } => "ListFeedback",
            Self::Chat { .. } => "Chat",
        }
    }
}

fn default_feedback_limit() -> u32 {
    20
}

fn default_insight_cities() -> Vec<String> {
    vec!["Mumbai".into(), "Delhi".into()]
}

fn default_year_from() -> u16 {
    2018
}

fn default_year_to() -> u16 {
    2024
}

fn default_insight_sectors() -> Vec<String> {
    vec!["Services".into(), "Technology".into()]
}

// Commands carry passwords; only the variant name is printable.
impl fmt::Debug for GatewayCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GatewayCommand::{}", self.name())
    }
}

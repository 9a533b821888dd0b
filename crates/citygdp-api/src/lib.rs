pub mod accounts;
pub mod auth;
pub mod chatbot;
pub mod feedback;
pub mod insights;
pub mod reports;
pub mod session;

use std::sync::{Mutex, PoisonError};

use review::Notifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastState {
    pub level: ToastLevel,
    pub title: String,
    pub message: String,
}

impl ToastState {
    pub fn render(&self) -> String {
        let tag = match self.level {
            ToastLevel::Info => "[i]",
            ToastLevel::Success => "[OK]",
            ToastLevel::Error => "[ERROR]",
        };
        if self.title.is_empty() {
            format!("{tag} {}", self.message)
        } else {
            format!("{tag} {}: {}", self.title, self.message)
        }
    }
}

/// Collects notifications until the app prints them.
#[derive(Debug, Default)]
pub struct ToastNotifier {
    pending: Mutex<Vec<ToastState>>,
}

impl ToastNotifier {
    pub fn push(&self, level: ToastLevel, title: &str, message: impl Into<String>) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ToastState {
                level,
                title: title.to_string(),
                message: message.into(),
            });
    }

    pub fn take(&self) -> Vec<ToastState> {
        std::mem::take(&mut *self.pending.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

impl Notifier for ToastNotifier {
    fn success(&self, title: &str, message: &str) {
        self.push(ToastLevel::Success, title, message);
    }

    fn error(&self, title: &str, message: &str) {
        tracing::debug!(title, message, "error notification");
        self.push(ToastLevel::Error, title, message);
    }
}

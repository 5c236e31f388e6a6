#![forbid(unsafe_code)]

//! User-facing outcome messages ("toasts"). Controllers push into a sink they
//! are handed; the server drains the buffer into each tool response.

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ToastVariant {
    Default,
    Destructive,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub(crate) struct Toast {
    pub(crate) title: String,
    pub(crate) description: Option<String>,
    pub(crate) variant: ToastVariant,
}

impl Toast {
    pub(crate) fn success(title: &str, description: impl Into<String>) -> Self {
        Self {
            title: title.to_string(),
            description: Some(description.into()),
            variant: ToastVariant::Default,
        }
    }

    pub(crate) fn error(description: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            description: Some(description.into()),
            variant: ToastVariant::Destructive,
        }
    }
}

pub(crate) trait NotificationSink {
    fn notify(&mut self, toast: Toast);
}

#[derive(Debug, Default)]
pub(crate) struct ToastBuffer {
    toasts: Vec<Toast>,
}

impl ToastBuffer {
    pub(crate) fn drain(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.toasts)
    }

    #[cfg(test)]
    pub(crate) fn toasts(&self) -> &[Toast] {
        &self.toasts
    }
}

impl NotificationSink for ToastBuffer {
    fn notify(&mut self, toast: Toast) {
        tracing::debug!(title = %toast.title, variant = ?toast.variant, "toast");
        self.toasts.push(toast);
    }
}

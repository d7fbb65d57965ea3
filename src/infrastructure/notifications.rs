//! Desktop notifications for playback failures.

use tracing::{debug, warn};

use crate::domain::ports::NotificationPort;

/// Shows notifications on the desktop when built with the `notify` feature.
///
/// Without the feature, or when disabled in the config, notifications are
/// only logged.
#[derive(Debug, Clone, Default)]
pub struct DesktopNotificationService {
    enabled: bool,
}

impl DesktopNotificationService {
    /// Creates a new service.
    #[must_use]
    pub const fn new(enabled: bool) -> Self {
        Self {
            enabled: enabled && cfg!(feature = "notify"),
        }
    }

    /// Returns true if notifications reach the desktop.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl NotificationPort for DesktopNotificationService {
    fn send(&self, title: &str, body: &str) {
        if !self.enabled {
            debug!(title = %title, body = %body, "Desktop notification suppressed");
            return;
        }
        show(title.to_string(), body.to_string());
    }
}

#[cfg(feature = "notify")]
fn show(title: String, body: String) {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        warn!(title = %title, "No runtime to show notification on");
        return;
    };
    runtime.spawn_blocking(move || {
        if let Err(e) = notify_rust::Notification::new()
            .summary(&title)
            .body(&body)
            .appname(crate::NAME)
            .show()
        {
            warn!(error = %e, "Failed to show notification");
        }
    });
}

#[cfg(not(feature = "notify"))]
fn show(title: String, _body: String) {
    warn!(title = %title, "Built without desktop notifications");
}

use authguard_core::Notifier;
use tracing::{info, warn};

/// Prints notifications to stderr so they never mix with response bodies on stdout.
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn info(&self, message: &str) {
        info!(notice = message, "User notification");
        eprintln!("{}", message);
    }

    fn warn(&self, message: &str) {
        warn!(notice = message, "User notification");
        eprintln!("Warning: {}", message);
    }
}

use thiserror::Error;

use crate::domain::Notice;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not notify {recipient}: {reason}")]
pub struct NotifyError {
    pub recipient: String,
    pub reason: String,
}

/// Delivers balance notices to group members. Delivery is fire-and-forget:
/// a failure is reported back but never changes any balance.
pub trait Notifier {
    fn deliver(&self, notice: &Notice) -> Result<(), NotifyError>;
}

/// Notifier that writes each notice to the log instead of sending email.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn deliver(&self, notice: &Notice) -> Result<(), NotifyError> {
        tracing::info!(
            to = %notice.to_email,
            subject = %notice.subject,
            net_bill = notice.net_bill,
            "{}",
            notice.message
        );
        Ok(())
    }
}

//! Collaborator notification seam.
//!
//! After a successful deposit the engine tells a downstream collaborator
//! (an aggregator, a cataloguing service) about the new receipt. The
//! collaborator is remote and unreliable, so a failed notification never
//! rolls back the local deposit; the engine logs it and surfaces a warning
//! in the receipt instead.

use crate::error::Result;
use crate::receipt::DepositReceipt;
use async_trait::async_trait;
use std::sync::Arc;

/// Shared handle to a notifier.
pub type NotifierHandle = Arc<dyn Notifier + Send + Sync>;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Name of the collaborator (used for logging only).
    fn name(&self) -> &'static str;

    /// Deliver the receipt to the collaborator. Failures map to
    /// [`ErrorKind::Remote`](crate::error::ErrorKind::Remote).
    async fn notify(&self, receipt: &DepositReceipt) -> Result<()>;
}

/// Default collaborator: nobody to tell.
#[derive(Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn notify(&self, _receipt: &DepositReceipt) -> Result<()> {
        Ok(())
    }
}

use async_trait::async_trait;

use crate::error::DeliveryError;
use crate::types::RenderedDocument;

#[async_trait]
pub trait DocumentSender: Send + Sync {
    /// Sends `document` as an attachment to `recipient`. No retries.
    async fn send_document(
        &self,
        document: &RenderedDocument,
        recipient: &str,
        subject: &str,
        body: &str,
    ) -> std::result::Result<(), DeliveryError>;
}

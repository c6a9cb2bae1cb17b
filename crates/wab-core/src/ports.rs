use async_trait::async_trait;

use crate::{
    attachment::{Attachment, FileType},
    domain::{AttachmentRef, BotStatus},
    Result,
};

/// One outbound message as understood by the backend.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SendRequest {
    pub phone: String,
    pub message: String,
    pub attachment: Option<AttachmentRef>,
    pub file_type: Option<FileType>,
}

/// Hexagonal port for delivering a single message.
///
/// Implementations return `Error::Rejected` when the backend refuses the send
/// and `Error::Transport` when the request itself failed.
#[async_trait]
pub trait SendService: Send + Sync {
    async fn send_message(&self, req: &SendRequest) -> Result<()>;
}

/// Hexagonal port for storing an attachment once per run.
#[async_trait]
pub trait UploadService: Send + Sync {
    async fn upload_attachment(&self, attachment: &Attachment) -> Result<AttachmentRef>;
}

/// Read-only view of the remote messaging session.
///
/// Never fails: transport problems are reported as [`BotStatus::ProbeFailed`].
#[async_trait]
pub trait BotStatusProbe: Send + Sync {
    async fn bot_status(&self) -> BotStatus;
}

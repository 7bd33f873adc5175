use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use dbhq_core::{
    AttachmentReader, AttachmentRef, BackendError, ChannelId, ChatBackend, MessageId,
    ResolvedMessage,
};

/// In-memory backend: serves one canned message and attachment bodies by URL,
/// and records everything sent.
#[derive(Default)]
pub struct FakeBackend {
    pub message: Mutex<Option<ResolvedMessage>>,
    pub bodies: Mutex<HashMap<String, Vec<u8>>>,
    pub texts: Mutex<Vec<String>>,
    pub files: Mutex<Vec<PathBuf>>,
    pub fetches: Mutex<usize>,
    pub fail_send_file: bool,
}

impl FakeBackend {
    pub fn with_message(message: ResolvedMessage) -> Self {
        let backend = Self::default();
        *backend.message.lock().unwrap() = Some(message);
        backend
    }

    pub fn body(self, url: &str, bytes: &[u8]) -> Self {
        self.bodies
            .lock()
            .unwrap()
            .insert(url.to_string(), bytes.to_vec());
        self
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }

    pub fn files(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn send_text(&self, _channel: ChannelId, text: &str) -> Result<(), BackendError> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }

    async fn send_file(&self, _channel: ChannelId, path: &Path) -> Result<(), BackendError> {
        if self.fail_send_file {
            return Err(BackendError::SendFailed("upload rejected".into()));
        }
        self.files.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn fetch_message(
        &self,
        _channel: ChannelId,
        _message: MessageId,
    ) -> Result<ResolvedMessage, BackendError> {
        *self.fetches.lock().unwrap() += 1;
        self.message
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| BackendError::FetchFailed("unknown message".into()))
    }

    async fn open_attachment(
        &self,
        attachment: &AttachmentRef,
    ) -> Result<AttachmentReader, BackendError> {
        let body = self
            .bodies
            .lock()
            .unwrap()
            .get(&attachment.url)
            .cloned()
            .ok_or_else(|| BackendError::DownloadFailed(format!("404 {}", attachment.url)))?;
        Ok(Box::new(std::io::Cursor::new(body)))
    }
}

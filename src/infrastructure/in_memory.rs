use crate::domain::ports::Clipboard;
use std::io;
use std::sync::{Arc, RwLock};

/// A process-local clipboard.
///
/// Uses `Arc<RwLock<Option<String>>>` so clones share the same contents.
/// Stands in for the system clipboard in the terminal and in tests.
#[derive(Default, Clone)]
pub struct InMemoryClipboard {
    contents: Arc<RwLock<Option<String>>>,
}

impl InMemoryClipboard {
    /// Creates an empty clipboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the last text written, if any.
    pub fn contents(&self) -> Option<String> {
        self.contents.read().ok().and_then(|guard| guard.clone())
    }
}

impl Clipboard for InMemoryClipboard {
    fn write_text(&self, text: &str) -> io::Result<()> {
        let mut contents = self
            .contents
            .write()
            .map_err(|_| io::Error::other("clipboard lock poisoned"))?;
        *contents = Some(text.to_string());
        Ok(())
    }
}

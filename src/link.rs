//! Chat-link collaborator: build and open pre-filled chat URIs.
//!
//! Given a target identifier and a message, [`chat_link`] produces a URI
//! that, when opened, starts a chat with that target pre-filled with the
//! URL-escaped message. [`ChatLinkOpener`] launches the link in the system
//! default browser; [`OpenLink`] is the seam the controller calls so tests
//! can substitute a recorder.
//!
//! # Example
//! ```
//! use batchpilot::{chat_link, Target};
//!
//! let t = Target::raw("15550102345");
//! let url = chat_link("https://web.whatsapp.com/send", &t, "hi & bye").unwrap();
//! assert_eq!(
//!     url.as_str(),
//!     "https://web.whatsapp.com/send?phone=15550102345&text=hi+%26+bye"
//! );
//! ```

use async_trait::async_trait;
use url::Url;

use crate::error::ActionError;
use crate::targets::Target;

/// Builds the chat-open URI for a target with the message pre-filled.
///
/// The message is percent-escaped by the URL serializer; the target is
/// passed through as-is (it is digits-only after normalization).
pub fn chat_link(base: &str, target: &Target, message: &str) -> Result<Url, url::ParseError> {
    Url::parse_with_params(base, &[("phone", target.as_str()), ("text", message)])
}

/// Seam for the link-opening collaborator.
///
/// The sequencer only calls this trait; it does not validate the URI
/// format itself. Failures surface as [`ActionError`] under the `advance`
/// action, which fail-fast stops the sequence like any other action
/// failure.
#[async_trait]
pub trait OpenLink: Send + Sync + 'static {
    /// Opens a chat with `target`, pre-filled with `message`.
    async fn open(&self, target: &Target, message: &str) -> Result<(), ActionError>;
}

/// Opens chat links in the system default browser.
#[derive(Debug, Clone)]
pub struct ChatLinkOpener {
    base: String,
}

impl ChatLinkOpener {
    /// Creates an opener that builds links from the given base URL.
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

#[async_trait]
impl OpenLink for ChatLinkOpener {
    async fn open(&self, target: &Target, message: &str) -> Result<(), ActionError> {
        let url = chat_link(&self.base, target, message).map_err(|e| ActionError::Rejected {
            action: "advance",
            reason: format!("bad chat link base: {e}"),
        })?;
        // Detached launch: the browser process outlives the callback.
        open::that_detached(url.as_str()).map_err(|e| ActionError::Rejected {
            action: "advance",
            reason: format!("failed to open chat link: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_link_escapes_message() {
        let t = Target::raw("4915550102345");
        let url = chat_link("https://web.whatsapp.com/send", &t, "50% off — today?").unwrap();
        let s = url.as_str();
        assert!(s.starts_with("https://web.whatsapp.com/send?phone=4915550102345&text="));
        // Spaces and the em-dash must be escaped out of the query.
        assert!(!s.contains(' '));
        assert!(s.contains('%'));
    }

    #[test]
    fn test_chat_link_rejects_bad_base() {
        let t = Target::raw("111");
        assert!(chat_link("not a url", &t, "hi").is_err());
    }
}

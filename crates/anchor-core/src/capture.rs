// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Description capture: after a successful host the user names the anchor and
//! the pair is published to the shared directory.

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use crate::directory::{AnchorDirectory, DirectoryRecord};
use crate::error::CaptureError;
use crate::ids::CloudAnchorId;

/// Open description prompt for one hosted anchor.
///
/// Independent of the session lifetime: a description entered after teardown
/// is still published.
pub struct DescriptionCapture {
    cloud_anchor_id: CloudAnchorId,
    directory: Arc<dyn AnchorDirectory>,
    submitted: bool,
}

impl DescriptionCapture {
    pub(crate) fn new(cloud_anchor_id: CloudAnchorId, directory: Arc<dyn AnchorDirectory>) -> Self {
        Self {
            cloud_anchor_id,
            directory,
            submitted: false,
        }
    }

    /// Anchor being described.
    pub fn cloud_anchor_id(&self) -> &CloudAnchorId {
        &self.cloud_anchor_id
    }

    /// `true` once a description has been published.
    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Publish `description`. Blank input is rejected and leaves the capture
    /// open for another attempt; so does a failed write.
    pub fn submit(&mut self, description: &str) -> Result<DirectoryRecord, CaptureError> {
        if self.submitted {
            return Err(CaptureError::AlreadySubmitted);
        }
        let description = description.trim();
        if description.is_empty() {
            return Err(CaptureError::EmptyDescription);
        }
        let record = DirectoryRecord::stamped_now(&self.cloud_anchor_id, description);
        if let Err(err) = self.directory.store(record.clone()) {
            warn!(cloud_anchor_id = %self.cloud_anchor_id, %err, "directory write failed");
            return Err(err.into());
        }
        self.submitted = true;
        info!(cloud_anchor_id = %self.cloud_anchor_id, description, "anchor published");
        Ok(record)
    }
}

impl fmt::Debug for DescriptionCapture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DescriptionCapture")
            .field("cloud_anchor_id", &self.cloud_anchor_id)
            .field("submitted", &self.submitted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;

    #[test]
    fn blank_description_keeps_capture_open() {
        let dir = Arc::new(MemoryDirectory::new());
        let mut capture = DescriptionCapture::new("c9".into(), dir.clone());
        assert_eq!(capture.submit("   "), Err(CaptureError::EmptyDescription));
        assert!(!capture.is_submitted());
        let record = capture.submit(" Porch ").unwrap();
        assert_eq!(record.anchor_description, "Porch");
        assert_eq!(capture.submit("again"), Err(CaptureError::AlreadySubmitted));
        assert_eq!(dir.write_count(), 1);
    }

    #[test]
    fn failed_write_can_be_retried() {
        let dir = Arc::new(MemoryDirectory::new());
        dir.set_offline(true);
        let mut capture = DescriptionCapture::new("c9".into(), dir.clone());
        assert!(matches!(capture.submit("Porch"), Err(CaptureError::Directory(_))));
        dir.set_offline(false);
        assert!(capture.submit("Porch").is_ok());
        assert_eq!(dir.record("c9").unwrap().anchor_description, "Porch");
    }
}

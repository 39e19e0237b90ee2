// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Anchor records held by the store and the per-request lifecycle phases.

use serde::{Deserialize, Serialize};

use crate::error::CloudAnchorError;
use crate::ids::{AnchorHandle, CloudAnchorId, RequestToken};

/// Session mode; fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Place local anchors and publish them.
    Hosting,
    /// Re-localize anchors published by others.
    Resolving,
}

/// A cloud anchor published to the directory but not yet resolved here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedAnchorDescriptor {
    /// Service-issued id.
    pub cloud_anchor_id: CloudAnchorId,
    /// Human-readable description supplied by the publisher.
    pub description: String,
}

impl UnresolvedAnchorDescriptor {
    /// Builds a descriptor.
    pub fn new(cloud_anchor_id: impl Into<CloudAnchorId>, description: impl Into<String>) -> Self {
        Self {
            cloud_anchor_id: cloud_anchor_id.into(),
            description: description.into(),
        }
    }
}

/// A cloud anchor re-localized in this session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAnchorRecord {
    /// Service-issued id.
    pub cloud_anchor_id: CloudAnchorId,
    /// Description carried over from the unresolved descriptor.
    pub description: String,
    /// Local anchor the resolve produced.
    pub handle: AnchorHandle,
}

/// Where a locally placed anchor stands with the cloud service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPhase {
    /// Submitted; awaiting completion.
    Requested,
    /// Published under the given id.
    Hosted(CloudAnchorId),
}

/// A locally placed anchor (the host-anchor list keeps every accepted hit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorRecord {
    /// Request that is hosting (or hosted) this anchor.
    pub token: RequestToken,
    /// Local anchor handle.
    pub handle: AnchorHandle,
    /// Cloud status.
    pub phase: HostPhase,
}

/// Externally observable lifecycle phase of a host or resolve request.
///
/// Hosting: `HostRequested → {Hosted | HostFailed}`.
/// Resolving: `ResolveRequested → {Resolved | ResolveFailed}`.
/// Terminal phases never change again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnchorPhase {
    /// Host submitted.
    HostRequested,
    /// Host succeeded.
    Hosted(CloudAnchorId),
    /// Host failed.
    HostFailed(CloudAnchorError),
    /// Resolve submitted for the id.
    ResolveRequested(CloudAnchorId),
    /// Resolve succeeded.
    Resolved(CloudAnchorId),
    /// Resolve failed.
    ResolveFailed(CloudAnchorId, CloudAnchorError),
}

impl AnchorPhase {
    /// `true` for phases that never transition again.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::HostRequested | Self::ResolveRequested(_))
    }
}

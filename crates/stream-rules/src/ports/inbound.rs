//! # Inbound Port - StreamRulesApi
//!
//! Driving port hosts call before appending an event or creating a stream.
//!
//! | Method | Verdict |
//! |--------|---------|
//! | `can_add_event` | `NoOp`, `Admissible { .. }` or a rejection |
//! | `can_create_stream` | `CreateStreamRules` or a rejection |

use std::collections::BTreeMap;

use shared_types::{ParsedEvent, ProtocolResult, StreamId};

use super::outbound::StreamView;
use crate::domain::verdict::{AddEventOutcome, CreateStreamRules};

/// Primary API of the rules engine.
///
/// Both methods are pure: given the same arguments and the same view, every
/// node returns the same verdict.
///
/// # Example
///
/// ```rust,ignore
/// use stream_rules::ports::StreamRulesApi;
///
/// fn admit(rules: &impl StreamRulesApi, event: &ParsedEvent, view: &dyn StreamView, now_ms: u64) {
///     match rules.can_add_event(event, view, now_ms) {
///         Ok(outcome) if outcome.is_admissible() => { /* verify, then append */ }
///         Ok(_) => { /* redundant, drop silently */ }
///         Err(err) => { /* reject with err.code() */ }
///     }
/// }
/// ```
pub trait StreamRulesApi {
    /// Decides whether `event` may be appended to the stream behind `view`.
    ///
    /// # Errors
    /// - `PermissionDenied`: expired delegate or missing permission
    /// - `InvalidArgument`: malformed payload or wrong payload kind
    /// - `BadPrevMiniblockHash` / `DuplicateEvent`: rejected by the view
    fn can_add_event(
        &self,
        event: &ParsedEvent,
        view: &dyn StreamView,
        now_ms: u64,
    ) -> ProtocolResult<AddEventOutcome>;

    /// Decides whether a stream may be created from `events`.
    ///
    /// # Errors
    /// - `BadStreamCreationParams`: malformed inception bundle
    /// - `PermissionDenied`: expired delegate or missing entitlement
    fn can_create_stream(
        &self,
        stream_id: &StreamId,
        events: &[ParsedEvent],
        metadata: &BTreeMap<String, Vec<u8>>,
        now_ms: u64,
    ) -> ProtocolResult<CreateStreamRules>;
}

//! # User Stream Integration Tests
//!
//! User memberships mirror into the target stream; apps are scoped to
//! spaces and channels their owners control.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use shared_types::{
        make_member_membership, ErrorCode, GroupEncryptionSessions, InboxAck, InceptionPayload,
        MembershipOp, MembershipReason, Payload, StreamId, StreamKind, UserInboxInception,
        UserInboxPayload, UserMembership, UserMembershipAction, UserPayload,
    };
    use stream_rules::adapters::InMemoryStreamView;
    use stream_rules::test_utils::{make_event, GENESIS_MINIBLOCK_HASH};
    use stream_rules::{AddEventOutcome, ChainAuthArgs, DerivedEvent, Permission};

    use crate::integration::fixtures::*;

    fn user_membership(
        stream_id: StreamId,
        op: MembershipOp,
        inviter: Option<shared_types::Address>,
        reason: MembershipReason,
    ) -> Payload {
        Payload::User(UserPayload::UserMembership(UserMembership {
            stream_id,
            op,
            inviter,
            stream_parent_id: None,
            reason,
        }))
    }

    fn inbox_view(owner: shared_types::Address) -> InMemoryStreamView {
        let stream_id = StreamId::for_address(StreamKind::UserInbox, &owner).unwrap();
        InMemoryStreamView::new(InceptionPayload::UserInbox(UserInboxInception {
            stream_id,
            settings: None,
        }))
        .with_miniblock(0, GENESIS_MINIBLOCK_HASH)
        .with_member(owner, MembershipOp::Join)
    }

    // =========================================================================
    // USER MEMBERSHIP
    // =========================================================================

    #[test]
    fn test_node_join_mirrors_into_the_space() {
        let harness = Harness::new();
        let event = make_event(
            NODE,
            user_membership(space_id(), MembershipOp::Join, Some(BOB), MembershipReason::None),
        );
        let outcome = harness.add(&event, &user_view(ALICE, None)).unwrap();

        assert!(outcome.chain_auth().is_none());
        let expected = DerivedEvent::new(
            space_id(),
            make_member_membership(MembershipOp::Join, ALICE, BOB, None, MembershipReason::None, None),
        );
        assert_eq!(outcome.required_parent_event(), Some(&expected));
    }

    #[test]
    fn test_owner_join_uses_the_owner_as_inviter() {
        let harness = Harness::new();
        // A client-supplied inviter is ignored unless a node wrote the event.
        let event = make_event(
            ALICE,
            user_membership(space_id(), MembershipOp::Join, Some(BOB), MembershipReason::None),
        );
        let outcome = harness.add(&event, &user_view(ALICE, None)).unwrap();
        let parent = outcome.required_parent_event().expect("mirrored join");
        assert_eq!(parent.payload.membership().map(|m| m.initiator_address), Some(ALICE));
    }

    #[test]
    fn test_repeated_membership_is_a_no_op() {
        let harness = Harness::new();
        let view = user_view(ALICE, None).with_user_membership(space_id(), MembershipOp::Join);
        let event = make_event(
            ALICE,
            user_membership(space_id(), MembershipOp::Join, None, MembershipReason::None),
        );
        assert_eq!(harness.add(&event, &view).unwrap(), AddEventOutcome::NoOp);
    }

    #[test]
    fn test_reason_is_reserved_for_node_leaves() {
        let harness = Harness::new();
        let view = user_view(ALICE, None).with_user_membership(space_id(), MembershipOp::Join);
        let event = make_event(
            ALICE,
            user_membership(space_id(), MembershipOp::Leave, None, MembershipReason::NotEntitled),
        );
        let err = harness.add(&event, &view).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
    }

    #[test]
    fn test_strangers_cannot_write_user_memberships() {
        let harness = Harness::new();
        let event = make_event(
            BOB,
            user_membership(space_id(), MembershipOp::Join, None, MembershipReason::None),
        );
        // The last failed alternative is the node check.
        let err = harness.add(&event, &user_view(ALICE, None)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownNode);
    }

    // =========================================================================
    // APPS
    // =========================================================================

    #[test]
    fn test_app_space_join_requires_inviter_ownership() {
        let harness = Harness::new();
        let event = make_event(
            NODE,
            user_membership(space_id(), MembershipOp::Join, Some(BOB), MembershipReason::None),
        );
        let outcome = harness.add(&event, &user_view(ALICE, Some(APP))).unwrap();

        assert_eq!(
            outcome.chain_auth().map(|r| r.args().to_vec()),
            Some(vec![ChainAuthArgs::for_space(space_id(), BOB, Permission::Ownership)])
        );
        let parent = outcome.required_parent_event().expect("mirrored join");
        assert_eq!(parent.payload.membership().and_then(|m| m.app_address), Some(APP));
    }

    #[test]
    fn test_app_node_removal_needs_no_ownership() {
        let harness = Harness::new();
        let view = user_view(ALICE, Some(APP)).with_user_membership(space_id(), MembershipOp::Join);
        let event = make_event(
            NODE,
            user_membership(space_id(), MembershipOp::Leave, None, MembershipReason::NotEntitled),
        );
        let outcome = harness.add(&event, &view).unwrap();
        assert!(outcome.is_admissible());
        assert!(outcome.chain_auth().is_none());
    }

    #[test]
    fn test_app_never_joins_a_dm() {
        let harness = Harness::new();
        let event = make_event(
            NODE,
            user_membership(
                StreamId::dm_between(&ALICE, &BOB),
                MembershipOp::Join,
                Some(BOB),
                MembershipReason::None,
            ),
        );
        assert_eq!(
            harness.add(&event, &user_view(ALICE, Some(APP))).unwrap(),
            AddEventOutcome::NoOp
        );
    }

    #[test]
    fn test_app_channel_membership_needs_a_parent() {
        let harness = Harness::new();
        let event = make_event(
            NODE,
            user_membership(channel_id(), MembershipOp::Join, Some(BOB), MembershipReason::None),
        );
        let err = harness.add(&event, &user_view(ALICE, Some(APP))).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadStreamId);
    }

    // =========================================================================
    // MEMBERSHIP ACTIONS
    // =========================================================================

    #[test]
    fn test_membership_action_lands_in_the_target_user_stream() {
        let harness = Harness::new();
        let event = make_event(
            ALICE,
            Payload::User(UserPayload::UserMembershipAction(UserMembershipAction {
                stream_id: channel_id(),
                op: MembershipOp::Invite,
                user_id: BOB,
                stream_parent_id: Some(space_id()),
            })),
        );
        let outcome = harness.add(&event, &user_view(ALICE, None)).unwrap();
        let parent = outcome.required_parent_event().expect("action forwarded");
        assert_eq!(parent.stream_id, StreamId::user_stream(&BOB));
        assert_eq!(
            parent.payload,
            Payload::User(UserPayload::UserMembership(UserMembership {
                stream_id: channel_id(),
                op: MembershipOp::Invite,
                inviter: Some(ALICE),
                stream_parent_id: Some(space_id()),
                reason: MembershipReason::None,
            }))
        );
    }

    // =========================================================================
    // INBOX
    // =========================================================================

    #[test]
    fn test_anyone_may_deliver_group_sessions() {
        let harness = Harness::new();
        let event = make_event(
            CAROL,
            Payload::UserInbox(UserInboxPayload::GroupEncryptionSessions(GroupEncryptionSessions {
                stream_id: channel_id(),
                sender_key: "sender".to_string(),
                session_ids: vec!["s1".to_string()],
                ciphertexts: BTreeMap::from([("device".to_string(), "ciphertext".to_string())]),
            })),
        );
        assert!(harness.add(&event, &inbox_view(ALICE)).unwrap().is_admissible());
    }

    #[test]
    fn test_inbox_ack_is_owner_only() {
        let harness = Harness::new();
        let ack = |creator| {
            make_event(
                creator,
                Payload::UserInbox(UserInboxPayload::Ack(InboxAck {
                    device_key: "device".to_string(),
                    miniblock_num: 3,
                })),
            )
        };
        assert!(harness.add(&ack(ALICE), &inbox_view(ALICE)).unwrap().is_admissible());
        let err = harness.add(&ack(CAROL), &inbox_view(ALICE)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
    }
}

//! # Membership Integration Tests
//!
//! Transition totality across stream kinds, membership caps, and the
//! entitlements and cascades a membership change produces.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use shared_types::{
        make_member_membership, make_user_membership, Address, ErrorCode, InceptionPayload,
        MediaInception, MembershipOp, MembershipReason, ProtocolResult, StreamKind,
    };
    use stream_rules::adapters::InMemoryStreamView;
    use stream_rules::domain::membership::{base_transition, Transition};
    use stream_rules::test_utils::{make_event, opaque_stream_id, GENESIS_MINIBLOCK_HASH};
    use stream_rules::{
        AddEventOutcome, ChainAuthArgs, ChainAuthRequirement, DerivedEvent, MembershipLimits,
        OnChainSettings, Permission,
    };

    use crate::integration::fixtures::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Verdict {
        NoOp,
        Admissible,
        Rejected(ErrorCode),
    }

    fn verdict(result: ProtocolResult<AddEventOutcome>) -> Verdict {
        match result {
            Ok(AddEventOutcome::NoOp) => Verdict::NoOp,
            Ok(AddEventOutcome::Admissible { .. }) => Verdict::Admissible,
            Err(err) => Verdict::Rejected(err.code()),
        }
    }

    fn base_verdict(current: MembershipOp, requested: MembershipOp) -> Verdict {
        match base_transition(current, requested) {
            Ok(Transition::NoOp) => Verdict::NoOp,
            Ok(Transition::Apply) => Verdict::Admissible,
            Err(err) => Verdict::Rejected(err.code()),
        }
    }

    fn op() -> impl Strategy<Value = MembershipOp> {
        prop_oneof![
            Just(MembershipOp::Unspecified),
            Just(MembershipOp::Invite),
            Just(MembershipOp::Join),
            Just(MembershipOp::Leave),
        ]
    }

    fn person() -> impl Strategy<Value = Address> {
        prop_oneof![Just(ALICE), Just(BOB), Just(CAROL), Just(DAVE)]
    }

    fn chain_auth_args(outcome: &AddEventOutcome) -> Vec<ChainAuthArgs> {
        outcome
            .chain_auth()
            .map(|requirement| requirement.args().to_vec())
            .unwrap_or_default()
    }

    // =========================================================================
    // TRANSITION TOTALITY
    // =========================================================================

    proptest! {
        #[test]
        fn test_space_membership_follows_base_table(current in op(), requested in op(), user in person()) {
            let harness = Harness::new();
            let view = space_view(&[ERIN]).with_member(user, current);
            let event = membership_event(requested, user, user, None);
            prop_assert_eq!(verdict(harness.add(&event, &view)), base_verdict(current, requested));
        }

        #[test]
        fn test_channel_membership_follows_base_table(current in op(), requested in op(), user in person()) {
            let harness = Harness::new();
            let view = channel_view(&[ERIN]).with_member(user, current);
            let event = membership_event(requested, user, user, Some(space_id()));
            prop_assert_eq!(verdict(harness.add(&event, &view)), base_verdict(current, requested));
        }

        #[test]
        fn test_dm_membership_is_limited_to_parties(current in op(), requested in op(), user in person()) {
            let harness = Harness::new();
            let view = dm_view(ALICE, BOB).with_member(user, current);
            let event = membership_event(requested, user, user, None);
            let is_party = user == ALICE || user == BOB;
            let expected = match base_verdict(current, requested) {
                Verdict::Admissible if !is_party || requested == MembershipOp::Invite => {
                    Verdict::Rejected(ErrorCode::PermissionDenied)
                }
                other => other,
            };
            prop_assert_eq!(verdict(harness.add(&event, &view)), expected);
        }

        #[test]
        fn test_gdm_membership_is_total(
            current in op(),
            requested in op(),
            user in person(),
            initiator in person(),
        ) {
            let harness = Harness::new();
            let view = gdm_view(&[ALICE, BOB]).with_member(user, current);
            let event = membership_event(requested, user, initiator, None);
            let actual = verdict(harness.add(&event, &view));
            match base_verdict(current, requested) {
                Verdict::Admissible => prop_assert!(matches!(
                    actual,
                    Verdict::Admissible | Verdict::Rejected(ErrorCode::PermissionDenied)
                )),
                expected => prop_assert_eq!(actual, expected),
            }
        }
    }

    // =========================================================================
    // AUTHORSHIP AND PAYLOAD
    // =========================================================================

    #[test]
    fn test_membership_must_be_authored_by_a_node() {
        let harness = Harness::new();
        let event = make_event(
            ALICE,
            make_member_membership(MembershipOp::Join, ALICE, ALICE, None, MembershipReason::None, None),
        );
        let err = harness.add(&event, &space_view(&[])).unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnknownNode);
    }

    #[test]
    fn test_channel_join_must_name_the_space() {
        let harness = Harness::new();
        let event = membership_event(MembershipOp::Join, ALICE, ALICE, None);
        let err = harness.add(&event, &channel_view(&[])).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_payload_is_checked_before_authorship() {
        let harness = Harness::new();
        let event = make_event(
            ALICE,
            make_member_membership(MembershipOp::Join, ALICE, ALICE, None, MembershipReason::None, None),
        );
        let err = harness.add(&event, &channel_view(&[])).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    // =========================================================================
    // STREAM KINDS WITHOUT MEMBERSHIP EVENTS
    // =========================================================================

    fn media_view() -> InMemoryStreamView {
        let stream_id = opaque_stream_id(StreamKind::Media, 0x3c);
        InMemoryStreamView::new(InceptionPayload::Media(MediaInception {
            stream_id,
            channel_id: Some(channel_id()),
            space_id: Some(space_id()),
            user_id: None,
            chunk_count: 2,
            per_chunk_encryption: false,
            settings: None,
        }))
        .with_miniblock(0, GENESIS_MINIBLOCK_HASH)
        .with_member(ALICE, MembershipOp::Join)
    }

    #[test]
    fn test_membership_in_user_stream_is_rejected() {
        let harness = Harness::new();
        for op in [MembershipOp::Join, MembershipOp::Invite, MembershipOp::Leave] {
            let event = membership_event(op, BOB, BOB, None);
            let err = harness.add(&event, &user_view(ALICE, None)).unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidArgument, "{op}");
            assert_eq!(err.tag_value("kind"), Some(StreamKind::User.to_string().as_str()));
        }
    }

    #[test]
    fn test_membership_in_media_stream_is_rejected() {
        let harness = Harness::new();
        let event = membership_event(MembershipOp::Join, BOB, BOB, None);
        let err = harness.add(&event, &media_view()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);

        // Removing an existing member is rejected the same way.
        let leave = membership_event(MembershipOp::Leave, ALICE, NODE, None);
        let err = harness.add(&leave, &media_view()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    // =========================================================================
    // CHAIN AUTH AND CASCADES
    // =========================================================================

    #[test]
    fn test_space_join_checks_space_membership_for_the_app() {
        let harness = Harness::new();
        let event = make_event(
            NODE,
            make_member_membership(MembershipOp::Join, ALICE, ALICE, None, MembershipReason::None, Some(APP)),
        );
        let outcome = harness.add(&event, &space_view(&[])).unwrap();
        assert_eq!(
            chain_auth_args(&outcome),
            vec![ChainAuthArgs::for_is_space_member(space_id(), ALICE).with_app_address(APP)]
        );
        assert!(outcome.required_parent_event().is_none());
    }

    #[test]
    fn test_channel_join_cascades_space_join_into_user_stream() {
        let harness = Harness::new();
        let event = membership_event(MembershipOp::Join, ALICE, ALICE, Some(space_id()));
        let outcome = harness.add(&event, &channel_view(&[])).unwrap();

        assert_eq!(
            outcome.chain_auth(),
            Some(&ChainAuthRequirement::All(vec![ChainAuthArgs::for_channel(
                space_id(),
                channel_id(),
                ALICE,
                Permission::Read,
            )]))
        );
        let expected = DerivedEvent::new(
            shared_types::StreamId::user_stream(&ALICE),
            make_user_membership(MembershipOp::Join, space_id(), Some(ALICE), None, MembershipReason::None),
        );
        assert_eq!(outcome.required_parent_event(), Some(&expected));
    }

    #[test]
    fn test_channel_invite_checks_the_channel() {
        let harness = Harness::new();
        let event = membership_event(MembershipOp::Invite, BOB, ALICE, None);
        let outcome = harness.add(&event, &channel_view(&[ALICE])).unwrap();
        assert_eq!(
            chain_auth_args(&outcome),
            vec![ChainAuthArgs::for_channel(space_id(), channel_id(), ALICE, Permission::Invite)]
        );
    }

    #[test]
    fn test_removing_another_member_requires_banning_on_the_space() {
        let harness = Harness::new();
        let event = membership_event(MembershipOp::Leave, BOB, ALICE, None);
        let outcome = harness.add(&event, &channel_view(&[ALICE, BOB])).unwrap();
        assert_eq!(
            chain_auth_args(&outcome),
            vec![ChainAuthArgs::for_space(space_id(), ALICE, Permission::ModifyBanning)]
        );
    }

    #[test]
    fn test_leaving_needs_no_entitlement() {
        let harness = Harness::new();
        let event = membership_event(MembershipOp::Leave, BOB, BOB, None);
        let outcome = harness.add(&event, &space_view(&[ALICE, BOB])).unwrap();
        assert!(outcome.is_admissible());
        assert!(outcome.chain_auth().is_none());
    }

    #[test]
    fn test_inviting_a_member_is_denied() {
        let harness = Harness::new();
        let event = membership_event(MembershipOp::Invite, BOB, ALICE, None);
        let err = harness.add(&event, &space_view(&[ALICE, BOB])).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
    }

    // =========================================================================
    // CAPACITY
    // =========================================================================

    fn gdm_limited_to(gdm: usize) -> Harness {
        Harness::with_settings(OnChainSettings {
            membership_limits: MembershipLimits {
                gdm,
                ..MembershipLimits::default()
            },
            ..OnChainSettings::default()
        })
    }

    #[test]
    fn test_gdm_cap_admits_the_last_seat() {
        let harness = gdm_limited_to(4);
        let event = membership_event(MembershipOp::Invite, DAVE, ALICE, None);
        let outcome = harness.add(&event, &gdm_view(&[ALICE, BOB, CAROL])).unwrap();
        assert!(outcome.is_admissible());
    }

    #[test]
    fn test_gdm_cap_rejects_one_past_the_limit() {
        let harness = gdm_limited_to(4);
        let event = membership_event(MembershipOp::Invite, ERIN, ALICE, None);
        let err = harness
            .add(&event, &gdm_view(&[ALICE, BOB, CAROL, DAVE]))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert_eq!(err.tag_value("limit"), Some("4"));
    }

    #[test]
    fn test_unlimited_space_accepts_joins() {
        let harness = Harness::new();
        let members: Vec<Address> = (10u8..60).map(|b| Address([b; 20])).collect();
        let event = membership_event(MembershipOp::Join, ALICE, ALICE, None);
        assert!(harness.add(&event, &space_view(&members)).unwrap().is_admissible());
    }

    // =========================================================================
    // DM AND GDM PARTIES
    // =========================================================================

    #[test]
    fn test_dm_third_party_cannot_join() {
        let harness = Harness::new();
        let event = membership_event(MembershipOp::Join, CAROL, CAROL, None);
        let err = harness.add(&event, &dm_view(ALICE, BOB)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
    }

    #[test]
    fn test_dm_node_may_remove_a_party() {
        let harness = Harness::new();
        let event = membership_event(MembershipOp::Leave, BOB, NODE, None);
        let outcome = harness.add(&event, &dm_view(ALICE, BOB)).unwrap();
        assert_eq!(
            outcome,
            AddEventOutcome::Admissible {
                verifications: None,
                side_effects: None
            }
        );
    }

    #[test]
    fn test_gdm_join_requires_invitation() {
        let harness = Harness::new();
        let event = membership_event(MembershipOp::Join, DAVE, DAVE, None);
        let err = harness.add(&event, &gdm_view(&[ALICE, BOB, CAROL])).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);

        let invited = gdm_view(&[ALICE, BOB, CAROL]).with_member(DAVE, MembershipOp::Invite);
        assert!(harness.add(&event, &invited).unwrap().is_admissible());
    }

    #[test]
    fn test_gdm_outsider_cannot_invite() {
        let harness = Harness::new();
        let event = membership_event(MembershipOp::Invite, DAVE, ERIN, None);
        let err = harness.add(&event, &gdm_view(&[ALICE, BOB, CAROL])).unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
    }
}

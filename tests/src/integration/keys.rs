//! # Key Exchange Integration Tests

#[cfg(test)]
mod tests {
    use shared_types::{
        make_user_membership, ErrorCode, KeyFulfillment, KeySolicitation, MemberPayload,
        MembershipOp, MembershipReason, ParsedEvent, Payload, StreamEvent, StreamId,
    };
    use stream_rules::test_utils::{make_event, parse, GENESIS_MINIBLOCK_HASH};
    use stream_rules::{ChainAuthArgs, DerivedEvent, Permission};

    use crate::integration::fixtures::*;

    const DEVICE: &str = "device-alice-1";

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    fn solicitation(session_ids: &[&str], is_new_device: bool) -> KeySolicitation {
        KeySolicitation {
            device_key: DEVICE.to_string(),
            fallback_key: "fallback".to_string(),
            is_new_device,
            session_ids: ids(session_ids),
        }
    }

    fn solicit(creator: shared_types::Address, solicitation: KeySolicitation) -> ParsedEvent {
        make_event(creator, Payload::Member(MemberPayload::KeySolicitation(solicitation)))
    }

    fn fulfillment(session_ids: &[&str]) -> Payload {
        Payload::Member(MemberPayload::KeyFulfillment(KeyFulfillment {
            user_address: ALICE,
            device_key: DEVICE.to_string(),
            session_ids: ids(session_ids),
        }))
    }

    fn fulfill(session_ids: &[&str]) -> ParsedEvent {
        make_event(BOB, fulfillment(session_ids))
    }

    // =========================================================================
    // SOLICITATION
    // =========================================================================

    #[test]
    fn test_channel_solicitation_requires_read_and_names_compensation() {
        let harness = Harness::new();
        let outcome = harness
            .add(&solicit(ALICE, solicitation(&["s1", "s2"], false)), &channel_view(&[ALICE]))
            .unwrap();

        assert_eq!(
            outcome.chain_auth().map(|r| r.args().to_vec()),
            Some(vec![ChainAuthArgs::for_channel(space_id(), channel_id(), ALICE, Permission::Read)])
        );
        let compensation = outcome
            .side_effects()
            .and_then(|effects| effects.compensation_on_denial())
            .cloned();
        assert_eq!(
            compensation,
            Some(DerivedEvent::new(
                StreamId::user_stream(&ALICE),
                make_user_membership(
                    MembershipOp::Leave,
                    channel_id(),
                    Some(ALICE),
                    Some(space_id()),
                    MembershipReason::NotEntitled,
                ),
            ))
        );
    }

    #[test]
    fn test_dm_solicitation_needs_membership_only() {
        let harness = Harness::new();
        let outcome = harness
            .add(&solicit(ALICE, solicitation(&["s1"], false)), &dm_view(ALICE, BOB))
            .unwrap();
        assert!(outcome.is_admissible());
        assert!(outcome.chain_auth().is_none());
        assert!(outcome.side_effects().is_none());
    }

    #[test]
    fn test_solicitation_session_ids_are_validated() {
        let harness = Harness::new();
        let view = dm_view(ALICE, BOB);
        for bad in [&[][..], &["b", "a"][..], &["", "a"][..]] {
            let err = harness
                .add(&solicit(ALICE, solicitation(bad, false)), &view)
                .unwrap_err();
            assert_eq!(err.code(), ErrorCode::InvalidArgument, "session ids {bad:?}");
        }
    }

    #[test]
    fn test_non_member_solicitation_is_denied_before_validation() {
        let harness = Harness::new();
        let err = harness
            .add(&solicit(CAROL, solicitation(&["b", "a"], false)), &dm_view(ALICE, BOB))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
    }

    // =========================================================================
    // FULFILLMENT
    // =========================================================================

    #[test]
    fn test_fulfillment_must_overlap_the_solicitation() {
        let harness = Harness::new();
        let view = dm_view(ALICE, BOB).with_key_solicitation(ALICE, solicitation(&["s1", "s3"], false));

        assert!(harness.add(&fulfill(&["s0", "s3"]), &view).unwrap().is_admissible());

        let err = harness.add(&fulfill(&["s2", "s4"]), &view).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn test_new_device_accepts_any_sessions() {
        let harness = Harness::new();
        let view = dm_view(ALICE, BOB).with_key_solicitation(ALICE, solicitation(&["s1"], true));
        assert!(harness.add(&fulfill(&["s9"]), &view).unwrap().is_admissible());
    }

    #[test]
    fn test_fulfillment_for_unknown_device_is_invalid() {
        let harness = Harness::new();
        let err = harness.add(&fulfill(&["s1"]), &dm_view(ALICE, BOB)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_ephemeral_fulfillment_skips_the_solicitation_check() {
        let harness = Harness::new();
        let event = parse(
            StreamEvent::new(BOB, fulfillment(&["s1"]))
                .with_prev_miniblock(0, GENESIS_MINIBLOCK_HASH)
                .ephemeral(),
        );
        assert!(harness.add(&event, &dm_view(ALICE, BOB)).unwrap().is_admissible());
    }

    #[test]
    fn test_fulfillment_session_ids_must_be_sorted() {
        let harness = Harness::new();
        let view = dm_view(ALICE, BOB).with_key_solicitation(ALICE, solicitation(&["s1", "s2"], false));
        let err = harness.add(&fulfill(&["s2", "s1"]), &view).unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
    }

    #[test]
    fn test_non_member_fulfillment_is_denied_before_validation() {
        let harness = Harness::new();
        let view = dm_view(ALICE, BOB).with_key_solicitation(ALICE, solicitation(&["s1", "s2"], false));
        let err = harness
            .add(&make_event(CAROL, fulfillment(&["s2", "s1"])), &view)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::PermissionDenied);
    }

    #[test]
    fn test_applied_fulfillment_consumes_sessions() {
        let harness = Harness::new();
        let mut view = gdm_view(&[ALICE, BOB, CAROL]);
        let request = solicit(ALICE, solicitation(&["s1"], false));
        assert!(harness.add(&request, &view).unwrap().is_admissible());
        view.apply(&request);

        let first = fulfill(&["s1"]);
        assert!(harness.add(&first, &view).unwrap().is_admissible());
        view.apply(&first);

        let again = make_event(CAROL, fulfillment(&["s1"]));
        let err = harness.add(&again, &view).unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
}

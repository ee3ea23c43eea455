//! # Entitlement Evaluation Tests
//!
//! The engines only describe chain auth; these tests play the host, resolve
//! the requirement against a mock registry and act on the result.

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use shared_types::{
        EncryptedData, KeySolicitation, MemberPayload, MembershipOp, Payload, ProtocolResult,
        SpacePayload, StreamId,
    };
    use stream_rules::ports::{EntitlementEvaluator, EntitlementVerdict};
    use stream_rules::test_utils::make_event;
    use stream_rules::{ChainAuthArgs, Permission};

    use crate::integration::fixtures::*;

    /// Grants exactly the listed permissions; everything else is denied.
    struct MockRegistry {
        grants: BTreeSet<(shared_types::Address, &'static str)>,
    }

    impl MockRegistry {
        fn granting(grants: &[(shared_types::Address, Permission)]) -> Self {
            Self {
                grants: grants.iter().map(|(who, p)| (*who, p.as_str())).collect(),
            }
        }
    }

    impl EntitlementEvaluator for MockRegistry {
        fn evaluate(&self, args: &ChainAuthArgs) -> ProtocolResult<EntitlementVerdict> {
            let Some(permission) = args.permission() else {
                return Ok(EntitlementVerdict::denied(format!("unsupported query {args}")));
            };
            if self.grants.contains(&(*args.principal(), permission.as_str())) {
                Ok(EntitlementVerdict::allowed())
            } else {
                Ok(EntitlementVerdict::denied(format!("{} lacks {permission}", args.principal())))
            }
        }
    }

    #[test]
    fn test_reaction_permission_is_enough_to_post() {
        let harness = Harness::new();
        let outcome = harness.add(&message(ALICE), &channel_view(&[ALICE])).unwrap();
        let requirement = outcome.chain_auth().expect("channel messages need chain auth");

        let reactor = MockRegistry::granting(&[(ALICE, Permission::React)]);
        assert!(requirement.evaluate(&reactor).unwrap().allowed);

        let nobody = MockRegistry::granting(&[]);
        let verdict = requirement.evaluate(&nobody).unwrap();
        assert!(!verdict.allowed);
        assert!(verdict.reason.is_some());
    }

    #[test]
    fn test_space_image_denied_without_settings_permission() {
        let harness = Harness::new();
        let event = make_event(ALICE, Payload::Space(SpacePayload::SpaceImage(EncryptedData::default())));
        let outcome = harness.add(&event, &space_view(&[ALICE])).unwrap();
        let requirement = outcome.chain_auth().expect("space image needs chain auth");

        let writer = MockRegistry::granting(&[(ALICE, Permission::Write)]);
        assert!(!requirement.evaluate(&writer).unwrap().allowed);
        let admin = MockRegistry::granting(&[(ALICE, Permission::ModifySpaceSettings)]);
        assert!(requirement.evaluate(&admin).unwrap().allowed);
    }

    #[test]
    fn test_denied_solicitation_removes_the_member() {
        let harness = Harness::new();
        let solicitation = make_event(
            ALICE,
            Payload::Member(MemberPayload::KeySolicitation(KeySolicitation {
                device_key: "device".to_string(),
                fallback_key: "fallback".to_string(),
                is_new_device: true,
                session_ids: vec!["s1".to_string()],
            })),
        );
        let outcome = harness.add(&solicitation, &channel_view(&[ALICE])).unwrap();
        let verdict = outcome
            .chain_auth()
            .expect("channel solicitation needs chain auth")
            .evaluate(&MockRegistry::granting(&[]))
            .unwrap();
        assert!(!verdict.allowed);

        // The host appends the compensation instead of the solicitation.
        let compensation = outcome
            .side_effects()
            .and_then(|effects| effects.compensation_on_denial())
            .expect("compensating leave");
        assert_eq!(compensation.stream_id, StreamId::user_stream(&ALICE));

        let user = user_view(ALICE, None).with_user_membership(channel_id(), MembershipOp::Join);
        let leave = make_event(NODE, compensation.payload.clone());
        let cascade = harness.add(&leave, &user).unwrap();
        let parent = cascade.required_parent_event().expect("leave mirrored into the channel");
        assert_eq!(parent.stream_id, channel_id());
        assert_eq!(parent.payload.membership().map(|m| m.op), Some(MembershipOp::Leave));
        assert_eq!(parent.payload.membership().map(|m| m.user_address), Some(ALICE));
    }
}

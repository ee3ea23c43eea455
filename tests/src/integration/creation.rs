//! # Stream Creation Integration Tests
//!
//! Creation through the service: bundle shapes, media owners and the
//! derived events a host appends afterwards.

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use shared_types::{
        make_member_membership, ChannelInception, ChannelOp, ChannelPayload, ErrorCode,
        GdmChannelInception, GdmChannelPayload, MediaChunk, MediaInception, MediaPayload,
        MembershipOp, MembershipReason, ParsedEvent, Payload, SpacePayload, StreamId, StreamKind,
        UserMetadataInception, UserMetadataPayload,
    };
    use stream_rules::domain::create_stream::APP_ADDRESS_METADATA_KEY;
    use stream_rules::test_utils::{make_inception_event, opaque_stream_id};
    use stream_rules::{ChainAuthArgs, OnChainSettings, Permission};

    use crate::integration::fixtures::*;

    fn join(creator: shared_types::Address, user: shared_types::Address, parent: Option<StreamId>) -> ParsedEvent {
        make_inception_event(
            creator,
            make_member_membership(MembershipOp::Join, user, creator, parent, MembershipReason::None, None),
        )
    }

    // =========================================================================
    // CHANNELS
    // =========================================================================

    #[test]
    fn test_channel_creation_announces_itself_in_the_space() {
        let harness = Harness::new();
        let events = vec![
            make_inception_event(
                ALICE,
                Payload::Channel(ChannelPayload::Inception(ChannelInception {
                    stream_id: channel_id(),
                    space_id: space_id(),
                    channel_properties: None,
                    settings: None,
                })),
            ),
            join(ALICE, ALICE, Some(space_id())),
        ];
        let rules = harness.create(&channel_id(), &events).unwrap();

        assert_eq!(
            rules.chain_auth,
            Some(ChainAuthArgs::for_space(space_id(), ALICE, Permission::AddRemoveChannels))
        );
        assert_eq!(rules.required_memberships, vec![space_id()]);
        let Payload::Space(SpacePayload::Channel(update)) = &rules.derived_events[0].payload else {
            panic!("expected a space channel update");
        };
        assert_eq!(update.op, ChannelOp::Created);
        assert_eq!(update.channel_id, channel_id());
        let origin = update.origin_event.as_ref().expect("origin event");
        assert_eq!(origin.hash, events[0].hash);
    }

    #[test]
    fn test_gdm_bundle_needs_creator_and_two_others() {
        let harness = Harness::new();
        let inception = make_inception_event(
            ALICE,
            Payload::GdmChannel(GdmChannelPayload::Inception(GdmChannelInception {
                stream_id: gdm_id(),
                channel_properties: None,
                settings: None,
            })),
        );
        let short = vec![inception.clone(), join(ALICE, ALICE, None), join(ALICE, BOB, None)];
        let err = harness.create(&gdm_id(), &short).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadStreamCreationParams);

        let full = vec![
            inception,
            join(ALICE, ALICE, None),
            join(ALICE, BOB, None),
            join(ALICE, CAROL, None),
        ];
        let rules = harness.create(&gdm_id(), &full).unwrap();
        assert_eq!(
            rules.required_user_streams,
            vec![StreamId::user_stream(&BOB), StreamId::user_stream(&CAROL)]
        );
    }

    // =========================================================================
    // MEDIA
    // =========================================================================

    fn media_id() -> StreamId {
        opaque_stream_id(StreamKind::Media, 0x3c)
    }

    fn media(channel_id: Option<StreamId>, space_id: Option<StreamId>, user_id: Option<shared_types::Address>) -> MediaInception {
        MediaInception {
            stream_id: media_id(),
            channel_id,
            space_id,
            user_id,
            chunk_count: 3,
            per_chunk_encryption: false,
            settings: None,
        }
    }

    fn media_bundle(inception: MediaInception, chunk: Option<MediaChunk>) -> Vec<ParsedEvent> {
        let mut events = vec![make_inception_event(
            ALICE,
            Payload::Media(MediaPayload::Inception(inception)),
        )];
        events.extend(
            chunk.map(|chunk| make_inception_event(ALICE, Payload::Media(MediaPayload::Chunk(chunk)))),
        );
        events
    }

    #[test]
    fn test_channel_media_requires_write() {
        let harness = Harness::new();
        let events = media_bundle(media(Some(channel_id()), Some(space_id()), None), None);
        let rules = harness.create(&media_id(), &events).unwrap();
        assert_eq!(
            rules.chain_auth,
            Some(ChainAuthArgs::for_channel(space_id(), channel_id(), ALICE, Permission::Write))
        );
        assert!(rules.derived_events.is_empty());
    }

    #[test]
    fn test_channel_media_without_space_is_rejected() {
        let harness = Harness::new();
        let events = media_bundle(media(Some(channel_id()), None, None), None);
        let err = harness.create(&media_id(), &events).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadStreamCreationParams);
    }

    #[test]
    fn test_space_media_requires_settings_permission() {
        let harness = Harness::new();
        let events = media_bundle(media(None, Some(space_id()), None), None);
        let rules = harness.create(&media_id(), &events).unwrap();
        assert_eq!(
            rules.chain_auth,
            Some(ChainAuthArgs::for_space(space_id(), ALICE, Permission::ModifySpaceSettings))
        );
    }

    #[test]
    fn test_user_media_belongs_to_its_creator() {
        let harness = Harness::new();
        let rules = harness
            .create(&media_id(), &media_bundle(media(None, None, Some(ALICE)), None))
            .unwrap();
        assert!(rules.chain_auth.is_none());

        let err = harness
            .create(&media_id(), &media_bundle(media(None, None, Some(BOB)), None))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadStreamCreationParams);

        let err = harness
            .create(&media_id(), &media_bundle(media(None, None, None), None))
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadStreamCreationParams);
    }

    #[test]
    fn test_dm_media_requires_dm_membership() {
        let harness = Harness::new();
        let dm = StreamId::dm_between(&ALICE, &BOB);
        let rules = harness
            .create(&media_id(), &media_bundle(media(Some(dm.clone()), None, None), None))
            .unwrap();
        assert!(rules.chain_auth.is_none());
        assert_eq!(rules.required_memberships, vec![dm]);
    }

    #[test]
    fn test_media_chunk_count_is_bounded() {
        let harness = Harness::with_settings(OnChainSettings {
            media_max_chunk_count: 3,
            ..OnChainSettings::default()
        });
        let mut inception = media(None, None, Some(ALICE));
        assert!(harness.create(&media_id(), &media_bundle(inception.clone(), None)).is_ok());

        inception.chunk_count = 4;
        let err = harness.create(&media_id(), &media_bundle(inception.clone(), None)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadStreamCreationParams);
        assert_eq!(err.tag_value("max"), Some("3"));

        inception.chunk_count = 0;
        let err = harness.create(&media_id(), &media_bundle(inception, None)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadStreamCreationParams);
    }

    #[test]
    fn test_first_chunk_is_validated() {
        let harness = Harness::with_settings(OnChainSettings {
            media_max_chunk_size: 16,
            ..OnChainSettings::default()
        });
        let inception = media(None, None, Some(ALICE));
        let chunk = |index, len| MediaChunk {
            data: vec![1; len],
            chunk_index: index,
            iv: Vec::new(),
        };

        let ok = media_bundle(inception.clone(), Some(chunk(0, 16)));
        assert!(harness.create(&media_id(), &ok).is_ok());

        for bad in [chunk(3, 4), chunk(0, 17)] {
            let events = media_bundle(inception.clone(), Some(bad));
            let err = harness.create(&media_id(), &events).unwrap_err();
            assert_eq!(err.code(), ErrorCode::BadStreamCreationParams);
            assert!(err.tag_value("cause").is_some());
        }
    }

    // =========================================================================
    // USER STREAMS
    // =========================================================================

    #[test]
    fn test_user_metadata_stream_for_app_via_request_metadata() {
        let harness = Harness::new();
        let stream_id = StreamId::for_address(StreamKind::UserMetadata, &ALICE).unwrap();
        let events = vec![make_inception_event(
            ALICE,
            Payload::UserMetadata(UserMetadataPayload::Inception(UserMetadataInception {
                stream_id: stream_id.clone(),
                settings: None,
            })),
        )];
        let metadata = BTreeMap::from([(APP_ADDRESS_METADATA_KEY.to_string(), APP.as_slice().to_vec())]);
        let rules = harness.create_with_metadata(&stream_id, &events, &metadata).unwrap();
        assert_eq!(rules.chain_auth, Some(ChainAuthArgs::for_is_app(ALICE, APP)));

        let truncated = BTreeMap::from([(APP_ADDRESS_METADATA_KEY.to_string(), vec![0x99; 19])]);
        let err = harness.create_with_metadata(&stream_id, &events, &truncated).unwrap_err();
        assert_eq!(err.code(), ErrorCode::BadStreamCreationParams);
    }
}

//! # Configuration Integration Tests
//!
//! Settings arrive as JSON from the host; invalid snapshots never reach
//! the engines.

#[cfg(test)]
mod tests {
    use shared_types::MembershipOp;
    use stream_rules::adapters::{StaticChainConfig, ValidNodes};
    use stream_rules::ports::OnChainConfiguration;
    use stream_rules::{ConfigError, MembershipLimits, OnChainSettings, RulesConfig, StreamRulesService};

    use crate::integration::fixtures::*;

    #[test]
    fn test_settings_load_from_partial_json() {
        let settings: OnChainSettings = serde_json::from_str(
            r#"{ "media_max_chunk_count": 8, "membership_limits": { "space": 1000 } }"#,
        )
        .unwrap();
        assert_eq!(settings.media_max_chunk_count, 8);
        assert_eq!(settings.media_max_chunk_size, OnChainSettings::default().media_max_chunk_size);
        assert_eq!(
            settings.membership_limits,
            MembershipLimits {
                space: 1000,
                ..MembershipLimits::default()
            }
        );

        let config = StaticChainConfig::new(settings.clone()).unwrap();
        assert_eq!(config.get(), settings);
    }

    #[test]
    fn test_rules_config_round_trips_through_json() {
        let config = RulesConfig {
            require_non_app_dm_creators: true,
            ..RulesConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<RulesConfig>(&json).unwrap(), config);
        assert_eq!(serde_json::from_str::<RulesConfig>("{}").unwrap(), RulesConfig::default());
    }

    #[test]
    fn test_invalid_snapshots_are_refused() {
        let mut settings = OnChainSettings::default();
        settings.membership_limits.dm = 1;
        assert_eq!(StaticChainConfig::new(settings), Err(ConfigError::DmLimitTooSmall));

        let settings = OnChainSettings {
            media_max_chunk_count: 0,
            ..OnChainSettings::default()
        };
        assert_eq!(
            StaticChainConfig::new(settings),
            Err(ConfigError::ZeroLimit {
                field: "media_max_chunk_count"
            })
        );
    }

    #[test]
    fn test_service_rejects_an_empty_shard_mask() {
        let config = RulesConfig {
            metadata_shard_mask: 0,
            ..RulesConfig::default()
        };
        let result = StreamRulesService::new(config, StaticChainConfig::default(), ValidNodes::new([NODE]));
        assert!(matches!(result, Err(ConfigError::EmptyShardMask)));
    }

    #[test]
    fn test_dm_limit_of_zero_is_unlimited() {
        let mut settings = OnChainSettings::default();
        settings.membership_limits.dm = 0;
        let harness = Harness::with_settings(settings);
        let view = dm_view(ALICE, BOB).with_member(ALICE, MembershipOp::Leave);
        let event = membership_event(MembershipOp::Join, ALICE, ALICE, None);
        assert!(harness.add(&event, &view).unwrap().is_admissible());
    }
}

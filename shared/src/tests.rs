#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use crate::election::{ElectionConfig, ElectionConfigError};
    use time::OffsetDateTime;
    use crate::models::{BallotResponse, RegisterVoterRequest, Selections, TallyRecord};
    use crate::tally::{compute_shares, position_results};
    use crate::validation::{normalize_email, validate_email, validate_registration, validate_selections, ValidationError};

    const ELECTION: &str = r#"{
        "version": 1,
        "title": "Student Union Election",
        "positions": [
            {"id": "president", "title": "President", "candidates": [
                {"id": "1", "name": "Ada"}, {"id": "2", "name": "Grace"}
            ]},
            {"id": "vicePresident", "title": "Vice President", "candidates": [
                {"id": "3", "name": "Linus"}
            ]},
            {"id": "secretary", "title": "Secretary", "candidates": [
                {"id": "4", "name": "Barbara"}, {"id": "5", "name": "Edsger"}
            ]}
        ]
    }"#;

    fn election() -> ElectionConfig {
        ElectionConfig::from_json(ELECTION).unwrap()
    }

    fn selections(pairs: &[(&str, &str)]) -> Selections {
        pairs.iter().map(|(p, c)| (p.to_string(), c.to_string())).collect()
    }

    fn tally(position: &str, counts: &[(&str, u64)]) -> TallyRecord {
        TallyRecord {
            position: position.to_string(),
            counts: counts.iter().map(|(c, n)| (c.to_string(), *n)).collect::<BTreeMap<_, _>>(),
        }
    }

    fn registration(email: &str, phone: &str) -> RegisterVoterRequest {
        RegisterVoterRequest {
            email: email.into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            phone_number: phone.into(),
        }
    }

    #[test]
    fn test_election_config_loading() {
        let config = election();
        assert_eq!(config.version, 1);
        assert_eq!(config.position_ids().collect::<Vec<_>>(), vec!["president", "vicePresident", "secretary"]);
        assert_eq!(config.position("secretary").unwrap().candidate("5").unwrap().name, "Edsger");
        assert!(config.position("treasurer").is_none());
    }

    #[test]
    fn test_election_config_rejects_bad_definitions() {
        let empty = r#"{"version": 1, "title": "x", "positions": []}"#;
        assert_eq!(ElectionConfig::from_json(empty), Err(ElectionConfigError::NoPositions));

        let no_candidates = r#"{"version": 1, "title": "x", "positions": [
            {"id": "president", "title": "P", "candidates": []}
        ]}"#;
        assert!(matches!(ElectionConfig::from_json(no_candidates), Err(ElectionConfigError::NoCandidates(p)) if p == "president"));

        let duplicate = r#"{"version": 1, "title": "x", "positions": [
            {"id": "president", "title": "P", "candidates": [{"id": "1", "name": "A"}, {"id": "1", "name": "B"}]}
        ]}"#;
        assert!(matches!(ElectionConfig::from_json(duplicate), Err(ElectionConfigError::DuplicateCandidate { .. })));

        let twice = r#"{"version": 1, "title": "x", "positions": [
            {"id": "president", "title": "P", "candidates": [{"id": "1", "name": "A"}]},
            {"id": "president", "title": "P", "candidates": [{"id": "2", "name": "B"}]}
        ]}"#;
        assert!(matches!(ElectionConfig::from_json(twice), Err(ElectionConfigError::DuplicatePosition(_))));

        assert!(matches!(ElectionConfig::from_json("not json"), Err(ElectionConfigError::Malformed(_))));
    }

    #[test]
    fn test_email_validation() {
        assert_eq!(normalize_email("  A@X.com "), "a@x.com");
        assert!(validate_email("a@x.com").is_ok());
        assert!(validate_email("first.last@mail.example.org").is_ok());

        for bad in ["", "ax.com", "a@", "@x.com", "a@x", "a@@x.com", "a b@x.com", "a@x..com"] {
            assert_eq!(validate_email(bad), Err(ValidationError::InvalidEmail), "{bad}");
        }
    }

    #[test]
    fn test_registration_validation() {
        assert!(validate_registration(&registration("a@x.com", "+234 (801) 234-5678")).is_ok());
        assert_eq!(validate_registration(&registration("nope", "08012345678")), Err(ValidationError::InvalidEmail));
        assert_eq!(validate_registration(&registration("a@x.com", "123")), Err(ValidationError::InvalidPhone));
        assert_eq!(validate_registration(&registration("a@x.com", "call-me-now")), Err(ValidationError::InvalidPhone));

        let mut nameless = registration("a@x.com", "08012345678");
        nameless.last_name = "   ".into();
        assert_eq!(validate_registration(&nameless), Err(ValidationError::InvalidName));
    }

    #[test]
    fn test_complete_ballot() {
        let config = election();
        let ballot = selections(&[("president", "1"), ("vicePresident", "3"), ("secretary", "4")]);
        assert!(validate_selections(&config, &ballot).is_ok());
    }

    #[test]
    fn test_incomplete_ballots() {
        let config = election();

        let missing = selections(&[("president", "1"), ("secretary", "4")]);
        assert_eq!(
            validate_selections(&config, &missing),
            Err(ValidationError::MissingSelection("vicePresident".into()))
        );

        let blank = selections(&[("president", "1"), ("vicePresident", "  "), ("secretary", "4")]);
        assert_eq!(
            validate_selections(&config, &blank),
            Err(ValidationError::MissingSelection("vicePresident".into()))
        );

        let wrong_position = selections(&[("president", "3"), ("vicePresident", "3"), ("secretary", "4")]);
        assert!(matches!(
            validate_selections(&config, &wrong_position),
            Err(ValidationError::UnknownCandidate { position, .. }) if position == "president"
        ));

        let extra = selections(&[("president", "1"), ("vicePresident", "3"), ("secretary", "4"), ("treasurer", "9")]);
        assert_eq!(
            validate_selections(&config, &extra),
            Err(ValidationError::UnknownPosition("treasurer".into()))
        );
    }

    #[test]
    fn test_shares_follow_configured_order() {
        let config = election();
        let position = config.position("president").unwrap();
        let shares = compute_shares(position, &tally("president", &[("2", 3), ("1", 1)]));

        assert_eq!(shares.iter().map(|s| s.candidate_id.as_str()).collect::<Vec<_>>(), vec!["1", "2"]);
        assert_eq!(shares[0].count, 1);
        assert_eq!(shares[1].count, 3);
        assert!((shares[0].share - 0.25).abs() < f64::EPSILON);
        assert!((shares[1].share - 0.75).abs() < f64::EPSILON);
        assert_eq!(shares[1].percentage, 75.0);
    }

    #[test]
    fn test_zero_tally_yields_zero_shares() {
        let config = election();
        let position = config.position("secretary").unwrap();

        for record in [TallyRecord::empty("secretary"), tally("secretary", &[("4", 0), ("5", 0)])] {
            let shares = compute_shares(position, &record);
            assert_eq!(shares.len(), 2);
            assert!(shares.iter().all(|s| s.count == 0 && s.share == 0.0 && !s.share.is_nan()));
        }
    }

    #[test]
    fn test_unconfigured_candidates_count_toward_total() {
        let config = election();
        let position = config.position("vicePresident").unwrap();
        let results = position_results(position, &tally("vicePresident", &[("3", 1), ("retired", 1)]));

        assert_eq!(results.total_votes, 2);
        assert_eq!(results.candidates.len(), 1);
        assert_eq!(results.candidates[0].percentage, 50.0);
    }

    #[test]
    fn test_percentage_rounding() {
        let config = election();
        let position = config.position("secretary").unwrap();
        let shares = compute_shares(position, &tally("secretary", &[("4", 1), ("5", 2)]));
        assert_eq!(shares[0].percentage, 33.3);
        assert_eq!(shares[1].percentage, 66.7);
    }

    #[test]
    fn test_ballot_response_timestamp_format() {
        let response = BallotResponse { success: true, voted_at: OffsetDateTime::UNIX_EPOCH };
        let json = serde_json::to_string(&response).unwrap();
        assert_eq!(json, r#"{"success":true,"votedAt":"1970-01-01T00:00:00Z"}"#);
        assert_eq!(serde_json::from_str::<BallotResponse>(&json).unwrap(), response);
    }
}

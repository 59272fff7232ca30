/// Checkpoint id: `cp_<ulid>`. ULIDs sort by creation time.
pub fn new_checkpoint_id() -> String {
    format!("cp_{}", ulid::Ulid::new().to_string().to_lowercase())
}

/// Session id: `ses_<ulid>`.
pub fn new_session_id() -> String {
    format!("ses_{}", ulid::Ulid::new().to_string().to_lowercase())
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .expect("RFC3339 formatting should not fail")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_carry_prefix_and_are_unique() {
        let a = new_checkpoint_id();
        let b = new_checkpoint_id();
        assert!(a.starts_with("cp_"));
        assert_ne!(a, b);
        assert!(new_session_id().starts_with("ses_"));
    }

    #[test]
    fn timestamps_parse_back() {
        let ts = now_rfc3339();
        assert!(time::OffsetDateTime::parse(
            &ts,
            &time::format_description::well_known::Rfc3339
        )
        .is_ok());
    }
}

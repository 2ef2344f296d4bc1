//! Status state machine (§4.2). A table keyed by status mapping to the set
//! of allowed successors — data, not a switch statement (§9).

use consult_core::error::ConsultError;

use crate::types::SessionStatus;

fn allowed_targets(from: SessionStatus) -> &'static [SessionStatus] {
    use SessionStatus::*;
    match from {
        Active => &[Paused, Reviewing, Declined],
        Paused => &[Active, Declined],
        Reviewing => &[Confirmed, Declined],
        Confirmed => &[],
        Declined => &[],
    }
}

/// Validate a transition. Succeeds silently; fails with `InvalidTransition`
/// carrying both endpoints.
pub fn validate_transition(from: SessionStatus, to: SessionStatus) -> Result<(), ConsultError> {
    if allowed_targets(from).contains(&to) {
        Ok(())
    } else {
        Err(ConsultError::InvalidTransition {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        })
    }
}

/// True iff `status` has no outgoing transitions (§4.2: `confirmed`, `declined`).
pub fn is_terminal(status: SessionStatus) -> bool {
    allowed_targets(status).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionStatus::*;

    #[test]
    fn active_can_pause_review_or_decline() {
        assert!(validate_transition(Active, Paused).is_ok());
        assert!(validate_transition(Active, Reviewing).is_ok());
        assert!(validate_transition(Active, Declined).is_ok());
        assert!(validate_transition(Active, Confirmed).is_err());
    }

    #[test]
    fn paused_can_resume_or_decline() {
        assert!(validate_transition(Paused, Active).is_ok());
        assert!(validate_transition(Paused, Declined).is_ok());
        assert!(validate_transition(Paused, Reviewing).is_err());
    }

    #[test]
    fn reviewing_can_confirm_or_decline() {
        assert!(validate_transition(Reviewing, Confirmed).is_ok());
        assert!(validate_transition(Reviewing, Declined).is_ok());
        assert!(validate_transition(Reviewing, Active).is_err());
    }

    #[test]
    fn terminal_states_admit_nothing() {
        for s in [Confirmed, Declined] {
            assert!(is_terminal(s));
            for t in [Active, Paused, Reviewing, Confirmed, Declined] {
                assert!(validate_transition(s, t).is_err());
            }
        }
    }

    #[test]
    fn non_terminal_states_are_not_terminal() {
        assert!(!is_terminal(Active));
        assert!(!is_terminal(Paused));
        assert!(!is_terminal(Reviewing));
    }

    #[test]
    fn invalid_transition_error_carries_both_endpoints() {
        let err = validate_transition(Confirmed, Active).unwrap_err();
        match err {
            ConsultError::InvalidTransition { from, to } => {
                assert_eq!(from, "confirmed");
                assert_eq!(to, "active");
            }
            _ => panic!("wrong error variant"),
        }
    }
}

//! Case status transitions
//!
//! ```text
//! open ──(lead purchase)──> accepted ──> in_progress ──> closed
//!   │                          │                           ▲
//!   └──(client withdraws)──────┴───────────────────────────┘
//! ```

use shared_types::CaseStatus;
use thiserror::Error;

/// Who is asking for the transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// The client who filed the case
    Client,
    /// The attorney holding the lead purchase
    Attorney,
    Admin,
    /// Internal transitions driven by purchases
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("Cannot move case from {from} to {to}")]
    Invalid { from: CaseStatus, to: CaseStatus },

    #[error("Not permitted to move case from {from} to {to}")]
    Forbidden { from: CaseStatus, to: CaseStatus },
}

/// Whether the state machine allows `from -> to` at all
pub fn is_valid_transition(from: CaseStatus, to: CaseStatus) -> bool {
    use CaseStatus::*;
    matches!(
        (from, to),
        (Open, Accepted)
            | (Open, Closed)
            | (Accepted, InProgress)
            | (Accepted, Closed)
            | (InProgress, Closed)
    )
}

fn actor_may(actor: Actor, from: CaseStatus, to: CaseStatus) -> bool {
    use CaseStatus::*;
    match actor {
        Actor::Admin => true,
        Actor::System => matches!((from, to), (Open, Accepted)),
        Actor::Client => to == Closed,
        Actor::Attorney => matches!((from, to), (Accepted, InProgress) | (_, Closed)) && from != Open,
    }
}

/// Check a requested transition and return the new status
pub fn transition(
    from: CaseStatus,
    to: CaseStatus,
    actor: Actor,
) -> Result<CaseStatus, TransitionError> {
    if !is_valid_transition(from, to) {
        return Err(TransitionError::Invalid { from, to });
    }
    // Accepting a lead goes through the purchase flow only
    if to == CaseStatus::Accepted && actor != Actor::System {
        return Err(TransitionError::Forbidden { from, to });
    }
    if !actor_may(actor, from, to) {
        return Err(TransitionError::Forbidden { from, to });
    }
    Ok(to)
}

/// Open cases are the only ones listed as leads
pub fn is_lead(status: CaseStatus) -> bool {
    status == CaseStatus::Open
}

#[cfg(test)]
mod tests {
    use super::*;
    use CaseStatus::*;

    #[test]
    fn test_purchase_accepts_open_case() {
        assert_eq!(transition(Open, Accepted, Actor::System), Ok(Accepted));
    }

    #[test]
    fn test_accept_only_through_purchase() {
        assert_eq!(
            transition(Open, Accepted, Actor::Admin),
            Err(TransitionError::Forbidden {
                from: Open,
                to: Accepted
            })
        );
        assert!(transition(Open, Accepted, Actor::Attorney).is_err());
    }

    #[test]
    fn test_client_can_withdraw_or_close() {
        assert_eq!(transition(Open, Closed, Actor::Client), Ok(Closed));
        assert_eq!(transition(InProgress, Closed, Actor::Client), Ok(Closed));
        assert!(transition(Accepted, InProgress, Actor::Client).is_err());
    }

    #[test]
    fn test_attorney_moves_work_forward() {
        assert_eq!(
            transition(Accepted, InProgress, Actor::Attorney),
            Ok(InProgress)
        );
        assert_eq!(transition(InProgress, Closed, Actor::Attorney), Ok(Closed));
        assert!(transition(Open, Closed, Actor::Attorney).is_err());
    }

    #[test]
    fn test_closed_is_terminal() {
        for to in [Open, Accepted, InProgress, Closed] {
            assert_eq!(
                transition(Closed, to, Actor::Admin),
                Err(TransitionError::Invalid { from: Closed, to })
            );
        }
    }

    #[test]
    fn test_no_backwards_moves() {
        assert!(!is_valid_transition(InProgress, Accepted));
        assert!(!is_valid_transition(Accepted, Open));
    }

    #[test]
    fn test_only_open_cases_are_leads() {
        assert!(is_lead(Open));
        assert!(!is_lead(Accepted));
    }
}

use super::types::GamePhase;

/// A rejected player action. The state is never touched when one is returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("not this seat's turn")]
    NotYourTurn,
    #[error("tile is not in the seat's hand")]
    TileNotInHand,
    #[error("seat already discarded this turn")]
    AlreadyDiscarded,
    #[error("seat already drew this turn")]
    AlreadyDrawn,
    #[error("seat must draw before discarding")]
    MustDrawFirst,
    #[error("no claim window is open")]
    NotClaiming,
    #[error("claim window already resolved or decided")]
    ClaimAlreadyResolved,
    #[error("seat has no claim option on this tile")]
    NotEligible,
    #[error("no listen decision is pending for this seat")]
    NotTingWindow,
    #[error("tile cannot form a kong")]
    InvalidKong,
    #[error("action not allowed in the current phase")]
    WrongPhase,
    #[error("round is over")]
    RoundOver,
    #[error("hand does not validate")]
    ValidationFailed,
}

impl ActionError {
    /// Stable machine-readable code sent to clients.
    pub fn code(&self) -> &'static str {
        match self {
            ActionError::NotYourTurn => "NOT_YOUR_TURN",
            ActionError::TileNotInHand => "TILE_NOT_IN_HAND",
            ActionError::AlreadyDiscarded => "ALREADY_DISCARDED",
            ActionError::AlreadyDrawn => "ALREADY_DRAWN",
            ActionError::MustDrawFirst => "MUST_DRAW_FIRST",
            ActionError::NotClaiming => "NOT_CLAIMING",
            ActionError::ClaimAlreadyResolved => "CLAIM_ALREADY_RESOLVED",
            ActionError::NotEligible => "NOT_ELIGIBLE",
            ActionError::NotTingWindow => "NOT_TING_WINDOW",
            ActionError::InvalidKong => "INVALID_KONG",
            ActionError::WrongPhase => "WRONG_PHASE",
            ActionError::RoundOver => "ROUND_OVER",
            ActionError::ValidationFailed => "VALIDATION_FAILED",
        }
    }

    /// Validator disagreements are answered with a snapshot only.
    pub fn is_silent(&self) -> bool {
        matches!(self, ActionError::ValidationFailed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("invalid phase transition {from:?} -> {to:?}")]
    InvalidTransition { from: GamePhase, to: GamePhase },
    #[error("invariant violated: {0}")]
    InvariantViolation(&'static str),
}

pub trait InvariantCheck {
    fn validate_invariants(&self) -> Result<(), StateError>;
}

// Public API - what other modules can use
pub use ball::{BallCall, BallInput, BallRecord, WicketKind};
pub use dls::DlsComputation;
pub use innings::{accumulate, Extras, Innings, InningsSelector, InningsStatus, InningsTotals};
pub use session::{
    BallDiff, InningsView, MatchConfig, MatchScoringSession, MatchState, ScoringError,
};

// Internal modules
mod ball;
pub mod dls;
mod innings;
mod session;

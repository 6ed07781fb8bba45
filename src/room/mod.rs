// Match room components
//
// Each live match is owned by one room task; every scoring command for a
// match funnels through that task's queue, so mutations apply strictly in
// arrival order and the session never needs a lock.

// Public API - what other modules can use
pub use broadcaster::{spawn_match_room, MatchRoomHandle, RoomError};
pub use registry::MatchRegistry;
pub use types::{
    ClientRole, CreateMatchRequest, DlsComputeRequest, MatchSummary, ReconcileRequest,
};

pub mod handlers;

// Internal modules
mod broadcaster;
mod registry;
mod types;

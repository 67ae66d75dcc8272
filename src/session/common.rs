// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared state-machine vocabulary for the session FSMs (spec §4.2-§4.4,
//! §4.8). Each FSM module owns its state enum and drives it with a plain
//! async loop rather than threading a transition type through a
//! boxed-future trait object, since every FSM here lives inside a single
//! `tokio::spawn`'d task and gains nothing from dynamic dispatch.

/// Lifecycle shared by every connection-oriented session (spec §3
/// "Session"): `Idle -> Connecting -> Active -> Disconnecting -> Closed`,
/// with `Failed` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Active,
    Disconnecting,
    Closed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }
}

/// Lifecycle of one live stream session.
///
/// `Closed` is terminal for the instance; "reconnecting" always means a
/// new session with a new id.
#[derive(Debug, Copy, Clone, Eq, PartialEq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
}

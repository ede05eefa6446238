/// The lifecycle state of a single transport run.
///
/// `Idle -> Configuring -> Executing -> Finalized`; `Finalized` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing has been built yet.
    #[default]
    Idle,

    /// Native options are applied to an open handle.
    Configuring,

    /// The transfer ran (or is running) on the native engine.
    Executing,

    /// The outcome was recorded and the native handle released.
    Finalized,
}

impl LoadState {
    pub fn is_terminal(self) -> bool {
        self == LoadState::Finalized
    }
}

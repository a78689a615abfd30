/// Substantive lifecycle state of a layer.
///
/// `Error` is terminal for a handle: the only way out is the reload
/// workflow, which discards the handle and starts a fresh one in `Loading`.
/// Off-scale is tracked separately on the handle; it overlays the UI
/// projection without touching the substantive state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LoadState {
    Loading,
    Loaded,
    Updating,
    Error,
}

/// Lifecycle notification kinds emitted by the render surface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LoadEvent {
    LoadSucceeded,
    LoadFailed,
    UpdateStarted,
    UpdateFinished,
}

const TRANSITIONS: &[(LoadState, LoadEvent, LoadState)] = &[
    (LoadState::Loading, LoadEvent::LoadSucceeded, LoadState::Loaded),
    (LoadState::Loading, LoadEvent::LoadFailed, LoadState::Error),
    (LoadState::Loaded, LoadEvent::UpdateStarted, LoadState::Updating),
    (
        LoadState::Updating,
        LoadEvent::UpdateFinished,
        LoadState::Loaded,
    ),
    (LoadState::Updating, LoadEvent::LoadFailed, LoadState::Error),
];

/// Look up the legal transition for `(state, event)`.
///
/// `None` means the notification must be ignored. There is deliberately no
/// row out of `Error`, so a late update racing after a failure can never
/// resurrect a handle.
pub fn next_state(state: LoadState, event: LoadEvent) -> Option<LoadState> {
    TRANSITIONS
        .iter()
        .find(|(from, on, _)| *from == state && *on == event)
        .map(|(_, _, to)| *to)
}

#[cfg(test)]
mod tests {
    use super::{LoadEvent, LoadState, next_state};

    const ALL_EVENTS: [LoadEvent; 4] = [
        LoadEvent::LoadSucceeded,
        LoadEvent::LoadFailed,
        LoadEvent::UpdateStarted,
        LoadEvent::UpdateFinished,
    ];

    #[test]
    fn load_and_update_cycle() {
        assert_eq!(
            next_state(LoadState::Loading, LoadEvent::LoadSucceeded),
            Some(LoadState::Loaded)
        );
        assert_eq!(
            next_state(LoadState::Loaded, LoadEvent::UpdateStarted),
            Some(LoadState::Updating)
        );
        assert_eq!(
            next_state(LoadState::Updating, LoadEvent::UpdateFinished),
            Some(LoadState::Loaded)
        );
    }

    #[test]
    fn failures_reach_error_from_loading_and_updating() {
        assert_eq!(
            next_state(LoadState::Loading, LoadEvent::LoadFailed),
            Some(LoadState::Error)
        );
        assert_eq!(
            next_state(LoadState::Updating, LoadEvent::LoadFailed),
            Some(LoadState::Error)
        );
    }

    #[test]
    fn error_absorbs_every_event() {
        for event in ALL_EVENTS {
            assert_eq!(next_state(LoadState::Error, event), None);
        }
    }

    #[test]
    fn unrelated_notifications_are_ignored() {
        assert_eq!(next_state(LoadState::Loading, LoadEvent::UpdateStarted), None);
        assert_eq!(next_state(LoadState::Loading, LoadEvent::UpdateFinished), None);
        assert_eq!(next_state(LoadState::Loaded, LoadEvent::LoadSucceeded), None);
        assert_eq!(next_state(LoadState::Loaded, LoadEvent::UpdateFinished), None);
    }
}

use std::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// Lifecycle stage of a sub-task.
///
///   New ----> Running <----> Paused
///               |  \           |
///               |   ----> Stopped
///               v
///            Finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum Stage {
    New = 1,
    Running = 2,
    Paused = 3,
    Stopped = 4,
    Finished = 5,
}

/// What asks a sub-task to change stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    /// Units initialized.
    Init,
    /// A unit reported processing errors.
    Fail,
    /// External pause request.
    Pause,
    /// External resume request.
    Resume,
    /// External stop request.
    Stop,
    /// The last bounded unit completed.
    Finish,
}

impl Stage {
    /// The stage reached from `self` on `event`, `None` when the transition is illegal.
    pub fn next(self, event: StageEvent) -> Option<Stage> {
        match (self, event) {
            (Stage::New, StageEvent::Init) => Some(Stage::Running),
            (Stage::Running, StageEvent::Fail) | (Stage::Running, StageEvent::Pause) => Some(Stage::Paused),
            (Stage::Paused, StageEvent::Resume) => Some(Stage::Running),
            (Stage::Running, StageEvent::Stop) | (Stage::Paused, StageEvent::Stop) => Some(Stage::Stopped),
            (Stage::Running, StageEvent::Finish) => Some(Stage::Finished),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Stopped | Stage::Finished)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod test {
    use super::{Stage, StageEvent};

    const ALL_STAGES: [Stage; 5] = [Stage::New, Stage::Running, Stage::Paused, Stage::Stopped, Stage::Finished];
    const ALL_EVENTS: [StageEvent; 6] = [
        StageEvent::Init,
        StageEvent::Fail,
        StageEvent::Pause,
        StageEvent::Resume,
        StageEvent::Stop,
        StageEvent::Finish,
    ];

    #[test]
    fn test_new_only_reaches_running() {
        let reachable: Vec<Stage> = ALL_EVENTS.iter().filter_map(|e| Stage::New.next(*e)).collect();
        assert_eq!(reachable, vec![Stage::Running]);
    }

    #[test]
    fn test_terminal_stages_have_no_transitions() {
        for stage in [Stage::Stopped, Stage::Finished] {
            assert!(stage.is_terminal());
            for event in ALL_EVENTS {
                assert_eq!(stage.next(event), None, "{stage} on {event:?}");
            }
        }
    }

    #[test]
    fn test_running_and_paused() {
        assert_eq!(Stage::Running.next(StageEvent::Fail), Some(Stage::Paused));
        assert_eq!(Stage::Running.next(StageEvent::Pause), Some(Stage::Paused));
        assert_eq!(Stage::Running.next(StageEvent::Stop), Some(Stage::Stopped));
        assert_eq!(Stage::Running.next(StageEvent::Finish), Some(Stage::Finished));
        assert_eq!(Stage::Running.next(StageEvent::Resume), None);

        assert_eq!(Stage::Paused.next(StageEvent::Resume), Some(Stage::Running));
        assert_eq!(Stage::Paused.next(StageEvent::Stop), Some(Stage::Stopped));
        assert_eq!(Stage::Paused.next(StageEvent::Finish), None);
        assert_eq!(Stage::Paused.next(StageEvent::Pause), None);
    }

    #[test]
    fn test_nothing_returns_to_new() {
        for stage in ALL_STAGES {
            for event in ALL_EVENTS {
                assert_ne!(stage.next(event), Some(Stage::New));
            }
        }
    }

    #[test]
    fn test_codes() {
        assert_eq!(i32::from(Stage::Paused), 3);
        assert_eq!(Stage::try_from(5).unwrap(), Stage::Finished);
        assert!(Stage::try_from(0).is_err());
    }
}

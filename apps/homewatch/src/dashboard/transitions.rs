#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    Start,
    Stop,
}

/// A boiler state change, located at the first sample of the new state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub index: usize,
    pub kind: TransitionKind,
}

/// Edges between consecutive known boiler states. An unknown sample breaks the chain, so
/// `[on, ?, off]` yields nothing.
pub fn detect_transitions(states: &[Option<bool>]) -> Vec<Transition> {
    states
        .windows(2)
        .enumerate()
        .filter_map(|(idx, pair)| match (pair[0], pair[1]) {
            (Some(false), Some(true)) => Some(Transition {
                index: idx + 1,
                kind: TransitionKind::Start,
            }),
            (Some(true), Some(false)) => Some(Transition {
                index: idx + 1,
                kind: TransitionKind::Stop,
            }),
            _ => None,
        })
        .collect()
}

/// Index of the most recent transition of `kind`.
pub fn latest(transitions: &[Transition], kind: TransitionKind) -> Option<usize> {
    transitions
        .iter()
        .rev()
        .find(|transition| transition.kind == kind)
        .map(|transition| transition.index)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ON: Option<bool> = Some(true);
    const OFF: Option<bool> = Some(false);

    #[test]
    fn start_and_stop_are_located_at_new_state() {
        let found = detect_transitions(&[OFF, OFF, ON, ON, OFF]);
        assert_eq!(
            found,
            vec![
                Transition {
                    index: 2,
                    kind: TransitionKind::Start
                },
                Transition {
                    index: 4,
                    kind: TransitionKind::Stop
                },
            ]
        );
    }

    #[test]
    fn unknown_breaks_chain() {
        assert!(detect_transitions(&[ON, None, OFF]).is_empty());
        assert_eq!(detect_transitions(&[None, OFF, ON]).len(), 1);
    }

    #[test]
    fn short_series_have_no_transitions() {
        assert!(detect_transitions(&[]).is_empty());
        assert!(detect_transitions(&[ON]).is_empty());
    }

    #[test]
    fn latest_picks_most_recent_of_kind() {
        let found = detect_transitions(&[OFF, ON, OFF, ON, ON]);
        assert_eq!(latest(&found, TransitionKind::Start), Some(3));
        assert_eq!(latest(&found, TransitionKind::Stop), Some(2));
        assert_eq!(latest(&detect_transitions(&[ON, ON]), TransitionKind::Stop), None);
    }
}

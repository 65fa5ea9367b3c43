#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system deciding when the segment window must grow ahead of the observer.

use endless_road_core::{Command, Event, WindowView};

/// Phase the driver passes through while evaluating one tick.
///
/// A tick that requests an advance goes `Idle -> Advancing -> Idle` inside a
/// single [`GenerationDriver::handle`] call; nothing carries over to the next
/// tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DriverState {
    /// The observer is far enough from the leading edge.
    #[default]
    Idle,
    /// The observer is within the trigger distance and one segment is requested.
    Advancing,
}

/// Compares the observer with the leading edge of the window.
///
/// An empty window never advances; priming is the caller's job.
#[must_use]
pub fn evaluate(observer_x: f64, window: &WindowView) -> DriverState {
    match window.leading_edge {
        Some(leading_edge) if leading_edge - observer_x <= window.trigger_distance => {
            DriverState::Advancing
        }
        _ => DriverState::Idle,
    }
}

/// Emits [`Command::AdvanceWindow`] whenever the observer closes in on the leading edge.
#[derive(Debug, Default)]
pub struct GenerationDriver {
    requested: u64,
}

impl GenerationDriver {
    /// Creates an idle driver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of advances requested since the driver was created.
    #[must_use]
    pub const fn requested(&self) -> u64 {
        self.requested
    }

    /// Consumes one tick of world events and the window view to emit advance requests.
    ///
    /// Only the most recent observer position in `events` is considered and at
    /// most one advance is emitted per call. Ticks without an observer update
    /// emit nothing.
    pub fn handle(&mut self, events: &[Event], window: &WindowView, out: &mut Vec<Command>) {
        let observer_x = events.iter().rev().find_map(|event| match event {
            Event::ObserverMoved { position } => Some(position.x),
            _ => None,
        });
        let Some(observer_x) = observer_x else {
            return;
        };

        if evaluate(observer_x, window) == DriverState::Advancing {
            self.requested += 1;
            out.push(Command::AdvanceWindow);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;

    fn view(leading_edge: Option<f64>) -> WindowView {
        WindowView {
            leading_edge,
            trigger_distance: 15.0,
            active_segments: usize::from(leading_edge.is_some()),
            capacity: 3,
        }
    }

    fn moved(x: f64) -> Event {
        Event::ObserverMoved {
            position: DVec3::new(x, 0.0, 0.0),
        }
    }

    #[test]
    fn empty_window_is_left_alone() {
        let mut driver = GenerationDriver::new();
        let mut commands = Vec::new();
        driver.handle(&[moved(0.0)], &view(None), &mut commands);
        assert!(commands.is_empty());
        assert_eq!(evaluate(0.0, &view(None)), DriverState::Idle);
    }

    #[test]
    fn trigger_distance_is_inclusive() {
        assert_eq!(evaluate(9.9, &view(Some(25.0))), DriverState::Idle);
        assert_eq!(evaluate(10.0, &view(Some(25.0))), DriverState::Advancing);

        let mut driver = GenerationDriver::new();
        let mut commands = Vec::new();
        driver.handle(&[moved(9.9)], &view(Some(25.0)), &mut commands);
        assert!(commands.is_empty());

        driver.handle(&[moved(10.0)], &view(Some(25.0)), &mut commands);
        assert_eq!(commands, vec![Command::AdvanceWindow]);
        assert_eq!(driver.requested(), 1);
    }

    #[test]
    fn every_close_tick_requests_again_without_confirmation() {
        let mut driver = GenerationDriver::new();
        let mut commands = Vec::new();

        driver.handle(&[moved(20.0)], &view(Some(25.0)), &mut commands);
        driver.handle(&[moved(21.0)], &view(Some(25.0)), &mut commands);
        assert_eq!(commands, vec![Command::AdvanceWindow, Command::AdvanceWindow]);
    }

    #[test]
    fn one_request_per_tick_uses_the_latest_position() {
        let mut driver = GenerationDriver::new();
        let mut commands = Vec::new();

        driver.handle(
            &[moved(12.0), moved(0.0)],
            &view(Some(25.0)),
            &mut commands,
        );
        assert!(commands.is_empty());

        driver.handle(
            &[moved(0.0), moved(12.0), moved(13.0)],
            &view(Some(25.0)),
            &mut commands,
        );
        assert_eq!(commands.len(), 1);
    }

    #[test]
    fn ticks_without_observer_updates_emit_nothing() {
        let mut driver = GenerationDriver::new();
        let mut commands = Vec::new();
        driver.handle(&[Event::ConfigurationChanged], &view(Some(0.0)), &mut commands);
        assert!(commands.is_empty());
    }
}

use crate::session::GameSession;
use crate::types::{BoardSnapshot, Captures, GameEnd, GameEvent, Move};

/// Tags the transition from `previous` to the current session state.
///
/// Precedence: a game end (`Win` / `Resign`) outranks `Capture`, which
/// outranks a plain `Play` or `Pass`.
pub fn classify(
    previous: Option<&BoardSnapshot>,
    session: &GameSession,
    captures: Captures,
) -> GameEvent {
    match session.end() {
        Some(GameEnd::DoublePass) => return GameEvent::Win,
        Some(GameEnd::Resignation { .. }) => return GameEvent::Resign,
        None => {}
    }

    let Some(last) = session.last_ply() else {
        return GameEvent::None;
    };

    let captured_more = previous.is_some_and(|previous| {
        captures.black > previous.captured.black || captures.white > previous.captured.white
    });
    if captured_more {
        return GameEvent::Capture;
    }

    match last.mv {
        Move::Pass => GameEvent::Pass,
        _ => GameEvent::Play,
    }
}

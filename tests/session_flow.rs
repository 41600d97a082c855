//! End-to-end command flows through the dispatcher.

use goban_session::board::Board;
use goban_session::engine::MoveSelector;
use goban_session::types::Color;
use goban_session::{
    BoardEngine, CellState, Command, CommandDispatcher, DispatchOutcome, GameConfig, GameEvent,
    Point, RecordManager, SessionState,
};

/// Selector that always passes.
struct Passer;

impl MoveSelector for Passer {
    fn select_move(&self, _board: &Board, _color: Color, _level: u8) -> Option<usize> {
        None
    }
}

fn point(vertex: &str) -> Point {
    vertex.parse().unwrap()
}

fn started(config: GameConfig) -> CommandDispatcher {
    let mut dispatcher = CommandDispatcher::new(config, Box::new(BoardEngine::new(Box::new(Passer))));
    dispatcher.start().unwrap();
    dispatcher
}

#[test]
fn play_engine_pass_player_pass_ends_game() {
    let mut dispatcher = started(GameConfig::default());
    let rx = dispatcher.subscribe_channel();

    let outcome = dispatcher.dispatch(Command::Play(point("A1"))).unwrap();
    assert_eq!(outcome, DispatchOutcome::Applied(SessionState::WaitingForEngine));
    let snapshot = rx.try_recv().unwrap();
    assert_eq!(snapshot.last_event, GameEvent::Play);
    assert_eq!(snapshot.move_number, 1);
    assert_eq!(snapshot.black_last_move, "A1");
    assert_eq!(snapshot.cell(point("A1")), CellState::Black);

    let outcome = dispatcher.dispatch(Command::GenMove).unwrap();
    assert_eq!(outcome, DispatchOutcome::Applied(SessionState::WaitingForPlayer));
    let snapshot = rx.try_recv().unwrap();
    assert_eq!(snapshot.last_event, GameEvent::Pass);
    assert_eq!(snapshot.pass_count, 1);
    assert_eq!(snapshot.white_last_move, "PASS");

    let outcome = dispatcher.dispatch(Command::Pass).unwrap();
    assert_eq!(outcome, DispatchOutcome::Applied(SessionState::GameOver));
    let snapshot = rx.try_recv().unwrap();
    assert_eq!(snapshot.last_event, GameEvent::Win);
    assert_eq!(snapshot.state, SessionState::GameOver);
    // The lone black stone owns the whole board.
    assert_eq!(snapshot.score, Some(6.5 - 81.0));

    assert!(rx.try_recv().is_err());
    assert_eq!(dispatcher.record().len(), 3);
}

#[test]
fn handicap_game_opens_with_engine_turn() {
    let mut dispatcher = started(GameConfig {
        requested_handicap: 2,
        ..GameConfig::default()
    });

    let snapshot = dispatcher.snapshot().unwrap();
    assert_eq!(snapshot.state, SessionState::WaitingForEngine);
    assert_eq!(snapshot.to_move, Color::White);
    assert_eq!(snapshot.cell(point("G7")), CellState::Black);
    assert_eq!(snapshot.cell(point("C3")), CellState::Black);

    let outcome = dispatcher.dispatch(Command::GenMove).unwrap();
    assert_eq!(outcome, DispatchOutcome::Applied(SessionState::WaitingForPlayer));
    assert_eq!(dispatcher.record().header.handicap, 2);
}

#[test]
fn restart_after_game_over_can_swap_colors() {
    let mut dispatcher = started(GameConfig::default());
    dispatcher.dispatch(Command::Resign).unwrap();
    assert_eq!(dispatcher.state(), SessionState::GameOver);

    let outcome = dispatcher
        .dispatch(Command::Restart {
            level: Some(3),
            player_is_white: Some(true),
        })
        .unwrap();

    assert_eq!(outcome, DispatchOutcome::Applied(SessionState::WaitingForEngine));
    let snapshot = dispatcher.snapshot().unwrap();
    assert_eq!(snapshot.level, 3);
    assert_eq!(snapshot.move_number, 0);
    assert_eq!(snapshot.last_event, GameEvent::None);
    assert_eq!(dispatcher.session().computer_player(), Color::Black);
}

#[test]
fn saved_game_resumes_where_it_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.grec");
    let mut first = started(GameConfig {
        outfile: Some(path.clone()),
        ..GameConfig::default()
    });
    for vertex in ["E5", "C3", "D4"] {
        first.dispatch(Command::Play(point(vertex))).unwrap();
    }
    first.dispatch(Command::Save).unwrap();

    let resumed = started(GameConfig {
        infile: Some(path.clone()),
        ..GameConfig::default()
    });

    assert_eq!(resumed.record(), first.record());
    assert_eq!(resumed.state(), SessionState::WaitingForEngine);
    let snapshot = resumed.snapshot().unwrap();
    assert_eq!(snapshot.move_number, 3);
    assert_eq!(snapshot.cell(point("E5")), CellState::Black);
    assert_eq!(snapshot.cell(point("C3")), CellState::White);
    assert_eq!(snapshot.black_last_move, "D4");
    assert_eq!(snapshot.white_last_move, "C3");
    assert_eq!(resumed.record_buffer(), first.record_buffer());
}

#[test]
fn corrupt_resume_file_starts_fresh() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.grec");
    std::fs::write(&path, b"GREC but not really a record").unwrap();

    let dispatcher = started(GameConfig {
        infile: Some(path.clone()),
        ..GameConfig::default()
    });

    assert_eq!(dispatcher.state(), SessionState::WaitingForPlayer);
    assert!(dispatcher.record().is_empty());
    assert!(RecordManager::resume(&path).is_none());
}

#[test]
fn finished_resumed_game_stays_over() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("game.grec");
    let mut first = started(GameConfig {
        outfile: Some(path.clone()),
        ..GameConfig::default()
    });
    first.dispatch(Command::Play(point("E5"))).unwrap();
    first.dispatch(Command::Resign).unwrap();
    assert_eq!(first.dispatch(Command::ForceQuit).unwrap(), DispatchOutcome::Quit);

    let mut resumed = started(GameConfig {
        infile: Some(path),
        ..GameConfig::default()
    });

    assert_eq!(resumed.state(), SessionState::GameOver);
    assert_eq!(resumed.snapshot().unwrap().last_event, GameEvent::Resign);
    assert_eq!(
        resumed.dispatch(Command::Pass).unwrap(),
        DispatchOutcome::Unchanged
    );
}

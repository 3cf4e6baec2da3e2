// End-to-end scenarios over the real threaded engine.
//
// Each test starts a full game (dealer thread, player threads, input
// generators for computer seats) through `TestGame`, drives human seats
// with key presses, and checks scores, board state and the recorded UI
// traffic. Timing-sensitive checks only ever wait for an outcome; they
// never assume how fast the dealer gets to it.

use std::thread;
use std::time::Duration;

use set_rush_engine::player::PlayerPhase;
use set_rush_engine::{GameConfig, PlayerId, SlotId, UiEvent};
use set_rush_tests::{TestGame, solo_config};

const P0: PlayerId = PlayerId(0);

fn count(events: &[UiEvent], mut matches: impl FnMut(&UiEvent) -> bool) -> usize {
    events.iter().filter(|e| matches(*e)).count()
}

// ---------------------------------------------------------------------------
// Claims
// ---------------------------------------------------------------------------

/// A valid triple scores one point, its slots are emptied and refilled, and
/// the countdown restarts at its full duration.
#[test]
fn valid_claim_scores_and_resets_countdown() {
    // 21 cards of the classic deck always contain a set.
    let t = TestGame::start(GameConfig {
        table_size: 21,
        ..solo_config()
    });
    t.wait_for_open_board();
    let slots = t.find_set().expect("21 cards always hold a set");
    t.ui.take();

    t.press_all(P0, &slots);
    t.wait_for_score(P0, 1);
    t.wait_until("refilled board", |t| {
        t.board().is_open() && t.board().count_cards() == 21
    });
    t.wait_until("countdown reset", |t| {
        let events = t.ui.events();
        let Some(scored) = events
            .iter()
            .position(|e| *e == UiEvent::Score { player: P0, score: 1 })
        else {
            return false;
        };
        events[scored..]
            .iter()
            .any(|e| matches!(e, UiEvent::Countdown { millis, .. } if *millis > 59_000))
    });

    let events = t.ui.events();
    for slot in &slots {
        let removed = events
            .iter()
            .position(|e| *e == UiEvent::RemoveCard { slot: *slot })
            .expect("claimed slot was never cleared");
        let refilled = events
            .iter()
            .rposition(|e| matches!(e, UiEvent::PlaceCard { slot: s, .. } if s == slot))
            .expect("claimed slot was never refilled");
        assert!(removed < refilled, "{slot} refilled before it was cleared");
    }
    assert_eq!(t.game.scores(), vec![1]);
    assert!(t.board().is_consistent());
    assert!(t.board().tokens_of(P0).is_empty());
    t.shutdown();
}

/// A non-set freezes its owner for the penalty duration and leaves the
/// board untouched.
#[test]
fn invalid_claim_freezes_without_touching_the_board() {
    let t = TestGame::start(solo_config());
    t.wait_for_open_board();
    let slots = t.find_non_set();
    let before = t.board().cards_on_table();
    t.ui.take();

    t.press_all(P0, &slots);
    t.wait_for_event("penalty freeze", |e| {
        *e == UiEvent::Freeze { player: P0, millis: 3_000 }
    });

    // Frozen players drop key presses.
    assert!(!t.game.key_pressed(P0, slots[0]).unwrap());
    assert_eq!(t.board().cards_on_table(), before);
    assert_eq!(t.board().tokens_of(P0).len(), 3);
    assert_eq!(t.game.scores(), vec![0]);
    assert_eq!(count(&t.ui.events(), |e| matches!(e, UiEvent::RemoveCard { .. })), 0);
    t.shutdown();
}

/// Pressing a slot twice leaves no token behind and submits nothing.
#[test]
fn double_press_toggles_back() {
    let t = TestGame::start(solo_config());
    t.wait_for_open_board();
    let slot = SlotId(0);
    t.ui.take();

    t.press_all(P0, &[slot, slot]);
    t.wait_for_event("token removal", |e| {
        *e == UiEvent::RemoveToken { player: P0, slot }
    });
    assert!(t.board().tokens_of(P0).is_empty());
    assert_eq!(t.game.scores(), vec![0]);
    t.shutdown();
}

// ---------------------------------------------------------------------------
// Timer modes
// ---------------------------------------------------------------------------

/// `turn_timeout_millis = 0`: elapsed time is shown, the countdown never is,
/// and the board is never reshuffled by the timer.
#[test]
fn elapsed_mode_never_reshuffles() {
    let t = TestGame::start(GameConfig {
        turn_timeout_millis: 0,
        ..solo_config()
    });
    t.wait_for_open_board();
    let dealt = t.board().cards_on_table();
    assert!(t.board().set_can_be_found());

    t.wait_for_event("elapsed display", |e| matches!(e, UiEvent::Elapsed { .. }));
    thread::sleep(Duration::from_millis(1_200));

    let events = t.ui.events();
    assert_eq!(count(&events, |e| matches!(e, UiEvent::Countdown { .. })), 0);
    assert_eq!(t.board().cards_on_table(), dealt);
    t.shutdown();
}

/// `turn_timeout_millis < 0`: no timer display, and a dealt board always
/// holds a set even when the table is only one claim wide.
#[test]
fn untimed_mode_always_deals_a_set() {
    let t = TestGame::start(GameConfig {
        table_size: 3,
        turn_timeout_millis: -1,
        ..solo_config()
    });
    t.wait_for_open_board();
    assert!(t.board().set_can_be_found());
    assert_eq!(t.board().count_cards(), 3);

    thread::sleep(Duration::from_millis(1_100));
    let events = t.ui.events();
    assert_eq!(
        count(&events, |e| matches!(e, UiEvent::Countdown { .. } | UiEvent::Elapsed { .. })),
        0
    );
    t.shutdown();
}

/// After a valid claim on an untimed table the dealer redeals until the
/// refilled board shows a set again.
#[test]
fn untimed_refill_after_a_point_shows_a_set() {
    let t = TestGame::start(GameConfig {
        table_size: 3,
        turn_timeout_millis: -1,
        point_freeze_millis: 0,
        ..solo_config()
    });
    t.wait_for_open_board();
    let slots = t.find_set().expect("an untimed deal always holds a set");
    let claimed = t.board().cards_on_table();

    t.press_all(P0, &slots);
    t.wait_for_score(P0, 1);
    t.wait_until("refilled board", |t| {
        t.board().is_open() && t.board().count_cards() == 3
    });

    assert!(t.board().set_can_be_found());
    assert!(t.board().is_consistent());
    for card in &claimed {
        assert_eq!(t.board().slot_of(*card), None, "{card} was dealt again");
    }
    t.shutdown();
}

// ---------------------------------------------------------------------------
// Game lifecycle
// ---------------------------------------------------------------------------

/// Terminating a busy game of computer players is idempotent, stops every
/// player thread and announces the winners exactly once.
#[test]
fn termination_stops_every_thread() {
    let t = TestGame::start(GameConfig {
        human_players: 0,
        computer_players: 4,
        penalty_freeze_millis: 100,
        point_freeze_millis: 100,
        seed: Some(7),
        ..GameConfig::default()
    });
    t.wait_for_open_board();
    thread::sleep(Duration::from_millis(300));

    let seats: Vec<_> = (0..4)
        .map(|id| t.game.seat(PlayerId(id)).unwrap().clone())
        .collect();
    let ui = t.ui.clone();
    t.game.terminate();
    t.game.terminate();
    let summary = t.shutdown();

    assert_eq!(summary.scores.len(), 4);
    assert!(!summary.winners.is_empty());
    let best = summary.scores.iter().max().copied().unwrap();
    for winner in &summary.winners {
        assert_eq!(summary.scores[winner.0], best);
    }
    for seat in &seats {
        assert!(seat.is_terminated());
        assert_eq!(seat.phase(), PlayerPhase::Terminated);
    }
    assert_eq!(
        count(&ui.events(), |e| matches!(e, UiEvent::Winners { .. })),
        1
    );
}

/// With a nine-card deck the computers eventually exhaust every set and the
/// game ends on its own.
#[test]
fn game_ends_when_no_set_remains() {
    let t = TestGame::start(GameConfig {
        table_size: 9,
        deck_size: 9,
        feature_count: 2,
        turn_timeout_millis: 0,
        point_freeze_millis: 0,
        penalty_freeze_millis: 0,
        human_players: 0,
        computer_players: 2,
        seed: Some(3),
        ..GameConfig::default()
    });
    t.wait_until("natural end of game", |t| t.game.is_finished());

    let TestGame { game, ui, .. } = t;
    let summary = game.join();
    let total: u32 = summary.scores.iter().sum();
    assert!((1..=3).contains(&total), "scores {:?}", summary.scores);
    assert!(!summary.winners.is_empty());

    let events = ui.events();
    let Some(UiEvent::Winners { players }) = events
        .iter()
        .rfind(|e| matches!(e, UiEvent::Winners { .. }))
    else {
        panic!("winners never announced");
    };
    assert_eq!(players, &summary.winners);
}

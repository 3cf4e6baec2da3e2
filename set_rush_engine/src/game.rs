// Game launcher and the handle the embedding application drives it with.
//
// `start_game` validates the config, builds the board, the seats and the
// dealer, and spawns every thread: one input generator per computer seat,
// one thread per player, then the dealer. Players report to a start gate
// that the dealer waits on before the first deal. If any spawn fails, the
// gate is cancelled, every seat is terminated, the threads already running
// are joined, and the spawn error is returned.
//
// Seeding: one master `GameRng` (config seed, else the clock) is forked
// into stream 0 for the dealer and stream `id + 1` for each computer
// seat's generator, so a seeded game deals identically every time.
//
// `GameHandle` is the only way in from outside: human key presses,
// score and board observation, and shutdown. Dropping it terminates the
// game and joins the dealer, which in turn joins every player.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use set_rush_prng::GameRng;
use tracing::{info, warn};

use crate::board::Board;
use crate::config::{GameConfig, PlayerKind};
use crate::dealer::{self, Dealer, GameSummary};
use crate::error::GameError;
use crate::input::StartGate;
use crate::player::{self, PlayerSeat};
use crate::set_finder::SetFinder;
use crate::types::{PlayerId, SlotId};
use crate::ui::UiSink;

/// Running game.
pub struct GameHandle {
    board: Arc<Board>,
    seats: Vec<Arc<PlayerSeat>>,
    stop: Arc<AtomicBool>,
    dealer: Option<JoinHandle<GameSummary>>,
}

/// Validate `config`, spawn every thread and start dealing.
pub fn start_game(
    config: GameConfig,
    ui: Arc<dyn UiSink>,
    finder: Arc<dyn SetFinder>,
) -> Result<GameHandle, GameError> {
    config.validate()?;

    let mut rng = match config.seed {
        Some(seed) => GameRng::new(seed),
        None => GameRng::from_clock(),
    };
    let board = Arc::new(Board::new(&config, ui.clone(), finder.clone()));
    let seats: Vec<Arc<PlayerSeat>> = (0..config.player_count())
        .map(PlayerId)
        .map(|id| {
            Arc::new(PlayerSeat::new(
                id,
                config.player_name(id),
                config.player_kind(id),
                config.feature_size,
            ))
        })
        .collect();
    let gate = Arc::new(StartGate::new(seats.len()));
    let stop = Arc::new(AtomicBool::new(false));
    let dealer_rng = rng.fork(0);

    let mut player_threads = Vec::with_capacity(seats.len());
    for seat in &seats {
        let generator_rng = rng.fork(seat.id().0 as u64 + 1);
        let spawned = spawn_player(
            seat.clone(),
            board.clone(),
            ui.clone(),
            gate.clone(),
            config.table_size,
            generator_rng,
        );
        match spawned {
            Ok(handle) => player_threads.push(handle),
            Err(err) => {
                abort_start(&gate, &board, &seats, player_threads);
                return Err(err);
            }
        }
    }

    let mut dealer = Dealer::new(
        config,
        board.clone(),
        ui,
        finder,
        seats.clone(),
        gate.clone(),
        stop.clone(),
        dealer_rng,
    );
    dealer.attach_player_threads(player_threads);
    let dealer = thread::Builder::new()
        .name("dealer".into())
        .spawn(move || dealer.run());
    let dealer = match dealer {
        Ok(handle) => handle,
        Err(source) => {
            // The player handles went down with the dealer; terminated
            // players exit on their own.
            abort_start(&gate, &board, &seats, Vec::new());
            return Err(GameError::Spawn {
                thread: "dealer".into(),
                source,
            });
        }
    };

    info!(players = seats.len(), "game started");
    Ok(GameHandle {
        board,
        seats,
        stop,
        dealer: Some(dealer),
    })
}

fn spawn_player(
    seat: Arc<PlayerSeat>,
    board: Arc<Board>,
    ui: Arc<dyn UiSink>,
    gate: Arc<StartGate>,
    table_size: usize,
    rng: GameRng,
) -> Result<JoinHandle<()>, GameError> {
    let id = seat.id().0;
    let generator = match seat.kind() {
        PlayerKind::Computer => {
            let name = format!("input-{id}");
            let seat = seat.clone();
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || player::run_generator(seat, table_size, rng))
                .map_err(|source| GameError::Spawn { thread: name, source })?;
            Some(handle)
        }
        PlayerKind::Human => None,
    };
    let name = format!("player-{id}");
    thread::Builder::new()
        .name(name.clone())
        .spawn(move || player::run_player(seat, board, ui, gate, generator))
        .map_err(|source| GameError::Spawn { thread: name, source })
}

fn abort_start(
    gate: &StartGate,
    board: &Board,
    seats: &[Arc<PlayerSeat>],
    spawned: Vec<JoinHandle<()>>,
) {
    gate.cancel();
    for seat in seats.iter().rev() {
        seat.request_terminate(board);
    }
    for handle in spawned.into_iter().rev() {
        if handle.join().is_err() {
            warn!("player thread panicked during aborted start");
        }
    }
}

impl GameHandle {
    /// Forward a key press of `player` on `slot`. Returns whether the press
    /// was queued (frozen players, empty slots and full queues drop it).
    pub fn key_pressed(&self, player: PlayerId, slot: SlotId) -> Result<bool, GameError> {
        let seat = self.seat(player).ok_or(GameError::UnknownPlayer(player.0))?;
        Ok(seat.key_pressed(&self.board, slot))
    }

    pub fn board(&self) -> &Arc<Board> {
        &self.board
    }

    pub fn seat(&self, player: PlayerId) -> Option<&Arc<PlayerSeat>> {
        self.seats.get(player.0)
    }

    pub fn player_count(&self) -> usize {
        self.seats.len()
    }

    pub fn scores(&self) -> Vec<u32> {
        self.seats.iter().map(|seat| seat.score()).collect()
    }

    /// Whether the dealer thread has exited.
    pub fn is_finished(&self) -> bool {
        self.dealer.as_ref().is_none_or(|handle| handle.is_finished())
    }

    /// Ask the dealer to end the game. Returns immediately; idempotent.
    pub fn terminate(&self) {
        if !self.stop.swap(true, Ordering::SeqCst) {
            info!("game termination requested");
        }
        self.board.wake_dealer();
    }

    /// Wait for the game to end by itself.
    pub fn join(mut self) -> GameSummary {
        self.wait_for_dealer()
    }

    /// Terminate the game and wait for every thread.
    pub fn shutdown(mut self) -> GameSummary {
        self.terminate();
        self.wait_for_dealer()
    }

    fn wait_for_dealer(&mut self) -> GameSummary {
        if let Some(handle) = self.dealer.take() {
            match handle.join() {
                Ok(summary) => return summary,
                Err(_) => warn!("dealer thread panicked"),
            }
        }
        let scores = self.scores();
        GameSummary {
            winners: dealer::winners(&scores),
            scores,
        }
    }
}

impl Drop for GameHandle {
    fn drop(&mut self) {
        if self.dealer.is_some() {
            self.terminate();
            self.wait_for_dealer();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::set_finder::FeatureSetFinder;
    use crate::ui::NullUi;

    fn start(config: GameConfig) -> Result<GameHandle, GameError> {
        let finder = Arc::new(FeatureSetFinder::from_config(&config));
        start_game(config, Arc::new(NullUi), finder)
    }

    #[test]
    fn invalid_config_spawns_nothing() {
        let config = GameConfig {
            computer_players: 0,
            ..GameConfig::default()
        };
        assert!(matches!(
            start(config),
            Err(GameError::Config(ConfigError::NoPlayers))
        ));
    }

    #[test]
    fn unknown_player_is_an_error() {
        let config = GameConfig {
            human_players: 1,
            computer_players: 0,
            seed: Some(1),
            ..GameConfig::default()
        };
        let game = start(config).unwrap();
        assert!(matches!(
            game.key_pressed(PlayerId(3), SlotId(0)),
            Err(GameError::UnknownPlayer(3))
        ));
        let summary = game.shutdown();
        assert_eq!(summary.scores, vec![0]);
        assert_eq!(summary.winners, vec![PlayerId(0)]);
    }

    #[test]
    fn terminate_twice_then_drop() {
        let config = GameConfig {
            seed: Some(2),
            ..GameConfig::default()
        };
        let game = start(config).unwrap();
        game.terminate();
        game.terminate();
        drop(game);
    }
}

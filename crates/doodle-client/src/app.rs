use std::io;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use ratatui::backend::CrosstermBackend;
use ratatui::{Frame, Terminal};
use tokio::sync::mpsc;

use doodle_common::config::Timing;
use doodle_common::lobby::{self, LobbyTransition, LobbyView};
use doodle_common::profile::{Identity, UserProfile};
use doodle_common::room::{Room, RoomCode, RoomPatch};
use doodle_common::session::{Effect, Session, SessionError};
use doodle_common::store::{RoomRepository, StoreError};

use crate::event::{self, AppEvent, Deferred};
use crate::input::{self, Action};
use crate::ui::dashboard::DashboardScreen;
use crate::ui::game::GameScreen;
use crate::ui::help_popup;
use crate::ui::lobby::LobbyScreen;
use crate::ui::scoreboard::ScoreboardScreen;

const CLOCK_TICK: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub enum Screen {
    Dashboard(DashboardScreen),
    Lobby(LobbyScreen),
    Game(GameScreen),
    Scoreboard(ScoreboardScreen),
}

pub async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    repo: RoomRepository,
    identity: Identity,
    timing: Timing,
    max_rounds: u32,
) -> anyhow::Result<()> {
    let (event_tx, mut event_rx) = mpsc::channel::<AppEvent>(64);
    tokio::spawn(event::event_loop(
        event_tx.clone(),
        CLOCK_TICK,
        timing.poll_interval,
    ));

    let mut app = App::new(repo, identity, timing, max_rounds, event_tx).await;

    while app.running {
        terminal.draw(|frame| app.draw(frame))?;

        let event = match event_rx.recv().await {
            Some(e) => e,
            None => break,
        };
        app.handle_event(event).await;
    }

    Ok(())
}

pub struct App {
    repo: RoomRepository,
    identity: Identity,
    profile: Option<UserProfile>,
    timing: Timing,
    max_rounds: u32,
    rng: StdRng,
    event_tx: mpsc::Sender<AppEvent>,
    /// Bumped whenever a game session starts or is abandoned, so deferred
    /// callbacks from an earlier session are ignored.
    generation: u64,
    pub screen: Screen,
    pub show_help: bool,
    pub running: bool,
}

impl App {
    pub async fn new(
        repo: RoomRepository,
        identity: Identity,
        timing: Timing,
        max_rounds: u32,
        event_tx: mpsc::Sender<AppEvent>,
    ) -> Self {
        let (profile, status) = match repo.ensure_profile(&identity).await {
            Ok(p) => (Some(p), None),
            Err(e) => {
                tracing::warn!("Could not load profile for {}: {}", identity.uid, e);
                (None, Some(format!("Profile unavailable: {}", e)))
            }
        };
        let mut dashboard = DashboardScreen::new(identity.display_name.clone(), profile.clone());
        dashboard.status_message = status;
        dashboard.offline = repo.is_degraded();

        Self {
            repo,
            identity,
            profile,
            timing,
            max_rounds,
            rng: StdRng::from_entropy(),
            event_tx,
            generation: 0,
            screen: Screen::Dashboard(dashboard),
            show_help: false,
            running: true,
        }
    }

    pub fn draw(&self, frame: &mut Frame) {
        match &self.screen {
            Screen::Dashboard(s) => s.draw(frame),
            Screen::Lobby(s) => s.draw(frame),
            Screen::Game(s) => s.draw(frame),
            Screen::Scoreboard(s) => s.draw(frame),
        }
        if self.show_help {
            help_popup::draw_help_popup(frame);
        }
    }

    pub async fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Key(key) => {
                if let Some(action) = input::map_key(key, &self.screen, self.show_help) {
                    self.handle_action(action).await;
                }
            }
            AppEvent::Tick => self.on_tick().await,
            AppEvent::Poll => self.on_poll().await,
            AppEvent::Deferred { generation, event } => {
                if generation == self.generation {
                    self.on_deferred(event).await;
                } else {
                    tracing::debug!("Dropping stale {:?} from generation {}", event, generation);
                }
            }
        }
    }

    pub async fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.running = false,
            Action::ShowHelp => self.show_help = true,
            Action::CloseHelp => self.show_help = false,

            Action::TypeChar(c) => match &mut self.screen {
                Screen::Dashboard(s) => s.type_char(c),
                Screen::Game(g) if g.can_guess() => g.type_char(c),
                _ => {}
            },
            Action::Backspace => match &mut self.screen {
                Screen::Dashboard(s) => s.backspace(),
                Screen::Game(g) => {
                    g.guess_input.pop();
                }
                _ => {}
            },

            Action::CreateRoom => self.create_room().await,
            Action::JoinRoom => self.join_room().await,

            Action::ToggleReady => self.toggle_ready().await,
            Action::StartGame => self.start_game().await,
            Action::LeaveRoom => {
                if let Some(code) = self.current_code() {
                    tracing::info!("Leaving room {}", code);
                }
                self.to_dashboard(None);
            }

            Action::SendGuess => self.send_guess().await,
            Action::MoveBrush(dx, dy) => {
                if let Screen::Game(g) = &mut self.screen {
                    g.canvas.move_cursor(dx, dy);
                }
            }
            Action::TogglePen => {
                if let Screen::Game(g) = &mut self.screen {
                    g.canvas.toggle_pen();
                }
            }
            Action::ClearCanvas => {
                if let Screen::Game(g) = &mut self.screen {
                    g.canvas.clear();
                }
            }

            Action::BackToDashboard => self.to_dashboard(None),
        }
    }

    // -- Navigation --

    fn current_code(&self) -> Option<RoomCode> {
        match &self.screen {
            Screen::Lobby(s) => Some(s.view.code.clone()),
            Screen::Game(g) => Some(g.session.room().code.clone()),
            Screen::Scoreboard(s) => Some(s.code.clone()),
            Screen::Dashboard(_) => None,
        }
    }

    fn to_dashboard(&mut self, status: Option<String>) {
        self.generation += 1;
        let mut dashboard =
            DashboardScreen::new(self.identity.display_name.clone(), self.profile.clone());
        if let Some(message) = status {
            dashboard = dashboard.with_status(message);
        }
        dashboard.offline = self.repo.is_degraded();
        self.screen = Screen::Dashboard(dashboard);
    }

    fn set_status(&mut self, message: String) {
        match &mut self.screen {
            Screen::Dashboard(s) => s.status_message = Some(message),
            Screen::Lobby(s) => s.status_message = Some(message),
            Screen::Game(g) => g.status_message = Some(message),
            Screen::Scoreboard(_) => {}
        }
    }

    // -- Dashboard --

    async fn create_room(&mut self) {
        match self
            .repo
            .create(&self.identity.uid, self.max_rounds, &mut self.rng)
            .await
        {
            Ok(code) => self.enter_room(code).await,
            Err(e) => self.set_status(format!("Could not create room: {}", e)),
        }
    }

    async fn join_room(&mut self) {
        let parsed = match &self.screen {
            Screen::Dashboard(s) => s.parse_code(),
            _ => return,
        };
        match parsed {
            Ok(code) => self.enter_room(code).await,
            Err(e) => self.set_status(e.to_string()),
        }
    }

    /// Add the local player to the roster unless already present, then go to
    /// the lobby or straight into the game if it has started.
    async fn enter_room(&mut self, code: RoomCode) {
        let room = match self.repo.fetch(&code).await {
            Ok(Some(room)) => room,
            Ok(None) => return self.to_dashboard(Some(format!("Room {} not found", code))),
            Err(e) => return self.set_status(format!("Could not reach room {}: {}", code, e)),
        };

        let room = if room.player(&self.identity.uid).is_some() {
            room
        } else {
            match self.repo.join(&code, self.identity.as_player()).await {
                Ok(room) => room,
                Err(StoreError::Roster(e)) => return self.set_status(e.to_string()),
                Err(e) => return self.set_status(format!("Could not join {}: {}", code, e)),
            }
        };

        self.enter_game(room).await;
    }

    // -- Lobby --

    fn lobby_code(&self) -> Option<RoomCode> {
        match &self.screen {
            Screen::Lobby(s) => Some(s.view.code.clone()),
            _ => None,
        }
    }

    /// Re-derive the lobby from a fresh snapshot.
    async fn refresh_lobby(&mut self) {
        let Some(code) = self.lobby_code() else {
            return;
        };
        let snapshot = match self.repo.fetch(&code).await {
            Ok(snapshot) => snapshot,
            Err(e) => return self.set_status(format!("Refresh failed: {}", e)),
        };
        match (lobby::reconcile(snapshot.as_ref()), snapshot) {
            (LobbyTransition::EnterGame, Some(room)) => self.enter_game(room).await,
            (LobbyTransition::Stay, Some(room)) => {
                if let Screen::Lobby(s) = &mut self.screen {
                    s.view = LobbyView::from_room(&room, &self.identity.uid);
                }
            }
            _ => self.to_dashboard(Some(format!("Room {} no longer exists", code))),
        }
    }

    async fn toggle_ready(&mut self) {
        let Some(code) = self.lobby_code() else {
            return;
        };
        match self.repo.fetch(&code).await {
            Ok(Some(room)) => {
                if let Some(patch) = lobby::toggle_ready(&room, &self.identity.uid) {
                    if let Err(e) = self.repo.patch(&code, patch).await {
                        return self.set_status(format!("Could not update ready state: {}", e));
                    }
                }
                self.refresh_lobby().await;
            }
            Ok(None) => self.to_dashboard(Some(format!("Room {} no longer exists", code))),
            Err(e) => self.set_status(format!("Could not update ready state: {}", e)),
        }
    }

    async fn start_game(&mut self) {
        let Some(code) = self.lobby_code() else {
            return;
        };
        let mut room = match self.repo.fetch(&code).await {
            Ok(Some(room)) => room,
            Ok(None) => {
                return self.to_dashboard(Some(format!("Room {} no longer exists", code)))
            }
            Err(e) => return self.set_status(format!("Could not start: {}", e)),
        };
        if let Err(e) = lobby::authorize_start(&room, &self.identity.uid) {
            return self.set_status(e.to_string());
        }
        if let Err(e) = self.repo.patch(&code, RoomPatch::start()).await {
            return self.set_status(format!("Could not start: {}", e));
        }
        tracing::info!("Starting game in room {} with {} players", code, room.players.len());
        room.apply_patch(RoomPatch::start());
        self.enter_game(room).await;
    }

    // -- Game --

    /// Open the game view, or the lobby while the room is still waiting.
    async fn enter_game(&mut self, room: Room) {
        if !room.started {
            let view = LobbyView::from_room(&room, &self.identity.uid);
            self.screen = Screen::Lobby(LobbyScreen::new(view));
            return;
        }
        self.generation += 1;
        let code = room.code.clone();
        match Session::load(
            &code,
            Some(room),
            self.identity.clone(),
            self.timing,
            &mut self.rng,
        ) {
            Ok((session, effects)) => {
                self.screen = Screen::Game(GameScreen::new(session));
                self.apply_effects(effects).await;
            }
            Err(e @ SessionError::RoomNotFound(_)) => self.to_dashboard(Some(e.to_string())),
            Err(e) => {
                tracing::warn!("Could not start session in {}: {}", code, e);
                self.to_dashboard(Some(e.to_string()));
            }
        }
    }

    fn session_code(&self) -> Option<RoomCode> {
        match &self.screen {
            Screen::Game(g) => Some(g.session.room().code.clone()),
            _ => None,
        }
    }

    async fn send_guess(&mut self) {
        let Screen::Game(g) = &mut self.screen else {
            return;
        };
        if !g.can_guess() {
            return;
        }
        let Some(text) = g.take_guess() else {
            return;
        };
        let (result, effects) = g.session.submit_guess(&text);
        if result.correct {
            g.status_message = Some(format!("Correct! +{} points", result.points));
        }
        self.apply_effects(effects).await;
    }

    async fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Persist(patch) => {
                    let Some(code) = self.session_code() else {
                        continue;
                    };
                    if let Err(e) = self.repo.patch(&code, patch).await {
                        self.set_status(format!("Could not save room: {}", e));
                    }
                }
                Effect::AwardScore { player_id, points } => {
                    let Some(code) = self.session_code() else {
                        continue;
                    };
                    if let Err(e) = self.repo.award_score(&code, &player_id, points).await {
                        self.set_status(format!("Could not save score: {}", e));
                    }
                }
                Effect::ClearCanvas => {
                    if let Screen::Game(g) = &mut self.screen {
                        g.canvas.clear();
                    }
                }
                Effect::EndRoundAfter(delay) => {
                    event::schedule(&self.event_tx, self.generation, delay, Deferred::EndRound)
                }
                Effect::AdvanceAfter(delay) => {
                    event::schedule(&self.event_tx, self.generation, delay, Deferred::Advance)
                }
                Effect::ShowScoreboardAfter(delay) => event::schedule(
                    &self.event_tx,
                    self.generation,
                    delay,
                    Deferred::ShowScoreboard,
                ),
            }
        }
    }

    async fn on_tick(&mut self) {
        let effects = match &mut self.screen {
            Screen::Game(g) => g.session.tick(),
            _ => return,
        };
        self.apply_effects(effects).await;
    }

    async fn on_poll(&mut self) {
        let in_lobby = matches!(self.screen, Screen::Lobby(_));
        let in_round =
            matches!(&self.screen, Screen::Game(g) if !g.session.game().is_complete());
        if in_lobby {
            self.refresh_lobby().await;
        } else if in_round {
            self.refresh_game().await;
        }
    }

    async fn refresh_game(&mut self) {
        let Some(code) = self.session_code() else {
            return;
        };
        let snapshot = match self.repo.fetch(&code).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::debug!("Game refresh failed for {}: {}", code, e);
                return;
            }
        };
        let Screen::Game(g) = &mut self.screen else {
            return;
        };
        if let Err(e) = g.session.reconcile(snapshot) {
            self.to_dashboard(Some(e.to_string()));
        }
    }

    async fn on_deferred(&mut self, event: Deferred) {
        if event == Deferred::ShowScoreboard {
            return self.finish_game().await;
        }
        let Screen::Game(g) = &mut self.screen else {
            return;
        };
        let effects = match event {
            Deferred::EndRound => g.session.end_round(),
            Deferred::Advance => g.session.advance(&mut self.rng),
            Deferred::ShowScoreboard => return,
        };
        self.apply_effects(effects).await;
    }

    /// Record the local result against the latest roster and show standings.
    async fn finish_game(&mut self) {
        let Screen::Game(g) = &self.screen else {
            return;
        };
        let code = g.session.room().code.clone();
        let mut players = g.session.room().players.clone();
        match self.repo.fetch(&code).await {
            Ok(Some(room)) => players = room.players,
            Ok(None) => {}
            Err(e) => tracing::warn!("Using local scores for {}: {}", code, e),
        }

        let mut board = ScoreboardScreen::new(code, &players, self.identity.uid.clone());
        match self.repo.record_game(&self.identity, &players).await {
            Ok(profile) => {
                self.profile = Some(profile.clone());
                board.profile = Some(profile);
            }
            Err(e) => tracing::warn!("Could not record game for {}: {}", self.identity.uid, e),
        }

        self.generation += 1;
        self.screen = Screen::Scoreboard(board);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doodle_common::config::ROUND_DURATION_SECS;
    use doodle_common::game::GamePhase;
    use doodle_common::room::Player;
    use doodle_common::store::LocalStore;

    async fn app_for(uid: &str, name: &str) -> (App, mpsc::Receiver<AppEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let repo = RoomRepository::local(LocalStore::in_memory());
        let app = App::new(repo, Identity::new(uid, name), Timing::default(), 1, tx).await;
        (app, rx)
    }

    /// Alice creates a room, Bob joins through the shared store, both ready.
    async fn ready_room(app: &mut App) -> RoomCode {
        app.handle_action(Action::CreateRoom).await;
        let code = app.lobby_code().unwrap();

        app.repo.join(&code, Player::new("bob", "Bob")).await.unwrap();
        let room = app.repo.fetch(&code).await.unwrap().unwrap();
        let patch = lobby::toggle_ready(&room, "bob").unwrap();
        app.repo.patch(&code, patch).await.unwrap();

        app.handle_action(Action::ToggleReady).await;
        code
    }

    #[tokio::test]
    async fn test_invalid_code_rejected_before_lookup() {
        let (mut app, _rx) = app_for("alice", "Alice").await;
        for c in "ab1".chars() {
            app.handle_action(Action::TypeChar(c)).await;
        }
        app.handle_action(Action::JoinRoom).await;
        match &app.screen {
            Screen::Dashboard(s) => assert!(s.status_message.as_deref().unwrap().contains("6")),
            other => panic!("unexpected screen: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_room_stays_on_dashboard() {
        let (mut app, _rx) = app_for("alice", "Alice").await;
        for c in "ZZZZZZ".chars() {
            app.handle_action(Action::TypeChar(c)).await;
        }
        app.handle_action(Action::JoinRoom).await;
        match &app.screen {
            Screen::Dashboard(s) => {
                assert_eq!(s.status_message.as_deref(), Some("Room ZZZZZZ not found"))
            }
            other => panic!("unexpected screen: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_requires_everyone_ready() {
        let (mut app, _rx) = app_for("alice", "Alice").await;
        app.handle_action(Action::CreateRoom).await;
        let code = app.lobby_code().unwrap();
        app.repo.join(&code, Player::new("bob", "Bob")).await.unwrap();
        app.handle_action(Action::ToggleReady).await;

        app.handle_action(Action::StartGame).await;
        match &app.screen {
            Screen::Lobby(s) => assert!(s.status_message.is_some()),
            other => panic!("unexpected screen: {:?}", other),
        }
        assert!(!app.repo.fetch(&code).await.unwrap().unwrap().started);
    }

    #[tokio::test]
    async fn test_start_enters_game_as_drawer() {
        let (mut app, _rx) = app_for("alice", "Alice").await;
        let code = ready_room(&mut app).await;

        app.handle_action(Action::StartGame).await;
        assert!(app.repo.fetch(&code).await.unwrap().unwrap().started);
        match &app.screen {
            Screen::Game(g) => {
                assert!(g.is_drawing());
                assert!(g.canvas.is_blank());
                assert_eq!(g.session.phase(), &GamePhase::RoundActive);
            }
            other => panic!("unexpected screen: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stale_deferred_events_ignored() {
        let (mut app, _rx) = app_for("alice", "Alice").await;
        ready_room(&mut app).await;
        app.handle_action(Action::StartGame).await;

        let stale = app.generation - 1;
        app.handle_event(AppEvent::Deferred {
            generation: stale,
            event: Deferred::EndRound,
        })
        .await;
        match &app.screen {
            Screen::Game(g) => assert_eq!(g.session.phase(), &GamePhase::RoundActive),
            other => panic!("unexpected screen: {:?}", other),
        }

        let current = app.generation;
        app.handle_event(AppEvent::Deferred {
            generation: current,
            event: Deferred::EndRound,
        })
        .await;
        match &app.screen {
            Screen::Game(g) => assert_eq!(g.session.phase(), &GamePhase::RoundEnding),
            other => panic!("unexpected screen: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_leaving_abandons_session() {
        let (mut app, _rx) = app_for("alice", "Alice").await;
        ready_room(&mut app).await;
        app.handle_action(Action::StartGame).await;
        let in_game = app.generation;

        app.handle_action(Action::LeaveRoom).await;
        assert!(matches!(app.screen, Screen::Dashboard(_)));
        assert_ne!(app.generation, in_game);
    }

    #[tokio::test]
    async fn test_correct_guess_scores_and_schedules_round_end() {
        let (mut alice, _alice_rx) = app_for("alice", "Alice").await;
        let code = ready_room(&mut alice).await;
        alice.handle_action(Action::StartGame).await;

        // Bob's client sees the started room through its own store.
        let (tx, mut rx) = mpsc::channel(16);
        let room = alice.repo.fetch(&code).await.unwrap().unwrap();
        let bob_store = LocalStore::in_memory();
        bob_store.create_room(room).await.unwrap();
        let bob_repo = RoomRepository::local(bob_store);
        let mut bob =
            App::new(bob_repo, Identity::new("bob", "Bob"), Timing::default(), 1, tx).await;
        bob.enter_room(code.clone()).await;

        let word = match &bob.screen {
            Screen::Game(g) => g.session.game().turn.as_ref().unwrap().word.clone(),
            other => panic!("unexpected screen: {:?}", other),
        };
        for c in word.chars() {
            bob.handle_action(Action::TypeChar(c)).await;
        }
        bob.handle_action(Action::SendGuess).await;

        let stored = bob.repo.fetch(&code).await.unwrap().unwrap();
        assert_eq!(stored.player("bob").unwrap().score, ROUND_DURATION_SECS);

        // EndRound is scheduled after the render delay.
        match rx.recv().await {
            Some(AppEvent::Deferred { event, .. }) => assert_eq!(event, Deferred::EndRound),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    fn phase_of(app: &App) -> GamePhase {
        match &app.screen {
            Screen::Game(g) => g.session.phase().clone(),
            other => panic!("unexpected screen: {:?}", other),
        }
    }

    async fn run_out_clock(app: &mut App) {
        for _ in 0..ROUND_DURATION_SECS {
            app.handle_event(AppEvent::Tick).await;
        }
    }

    async fn deliver(app: &mut App, event: Deferred) {
        let generation = app.generation;
        app.handle_event(AppEvent::Deferred { generation, event }).await;
    }

    #[tokio::test]
    async fn test_full_game_ends_on_scoreboard_and_records_profile() {
        let (mut app, _rx) = app_for("alice", "Alice").await;
        let code = ready_room(&mut app).await;
        app.handle_action(Action::StartGame).await;

        // Alice's turn, then Bob's, both run out without a correct guess.
        run_out_clock(&mut app).await;
        assert_eq!(phase_of(&app), GamePhase::RoundEnding);
        deliver(&mut app, Deferred::Advance).await;
        assert_eq!(phase_of(&app), GamePhase::RoundActive);
        match &app.screen {
            Screen::Game(g) => assert!(!g.is_drawing()),
            other => panic!("unexpected screen: {:?}", other),
        }

        run_out_clock(&mut app).await;
        deliver(&mut app, Deferred::Advance).await;
        assert_eq!(phase_of(&app), GamePhase::GameComplete);

        let in_game = app.generation;
        deliver(&mut app, Deferred::ShowScoreboard).await;
        assert_ne!(app.generation, in_game);
        match &app.screen {
            Screen::Scoreboard(board) => {
                assert_eq!(board.code, code);
                assert_eq!(board.standings.len(), 2);
                assert!(board.winners.is_empty());
                let profile = board.profile.as_ref().unwrap();
                assert_eq!(profile.games_played, 1);
                assert_eq!(profile.games_won, 0);
            }
            other => panic!("unexpected screen: {:?}", other),
        }
        let stored = app.repo.fetch_profile("alice").await.unwrap().unwrap();
        assert_eq!(stored.games_played, 1);
        assert_eq!(app.profile.as_ref().map(|p| p.games_played), Some(1));
    }
}

//! Match lifecycle and the per-match actor

use std::pin::Pin;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use glam::Vec2;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, interval_at, sleep, Instant, Interval, MissedTickBehavior, Sleep};
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::store::scores::{sanitize_name, truncate_player_id};
use crate::store::{ScoreRecord, ScoreStore};
use crate::util::time::{tick_duration, COUNTDOWN_STEP, TEARDOWN_GRACE};
use crate::ws::protocol::{RosterEntry, ServerMsg};

use super::combat::MatchOutcome;
use super::simulation::Simulation;
use super::snapshot::{attenuate, hazard_state, personalize_event, SnapshotBuilder};
use super::world::{Obstacles, MAX_SLOTS};

/// Seconds on the waiting-room clock when the first player arrives
pub const WAITING_COUNTDOWN: u32 = 15;

pub const DEFAULT_NAME: &str = "Anon";

/// Pre-serialized frames headed to one connection
pub type Outbox = mpsc::UnboundedSender<Arc<str>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MatchPhase {
    Waiting = 0,
    Playing = 1,
    Done = 2,
}

impl MatchPhase {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Waiting,
            1 => Self::Playing,
            _ => Self::Done,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum JoinRejected {
    #[error("Match is full")]
    Full,

    #[error("Match already started")]
    Started,
}

/// A connected human seat
#[derive(Debug)]
pub struct Player {
    pub conn_id: Uuid,
    pub slot: u8,
    pub name: String,
    pub external_id: String,
    pub ready: bool,
    outbox: Outbox,
}

impl Player {
    fn send(&self, frame: &Arc<str>) {
        // Closed outbox means the connection is on its way out; its Leave follows
        let _ = self.outbox.send(frame.clone());
    }
}

/// Commands accepted by the match actor
#[derive(Debug)]
pub enum MatchCommand {
    Join {
        conn_id: Uuid,
        name: String,
        external_id: Option<String>,
        outbox: Outbox,
        reply: oneshot::Sender<Result<u8, JoinRejected>>,
    },
    Ready {
        conn_id: Uuid,
    },
    Waypoint {
        conn_id: Uuid,
        x: f32,
        y: f32,
    },
    FireTorpedo {
        conn_id: Uuid,
    },
    LayMine {
        conn_id: Uuid,
    },
    Leave {
        conn_id: Uuid,
    },
}

/// Match state (owned by the match task)
pub struct MatchState {
    pub id: Uuid,
    pub seed: u64,
    pub phase: MatchPhase,
    pub countdown: u32,
    pub players: Vec<Player>,
    pub sim: Option<Simulation>,
    obstacles: Obstacles,
    snapshots: SnapshotBuilder,
    rng: ChaCha8Rng,
}

impl MatchState {
    pub fn new(id: Uuid, seed: u64, obstacles: Obstacles) -> Self {
        Self {
            id,
            seed,
            phase: MatchPhase::Waiting,
            countdown: WAITING_COUNTDOWN,
            players: Vec::new(),
            sim: None,
            obstacles,
            snapshots: SnapshotBuilder::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn player(&self, conn_id: Uuid) -> Option<&Player> {
        self.players.iter().find(|p| p.conn_id == conn_id)
    }

    fn broadcast(&mut self, msg: &ServerMsg) {
        if let Some(frame) = self.snapshots.encode(msg) {
            for player in &self.players {
                player.send(&frame);
            }
        }
    }

    fn broadcast_waiting(&mut self) {
        let ready = self.players.iter().filter(|p| p.ready).count();
        let msg = ServerMsg::Waiting {
            count: self.players.len(),
            countdown: self.countdown,
            names: self.players.iter().map(|p| p.name.clone()).collect(),
            match_id: self.id,
            ready_count: (ready > 0).then_some(ready),
        };
        self.broadcast(&msg);
    }

    /// Seat a player in a uniformly random free slot
    pub fn join(
        &mut self,
        conn_id: Uuid,
        name: &str,
        external_id: Option<&str>,
        outbox: Outbox,
    ) -> Result<u8, JoinRejected> {
        if self.phase != MatchPhase::Waiting {
            return Err(JoinRejected::Started);
        }

        let free: Vec<u8> = (0..MAX_SLOTS as u8)
            .filter(|slot| self.players.iter().all(|p| p.slot != *slot))
            .collect();
        let slot = *free.choose(&mut self.rng).ok_or(JoinRejected::Full)?;

        let mut name = sanitize_name(name.trim());
        if name.is_empty() {
            name = DEFAULT_NAME.to_string();
        }

        info!(match_id = %self.id, %conn_id, slot, name = %name, "Player joined match");
        self.players.push(Player {
            conn_id,
            slot,
            name,
            external_id: external_id.map(truncate_player_id).unwrap_or_default(),
            ready: false,
            outbox,
        });
        self.broadcast_waiting();
        Ok(slot)
    }

    /// Remove a connection. While playing, its ship stays in the water under AI control.
    pub fn leave(&mut self, conn_id: Uuid) {
        let Some(idx) = self.players.iter().position(|p| p.conn_id == conn_id) else {
            return;
        };
        let player = self.players.remove(idx);
        info!(match_id = %self.id, %conn_id, slot = player.slot, "Player left match");

        match self.phase {
            MatchPhase::Waiting => self.broadcast_waiting(),
            MatchPhase::Playing => {
                if let Some(sim) = self.sim.as_mut() {
                    sim.take_over(player.slot);
                }
                self.broadcast(&ServerMsg::Disconnect {
                    slot: player.slot,
                    name: player.name,
                });
            }
            MatchPhase::Done => {}
        }
    }

    pub fn mark_ready(&mut self, conn_id: Uuid) {
        if self.phase != MatchPhase::Waiting {
            return;
        }
        let Some(player) = self.players.iter_mut().find(|p| p.conn_id == conn_id) else {
            return;
        };
        if !player.ready {
            player.ready = true;
            self.broadcast_waiting();
        }
    }

    pub fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|p| p.ready)
    }

    /// Full roster or every present player ready
    pub fn should_start(&self) -> bool {
        self.phase == MatchPhase::Waiting && (self.players.len() >= MAX_SLOTS || self.all_ready())
    }

    /// One second off the waiting clock; true once it hits zero
    pub fn countdown_second(&mut self) -> bool {
        self.countdown = self.countdown.saturating_sub(1);
        self.broadcast_waiting();
        self.countdown == 0
    }

    /// Fill empty slots with AI and hand every player their seat
    pub fn start(&mut self) {
        let humans: Vec<(u8, String)> = self.players.iter().map(|p| (p.slot, p.name.clone())).collect();
        let sim = Simulation::new(self.seed, self.obstacles.clone(), &humans);

        let roster: Vec<RosterEntry> = sim
            .ships
            .iter()
            .map(|s| RosterEntry {
                slot: s.slot,
                name: s.name.clone(),
                ai: !s.is_human(),
            })
            .collect();
        let obstacles = self.obstacles.to_vec();
        let hazards: Vec<_> = sim.hazards.iter().map(hazard_state).collect();

        for player in &self.players {
            let msg = ServerMsg::GameStart {
                slot: player.slot,
                roster: roster.clone(),
                obstacles: obstacles.clone(),
                hazards: hazards.clone(),
            };
            if let Some(frame) = self.snapshots.encode(&msg) {
                player.send(&frame);
            }
        }

        info!(match_id = %self.id, humans = humans.len(), "Match started");
        self.sim = Some(sim);
        self.phase = MatchPhase::Playing;
    }

    /// Route a player action to their ship
    pub fn apply(&mut self, command: MatchCommand) {
        if self.phase != MatchPhase::Playing {
            return;
        }
        let conn_id = match &command {
            MatchCommand::Waypoint { conn_id, .. }
            | MatchCommand::FireTorpedo { conn_id }
            | MatchCommand::LayMine { conn_id } => *conn_id,
            _ => return,
        };
        let Some(slot) = self.player(conn_id).map(|p| p.slot) else {
            return;
        };
        let Some(sim) = self.sim.as_mut() else {
            return;
        };

        match command {
            MatchCommand::Waypoint { x, y, .. } => sim.queue_waypoint(slot, Vec2::new(x, y)),
            MatchCommand::FireTorpedo { .. } => sim.request_torpedo(slot),
            MatchCommand::LayMine { .. } => sim.request_mine(slot),
            _ => {}
        }
    }

    /// Advance the simulation and fan out this tick's frames.
    /// Returns the results to persist when the match ends on this tick.
    pub fn tick(&mut self) -> Option<Vec<ScoreRecord>> {
        let sim = self.sim.as_mut()?;
        sim.step();

        let snapshot = self.snapshots.build(sim);
        if let Some(frame) = self.snapshots.encode(&ServerMsg::State(snapshot)) {
            for player in &self.players {
                player.send(&frame);
            }
        }

        for player in &self.players {
            for event in &sim.events {
                let msg = personalize_event(event, Some(player.slot), &sim.ships);
                if let Some(frame) = self.snapshots.encode(&msg) {
                    player.send(&frame);
                }
            }

            let Some(listener) = sim.ships.get(player.slot).map(|s| s.pos) else {
                continue;
            };
            for sound in &sim.sounds {
                if let Some(frame) = attenuate(sound, listener).and_then(|msg| self.snapshots.encode(&msg)) {
                    player.send(&frame);
                }
            }
        }

        self.poll_outcome()
    }

    /// Collect the simulation's terminal summary, if it has one
    pub fn poll_outcome(&mut self) -> Option<Vec<ScoreRecord>> {
        let outcome = self.sim.as_mut()?.take_outcome()?;
        Some(self.finish(outcome))
    }

    /// Personal results to connected players; returns one record per connected player
    fn finish(&mut self, outcome: MatchOutcome) -> Vec<ScoreRecord> {
        self.phase = MatchPhase::Done;
        let duration = outcome.duration.round() as u32;

        let mut records = Vec::with_capacity(self.players.len());
        for result in &outcome.results {
            let Some(player) = self.players.iter().find(|p| p.slot == result.slot) else {
                continue;
            };
            let msg = ServerMsg::GameOver {
                won: result.won,
                placement: result.placement,
                xp: result.xp,
                kills: result.kills,
                hits: result.hits,
                torpedoes_fired: result.torpedoes_fired,
                duration,
            };
            if let Some(frame) = self.snapshots.encode(&msg) {
                player.send(&frame);
            }

            records.push(ScoreRecord {
                username: player.name.clone(),
                player_id: player.external_id.clone(),
                xp: result.xp,
                kills: result.kills,
                hits: result.hits,
                torpedoes_fired: result.torpedoes_fired,
                placement: result.placement,
                won: result.won,
                game_time: outcome.duration,
            });
        }

        let stats = self.snapshots.stats();
        info!(
            match_id = %self.id,
            winner = ?outcome.winner,
            duration,
            frames = stats.total_frames,
            avg_frame_bytes = stats.avg_bytes(),
            "Match ended"
        );
        records
    }
}

/// Handle to a running match
#[derive(Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    commands: mpsc::UnboundedSender<MatchCommand>,
    phase: Arc<AtomicU8>,
    player_count: Arc<AtomicUsize>,
}

impl MatchHandle {
    /// False once the match task has gone away
    pub fn send(&self, command: MatchCommand) -> bool {
        self.commands.send(command).is_ok()
    }

    pub fn phase(&self) -> MatchPhase {
        MatchPhase::from_u8(self.phase.load(Ordering::Relaxed))
    }

    pub fn player_count(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }

    pub fn is_joinable(&self) -> bool {
        self.phase() == MatchPhase::Waiting && self.player_count() < MAX_SLOTS
    }
}

struct Registered {
    /// Insertion order
    seq: u64,
    handle: MatchHandle,
}

/// Registry of all active matches
pub struct MatchRegistry {
    matches: DashMap<Uuid, Registered>,
    next_seq: AtomicU64,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self {
            matches: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.get(id).map(|m| m.value().handle.clone())
    }

    pub fn insert(&self, handle: MatchHandle) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.matches.insert(handle.id, Registered { seq, handle });
    }

    pub fn remove(&self, id: &Uuid) -> Option<MatchHandle> {
        self.matches.remove(id).map(|(_, r)| r.handle)
    }

    pub fn active_matches(&self) -> usize {
        self.matches.len()
    }

    pub fn total_players(&self) -> usize {
        self.matches.iter().map(|m| m.value().handle.player_count()).sum()
    }

    /// Waiting matches with a free seat, oldest first
    pub fn joinable(&self) -> Vec<MatchHandle> {
        let mut open: Vec<(u64, MatchHandle)> = self
            .matches
            .iter()
            .filter(|m| m.value().handle.is_joinable())
            .map(|m| (m.value().seq, m.value().handle.clone()))
            .collect();
        open.sort_unstable_by_key(|(seq, _)| *seq);
        open.into_iter().map(|(_, handle)| handle).collect()
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// The single timer a match is waiting on. Replacing it drops the old one.
enum Schedule {
    Idle,
    Countdown(Interval),
    Tick(Interval),
    Teardown(Pin<Box<Sleep>>),
}

enum Timer {
    Countdown,
    Tick,
    Teardown,
}

impl Schedule {
    fn countdown() -> Self {
        Self::Countdown(interval_at(Instant::now() + COUNTDOWN_STEP, COUNTDOWN_STEP))
    }

    fn tick() -> Self {
        let mut ticks = interval(tick_duration());
        ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self::Tick(ticks)
    }

    fn teardown() -> Self {
        Self::Teardown(Box::pin(sleep(TEARDOWN_GRACE)))
    }

    async fn fire(&mut self) -> Timer {
        match self {
            Self::Idle => std::future::pending().await,
            Self::Countdown(ticks) => {
                ticks.tick().await;
                Timer::Countdown
            }
            Self::Tick(ticks) => {
                ticks.tick().await;
                Timer::Tick
            }
            Self::Teardown(grace) => {
                grace.as_mut().await;
                Timer::Teardown
            }
        }
    }
}

enum Flow {
    Continue,
    Stop,
}

/// The authoritative match actor
pub struct GameMatch {
    state: MatchState,
    commands: mpsc::UnboundedReceiver<MatchCommand>,
    schedule: Schedule,
    phase: Arc<AtomicU8>,
    player_count: Arc<AtomicUsize>,
    registry: Arc<MatchRegistry>,
    store: ScoreStore,
}

impl GameMatch {
    pub fn new(
        id: Uuid,
        seed: u64,
        obstacles: Obstacles,
        registry: Arc<MatchRegistry>,
        store: ScoreStore,
    ) -> (Self, MatchHandle) {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let phase = Arc::new(AtomicU8::new(MatchPhase::Waiting as u8));
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = MatchHandle {
            id,
            commands: commands_tx,
            phase: phase.clone(),
            player_count: player_count.clone(),
        };

        let game_match = Self {
            state: MatchState::new(id, seed, obstacles),
            commands,
            schedule: Schedule::Idle,
            phase,
            player_count,
            registry,
            store,
        };

        (game_match, handle)
    }

    /// Drive the match until teardown, then drop it from the registry
    pub async fn run(mut self) {
        let id = self.state.id;
        info!(match_id = %id, "Match created");

        loop {
            let flow = tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => Flow::Stop,
                },
                timer = self.schedule.fire() => self.handle_timer(timer),
            };
            self.publish();

            if let Flow::Stop = flow {
                break;
            }
        }

        self.registry.remove(&id);
        info!(match_id = %id, "Match removed from registry");
    }

    fn publish(&self) {
        self.phase.store(self.state.phase as u8, Ordering::Relaxed);
        self.player_count.store(self.state.players.len(), Ordering::Relaxed);
    }

    fn handle_command(&mut self, command: MatchCommand) -> Flow {
        match command {
            MatchCommand::Join {
                conn_id,
                name,
                external_id,
                outbox,
                reply,
            } => {
                let result = self.state.join(conn_id, &name, external_id.as_deref(), outbox);
                self.publish();
                if reply.send(result).is_err() {
                    debug!(match_id = %self.state.id, %conn_id, "Join requester went away");
                }
            }
            MatchCommand::Ready { conn_id } => self.state.mark_ready(conn_id),
            MatchCommand::Leave { conn_id } => self.state.leave(conn_id),
            action => self.state.apply(action),
        }
        self.advance()
    }

    fn handle_timer(&mut self, timer: Timer) -> Flow {
        match timer {
            Timer::Countdown => {
                if self.state.countdown_second() {
                    self.begin_play();
                }
                Flow::Continue
            }
            Timer::Tick => {
                if let Some(records) = self.state.tick() {
                    self.conclude(records);
                }
                Flow::Continue
            }
            Timer::Teardown => Flow::Stop,
        }
    }

    /// Re-evaluate phase transitions after a command
    fn advance(&mut self) -> Flow {
        match self.state.phase {
            MatchPhase::Waiting => {
                if self.state.players.is_empty() {
                    info!(match_id = %self.state.id, "Waiting room empty, discarding match");
                    return Flow::Stop;
                }
                if self.state.should_start() {
                    self.begin_play();
                } else if matches!(self.schedule, Schedule::Idle) {
                    self.schedule = Schedule::countdown();
                }
            }
            MatchPhase::Playing => {
                // Ships of departed players sail on under AI until the match decides itself
                if let Some(records) = self.state.poll_outcome() {
                    self.conclude(records);
                }
            }
            MatchPhase::Done => {}
        }
        Flow::Continue
    }

    fn begin_play(&mut self) {
        self.state.start();
        self.schedule = Schedule::tick();
    }

    /// Persist results off the tick path and start the teardown grace period
    fn conclude(&mut self, records: Vec<ScoreRecord>) {
        for record in records {
            let store = self.store.clone();
            let match_id = self.state.id;
            tokio::spawn(async move {
                let username = record.username.clone();
                if let Err(e) = store.record(record).await {
                    error!(%match_id, username = %username, error = %e, "Failed to persist score");
                }
            });
        }
        self.schedule = Schedule::teardown();
    }
}

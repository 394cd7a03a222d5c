use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::{log, ConnectionId, PlayerId};
use crate::games::SessionRng;
use super::food::FoodPool;
use super::player::{lay_out_body, PlayerState};
use super::session::PlayerSession;
use super::settings::{WorldSettings, COLORS, DEFAULT_PLAYER_NAME, MAX_NAME_LENGTH, SPAWN_MARGIN};
use super::types::{DeathReason, Direction, Point};

/// Headings a fresh snake may face. The applied direction resets to RIGHT
/// on spawn, so a LEFT-facing body would run into its own neck.
const SPAWN_FACINGS: [Direction; 3] = [Direction::Up, Direction::Down, Direction::Right];
const SPAWN_ATTEMPTS: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScoreUpdate {
    pub player_id: PlayerId,
    pub name: String,
    pub score: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined {
        player_id: PlayerId,
        color: &'static str,
        score: ScoreUpdate,
    },
    Renamed(ScoreUpdate),
}

#[derive(Clone, Debug, Default)]
pub struct TickOutcome {
    pub tick: u64,
    pub score_updates: Vec<ScoreUpdate>,
    pub deaths: Vec<(PlayerId, DeathReason)>,
    pub respawned: Vec<PlayerId>,
}

enum MoveDecision {
    Skip,
    Die {
        reason: DeathReason,
        occupant: Option<ConnectionId>,
    },
    Advance {
        new_head: Point,
        direction: Direction,
    },
}

/// Authoritative world: every session, the food pool and the tick counter.
/// All mutation goes through `&mut self`, so whoever holds the world owns
/// the simulation.
#[derive(Debug)]
pub struct World {
    settings: WorldSettings,
    sessions: BTreeMap<ConnectionId, PlayerSession>,
    food: FoodPool,
    tick: u64,
    next_color: usize,
    rng: SessionRng,
}

impl World {
    pub fn new(settings: WorldSettings, rng: SessionRng) -> Self {
        let food = FoodPool::new(settings.food_target);
        Self {
            settings,
            sessions: BTreeMap::new(),
            food,
            tick: 0,
            next_color: 0,
            rng,
        }
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    pub fn tick_index(&self) -> u64 {
        self.tick
    }

    pub fn food(&self) -> &FoodPool {
        &self.food
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn session(&self, connection_id: &ConnectionId) -> Option<&PlayerSession> {
        self.sessions.get(connection_id)
    }

    /// Joined players in movement order.
    pub fn players(&self) -> impl Iterator<Item = &PlayerState> {
        self.sessions.values().filter_map(|s| s.player.as_ref())
    }

    pub fn register(&mut self, connection_id: ConnectionId) -> bool {
        if self.sessions.contains_key(&connection_id) {
            return false;
        }
        self.sessions.insert(connection_id, PlayerSession::new(connection_id));
        true
    }

    /// Drops the session and hands back its player, if it had joined.
    pub fn unregister(&mut self, connection_id: &ConnectionId) -> Option<PlayerState> {
        self.sessions.remove(connection_id).and_then(|s| s.player)
    }

    /// First join creates and spawns the player; later joins rename it.
    /// Returns `None` for an unknown connection.
    pub fn join(&mut self, connection_id: ConnectionId, requested_name: &str) -> Option<JoinOutcome> {
        let name = normalize_name(requested_name);

        let session = self.sessions.get_mut(&connection_id)?;
        if let Some(player) = session.player.as_mut() {
            log!("[{}] renamed '{}' -> '{}'", player.id, player.name, name);
            player.name = name;
            return Some(JoinOutcome::Renamed(ScoreUpdate {
                player_id: player.id.clone(),
                name: player.name.clone(),
                score: player.score,
            }));
        }

        let color = COLORS[self.next_color % COLORS.len()];
        self.next_color = (self.next_color + 1) % COLORS.len();

        let mut player = PlayerState::new(PlayerId::generate(), name, color);
        let (head, facing) = self.pick_spawn(connection_id);
        player.respawn(head, facing, self.settings.initial_length);
        clear_food_under(&mut self.food, &player);
        log!("[{}] joined as '{}' at ({}, {})", player.id, player.name, head.x, head.y);

        let outcome = JoinOutcome::Joined {
            player_id: player.id.clone(),
            color,
            score: ScoreUpdate {
                player_id: player.id.clone(),
                name: player.name.clone(),
                score: 0,
            },
        };

        let session = self.sessions.get_mut(&connection_id)?;
        session.player = Some(player);
        session.reset_direction();
        Some(outcome)
    }

    /// Queues a turn for the next tick. Returns false when the session is
    /// unknown or the turn would reverse the snake.
    pub fn set_direction(&mut self, connection_id: &ConnectionId, direction: Direction) -> bool {
        match self.sessions.get_mut(connection_id) {
            Some(session) => session.request_direction(direction),
            None => false,
        }
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.tick += 1;
        let tick = self.tick;
        let mut outcome = TickOutcome {
            tick,
            ..TickOutcome::default()
        };

        self.replenish_food();
        self.respawn_due(tick, &mut outcome);

        let mut occupancy = self.build_occupancy();
        let order: Vec<ConnectionId> = self.sessions.keys().copied().collect();
        for connection_id in order {
            self.advance(connection_id, tick, &mut occupancy, &mut outcome);
        }

        outcome
    }

    fn replenish_food(&mut self) {
        let sessions = &self.sessions;
        let placed = self.food.replenish(self.settings.field_size, &mut self.rng, |cell| {
            sessions
                .values()
                .filter_map(|s| s.player.as_ref())
                .any(|p| p.alive && p.occupies(cell))
        });
        if self.food.len() < self.food.target() {
            log!(
                "Food pool below target after placing {}: {}/{}",
                placed,
                self.food.len(),
                self.food.target()
            );
        }
    }

    fn respawn_due(&mut self, tick: u64, outcome: &mut TickOutcome) {
        let due: Vec<ConnectionId> = self
            .sessions
            .values()
            .filter(|s| s.is_respawn_due(tick))
            .map(|s| s.connection_id)
            .collect();

        for connection_id in due {
            let (head, facing) = self.pick_spawn(connection_id);
            let initial_length = self.settings.initial_length;
            if let Some(session) = self.sessions.get_mut(&connection_id)
                && let Some(player) = session.player.as_mut()
            {
                player.respawn(head, facing, initial_length);
                clear_food_under(&mut self.food, player);
                outcome.respawned.push(player.id.clone());
                session.reset_direction();
            }
        }
    }

    fn build_occupancy(&self) -> HashMap<Point, ConnectionId> {
        let mut occupancy = HashMap::new();
        for session in self.sessions.values() {
            if let Some(player) = &session.player
                && player.alive
            {
                for cell in &player.body {
                    occupancy.insert(*cell, session.connection_id);
                }
            }
        }
        occupancy
    }

    fn advance(
        &mut self,
        connection_id: ConnectionId,
        tick: u64,
        occupancy: &mut HashMap<Point, ConnectionId>,
        outcome: &mut TickOutcome,
    ) {
        match self.decide_move(connection_id, occupancy) {
            MoveDecision::Skip => {}
            MoveDecision::Die { reason, occupant } => {
                if let Some(occupant) = occupant {
                    self.kill(occupant, DeathReason::StruckByOther, tick, occupancy, outcome);
                }
                self.kill(connection_id, reason, tick, occupancy, outcome);
            }
            MoveDecision::Advance { new_head, direction } => {
                self.apply_move(connection_id, new_head, direction, occupancy, outcome);
            }
        }
    }

    fn decide_move(
        &mut self,
        connection_id: ConnectionId,
        occupancy: &HashMap<Point, ConnectionId>,
    ) -> MoveDecision {
        let field = self.settings.field_size;
        let Some(session) = self.sessions.get_mut(&connection_id) else {
            return MoveDecision::Skip;
        };
        let Some(player) = session.player.as_ref() else {
            return MoveDecision::Skip;
        };
        if !player.alive {
            return MoveDecision::Skip;
        }
        let Some(head) = player.head() else {
            log!("[{}] alive with an empty body, skipped this tick", player.id);
            return MoveDecision::Skip;
        };
        let tail = player.tail();

        let direction = session.take_effective_direction();
        let new_head = head.step(direction);

        if !field.contains(new_head) {
            return MoveDecision::Die {
                reason: DeathReason::WallCollision,
                occupant: None,
            };
        }

        match occupancy.get(&new_head) {
            Some(&occupant) if occupant == connection_id => {
                if tail == Some(new_head) {
                    MoveDecision::Advance { new_head, direction }
                } else {
                    MoveDecision::Die {
                        reason: DeathReason::SelfCollision,
                        occupant: None,
                    }
                }
            }
            Some(&occupant) => MoveDecision::Die {
                reason: DeathReason::OtherSnakeCollision,
                occupant: Some(occupant),
            },
            None => MoveDecision::Advance { new_head, direction },
        }
    }

    fn apply_move(
        &mut self,
        connection_id: ConnectionId,
        new_head: Point,
        direction: Direction,
        occupancy: &mut HashMap<Point, ConnectionId>,
        outcome: &mut TickOutcome,
    ) {
        let grew = self.food.take(&new_head);
        let reward = self.settings.food_reward;

        let Some(session) = self.sessions.get_mut(&connection_id) else {
            return;
        };
        let Some(player) = session.player.as_mut() else {
            return;
        };

        if grew {
            player.score += reward;
            log!(
                "[{}] ate food at ({}, {}). Score: {}",
                player.id,
                new_head.x,
                new_head.y,
                player.score
            );
            outcome.score_updates.push(ScoreUpdate {
                player_id: player.id.clone(),
                name: player.name.clone(),
                score: player.score,
            });
        } else if let Some(tail) = player.pop_tail()
            && occupancy.get(&tail) == Some(&connection_id)
        {
            occupancy.remove(&tail);
        }

        player.push_head(new_head);
        occupancy.insert(new_head, connection_id);
        session.last_direction = Some(direction);
    }

    fn kill(
        &mut self,
        connection_id: ConnectionId,
        reason: DeathReason,
        tick: u64,
        occupancy: &mut HashMap<Point, ConnectionId>,
        outcome: &mut TickOutcome,
    ) {
        let respawn_delay = self.settings.respawn_delay;
        let Some(session) = self.sessions.get_mut(&connection_id) else {
            return;
        };
        let Some(player) = session.player.as_mut() else {
            return;
        };
        if !player.alive {
            return;
        }

        for cell in &player.body {
            if occupancy.get(cell) == Some(&connection_id) {
                occupancy.remove(cell);
            }
        }
        player.kill();
        session.respawn_at = tick + respawn_delay;
        log!("[{}] died ({:?}) at tick {}, respawn at {}", player.id, reason, tick, session.respawn_at);
        outcome.deaths.push((player.id.clone(), reason));
    }

    /// Picks a head inside the spawn margin and a facing, preferring a body
    /// that overlaps neither food nor another living snake.
    fn pick_spawn(&mut self, connection_id: ConnectionId) -> (Point, Direction) {
        let field = self.settings.field_size;
        let length = self.settings.initial_length;
        let mut candidate = (Point::new(field.cols / 2, field.rows / 2), Direction::Right);

        for _ in 0..SPAWN_ATTEMPTS {
            let head = Point::new(
                self.rng.random_range(SPAWN_MARGIN..field.cols - SPAWN_MARGIN),
                self.rng.random_range(SPAWN_MARGIN..field.rows - SPAWN_MARGIN),
            );
            let facing = self.rng.pick(&SPAWN_FACINGS);
            candidate = (head, facing);

            let body: VecDeque<Point> = lay_out_body(head, facing, length);
            let blocked = body.iter().any(|cell| self.food.contains(cell))
                || self
                    .sessions
                    .values()
                    .filter(|s| s.connection_id != connection_id)
                    .filter_map(|s| s.player.as_ref())
                    .any(|p| p.alive && body.iter().any(|cell| p.occupies(cell)));
            if !blocked {
                break;
            }
        }

        candidate
    }
}

/// Food never shares a cell with a living body, including one that was
/// placed over food after every spawn attempt was blocked.
fn clear_food_under(food: &mut FoodPool, player: &PlayerState) {
    for cell in &player.body {
        food.take(cell);
    }
}

fn normalize_name(requested: &str) -> String {
    let trimmed = requested.trim();
    if trimmed.is_empty() {
        return DEFAULT_PLAYER_NAME.to_string();
    }
    trimmed.chars().take(MAX_NAME_LENGTH).collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn create_world() -> World {
        let mut world = World::new(WorldSettings::clamped(40, 40, 120), SessionRng::new(42));
        world.food = FoodPool::new(0);
        world
    }

    fn join(world: &mut World, id: u64, name: &str) -> ConnectionId {
        let connection_id = ConnectionId::new(id);
        assert!(world.register(connection_id));
        assert!(world.join(connection_id, name).is_some());
        connection_id
    }

    fn place(world: &mut World, connection_id: ConnectionId, cells: &[(i32, i32)], last: Direction) {
        let session = world.sessions.get_mut(&connection_id).unwrap();
        let cells: Vec<Point> = cells.iter().map(|&(x, y)| Point::new(x, y)).collect();
        session.player.as_mut().unwrap().set_body(&cells);
        session.last_direction = Some(last);
        session.pending_direction = None;
    }

    fn player(world: &World, connection_id: ConnectionId) -> &PlayerState {
        world.session(&connection_id).unwrap().player.as_ref().unwrap()
    }

    fn turn(world: &mut World, connection_id: ConnectionId, direction: Direction) {
        assert!(world.set_direction(&connection_id, direction));
    }

    #[test]
    fn test_join_spawns_player() {
        let mut world = create_world();
        let connection_id = ConnectionId::new(1);
        world.register(connection_id);

        let outcome = world.join(connection_id, "  Alice  ").unwrap();
        let JoinOutcome::Joined { player_id, color, score } = outcome else {
            panic!("expected a fresh join");
        };
        assert_eq!(color, COLORS[0]);
        assert_eq!(score.score, 0);
        assert_eq!(score.name, "Alice");

        let session = world.session(&connection_id).unwrap();
        let p = session.player.as_ref().unwrap();
        assert_eq!(p.id, player_id);
        assert!(p.alive);
        assert_eq!(p.body.len(), 6);
        assert_eq!(session.last_direction, Some(Direction::Right));
        assert_eq!(session.pending_direction, Some(Direction::Right));
    }

    #[test]
    fn test_join_with_blank_name_uses_default() {
        let mut world = create_world();
        let id = join(&mut world, 1, "   ");
        assert_eq!(player(&world, id).name, "Player");
    }

    #[test]
    fn test_long_names_are_truncated() {
        let mut world = create_world();
        let id = join(&mut world, 1, &"x".repeat(100));
        assert_eq!(player(&world, id).name.len(), MAX_NAME_LENGTH);
    }

    #[test]
    fn test_colors_assigned_round_robin() {
        let mut world = create_world();
        let mut colors = Vec::new();
        for i in 0..12 {
            let id = join(&mut world, i, "p");
            colors.push(player(&world, id).color);
        }
        assert_eq!(colors[0], COLORS[0]);
        assert_eq!(colors[9], COLORS[9]);
        assert_eq!(colors[10], COLORS[0]);
        assert_eq!(colors[11], COLORS[1]);
    }

    #[test]
    fn test_second_join_renames_and_keeps_score() {
        let mut world = create_world();
        let id = join(&mut world, 1, "Alice");
        world.sessions.get_mut(&id).unwrap().player.as_mut().unwrap().score = 30;
        let body_before = player(&world, id).body.clone();

        let outcome = world.join(id, "Bob").unwrap();
        let JoinOutcome::Renamed(update) = outcome else {
            panic!("expected a rename");
        };
        assert_eq!(update.name, "Bob");
        assert_eq!(update.score, 30);
        assert_eq!(player(&world, id).body, body_before);
    }

    #[test]
    fn test_join_unknown_connection() {
        let mut world = create_world();
        assert!(world.join(ConnectionId::new(9), "Ghost").is_none());
        assert!(!world.set_direction(&ConnectionId::new(9), Direction::Up));
    }

    #[test]
    fn test_reverse_direction_is_rejected() {
        let mut world = create_world();
        let id = join(&mut world, 1, "Alice");
        let head = player(&world, id).head().unwrap();

        assert!(!world.set_direction(&id, Direction::Left));
        world.tick();

        assert_eq!(player(&world, id).head(), Some(head.step(Direction::Right)));
        assert_eq!(world.session(&id).unwrap().last_direction, Some(Direction::Right));
    }

    #[test]
    fn test_move_keeps_length() {
        let mut world = create_world();
        let id = join(&mut world, 1, "Alice");
        place(&mut world, id, &[(10, 10), (9, 10), (8, 10), (7, 10), (6, 10), (5, 10)], Direction::Right);
        turn(&mut world, id, Direction::Up);

        world.tick();

        let p = player(&world, id);
        assert_eq!(p.head(), Some(Point::new(10, 11)));
        assert_eq!(p.tail(), Some(Point::new(6, 10)));
        assert_eq!(p.body.len(), 6);
        assert_eq!(world.session(&id).unwrap().last_direction, Some(Direction::Up));
    }

    #[test]
    fn test_out_of_bounds_kills() {
        let mut world = create_world();
        let id = join(&mut world, 1, "Alice");
        place(&mut world, id, &[(39, 20), (38, 20), (37, 20), (36, 20), (35, 20), (34, 20)], Direction::Right);

        let outcome = world.tick();

        let session = world.session(&id).unwrap();
        let p = session.player.as_ref().unwrap();
        assert!(!p.alive);
        assert!(p.body.is_empty());
        assert_eq!(session.respawn_at, outcome.tick + 15);
        assert_eq!(outcome.deaths, vec![(p.id.clone(), DeathReason::WallCollision)]);
    }

    #[test]
    fn test_moving_below_zero_kills() {
        let mut world = create_world();
        let id = join(&mut world, 1, "Alice");
        place(&mut world, id, &[(5, 0), (5, 1), (5, 2), (5, 3)], Direction::Down);

        world.tick();

        assert!(!player(&world, id).alive);
    }

    #[test]
    fn test_loop_onto_vacated_tail_survives() {
        let mut world = create_world();
        let id = join(&mut world, 1, "Alice");
        place(&mut world, id, &[(10, 10), (9, 10), (8, 10), (7, 10)], Direction::Right);

        for _ in 0..3 {
            world.tick();
        }
        assert_eq!(player(&world, id).head(), Some(Point::new(13, 10)));

        turn(&mut world, id, Direction::Up);
        world.tick();
        turn(&mut world, id, Direction::Left);
        world.tick();
        assert_eq!(player(&world, id).tail(), Some(Point::new(12, 10)));

        turn(&mut world, id, Direction::Down);
        let outcome = world.tick();

        let p = player(&world, id);
        assert!(outcome.deaths.is_empty());
        assert!(p.alive);
        assert_eq!(p.head(), Some(Point::new(12, 10)));
        assert_eq!(p.body.len(), 4);
        let unique: HashSet<Point> = p.body.iter().copied().collect();
        assert_eq!(unique.len(), 4);
        assert!(p.occupies(&Point::new(12, 10)));
    }

    #[test]
    fn test_running_into_own_body_kills() {
        let mut world = create_world();
        let id = join(&mut world, 1, "Alice");
        place(
            &mut world,
            id,
            &[(10, 10), (11, 10), (11, 11), (10, 11), (9, 11), (9, 10)],
            Direction::Left,
        );
        turn(&mut world, id, Direction::Up);

        let outcome = world.tick();

        assert!(!player(&world, id).alive);
        assert_eq!(outcome.deaths[0].1, DeathReason::SelfCollision);
    }

    #[test]
    fn test_eating_food_grows_and_scores() {
        let mut world = create_world();
        let id = join(&mut world, 1, "Alice");
        place(&mut world, id, &[(10, 10), (9, 10), (8, 10), (7, 10), (6, 10), (5, 10)], Direction::Right);
        world.food.insert(Point::new(11, 10));

        let outcome = world.tick();

        let p = player(&world, id);
        assert_eq!(p.score, 10);
        assert_eq!(p.body.len(), 7);
        assert_eq!(p.head(), Some(Point::new(11, 10)));
        assert_eq!(p.tail(), Some(Point::new(5, 10)));
        assert!(!world.food.contains(&Point::new(11, 10)));
        assert_eq!(
            outcome.score_updates,
            vec![ScoreUpdate {
                player_id: p.id.clone(),
                name: "Alice".to_string(),
                score: 10,
            }]
        );
    }

    #[test]
    fn test_replenish_avoids_living_bodies() {
        let mut world = World::new(WorldSettings::clamped(40, 40, 120), SessionRng::new(1));
        for i in 0..5 {
            join(&mut world, i, "p");
        }

        world.replenish_food();

        assert_eq!(world.food.len(), 60);
        for p in world.players() {
            assert!(world.food.iter().all(|cell| !p.occupies(cell)));
        }
    }

    #[test]
    fn test_striking_another_body_kills_both() {
        let mut world = create_world();
        let a = join(&mut world, 1, "A");
        let b = join(&mut world, 2, "B");
        place(&mut world, a, &[(10, 10), (9, 10), (8, 10), (7, 10)], Direction::Right);
        place(&mut world, b, &[(11, 13), (11, 12), (11, 11), (11, 10), (11, 9)], Direction::Up);

        let outcome = world.tick();

        assert!(!player(&world, a).alive);
        assert!(!player(&world, b).alive);
        assert_eq!(world.session(&a).unwrap().respawn_at, outcome.tick + 15);
        assert_eq!(world.session(&b).unwrap().respawn_at, outcome.tick + 15);
        assert_eq!(outcome.deaths.len(), 2);
        assert!(outcome.deaths.contains(&(player(&world, b).id.clone(), DeathReason::StruckByOther)));
    }

    #[test]
    fn test_heads_into_each_others_bodies_both_die() {
        let mut world = create_world();
        let a = join(&mut world, 1, "A");
        let b = join(&mut world, 2, "B");
        place(&mut world, a, &[(10, 10), (11, 10), (12, 10)], Direction::Left);
        place(&mut world, b, &[(11, 11), (10, 11), (9, 11)], Direction::Right);
        turn(&mut world, a, Direction::Up);
        turn(&mut world, b, Direction::Down);

        world.tick();

        assert!(!player(&world, a).alive);
        assert!(!player(&world, b).alive);
    }

    #[test]
    fn test_head_on_into_same_cell_both_die() {
        let mut world = create_world();
        let a = join(&mut world, 1, "A");
        let b = join(&mut world, 2, "B");
        place(&mut world, a, &[(10, 10), (9, 10), (8, 10)], Direction::Right);
        place(&mut world, b, &[(12, 10), (13, 10), (14, 10)], Direction::Left);

        world.tick();

        assert!(!player(&world, a).alive);
        assert!(!player(&world, b).alive);
    }

    #[test]
    fn test_following_a_vacating_tail_is_safe() {
        let mut world = create_world();
        let a = join(&mut world, 1, "A");
        let b = join(&mut world, 2, "B");
        place(&mut world, a, &[(13, 10), (12, 10), (11, 10)], Direction::Right);
        place(&mut world, b, &[(10, 10), (9, 10), (8, 10)], Direction::Right);

        world.tick();

        assert!(player(&world, a).alive);
        assert!(player(&world, b).alive);
        assert_eq!(player(&world, b).head(), Some(Point::new(11, 10)));
    }

    #[test]
    fn test_respawn_waits_for_deadline() {
        let mut world = create_world();
        let id = join(&mut world, 1, "Alice");
        place(&mut world, id, &[(39, 20), (38, 20), (37, 20), (36, 20), (35, 20), (34, 20)], Direction::Right);

        let death_tick = world.tick().tick;
        let respawn_at = world.session(&id).unwrap().respawn_at;
        assert_eq!(respawn_at, death_tick + 15);

        while world.tick_index() + 1 < respawn_at {
            let outcome = world.tick();
            assert!(outcome.respawned.is_empty());
            assert!(!player(&world, id).alive);
        }

        let outcome = world.tick();
        assert_eq!(outcome.tick, respawn_at);
        assert_eq!(outcome.respawned.len(), 1);
        let p = player(&world, id);
        assert!(p.alive);
        assert_eq!(p.body.len(), 6);
        assert_eq!(world.session(&id).unwrap().last_direction, Some(Direction::Right));
    }

    fn fill_with_food(world: &mut World) {
        let field = world.settings.field_size;
        for x in 0..field.cols {
            for y in 0..field.rows {
                world.food.insert(Point::new(x, y));
            }
        }
    }

    #[test]
    fn test_spawn_never_lands_on_food() {
        let mut world = create_world();
        fill_with_food(&mut world);
        let cells = world.food.len();

        let id = join(&mut world, 1, "Alice");

        let p = player(&world, id);
        assert!(p.body.iter().all(|c| !world.food.contains(c)));
        assert_eq!(world.food.len(), cells - p.body.len());
    }

    #[test]
    fn test_spawn_prefers_cells_without_food() {
        let mut world = create_world();
        for x in 0..20 {
            for y in 0..40 {
                world.food.insert(Point::new(x, y));
            }
        }
        let cells = world.food.len();

        let id = join(&mut world, 1, "Alice");

        assert!(player(&world, id).body.iter().all(|c| c.x >= 20));
        assert_eq!(world.food.len(), cells);
    }

    #[test]
    fn test_respawn_clears_food_under_body() {
        let mut world = create_world();
        let id = join(&mut world, 1, "Alice");
        place(&mut world, id, &[(39, 20), (38, 20), (37, 20), (36, 20), (35, 20), (34, 20)], Direction::Right);
        world.tick();
        fill_with_food(&mut world);

        while world.tick().respawned.is_empty() {}

        let p = player(&world, id);
        assert!(p.alive);
        assert!(p.body.iter().all(|c| !world.food.contains(c)));
    }

    #[test]
    fn test_unregister_returns_player() {
        let mut world = create_world();
        let id = join(&mut world, 1, "Alice");
        let idle = ConnectionId::new(2);
        world.register(idle);

        assert_eq!(world.unregister(&id).map(|p| p.name), Some("Alice".to_string()));
        assert!(world.unregister(&idle).is_none());
        assert!(world.unregister(&id).is_none());
        assert_eq!(world.session_count(), 0);
    }

    #[test]
    fn test_bodies_stay_unique_over_many_ticks() {
        let mut world = World::new(WorldSettings::clamped(40, 40, 120), SessionRng::new(99));
        let ids: Vec<ConnectionId> = (0..6).map(|i| join(&mut world, i, "p")).collect();
        let mut steering = SessionRng::new(7);

        for _ in 0..400 {
            for id in &ids {
                world.set_direction(id, steering.pick(&Direction::ALL));
            }
            world.tick();
            for p in world.players().filter(|p| p.alive) {
                let unique: HashSet<Point> = p.body.iter().copied().collect();
                assert_eq!(unique.len(), p.body.len());
                assert!(p.body.len() >= 6);
                assert!(p.body.iter().all(|c| world.settings.field_size.contains(*c)));
                assert!(p.body.iter().all(|c| !world.food.contains(c)));
            }
        }
    }
}

use std::collections::{HashSet, VecDeque};

use crate::PlayerId;
use super::types::{Direction, Point};

/// Per-player simulation data. `body` is head first; `body_set` mirrors it.
#[derive(Clone, Debug)]
pub struct PlayerState {
    pub id: PlayerId,
    pub name: String,
    pub color: &'static str,
    pub body: VecDeque<Point>,
    body_set: HashSet<Point>,
    pub alive: bool,
    pub score: u32,
}

impl PlayerState {
    pub fn new(id: PlayerId, name: String, color: &'static str) -> Self {
        Self {
            id,
            name,
            color,
            body: VecDeque::new(),
            body_set: HashSet::new(),
            alive: false,
            score: 0,
        }
    }

    /// Replaces the body with `length` cells starting at `head` and trailing
    /// away from `facing`, and marks the player alive.
    pub fn respawn(&mut self, head: Point, facing: Direction, length: usize) {
        self.body = lay_out_body(head, facing, length);
        self.body_set = self.body.iter().copied().collect();
        self.alive = true;
    }

    pub fn kill(&mut self) {
        self.alive = false;
        self.body.clear();
        self.body_set.clear();
    }

    pub fn head(&self) -> Option<Point> {
        self.body.front().copied()
    }

    pub fn tail(&self) -> Option<Point> {
        self.body.back().copied()
    }

    pub fn occupies(&self, point: &Point) -> bool {
        self.body_set.contains(point)
    }

    pub fn push_head(&mut self, head: Point) {
        self.body.push_front(head);
        self.body_set.insert(head);
    }

    pub fn pop_tail(&mut self) -> Option<Point> {
        let tail = self.body.pop_back()?;
        // a tail chase leaves the new head on the same cell
        if self.body.front() != Some(&tail) {
            self.body_set.remove(&tail);
        }
        Some(tail)
    }

    #[cfg(test)]
    pub(crate) fn set_body(&mut self, cells: &[Point]) {
        self.body = cells.iter().copied().collect();
        self.body_set = self.body.iter().copied().collect();
        self.alive = !cells.is_empty();
    }
}

pub fn lay_out_body(head: Point, facing: Direction, length: usize) -> VecDeque<Point> {
    let (dx, dy) = facing.delta();
    (0..length as i32)
        .map(|i| head.translate(-dx * i, -dy * i))
        .collect()
}

use std::collections::HashSet;

use crate::games::SessionRng;
use super::types::{FieldSize, Point};

/// Upper bound on samples per replenish call, as a multiple of the target.
const SAMPLES_PER_TARGET: usize = 50;

#[derive(Clone, Debug)]
pub struct FoodPool {
    cells: HashSet<Point>,
    target: usize,
}

impl FoodPool {
    pub fn new(target: usize) -> Self {
        Self {
            cells: HashSet::with_capacity(target),
            target,
        }
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, point: &Point) -> bool {
        self.cells.contains(point)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Point> {
        self.cells.iter()
    }

    /// Removes the food at `point`, returning whether there was any.
    pub fn take(&mut self, point: &Point) -> bool {
        self.cells.remove(point)
    }

    /// Samples random cells until the pool is back at its target. Cells for
    /// which `occupied` returns true are rejected. Returns the number placed.
    pub fn replenish<F>(&mut self, field: FieldSize, rng: &mut SessionRng, occupied: F) -> usize
    where
        F: Fn(&Point) -> bool,
    {
        let mut placed = 0;
        let mut samples = 0;
        let max_samples = self.target.saturating_mul(SAMPLES_PER_TARGET);

        while self.cells.len() < self.target && samples < max_samples {
            samples += 1;
            let candidate = Point::new(rng.random_range(0..field.cols), rng.random_range(0..field.rows));
            if self.cells.contains(&candidate) || occupied(&candidate) {
                continue;
            }
            self.cells.insert(candidate);
            placed += 1;
        }

        placed
    }

    #[cfg(test)]
    pub(crate) fn insert(&mut self, point: Point) {
        self.cells.insert(point);
    }
}

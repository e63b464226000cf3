use rand::{Rng, SeedableRng, rngs::StdRng};
use venue_grid_core::{EntityId, GridError, PathOptions, Pathfinder, Position, TileGrid};

/// Ticks a patron may be blocked before it gives up on its goal.
const MAX_STALLS: u32 = 3;
/// Random goals tried per tick before a patron waits a turn.
const GOAL_ATTEMPTS: usize = 8;

/// A patron wandering the venue between random goals.
#[derive(Debug, Clone)]
pub struct Patron {
    pub id: EntityId,
    pub position: Position,
    pub goal: Option<Position>,
    /// Current planned route, starting at `position`.
    pub route: Vec<Position>,
    pub stalls: u32,
    pub steps_taken: usize,
}

/// The set of patrons and the RNG that drives their goal choices.
pub struct Crowd {
    pub patrons: Vec<Patron>,
    rng: StdRng,
}

impl Crowd {
    /// Places up to `count` patrons, entrances first, then random free
    /// walkable tiles. Claims each tile on the grid.
    pub fn spawn(
        grid: &mut TileGrid,
        entrances: &[Position],
        count: usize,
        seed: u64,
    ) -> Result<Self, GridError> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut free: Vec<Position> = grid
            .tiles()
            .enumerate()
            .filter(|(_, tile)| tile.walkable() && !tile.is_occupied())
            .map(|(pos, _)| pos)
            .collect();
        // Entrances go to the back so `pop` hands them out first.
        free.sort_by_key(|pos| entrances.contains(pos));

        let mut patrons = Vec::with_capacity(count);
        for id in 0..count {
            let at_entrance = free.last().is_some_and(|pos| entrances.contains(pos));
            let position = if at_entrance {
                free.pop()
            } else if free.is_empty() {
                None
            } else {
                let pick = rng.random_range(0..free.len());
                Some(free.swap_remove(pick))
            };
            let Some(position) = position else {
                break;
            };
            grid.set_occupant(position.x, position.y, id)?;
            patrons.push(Patron {
                id,
                position,
                goal: None,
                route: vec![position],
                stalls: 0,
                steps_taken: 0,
            });
        }

        Ok(Crowd { patrons, rng })
    }

    /// Advances every patron by at most one step.
    ///
    /// Each move is a clear-then-claim on the grid, done only once the
    /// destination is confirmed free.
    pub fn tick(&mut self, pathfinder: &mut Pathfinder, options: &PathOptions) -> Result<(), GridError> {
        for index in 0..self.patrons.len() {
            let needs_goal = {
                let patron = &self.patrons[index];
                patron.goal.is_none_or(|goal| goal == patron.position) || patron.stalls > MAX_STALLS
            };
            if needs_goal {
                let from = self.patrons[index].position;
                let goal = self.pick_goal(pathfinder, from);
                let patron = &mut self.patrons[index];
                patron.goal = goal;
                patron.stalls = 0;
            }

            let patron = &mut self.patrons[index];
            let Some(goal) = patron.goal else {
                patron.route = vec![patron.position];
                continue;
            };

            let from = patron.position;
            patron.route = pathfinder
                .find_path(from.x, from.y, goal.x, goal.y, options)
                .unwrap_or_else(|| vec![from]);

            let Some(&next) = patron.route.get(1) else {
                patron.goal = None;
                continue;
            };
            if pathfinder.grid().is_occupied(next.x, next.y)? {
                patron.stalls += 1;
                continue;
            }
            pathfinder.grid_mut().move_occupant(patron.id, from, next)?;
            patron.position = next;
            patron.route.remove(0);
            patron.steps_taken += 1;
        }
        Ok(())
    }

    /// Picks a random walkable, unoccupied tile that `from` can reach.
    fn pick_goal(&mut self, pathfinder: &Pathfinder, from: Position) -> Option<Position> {
        let grid = pathfinder.grid();
        if grid.width() == 0 || grid.height() == 0 {
            return None;
        }
        (0..GOAL_ATTEMPTS).find_map(|_| {
            let candidate = Position::new(
                self.rng.random_range(0..grid.width()),
                self.rng.random_range(0..grid.height()),
            );
            let free = grid.is_walkable(candidate.x, candidate.y)
                && grid.is_occupied(candidate.x, candidate.y) == Ok(false);
            (free && candidate != from && pathfinder.is_reachable(from.x, from.y, candidate.x, candidate.y))
                .then_some(candidate)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use venue_grid_core::load_venue_from_string;

    const BAR: &str = "
        WL WL WL WL WL WL
        WL FL FL FL BR WL
        WL FL DF DF FL WL
        WL FL DF DF FL WL
        WL WL DR WL WL WL
        WL FL FL EN FL WL
        WL WL WL WL WL WL
    ";

    fn setup(count: usize) -> (Pathfinder, Crowd) {
        let mut venue = load_venue_from_string(BAR).unwrap();
        let crowd = Crowd::spawn(&mut venue.grid, &venue.entrances, count, 7).unwrap();
        (Pathfinder::new(venue.grid), crowd)
    }

    #[test]
    fn spawn_fills_entrances_first_and_claims_tiles() {
        let (finder, crowd) = setup(4);
        assert_eq!(crowd.patrons.len(), 4);
        assert_eq!(crowd.patrons[0].position, Position::new(3, 5));
        assert_eq!(finder.grid().occupied_count(), 4);
        for patron in &crowd.patrons {
            assert_eq!(
                finder.grid().get_occupant(patron.position.x, patron.position.y),
                Ok(Some(patron.id))
            );
        }
    }

    #[test]
    fn spawn_stops_when_the_venue_is_full() {
        let (finder, crowd) = setup(100);
        let walkable = finder.grid().tiles().iter().filter(|t| t.walkable()).count();
        assert_eq!(crowd.patrons.len(), walkable);
    }

    #[test]
    fn default_options_step_like_get_next_step() {
        let (mut finder, mut crowd) = setup(1);
        let options = PathOptions::next_step();
        let mut compared = 0;
        for _ in 0..30 {
            let patron = &crowd.patrons[0];
            let expected = patron
                .goal
                .filter(|&goal| goal != patron.position)
                .map(|goal| {
                    finder
                        .get_next_step(patron.position.x, patron.position.y, goal.x, goal.y)
                        .unwrap_or(patron.position)
                });
            crowd.tick(&mut finder, &options).unwrap();
            if let Some(expected) = expected {
                assert_eq!(crowd.patrons[0].position, expected);
                compared += 1;
            }
        }
        assert!(compared > 0);
    }

    #[test]
    fn ticks_keep_occupancy_consistent() {
        let (mut finder, mut crowd) = setup(5);
        let options = PathOptions::next_step();
        for _ in 0..40 {
            crowd.tick(&mut finder, &options).unwrap();
            assert_eq!(finder.grid().occupied_count(), crowd.patrons.len());
            for patron in &crowd.patrons {
                assert_eq!(
                    finder.grid().get_occupant(patron.position.x, patron.position.y),
                    Ok(Some(patron.id))
                );
                assert!(finder.grid().is_walkable(patron.position.x, patron.position.y));
            }
        }
        assert!(crowd.patrons.iter().any(|p| p.steps_taken > 0));
    }
}

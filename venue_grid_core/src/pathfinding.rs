//! A* search over a [`TileGrid`].
//!
//! All per-search scratch state lives in a search context created on the
//! stack of each call, so a [`Pathfinder`] can answer queries through `&self`
//! and be shared between threads without any locking.

use std::{
    collections::{HashMap, HashSet},
    f64::consts::SQRT_2,
};

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::{Position, heap::MinHeap, tile_grid::TileGrid};

const ORTHOGONAL: [(isize, isize); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
const DIAGONAL: [(isize, isize); 4] = [(1, -1), (1, 1), (-1, 1), (-1, -1)];

/// Knobs for a single search.
///
/// Deserializes from camelCase keys and fills any missing field from
/// [`PathOptions::default`], so `{"allowDiagonal": false}` is a valid bundle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PathOptions {
    /// Enable 8-directional movement.
    pub allow_diagonal: bool,
    /// Fold the local occupancy around each destination into its step cost.
    pub consider_crowd_density: bool,
    /// Hard cap on node expansions before the search gives up.
    pub max_search_nodes: usize,
    /// Multiplier on the heuristic. Above 1 the search gets greedier and
    /// stops guaranteeing the cheapest route.
    pub heuristic_weight: f64,
    /// Whether an occupied goal tile may be targeted at all.
    pub allow_occupied_destination: bool,
}

impl Default for PathOptions {
    fn default() -> Self {
        PathOptions {
            allow_diagonal: true,
            consider_crowd_density: false,
            max_search_nodes: 10_000,
            heuristic_weight: 1.0,
            allow_occupied_destination: true,
        }
    }
}

impl PathOptions {
    /// Fast, greedy preset used by [`Pathfinder::get_next_step`].
    pub fn next_step() -> Self {
        PathOptions {
            heuristic_weight: 1.5,
            max_search_nodes: 2_000,
            ..Default::default()
        }
    }

    /// Greedy preset used by [`Pathfinder::is_reachable`]. Its budget is
    /// never below the default one.
    pub fn reachability() -> Self {
        PathOptions {
            heuristic_weight: 2.0,
            max_search_nodes: 10_000,
            ..Default::default()
        }
    }
}

/// Result of a search, keeping the reason a route was not produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Positions from start to goal, both included.
    Found(Vec<Position>),
    /// Every reachable cell was expanded without meeting the goal.
    Unreachable,
    /// `max_search_nodes` expansions were spent with cells still open.
    BudgetExhausted,
    /// An endpoint was off the grid, or the goal was occupied and
    /// `allow_occupied_destination` was false.
    InvalidRequest,
}

impl SearchOutcome {
    pub fn is_found(&self) -> bool {
        matches!(self, SearchOutcome::Found(_))
    }

    /// Collapses every failure into `None`.
    pub fn into_path(self) -> Option<Vec<Position>> {
        match self {
            SearchOutcome::Found(path) => Some(path),
            _ => None,
        }
    }
}

/// Counters gathered during one search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    /// Nodes popped and closed.
    pub expanded: usize,
    /// Nodes created, the start node included.
    pub generated: usize,
}

/// Octile distance: the exact cost of an unobstructed 8-directional walk
/// with orthogonal cost 1 and diagonal cost √2.
pub fn octile_distance(a: Position, b: Position) -> f64 {
    let dx = a.x.abs_diff(b.x) as f64;
    let dy = a.y.abs_diff(b.y) as f64;
    dx.min(dy) * SQRT_2 + (dx - dy).abs()
}

#[derive(Debug, Clone)]
struct SearchNode {
    position: Position,
    g: f64,
    h: f64,
    f: f64,
    parent: Option<usize>,
}

/// Scratch state for one search invocation.
///
/// Nodes live in an arena and refer to their parent by index. The heap may
/// hold several entries for one node after a cheaper route is found; entries
/// whose position is already closed are dropped when popped.
struct SearchContext {
    heap: MinHeap<usize>,
    nodes: Vec<SearchNode>,
    open: HashMap<Position, usize>,
    closed: HashSet<Position>,
    stats: SearchStats,
}

impl SearchContext {
    fn new() -> Self {
        SearchContext {
            heap: MinHeap::new(),
            nodes: Vec::new(),
            open: HashMap::new(),
            closed: HashSet::new(),
            stats: SearchStats::default(),
        }
    }

    fn push_node(&mut self, position: Position, g: f64, h: f64, weight: f64, parent: Option<usize>) {
        let f = g + h * weight;
        let index = self.nodes.len();
        self.nodes.push(SearchNode {
            position,
            g,
            h,
            f,
            parent,
        });
        self.open.insert(position, index);
        self.heap.push(index, f);
        self.stats.generated += 1;
    }

    /// Pops the lowest-f node that is not closed yet.
    fn pop_open(&mut self) -> Option<usize> {
        while let Some((index, _)) = self.heap.pop() {
            let position = self.nodes[index].position;
            if self.closed.contains(&position) {
                continue;
            }
            self.open.remove(&position);
            self.closed.insert(position);
            return Some(index);
        }
        None
    }

    fn reconstruct(&self, goal: usize) -> Vec<Position> {
        let mut path = Vec::new();
        let mut current = Some(goal);
        while let Some(index) = current {
            let node = &self.nodes[index];
            path.push(node.position);
            current = node.parent;
        }
        path.reverse();
        path
    }
}

/// A* path search engine over an owned [`TileGrid`].
#[derive(Debug, Clone)]
pub struct Pathfinder {
    grid: TileGrid,
}

impl Pathfinder {
    pub fn new(grid: TileGrid) -> Self {
        Pathfinder { grid }
    }

    /// The grid searches run against.
    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Mutable access for layout and occupancy changes between searches.
    pub fn grid_mut(&mut self) -> &mut TileGrid {
        &mut self.grid
    }

    /// Finds a route from `(start_x, start_y)` to `(end_x, end_y)`.
    ///
    /// Returns `None` for every failure: off-grid endpoints, a forbidden
    /// occupied goal, an unreachable goal, or a spent node budget. Use
    /// [`Pathfinder::search`] to tell these apart.
    ///
    /// A start equal to the goal yields `[start]`, unless that tile is
    /// occupied and `allow_occupied_destination` is false: the goal check
    /// runs first, so that request is `None` too.
    pub fn find_path(
        &self,
        start_x: usize,
        start_y: usize,
        end_x: usize,
        end_y: usize,
        options: &PathOptions,
    ) -> Option<Vec<Position>> {
        self.search(start_x, start_y, end_x, end_y, options).into_path()
    }

    pub fn search(
        &self,
        start_x: usize,
        start_y: usize,
        end_x: usize,
        end_y: usize,
        options: &PathOptions,
    ) -> SearchOutcome {
        self.search_with_stats(start_x, start_y, end_x, end_y, options).0
    }

    /// Runs A* and reports how much work it did.
    pub fn search_with_stats(
        &self,
        start_x: usize,
        start_y: usize,
        end_x: usize,
        end_y: usize,
        options: &PathOptions,
    ) -> (SearchOutcome, SearchStats) {
        let start = Position::new(start_x, start_y);
        let goal = Position::new(end_x, end_y);

        if !self.grid.in_bounds(start.x, start.y) || !self.grid.in_bounds(goal.x, goal.y) {
            trace!("search {start:?} -> {goal:?}: endpoint off grid");
            return (SearchOutcome::InvalidRequest, SearchStats::default());
        }
        if !options.allow_occupied_destination && self.grid.is_occupied(goal.x, goal.y) == Ok(true) {
            trace!("search {start:?} -> {goal:?}: goal occupied");
            return (SearchOutcome::InvalidRequest, SearchStats::default());
        }
        if start == goal {
            return (SearchOutcome::Found(vec![start]), SearchStats::default());
        }

        let mut ctx = SearchContext::new();
        let weight = options.heuristic_weight;
        ctx.push_node(start, 0.0, octile_distance(start, goal), weight, None);

        while !ctx.heap.is_empty() && ctx.stats.expanded < options.max_search_nodes {
            let Some(current) = ctx.pop_open() else {
                break;
            };
            ctx.stats.expanded += 1;

            let position = ctx.nodes[current].position;
            if position == goal {
                let path = ctx.reconstruct(current);
                debug!(
                    "search {start:?} -> {goal:?}: {} steps, {} expanded",
                    path.len() - 1,
                    ctx.stats.expanded
                );
                return (SearchOutcome::Found(path), ctx.stats);
            }

            let current_g = ctx.nodes[current].g;
            for neighbor in self.neighbors(position, options.allow_diagonal) {
                if ctx.closed.contains(&neighbor) {
                    continue;
                }
                let step = self.grid.movement_cost(
                    position.x,
                    position.y,
                    neighbor.x,
                    neighbor.y,
                    options.consider_crowd_density,
                );
                if !step.is_finite() {
                    continue;
                }
                let tentative_g = current_g + step;

                match ctx.open.get(&neighbor).copied() {
                    None => {
                        let h = octile_distance(neighbor, goal);
                        ctx.push_node(neighbor, tentative_g, h, weight, Some(current));
                    }
                    Some(index) if tentative_g < ctx.nodes[index].g => {
                        let node = &mut ctx.nodes[index];
                        node.g = tentative_g;
                        node.f = tentative_g + node.h * weight;
                        node.parent = Some(current);
                        let f = node.f;
                        ctx.heap.push(index, f);
                    }
                    Some(_) => {}
                }
            }
        }

        // Stale heap entries don't count as open work.
        let open_left = !ctx.open.is_empty();
        let outcome = if open_left {
            SearchOutcome::BudgetExhausted
        } else {
            SearchOutcome::Unreachable
        };
        debug!(
            "search {start:?} -> {goal:?}: {outcome:?} after {} expansions",
            ctx.stats.expanded
        );
        (outcome, ctx.stats)
    }

    /// Candidate steps out of `position`: the four orthogonal cells, plus
    /// each diagonal whose two flanking orthogonal cells are walkable.
    fn neighbors(&self, position: Position, allow_diagonal: bool) -> Vec<Position> {
        let mut out: Vec<Position> = ORTHOGONAL
            .iter()
            .filter_map(|&(dx, dy)| position.offset(dx, dy))
            .filter(|pos| self.grid.in_bounds(pos.x, pos.y))
            .collect();

        if allow_diagonal {
            for &(dx, dy) in &DIAGONAL {
                let Some(target) = position.offset(dx, dy) else {
                    continue;
                };
                let corners_clear = [position.offset(dx, 0), position.offset(0, dy)]
                    .into_iter()
                    .all(|corner| corner.is_some_and(|c| self.grid.is_walkable(c.x, c.y)));
                if corners_clear && self.grid.in_bounds(target.x, target.y) {
                    out.push(target);
                }
            }
        }
        out
    }

    /// The position to move to next on the way to `(end_x, end_y)`, from a
    /// fast greedy search. `None` if there's no route or the start already
    /// is the goal.
    pub fn get_next_step(
        &self,
        start_x: usize,
        start_y: usize,
        end_x: usize,
        end_y: usize,
    ) -> Option<Position> {
        self.find_path(start_x, start_y, end_x, end_y, &PathOptions::next_step())
            .and_then(|path| path.get(1).copied())
    }

    /// Whether a greedy search connects the two cells.
    ///
    /// The node budget is raised to the cell count on large grids, so the
    /// answer is `true` whenever any [`Pathfinder::find_path`] call between
    /// the same cells succeeds.
    pub fn is_reachable(&self, start_x: usize, start_y: usize, end_x: usize, end_y: usize) -> bool {
        let mut options = PathOptions::reachability();
        options.max_search_nodes = options.max_search_nodes.max(self.grid.tiles().len());
        self.search(start_x, start_y, end_x, end_y, &options).is_found()
    }

    /// Sum of step costs along `path` under the grid's current state.
    pub fn path_cost(&self, path: &[Position], consider_density: bool) -> f64 {
        path.windows(2)
            .map(|pair| {
                self.grid
                    .movement_cost(pair[0].x, pair[0].y, pair[1].x, pair[1].y, consider_density)
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::TileType;

    fn open_grid(width: usize, height: usize) -> Pathfinder {
        Pathfinder::new(TileGrid::new(width, height))
    }

    #[test]
    fn octile_matches_free_walk() {
        let a = Position::new(0, 0);
        assert_eq!(octile_distance(a, a), 0.0);
        assert_eq!(octile_distance(a, Position::new(4, 0)), 4.0);
        assert!((octile_distance(a, Position::new(3, 3)) - 3.0 * SQRT_2).abs() < 1e-9);
        assert!((octile_distance(Position::new(5, 1), a) - (SQRT_2 + 4.0)).abs() < 1e-9);
    }

    #[test]
    fn default_options() {
        let options = PathOptions::default();
        assert!(options.allow_diagonal);
        assert!(!options.consider_crowd_density);
        assert_eq!(options.max_search_nodes, 10_000);
        assert_eq!(options.heuristic_weight, 1.0);
        assert!(options.allow_occupied_destination);
    }

    #[test]
    fn reachability_budget_covers_default() {
        let reach = PathOptions::reachability();
        assert!(reach.max_search_nodes >= PathOptions::default().max_search_nodes);
        assert_eq!(reach.heuristic_weight, 2.0);
    }

    #[test]
    fn occupied_start_as_forbidden_goal_is_rejected() {
        let mut finder = open_grid(3, 3);
        finder.grid_mut().set_occupant(1, 1, 4).unwrap();
        let strict = PathOptions {
            allow_occupied_destination: false,
            ..Default::default()
        };
        assert_eq!(finder.search(1, 1, 1, 1, &strict), SearchOutcome::InvalidRequest);
        assert_eq!(
            finder.find_path(1, 1, 1, 1, &PathOptions::default()),
            Some(vec![Position::new(1, 1)])
        );
    }

    #[test]
    fn partial_options_from_json() {
        let options: PathOptions =
            serde_json::from_str(r#"{"allowDiagonal": false, "maxSearchNodes": 50}"#).unwrap();
        assert!(!options.allow_diagonal);
        assert_eq!(options.max_search_nodes, 50);
        assert_eq!(options.heuristic_weight, 1.0);
        assert!(options.allow_occupied_destination);
    }

    #[test]
    fn budget_exhaustion_is_distinguishable() {
        let finder = open_grid(30, 30);
        let options = PathOptions {
            max_search_nodes: 3,
            ..Default::default()
        };
        assert_eq!(finder.search(0, 0, 29, 29, &options), SearchOutcome::BudgetExhausted);
        assert_eq!(finder.find_path(0, 0, 29, 29, &options), None);
    }

    #[test]
    fn walled_in_goal_is_unreachable() {
        let mut finder = open_grid(5, 5);
        for (x, y) in [(3, 3), (4, 3), (3, 4)] {
            finder.grid_mut().set_tile(x, y, TileType::Wall).unwrap();
        }
        let (outcome, stats) = finder.search_with_stats(0, 0, 4, 4, &PathOptions::default());
        assert_eq!(outcome, SearchOutcome::Unreachable);
        assert_eq!(stats.expanded, 21);
    }

    #[test]
    fn off_grid_endpoints_are_invalid() {
        let finder = open_grid(4, 4);
        let options = PathOptions::default();
        assert_eq!(finder.search(0, 0, 4, 0, &options), SearchOutcome::InvalidRequest);
        assert_eq!(finder.search(0, 9, 0, 0, &options), SearchOutcome::InvalidRequest);
    }

    #[test]
    fn zero_budget_still_answers_trivial_request() {
        let finder = open_grid(3, 3);
        let options = PathOptions {
            max_search_nodes: 0,
            ..Default::default()
        };
        assert_eq!(finder.find_path(1, 1, 1, 1, &options), Some(vec![Position::new(1, 1)]));
        assert_eq!(finder.search(0, 0, 2, 2, &options), SearchOutcome::BudgetExhausted);
    }

    #[test]
    fn cheaper_route_around_a_doorway() {
        let mut finder = open_grid(5, 3);
        finder.grid_mut().set_tile(2, 1, TileType::Door).unwrap();

        let path = finder.find_path(0, 1, 4, 1, &PathOptions::default()).unwrap();
        assert!(!path.contains(&Position::new(2, 1)));
        let cost = finder.path_cost(&path, false);
        assert!((cost - (2.0 + 2.0 * SQRT_2)).abs() < 1e-9, "cost was {cost}");
    }

    #[test]
    fn diagonal_needs_both_corners() {
        let mut finder = open_grid(2, 2);
        finder.grid_mut().set_tile(1, 0, TileType::Wall).unwrap();
        let neighbors = finder.neighbors(Position::new(0, 0), true);
        assert!(!neighbors.contains(&Position::new(1, 1)));

        finder.grid_mut().set_tile(1, 0, TileType::Floor).unwrap();
        let neighbors = finder.neighbors(Position::new(0, 0), true);
        assert!(neighbors.contains(&Position::new(1, 1)));
    }

    #[test]
    fn stats_count_generated_nodes() {
        let finder = open_grid(3, 1);
        let (outcome, stats) = finder.search_with_stats(0, 0, 2, 0, &PathOptions::default());
        assert!(outcome.is_found());
        assert_eq!(stats.expanded, 3);
        assert_eq!(stats.generated, 3);
    }
}

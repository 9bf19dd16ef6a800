//! Occupancy grid and cached path computation.
//!
//! Placement validation and path computation share one multi-segment BFS so
//! they can never disagree about whether a cell may be blocked. The path is
//! recomputed eagerly on every successful mutation and cached; movement code
//! walks the simplified waypoint list, never the grid.

use std::collections::{BTreeSet, VecDeque};

use rampart_core::{CellCoord, Rejection};

/// Grid of placeable cells with a cached spawn-to-end path.
///
/// Invariant: after every successful mutation a path from spawn to end
/// exists. Checkpoints are soft stops; a checkpoint that becomes unreachable
/// is skipped rather than breaking the path.
#[derive(Clone, Debug)]
pub struct OccupancyGrid {
    width: u32,
    height: u32,
    spawn: CellCoord,
    end: CellCoord,
    checkpoints: Vec<CellCoord>,
    blocked: BTreeSet<CellCoord>,
    version: u64,
    waypoints: Vec<CellCoord>,
    path_cells: Vec<CellCoord>,
}

impl OccupancyGrid {
    /// Creates a grid and computes the initial path.
    #[must_use]
    pub fn new(
        width: u32,
        height: u32,
        spawn: CellCoord,
        end: CellCoord,
        checkpoints: Vec<CellCoord>,
    ) -> Self {
        let mut grid = Self {
            width,
            height,
            spawn,
            end,
            checkpoints,
            blocked: BTreeSet::new(),
            version: 0,
            waypoints: Vec::new(),
            path_cells: Vec::new(),
        };
        grid.recompute();
        grid.version = 1;
        grid
    }

    /// Grid width in cells.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in cells.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Spawn cell enemies enter from.
    #[must_use]
    pub const fn spawn(&self) -> CellCoord {
        self.spawn
    }

    /// Exit cell enemies leak through.
    #[must_use]
    pub const fn end(&self) -> CellCoord {
        self.end
    }

    /// Ordered soft stops between spawn and end.
    #[must_use]
    pub fn checkpoints(&self) -> &[CellCoord] {
        &self.checkpoints
    }

    /// Counter bumped on every successful placement or removal.
    #[must_use]
    pub const fn version(&self) -> u64 {
        self.version
    }

    /// Simplified path, direction-change points only.
    #[must_use]
    pub fn waypoints(&self) -> &[CellCoord] {
        &self.waypoints
    }

    /// Every cell the current path crosses, in walk order.
    #[must_use]
    pub fn path_cells(&self) -> &[CellCoord] {
        &self.path_cells
    }

    /// Reports whether the cell currently holds a tower.
    #[must_use]
    pub fn is_blocked(&self, cell: CellCoord) -> bool {
        self.blocked.contains(&cell)
    }

    /// Waypoints flying enemies follow, ignoring the blocked set entirely.
    #[must_use]
    pub fn flight_waypoints(&self) -> Vec<CellCoord> {
        let mut stops = Vec::with_capacity(self.checkpoints.len() + 2);
        stops.push(self.spawn);
        stops.extend_from_slice(&self.checkpoints);
        stops.push(self.end);
        stops
    }

    /// Checks whether `cell` can be blocked without cutting off the maze.
    ///
    /// Runs the same speculative block and multi-segment BFS that a real
    /// placement would, then restores the blocked set.
    pub fn can_place(&mut self, cell: CellCoord) -> Result<(), Rejection> {
        if !self.in_bounds(cell) || self.is_reserved(cell) || self.blocked.contains(&cell) {
            return Err(Rejection::InvalidCell {
                column: cell.column(),
                row: cell.row(),
            });
        }
        let _ = self.blocked.insert(cell);
        let reachable = self.compute_cells().is_some();
        let _ = self.blocked.remove(&cell);
        if reachable {
            Ok(())
        } else {
            Err(Rejection::PathBlocked {
                column: cell.column(),
                row: cell.row(),
            })
        }
    }

    /// Blocks `cell`, bumps the version, and recomputes the cached path.
    pub fn place(&mut self, cell: CellCoord) -> Result<(), Rejection> {
        self.can_place(cell)?;
        let _ = self.blocked.insert(cell);
        self.version += 1;
        self.recompute();
        Ok(())
    }

    /// Unblocks `cell`; reports whether anything changed.
    pub fn remove(&mut self, cell: CellCoord) -> bool {
        if self.blocked.remove(&cell) {
            self.version += 1;
            self.recompute();
            true
        } else {
            false
        }
    }

    /// Blocks many cells with a single recompute at the end.
    ///
    /// Snapshot-restore path; skips the per-placement guard, relying on the
    /// straight-line fallback if a foreign snapshot carries a cut-off maze.
    pub fn block_many(&mut self, cells: &[CellCoord]) {
        for cell in cells {
            let _ = self.blocked.insert(*cell);
        }
        self.version += 1;
        self.recompute();
    }

    pub(crate) fn restore_version(&mut self, version: u64) {
        self.version = version;
    }

    fn in_bounds(&self, cell: CellCoord) -> bool {
        cell.column() < self.width && cell.row() < self.height
    }

    fn is_reserved(&self, cell: CellCoord) -> bool {
        cell == self.spawn || cell == self.end || self.checkpoints.contains(&cell)
    }

    fn recompute(&mut self) {
        let cells = match self.compute_cells() {
            Some(cells) => cells,
            None => self.straight_line(),
        };
        self.waypoints = simplify(&cells);
        self.path_cells = cells;
    }

    /// Multi-segment BFS through each reachable checkpoint in order.
    ///
    /// Returns `None` only when the end itself is unreachable; unreachable
    /// checkpoints are skipped.
    fn compute_cells(&self) -> Option<Vec<CellCoord>> {
        let mut cells = vec![self.spawn];
        let mut current = self.spawn;
        for checkpoint in &self.checkpoints {
            if let Some(segment) = self.bfs(current, *checkpoint) {
                cells.extend_from_slice(&segment[1..]);
                current = *checkpoint;
            }
        }
        let last = self.bfs(current, self.end)?;
        cells.extend_from_slice(&last[1..]);
        Some(cells)
    }

    fn bfs(&self, from: CellCoord, to: CellCoord) -> Option<Vec<CellCoord>> {
        if from == to {
            return Some(vec![from]);
        }
        let cell_count = (self.width as usize) * (self.height as usize);
        let mut predecessor: Vec<Option<u32>> = vec![None; cell_count];
        let mut visited = vec![false; cell_count];
        let mut queue = VecDeque::new();
        visited[self.index(from)] = true;
        queue.push_back(from);

        while let Some(cell) = queue.pop_front() {
            for neighbor in self.neighbors(cell) {
                let index = self.index(neighbor);
                if visited[index] || self.blocked.contains(&neighbor) {
                    continue;
                }
                visited[index] = true;
                predecessor[index] = Some(self.index(cell) as u32);
                if neighbor == to {
                    return Some(self.reconstruct(&predecessor, from, to));
                }
                queue.push_back(neighbor);
            }
        }
        None
    }

    fn neighbors(&self, cell: CellCoord) -> impl Iterator<Item = CellCoord> + '_ {
        let column = cell.column();
        let row = cell.row();
        let width = self.width;
        let height = self.height;
        [
            (row > 0).then(|| CellCoord::new(column, row - 1)),
            (row + 1 < height).then(|| CellCoord::new(column, row + 1)),
            (column > 0).then(|| CellCoord::new(column - 1, row)),
            (column + 1 < width).then(|| CellCoord::new(column + 1, row)),
        ]
        .into_iter()
        .flatten()
    }

    fn reconstruct(&self, predecessor: &[Option<u32>], from: CellCoord, to: CellCoord) -> Vec<CellCoord> {
        let mut cells = vec![to];
        let mut cursor = to;
        while cursor != from {
            let previous = predecessor[self.index(cursor)]
                .map(|index| self.cell_at(index as usize))
                .unwrap_or(from);
            cells.push(previous);
            cursor = previous;
        }
        cells.reverse();
        cells
    }

    fn index(&self, cell: CellCoord) -> usize {
        (cell.row() as usize) * (self.width as usize) + (cell.column() as usize)
    }

    fn cell_at(&self, index: usize) -> CellCoord {
        let width = self.width as usize;
        CellCoord::new((index % width) as u32, (index / width) as u32)
    }

    /// Axis-aligned spawn-to-end walk used when even the direct BFS fails.
    fn straight_line(&self) -> Vec<CellCoord> {
        let mut cells = vec![self.spawn];
        let mut column = self.spawn.column();
        let mut row = self.spawn.row();
        while column != self.end.column() {
            column = if column < self.end.column() {
                column + 1
            } else {
                column - 1
            };
            cells.push(CellCoord::new(column, row));
        }
        while row != self.end.row() {
            row = if row < self.end.row() { row + 1 } else { row - 1 };
            cells.push(CellCoord::new(column, row));
        }
        cells
    }
}

/// Collapses collinear runs, keeping only direction-change points.
fn simplify(cells: &[CellCoord]) -> Vec<CellCoord> {
    if cells.len() <= 2 {
        return cells.to_vec();
    }
    let mut waypoints = vec![cells[0]];
    for window in cells.windows(3) {
        let [previous, current, next] = [window[0], window[1], window[2]];
        let incoming = (
            current.column() as i64 - previous.column() as i64,
            current.row() as i64 - previous.row() as i64,
        );
        let outgoing = (
            next.column() as i64 - current.column() as i64,
            next.row() as i64 - current.row() as i64,
        );
        if incoming != outgoing {
            waypoints.push(current);
        }
    }
    waypoints.push(cells[cells.len() - 1]);
    waypoints
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_grid() -> OccupancyGrid {
        OccupancyGrid::new(
            7,
            5,
            CellCoord::new(0, 2),
            CellCoord::new(6, 2),
            Vec::new(),
        )
    }

    #[test]
    fn initial_path_runs_straight_across() {
        let grid = small_grid();
        assert_eq!(grid.waypoints(), &[CellCoord::new(0, 2), CellCoord::new(6, 2)]);
        assert_eq!(grid.path_cells().len(), 7);
        assert_eq!(grid.version(), 1);
    }

    #[test]
    fn placement_reroutes_and_bumps_version() {
        let mut grid = small_grid();
        grid.place(CellCoord::new(3, 2)).expect("placeable");
        assert_eq!(grid.version(), 2);
        assert!(grid.path_cells().first() == Some(&grid.spawn()));
        assert!(grid.path_cells().last() == Some(&grid.end()));
        assert!(!grid.path_cells().contains(&CellCoord::new(3, 2)));
        for window in grid.path_cells().windows(2) {
            assert!(window[0].is_orthogonal_neighbor(window[1]));
        }
    }

    #[test]
    fn blocking_the_last_corridor_is_rejected_before_mutation() {
        let mut grid = small_grid();
        // Wall off every row except row 2 at column 3.
        for row in [0, 1, 3, 4] {
            grid.place(CellCoord::new(3, row)).expect("placeable");
        }
        let version = grid.version();
        let result = grid.place(CellCoord::new(3, 2));
        assert!(matches!(result, Err(Rejection::PathBlocked { column: 3, row: 2 })));
        assert!(!grid.is_blocked(CellCoord::new(3, 2)));
        assert_eq!(grid.version(), version);
        assert!(grid.path_cells().last() == Some(&grid.end()));
    }

    #[test]
    fn reserved_and_out_of_bounds_cells_are_invalid() {
        let mut grid = small_grid();
        assert!(matches!(
            grid.can_place(CellCoord::new(0, 2)),
            Err(Rejection::InvalidCell { .. })
        ));
        assert!(matches!(
            grid.can_place(CellCoord::new(7, 0)),
            Err(Rejection::InvalidCell { .. })
        ));
    }

    #[test]
    fn removal_restores_the_short_path() {
        let mut grid = small_grid();
        grid.place(CellCoord::new(3, 2)).expect("placeable");
        let detour = grid.path_cells().len();
        assert!(detour > 7);
        assert!(grid.remove(CellCoord::new(3, 2)));
        assert_eq!(grid.path_cells().len(), 7);
        assert!(!grid.remove(CellCoord::new(3, 2)));
    }

    #[test]
    fn unreachable_checkpoint_is_skipped() {
        let mut grid = OccupancyGrid::new(
            7,
            5,
            CellCoord::new(0, 2),
            CellCoord::new(6, 2),
            vec![CellCoord::new(6, 0)],
        );
        // Wall the checkpoint corner off entirely.
        grid.block_many(&[CellCoord::new(5, 0), CellCoord::new(5, 1), CellCoord::new(6, 1)]);
        assert!(grid.path_cells().last() == Some(&grid.end()));
        assert!(!grid.path_cells().contains(&CellCoord::new(6, 0)));
    }

    #[test]
    fn checkpoint_path_visits_the_checkpoint() {
        let grid = OccupancyGrid::new(
            7,
            5,
            CellCoord::new(0, 2),
            CellCoord::new(6, 2),
            vec![CellCoord::new(3, 0)],
        );
        assert!(grid.path_cells().contains(&CellCoord::new(3, 0)));
        assert!(grid.path_cells().last() == Some(&grid.end()));
    }

    #[test]
    fn cut_off_restore_falls_back_to_a_straight_line() {
        let mut grid = small_grid();
        // A foreign snapshot may carry a wall the guard would have rejected.
        grid.block_many(&[
            CellCoord::new(3, 0),
            CellCoord::new(3, 1),
            CellCoord::new(3, 2),
            CellCoord::new(3, 3),
            CellCoord::new(3, 4),
        ]);
        assert!(grid.path_cells().first() == Some(&grid.spawn()));
        assert!(grid.path_cells().last() == Some(&grid.end()));
    }

    #[test]
    fn simplify_keeps_only_turns() {
        let cells = vec![
            CellCoord::new(0, 0),
            CellCoord::new(1, 0),
            CellCoord::new(2, 0),
            CellCoord::new(2, 1),
            CellCoord::new(2, 2),
            CellCoord::new(3, 2),
        ];
        assert_eq!(
            simplify(&cells),
            vec![
                CellCoord::new(0, 0),
                CellCoord::new(2, 0),
                CellCoord::new(2, 2),
                CellCoord::new(3, 2),
            ]
        );
    }
}

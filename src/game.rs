use crate::action::{JointAction, Move};
use crate::env::Environment;
use crate::error::GameError;
use crate::grid::Grid;
use crate::state::{EpisodeStatus, ObservationSpace, StepInfo, StepOutcome};

pub const FLOOR: u8 = 0;
pub const WALL: u8 = 1;
pub const FRUIT: u8 = 2;
pub const ROBOT: u8 = 3;
pub const HUMAN: u8 = 4;
pub const MAX_CELL_VALUE: u8 = HUMAN;

const DEFAULT_MAX_STEPS: usize = 100;

const SMALL_LEVEL: [&str; 5] = ["#####", "#R.F#", "#.#.#", "#F.H#", "#####"];

const MEDIUM_LEVEL: [&str; 7] = [
    "#######",
    "#R..F.#",
    "#.##..#",
    "#F...F#",
    "#..##.#",
    "#.F..H#",
    "#######",
];

pub type Position = (usize, usize);

/// Parsed level: static terrain plus the starting cell of each actor.
#[derive(Clone, Debug)]
pub struct Layout {
    terrain: Grid,
    robot: Position,
    human: Position,
}

impl Layout {
    /// Parses an ASCII layout: `#` wall, `.` floor, `F` fruit, `R` robot, `H` human.
    pub fn parse<S: AsRef<str>>(rows: &[S]) -> Result<Self, GameError> {
        let mut cells: Vec<Vec<u8>> = Vec::with_capacity(rows.len());
        let mut robot = None;
        let mut human = None;
        for (row_index, row) in rows.iter().enumerate() {
            let mut cell_row = Vec::with_capacity(row.as_ref().len());
            for (col_index, symbol) in row.as_ref().chars().enumerate() {
                let cell = match symbol {
                    '#' => WALL,
                    '.' => FLOOR,
                    'F' => FRUIT,
                    'R' => {
                        if robot.replace((row_index, col_index)).is_some() {
                            return Err(GameError::InvalidLayout("more than one robot".into()));
                        }
                        FLOOR
                    }
                    'H' => {
                        if human.replace((row_index, col_index)).is_some() {
                            return Err(GameError::InvalidLayout("more than one human".into()));
                        }
                        FLOOR
                    }
                    other => {
                        return Err(GameError::InvalidLayout(format!(
                            "unexpected symbol '{other}' at ({row_index}, {col_index})"
                        )));
                    }
                };
                cell_row.push(cell);
            }
            cells.push(cell_row);
        }
        let terrain =
            Grid::from_rows(&cells).map_err(|err| GameError::InvalidLayout(err.to_string()))?;
        let robot = robot.ok_or_else(|| GameError::InvalidLayout("missing robot".into()))?;
        let human = human.ok_or_else(|| GameError::InvalidLayout("missing human".into()))?;
        Ok(Self {
            terrain,
            robot,
            human,
        })
    }

    pub fn named(level: &str) -> Result<Self, GameError> {
        match level.to_ascii_lowercase().as_str() {
            "small" => Self::parse(&SMALL_LEVEL),
            "medium" => Self::parse(&MEDIUM_LEVEL),
            _ => Err(GameError::UnknownLevel(level.to_string())),
        }
    }

    pub fn fruit_count(&self) -> usize {
        self.terrain.cells().iter().filter(|&&cell| cell == FRUIT).count()
    }
}

/// Builder for [`OrchardGame`] instances.
pub struct GameBuilder {
    layout: Option<Layout>,
    level: String,
    max_steps: usize,
}

impl GameBuilder {
    pub fn new() -> Self {
        Self {
            layout: None,
            level: String::from("small"),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_layout(mut self, layout: Layout) -> Self {
        self.layout = Some(layout);
        self
    }

    /// Episode length cap; reaching it ends the episode with `OutOfTime`.
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn build(self) -> Result<OrchardGame, GameError> {
        if self.max_steps == 0 {
            return Err(GameError::InvalidConfiguration("max steps must be positive"));
        }
        let layout = match self.layout {
            Some(layout) => layout,
            None => Layout::named(&self.level)?,
        };
        if layout.fruit_count() == 0 {
            return Err(GameError::InvalidLayout("layout contains no fruit".into()));
        }
        Ok(OrchardGame::new(layout, self.max_steps))
    }
}

impl Default for GameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Cooperative two-actor orchard: a robot and a human walk a walled grid and
/// pick fruit. Each picked fruit is worth one point to the team; the episode ends
/// once the orchard is empty or the step limit is reached.
pub struct OrchardGame {
    layout: Layout,
    max_steps: usize,
    terrain: Grid,
    robot: Position,
    human: Position,
    steps: usize,
    fruit_remaining: usize,
    status: EpisodeStatus,
}

impl OrchardGame {
    pub fn builder() -> GameBuilder {
        GameBuilder::new()
    }

    fn new(layout: Layout, max_steps: usize) -> Self {
        let terrain = layout.terrain.clone();
        let fruit_remaining = layout.fruit_count();
        Self {
            robot: layout.robot,
            human: layout.human,
            layout,
            max_steps,
            terrain,
            steps: 0,
            fruit_remaining,
            status: EpisodeStatus::Running,
        }
    }

    pub fn status(&self) -> EpisodeStatus {
        self.status
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn fruit_remaining(&self) -> usize {
        self.fruit_remaining
    }

    pub fn robot_position(&self) -> Position {
        self.robot
    }

    pub fn human_position(&self) -> Position {
        self.human
    }

    /// Current observation: terrain with both actors drawn on top.
    pub fn observation(&self) -> Grid {
        let mut grid = self.terrain.clone();
        grid.set(self.robot.0, self.robot.1, ROBOT);
        grid.set(self.human.0, self.human.1, HUMAN);
        grid
    }

    /// Advances the game, rejecting action indices outside the move table.
    pub fn apply(&mut self, action: JointAction) -> Result<StepOutcome, GameError> {
        let robot_move =
            Move::from_index(action.agent).ok_or(GameError::InvalidAction(action.agent))?;
        let human_move =
            Move::from_index(action.partner).ok_or(GameError::InvalidAction(action.partner))?;
        Ok(self.advance(robot_move, human_move))
    }

    fn advance(&mut self, robot_move: Move, human_move: Move) -> StepOutcome {
        if self.status.is_terminal() {
            return StepOutcome {
                state: self.observation(),
                reward: 0.0,
                done: true,
                info: self.info(0.0),
            };
        }

        self.robot = self.target_cell(self.robot, robot_move, self.human);
        let robot_reward = self.harvest(self.robot);
        self.human = self.target_cell(self.human, human_move, self.robot);
        let human_reward = self.harvest(self.human);
        self.steps += 1;

        if self.fruit_remaining == 0 {
            self.status = EpisodeStatus::Cleared;
        } else if self.steps >= self.max_steps {
            self.status = EpisodeStatus::OutOfTime;
        }

        StepOutcome {
            state: self.observation(),
            reward: robot_reward + human_reward,
            done: self.status.is_terminal(),
            info: self.info(human_reward),
        }
    }

    fn info(&self, partner_reward: f32) -> StepInfo {
        StepInfo {
            partner_reward,
            steps: self.steps,
            truncated: matches!(self.status, EpisodeStatus::OutOfTime),
        }
    }

    fn target_cell(&self, from: Position, mv: Move, blocker: Position) -> Position {
        let (dr, dc) = mv.delta();
        let row = from.0.checked_add_signed(dr);
        let col = from.1.checked_add_signed(dc);
        match (row, col) {
            (Some(row), Some(col)) => match self.terrain.get(row, col) {
                Some(cell) if cell != WALL && (row, col) != blocker => (row, col),
                _ => from,
            },
            _ => from,
        }
    }

    fn harvest(&mut self, at: Position) -> f32 {
        if self.terrain.get(at.0, at.1) == Some(FRUIT) {
            self.terrain.set(at.0, at.1, FLOOR);
            self.fruit_remaining -= 1;
            1.0
        } else {
            0.0
        }
    }
}

impl Environment for OrchardGame {
    fn observation_space(&self) -> ObservationSpace {
        ObservationSpace::new(
            self.terrain.height(),
            self.terrain.width(),
            MAX_CELL_VALUE,
        )
    }

    fn action_count(&self) -> usize {
        Move::COUNT
    }

    fn reset(&mut self) -> Grid {
        self.terrain = self.layout.terrain.clone();
        self.robot = self.layout.robot;
        self.human = self.layout.human;
        self.steps = 0;
        self.fruit_remaining = self.layout.fruit_count();
        self.status = EpisodeStatus::Running;
        self.observation()
    }

    fn step(&mut self, action: JointAction) -> StepOutcome {
        let robot_move = Move::from_index(action.agent).unwrap_or(Move::Stay);
        let human_move = Move::from_index(action.partner).unwrap_or(Move::Stay);
        self.advance(robot_move, human_move)
    }
}

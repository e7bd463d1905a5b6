//! Turtle Interpreter
//!
//! Symbols are compiled once through an [`Alphabet`] into a closed set of
//! [`Command`]s, then executed against a [`TurtleBackend`]. Unknown symbols
//! are rejected at compile time, before any backend callback fires.

use std::collections::BTreeMap;
use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::geometry::Point;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum TurtleError {
    #[error("Invalid symbol '{symbol}' at index {index}")]
    InvalidSymbol { symbol: char, index: usize },

    #[error("Unbalanced branch: pop with empty stack at index {index}")]
    UnbalancedBranch { index: usize },

    #[error("Ambiguous revisit of coordinate ({x}, {y}) at index {index}")]
    AmbiguousRevisit { x: i64, y: i64, index: usize },

    #[error("Resource limit exceeded: {resource} limit {limit} reached at index {index}")]
    ResourceLimitExceeded { resource: &'static str, limit: u64, index: usize },

    #[error("Step size must be positive and finite, got {0}")]
    InvalidStepSize(f64),
}

/// Failure raised by a backend callback. The interpreter attaches the
/// symbol index before surfacing it as a [`TurtleError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    AmbiguousRevisit { x: i64, y: i64 },
    NodeLimitExceeded { limit: u64 },
}

impl BackendError {
    fn at(self, index: usize) -> TurtleError {
        match self {
            BackendError::AmbiguousRevisit { x, y } => TurtleError::AmbiguousRevisit { x, y, index },
            BackendError::NodeLimitExceeded { limit } => TurtleError::ResourceLimitExceeded {
                resource: "nodes",
                limit,
                index,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    MoveForward,
    DrawForward,
    TurnLeft,
    TurnRight,
    Push,
    Pop,
}

/// Closed mapping from grammar symbols to turtle commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Alphabet {
    symbols: BTreeMap<char, Command>,
}

impl Alphabet {
    pub fn empty() -> Self {
        Self { symbols: BTreeMap::new() }
    }

    /// `f` moves, `F` `A` `B` draw, `+`/`-` turn, `[`/`]` branch.
    pub fn standard() -> Self {
        Self::empty()
            .with('f', Command::MoveForward)
            .with('F', Command::DrawForward)
            .with('A', Command::DrawForward)
            .with('B', Command::DrawForward)
            .with('+', Command::TurnLeft)
            .with('-', Command::TurnRight)
            .with('[', Command::Push)
            .with(']', Command::Pop)
    }

    pub fn with(mut self, symbol: char, command: Command) -> Self {
        self.symbols.insert(symbol, command);
        self
    }

    pub fn command(&self, symbol: char) -> Option<Command> {
        self.symbols.get(&symbol).copied()
    }

    pub fn contains(&self, symbol: char) -> bool {
        self.symbols.contains_key(&symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = (char, Command)> + '_ {
        self.symbols.iter().map(|(s, c)| (*s, *c))
    }

    /// Translate a symbol string into commands, one per character.
    pub fn compile(&self, symbols: &str) -> Result<Vec<Command>, TurtleError> {
        let mut commands = Vec::with_capacity(symbols.len());
        for (index, symbol) in symbols.chars().enumerate() {
            let command = self
                .command(symbol)
                .ok_or(TurtleError::InvalidSymbol { symbol, index })?;
            commands.push(command);
        }
        Ok(commands)
    }
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::standard()
    }
}

/// Receives the geometric effect of each turtle command.
///
/// `Cursor` is whatever the backend needs to resume drawing from a saved
/// branch point; it is stored in the interpreter's stack frames and handed
/// back on pop.
pub trait TurtleBackend {
    type Cursor: Copy;

    fn cursor(&self) -> Self::Cursor;

    /// Pen-up move. `restore` is `Some` when returning from a branch.
    fn on_move(&mut self, to: Point, restore: Option<Self::Cursor>) -> Result<(), BackendError>;

    fn on_draw(&mut self, to: Point) -> Result<(), BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurtleState {
    pub position: Point,
    /// Radians, counter-clockwise from +x.
    pub heading: f64,
    pub step_size: f64,
    /// Radians.
    pub angle: f64,
}

impl TurtleState {
    /// Pointing up from `origin`.
    pub fn new(origin: Point, step_size: f64, angle: f64) -> Self {
        Self {
            position: origin,
            heading: FRAC_PI_2,
            step_size,
            angle,
        }
    }

    fn advance(&mut self) {
        self.position.x += self.step_size * self.heading.cos();
        self.position.y += self.step_size * self.heading.sin();
    }
}

struct Frame<C> {
    position: Point,
    heading: f64,
    cursor: C,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurtleSummary {
    pub commands: usize,
    pub moves: usize,
    pub draws: usize,
    pub max_depth: usize,
    pub unclosed_branches: usize,
}

/// Drives a backend from a symbol string.
#[derive(Debug, Clone)]
pub struct Turtle<'a> {
    alphabet: &'a Alphabet,
    origin: Point,
    step_size: f64,
    angle: f64,
}

impl<'a> Turtle<'a> {
    /// `angle_degrees` is converted to radians once, here.
    pub fn new(alphabet: &'a Alphabet, angle_degrees: f64) -> Self {
        Self {
            alphabet,
            origin: Point::default(),
            step_size: 5.0,
            angle: angle_degrees.to_radians(),
        }
    }

    pub fn with_origin(mut self, origin: Point) -> Self {
        self.origin = origin;
        self
    }

    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn interpret<B: TurtleBackend>(
        &self,
        symbols: &str,
        backend: &mut B,
    ) -> Result<TurtleSummary, TurtleError> {
        let commands = self.alphabet.compile(symbols)?;
        self.execute(&commands, backend)
    }

    /// Run already-compiled commands. Indices in errors refer to positions in
    /// `commands`.
    pub fn execute<B: TurtleBackend>(
        &self,
        commands: &[Command],
        backend: &mut B,
    ) -> Result<TurtleSummary, TurtleError> {
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(TurtleError::InvalidStepSize(self.step_size));
        }

        let mut state = TurtleState::new(self.origin, self.step_size, self.angle);
        let mut stack: Vec<Frame<B::Cursor>> = Vec::new();
        let mut summary = TurtleSummary {
            commands: commands.len(),
            ..Default::default()
        };

        debug!(commands = commands.len(), "interpreting");

        for (index, command) in commands.iter().enumerate() {
            match command {
                Command::MoveForward => {
                    state.advance();
                    backend.on_move(state.position, None).map_err(|e| e.at(index))?;
                    summary.moves += 1;
                }
                Command::DrawForward => {
                    state.advance();
                    backend.on_draw(state.position).map_err(|e| e.at(index))?;
                    summary.draws += 1;
                }
                Command::TurnLeft => state.heading += state.angle,
                Command::TurnRight => state.heading -= state.angle,
                Command::Push => {
                    stack.push(Frame {
                        position: state.position,
                        heading: state.heading,
                        cursor: backend.cursor(),
                    });
                    summary.max_depth = summary.max_depth.max(stack.len());
                }
                Command::Pop => {
                    let frame = stack.pop().ok_or(TurtleError::UnbalancedBranch { index })?;
                    state.position = frame.position;
                    state.heading = frame.heading;
                    backend
                        .on_move(state.position, Some(frame.cursor))
                        .map_err(|e| e.at(index))?;
                }
            }
        }

        summary.unclosed_branches = stack.len();
        if summary.unclosed_branches > 0 {
            warn!(unclosed = summary.unclosed_branches, "branches left open at end of input");
        }
        Ok(summary)
    }
}

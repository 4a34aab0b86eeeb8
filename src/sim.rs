//! Robot simulator.
//!
//! Robots run one at a time, in declaration order, on a shared grid. A robot
//! that steps off the grid is lost and leaves a scent at the state it fell
//! from: `(x, y, direction)`. Any later robot attempting the same step from
//! the same state ignores that `F` instead of falling.
//!
//! Each robot's pose comes from its first landing. Instructions before it
//! are skipped; later landings are kept in the program but have no effect.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::RunError;
use crate::event::{Event, EventSink, Position};
use crate::program::{Direction, Instruction, Program, RobotDefinition, Rotation, Square};

/// Final state of one robot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RobotResult {
    pub name: String,
    pub x: i32,
    pub y: i32,
    pub direction: Direction,
    pub lost: bool,
}

/// Edge states robots have already fallen from during this run.
#[derive(Clone, Debug, Default)]
pub struct Scent {
    marks: HashSet<(i32, i32, Direction)>,
}

impl Scent {
    pub fn contains(&self, x: i32, y: i32, direction: Direction) -> bool {
        self.marks.contains(&(x, y, direction))
    }

    /// Mark a state. Returns false if it was already scented.
    pub fn mark(&mut self, x: i32, y: i32, direction: Direction) -> bool {
        self.marks.insert((x, y, direction))
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RobotState {
    x: i32,
    y: i32,
    direction: Direction,
    lost: bool,
}

/// Simulation state shared by every robot of one run.
pub struct Simulator {
    square: Square,
    scent: Scent,
}

impl Simulator {
    pub fn new(square: Square) -> Self {
        Self {
            square,
            scent: Scent::default(),
        }
    }

    pub fn scent(&self) -> &Scent {
        &self.scent
    }

    /// Run one robot to completion against the current scent.
    pub fn run_robot<S: EventSink + ?Sized>(
        &mut self,
        robot: &RobotDefinition,
        sink: &mut S,
    ) -> Result<RobotResult, RunError> {
        let (start, x, y, direction) = robot.landing().ok_or_else(|| RunError::MissingLanding {
            robot: robot.name.clone(),
        })?;
        let mut state = RobotState {
            x: x as i32,
            y: y as i32,
            direction,
            lost: false,
        };
        debug!(robot = %robot.name, x, y, %direction, "robot landed");

        'program: for instruction in &robot.instructions[start + 1..] {
            let commands = match instruction {
                Instruction::Heading(commands) => commands,
                Instruction::Landing { .. } => continue,
            };
            for &command in commands {
                match command {
                    Rotation::R => state.direction = state.direction.clockwise(),
                    Rotation::L => state.direction = state.direction.counter_clockwise(),
                    Rotation::F => {
                        self.forward(&robot.name, &mut state, sink)?;
                        if state.lost {
                            break 'program;
                        }
                    }
                }
            }
        }

        Ok(RobotResult {
            name: robot.name.clone(),
            x: state.x,
            y: state.y,
            direction: state.direction,
            lost: state.lost,
        })
    }

    fn forward<S: EventSink + ?Sized>(
        &mut self,
        name: &str,
        state: &mut RobotState,
        sink: &mut S,
    ) -> Result<(), RunError> {
        let (dx, dy) = state.direction.step();
        let (nx, ny) = (state.x + dx, state.y + dy);
        sink.emit(Event::TryingMove {
            robot: name.to_string(),
            position: Position { x: nx, y: ny },
            direction: state.direction,
        })?;

        if self.square.contains(nx, ny) {
            state.x = nx;
            state.y = ny;
            sink.emit(Event::Moved {
                robot: name.to_string(),
                position: Position { x: nx, y: ny },
                direction: state.direction,
            })?;
        } else if self.scent.mark(state.x, state.y, state.direction) {
            state.lost = true;
            debug!(robot = name, x = state.x, y = state.y, direction = %state.direction, "robot lost");
            sink.emit(Event::Lost {
                robot: name.to_string(),
                position: Position {
                    x: state.x,
                    y: state.y,
                },
                direction: state.direction,
            })?;
        } else {
            trace!(robot = name, x = state.x, y = state.y, "scent held robot on the grid");
        }
        Ok(())
    }
}

/// Simulate every robot of `program` in order, reporting to `sink`.
///
/// Fails before emitting anything if a robot has no landing at all.
pub fn simulate<S: EventSink + ?Sized>(
    program: &Program,
    sink: &mut S,
) -> Result<Vec<RobotResult>, RunError> {
    if let Some(robot) = program.robots.iter().find(|r| r.landing().is_none()) {
        return Err(RunError::MissingLanding {
            robot: robot.name.clone(),
        });
    }

    sink.emit(Event::Start {
        square: program.square,
        robots: program.robots.clone(),
    })?;

    let mut simulator = Simulator::new(program.square);
    let mut results = Vec::with_capacity(program.robots.len());
    for robot in &program.robots {
        results.push(simulator.run_robot(robot, sink)?);
    }
    debug!(
        robots = results.len(),
        lost = results.iter().filter(|r| r.lost).count(),
        scent = simulator.scent().len(),
        "simulation finished"
    );

    sink.emit(Event::Results {
        results: results.clone(),
    })?;
    Ok(results)
}

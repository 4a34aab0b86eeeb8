//! Observation trace produced by the simulator.
//!
//! Events are handed to an [`EventSink`] in the order they happen. The JSON
//! field and event names are a compatibility surface for tools that read the
//! trace, one object per line:
//!
//! ```text
//! {"event":"start","square":{"w":5,"h":3},"robots":[...]}
//! {"event":"trying_move","robot":"Carlos","position":{"x":1,"y":0},"direction":"S"}
//! {"event":"moved","robot":"Carlos","position":{"x":1,"y":0},"direction":"S"}
//! {"event":"lost","robot":"Mike","position":{"x":3,"y":3},"direction":"N"}
//! {"event":"results","results":[...]}
//! ```

use std::io::{self, Write};

use serde::Serialize;

use crate::program::{Direction, RobotDefinition, Square};
use crate::sim::RobotResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// Emitted once, before any robot moves.
    Start {
        square: Square,
        robots: Vec<RobotDefinition>,
    },
    /// Candidate position of a forward step, before the bounds check.
    TryingMove {
        robot: String,
        position: Position,
        direction: Direction,
    },
    /// The robot fell off the grid; `position` is the last valid one.
    Lost {
        robot: String,
        position: Position,
        direction: Direction,
    },
    /// Newly committed position.
    Moved {
        robot: String,
        position: Position,
        direction: Direction,
    },
    /// Emitted once, last.
    Results { results: Vec<RobotResult> },
}

/// Receiver for simulation events.
pub trait EventSink {
    fn emit(&mut self, event: Event) -> io::Result<()>;
}

/// Collects every event in memory.
impl EventSink for Vec<Event> {
    fn emit(&mut self, event: Event) -> io::Result<()> {
        self.push(event);
        Ok(())
    }
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: Event) -> io::Result<()> {
        Ok(())
    }
}

/// Writes each event as one line of JSON.
pub struct JsonLines<W: Write> {
    writer: W,
}

impl<W: Write> JsonLines<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> EventSink for JsonLines<W> {
    fn emit(&mut self, event: Event) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, &event).map_err(io::Error::from)?;
        self.writer.write_all(b"\n")
    }
}

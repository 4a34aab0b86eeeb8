use std::fmt;

use serde::{Deserialize, Serialize};

/// Grid dimensions. Valid coordinates span `[0, w] x [0, h]` inclusive,
/// so a `5x3` square has 6 columns and 4 rows of positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Square {
    pub w: u8,
    pub h: u8,
}

impl Square {
    pub fn new(w: u8, h: u8) -> Self {
        Self { w, h }
    }

    /// True if `(x, y)` lies on the grid.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && x <= self.w as i32 && y >= 0 && y <= self.h as i32
    }
}

/// Compass heading. Declaration order is clockwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    N,
    E,
    S,
    W,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::N, Direction::E, Direction::S, Direction::W];

    pub fn clockwise(self) -> Self {
        match self {
            Direction::N => Direction::E,
            Direction::E => Direction::S,
            Direction::S => Direction::W,
            Direction::W => Direction::N,
        }
    }

    pub fn counter_clockwise(self) -> Self {
        match self {
            Direction::N => Direction::W,
            Direction::W => Direction::S,
            Direction::S => Direction::E,
            Direction::E => Direction::N,
        }
    }

    /// Unit offset `(dx, dy)` of one step along this heading.
    pub fn step(self) -> (i32, i32) {
        match self {
            Direction::N => (0, 1),
            Direction::E => (1, 0),
            Direction::S => (0, -1),
            Direction::W => (-1, 0),
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'N' => Some(Direction::N),
            'E' => Some(Direction::E),
            'S' => Some(Direction::S),
            'W' => Some(Direction::W),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Direction::N => 'N',
            Direction::E => 'E',
            Direction::S => 'S',
            Direction::W => 'W',
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// A single command inside a heading: turn right, step forward, turn left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    R,
    F,
    L,
}

impl Rotation {
    pub const ALL: [Rotation; 3] = [Rotation::R, Rotation::F, Rotation::L];

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'R' => Some(Rotation::R),
            'F' => Some(Rotation::F),
            'L' => Some(Rotation::L),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Rotation::R => 'R',
            Rotation::F => 'F',
            Rotation::L => 'L',
        }
    }
}

/// One robot instruction.
///
/// Serializes in the shape the event trace uses: a landing becomes
/// `{"move":{"l":x,"r":y,"d":"N"}}` and a heading becomes `{"rotate":["R","F"]}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Instruction {
    /// Initial pose. Only the first landing of a robot is applied.
    #[serde(rename = "move")]
    Landing {
        #[serde(rename = "l")]
        x: u8,
        #[serde(rename = "r")]
        y: u8,
        #[serde(rename = "d")]
        direction: Direction,
    },
    /// Non-empty run of commands executed in order.
    #[serde(rename = "rotate")]
    Heading(Vec<Rotation>),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotDefinition {
    pub name: String,
    pub instructions: Vec<Instruction>,
}

impl RobotDefinition {
    /// The first landing, with its index. It sets the initial pose and
    /// everything before it is skipped.
    pub fn landing(&self) -> Option<(usize, u8, u8, Direction)> {
        self.instructions
            .iter()
            .enumerate()
            .find_map(|(i, instruction)| match *instruction {
                Instruction::Landing { x, y, direction } => Some((i, x, y, direction)),
                Instruction::Heading(_) => None,
            })
    }
}

/// A whole mission: one square and the robots to drop on it, in order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    pub square: Square,
    pub robots: Vec<RobotDefinition>,
}

/// True if `name` is a valid robot identifier (`[A-Za-z0-9_]+`).
pub fn is_valid_name(name: &[u8]) -> bool {
    !name.is_empty() && name.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Renders canonical source text that parses back to the same program.
impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Square {} {}", self.square.w, self.square.h)?;
        for (i, robot) in self.robots.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "{}", robot.name)?;
            for instruction in &robot.instructions {
                match instruction {
                    Instruction::Landing { x, y, direction } => {
                        writeln!(f, "Move {x} {y} {direction}")?;
                    }
                    Instruction::Heading(commands) => {
                        let line: String = commands.iter().map(|r| r.as_char()).collect();
                        writeln!(f, "Rotate {line}")?;
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clockwise_cycle() {
        assert_eq!(Direction::N.clockwise(), Direction::E);
        assert_eq!(Direction::E.clockwise(), Direction::S);
        assert_eq!(Direction::S.clockwise(), Direction::W);
        assert_eq!(Direction::W.clockwise(), Direction::N);
    }

    #[test]
    fn test_counter_clockwise_cycle() {
        assert_eq!(Direction::N.counter_clockwise(), Direction::W);
        assert_eq!(Direction::W.counter_clockwise(), Direction::S);
        assert_eq!(Direction::S.counter_clockwise(), Direction::E);
        assert_eq!(Direction::E.counter_clockwise(), Direction::N);
    }

    #[test]
    fn test_rotations_are_inverse() {
        for d in Direction::ALL {
            assert_eq!(d.clockwise().counter_clockwise(), d);
            assert_eq!(d.clockwise().clockwise().clockwise().clockwise(), d);
        }
    }

    #[test]
    fn test_step_offsets() {
        assert_eq!(Direction::N.step(), (0, 1));
        assert_eq!(Direction::E.step(), (1, 0));
        assert_eq!(Direction::S.step(), (0, -1));
        assert_eq!(Direction::W.step(), (-1, 0));
    }

    #[test]
    fn test_square_bounds_are_inclusive() {
        let square = Square::new(5, 3);
        assert!(square.contains(0, 0));
        assert!(square.contains(5, 3));
        assert!(!square.contains(6, 0));
        assert!(!square.contains(0, 4));
        assert!(!square.contains(-1, 0));
        assert!(!square.contains(0, -1));
    }

    #[test]
    fn test_char_conversions() {
        for d in Direction::ALL {
            assert_eq!(Direction::from_char(d.as_char()), Some(d));
        }
        for r in Rotation::ALL {
            assert_eq!(Rotation::from_char(r.as_char()), Some(r));
        }
        assert_eq!(Direction::from_char('X'), None);
        assert_eq!(Rotation::from_char('B'), None);
    }

    #[test]
    fn test_valid_names() {
        assert!(is_valid_name(b"Carlos"));
        assert!(is_valid_name(b"robot_7"));
        assert!(!is_valid_name(b""));
        assert!(!is_valid_name(b"two words"));
        assert!(!is_valid_name(&[0x80]));
    }

    #[test]
    fn test_landing_is_first_landing_anywhere() {
        let robot = RobotDefinition {
            name: "A".to_string(),
            instructions: vec![
                Instruction::Heading(vec![Rotation::R]),
                Instruction::Landing { x: 1, y: 2, direction: Direction::N },
                Instruction::Landing { x: 3, y: 4, direction: Direction::S },
            ],
        };
        assert_eq!(robot.landing(), Some((1, 1, 2, Direction::N)));

        let no_landing = RobotDefinition {
            name: "B".to_string(),
            instructions: vec![Instruction::Heading(vec![Rotation::F])],
        };
        assert_eq!(no_landing.landing(), None);
    }

    #[test]
    fn test_instruction_json_shape() {
        let landing = Instruction::Landing {
            x: 1,
            y: 2,
            direction: Direction::E,
        };
        let heading = Instruction::Heading(vec![Rotation::R, Rotation::F]);
        assert_eq!(
            serde_json::to_string(&landing).unwrap(),
            r#"{"move":{"l":1,"r":2,"d":"E"}}"#
        );
        assert_eq!(
            serde_json::to_string(&heading).unwrap(),
            r#"{"rotate":["R","F"]}"#
        );
    }

    #[test]
    fn test_display_renders_source() {
        let program = Program {
            square: Square::new(5, 3),
            robots: vec![
                RobotDefinition {
                    name: "Carlos".to_string(),
                    instructions: vec![
                        Instruction::Landing {
                            x: 1,
                            y: 1,
                            direction: Direction::E,
                        },
                        Instruction::Heading(vec![Rotation::R, Rotation::F]),
                    ],
                },
                RobotDefinition {
                    name: "Mike".to_string(),
                    instructions: vec![Instruction::Landing {
                        x: 3,
                        y: 2,
                        direction: Direction::N,
                    }],
                },
            ],
        };
        assert_eq!(
            program.to_string(),
            "Square 5 3\nCarlos\nMove 1 1 E\nRotate RF\n\nMike\nMove 3 2 N\n"
        );
    }
}

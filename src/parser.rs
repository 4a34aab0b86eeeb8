//! Parser for mission source text.
//!
//! The grammar is line oriented:
//!
//! ```text
//! Square 5 3
//!
//! Carlos
//! Move 1 1 E
//! Rotate RFRFRFRF
//! ```
//!
//! A program is one `Square w h` line followed by any number of robot
//! blocks. A block is a name line followed by `Move x y D` and
//! `Rotate <RFL>+` lines. Whitespace and blank lines are free between
//! sentences; every sentence ends at a line terminator or end of input.
//!
//! The parser is a backtracking recursive descent over the source. Syntax
//! failures report the furthest position any rule reached, together with
//! the names of the rules that could have continued there. Semantic
//! violations (zero-sized square, trailing parameters) abort immediately.

use tracing::debug;

use crate::error::{Location, ParseError, Span};
use crate::program::{Direction, Instruction, Program, RobotDefinition, Rotation, Square};

/// Rule outcome: `Ok(None)` means the rule did not match and the caller may
/// backtrack; `Err` aborts the whole parse.
type Rule<T> = Result<Option<T>, ParseError>;

/// Parse mission source into a [`Program`].
///
/// Semantic errors (zero or oversized square, oversized movement, long
/// names) are spanned from the offending keyword or name. Leading
/// whitespace on that line is not part of the span.
pub fn parse(source: &str) -> Result<Program, ParseError> {
    let mut parser = Parser::new(source);
    let program = parser.program()?;
    debug!(
        w = program.square.w,
        h = program.square.h,
        robots = program.robots.len(),
        "parsed program"
    );
    Ok(program)
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
    /// Furthest position at which a rule failed.
    fail_pos: usize,
    /// Rule names expected at `fail_pos`.
    expected: Vec<&'static str>,
    /// Nesting depth of named rules; failures inside them are not recorded.
    silent: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            pos: 0,
            fail_pos: 0,
            expected: Vec::new(),
            silent: 0,
        }
    }

    // --- Rules ---

    fn program(&mut self) -> Result<Program, ParseError> {
        let Some(square) = self.planet_definition()? else {
            return Err(self.syntax_error());
        };
        let robots = self.sentences()?;
        if self.pos < self.source.len() {
            self.fail("end of input");
            return Err(self.syntax_error());
        }
        Ok(Program { square, robots })
    }

    fn planet_definition(&mut self) -> Rule<Square> {
        self.named("Planet Definition", |p| {
            p.whitespace();
            let start = p.pos;
            if !p.literal("Square") || !p.spaces() {
                return Ok(None);
            }
            let Some(w) = p.digits() else { return Ok(None) };
            if !p.spaces() {
                return Ok(None);
            }
            let Some(h) = p.digits() else { return Ok(None) };
            if !p.eos() {
                return Ok(None);
            }
            if w == 0 || h == 0 {
                return Err(p.error("Planet definition must be > 0", start));
            }
            match (u8::try_from(w), u8::try_from(h)) {
                (Ok(w), Ok(h)) => Ok(Some(Square { w, h })),
                _ => Err(p.error("Planet definition must be <= 255", start)),
            }
        })
    }

    fn sentences(&mut self) -> Result<Vec<RobotDefinition>, ParseError> {
        let mut robots = Vec::new();
        loop {
            let start = self.pos;
            if self.empty_line() {
                continue;
            }
            self.pos = start;
            self.whitespace();
            match self.block()? {
                Some(robot) => robots.push(robot),
                None => {
                    self.pos = start;
                    break;
                }
            }
        }
        Ok(robots)
    }

    fn empty_line(&mut self) -> bool {
        self.whitespace();
        self.line_terminator()
    }

    fn block(&mut self) -> Rule<RobotDefinition> {
        self.named("Block", |p| {
            let Some(name) = p.robot_name()? else {
                return Ok(None);
            };
            let start = p.pos - name.len();
            if !p.eos() {
                return Ok(None);
            }
            // The wire format stores the name length in one byte.
            if name.len() > u8::MAX as usize {
                return Err(p.error("Robot name must be <= 255 characters", start));
            }
            let instructions = p.instructions()?;
            Ok(Some(RobotDefinition { name, instructions }))
        })
    }

    fn robot_name(&mut self) -> Rule<String> {
        self.named("Robot Name", |p| {
            p.whitespace();
            let start = p.pos;
            p.take_while(|c| c.is_ascii_alphanumeric() || c == '_');
            if p.pos == start {
                p.fail("[a-zA-Z0-9_]");
                return Ok(None);
            }
            Ok(Some(p.source[start..p.pos].to_string()))
        })
    }

    fn instructions(&mut self) -> Result<Vec<Instruction>, ParseError> {
        let mut instructions = Vec::new();
        loop {
            let start = self.pos;
            match self.instruction()? {
                Some(instruction) => instructions.push(instruction),
                None => {
                    self.pos = start;
                    break;
                }
            }
        }
        Ok(instructions)
    }

    fn instruction(&mut self) -> Rule<Instruction> {
        let start = self.pos;

        self.whitespace();
        let keyword = self.pos;
        if let Some(landing) = self.movement()? {
            if !self.eos() {
                return Err(self.error("Movement expects only 3 params", keyword));
            }
            return Ok(Some(landing));
        }

        self.pos = start;
        self.whitespace();
        let keyword = self.pos;
        if let Some(heading) = self.rotation_type()? {
            if !self.eos() {
                return Err(self.error("Rotation expects only 1 param", keyword));
            }
            return Ok(Some(heading));
        }

        self.pos = start;
        Ok(None)
    }

    fn movement(&mut self) -> Rule<Instruction> {
        self.named("Movement", |p| {
            let start = p.pos;
            if !p.literal("Move") || !p.spaces() {
                return Ok(None);
            }
            let Some(x) = p.digits() else { return Ok(None) };
            if !p.literal(" ") {
                return Ok(None);
            }
            let Some(y) = p.digits() else { return Ok(None) };
            if !p.literal(" ") {
                return Ok(None);
            }
            let Some(direction) = p.direction() else {
                return Ok(None);
            };
            match (u8::try_from(x), u8::try_from(y)) {
                (Ok(x), Ok(y)) => Ok(Some(Instruction::Landing { x, y, direction })),
                _ => Err(p.error("Movement must be <= 255", start)),
            }
        })
    }

    fn rotation_type(&mut self) -> Rule<Instruction> {
        self.named("Rotation Type", |p| {
            if !p.literal("Rotate") || !p.spaces() {
                return Ok(None);
            }
            let mut commands = Vec::new();
            while let Some(rotation) = p.peek().and_then(Rotation::from_char) {
                commands.push(rotation);
                p.pos += 1;
            }
            if commands.is_empty() {
                p.fail("\"R\", \"F\", or \"L\"");
                return Ok(None);
            }
            Ok(Some(Instruction::Heading(commands)))
        })
    }

    fn direction(&mut self) -> Option<Direction> {
        match self.peek().and_then(Direction::from_char) {
            Some(d) => {
                self.pos += 1;
                Some(d)
            }
            None => {
                self.fail("Direction");
                None
            }
        }
    }

    /// End of sentence: a line terminator or end of input.
    fn eos(&mut self) -> bool {
        let start = self.pos;
        self.silent += 1;
        let matched = self.line_terminator() || self.eof();
        self.silent -= 1;
        if !matched {
            self.pos = start;
            self.fail("End Of Sentence");
        }
        matched
    }

    fn line_terminator(&mut self) -> bool {
        for terminator in ["\n", "\r\n", "\r", "\u{2028}", "\u{2029}"] {
            if self.source[self.pos..].starts_with(terminator) {
                self.pos += terminator.len();
                return true;
            }
        }
        self.fail("end of line");
        false
    }

    fn eof(&mut self) -> bool {
        if self.pos == self.source.len() {
            true
        } else {
            self.fail("End Of File");
            false
        }
    }

    // --- Terminals ---

    fn whitespace(&mut self) {
        self.take_while(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));
    }

    fn spaces(&mut self) -> bool {
        let start = self.pos;
        self.take_while(|c| c == ' ');
        if self.pos == start {
            self.fail("\" \"");
            return false;
        }
        true
    }

    /// Unsigned decimal literal. Saturates instead of overflowing so that
    /// oversized values reach the range checks.
    fn digits(&mut self) -> Option<u64> {
        let start = self.pos;
        self.take_while(|c| c.is_ascii_digit());
        if self.pos == start {
            self.fail("[0-9]");
            return None;
        }
        let value = self.source[start..self.pos]
            .bytes()
            .fold(0u64, |acc, b| acc.saturating_mul(10).saturating_add((b - b'0') as u64));
        Some(value)
    }

    fn literal(&mut self, text: &'static str) -> bool {
        if self.source[self.pos..].starts_with(text) {
            self.pos += text.len();
            true
        } else {
            self.fail(text);
            false
        }
    }

    // --- Machinery ---

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    /// Run `rule` as a named rule: on failure, restore the position and
    /// record `name` as the only expectation at the rule's start.
    fn named<T>(&mut self, name: &'static str, rule: impl FnOnce(&mut Self) -> Rule<T>) -> Rule<T> {
        let start = self.pos;
        self.silent += 1;
        let result = rule(self);
        self.silent -= 1;
        match result {
            Ok(None) => {
                self.pos = start;
                self.fail(name);
                Ok(None)
            }
            other => other,
        }
    }

    fn fail(&mut self, expected: &'static str) {
        if self.silent > 0 || self.pos < self.fail_pos {
            return;
        }
        if self.pos > self.fail_pos {
            self.fail_pos = self.pos;
            self.expected.clear();
        }
        self.expected.push(expected);
    }

    fn location(&self, offset: usize) -> Location {
        Location::from_offset(self.source, offset)
    }

    fn error(&self, message: &str, start: usize) -> ParseError {
        ParseError {
            message: message.to_string(),
            span: Span {
                start: self.location(start),
                end: self.location(self.pos),
            },
        }
    }

    fn syntax_error(&self) -> ParseError {
        let mut expected = self.expected.clone();
        expected.sort_unstable();
        expected.dedup();

        let found = self.source[self.fail_pos..].chars().next();
        let end = self.fail_pos + found.map_or(0, char::len_utf8);
        let found = match found {
            Some(c) => format!("\"{}\"", escape(c)),
            None => "end of input".to_string(),
        };

        ParseError {
            message: format!("Expected {} but {found} found.", describe_expected(&expected)),
            span: Span {
                start: self.location(self.fail_pos),
                end: self.location(end),
            },
        }
    }
}

fn describe_expected(expected: &[&str]) -> String {
    match expected {
        [] => "nothing".to_string(),
        [only] => only.to_string(),
        [first, second] => format!("{first} or {second}"),
        [rest @ .., last] => format!("{}, or {last}", rest.join(", ")),
    }
}

fn escape(c: char) -> String {
    match c {
        '\\' => "\\\\".to_string(),
        '"' => "\\\"".to_string(),
        '\0' => "\\0".to_string(),
        '\t' => "\\t".to_string(),
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        c if c.is_control() => format!("\\x{:02X}", c as u32),
        c => c.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = "Square 5 3
      Carlos
      Move 1 1 E
      Rotate RFRFRFRF

      Mike
      Move 3 2 N
      Rotate FRRFLLFFRRFLL

      Jhon
      Move 0 3 W
      Rotate LLFFFLFLFL
";

    fn landing(x: u8, y: u8, direction: Direction) -> Instruction {
        Instruction::Landing { x, y, direction }
    }

    fn heading(commands: &str) -> Instruction {
        Instruction::Heading(commands.chars().filter_map(Rotation::from_char).collect())
    }

    #[test]
    fn test_parse_scenario() {
        let program = parse(SCENARIO).unwrap();
        assert_eq!(program.square, Square::new(5, 3));
        let names: Vec<&str> = program.robots.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Carlos", "Mike", "Jhon"]);
        assert_eq!(
            program.robots[0].instructions,
            vec![landing(1, 1, Direction::E), heading("RFRFRFRF")]
        );
        assert_eq!(
            program.robots[2].instructions,
            vec![landing(0, 3, Direction::W), heading("LLFFFLFLFL")]
        );
    }

    #[test]
    fn test_square_only() {
        let program = parse("Square 1 1").unwrap();
        assert_eq!(program.square, Square::new(1, 1));
        assert!(program.robots.is_empty());
    }

    #[test]
    fn test_zero_square_rejected() {
        let err = parse("Square 0 3\nCarlos\nMove 1 1 E\n").unwrap_err();
        assert_eq!(err.message, "Planet definition must be > 0");
        assert_eq!(err.span.start.line, 1);

        let err = parse("Square 5 0\n").unwrap_err();
        assert_eq!(err.message, "Planet definition must be > 0");
    }

    #[test]
    fn test_oversized_square_rejected() {
        let err = parse("Square 256 3\n").unwrap_err();
        assert_eq!(err.message, "Planet definition must be <= 255");
        assert!(parse("Square 255 255\n").is_ok());
    }

    #[test]
    fn test_empty_input() {
        let err = parse("").unwrap_err();
        assert_eq!(
            err.message,
            "Expected Planet Definition but end of input found."
        );
    }

    #[test]
    fn test_missing_square_keyword() {
        let err = parse("Carlos\nMove 1 1 E\n").unwrap_err();
        assert_eq!(err.message, "Expected Planet Definition but \"C\" found.");
        assert_eq!(err.span.start.offset, 0);
    }

    #[test]
    fn test_movement_trailing_params() {
        let err = parse("Square 5 3\nCarlos\nMove 1 1 E 7\n").unwrap_err();
        assert_eq!(err.message, "Movement expects only 3 params");
        assert_eq!(err.span.start.line, 3);
        assert_eq!(err.span.start.column, 1);
    }

    #[test]
    fn test_rotation_trailing_params() {
        let err = parse("Square 5 3\nCarlos\nMove 1 1 E\nRotate RF LF\n").unwrap_err();
        assert_eq!(err.message, "Rotation expects only 1 param");
        assert_eq!(err.span.start.line, 4);

        let err = parse("Square 5 3\nCarlos\nMove 1 1 E\nRotate RFX").unwrap_err();
        assert_eq!(err.message, "Rotation expects only 1 param");
    }

    #[test]
    fn test_movement_out_of_range() {
        let err = parse("Square 5 3\nCarlos\nMove 300 1 E\n").unwrap_err();
        assert_eq!(err.message, "Movement must be <= 255");
    }

    #[test]
    fn test_bad_direction_reports_furthest_failure() {
        let err = parse("Square 5 3\nCarlos\nMove 1 1 X\n").unwrap_err();
        assert_eq!(
            err.message,
            "Expected Block, end of input, or end of line but \"M\" found."
        );
        assert_eq!(err.span.start.line, 3);
        assert_eq!(err.span.start.column, 1);
    }

    #[test]
    fn test_trailing_space_after_name() {
        let err = parse("Square 5 3\nCarlos \nMove 1 1 E\n").unwrap_err();
        // The failure inside the block is silenced; the report points at
        // the start of the block that could not be completed.
        assert_eq!(
            err.message,
            "Expected Block, end of input, or end of line but \"C\" found."
        );
        assert_eq!(err.span.start.line, 2);
    }

    #[test]
    fn test_line_terminators() {
        let source = "Square 5 3\r\nCarlos\r\nMove 1 1 E\rRotate RF\u{2028}Mike\nMove 0 0 N";
        let program = parse(source).unwrap();
        assert_eq!(program.robots.len(), 2);
        assert_eq!(program.robots[0].instructions.len(), 2);
        assert_eq!(program.robots[1].instructions, vec![landing(0, 0, Direction::N)]);
    }

    #[test]
    fn test_multiple_landings_and_headings_are_kept() {
        let source = "Square 5 3\nCarlos\nMove 1 1 E\nRotate RF\nRotate L\nMove 4 4 S\n";
        let program = parse(source).unwrap();
        assert_eq!(
            program.robots[0].instructions,
            vec![
                landing(1, 1, Direction::E),
                heading("RF"),
                heading("L"),
                landing(4, 4, Direction::S),
            ]
        );
    }

    #[test]
    fn test_long_robot_name_rejected() {
        let source = format!("Square 5 3\n{}\nMove 1 1 E\n", "a".repeat(256));
        let err = parse(&source).unwrap_err();
        assert_eq!(err.message, "Robot name must be <= 255 characters");
        assert_eq!(err.span.start.line, 2);

        let source = format!("Square 5 3\n{}\nMove 1 1 E\n", "a".repeat(255));
        assert!(parse(&source).is_ok());
    }

    #[test]
    fn test_robot_without_instructions() {
        let program = parse("Square 5 3\nLonely\n").unwrap();
        assert_eq!(program.robots[0].name, "Lonely");
        assert!(program.robots[0].instructions.is_empty());
    }

    #[test]
    fn test_keyword_like_robot_names() {
        let program = parse("Square 5 3\nMove\nMove 1 1 E\nRotate\nRotate F\n").unwrap();
        let names: Vec<&str> = program.robots.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Move", "Rotate"]);
    }

    #[test]
    fn test_describe_expected() {
        assert_eq!(describe_expected(&["A"]), "A");
        assert_eq!(describe_expected(&["A", "B"]), "A or B");
        assert_eq!(describe_expected(&["A", "B", "C"]), "A, B, or C");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape('M'), "M");
        assert_eq!(escape('\n'), "\\n");
        assert_eq!(escape('"'), "\\\"");
        assert_eq!(escape('\u{1}'), "\\x01");
    }
}

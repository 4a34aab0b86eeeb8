//! Wire format between the compiler and the simulator.
//!
//! ```text
//! 01 w h                      square header, once
//! n name[n]                   robot record: name length, then ASCII name
//!   02 x y dir                landing
//!   03 rot rot ...            heading, length implicit
//! 80                          end of robot
//! ```
//!
//! Direction codes are `04..=07` (N, E, S, W) and rotation codes `08..=0A`
//! (R, F, L). Names only use bytes `>= 0x30`, so they never collide with an
//! opcode. There is no robot count; the end of the buffer ends the program.
//!
//! A heading record has no length prefix: the decoder consumes the maximal
//! run of rotation-code bytes following `03`. The next opcode (including
//! another `03`) ends the run.

use std::fmt::Write;

use tracing::trace;

use crate::error::{DecodeError, EncodeError};
use crate::program::{Direction, Instruction, Program, RobotDefinition, Rotation, Square, is_valid_name};

pub const OP_SQUARE: u8 = 0x01;
pub const OP_LANDING: u8 = 0x02;
pub const OP_HEADING: u8 = 0x03;
pub const OP_END_ROBOT: u8 = 0x80;

pub fn direction_code(direction: Direction) -> u8 {
    match direction {
        Direction::N => 0x04,
        Direction::E => 0x05,
        Direction::S => 0x06,
        Direction::W => 0x07,
    }
}

pub fn decode_direction(byte: u8) -> Option<Direction> {
    match byte {
        0x04 => Some(Direction::N),
        0x05 => Some(Direction::E),
        0x06 => Some(Direction::S),
        0x07 => Some(Direction::W),
        _ => None,
    }
}

pub fn rotation_code(rotation: Rotation) -> u8 {
    match rotation {
        Rotation::R => 0x08,
        Rotation::F => 0x09,
        Rotation::L => 0x0A,
    }
}

pub fn decode_rotation(byte: u8) -> Option<Rotation> {
    match byte {
        0x08 => Some(Rotation::R),
        0x09 => Some(Rotation::F),
        0x0A => Some(Rotation::L),
        _ => None,
    }
}

/// Encode a program into bytecode.
///
/// Rejects programs the decoder could not read back: names that are not
/// identifiers or exceed 255 bytes, and headings with no commands.
pub fn encode(program: &Program) -> Result<Vec<u8>, EncodeError> {
    let mut out = vec![OP_SQUARE, program.square.w, program.square.h];
    for robot in &program.robots {
        if !is_valid_name(robot.name.as_bytes()) {
            return Err(EncodeError::InvalidName {
                name: robot.name.clone(),
            });
        }
        let len = u8::try_from(robot.name.len()).map_err(|_| EncodeError::NameTooLong {
            name: robot.name.clone(),
            len: robot.name.len(),
        })?;
        out.push(len);
        out.extend_from_slice(robot.name.as_bytes());
        for instruction in &robot.instructions {
            match instruction {
                Instruction::Landing { x, y, direction } => {
                    out.extend_from_slice(&[OP_LANDING, *x, *y, direction_code(*direction)]);
                }
                Instruction::Heading(commands) if commands.is_empty() => {
                    return Err(EncodeError::EmptyHeading {
                        robot: robot.name.clone(),
                    });
                }
                Instruction::Heading(commands) => {
                    out.push(OP_HEADING);
                    out.extend(commands.iter().map(|&r| rotation_code(r)));
                }
            }
        }
        out.push(OP_END_ROBOT);
    }
    trace!(bytes = out.len(), robots = program.robots.len(), "encoded program");
    Ok(out)
}

/// Forward-only cursor over a bytecode buffer.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn next(&mut self, expected: &'static str) -> Result<u8, DecodeError> {
        let byte = self.peek().ok_or(DecodeError::UnexpectedEof {
            offset: self.pos,
            expected,
        })?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, n: usize, expected: &'static str) -> Result<&'a [u8], DecodeError> {
        let slice = self
            .bytes
            .get(self.pos..self.pos + n)
            .ok_or(DecodeError::UnexpectedEof {
                offset: self.bytes.len(),
                expected,
            })?;
        self.pos += n;
        Ok(slice)
    }
}

/// Decode bytecode back into a program in a single forward pass.
pub fn decode(bytes: &[u8]) -> Result<Program, DecodeError> {
    let mut reader = Reader::new(bytes);

    match reader.peek() {
        Some(OP_SQUARE) => reader.pos += 1,
        found => return Err(DecodeError::MissingSquareHeader { found }),
    }
    let w = reader.next("square width")?;
    let h = reader.next("square height")?;
    if w == 0 || h == 0 {
        return Err(DecodeError::InvalidSquare { w, h });
    }

    let mut robots = Vec::new();
    while !reader.is_empty() {
        robots.push(decode_robot(&mut reader)?);
    }

    trace!(bytes = bytes.len(), robots = robots.len(), "decoded program");
    Ok(Program {
        square: Square { w, h },
        robots,
    })
}

fn decode_robot(reader: &mut Reader<'_>) -> Result<RobotDefinition, DecodeError> {
    let offset = reader.pos;
    let len = reader.next("robot name length")? as usize;
    let name = reader.take(len, "robot name")?;
    if !is_valid_name(name) {
        return Err(DecodeError::InvalidName { offset });
    }
    let name = String::from_utf8(name.to_vec()).map_err(|_| DecodeError::InvalidName { offset })?;

    let mut instructions = Vec::new();
    loop {
        let offset = reader.pos;
        match reader.next("opcode or end of robot")? {
            OP_END_ROBOT => break,
            OP_LANDING => {
                let x = reader.next("landing x")?;
                let y = reader.next("landing y")?;
                let dir_offset = reader.pos;
                let byte = reader.next("landing direction")?;
                let direction = decode_direction(byte).ok_or(DecodeError::InvalidDirection {
                    offset: dir_offset,
                    byte,
                })?;
                instructions.push(Instruction::Landing { x, y, direction });
            }
            OP_HEADING => {
                let mut commands = Vec::new();
                while let Some(rotation) = reader.peek().and_then(decode_rotation) {
                    commands.push(rotation);
                    reader.pos += 1;
                }
                if commands.is_empty() {
                    return Err(DecodeError::EmptyHeading { offset });
                }
                instructions.push(Instruction::Heading(commands));
            }
            byte => return Err(DecodeError::UnknownOpcode { offset, byte }),
        }
    }

    Ok(RobotDefinition { name, instructions })
}

/// Pretty-print a listing of the bytecode for human inspection.
///
/// Never fails: bytes that cannot be decoded are listed as trailing.
pub fn disassemble(bytes: &[u8]) -> String {
    let mut out = String::new();
    let pc = disassemble_records(bytes, &mut out);
    // Bytes that don't form a complete record.
    for (i, &byte) in bytes.iter().enumerate().skip(pc) {
        let _ = writeln!(out, "{i:04X}: {byte:02X}     (trailing)");
    }
    out
}

/// List every complete record and return the offset of the first byte
/// that could not be listed.
fn disassemble_records(bytes: &[u8], out: &mut String) -> usize {
    let [OP_SQUARE, w, h, ..] = bytes else {
        return 0;
    };
    emit(out, 0, &bytes[..3], &format!("SQUARE {w}x{h}"));
    let mut pc = 3;

    while pc < bytes.len() {
        let len = bytes[pc] as usize;
        let Some(name) = bytes.get(pc + 1..pc + 1 + len) else {
            return pc;
        };
        let text = format!("ROBOT {:?}", String::from_utf8_lossy(name));
        emit(out, pc, &bytes[pc..pc + 1 + len], &text);
        pc += 1 + len;

        loop {
            match bytes.get(pc) {
                Some(&OP_END_ROBOT) => {
                    emit(out, pc, &bytes[pc..pc + 1], "END");
                    pc += 1;
                    break;
                }
                Some(&OP_LANDING) => {
                    let Some(record) = bytes.get(pc..pc + 4) else {
                        return pc;
                    };
                    let Some(direction) = decode_direction(record[3]) else {
                        return pc;
                    };
                    let text = format!("LAND {} {} {direction}", record[1], record[2]);
                    emit(out, pc, record, &text);
                    pc += 4;
                }
                Some(&OP_HEADING) => {
                    let run = bytes[pc + 1..]
                        .iter()
                        .take_while(|&&b| decode_rotation(b).is_some())
                        .count();
                    let record = &bytes[pc..pc + 1 + run];
                    let commands: String = record[1..]
                        .iter()
                        .filter_map(|&b| decode_rotation(b))
                        .map(Rotation::as_char)
                        .collect();
                    emit(out, pc, record, &format!("HEAD {commands}"));
                    pc += 1 + run;
                }
                _ => return pc,
            }
        }
    }
    pc
}

fn emit(out: &mut String, pc: usize, record: &[u8], text: &str) {
    let hex: Vec<String> = record.iter().map(|b| format!("{b:02X}")).collect();
    let _ = writeln!(out, "{pc:04X}: {:<24} {text}", hex.join(" "));
}

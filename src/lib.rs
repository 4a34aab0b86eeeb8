pub mod error;
pub mod program;
pub mod parser;
pub mod bytecode;
pub mod event;
pub mod sim;
pub mod mission;

use crate::error::Result;
use crate::event::EventSink;
use crate::sim::RobotResult;

/// Parse source text and encode it to bytecode.
pub fn compile(source: &str) -> Result<Vec<u8>> {
    let program = parser::parse(source)?;
    Ok(bytecode::encode(&program)?)
}

/// Decode bytecode and simulate it, reporting every event to `sink`.
pub fn execute<S: EventSink + ?Sized>(bytes: &[u8], sink: &mut S) -> Result<Vec<RobotResult>> {
    let program = bytecode::decode(bytes)?;
    Ok(sim::simulate(&program, sink)?)
}

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::program::{Direction, Instruction, Program, RobotDefinition, Rotation, Square};

/// Configuration for a randomly generated mission.
pub struct MissionConfig {
    /// Grid width. Clamped to at least 1.
    pub width: u8,
    /// Grid height. Clamped to at least 1.
    pub height: u8,
    /// Number of robots dropped on the grid.
    pub robots: usize,
    /// Commands in each robot's heading. Clamped to at least 1.
    pub commands: usize,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            width: 5,
            height: 3,
            robots: 3,
            commands: 12,
        }
    }
}

/// Generate a valid mission from `seed`.
///
/// Every robot lands inside the grid and carries one heading. Robots are
/// named `R0`, `R1`, ... in order. The same seed always yields the same
/// program.
pub fn generate(config: &MissionConfig, seed: u64) -> Program {
    let mut rng = SmallRng::seed_from_u64(seed);
    let square = Square::new(config.width.max(1), config.height.max(1));
    let commands = config.commands.max(1);

    let robots = (0..config.robots)
        .map(|i| {
            let landing = Instruction::Landing {
                x: rng.gen_range(0..=square.w),
                y: rng.gen_range(0..=square.h),
                direction: Direction::ALL[rng.gen_range(0..Direction::ALL.len())],
            };
            let heading = (0..commands)
                .map(|_| Rotation::ALL[rng.gen_range(0..Rotation::ALL.len())])
                .collect();
            RobotDefinition {
                name: format!("R{i}"),
                instructions: vec![landing, Instruction::Heading(heading)],
            }
        })
        .collect();

    Program { square, robots }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_generation() {
        let config = MissionConfig::default();
        assert_eq!(generate(&config, 42), generate(&config, 42));
    }

    #[test]
    fn test_different_seeds_different_programs() {
        let config = MissionConfig {
            robots: 16,
            commands: 32,
            ..Default::default()
        };
        assert_ne!(generate(&config, 1), generate(&config, 2));
    }

    #[test]
    fn test_shape() {
        let config = MissionConfig {
            width: 10,
            height: 4,
            robots: 7,
            commands: 5,
        };
        let program = generate(&config, 0);
        assert_eq!(program.square, Square::new(10, 4));
        assert_eq!(program.robots.len(), 7);
        for (i, robot) in program.robots.iter().enumerate() {
            assert_eq!(robot.name, format!("R{i}"));
            let (_, x, y, _) = robot.landing().unwrap();
            assert!(program.square.contains(x as i32, y as i32));
            match &robot.instructions[1] {
                Instruction::Heading(commands) => assert_eq!(commands.len(), 5),
                other => panic!("expected heading, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_degenerate_config_is_clamped() {
        let config = MissionConfig {
            width: 0,
            height: 0,
            robots: 1,
            commands: 0,
        };
        let program = generate(&config, 9);
        assert_eq!(program.square, Square::new(1, 1));
        assert!(matches!(
            &program.robots[0].instructions[1],
            Instruction::Heading(commands) if commands.len() == 1
        ));
    }
}

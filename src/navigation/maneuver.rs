//! Scripted maneuvers for the fastest run.
//!
//! Every script is written for going around obstacles on the right-hand side.
//! The left-hand variant is the mirror image: `FL`/`FR`, `BL`/`BR` and
//! `TL`/`TR` swap, as do the proximity sensors. Scripts can be overridden
//! from the `[navigation.course]` config table:
//!
//! ```toml
//! [[navigation.course.obstacle_one]]
//! step = "send"
//! command = "FR30"
//!
//! [[navigation.course.obstacle_one]]
//! step = "settle"
//! ms = 2000
//! ```

use crate::protocol::MovementCommand;
use crate::shared::Side;
use serde::Deserialize;

/// How a `Forward` step computes its distance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceRule {
    /// Measured gap between the obstacles
    Gap,
    /// Across the back of the second obstacle: `2x + 30`, `+20` when `x <= 20`
    CrossLateral,
    /// Back to the centre line: `2x / 4 + 20`
    ReturnLateral,
    Fixed(u32),
}

impl DistanceRule {
    /// Distance in cm for the given lateral and gap measurements.
    pub fn resolve(&self, lateral_cm: u32, gap_cm: u32) -> u32 {
        match self {
            DistanceRule::Gap => gap_cm,
            DistanceRule::CrossLateral => {
                let mut cm = lateral_cm * 2 + 30;
                if lateral_cm <= 20 {
                    cm += 20;
                }
                cm
            }
            DistanceRule::ReturnLateral => lateral_cm * 2 / 4 + 20,
            DistanceRule::Fixed(cm) => *cm,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Queue one command
    Send { command: MovementCommand },
    /// Drop everything queued
    Clear,
    /// Wait (scaled by `time_scale`)
    Settle { ms: u64 },
    /// Queue forward moves covering the computed distance
    Forward { distance: DistanceRule },
    /// Creep forward while the side sensor sees the obstacle
    PassObstacle {
        side: Side,
        #[serde(default)]
        trailing: bool,
    },
    /// Reverse if the last front reading is too close
    BackOffIfClose {
        command: MovementCommand,
        below_cm: f32,
        settle_ms: u64,
    },
    /// Run nested steps when the long-range front flag is blocked
    IfLongBlocked { steps: Vec<Step> },
    /// Drive open-ended until the front flag blocks, then stop
    DriveUntilBlocked,
}

impl Step {
    fn send(token: &str) -> Self {
        Step::Send {
            command: MovementCommand::new(token),
        }
    }

    fn settle(ms: u64) -> Self {
        Step::Settle { ms }
    }

    /// Left-hand version of this step.
    pub fn mirrored(&self) -> Self {
        match self {
            Step::Send { command } => Step::Send {
                command: command.mirrored(),
            },
            Step::PassObstacle { side, trailing } => Step::PassObstacle {
                side: side.opposite(),
                trailing: *trailing,
            },
            Step::BackOffIfClose {
                command,
                below_cm,
                settle_ms,
            } => Step::BackOffIfClose {
                command: command.mirrored(),
                below_cm: *below_cm,
                settle_ms: *settle_ms,
            },
            Step::IfLongBlocked { steps } => Step::IfLongBlocked {
                steps: mirror(steps),
            },
            other => other.clone(),
        }
    }
}

/// Mirror a whole script.
pub fn mirror(steps: &[Step]) -> Vec<Step> {
    steps.iter().map(Step::mirrored).collect()
}

/// The three scripted phases of a fastest run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Course {
    /// Around the first obstacle and back onto the centre line
    pub obstacle_one: Vec<Step>,
    /// Around the second obstacle until facing home
    pub obstacle_two: Vec<Step>,
    /// Back past the first obstacle into the start area
    pub return_home: Vec<Step>,
}

impl Default for Course {
    fn default() -> Self {
        Self {
            obstacle_one: vec![
                Step::Clear,
                Step::send("FR30"),
                Step::send("FL30"),
                Step::send("FL30"),
                Step::send("FR30"),
            ],
            obstacle_two: vec![
                // Turn out and pass along the near face
                Step::settle(5000),
                Step::BackOffIfClose {
                    command: MovementCommand::backward(5),
                    below_cm: 15.0,
                    settle_ms: 2000,
                },
                Step::Clear,
                Step::send("FR30"),
                Step::settle(10000),
                Step::PassObstacle {
                    side: Side::Left,
                    trailing: true,
                },
                Step::settle(5000),
                Step::send("FL30"),
                Step::send("FW10"),
                // Across the back
                Step::settle(5000),
                Step::send("FL30"),
                Step::Forward {
                    distance: DistanceRule::CrossLateral,
                },
                Step::settle(5000),
                Step::PassObstacle {
                    side: Side::Left,
                    trailing: false,
                },
                // Face home
                Step::settle(5000),
                Step::send("FL30"),
                Step::settle(5000),
            ],
            return_home: vec![
                Step::settle(3000),
                Step::Forward {
                    distance: DistanceRule::Gap,
                },
                Step::settle(5000),
                Step::Clear,
                Step::send("FL30"),
                Step::settle(5000),
                Step::IfLongBlocked {
                    steps: vec![
                        Step::settle(3000),
                        Step::send("BL30"),
                        Step::send("FW30"),
                        Step::send("FL30"),
                        Step::settle(10000),
                    ],
                },
                Step::Forward {
                    distance: DistanceRule::ReturnLateral,
                },
                Step::settle(3000),
                Step::send("FR30"),
                Step::settle(10000),
                Step::settle(4000),
                Step::DriveUntilBlocked,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(steps: &[Step]) -> Vec<String> {
        steps
            .iter()
            .filter_map(|s| match s {
                Step::Send { command } => Some(command.as_str().to_string()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_distance_rules() {
        assert_eq!(DistanceRule::CrossLateral.resolve(20, 0), 90);
        assert_eq!(DistanceRule::CrossLateral.resolve(30, 0), 90);
        assert_eq!(DistanceRule::CrossLateral.resolve(0, 0), 50);
        assert_eq!(DistanceRule::ReturnLateral.resolve(30, 0), 35);
        assert_eq!(DistanceRule::ReturnLateral.resolve(10, 0), 25);
        assert_eq!(DistanceRule::Gap.resolve(30, 110), 110);
        assert_eq!(DistanceRule::Fixed(42).resolve(30, 110), 42);
    }

    #[test]
    fn test_mirror_swaps_turns_and_sides() {
        let course = Course::default();
        assert_eq!(tokens(&mirror(&course.obstacle_one)), vec!["FL30", "FR30", "FR30", "FL30"]);

        let mirrored = mirror(&course.return_home);
        let nested = mirrored
            .iter()
            .find_map(|s| match s {
                Step::IfLongBlocked { steps } => Some(tokens(steps)),
                _ => None,
            })
            .unwrap();
        assert_eq!(nested, vec!["BR30", "FW30", "FR30"]);

        let passes: Vec<Side> = mirror(&course.obstacle_two)
            .iter()
            .filter_map(|s| match s {
                Step::PassObstacle { side, .. } => Some(*side),
                _ => None,
            })
            .collect();
        assert_eq!(passes, vec![Side::Right, Side::Right]);
    }

    #[test]
    fn test_course_from_toml() {
        #[derive(Deserialize)]
        struct Wrapper {
            course: Course,
        }

        let parsed: Wrapper = toml::from_str(
            r#"
            [[course.obstacle_one]]
            step = "send"
            command = "FR20"

            [[course.obstacle_one]]
            step = "forward"
            distance = { fixed = 40 }

            [[course.obstacle_one]]
            step = "pass_obstacle"
            side = "right"
            "#,
        )
        .unwrap();

        let steps = &parsed.course.obstacle_one;
        assert_eq!(steps.len(), 3);
        assert_eq!(
            steps[1],
            Step::Forward {
                distance: DistanceRule::Fixed(40)
            }
        );
        assert_eq!(
            steps[2],
            Step::PassObstacle {
                side: Side::Right,
                trailing: false
            }
        );
        // Unspecified phases keep their defaults.
        assert_eq!(parsed.course.return_home, Course::default().return_home);
    }
}

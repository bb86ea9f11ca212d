//! Scenario progression.
//!
//! A scenario is an ordered ladder of steps. Each step holds named, countable
//! criteria; once every criteria on the current step reaches its target the
//! scenario moves to the next step. Progression is independent of the boss
//! encounters, which only feed it through criteria credits.

mod step;
mod tracker;


pub use step::{CriteriaProgress, ScenarioStep};
pub use tracker::{FIRST_STEP, ScenarioProgressTracker, ScenarioUpdate};

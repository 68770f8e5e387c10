mod config;
mod eph;
mod irv;
mod nomination;
mod tracker;

pub mod builder;
pub mod manual;

pub use crate::config::*;
pub use crate::eph::{select_eph_finalists, StepObserver};
pub use crate::irv::tabulate_irv;
pub use crate::nomination::{count_nominations, POINTS_PER_BALLOT};
pub use crate::tracker::VoteTally;

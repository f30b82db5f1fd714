pub mod reports;
pub mod simulation;

pub use reports::{
    AcceptReport, PlanReport, ProgressReport, Report, ReportFormat, RewardList, emit,
};
pub use simulation::{SimulationReport, simulate_tour};

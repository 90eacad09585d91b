pub mod reports;
pub mod simulation;

pub use reports::{
    CalcReport, PresetsReport, PullReport, Report, ReportFormat, ResetReport, SimulationReport,
    StatsReport, write_report,
};
pub use simulation::{SimulationPlan, aggregate_sessions, run_simulation};

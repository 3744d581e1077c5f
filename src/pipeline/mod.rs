// src/pipeline/mod.rs

//! Pipeline orchestration for the listing crawler.
//!
//! - `budget`: credit costs, the spend ledger and whole-list estimates
//! - `resume`: deciding where a run starts
//! - `run`: the per-city state machine
//! - `crawl`: the composed entry point with interrupt handling

pub mod budget;
pub mod crawl;
pub mod resume;
pub mod run;

pub use budget::{CREDITS_PER_PAGE, CreditBudget, CreditEstimate, estimate_total_credits};
pub use crawl::{RunOutcome, load_cities, run_crawler, run_until};
pub use resume::{ResumePlan, ResumeReason, plan_resume, prepare_store};
pub use run::{Phase, RunController, RunReport, RunSettings, RunState, StopReason};

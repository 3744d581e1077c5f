// src/pipeline/run.rs

//! The run controller.
//!
//! A run walks the sorted city list as an explicit state machine:
//!
//! ```text
//! Init -> SelectCity -> Fetch -> Persist -> Advance -> SelectCity ...
//!              |
//!              +-> Done     (no cities left)
//!              +-> Halted   (next city does not fit the budget)
//! ```
//!
//! Rows are appended before the checkpoint is written, so a crash between
//! the two replays one city and the seen set absorbs the repeats.

use std::collections::HashSet;

use crate::error::{AppError, Result};
use crate::models::{Checkpoint, City, TierPages};
use crate::services::{CityFetch, PageFetcher, fetch_city};
use crate::storage::ListingStore;
use crate::utils::report;

use super::budget::{CreditBudget, city_cost};
use super::resume::{ResumePlan, prepare_store};

/// Per-run knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub query: String,
    pub pages: TierPages,
    /// Ceiling on cumulative spend, carried across resumed runs.
    pub max_credits: u64,
    pub resume: bool,
}

/// Why a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    CitiesExhausted,
    BudgetExhausted {
        index: usize,
        required: u64,
        remaining: u64,
    },
}

impl StopReason {
    pub fn describe(&self) -> String {
        match self {
            StopReason::CitiesExhausted => "all cities processed".to_string(),
            StopReason::BudgetExhausted {
                index,
                required,
                remaining,
            } => format!(
                "credit limit reached at city index {} (needs {}, {} left)",
                index, required, remaining
            ),
        }
    }
}

/// States of the run loop.
#[derive(Debug)]
pub enum Phase {
    SelectCity,
    Fetch { index: usize, pages: u32, cost: u64 },
    Persist { index: usize, cost: u64, fetched: CityFetch },
    Advance { index: usize },
    Done,
    Halted(StopReason),
}

/// Mutable state owned by one run.
#[derive(Debug)]
pub struct RunState {
    pub plan: ResumePlan,
    pub seen: HashSet<String>,
    pub budget: CreditBudget,
    pub next_index: usize,
    pub last_index: Option<usize>,
    pub cities_processed: usize,
    pub new_entries: usize,
    pub pages_requested: u64,
    pub failed_cities: usize,
}

impl RunState {
    fn new(plan: ResumePlan, seen: HashSet<String>, max_credits: u64) -> Self {
        let budget = CreditBudget::new(max_credits, plan.credits_used);
        let next_index = plan.start_index;
        Self {
            plan,
            seen,
            budget,
            next_index,
            last_index: None,
            cities_processed: 0,
            new_entries: 0,
            pages_requested: 0,
            failed_cities: 0,
        }
    }

    fn into_report(self, stop: StopReason) -> RunReport {
        RunReport {
            stop,
            start_index: self.plan.start_index,
            cities_processed: self.cities_processed,
            new_entries: self.new_entries,
            total_unique: self.seen.len(),
            credits_used: self.budget.spent(),
            max_credits: self.budget.max_credits(),
            last_index: self.last_index,
            pages_requested: self.pages_requested,
            failed_cities: self.failed_cities,
        }
    }
}

/// Outcome of a completed or halted run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub stop: StopReason,
    pub start_index: usize,
    pub cities_processed: usize,
    pub new_entries: usize,
    pub total_unique: usize,
    /// Cumulative, including spend carried from a checkpoint.
    pub credits_used: u64,
    pub max_credits: u64,
    /// Index of the last city persisted in this run.
    pub last_index: Option<usize>,
    pub pages_requested: u64,
    pub failed_cities: usize,
}

impl RunReport {
    pub fn summary_items(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Stopped", self.stop.describe()),
            ("Started at", format!("city index {}", self.start_index)),
            ("Cities processed", self.cities_processed.to_string()),
            ("Cities with errors", self.failed_cities.to_string()),
            ("Pages requested", self.pages_requested.to_string()),
            ("New entries", self.new_entries.to_string()),
            ("Unique entries", self.total_unique.to_string()),
            (
                "Credits used",
                format!("{}/{}", self.credits_used, self.max_credits),
            ),
        ]
    }
}

/// Drives a run over a fetcher and a store.
pub struct RunController<'a> {
    fetcher: &'a dyn PageFetcher,
    store: &'a dyn ListingStore,
    settings: &'a RunSettings,
}

impl<'a> RunController<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        store: &'a dyn ListingStore,
        settings: &'a RunSettings,
    ) -> Self {
        Self {
            fetcher,
            store,
            settings,
        }
    }

    /// Plan the starting point and prepare the store.
    pub fn init(&self) -> Result<RunState> {
        let (plan, seen) = prepare_store(self.store, self.settings.resume)?;
        Ok(RunState::new(plan, seen, self.settings.max_credits))
    }

    /// Run to completion or until the budget runs out.
    pub async fn run(&self, cities: &[City]) -> Result<RunReport> {
        let mut state = self.init()?;
        if state.next_index > cities.len() {
            log::warn!(
                "Resume point {} is past the end of the city list ({} cities)",
                state.next_index,
                cities.len()
            );
        }

        let mut phase = Phase::SelectCity;
        loop {
            phase = match phase {
                Phase::Done => return Ok(state.into_report(StopReason::CitiesExhausted)),
                Phase::Halted(reason) => return Ok(state.into_report(reason)),
                other => self.step(&mut state, other, cities).await?,
            };
        }
    }

    /// Advance the state machine by one transition.
    pub async fn step(&self, state: &mut RunState, phase: Phase, cities: &[City]) -> Result<Phase> {
        let next = match phase {
            Phase::SelectCity => self.select_city(state, cities),
            Phase::Fetch { index, pages, cost } => {
                let city = cities.get(index).ok_or_else(|| {
                    AppError::validation(format!("city index {} out of range", index))
                })?;
                let fetched = fetch_city(self.fetcher, &self.settings.query, city, pages).await;
                Phase::Persist {
                    index,
                    cost,
                    fetched,
                }
            }
            Phase::Persist {
                index,
                cost,
                fetched,
            } => self.persist(state, index, cost, fetched)?,
            Phase::Advance { index } => {
                state.next_index = index + 1;
                Phase::SelectCity
            }
            terminal @ (Phase::Done | Phase::Halted(_)) => terminal,
        };
        Ok(next)
    }

    fn select_city(&self, state: &RunState, cities: &[City]) -> Phase {
        let index = state.next_index;
        let Some(city) = cities.get(index) else {
            return Phase::Done;
        };

        let cost = city_cost(city, &self.settings.pages);
        if !state.budget.can_afford(cost) {
            log::info!(
                "Credit limit reached: {} needs {} credits, {} left",
                city.name,
                cost,
                state.budget.remaining()
            );
            return Phase::Halted(StopReason::BudgetExhausted {
                index,
                required: cost,
                remaining: state.budget.remaining(),
            });
        }

        report::step(
            index + 1,
            cities.len(),
            &format!(
                "{} (population {}, {})",
                city.name,
                city.population,
                city.tier().label()
            ),
        );
        Phase::Fetch {
            index,
            pages: self.settings.pages.for_tier(city.tier()),
            cost,
        }
    }

    fn persist(
        &self,
        state: &mut RunState,
        index: usize,
        cost: u64,
        fetched: CityFetch,
    ) -> Result<Phase> {
        let failed = fetched.failed();
        state.pages_requested += u64::from(fetched.pages_requested);

        let added = self.store.append(fetched.entries, &mut state.seen)?;
        self.store
            .write_checkpoint(&Checkpoint::new(index, state.budget.spent() + cost))?;
        state.budget.charge(cost);

        state.last_index = Some(index);
        state.cities_processed += 1;
        state.new_entries += added;
        if failed {
            state.failed_cities += 1;
        }

        report::sub_item(&format!("Found {} new unique entries", added));
        report::sub_item(&format!("Total unique entries: {}", state.seen.len()));
        report::sub_item(&format!(
            "Credits used: {}/{}",
            state.budget.spent(),
            state.budget.max_credits()
        ));

        Ok(Phase::Advance { index })
    }
}

//! # fbmc-algo: Flow-Based Market Coupling Domain
//!
//! Computes the flow-based domain of a transmission network: the set of
//! zonal net positions that keep every critical branch within its margin,
//! under normal operation and single outages.
//!
//! ```text
//! zonal_PTDF · NP ≤ RAM
//! ```
//!
//! ## Pipeline
//!
//! | Step | Module | Output |
//! |------|--------|--------|
//! | Allocation key | [`gsk`] | node × zone GSK, `flat` or `gmax` |
//! | Branch selection | [`critical_branches`] | critical and cross-border lines |
//! | Contingency assembly | [`contingency`] | signed N-0 / N-1 nodal PTDF rows |
//! | Margins | [`margin`] | zonal PTDF and RAM per timestep |
//! | Reduction | [`reduction`] | non-redundant rows via a [`ConstraintReducer`] |
//! | Orchestration | [`module`] | [`FbmcParameters`] for all timesteps |
//!
//! [`projection`] collapses a timestep domain onto two bilateral exchanges
//! for plotting.
//!
//! PTDF and LODF values come from a [`fbmc_core::GridModel`]; this crate
//! never computes them.
//!
//! ## Example
//!
//! ```ignore
//! use fbmc_algo::{CbcoSource, FbmcModule, KeepAllReducer};
//!
//! let module = FbmcModule::new(&grid, &results, None, CbcoSource::Computed, config)?;
//! let params = module.create_flowbased_parameters(&mut KeepAllReducer)?;
//! println!("{} constraints", params.len());
//! ```
//!
//! ## Features
//!
//! - `parallel`: compute timestep domains on the rayon thread pool

pub mod contingency;
pub mod critical_branches;
pub mod domain;
pub mod gsk;
pub mod margin;
pub mod module;
pub mod projection;
pub mod reduction;

pub use contingency::{
    assemble_contingency_ptdf, CbcoLabel, CbcoPlan, CbcoRecord, CbcoSource, ContingencyPtdf, Sign,
};
pub use critical_branches::{select_critical_branches, CriticalBranches};
pub use domain::{DomainRow, DomainTable};
pub use gsk::{build_gsk, GskMatrix};
pub use margin::{MarginCalculator, RamClampReport, TimestepDomain};
pub use module::{FbmcModule, FbmcParameters};
pub use projection::{project_domain, ProjectedDomain};
pub use reduction::{ConstraintReducer, KeepAllReducer, ReductionProblem};

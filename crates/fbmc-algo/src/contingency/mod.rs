//! Contingency PTDF assembly for flow-based domains.
//!
//! Every critical branch contributes one N-0 row and one row per relevant
//! outage (N-1). Thermal limits are symmetric while the margin equation is
//! one-sided, so each row is stored twice: as is and negated.
//!
//! ## Key Concepts
//!
//! - **CBCO:** a (critical branch, critical outage) pair; the outage is
//!   `basecase` for N-0 rows.
//! - **Relevant outage:** an outage whose LODF on the branch exceeds a
//!   sensitivity threshold, as reported by the grid model's `lodf_filter`.
//!
//! ## Row layout
//!
//! ```text
//! [ +N-0 rows of all selected lines ]
//! [ -N-0 rows of all selected lines ]
//! for each line with outages:
//!     [ +N-1 rows, one per outage ]
//!     [ -N-1 rows, one per outage ]
//! ```

pub mod assembler;

pub use assembler::{
    assemble_contingency_ptdf, CbcoLabel, CbcoPlan, CbcoRecord, CbcoSource, ContingencyPtdf,
    Sign,
};

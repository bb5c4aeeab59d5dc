//! N-1 domain on a meshed 3-node, 2-zone network.
//!
//! ```text
//!   zone A        zone B
//!   n1 ---l13--- n3
//!    \          /
//!    l12      l23
//!      \      /
//!        n2
//! ```
//!
//! Equal reactances, slack at n1. l13 is rated 200 MW, the others 100 MW.

use fbmc_algo::{CbcoSource, FbmcModule, Sign};
use fbmc_core::{
    BaseCaseResult, FbmcConfig, FbmcError, GridModel, GridTopology, GskStrategy,
    InjectionRecord, Line, LineId, LodfMatrix, Node, Outage, PtdfMatrix, ResultStore,
    StaticGridModel, ZoneId,
};

const THIRD: f64 = 1.0 / 3.0;

fn meshed_grid() -> StaticGridModel {
    let topology = GridTopology::new(
        vec![ZoneId::new("A"), ZoneId::new("B")],
        vec![
            Node::new("n1", "A"),
            Node::new("n2", "A"),
            Node::new("n3", "B"),
        ],
        vec![
            Line::new("l12", "n1", "n2", 100.0),
            Line::new("l23", "n2", "n3", 100.0),
            Line::new("l13", "n1", "n3", 200.0),
        ],
    );
    let ptdf = PtdfMatrix::new(
        vec![
            vec![0.0, -2.0 * THIRD, -THIRD],
            vec![0.0, THIRD, -THIRD],
            vec![0.0, -THIRD, -2.0 * THIRD],
        ],
        3,
    )
    .unwrap();
    let lodf = LodfMatrix::new(vec![
        vec![-1.0, -1.0, 1.0],
        vec![-1.0, -1.0, 1.0],
        vec![1.0, 1.0, -1.0],
    ])
    .unwrap();
    StaticGridModel::new(topology, ptdf, lodf).unwrap()
}

fn config() -> FbmcConfig {
    FbmcConfig {
        flowbased_region: vec!["A".into(), "B".into()],
        cb_threshold: 0.0,
        gsk_strategy: GskStrategy::Flat,
        ..FbmcConfig::default()
    }
}

/// 60 MW from n3 to n1 in t0001, 30 MW back in t0002, no net positions.
fn results() -> ResultStore {
    [BaseCaseResult::new("base").with_injections(vec![
        InjectionRecord::new("t0001", "n1", -60.0),
        InjectionRecord::new("t0001", "n3", 60.0),
        InjectionRecord::new("t0002", "n1", 30.0),
        InjectionRecord::new("t0002", "n3", -30.0),
    ])]
    .into_iter()
    .collect()
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn test_computed_n_1_row_count() {
    let grid = meshed_grid();
    let results = results();
    let module = FbmcModule::new(&grid, &results, None, CbcoSource::Computed, config()).unwrap();

    // l12 has identical zonal PTDFs for A and B and stays inside zone A
    let cbs = module.critical_branches().unwrap();
    assert_eq!(cbs.selected, vec![LineId::new("l23"), LineId::new("l13")]);

    let mut expected_constraints = 0;
    for line in &cbs.selected {
        let outages = grid.lodf_filter(line, config().lodf_sensitivity).unwrap();
        assert_eq!(outages.len(), 2);
        expected_constraints += 1 + outages.len();
    }

    let ptdf = module.nodal_fbmc_ptdf();
    assert_eq!(ptdf.num_rows(), 2 * expected_constraints);
    assert_eq!(ptdf.num_rows(), 12);

    // N-0 block, then the l23 block [+l23|l12, +l23|l13, -l23|l12, -l23|l13]
    assert_eq!(ptdf.labels[4].outage, Outage::from("l12"));
    assert_eq!(ptdf.labels[5].line, LineId::new("l23"));
    assert_eq!(ptdf.labels[5].outage, Outage::from("l13"));
    assert_eq!(ptdf.labels[5].sign, Sign::Positive);
    assert_eq!(ptdf.pair_of(5), Some(7));
    assert_eq!(ptdf.labels[7].sign, Sign::Negative);

    // l13 out: everything injected at n3 crosses l23
    assert!((ptdf.rows[5][2] + 1.0).abs() < 1e-10);
    assert!((ptdf.rows[7][2] - 1.0).abs() < 1e-10);
}

#[test]
fn test_n_1_ram_uses_monitored_line_frm() {
    let grid = meshed_grid();
    let results = results();
    let module = FbmcModule::new(&grid, &results, None, CbcoSource::Computed, config()).unwrap();

    let domain = module
        .create_flowbased_ptdf(GskStrategy::Flat, "t0001")
        .unwrap();
    let ptdf = module.nodal_fbmc_ptdf();
    let injection = results
        .get("base")
        .unwrap()
        .injection("t0001", grid.topology())
        .unwrap();

    // No net positions: the whole reference flow is non-market flow
    for (r, label) in ptdf.labels.iter().enumerate() {
        let limit = grid.topology().line(&label.line).unwrap().maxflow;
        let f_nonmarket = dot(&ptdf.rows[r], &injection);
        let expected = limit / 1.0 - 0.2 * limit - f_nonmarket;
        assert!(
            (domain.ram[r] - expected).abs() < 1e-10,
            "row {} ({}_{}): {} != {}",
            r,
            label.line,
            label.outage,
            domain.ram[r],
            expected
        );
    }

    // +l23|l13: 100 - 20 + 60, FRM of l23 even though l13 is rated 200
    assert!((domain.ram[5] - 140.0).abs() < 1e-10);
    // -l23|l13: 100 - 20 - 60
    assert!((domain.ram[7] - 20.0).abs() < 1e-10);
    // +l13 N-0 and +l13|l23 share the 40 MW FRM of l13
    assert!((domain.ram[1] - 200.0).abs() < 1e-10);
    assert!((domain.ram[9] - 220.0).abs() < 1e-10);
    assert!(!domain.clamp.triggered());
}

#[test]
fn test_timestep_domains_match_single_timestep_calls() {
    let grid = meshed_grid();
    let results = results();
    let module = FbmcModule::new(&grid, &results, None, CbcoSource::Computed, config()).unwrap();

    let domains = module.timestep_domains().unwrap();
    assert_eq!(domains.len(), 2);
    for (domain, timestep) in domains.iter().zip(["t0001", "t0002"]) {
        let single = module
            .create_flowbased_ptdf(GskStrategy::Flat, timestep)
            .unwrap();
        assert_eq!(domain.timestep, timestep);
        assert_eq!(domain.ram, single.ram);
        assert_eq!(domain.zonal_ptdf, single.zonal_ptdf);
        assert_eq!(domain.table, single.table);
        assert_eq!(domain.clamp, single.clamp);
    }
}

#[test]
fn test_negative_clamp_threshold_rejected() {
    let grid = meshed_grid();
    let results = results();
    let config = FbmcConfig {
        ram_clamp_threshold: -50.0,
        ..config()
    };
    let err = FbmcModule::new(&grid, &results, None, CbcoSource::Computed, config)
        .err()
        .unwrap();
    assert!(matches!(err, FbmcError::Config(_)));
}

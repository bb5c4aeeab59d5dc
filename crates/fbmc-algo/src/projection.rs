//! Two-dimensional projection of a zonal flow-based domain.
//!
//! Each axis is a bilateral exchange `z1 → z2`. Collapsing the zonal system
//! onto it takes the difference of the two zones' sensitivity columns:
//! ```text
//! A_2d[:, axis] = A[:, z1] - A[:, z2]
//! ```
//!
//! The result is meant for plotting the domain polygon only. Polygon
//! construction needs strictly positive right-hand sides, so `b_i ≤ 0` is
//! replaced by a small positive floor.

use fbmc_core::{FbmcError, FbmcResult, ZoneId};
use serde::Serialize;
use tracing::{info, warn};

/// Two-column system `a · (x, y) ≤ b`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedDomain {
    pub a: Vec<[f64; 2]>,
    pub b: Vec<f64>,
    /// Number of right-hand sides raised to the floor
    pub adjusted_rhs: usize,
}

/// Project `a`/`b` onto the exchanges `domain_x` and `domain_y`.
///
/// `zones` gives the column order of `a`. Each domain must name exactly two
/// known zones.
pub fn project_domain(
    zones: &[ZoneId],
    domain_x: &[ZoneId],
    domain_y: &[ZoneId],
    a: &[Vec<f64>],
    b: &[f64],
    rhs_floor: f64,
) -> FbmcResult<ProjectedDomain> {
    info!("Creating fbmc equations...");
    let x = axis_columns(zones, domain_x)?;
    let y = axis_columns(zones, domain_y)?;

    if a.len() != b.len() {
        return Err(FbmcError::dimension("rows of A vs b", a.len(), b.len()));
    }

    let mut projected = Vec::with_capacity(a.len());
    for row in a {
        if row.len() != zones.len() {
            return Err(FbmcError::dimension("columns of A", zones.len(), row.len()));
        }
        projected.push([row[x.0] - row[x.1], row[y.0] - row[y.1]]);
    }

    let mut b = b.to_vec();
    let mut adjusted_rhs = 0;
    for value in b.iter_mut() {
        if *value <= 0.0 {
            *value = rhs_floor;
            adjusted_rhs += 1;
        }
    }
    if adjusted_rhs > 0 {
        warn!(
            count = adjusted_rhs,
            floor = rhs_floor,
            "non-positive right-hand sides replaced"
        );
    }

    Ok(ProjectedDomain {
        a: projected,
        b,
        adjusted_rhs,
    })
}

fn axis_columns(zones: &[ZoneId], domain: &[ZoneId]) -> FbmcResult<(usize, usize)> {
    if domain.len() != 2 {
        warn!("Domains not set in the right way!");
        return Err(FbmcError::InvalidDomainAxis(domain.len()));
    }
    let column = |zone: &ZoneId| {
        zones
            .iter()
            .position(|z| z == zone)
            .ok_or_else(|| FbmcError::UnknownZone(zone.to_string()))
    };
    Ok((column(&domain[0])?, column(&domain[1])?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zones() -> Vec<ZoneId> {
        ["DE", "FR", "NL"].iter().map(|z| ZoneId::new(*z)).collect()
    }

    fn axes() -> (Vec<ZoneId>, Vec<ZoneId>) {
        (
            vec![ZoneId::new("DE"), ZoneId::new("FR")],
            vec![ZoneId::new("DE"), ZoneId::new("NL")],
        )
    }

    #[test]
    fn test_projection_columns() {
        let (x, y) = axes();
        let a = vec![vec![0.3, -0.1, 0.05], vec![-0.3, 0.1, -0.05]];
        let p = project_domain(&zones(), &x, &y, &a, &[10.0, 20.0], 0.1).unwrap();
        assert!((p.a[0][0] - 0.4).abs() < 1e-12);
        assert!((p.a[0][1] - 0.25).abs() < 1e-12);
        assert!((p.a[1][0] + 0.4).abs() < 1e-12);
        assert_eq!(p.b, vec![10.0, 20.0]);
        assert_eq!(p.adjusted_rhs, 0);
    }

    #[test]
    fn test_zero_rhs_replaced_only() {
        let (x, y) = axes();
        let a = vec![vec![0.0; 3]; 3];
        let p = project_domain(&zones(), &x, &y, &a, &[5.0, 0.0, 7.5], 0.1).unwrap();
        assert_eq!(p.b, vec![5.0, 0.1, 7.5]);
        assert_eq!(p.adjusted_rhs, 1);
    }

    #[test]
    fn test_negative_rhs_replaced() {
        let (x, y) = axes();
        let a = vec![vec![0.0; 3]];
        let p = project_domain(&zones(), &x, &y, &a, &[-3.0], 0.1).unwrap();
        assert_eq!(p.b, vec![0.1]);
    }

    #[test]
    fn test_axis_must_have_two_zones() {
        let (_, y) = axes();
        let x = vec![ZoneId::new("DE"), ZoneId::new("FR"), ZoneId::new("NL")];
        let err = project_domain(&zones(), &x, &y, &[], &[], 0.1).unwrap_err();
        assert!(matches!(err, FbmcError::InvalidDomainAxis(3)));

        let err = project_domain(&zones(), &[ZoneId::new("DE")], &y, &[], &[], 0.1).unwrap_err();
        assert!(matches!(err, FbmcError::InvalidDomainAxis(1)));
    }

    #[test]
    fn test_unknown_axis_zone() {
        let (x, _) = axes();
        let y = vec![ZoneId::new("DE"), ZoneId::new("AT")];
        let err = project_domain(&zones(), &x, &y, &[], &[], 0.1).unwrap_err();
        assert!(matches!(err, FbmcError::UnknownZone(_)));
    }
}

//! Spatial aggregation of per-cell spectral results into grid maps.
//!
//! Runs a periodicity extractor over every cell of a square ROI grid and
//! assembles dominant-period and power maps. Raster order is an explicit
//! property of the grid and is preserved in the maps; a mismatch would
//! silently mislocalize spectral results in space.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use super::extractors::PeriodicityExtractor;
use super::types::{AnalysisError, AnalysisResult};

/// Traversal order used to linearize a square grid of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RasterOrder {
    /// Rows are contiguous: index = row * par + col.
    RowMajor,
    /// Columns are contiguous: index = col * par + row.
    ColumnMajor,
}

impl RasterOrder {
    /// Flat index of a (row, col) cell in a `par` x `par` grid.
    pub fn index(self, row: usize, col: usize, par: usize) -> usize {
        match self {
            RasterOrder::RowMajor => row * par + col,
            RasterOrder::ColumnMajor => col * par + row,
        }
    }
}

/// A square grid of equal-length traces sharing one sampling interval.
#[derive(Debug, Clone)]
pub struct RoiGrid {
    traces: Vec<Vec<f64>>,
    dt: f64,
    par: usize,
    order: RasterOrder,
}

impl RoiGrid {
    /// Build a grid from `par * par` traces listed in the given raster order.
    ///
    /// All traces must share the same length (>= 3 samples).
    pub fn from_rows(
        traces: Vec<Vec<f64>>,
        dt: f64,
        par: usize,
        order: RasterOrder,
    ) -> AnalysisResult<Self> {
        if par < 1 {
            return Err(AnalysisError::InvalidInput(
                "Grid dimension must be >= 1".to_string(),
            ));
        }
        if traces.len() != par * par {
            return Err(AnalysisError::InvalidInput(format!(
                "Expected {} traces for a {}x{} grid, got {}",
                par * par,
                par,
                par,
                traces.len()
            )));
        }
        if !(dt > 0.0) {
            return Err(AnalysisError::InvalidInput(format!(
                "Sampling interval must be > 0, got {}",
                dt
            )));
        }
        let len = traces[0].len();
        if len < 3 {
            return Err(AnalysisError::InvalidInput(format!(
                "Cell traces of length {} are too short (need >= 3)",
                len
            )));
        }
        if traces.iter().any(|t| t.len() != len) {
            return Err(AnalysisError::InvalidInput(
                "All cell traces must share the same length".to_string(),
            ));
        }

        Ok(Self {
            traces,
            dt,
            par,
            order,
        })
    }

    /// Grid dimension (the grid is `par` x `par`).
    pub fn par(&self) -> usize {
        self.par
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.traces.len()
    }

    /// Check if the grid has no cells.
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }

    /// Shared sampling interval.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Raster order the traces were listed in.
    pub fn order(&self) -> RasterOrder {
        self.order
    }

    /// Trace of the cell at the given flat index.
    pub fn trace(&self, index: usize) -> &[f64] {
        &self.traces[index]
    }
}

/// A `par` x `par` map of per-cell values in a fixed raster order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialMap {
    /// Flat per-cell values; failed or absent cells hold NaN placeholders.
    pub values: Vec<f64>,
    /// Grid dimension.
    pub par: usize,
    /// Raster order of `values`.
    pub order: RasterOrder,
}

impl SpatialMap {
    /// Value at a (row, col) position.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[self.order.index(row, col, self.par)]
    }
}

/// Why a cell contributed no value to the maps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellOutcomeKind {
    /// The extractor found no qualifying peak.
    NoPeak,
    /// The extractor failed on this cell.
    Failed(String),
}

/// Record of a cell that produced no map value.
///
/// This list is the authoritative record of absent cells; the NaN left in
/// the map is only a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellOutcome {
    /// Flat cell index in the grid's raster order.
    pub index: usize,
    /// What happened.
    pub kind: CellOutcomeKind,
}

/// Period and power maps aggregated over a grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpatialMaps {
    /// Dominant period per cell.
    pub period: SpatialMap,
    /// Power at the dominant period per cell.
    pub power: SpatialMap,
    /// Period map with low-power cells zeroed; present only when a
    /// positive power threshold was given.
    pub filtered_period: Option<SpatialMap>,
    /// Cells that produced no value, with reasons.
    pub cell_outcomes: Vec<CellOutcome>,
}

/// Handle for cooperatively cancelling a grid aggregation.
///
/// Checked between cells; the aggregation stops at the next cell boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Create a fresh, non-cancelled handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Aggregate per-cell dominant periods and powers into spatial maps.
///
/// Every cell is analyzed independently with the supplied extractor; the
/// per-cell results land in preallocated flat arrays at the cell's own
/// index and are reshaped into maps carrying the grid's raster order.
/// A cell with no qualifying peak, or one failing with a numerical
/// degeneracy, is recorded in `cell_outcomes` and left as NaN in the
/// maps; the batch continues.
///
/// With `power_threshold > 0`, a filtered period map is also produced in
/// which cells whose power falls below the threshold are zeroed.
pub fn aggregate_spatial_maps(
    grid: &RoiGrid,
    extractor: &dyn PeriodicityExtractor,
    power_threshold: f64,
    cancel: Option<&CancelHandle>,
) -> AnalysisResult<SpatialMaps> {
    if !(power_threshold >= 0.0) {
        return Err(AnalysisError::InvalidInput(format!(
            "Power threshold must be >= 0, got {}",
            power_threshold
        )));
    }

    let started = Instant::now();
    let nroi = grid.len();
    let mut periods = vec![f64::NAN; nroi];
    let mut powers = vec![f64::NAN; nroi];
    let mut cell_outcomes = Vec::new();

    for i in 0..nroi {
        if let Some(handle) = cancel {
            if handle.is_cancelled() {
                tracing::info!("Aggregation cancelled at cell {}/{}", i, nroi);
                return Err(AnalysisError::Cancelled);
            }
        }

        match extractor.extract(grid.trace(i), grid.dt()) {
            Ok(Some(peak)) => {
                periods[i] = peak.period;
                powers[i] = peak.power;
            }
            Ok(None) => {
                tracing::debug!("Cell {}: no qualifying peak", i);
                cell_outcomes.push(CellOutcome {
                    index: i,
                    kind: CellOutcomeKind::NoPeak,
                });
            }
            Err(e) => {
                tracing::warn!("Cell {}: {}", i, e);
                cell_outcomes.push(CellOutcome {
                    index: i,
                    kind: CellOutcomeKind::Failed(e.to_string()),
                });
            }
        }
    }

    tracing::info!(
        "Aggregated {} cells with {} in {:.3}s",
        nroi,
        extractor.name(),
        started.elapsed().as_secs_f64()
    );

    let filtered_period = (power_threshold > 0.0).then(|| {
        let values = periods
            .iter()
            .zip(&powers)
            .map(|(&period, &power)| {
                if period.is_nan() {
                    f64::NAN
                } else if power < power_threshold {
                    0.0
                } else {
                    period
                }
            })
            .collect();
        SpatialMap {
            values,
            par: grid.par(),
            order: grid.order(),
        }
    });

    Ok(SpatialMaps {
        period: SpatialMap {
            values: periods,
            par: grid.par(),
            order: grid.order(),
        },
        power: SpatialMap {
            values: powers,
            par: grid.par(),
            order: grid.order(),
        },
        filtered_period,
        cell_outcomes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::extractors::FourierExtractor;
    use crate::analysis::types::DominantPeak;
    use std::f64::consts::PI;

    /// Test double keyed on the first two samples of each trace:
    /// period = trace[0], power = trace[1]. A zero period means "no
    /// peak"; a negative period simulates a degenerate cell.
    struct MarkerExtractor;

    impl PeriodicityExtractor for MarkerExtractor {
        fn name(&self) -> &str {
            "Marker"
        }

        fn description(&self) -> &str {
            "Reads the dominant peak off the first two samples"
        }

        fn extract(&self, trace: &[f64], _dt: f64) -> AnalysisResult<Option<DominantPeak>> {
            if trace[0] < 0.0 {
                return Err(AnalysisError::NumericalDegeneracy(
                    "marker cell".to_string(),
                ));
            }
            if trace[0] == 0.0 {
                return Ok(None);
            }
            Ok(Some(DominantPeak {
                period: trace[0],
                power: trace[1],
            }))
        }
    }

    fn marker_cell(period: f64, power: f64) -> Vec<f64> {
        vec![period, power, 0.0]
    }

    fn sinusoid(period: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * i as f64 / period).sin())
            .collect()
    }

    #[test]
    fn distinct_cell_lands_at_its_raster_position() {
        // Three cells at T=20, one at T=40, row-major; the odd one sits
        // at (row 1, col 0) = flat index 2.
        let traces = vec![
            sinusoid(20.0, 512),
            sinusoid(20.0, 512),
            sinusoid(40.0, 512),
            sinusoid(20.0, 512),
        ];
        let grid = RoiGrid::from_rows(traces, 1.0, 2, RasterOrder::RowMajor).unwrap();
        let extractor = FourierExtractor::new();

        let maps = aggregate_spatial_maps(&grid, &extractor, 0.0, None).unwrap();

        assert!(maps.cell_outcomes.is_empty());
        assert!(
            (maps.period.get(1, 0) - 40.0).abs() < 1.0,
            "Expected ~40 at (1,0), got {}",
            maps.period.get(1, 0)
        );
        for (row, col) in [(0, 0), (0, 1), (1, 1)] {
            let p = maps.period.get(row, col);
            assert!(
                (p - 20.0).abs() < 0.5,
                "Expected ~20 at ({},{}), got {}",
                row,
                col,
                p
            );
        }
    }

    #[test]
    fn degenerate_cell_does_not_abort_the_batch() {
        let traces = vec![
            sinusoid(20.0, 512),
            vec![0.0; 512], // flat cell, degenerate normalization
            sinusoid(20.0, 512),
            sinusoid(20.0, 512),
        ];
        let grid = RoiGrid::from_rows(traces, 1.0, 2, RasterOrder::RowMajor).unwrap();
        let extractor = FourierExtractor::new();

        let maps = aggregate_spatial_maps(&grid, &extractor, 0.0, None).unwrap();

        assert_eq!(maps.cell_outcomes.len(), 1);
        assert_eq!(maps.cell_outcomes[0].index, 1);
        assert!(matches!(
            maps.cell_outcomes[0].kind,
            CellOutcomeKind::Failed(_)
        ));
        assert!(maps.period.values[1].is_nan());
        for i in [0, 2, 3] {
            assert!(
                (maps.period.values[i] - 20.0).abs() < 0.5,
                "Cell {} should still be mapped, got {}",
                i,
                maps.period.values[i]
            );
        }
    }

    #[test]
    fn no_peak_cells_are_recorded_not_failed() {
        let traces = vec![
            marker_cell(20.0, 1.0),
            marker_cell(0.0, 0.0), // no peak
            marker_cell(25.0, 2.0),
            marker_cell(30.0, 3.0),
        ];
        let grid = RoiGrid::from_rows(traces, 1.0, 2, RasterOrder::RowMajor).unwrap();

        let maps = aggregate_spatial_maps(&grid, &MarkerExtractor, 0.0, None).unwrap();

        assert_eq!(
            maps.cell_outcomes,
            vec![CellOutcome {
                index: 1,
                kind: CellOutcomeKind::NoPeak,
            }]
        );
        assert!(maps.period.values[1].is_nan());
        assert_eq!(maps.period.values[0], 20.0);
        assert_eq!(maps.power.values[3], 3.0);
    }

    #[test]
    fn power_threshold_zeroes_weak_cells() {
        let traces = vec![
            marker_cell(20.0, 5.0),
            marker_cell(21.0, 0.1), // below threshold
            marker_cell(22.0, 5.0),
            marker_cell(0.0, 0.0), // no peak, stays NaN
        ];
        let grid = RoiGrid::from_rows(traces, 1.0, 2, RasterOrder::RowMajor).unwrap();

        let maps = aggregate_spatial_maps(&grid, &MarkerExtractor, 1.0, None).unwrap();
        let filtered = maps.filtered_period.expect("threshold > 0 produces a map");

        assert_eq!(filtered.values[0], 20.0);
        assert_eq!(filtered.values[1], 0.0);
        assert_eq!(filtered.values[2], 22.0);
        assert!(filtered.values[3].is_nan());
        // The unfiltered period map is untouched.
        assert_eq!(maps.period.values[1], 21.0);
    }

    #[test]
    fn zero_threshold_skips_filtered_map() {
        let traces = vec![marker_cell(20.0, 1.0); 4];
        let grid = RoiGrid::from_rows(traces, 1.0, 2, RasterOrder::RowMajor).unwrap();
        let maps = aggregate_spatial_maps(&grid, &MarkerExtractor, 0.0, None).unwrap();
        assert!(maps.filtered_period.is_none());
    }

    #[test]
    fn column_major_order_is_honored() {
        // Column-major listing: flat index 1 is (row 1, col 0).
        let traces = vec![
            marker_cell(10.0, 1.0),
            marker_cell(11.0, 1.0),
            marker_cell(12.0, 1.0),
            marker_cell(13.0, 1.0),
        ];
        let grid = RoiGrid::from_rows(traces, 1.0, 2, RasterOrder::ColumnMajor).unwrap();
        let maps = aggregate_spatial_maps(&grid, &MarkerExtractor, 0.0, None).unwrap();

        assert_eq!(maps.period.get(0, 0), 10.0);
        assert_eq!(maps.period.get(1, 0), 11.0);
        assert_eq!(maps.period.get(0, 1), 12.0);
        assert_eq!(maps.period.get(1, 1), 13.0);
    }

    #[test]
    fn cancelled_handle_stops_aggregation() {
        let traces = vec![marker_cell(20.0, 1.0); 4];
        let grid = RoiGrid::from_rows(traces, 1.0, 2, RasterOrder::RowMajor).unwrap();

        let handle = CancelHandle::new();
        handle.cancel();

        let err = aggregate_spatial_maps(&grid, &MarkerExtractor, 0.0, Some(&handle)).unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled));
    }

    #[test]
    fn fresh_handle_does_not_interfere() {
        let traces = vec![marker_cell(20.0, 1.0); 4];
        let grid = RoiGrid::from_rows(traces, 1.0, 2, RasterOrder::RowMajor).unwrap();

        let handle = CancelHandle::new();
        let maps = aggregate_spatial_maps(&grid, &MarkerExtractor, 0.0, Some(&handle)).unwrap();
        assert_eq!(maps.cell_outcomes.len(), 0);
    }

    #[test]
    fn grid_rejects_wrong_cell_count() {
        let traces = vec![marker_cell(20.0, 1.0); 3];
        assert!(RoiGrid::from_rows(traces, 1.0, 2, RasterOrder::RowMajor).is_err());
    }

    #[test]
    fn grid_rejects_unequal_lengths() {
        let traces = vec![
            vec![1.0; 10],
            vec![1.0; 10],
            vec![1.0; 9],
            vec![1.0; 10],
        ];
        assert!(RoiGrid::from_rows(traces, 1.0, 2, RasterOrder::RowMajor).is_err());
    }

    #[test]
    fn grid_rejects_bad_dt_and_threshold() {
        let traces = vec![marker_cell(20.0, 1.0); 4];
        assert!(RoiGrid::from_rows(traces.clone(), 0.0, 2, RasterOrder::RowMajor).is_err());

        let grid = RoiGrid::from_rows(traces, 1.0, 2, RasterOrder::RowMajor).unwrap();
        assert!(aggregate_spatial_maps(&grid, &MarkerExtractor, -1.0, None).is_err());
    }
}

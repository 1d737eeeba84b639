use std::time::Duration;

use log::info;

/// Timings for one synchronous detection call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DetectionTimings {
    pub white_cells: Duration,
    pub red_cells: Duration,
    pub total: Duration,
    pub cells_found: usize,
}

impl DetectionTimings {
    /// Detected cells per second of total processing time.
    pub fn cells_per_second(&self) -> f64 {
        let secs = self.total.as_secs_f64();
        if secs > 0.0 {
            self.cells_found as f64 / secs
        } else {
            0.0
        }
    }
}

fn millis(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Accumulates timings across detection calls.
#[derive(Debug, Clone, Default)]
pub struct ProcessingMetrics {
    white_cell_ms: Vec<f64>,
    red_cell_ms: Vec<f64>,
    total_ms: Vec<f64>,
    cells_per_second: Vec<f64>,
}

impl ProcessingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, timings: &DetectionTimings) {
        self.white_cell_ms.push(millis(timings.white_cells));
        self.red_cell_ms.push(millis(timings.red_cells));
        self.total_ms.push(millis(timings.total));
        self.cells_per_second.push(timings.cells_per_second());
    }

    pub fn len(&self) -> usize {
        self.total_ms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_ms.is_empty()
    }

    pub fn average_white_cell_ms(&self) -> f64 {
        average(&self.white_cell_ms)
    }

    pub fn average_red_cell_ms(&self) -> f64 {
        average(&self.red_cell_ms)
    }

    pub fn average_total_ms(&self) -> f64 {
        average(&self.total_ms)
    }

    pub fn average_cells_per_second(&self) -> f64 {
        average(&self.cells_per_second)
    }

    pub fn log_averages(&self) {
        info!(
            "Averages over {} runs: white {:.2} ms, red {:.2} ms, total {:.2} ms, {:.1} cells/s",
            self.len(),
            self.average_white_cell_ms(),
            self.average_red_cell_ms(),
            self.average_total_ms(),
            self.average_cells_per_second()
        );
    }

    pub fn reset(&mut self) {
        self.white_cell_ms.clear();
        self.red_cell_ms.clear();
        self.total_ms.clear();
        self.cells_per_second.clear();
    }
}

use clap::ValueEnum;

/// Coulomb-logarithm convention used by the `loge` calculation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum CoulombLog {
    /// NRL plasma formulary electron-ion expression.
    #[default]
    Nrl,
    /// TRANSP convention, which folds the effective charge into the
    /// logarithm.
    Transp,
}

/// Per-run pipeline configuration.
///
/// A run captures its settings by reference and never mutates them, so a
/// caller driving several runs in parallel hands each one its own snapshot
/// (see the scan runner).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Gate for the smoothing stage of the post-processing policy.
    pub apply_smoothing: bool,
    /// Radial point count of the driver input grid. The smoothing window
    /// is derived from it.
    pub input_points: usize,
    /// Gate for statistical outlier rejection.
    pub reject_outliers: bool,
    /// Convention for the `loge` formula.
    pub coulomb_log: CoulombLog,
}

impl PipelineSettings {
    /// Width of the centered moving-average smoothing window: odd, near
    /// `input_points / 20`, never below 3.
    pub fn smoothing_window(&self) -> usize {
        (self.input_points / 20).max(3) | 1
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            apply_smoothing: true,
            input_points: 51,
            reject_outliers: true,
            coulomb_log: CoulombLog::Nrl,
        }
    }
}

pub mod bar;
pub mod channel;
pub mod config;
pub mod consolidation;
pub mod constant;
pub mod engine;
pub mod fibonacci;
pub mod logging;
pub mod series;
pub mod utils;
pub mod zigzag;

pub use bar::{Bar, Fractal};
pub use channel::{BreachSide, ChannelArtifact, ChannelModel, fit_three_point, fit_three_point_with};
pub use config::{
    AnalysisConfig, AnalysisConfigPatch, ChannelConfig, ConsolidationConfig, FibonacciConfig,
    FractalConfig,
};
pub use consolidation::{ConsolidationMetrics, calculate_metrics, metrics_dataframe, render_table};
pub use constant::{Const, DataError, Direction, FractalType, Tier};
pub use engine::{AnalysisEngine, AnalysisSnapshot};
pub use fibonacci::{
    FibonacciLevel, FibonacciMove, FibonacciReport, ImpulseFilter, LatestSwing, LatestSwingOutcome,
    analyze_latest_swing, analyze_range, render_report, retracement_levels,
};
pub use logging::init_logging;
pub use series::{BarSeries, parse_datetime, validate_bars};
pub use zigzag::{
    TieredFractals, ZigzagDetector, detect_tier, detect_tiers, first_alternation_break,
    fractals_dataframe,
};

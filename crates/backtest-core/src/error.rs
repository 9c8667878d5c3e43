//! Error types for the backtesting engine.

use thiserror::Error;

/// Top-level engine error.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] StrategyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Input validation failures, raised before any bar is simulated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Bar sequence is empty")]
    EmptyBars,

    #[error("Timestamps not ascending: bar {index} has {current}, previous has {previous}")]
    NonMonotonicTimestamp {
        index: usize,
        previous: i64,
        current: i64,
    },

    #[error("Bar {index} contains a non-finite price or volume")]
    NonFiniteBar { index: usize },

    #[error("Period '{name}' must be greater than 0")]
    InvalidPeriod { name: &'static str },

    #[error("Fast period ({fast}) must be less than slow period ({slow})")]
    PeriodOrdering { fast: usize, slow: usize },

    #[error("Initial capital must be positive and finite, got {0}")]
    InvalidCapital(f64),

    #[error("Invalid cost configuration: {0}")]
    InvalidCost(String),

    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Data source errors.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("No data available for the requested range")]
    NoDataAvailable,

    #[error("Invalid timeframe: {0}")]
    InvalidTimeframe(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Data source error: {0}")]
    Internal(String),
}

/// Indicator calculation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Insufficient data: need {required} points, have {available}")]
    InsufficientData { required: usize, available: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Strategy lookup and parameter errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("Strategy not found: {0}")]
    NotFound(String),

    #[error("Invalid strategy parameters: {0}")]
    InvalidConfig(String),
}

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

use snafu::Snafu;

#[derive(Snafu, Debug, PartialEq)]
#[snafu(visibility(pub(crate)))]
pub enum SchedulerError {
    #[snafu(display("invalid scheduler configuration: {reason}"))]
    InvalidConfig { reason: String },
    InvalidDeckSize,
    #[snafu(display("quality {value} is outside 0..=5"))]
    InvalidQuality { value: i32 },
    InvalidProbabilities,
}

pub type Result<T, E = SchedulerError> = std::result::Result<T, E>;

/// Reasons the adaptive variant can refuse to schedule a card. The scheduler
/// answers any of these by falling back to the basic variant.
#[derive(Snafu, Debug, PartialEq)]
#[snafu(visibility(pub(crate)))]
pub enum AlgorithmError {
    #[snafu(display("{field} accuracy {value} is not a ratio in [0, 1]"))]
    InvalidAccuracy { field: String, value: f64 },
    #[snafu(display("preferred review time {hour:02}:{minute:02} does not exist"))]
    InvalidPreferredTime { hour: u32, minute: u32 },
    #[snafu(display("expected response time for {difficulty} must be positive"))]
    InvalidResponseTime { difficulty: String },
    #[snafu(display("computed interval is not a finite number"))]
    NonFiniteInterval,
    #[snafu(display("next review instant overflows the timestamp range"))]
    TimestampOverflow,
}

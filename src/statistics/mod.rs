pub mod channel_statistics;

pub use channel_statistics::{ChannelStatistics, StatisticClassifier, StatisticMetric};

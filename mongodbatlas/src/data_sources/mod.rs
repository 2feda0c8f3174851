//! Data source implementations

pub mod cluster;
pub mod stream_account_details;

pub use cluster::ClusterDataSource;
pub use stream_account_details::StreamAccountDetailsDataSource;

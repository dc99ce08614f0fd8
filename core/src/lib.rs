pub mod alloc;
pub mod batch;
pub mod bencher;
pub mod budget;
pub mod cask;
pub mod config;
pub mod disk;
pub mod driver;
pub mod keygen;
pub mod load;
pub mod metrics;
pub mod rss;
pub mod sampler;
pub mod store;
pub mod suite;
pub mod value;

pub use config::{BenchTime, BenchmarkConfig, Workload};
pub use metrics::BenchResult;
pub use store::{Backend, Store, StoreOptions, open_store};
pub use suite::run_workload;

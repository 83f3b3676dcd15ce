pub mod batch_sizer;
pub mod concurrency;

pub use batch_sizer::BatchSizer;
pub use concurrency::ConcurrencyManager;

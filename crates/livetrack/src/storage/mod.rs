pub mod memory_lock;
pub mod memory_tracker;

#[cfg(feature = "sql")]
pub mod sql_lock;

#[cfg(feature = "sql")]
pub mod sql_tracker;

#[cfg(feature = "etcd")]
pub mod etcd_lock;

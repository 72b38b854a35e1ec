//! Process-level setup shared by every node: tracing and the async runtime.

use std::fmt::Display;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use tokio::runtime::Builder;
use tokio::runtime::Runtime as TokioRuntime;

use crate::error::Exception;
use crate::error::ExceptionClass;
use crate::error::ExceptionGroup;
use crate::node::NodeConfig;

/// Installs the global tracing subscriber described by `config`.
///
/// Fails if a subscriber is already installed.
#[cfg(feature = "tracing")]
pub fn init_tracing_subscriber(config: &NodeConfig) -> Result<(), Exception> {
  use tracing_subscriber::FmtSubscriber;
  use tracing_subscriber::fmt::format;
  use tracing_subscriber::util::SubscriberInitExt;

  FmtSubscriber::builder()
    .event_format(format().compact())
    .log_internal_errors(true)
    .with_ansi(true)
    .with_file(config.tracing_source_file)
    .with_level(true)
    .with_line_number(config.tracing_source_line)
    .with_max_level(config.tracing_filter())
    .with_target(config.tracing_source_name)
    .with_thread_ids(config.tracing_thread_info)
    .with_thread_names(config.tracing_thread_info)
    .finish()
    .try_init()
    .map_err(error)
}

/// Installs the global tracing subscriber described by `config`.
///
/// Without the `tracing` feature no subscriber is available; this does
/// nothing.
#[cfg(not(feature = "tracing"))]
pub fn init_tracing_subscriber(_config: &NodeConfig) -> Result<(), Exception> {
  Ok(())
}

/// Builds the multi-threaded tokio runtime that runs RPC work.
pub(crate) fn build_tokio_runtime(config: &NodeConfig) -> Result<TokioRuntime, Exception> {
  Builder::new_multi_thread()
    .enable_time()
    .max_blocking_threads(config.rt_max_blocking_threads.max(1))
    .thread_keep_alive(config.rt_thread_keep_alive)
    .thread_name_fn(next_worker_name)
    .thread_stack_size(config.rt_thread_stack_size)
    .worker_threads(config.rt_worker_threads.max(1))
    .build()
    .map_err(error)
}

/// Generates a unique name for the next worker thread.
#[inline]
fn next_worker_name() -> String {
  format!("ernode-worker-{:0>2}", next_worker_id())
}

/// Atomically increments and returns the next worker thread ID.
#[inline]
fn next_worker_id() -> u32 {
  static ID: AtomicU32 = AtomicU32::new(1);
  ID.fetch_add(1, Ordering::Relaxed)
}

/// Returns a generic `SysInv` exception with the given error message.
#[cold]
fn error<E>(error: E) -> Exception
where
  E: Display,
{
  Exception::new(ExceptionClass::Error, ExceptionGroup::SysInv, error)
}

#[cfg(test)]
mod tests {
  use tokio::runtime::Runtime as TokioRuntime;

  use crate::init::build_tokio_runtime;
  use crate::node::NodeConfig;

  #[test]
  fn test_build_runtime() {
    let config: NodeConfig = NodeConfig::new().worker_threads(1);
    let runtime: TokioRuntime = build_tokio_runtime(&config).unwrap();

    assert_eq!(runtime.block_on(async { 1 + 1 }), 2);
  }
}

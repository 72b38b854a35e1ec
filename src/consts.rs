use std::time::Duration;

// -----------------------------------------------------------------------------
// System - Types
// -----------------------------------------------------------------------------

/// Maximum number of characters in an [`Atom`].
///
/// [`Atom`]: crate::core::Atom
pub const MAX_ATOM_CHARS: usize = 255;

/// Default maximum number of [`Atom`]s in the atom table.
///
/// [`Atom`]: crate::core::Atom
pub const MAX_ATOM_COUNT: usize = 1 << 20;

/// Bit width of the `number` field of a [`Pid`].
///
/// [`Pid`]: crate::core::Pid
pub const PID_NUMBER_BITS: u32 = 15;

/// Bit width of the `serial` field of a [`Pid`].
///
/// [`Pid`]: crate::core::Pid
pub const PID_SERIAL_BITS: u32 = 13;

// -----------------------------------------------------------------------------
// System - Well-Known Names
// -----------------------------------------------------------------------------

/// Registered name of the RPC server mailbox.
pub const RPC_SERVER_NAME: &str = "rex";

/// Registered name of the I/O server mailbox.
pub const IO_SERVER_NAME: &str = "user";

/// Node name used when none is configured.
pub const DEFAULT_NODE_NAME: &str = "nonode@nohost";

// -----------------------------------------------------------------------------
// System - Mailbox Behavior
// -----------------------------------------------------------------------------

/// Longest single wait performed by a blocking dequeue.
///
/// Infinite waits are split into slices of this length so the node liveness
/// flag is observed between them.
pub const QUEUE_WAIT_SLICE: Duration = Duration::from_secs(5);

/// How long a closed mailbox must sit on the free list before reuse.
pub const MAILBOX_REUSE_AFTER: Duration = Duration::from_secs(60);

/// Receive timeout used by the protocol server loops.
pub const SERVER_RECV_TIMEOUT: Duration = Duration::from_millis(1500);

// Number of pre-allocated slots in a mailbox queue.
pub const CAP_MAILBOX_QUEUE: usize = 8;

// Number of pre-allocated entries in the mailbox indices.
pub const CAP_REGISTERED_MAILBOXES: usize = 64;

// -----------------------------------------------------------------------------
// System - Networking
// -----------------------------------------------------------------------------

/// Port requested when none is configured (ephemeral).
pub const DEFAULT_LISTEN_PORT: u16 = 0;

/// Backlog passed to `listen(2)` for the acceptor socket.
pub const LISTEN_BACKLOG: i32 = 128;

/// Timeout of the local connect used to wake a blocked acceptor.
pub const ACCEPTOR_WAKE_TIMEOUT: Duration = Duration::from_millis(250);

// -----------------------------------------------------------------------------
// System - Scheduler Behavior
// -----------------------------------------------------------------------------

/// Default amount of parallelism the tokio runtime should use.
///
/// Note: This value is only used when a default value is not
///       retrievable from the host environment.
pub const DEFAULT_PARALLELISM: usize = 1;

/// Limit for additional threads spawned by the tokio runtime.
pub const DEFAULT_MAX_BLOCKING_THREADS: usize = 512;

/// How long to keep threads in the blocking pool alive.
pub const DEFAULT_THREAD_KEEP_ALIVE: Duration = Duration::from_millis(10 * 1000);

/// Stack size (in bytes) for worker threads.
pub const DEFAULT_THREAD_STACK_SIZE: usize = 2 * 1024 * 1024;

// -----------------------------------------------------------------------------
// System - Shutdown
// -----------------------------------------------------------------------------

/// How long to wait for in-flight RPC work when the node closes.
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

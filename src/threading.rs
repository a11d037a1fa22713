use std::env;
use std::sync::OnceLock;

/// A wrapper around the Rayon thread pool used for graph inference.
pub struct ThreadPool {
    /// The wrapped thread pool, or None if we failed to construct one.
    pool: Option<rayon::ThreadPool>,
}

impl ThreadPool {
    /// Run a function in the thread pool.
    ///
    /// This corresponds to [`rayon::ThreadPool::install`], except that if
    /// the pool could not be created, `op` runs directly on the current
    /// thread.
    pub fn run<R: Send, Op: FnOnce() -> R + Send>(&self, op: Op) -> R {
        if let Some(pool) = self.pool.as_ref() {
            pool.install(op)
        } else {
            op()
        }
    }

    /// Create a thread pool with a given number of threads.
    pub fn with_num_threads(num_threads: usize) -> ThreadPool {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|index| format!("nmdefs-{}", index))
            .build();

        if let Err(err) = &pool {
            log::warn!("Failed to create thread pool: {}", err);
        }

        ThreadPool { pool: pool.ok() }
    }

    /// Return the number of threads in the pool.
    pub fn num_threads(&self) -> usize {
        self.pool
            .as_ref()
            .map(|pool| pool.current_num_threads())
            .unwrap_or(1)
    }
}

/// Parse a requested thread count, clamping it to between 1 and `max`.
fn parse_num_threads(value: &str, max: usize) -> Option<usize> {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .map(|n| n.clamp(1, max.max(1)))
}

/// Return the thread pool used to infer independent nodes of a graph
/// concurrently.
///
/// The pool uses one thread per physical core. This can be overridden at the
/// process level by setting the `NMDEFS_NUM_THREADS` environment variable,
/// whose value must be a number between 1 and the logical core count.
pub fn thread_pool() -> &'static ThreadPool {
    static THREAD_POOL: OnceLock<ThreadPool> = OnceLock::new();
    THREAD_POOL.get_or_init(|| {
        let physical_cpus = num_cpus::get_physical().max(1);

        let num_threads = match env::var("NMDEFS_NUM_THREADS") {
            Ok(value) => parse_num_threads(&value, num_cpus::get()).unwrap_or_else(|| {
                log::warn!("Invalid NMDEFS_NUM_THREADS value \"{}\"", value);
                physical_cpus
            }),
            Err(_) => physical_cpus,
        };
        log::debug!("Creating inference thread pool with {} threads", num_threads);

        ThreadPool::with_num_threads(num_threads)
    })
}

mod semaphore;

pub use semaphore::*;

/// `pshared` argument for `sem_init`: every semaphore here may be shared
/// between processes.
const INTER_PROCESS: libc::c_int = 1;

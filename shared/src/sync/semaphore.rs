use std::{cell::UnsafeCell, io, mem::MaybeUninit};

use libc::{c_int, sem_destroy, sem_getvalue, sem_init, sem_post, sem_t, sem_wait};

use crate::shm::ShmSafe;

use super::INTER_PROCESS;

/// A counting POSIX semaphore that may live in shared memory.
#[repr(C)]
#[derive(Debug)]
pub struct Semaphore {
    inner: UnsafeCell<MaybeUninit<sem_t>>,
}

impl Semaphore {
    /// Initializes a semaphore in place, so the `sem_t` is never moved after
    /// `sem_init`.
    ///
    /// # Safety
    /// `target` must be valid for writes and not yet hold a live semaphore.
    pub unsafe fn init_at(target: *mut Self, value: u32) -> io::Result<()> {
        let sem: *mut sem_t = target.cast();
        if unsafe { sem_init(sem, INTER_PROCESS, value) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Blocking decrement. Retried when a signal interrupts the wait.
    pub fn wait(&self) -> io::Result<()> {
        loop {
            if unsafe { sem_wait(self.as_ptr()) } == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(err);
            }
        }
    }

    pub fn post(&self) -> io::Result<()> {
        if unsafe { sem_post(self.as_ptr()) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Currently available permits.
    pub fn value(&self) -> io::Result<c_int> {
        let mut i: c_int = 0;
        if unsafe { sem_getvalue(self.as_ptr(), &raw mut i) } != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(i)
    }

    fn as_ptr(&self) -> *mut sem_t {
        unsafe { (*self.inner.get()).as_mut_ptr() }
    }
}

unsafe impl Send for Semaphore {}
unsafe impl Sync for Semaphore {}

impl Drop for Semaphore {
    fn drop(&mut self) {
        if unsafe { sem_destroy(self.as_ptr()) } != 0 {
            log::warn!(
                "failed to destroy semaphore: {}",
                io::Error::last_os_error()
            );
        }
    }
}

unsafe impl ShmSafe for Semaphore {}

use std::{
    mem::{ManuallyDrop, MaybeUninit},
    os::fd::OwnedFd,
    ptr::{drop_in_place, null_mut},
};

use anyhow::{bail, Context};
use rustix::{
    fs::{ftruncate, Mode},
    mm::{mmap, mmap_anonymous, munmap, MapFlags, ProtFlags},
    shm::{self, OFlags},
};

use crate::MAGIC_VALUE;

/// Marker for types that may be placed in memory shared between processes.
///
/// # Safety
/// The type must not contain pointers into a single address space and must
/// stay valid when the same bytes are observed from several processes.
pub unsafe trait ShmSafe {}

/// A `MAP_SHARED` mapping holding one `T`.
///
/// The creating handle owns the contents: dropping it drops `T` in place and
/// unlinks the named object. Joining handles only unmap.
pub struct SharedMemory<T> {
    is_initiator: bool,
    descriptor: Option<String>,
    memory: *mut SharedMemoryContents<T>,
}

impl<T: ShmSafe> SharedMemory<T> {
    pub fn create(
        descriptor: impl Into<String>,
        init: impl FnOnce(&mut MaybeUninit<T>) -> anyhow::Result<()>,
    ) -> anyhow::Result<Self> {
        let descriptor = descriptor.into();

        let _ = shm::unlink(&descriptor);

        let fd = shm::open(
            &descriptor,
            OFlags::CREATE | OFlags::EXCL | OFlags::RDWR,
            Mode::RUSR | Mode::WUSR,
        )
        .with_context(|| format!("Creating shared memory {descriptor} failed"))?;

        ftruncate(&fd, size_of::<SharedMemoryContents<T>>() as u64)?;
        let ptr = match unsafe { Self::mmap(fd) } {
            Ok(ptr) => ptr,
            Err(e) => {
                let _ = shm::unlink(&descriptor);
                return Err(e);
            }
        };

        let mut mem = Self {
            descriptor: Some(descriptor.clone()),
            memory: ptr,
            is_initiator: false,
        };
        if let Err(e) = unsafe { mem.initialize(init) } {
            let _ = shm::unlink(&descriptor);
            return Err(e);
        }
        Ok(mem)
    }

    /// Maps an unnamed shared region. Only visible to threads of this
    /// process and to children forked after the call.
    pub fn anonymous(
        init: impl FnOnce(&mut MaybeUninit<T>) -> anyhow::Result<()>,
    ) -> anyhow::Result<Self> {
        let ptr = unsafe {
            // Safety: Ptr is null
            mmap_anonymous(
                null_mut(),
                size_of::<SharedMemoryContents<T>>(),
                ProtFlags::READ | ProtFlags::WRITE,
                MapFlags::SHARED,
            )
            .context("Mapping anonymous shared memory failed")?
        };

        let mut mem = Self {
            descriptor: None,
            memory: ptr.cast(),
            is_initiator: false,
        };
        unsafe { mem.initialize(init)? };
        Ok(mem)
    }

    /// # Safety
    /// The region behind `descriptor` must have been created by
    /// [`SharedMemory::create`] with the same `T`.
    pub unsafe fn join(descriptor: impl Into<String>) -> anyhow::Result<Self> {
        let descriptor = descriptor.into();
        let fd = shm::open(&descriptor, OFlags::RDWR, Mode::RUSR | Mode::WUSR)
            .with_context(|| format!("Opening shared memory {descriptor} failed"))?;

        let ptr = unsafe { Self::mmap(fd)? };

        let mem = Self {
            descriptor: Some(descriptor),
            memory: ptr,
            is_initiator: false,
        };

        unsafe {
            let magic = &raw mut (*ptr).magic;

            if *magic != MAGIC_VALUE {
                bail!("Memory not ready yet");
            }
        }

        Ok(mem)
    }

    pub fn get(&self) -> &T {
        unsafe { (*self.memory).contents.assume_init_ref() }
    }

    /// Unmaps the region, reporting failures instead of swallowing them.
    pub fn detach(self) -> anyhow::Result<()> {
        let mut this = ManuallyDrop::new(self);
        let descriptor = this.descriptor.take();
        let res = unsafe { this.teardown(descriptor.as_deref()) };
        res.context("Unmapping shared memory failed")
    }

    unsafe fn initialize(
        &mut self,
        init: impl FnOnce(&mut MaybeUninit<T>) -> anyhow::Result<()>,
    ) -> anyhow::Result<()> {
        let ptr = self.memory;
        unsafe {
            let magic = &raw mut (*ptr).magic;
            let contents = &raw mut (*ptr).contents;
            *contents = MaybeUninit::uninit();

            // Not the initiator until init succeeded, so a failed init is never dropped.
            init(&mut *contents)?;

            *magic = MAGIC_VALUE;
        }
        self.is_initiator = true;
        Ok(())
    }

    unsafe fn mmap(fd: OwnedFd) -> anyhow::Result<*mut SharedMemoryContents<T>> {
        // Safety: Ptr is null
        Ok(mmap(
            null_mut(),
            size_of::<SharedMemoryContents<T>>(),
            ProtFlags::READ | ProtFlags::WRITE,
            MapFlags::SHARED,
            &fd,
            0,
        )?
        .cast())
    }
}

impl<T> SharedMemory<T> {
    unsafe fn teardown(&mut self, descriptor: Option<&str>) -> rustix::io::Result<()> {
        if self.is_initiator {
            unsafe { drop_in_place((*self.memory).contents.as_mut_ptr()) };
            if let Some(descriptor) = descriptor {
                let _ = shm::unlink(descriptor);
            }
        }
        unsafe { munmap(self.memory.cast(), size_of::<SharedMemoryContents<T>>()) }
    }
}

impl<T> Drop for SharedMemory<T> {
    fn drop(&mut self) {
        let descriptor = self.descriptor.take();
        unsafe {
            let _ = self.teardown(descriptor.as_deref());
        }
    }
}

unsafe impl<T: Send> Send for SharedMemory<T> {}
unsafe impl<T: Sync> Sync for SharedMemory<T> {}

#[repr(C)]
pub struct SharedMemoryContents<T> {
    magic: u32,
    contents: MaybeUninit<T>,
}

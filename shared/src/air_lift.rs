use std::{cell::UnsafeCell, fmt, io, mem::MaybeUninit};

use crate::{
    error::{SemOp, SyncError},
    shm::{SharedMemory, ShmSafe},
    shm_name,
    state::{FullState, Params},
    sync::Semaphore,
};

/// The rendezvous semaphores. `mutex` is deliberately not part of this set:
/// it is only reachable through [`AirLift::with_state`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Pilot → Hostess: boarding may start.
    ReadyForBoarding,
    /// Hostess → Pilot: boarding complete.
    ReadyToFlight,
    /// Pilot → first passenger, then passenger → passenger: leave the plane.
    PassengersWaitInFlight,
    /// Last passenger → Pilot: everybody left.
    PlaneEmpty,
    /// Passenger → Hostess: one more passenger in the queue.
    PassengersInQueue,
    /// Hostess → one queued passenger: show your documents.
    PassengersWaitInQueue,
    /// Passenger → Hostess: id recorded in the shared state.
    IdShown,
}

impl Signal {
    pub const COUNT: usize = 7;

    pub const ALL: [Signal; Self::COUNT] = [
        Signal::ReadyForBoarding,
        Signal::ReadyToFlight,
        Signal::PassengersWaitInFlight,
        Signal::PlaneEmpty,
        Signal::PassengersInQueue,
        Signal::PassengersWaitInQueue,
        Signal::IdShown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Signal::ReadyForBoarding => "readyForBoarding",
            Signal::ReadyToFlight => "readyToFlight",
            Signal::PassengersWaitInFlight => "passengersWaitInFlight",
            Signal::PlaneEmpty => "planeEmpty",
            Signal::PassengersInQueue => "passengersInQueue",
            Signal::PassengersWaitInQueue => "passengersWaitInQueue",
            Signal::IdShown => "idShown",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const MUTEX: &str = "mutex";

/// Contents of the shared region: parameters, semaphore set and the flight
/// state.
#[repr(C)]
pub struct AirLift {
    params: Params,
    mutex: Semaphore,
    signals: [Semaphore; Signal::COUNT],
    state: UnsafeCell<FullState>,
}

unsafe impl Sync for AirLift {}
unsafe impl Send for AirLift {}
unsafe impl ShmSafe for AirLift {}

impl AirLift {
    /// Writes parameters and initial state and sets up every semaphore in
    /// place: `mutex` at 1, the signals at 0.
    pub fn init(target: &mut MaybeUninit<Self>, params: Params) -> io::Result<()> {
        let ptr = target.as_mut_ptr();
        unsafe {
            (&raw mut (*ptr).params).write(params);
            (&raw mut (*ptr).state).write(UnsafeCell::new(FullState::new(params.passengers)));
            Semaphore::init_at(&raw mut (*ptr).mutex, 1)?;
            let signals: *mut Semaphore = (&raw mut (*ptr).signals).cast();
            for index in 0..Signal::COUNT {
                Semaphore::init_at(signals.add(index), 0)?;
            }
        }
        Ok(())
    }

    /// Creates the named region for `key`, replacing any stale one.
    pub fn create(key: u32, params: Params) -> anyhow::Result<SharedMemory<Self>> {
        SharedMemory::create(shm_name(key), |mem| Ok(Self::init(mem, params)?))
    }

    /// Creates an unnamed region, shared by the threads of this process.
    pub fn anonymous(params: Params) -> anyhow::Result<SharedMemory<Self>> {
        SharedMemory::anonymous(|mem| Ok(Self::init(mem, params)?))
    }

    /// Attaches to the region the simulator created for `key`.
    pub fn join(key: u32) -> anyhow::Result<SharedMemory<Self>> {
        // Safety: regions named by `shm_name` are only ever created by `AirLift::create`
        unsafe { SharedMemory::join(shm_name(key)) }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn acquire(&self, signal: Signal) -> Result<(), SyncError> {
        self.signal(signal).wait().map_err(|source| SyncError {
            op: SemOp::Acquire,
            sem: signal.name(),
            source,
        })
    }

    pub fn release(&self, signal: Signal) -> Result<(), SyncError> {
        self.signal(signal).post().map_err(|source| SyncError {
            op: SemOp::Release,
            sem: signal.name(),
            source,
        })
    }

    /// Runs `f` inside the critical section of `mutex`.
    ///
    /// `f` must not acquire any semaphore: the lock is held for its whole
    /// run, so blocking inside it stalls every other actor. The actors only
    /// read and write the state in here.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut FullState) -> R) -> Result<R, SyncError> {
        self.mutex.wait().map_err(|source| SyncError {
            op: SemOp::Acquire,
            sem: MUTEX,
            source,
        })?;

        // Safety: `mutex` is held, so this is the only reference into the state
        let result = f(unsafe { &mut *self.state.get() });

        self.mutex.post().map_err(|source| SyncError {
            op: SemOp::Release,
            sem: MUTEX,
            source,
        })?;
        Ok(result)
    }

    pub fn snapshot(&self) -> Result<FullState, SyncError> {
        self.with_state(|st| *st)
    }

    /// Permits currently held by `signal`.
    pub fn permits(&self, signal: Signal) -> io::Result<i32> {
        self.signal(signal).value()
    }

    fn signal(&self, signal: Signal) -> &Semaphore {
        &self.signals[signal as usize]
    }
}

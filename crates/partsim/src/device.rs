//! Asynchronous device worker.
//!
//! The device owns its own copy of every buffer and runs the solver on a
//! dedicated thread. Uploads, parameter changes and ticks are queued and
//! return immediately; [`Device::download`] queues a readback and blocks until
//! every command queued before it has run, which makes it the one
//! synchronization point between host and device.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use crate::buffers::{ParticleBuffers, SpringBuffers, TriangleBuffers, TriangleMeshBuffers};
use crate::error::EngineError;
use crate::params::SolverParams;
use crate::solver::{self, DeviceState};

pub(crate) enum Command {
    UploadParticles {
        particles: ParticleBuffers,
        active: Vec<u32>,
    },
    UploadSprings(SpringBuffers),
    UploadTriangles {
        triangles: TriangleBuffers,
        normals: bool,
    },
    UploadParams(SolverParams),
    BindCollision(Vec<Arc<TriangleMeshBuffers>>),
    Tick {
        dt: f32,
        substeps: u32,
    },
    Download(mpsc::Sender<ParticleBuffers>),
    Shutdown,
}

/// Transfer counters, host side.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub commands: u64,
    pub bytes_uploaded: u64,
    pub downloads: u64,
}

/// Handle to the device worker thread.
pub struct Device {
    tx: Option<mpsc::Sender<Command>>,
    worker: Option<thread::JoinHandle<()>>,
    lost: bool,
    stats: DeviceStats,
}

impl Device {
    /// Start a worker whose buffers address `capacity` particle slots.
    pub fn spawn(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel::<Command>();
        let spawned = thread::Builder::new()
            .name("partsim-device".into())
            .spawn(move || run(rx, capacity));

        match spawned {
            Ok(worker) => Self {
                tx: Some(tx),
                worker: Some(worker),
                lost: false,
                stats: DeviceStats::default(),
            },
            Err(e) => {
                log::error!("Failed to start device worker: {}", e);
                Self::lost()
            }
        }
    }

    /// A handle with no worker behind it.
    pub fn lost() -> Self {
        Self {
            tx: None,
            worker: None,
            lost: true,
            stats: DeviceStats::default(),
        }
    }

    /// Whether the worker has gone away.
    pub fn is_lost(&self) -> bool {
        self.lost
    }

    pub fn stats(&self) -> DeviceStats {
        self.stats
    }

    pub(crate) fn submit(&mut self, command: Command) -> Result<(), EngineError> {
        let bytes = match &command {
            Command::UploadParticles { particles, active } => {
                particles.byte_len() + std::mem::size_of_val(active.as_slice())
            }
            Command::UploadSprings(springs) => {
                std::mem::size_of_val(springs.ids_flat())
                    + std::mem::size_of_val(springs.rest_lengths.as_slice())
                    + std::mem::size_of_val(springs.stiffness.as_slice())
            }
            Command::UploadTriangles { triangles, .. } => {
                std::mem::size_of_val(triangles.ids_flat())
                    + std::mem::size_of_val(triangles.normals.as_slice())
            }
            _ => 0,
        };

        let Some(tx) = self.tx.as_ref().filter(|_| !self.lost) else {
            return Err(EngineError::DeviceLost);
        };
        if tx.send(command).is_err() {
            log::error!("Device command channel disconnected - device lost");
            self.lost = true;
            return Err(EngineError::DeviceLost);
        }
        self.stats.commands += 1;
        self.stats.bytes_uploaded += bytes as u64;
        Ok(())
    }

    /// Queue a readback of the particle buffers and wait for it.
    pub(crate) fn download(&mut self) -> Result<ParticleBuffers, EngineError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.submit(Command::Download(reply_tx))?;
        match reply_rx.recv() {
            Ok(particles) => {
                self.stats.downloads += 1;
                Ok(particles)
            }
            Err(_) => {
                log::error!("Device readback channel disconnected - device lost");
                self.lost = true;
                Err(EngineError::DeviceLost)
            }
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Command::Shutdown);
        }
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Device worker panicked");
            }
        }
    }
}

fn run(rx: mpsc::Receiver<Command>, capacity: usize) {
    let mut state = DeviceState {
        particles: ParticleBuffers::with_capacity(capacity),
        ..Default::default()
    };

    for command in rx {
        match command {
            Command::UploadParticles { particles, active } => {
                state.particles = particles;
                state.active = active;
            }
            Command::UploadSprings(springs) => state.springs = springs,
            Command::UploadTriangles { triangles, normals } => {
                state.triangles = triangles;
                state.triangle_normals = normals;
            }
            Command::UploadParams(params) => state.params = params,
            Command::BindCollision(meshes) => state.meshes = meshes,
            Command::Tick { dt, substeps } => solver::step(&mut state, dt, substeps),
            Command::Download(reply) => {
                // The requester may have given up; nothing to do then.
                let _ = reply.send(state.particles.clone());
            }
            Command::Shutdown => break,
        }
    }
}

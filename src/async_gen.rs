//! Background generation of the procedural grass tile.
//!
//! The tile is rendered on a small private [`rayon`] pool so the first frames
//! are not stalled by noise evaluation. [`poll_tile_task`] checks the channel
//! once per frame, uploads the finished image, and rebinds the terrain if it
//! is currently in texture mode.

use std::sync::{
    Arc, Mutex, OnceLock,
    atomic::{AtomicBool, Ordering},
    mpsc,
};

use bevy::prelude::*;

use crate::{
    binder::Binder,
    controller::ShadingContext,
    tile::{GrassTileConfig, TileError, TilePixels},
};

/// At most this many tiles are generated at once.
const MAX_TILE_THREADS: usize = 2;

fn tile_pool() -> &'static rayon::ThreadPool {
    static POOL: OnceLock<rayon::ThreadPool> = OnceLock::new();
    POOL.get_or_init(|| {
        rayon::ThreadPoolBuilder::new()
            .num_threads(MAX_TILE_THREADS)
            .thread_name(|i| format!("grass-tile-{i}"))
            .build()
            .expect("failed to build grass tile thread pool")
    })
}

/// Tile image handle used by texture mode, once it exists.
#[derive(Resource, Default, Debug)]
pub struct GrassTile {
    pub handle: Option<Handle<Image>>,
}

/// An in-flight tile generation. Despawning the entity cancels the task if it
/// has not started yet.
#[derive(Component)]
pub struct PendingTile {
    // Mutex makes the receiver Sync, which Component requires.
    rx: Mutex<mpsc::Receiver<Result<Image, TileError>>>,
    cancelled: Arc<AtomicBool>,
}

impl Drop for PendingTile {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

impl PendingTile {
    pub fn spawn(config: GrassTileConfig) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let (tx, rx) = mpsc::sync_channel(1);
        tile_pool().spawn(move || {
            if !flag.load(Ordering::Relaxed) {
                tx.send(config.generate().map(TilePixels::into_image)).ok();
            }
        });
        Self {
            rx: Mutex::new(rx),
            cancelled,
        }
    }

    /// Non-blocking check. `None` while the tile is still being generated.
    fn poll(&self) -> Option<Result<Image, String>> {
        let rx = match self.rx.lock() {
            Ok(rx) => rx,
            Err(_) => return Some(Err("tile receiver poisoned".into())),
        };
        match rx.try_recv() {
            Ok(result) => Some(result.map_err(|e| e.to_string())),
            Err(mpsc::TryRecvError::Empty) => None,
            Err(mpsc::TryRecvError::Disconnected) => {
                Some(Err("tile worker exited without a result".into()))
            }
        }
    }
}

/// Bevy system: upload a finished tile and refresh texture mode.
pub fn poll_tile_task(
    mut commands: Commands,
    tasks: Query<(Entity, &PendingTile)>,
    mut images: ResMut<Assets<Image>>,
    mut tile: ResMut<GrassTile>,
    context: Res<ShadingContext>,
    mut binder: Binder,
) {
    for (entity, pending) in &tasks {
        let Some(result) = pending.poll() else {
            continue;
        };
        commands.entity(entity).despawn();
        match result {
            Ok(image) => {
                tile.handle = Some(images.add(image));
                info!("procedural grass tile ready");
                if let Some(mode) = context.tile_ready() {
                    binder.apply(mode, &context, tile.handle.as_ref());
                }
            }
            Err(e) => error!("grass tile generation failed: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;

    fn wait(pending: &PendingTile) -> Result<Image, String> {
        let deadline = Instant::now() + Duration::from_secs(30);
        loop {
            if let Some(result) = pending.poll() {
                return result;
            }
            assert!(Instant::now() < deadline, "tile generation timed out");
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn generates_tile_in_background() {
        let pending = PendingTile::spawn(GrassTileConfig {
            size: 16,
            ..Default::default()
        });
        let image = wait(&pending).unwrap();
        assert_eq!(image.texture_descriptor.size.width, 16);
    }

    #[test]
    fn reports_invalid_config() {
        let pending = PendingTile::spawn(GrassTileConfig {
            size: 0,
            ..Default::default()
        });
        assert!(wait(&pending).is_err());
    }
}

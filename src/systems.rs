//! Bevy systems connecting the scene loader, the window and the control
//! surface to the shading core.

use std::time::Duration;

use bevy::{
    asset::LoadState,
    image::ImageLoaderSettings,
    prelude::*,
    scene::SceneInstanceReady,
    window::PrimaryWindow,
};

use crate::{
    async_gen::{GrassTile, PendingTile},
    binder::Binder,
    config::{ShadingConfig, TileSource},
    controller::{SceneState, ShadingContext},
    error::ShadingError,
    params::{ColorParam, NumericParam},
    persist,
    resolver::{BevySceneGraph, LoadPhase, resolve},
    tile::repeat_sampler,
};

/// A request from the control surface. Requests are handled one at a time,
/// in the order they were written, each causing at most one rebind.
#[derive(Message, Clone, Debug, PartialEq)]
pub enum ShadingRequest {
    ToggleTexture(bool),
    /// 1-based pattern index.
    SelectPattern(u8),
    SetNumber(NumericParam, f32),
    SetColor(ColorParam, [f32; 3]),
}

/// The spawned terrain scene.
#[derive(Resource, Debug)]
pub struct TerrainScene {
    pub path: String,
    pub handle: Handle<Scene>,
    pub root: Entity,
}

/// Startup: request the glTF scene and spawn it under a root entity.
pub fn spawn_terrain_scene(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    config: Res<ShadingConfig>,
) {
    let path = config.scene_path.clone();
    let handle = asset_server.load(GltfAssetLabel::Scene(0).from_asset(path.clone()));
    let root = commands
        .spawn((SceneRoot(handle.clone()), Transform::default()))
        .observe(on_scene_ready)
        .id();
    info!("loading terrain scene '{path}'");
    commands.insert_resource(TerrainScene { path, handle, root });
}

/// Startup: load or start generating the grass tile.
pub fn start_grass_tile(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    config: Res<ShadingConfig>,
    mut tile: ResMut<GrassTile>,
) {
    match &config.tile {
        TileSource::File(path) => {
            tile.handle = Some(asset_server.load_with_settings(
                path.clone(),
                |settings: &mut ImageLoaderSettings| settings.sampler = repeat_sampler(),
            ));
        }
        TileSource::Procedural(tile_config) => {
            commands.spawn(PendingTile::spawn(tile_config.clone()));
        }
    }
}

/// Observer: the scene's entities exist. This is the only place the mesh is
/// resolved.
#[allow(clippy::too_many_arguments)]
fn on_scene_ready(
    ready: On<SceneInstanceReady>,
    config: Res<ShadingConfig>,
    mut context: ResMut<ShadingContext>,
    children: Query<&'static Children>,
    names: Query<&'static Name>,
    meshes: Query<&'static Mesh3d>,
    transforms: Query<&'static Transform>,
    mesh_assets: Res<Assets<Mesh>>,
    tile: Res<GrassTile>,
    mut binder: Binder,
) {
    let graph = BevySceneGraph {
        children: &children,
        names: &names,
        meshes: &meshes,
        transforms: &transforms,
        mesh_assets: &mesh_assets,
    };
    match resolve(&LoadPhase::Ready(ready.entity), &graph, &config.mesh) {
        Ok(resolved) => {
            info!(
                "terrain mesh {} resolved: {} primitive(s), height {:.3}..{:.3}",
                config.mesh,
                resolved.primitives.len(),
                resolved.extent.min,
                resolved.extent.max
            );
            if resolved.extent.span() <= f32::EPSILON {
                warn!("terrain mesh {} is flat; height threshold has no effect", config.mesh);
            }
            let mode = context.scene_ready(resolved.primitives, resolved.extent);
            binder.apply(mode, &context, tile.handle.as_ref());
        }
        Err(err) => {
            error!("terrain shading disabled: {err}");
            context.scene_failed(err);
        }
    }
}

/// Reports a failed scene load once; the render loop keeps running with the
/// terrain unshaded.
pub fn watch_scene_load(
    scene: Option<Res<TerrainScene>>,
    asset_server: Res<AssetServer>,
    mut context: ResMut<ShadingContext>,
) {
    let Some(scene) = scene else {
        return;
    };
    if !matches!(context.scene(), SceneState::Loading) {
        return;
    }
    if let LoadState::Failed(cause) = asset_server.load_state(&scene.handle) {
        let err = ShadingError::LoadFailed {
            path: scene.path.clone(),
            cause: cause.to_string(),
        };
        error!("{err}");
        context.scene_failed(err);
    }
}

/// Feed the primary window's physical size into the context.
pub fn track_viewport(
    windows: Query<&Window, (With<PrimaryWindow>, Changed<Window>)>,
    mut context: ResMut<ShadingContext>,
    tile: Res<GrassTile>,
    mut binder: Binder,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    if let Some(mode) = context.resize(window.physical_width(), window.physical_height()) {
        binder.apply(mode, &context, tile.handle.as_ref());
    }
}

/// Quiet period after the last parameter change before settings are written.
const SAVE_DELAY_SECS: f32 = 0.5;

/// Debounces settings writes so a dragged slider saves once, after release.
#[derive(Resource, Default, Debug)]
pub struct SettingsSave {
    timer: Option<Timer>,
}

impl SettingsSave {
    /// Parameters changed; restart the quiet period.
    pub fn mark(&mut self) {
        self.timer = Some(Timer::from_seconds(SAVE_DELAY_SECS, TimerMode::Once));
    }

    /// Advance by `delta`. Returns `true` once when a write is due.
    pub fn tick(&mut self, delta: Duration) -> bool {
        let Some(timer) = &mut self.timer else {
            return false;
        };
        if timer.tick(delta).is_finished() {
            self.timer = None;
            return true;
        }
        false
    }
}

/// Run each [`ShadingRequest`] through the controller and rebind as told.
pub fn handle_shading_requests(
    mut requests: MessageReader<ShadingRequest>,
    mut context: ResMut<ShadingContext>,
    tile: Res<GrassTile>,
    mut save: ResMut<SettingsSave>,
    mut binder: Binder,
) {
    let before = context.params().clone();
    for request in requests.read() {
        let outcome = match *request {
            ShadingRequest::ToggleTexture(on) => context.toggle_texture(on),
            ShadingRequest::SelectPattern(index) => context.select_pattern(index),
            ShadingRequest::SetNumber(param, value) => context.set_number(param, value),
            ShadingRequest::SetColor(param, rgb) => context.set_color(param, rgb),
        };
        match outcome {
            Ok(rebind) => {
                if let Some(mode) = rebind {
                    binder.apply(mode, &context, tile.handle.as_ref());
                }
            }
            Err(ShadingError::NotLoaded) => {
                warn!("ignoring {request:?}: terrain scene is still loading")
            }
            // Already reported when the scene went inert.
            Err(err) if err.is_fatal() => debug!("ignoring {request:?}: {err}"),
            Err(err) => warn!("{err}"),
        }
    }

    if *context.params() != before {
        save.mark();
    }
}

/// Write the settings file once edits have settled.
pub fn flush_settings(
    time: Res<Time>,
    mut save: ResMut<SettingsSave>,
    context: Res<ShadingContext>,
    config: Res<ShadingConfig>,
) {
    if !save.tick(time.delta()) {
        return;
    }
    if let Some(path) = &config.persist_path
        && let Err(e) = persist::save(context.params(), path)
    {
        warn!("could not save shading settings to {}: {e}", path.display());
    }
}

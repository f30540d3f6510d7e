//! Mode controller: the single owner of parameters, load state and viewport.
//!
//! The visual mode is never stored on its own. It is derived from
//! `texture_enabled` and `active_pattern`, so the bound material, the UI
//! grouping and the parameter store cannot disagree.
//!
//! Every transition returns `Ok(Some(mode))` when the caller must rebind
//! exactly once with `mode`, `Ok(None)` when nothing visible changed, or an
//! error. Until the scene is ready, transitions fail with
//! [`ShadingError::NotLoaded`] and leave the state untouched.

use bevy::{
    math::UVec2,
    prelude::{Entity, Resource},
};

use crate::{
    binder::ShadingMode,
    error::ShadingError,
    params::{ColorParam, NumericParam, ParameterSet, Pattern},
    resolver::MeshExtent,
};

/// Progress of the one-time scene load.
#[derive(Clone, Debug, PartialEq)]
pub enum SceneState {
    Loading,
    Ready {
        primitives: Vec<Entity>,
        extent: MeshExtent,
    },
    /// A fatal error occurred; the terrain stays unshaded.
    Inert(ShadingError),
}

/// Borrowed view of what a rebind needs from the scene.
#[derive(Clone, Copy, Debug)]
pub struct BindTarget<'a> {
    pub primitives: &'a [Entity],
    pub extent: MeshExtent,
}

/// Control-panel sections that mirror the active mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UiGroup {
    /// Texture repeat controls.
    Texture,
    /// Colours, thresholds and the pattern picker.
    Patterns,
    /// The private controls of one pattern.
    Pattern(Pattern),
}

pub type Transition = Result<Option<ShadingMode>, ShadingError>;

#[derive(Resource, Debug)]
pub struct ShadingContext {
    params: ParameterSet,
    scene: SceneState,
    resolution: UVec2,
}

impl ShadingContext {
    pub fn new(params: ParameterSet) -> Self {
        Self {
            params,
            scene: SceneState::Loading,
            resolution: UVec2::new(1280, 720),
        }
    }

    pub fn params(&self) -> &ParameterSet {
        &self.params
    }

    pub fn scene(&self) -> &SceneState {
        &self.scene
    }

    pub fn resolution(&self) -> UVec2 {
        self.resolution
    }

    pub fn mode(&self) -> ShadingMode {
        if self.params.texture_enabled {
            ShadingMode::Textured
        } else {
            ShadingMode::Pattern(self.params.active_pattern)
        }
    }

    pub fn target(&self) -> Option<BindTarget<'_>> {
        match &self.scene {
            SceneState::Ready { primitives, extent } => Some(BindTarget {
                primitives,
                extent: *extent,
            }),
            _ => None,
        }
    }

    fn ensure_ready(&self) -> Result<(), ShadingError> {
        match &self.scene {
            SceneState::Ready { .. } => Ok(()),
            SceneState::Loading => Err(ShadingError::NotLoaded),
            SceneState::Inert(err) => Err(err.clone()),
        }
    }

    /// The load finished and the mesh resolved. Yields the first binding.
    pub fn scene_ready(&mut self, primitives: Vec<Entity>, extent: MeshExtent) -> ShadingMode {
        self.scene = SceneState::Ready { primitives, extent };
        self.mode()
    }

    /// The load or resolution failed; no further transitions are accepted.
    pub fn scene_failed(&mut self, err: ShadingError) {
        self.scene = SceneState::Inert(err);
    }

    pub fn toggle_texture(&mut self, on: bool) -> Transition {
        self.ensure_ready()?;
        self.params.texture_enabled = on;
        Ok(Some(self.mode()))
    }

    /// Record pattern `index` (1-based). While texture mode is on the choice
    /// is only remembered; it shows once texture mode is switched off.
    pub fn select_pattern(&mut self, index: u8) -> Transition {
        self.ensure_ready()?;
        self.params.select_pattern(index)?;
        Ok(match self.mode() {
            ShadingMode::Textured => None,
            mode => Some(mode),
        })
    }

    pub fn set_number(&mut self, param: NumericParam, value: f32) -> Transition {
        self.edit(|p| {
            p.set(param, value);
        })
    }

    pub fn set_color(&mut self, param: ColorParam, rgb: [f32; 3]) -> Transition {
        self.edit(|p| p.set_color(param, rgb))
    }

    /// Apply an arbitrary edit and rebind the current mode.
    pub fn edit(&mut self, f: impl FnOnce(&mut ParameterSet)) -> Transition {
        self.ensure_ready()?;
        f(&mut self.params);
        Ok(Some(self.mode()))
    }

    /// New viewport size in physical pixels. Recorded even before the scene
    /// is ready; only pattern modes depend on it.
    pub fn resize(&mut self, width: u32, height: u32) -> Option<ShadingMode> {
        let resolution = UVec2::new(width.max(1), height.max(1));
        if resolution == self.resolution {
            return None;
        }
        self.resolution = resolution;
        match (self.ensure_ready(), self.mode()) {
            (Ok(()), mode @ ShadingMode::Pattern(_)) => Some(mode),
            _ => None,
        }
    }

    /// The grass tile image became available.
    pub fn tile_ready(&self) -> Option<ShadingMode> {
        match (self.ensure_ready(), self.mode()) {
            (Ok(()), ShadingMode::Textured) => Some(ShadingMode::Textured),
            _ => None,
        }
    }

    /// Whether `group` is shown and expanded for the current mode.
    pub fn group_visible(&self, group: UiGroup) -> bool {
        match (self.mode(), group) {
            (ShadingMode::Textured, UiGroup::Texture) => true,
            (ShadingMode::Pattern(_), UiGroup::Patterns) => true,
            (ShadingMode::Pattern(active), UiGroup::Pattern(p)) => active == p,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::{MaterialSpec, describe};

    const EXTENT: MeshExtent = MeshExtent { min: 0.0, max: 4.0 };

    fn ready(params: ParameterSet) -> ShadingContext {
        let mut ctx = ShadingContext::new(params);
        ctx.scene_ready(vec![Entity::PLACEHOLDER], EXTENT);
        ctx
    }

    fn all_groups() -> Vec<UiGroup> {
        let mut groups = vec![UiGroup::Texture, UiGroup::Patterns];
        groups.extend(Pattern::ALL.map(UiGroup::Pattern));
        groups
    }

    #[test]
    fn transitions_before_load_fail_and_change_nothing() {
        let mut ctx = ShadingContext::new(ParameterSet::default());
        assert_eq!(ctx.toggle_texture(true), Err(ShadingError::NotLoaded));
        assert_eq!(ctx.select_pattern(2), Err(ShadingError::NotLoaded));
        assert_eq!(
            ctx.set_number(NumericParam::GridScale, 5.0),
            Err(ShadingError::NotLoaded)
        );
        assert_eq!(ctx.params(), &ParameterSet::default());
        assert!(ctx.target().is_none());
    }

    #[test]
    fn inert_context_reports_its_fatal_error() {
        let mut ctx = ShadingContext::new(ParameterSet::default());
        let err = ShadingError::MeshNotFound {
            selector: "name 'Grass'".into(),
        };
        ctx.scene_failed(err.clone());
        assert_eq!(ctx.toggle_texture(true), Err(err));
    }

    #[test]
    fn initial_mode_comes_from_configuration() {
        let params = ParameterSet {
            active_pattern: Pattern::Simplex,
            ..Default::default()
        };
        let mut ctx = ShadingContext::new(params);
        assert_eq!(
            ctx.scene_ready(vec![], EXTENT),
            ShadingMode::Pattern(Pattern::Simplex)
        );

        let mut ctx = ShadingContext::new(ParameterSet {
            texture_enabled: true,
            ..Default::default()
        });
        assert_eq!(ctx.scene_ready(vec![], EXTENT), ShadingMode::Textured);
    }

    #[test]
    fn texture_round_trip_restores_the_pattern() {
        let mut ctx = ready(ParameterSet {
            active_pattern: Pattern::Turbulence,
            ..Default::default()
        });
        assert_eq!(ctx.toggle_texture(true), Ok(Some(ShadingMode::Textured)));
        assert_eq!(
            ctx.toggle_texture(false),
            Ok(Some(ShadingMode::Pattern(Pattern::Turbulence)))
        );
    }

    #[test]
    fn selecting_during_texture_mode_is_deferred() {
        let mut ctx = ready(ParameterSet::default());
        ctx.toggle_texture(true).unwrap();

        assert_eq!(ctx.select_pattern(3), Ok(None));
        assert_eq!(ctx.mode(), ShadingMode::Textured);
        assert_eq!(ctx.params().active_pattern, Pattern::HalfTone);

        assert_eq!(
            ctx.toggle_texture(false),
            Ok(Some(ShadingMode::Pattern(Pattern::HalfTone)))
        );
    }

    #[test]
    fn invalid_selection_keeps_prior_state() {
        let mut ctx = ready(ParameterSet::default());
        ctx.select_pattern(4).unwrap();
        assert_eq!(
            ctx.select_pattern(9),
            Err(ShadingError::InvalidSelection { value: 9 })
        );
        assert_eq!(ctx.mode(), ShadingMode::Pattern(Pattern::IqNoise));
    }

    #[test]
    fn grid_survives_a_texture_detour() {
        let mut ctx = ready(ParameterSet {
            texture_repeat: 200.0,
            ..Default::default()
        });
        assert_eq!(ctx.mode(), ShadingMode::Pattern(Pattern::Marble));
        ctx.set_number(NumericParam::GridScale, 6.5).unwrap();

        let grid = ShadingMode::Pattern(Pattern::Grid);
        assert_eq!(ctx.select_pattern(5), Ok(Some(grid)));
        assert_eq!(ctx.toggle_texture(true), Ok(Some(ShadingMode::Textured)));
        let mode = ctx.toggle_texture(false).unwrap().unwrap();
        assert_eq!(mode, grid);

        let target = ctx.target().unwrap();
        let MaterialSpec::Pattern(uniforms) =
            describe(mode, ctx.params(), target.extent, ctx.resolution(), None)
        else {
            panic!("grid mode must bind the pattern program");
        };
        assert_eq!(uniforms.pattern, 5);
        assert_eq!(uniforms.grid_scale, 6.5);
        assert_eq!(ctx.params().texture_repeat, 200.0);
    }

    #[test]
    fn every_edit_rebinds_the_current_mode_once() {
        let mut ctx = ready(ParameterSet::default());
        assert_eq!(
            ctx.set_color(ColorParam::Hill, [0.2, 0.2, 0.2]),
            Ok(Some(ShadingMode::Pattern(Pattern::Marble)))
        );
        ctx.toggle_texture(true).unwrap();
        assert_eq!(
            ctx.set_number(NumericParam::TextureRepeat, 80.0),
            Ok(Some(ShadingMode::Textured))
        );
        assert_eq!(ctx.params().texture_repeat, 80.0);
    }

    #[test]
    fn resize_rebinds_only_patterns() {
        let mut ctx = ShadingContext::new(ParameterSet::default());
        assert_eq!(ctx.resize(800, 600), None);
        assert_eq!(ctx.resolution(), UVec2::new(800, 600));

        ctx.scene_ready(vec![], EXTENT);
        assert_eq!(
            ctx.resize(1024, 768),
            Some(ShadingMode::Pattern(Pattern::Marble))
        );
        assert_eq!(ctx.resize(1024, 768), None);

        ctx.toggle_texture(true).unwrap();
        assert_eq!(ctx.resize(640, 480), None);
        assert_eq!(ctx.resolution(), UVec2::new(640, 480));
    }

    #[test]
    fn tile_arrival_rebinds_texture_mode_only() {
        let mut ctx = ready(ParameterSet::default());
        assert_eq!(ctx.tile_ready(), None);
        ctx.toggle_texture(true).unwrap();
        assert_eq!(ctx.tile_ready(), Some(ShadingMode::Textured));
    }

    #[test]
    fn exactly_the_active_groups_are_visible() {
        let mut ctx = ready(ParameterSet::default());
        ctx.select_pattern(6).unwrap();
        let visible: Vec<_> = all_groups()
            .into_iter()
            .filter(|g| ctx.group_visible(*g))
            .collect();
        assert_eq!(
            visible,
            vec![UiGroup::Patterns, UiGroup::Pattern(Pattern::Simplex)]
        );

        ctx.toggle_texture(true).unwrap();
        let visible: Vec<_> = all_groups()
            .into_iter()
            .filter(|g| ctx.group_visible(*g))
            .collect();
        assert_eq!(visible, vec![UiGroup::Texture]);
    }
}

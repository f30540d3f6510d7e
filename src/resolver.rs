//! Locates the target mesh inside a loaded scene and measures its height.
//!
//! The lookup runs against the [`SceneGraph`] trait rather than Bevy queries
//! directly, so it can be exercised on a plain in-memory tree. A glTF mesh
//! node usually carries its geometry on one child entity per primitive; the
//! resolver therefore treats every mesh-bearing node at or below the match
//! as part of the target.
//!
//! Heights are measured in scene space: each primitive's positions go through
//! the composed local transforms from the scene root down, which is the space
//! the pattern shader reads `world_position` in.

use bevy::{
    math::{Affine3A, Vec3},
    mesh::VertexAttributeValues,
    prelude::{Assets, Children, Entity, Mesh, Mesh3d, Name, Query, Transform},
};
use serde::{Deserialize, Serialize};

use crate::error::ShadingError;

/// How the target mesh is identified inside the scene.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeshSelector {
    /// Match the first node (depth-first) whose name equals this string.
    Name(String),
    /// Follow child indices from the scene root, e.g. `[0, 14]`.
    ///
    /// Breaks silently when the asset is re-exported with a different node
    /// order; prefer [`MeshSelector::Name`].
    ChildPath(Vec<usize>),
}

impl Default for MeshSelector {
    fn default() -> Self {
        MeshSelector::Name("Grass".into())
    }
}

impl std::fmt::Display for MeshSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MeshSelector::Name(name) => write!(f, "name '{name}'"),
            MeshSelector::ChildPath(path) => write!(f, "child path {path:?}"),
        }
    }
}

/// Vertical bounding range of the resolved mesh, in scene space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshExtent {
    pub min: f32,
    pub max: f32,
}

impl MeshExtent {
    /// Y range of `positions`, or `None` if there are none.
    pub fn from_positions(positions: &[[f32; 3]]) -> Option<Self> {
        let mut ys = positions.iter().map(|p| p[1]).filter(|y| y.is_finite());
        let first = ys.next()?;
        let (min, max) = ys.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y)));
        Some(Self { min, max })
    }

    /// Y range of `positions` after applying `to_scene`.
    pub fn from_transformed(positions: &[[f32; 3]], to_scene: &Affine3A) -> Option<Self> {
        let moved: Vec<[f32; 3]> = positions
            .iter()
            .map(|p| to_scene.transform_point3(Vec3::from_array(*p)).to_array())
            .collect();
        Self::from_positions(&moved)
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }
}

/// Load gate for the scene. Only [`LoadPhase::Ready`] allows resolution.
#[derive(Clone, Debug, PartialEq)]
pub enum LoadPhase<N> {
    Loading,
    /// Holds the scene root node.
    Ready(N),
    Failed(String),
}

/// Read-only view of a scene hierarchy.
pub trait SceneGraph {
    type Node: Copy;

    fn children(&self, node: Self::Node) -> Vec<Self::Node>;

    fn name(&self, node: Self::Node) -> Option<&str>;

    /// Vertex positions of the geometry attached to `node`, if any.
    fn positions(&self, node: Self::Node) -> Option<&[[f32; 3]]>;

    /// Transform of `node` relative to its parent.
    fn local_transform(&self, _node: Self::Node) -> Affine3A {
        Affine3A::IDENTITY
    }
}

/// Result of a successful [`resolve`].
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedMesh<N> {
    /// The node the selector matched.
    pub node: N,
    /// Every mesh-bearing node at or below `node`; these receive the material.
    pub primitives: Vec<N>,
    pub extent: MeshExtent,
}

/// Find the node addressed by `selector` and measure its geometry.
pub fn resolve<G: SceneGraph>(
    phase: &LoadPhase<G::Node>,
    graph: &G,
    selector: &MeshSelector,
) -> Result<ResolvedMesh<G::Node>, ShadingError> {
    let LoadPhase::Ready(root) = phase else {
        return Err(ShadingError::NotLoaded);
    };
    let not_found = || ShadingError::MeshNotFound {
        selector: selector.to_string(),
    };

    let (node, to_scene) = match selector {
        MeshSelector::Name(name) => find_by_name(graph, *root, name),
        MeshSelector::ChildPath(path) => follow_path(graph, *root, path),
    }
    .ok_or_else(not_found)?;

    let mut primitives = Vec::new();
    let mut extent: Option<MeshExtent> = None;
    let mut stack = vec![(node, to_scene)];
    while let Some((current, to_scene)) = stack.pop() {
        if let Some(positions) = graph.positions(current) {
            primitives.push(current);
            if let Some(e) = MeshExtent::from_transformed(positions, &to_scene) {
                extent = Some(extent.map_or(e, |acc| acc.union(e)));
            }
        }
        push_children(graph, &mut stack, current, to_scene);
    }

    let extent = extent.ok_or_else(not_found)?;
    Ok(ResolvedMesh {
        node,
        primitives,
        extent,
    })
}

/// Push `node`'s children in visiting order, each with its scene transform.
fn push_children<G: SceneGraph>(
    graph: &G,
    stack: &mut Vec<(G::Node, Affine3A)>,
    node: G::Node,
    to_scene: Affine3A,
) {
    let mut children = graph.children(node);
    children.reverse();
    stack.extend(
        children
            .into_iter()
            .map(|child| (child, to_scene * graph.local_transform(child))),
    );
}

fn find_by_name<G: SceneGraph>(
    graph: &G,
    root: G::Node,
    name: &str,
) -> Option<(G::Node, Affine3A)> {
    let mut stack = vec![(root, graph.local_transform(root))];
    while let Some((node, to_scene)) = stack.pop() {
        if graph.name(node) == Some(name) {
            return Some((node, to_scene));
        }
        push_children(graph, &mut stack, node, to_scene);
    }
    None
}

fn follow_path<G: SceneGraph>(
    graph: &G,
    root: G::Node,
    path: &[usize],
) -> Option<(G::Node, Affine3A)> {
    path.iter()
        .try_fold((root, graph.local_transform(root)), |(node, to_scene), &i| {
            let child = graph.children(node).get(i).copied()?;
            Some((child, to_scene * graph.local_transform(child)))
        })
}

/// [`SceneGraph`] over the live Bevy world.
pub struct BevySceneGraph<'a, 'w, 's> {
    pub children: &'a Query<'w, 's, &'static Children>,
    pub names: &'a Query<'w, 's, &'static Name>,
    pub meshes: &'a Query<'w, 's, &'static Mesh3d>,
    pub transforms: &'a Query<'w, 's, &'static Transform>,
    pub mesh_assets: &'a Assets<Mesh>,
}

impl SceneGraph for BevySceneGraph<'_, '_, '_> {
    type Node = Entity;

    fn children(&self, node: Entity) -> Vec<Entity> {
        self.children
            .get(node)
            .map(|c| c.to_vec())
            .unwrap_or_default()
    }

    fn name(&self, node: Entity) -> Option<&str> {
        self.names.get(node).ok().map(|n| n.as_str())
    }

    fn positions(&self, node: Entity) -> Option<&[[f32; 3]]> {
        let handle = self.meshes.get(node).ok()?;
        let mesh = self.mesh_assets.get(&handle.0)?;
        match mesh.attribute(Mesh::ATTRIBUTE_POSITION)? {
            VertexAttributeValues::Float32x3(positions) => Some(positions.as_slice()),
            _ => None,
        }
    }

    // Global transforms are not propagated yet when the scene reports ready.
    fn local_transform(&self, node: Entity) -> Affine3A {
        self.transforms
            .get(node)
            .map(Transform::compute_affine)
            .unwrap_or(Affine3A::IDENTITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimal tree: nodes are indices into `nodes`.
    #[derive(Default)]
    struct TestGraph {
        nodes: Vec<TestNode>,
    }

    #[derive(Default)]
    struct TestNode {
        name: Option<String>,
        children: Vec<usize>,
        positions: Option<Vec<[f32; 3]>>,
        transform: Option<Transform>,
    }

    impl TestGraph {
        fn add(&mut self, parent: Option<usize>, name: Option<&str>) -> usize {
            let id = self.nodes.len();
            self.nodes.push(TestNode {
                name: name.map(str::to_owned),
                ..Default::default()
            });
            if let Some(p) = parent {
                self.nodes[p].children.push(id);
            }
            id
        }

        fn with_mesh(&mut self, node: usize, ys: &[f32]) {
            self.nodes[node].positions = Some(ys.iter().map(|&y| [0.0, y, 0.0]).collect());
        }

        fn with_transform(&mut self, node: usize, transform: Transform) {
            self.nodes[node].transform = Some(transform);
        }
    }

    impl SceneGraph for TestGraph {
        type Node = usize;

        fn children(&self, node: usize) -> Vec<usize> {
            self.nodes[node].children.clone()
        }

        fn name(&self, node: usize) -> Option<&str> {
            self.nodes[node].name.as_deref()
        }

        fn positions(&self, node: usize) -> Option<&[[f32; 3]]> {
            self.nodes[node].positions.as_deref()
        }

        fn local_transform(&self, node: usize) -> Affine3A {
            self.nodes[node]
                .transform
                .map_or(Affine3A::IDENTITY, |t| t.compute_affine())
        }
    }

    /// root -> world -> [Road, Grass -> [Grass.0, Grass.1]]
    fn terrain() -> TestGraph {
        let mut g = TestGraph::default();
        let root = g.add(None, None);
        let world = g.add(Some(root), Some("World"));
        let road = g.add(Some(world), Some("Road"));
        g.with_mesh(road, &[-50.0, 50.0]);
        let grass = g.add(Some(world), Some("Grass"));
        let p0 = g.add(Some(grass), Some("Grass.0"));
        g.with_mesh(p0, &[0.5, -1.25, 2.0]);
        let p1 = g.add(Some(grass), Some("Grass.1"));
        g.with_mesh(p1, &[3.5, 1.0]);
        g
    }

    #[test]
    fn resolve_before_load_is_not_loaded() {
        let g = terrain();
        let selector = MeshSelector::Name("Grass".into());
        assert_eq!(
            resolve(&LoadPhase::Loading, &g, &selector),
            Err(ShadingError::NotLoaded)
        );
        assert_eq!(
            resolve(&LoadPhase::Failed("boom".into()), &g, &selector),
            Err(ShadingError::NotLoaded)
        );
    }

    #[test]
    fn resolve_by_name_collects_primitives_and_extent() {
        let g = terrain();
        let resolved = resolve(
            &LoadPhase::Ready(0),
            &g,
            &MeshSelector::Name("Grass".into()),
        )
        .unwrap();
        assert_eq!(resolved.node, 3);
        assert_eq!(resolved.primitives, vec![4, 5]);
        assert_eq!(
            resolved.extent,
            MeshExtent {
                min: -1.25,
                max: 3.5
            }
        );
        assert!(resolved.extent.min <= resolved.extent.max);
    }

    #[test]
    fn resolve_by_child_path_matches_structural_lookup() {
        let g = terrain();
        let resolved = resolve(
            &LoadPhase::Ready(0),
            &g,
            &MeshSelector::ChildPath(vec![0, 1]),
        )
        .unwrap();
        assert_eq!(resolved.node, 3);
    }

    #[test]
    fn unknown_selector_is_mesh_not_found() {
        let g = terrain();
        for selector in [
            MeshSelector::Name("Sand".into()),
            MeshSelector::ChildPath(vec![0, 14]),
        ] {
            assert!(matches!(
                resolve(&LoadPhase::Ready(0), &g, &selector),
                Err(ShadingError::MeshNotFound { .. })
            ));
        }
    }

    #[test]
    fn node_without_geometry_is_mesh_not_found() {
        let g = terrain();
        let err = resolve(
            &LoadPhase::Ready(0),
            &g,
            &MeshSelector::Name("World".into()),
        );
        // "World" has meshes below it, so it resolves; an empty leaf does not.
        assert!(err.is_ok());

        let mut g = terrain();
        g.add(Some(0), Some("Empty"));
        assert!(matches!(
            resolve(&LoadPhase::Ready(0), &g, &MeshSelector::Name("Empty".into())),
            Err(ShadingError::MeshNotFound { .. })
        ));
    }

    #[test]
    fn extent_follows_ancestor_transforms() {
        // root -> Terrain (scale 10, lifted 2) -> Grass (shifted 1) -> primitive
        let mut g = TestGraph::default();
        let root = g.add(None, None);
        let terrain = g.add(Some(root), Some("Terrain"));
        g.with_transform(
            terrain,
            Transform::from_xyz(0.0, 2.0, 0.0).with_scale(Vec3::splat(10.0)),
        );
        let grass = g.add(Some(terrain), Some("Grass"));
        g.with_transform(grass, Transform::from_xyz(0.0, 1.0, 0.0));
        let primitive = g.add(Some(grass), None);
        g.with_mesh(primitive, &[0.0, 1.0]);

        for selector in [
            MeshSelector::Name("Grass".into()),
            MeshSelector::ChildPath(vec![0, 0]),
        ] {
            let resolved = resolve(&LoadPhase::Ready(root), &g, &selector).unwrap();
            // (y + 1) * 10 + 2 for y in [0, 1]
            assert_eq!(
                resolved.extent,
                MeshExtent {
                    min: 12.0,
                    max: 22.0
                }
            );
            assert_eq!(resolved.extent.span(), 10.0);
        }
    }

    #[test]
    fn extent_ignores_non_finite_positions() {
        let e = MeshExtent::from_positions(&[[0.0, f32::NAN, 0.0], [0.0, 2.0, 0.0]]).unwrap();
        assert_eq!(e, MeshExtent { min: 2.0, max: 2.0 });
        assert_eq!(MeshExtent::from_positions(&[]), None);
    }
}

//! Solid-leaf BSP construction.

use log::{debug, info};
use nalgebra::Point3;

use crate::config::CompileConfig;
use crate::{BspError, Classification, Cuttable, Plane3D, Polygon, Real, Result, Vertex};

use super::node::{Branch, BspNode, Leaf, NodeId};
use super::selector::{PlaneSelector, SplitEntry, WeightedSelector};
use super::tree::BspTree;

/// Output of the compiler: the tree plus the polygon array its leaves index.
///
/// `polygons` starts with the input polygons (a split polygon's slot holds
/// its front fragment) followed by one appended entry per split.
#[derive(Debug, Clone)]
pub struct CompiledBsp<V, A> {
    pub tree: BspTree,
    pub polygons: Vec<Polygon<V, A>>,
}

/// Builds a tree with the default weighted plane selection.
///
/// Polygons face into open space: the back side of the nearest non-hint
/// splitter is solid. Hint polygons only steer where the space is cut.
pub fn build<V: Vertex, A: Clone>(
    polygons: Vec<Polygon<V, A>>,
    hints: Vec<Polygon>,
    weight: Real,
) -> Result<CompiledBsp<V, A>> {
    BspCompiler::with_selector(WeightedSelector::new(weight)).compile(polygons, hints)
}

/// BSP compiler parameterised by its plane selection strategy.
#[derive(Debug, Clone, Default)]
pub struct BspCompiler<S = WeightedSelector> {
    selector: S,
}

impl BspCompiler<WeightedSelector> {
    pub fn new(config: &CompileConfig) -> Self {
        Self::with_selector(WeightedSelector::new(config.split_weight))
    }
}

impl<S: PlaneSelector> BspCompiler<S> {
    pub fn with_selector(selector: S) -> Self {
        Self { selector }
    }

    /// Compiles `polygons` (and optional `hints`) into a tree.
    ///
    /// Fails with [`BspError::Geometry`] if any input or hint polygon is
    /// degenerate.
    pub fn compile<V: Vertex, A: Clone>(
        &self,
        polygons: Vec<Polygon<V, A>>,
        hints: Vec<Polygon>,
    ) -> Result<CompiledBsp<V, A>> {
        info!(
            "Compiling BSP from {} polygons and {} hints",
            polygons.len(),
            hints.len()
        );

        let shapes = shapes_of(&polygons, "polygon")?;
        let hint_shapes = shapes_of(&hints, "hint polygon")?;

        let mut work: Vec<WorkItem> = (0..polygons.len())
            .map(|index| WorkItem::new(index, false))
            .collect();
        work.extend((0..hints.len()).map(|index| WorkItem::new(index, true)));

        let mut builder = Builder {
            selector: &self.selector,
            polygons,
            shapes,
            hints,
            hint_shapes,
            nodes: Vec::new(),
            next_leaf: 0,
            splits: 0,
        };
        builder.build_node(work, false)?;

        let Builder {
            polygons,
            nodes,
            splits,
            next_leaf,
            ..
        } = builder;
        let tree = BspTree::from_nodes(nodes)?;

        info!(
            "BSP done: {} nodes, {} empty leaves, depth {}, {} splits, {} output polygons",
            tree.len(),
            next_leaf,
            tree.depth(),
            splits,
            polygons.len()
        );
        Ok(CompiledBsp { tree, polygons })
    }
}

/// Cached plane and positions of one polygon slot.
#[derive(Debug, Clone)]
struct Shape {
    plane: Plane3D,
    positions: Vec<Point3<Real>>,
}

impl Shape {
    fn of<V: Vertex, A>(polygon: &Polygon<V, A>, plane: Plane3D) -> Self {
        Self {
            plane,
            positions: polygon.positions().collect(),
        }
    }
}

fn shapes_of<V: Vertex, A>(polygons: &[Polygon<V, A>], what: &str) -> Result<Vec<Shape>> {
    polygons
        .iter()
        .enumerate()
        .map(|(index, polygon)| {
            let plane = polygon.plane().map_err(|err| match err {
                BspError::Geometry(msg) => BspError::Geometry(format!("{what} {index}: {msg}")),
                other => other,
            })?;
            Ok(Shape::of(polygon, plane))
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct WorkItem {
    /// Slot in the polygon array (or the hint array when `hint`).
    index: usize,
    hint: bool,
    split_candidate: bool,
}

impl WorkItem {
    fn new(index: usize, hint: bool) -> Self {
        Self {
            index,
            hint,
            split_candidate: true,
        }
    }
}

struct Builder<'s, S, V, A> {
    selector: &'s S,
    polygons: Vec<Polygon<V, A>>,
    shapes: Vec<Shape>,
    hints: Vec<Polygon>,
    hint_shapes: Vec<Shape>,
    nodes: Vec<BspNode>,
    next_leaf: usize,
    splits: usize,
}

impl<S: PlaneSelector, V: Vertex, A: Clone> Builder<'_, S, V, A> {
    fn shape(&self, item: &WorkItem) -> &Shape {
        if item.hint {
            &self.hint_shapes[item.index]
        } else {
            &self.shapes[item.index]
        }
    }

    fn push(&mut self, node: BspNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Recursively builds the subtree for `items`, returning its arena index.
    ///
    /// `solid_if_empty` is the fate of a polygon-free leaf: the side of the
    /// nearest non-hint splitter this subset was reached from.
    fn build_node(&mut self, items: Vec<WorkItem>, solid_if_empty: bool) -> Result<NodeId> {
        if !items.iter().any(|item| item.split_candidate) {
            return Ok(self.emit_leaf(&items, solid_if_empty));
        }

        let chosen = {
            let entries: Vec<SplitEntry<'_>> = items
                .iter()
                .map(|item| {
                    let shape = self.shape(item);
                    SplitEntry {
                        plane: &shape.plane,
                        positions: &shape.positions,
                        hint: item.hint,
                        candidate: item.split_candidate,
                    }
                })
                .collect();
            self.selector.select(&entries)
        };
        let chosen = chosen
            .filter(|&index| items.get(index).is_some_and(|item| item.split_candidate))
            .ok_or_else(|| {
                BspError::Geometry("plane selector did not pick a split candidate".into())
            })?;

        let splitter = items[chosen];
        let plane = self.shape(&splitter).plane.clone();
        debug!(
            "splitter {}{} of {} polygons: {:?}",
            if splitter.hint { "hint " } else { "" },
            splitter.index,
            items.len(),
            plane
        );

        let mut front = Vec::new();
        let mut back = Vec::new();

        for (position, item) in items.into_iter().enumerate() {
            if position == chosen {
                // The splitter faces its own front side; hints are consumed.
                if !item.hint {
                    front.push(WorkItem {
                        split_candidate: false,
                        ..item
                    });
                }
                continue;
            }

            let shape = self.shape(&item);
            let classification =
                Classification::from_sides(shape.positions.iter().map(|p| plane.classify_point(*p)));
            match classification {
                Classification::Front => front.push(item),
                Classification::Back => back.push(item),
                Classification::Coplanar => {
                    if item.hint {
                        continue;
                    }
                    let used = WorkItem {
                        split_candidate: false,
                        ..item
                    };
                    if shape.plane.faces_same_way(&plane) {
                        front.push(used);
                    } else {
                        back.push(used);
                    }
                }
                Classification::Straddle => {
                    let (front_part, back_part) = self.split(item, &plane);
                    front.extend(front_part);
                    back.extend(back_part);
                }
            }
        }

        let (front_solid, back_solid) = if splitter.hint {
            (solid_if_empty, solid_if_empty)
        } else {
            (false, true)
        };
        let front_id = self.build_node(front, front_solid)?;
        let back_id = self.build_node(back, back_solid)?;

        Ok(self.push(BspNode::Branch(Branch::new(plane, front_id, back_id))))
    }

    fn emit_leaf(&mut self, items: &[WorkItem], solid_if_empty: bool) -> NodeId {
        let polygons: Vec<usize> = items
            .iter()
            .filter(|item| !item.hint)
            .map(|item| item.index)
            .collect();

        let leaf = if polygons.is_empty() && solid_if_empty {
            Leaf::solid()
        } else {
            let leaf_index = self.next_leaf;
            self.next_leaf += 1;
            Leaf::empty(leaf_index, polygons)
        };
        self.push(BspNode::Leaf(leaf))
    }

    /// Splits a straddling slot. The front fragment reuses the slot, the back
    /// fragment is appended as a new one.
    fn split(&mut self, item: WorkItem, plane: &Plane3D) -> (Option<WorkItem>, Option<WorkItem>) {
        if item.hint {
            let (front, back) = self.hints[item.index].cut(plane);
            let parent_plane = self.hint_shapes[item.index].plane.clone();
            split_slot(
                &mut self.hints,
                &mut self.hint_shapes,
                item,
                parent_plane,
                front,
                back,
            )
        } else {
            let (front, back) = self.polygons[item.index].cut(plane);
            let parent_plane = self.shapes[item.index].plane.clone();
            if front.is_some() && back.is_some() {
                self.splits += 1;
            }
            split_slot(
                &mut self.polygons,
                &mut self.shapes,
                item,
                parent_plane,
                front,
                back,
            )
        }
    }
}

fn split_slot<V: Vertex, A>(
    polygons: &mut Vec<Polygon<V, A>>,
    shapes: &mut Vec<Shape>,
    item: WorkItem,
    plane: Plane3D,
    front: Option<Polygon<V, A>>,
    back: Option<Polygon<V, A>>,
) -> (Option<WorkItem>, Option<WorkItem>) {
    match (front, back) {
        (Some(front), Some(back)) => {
            shapes[item.index] = Shape::of(&front, plane.clone());
            polygons[item.index] = front;
            shapes.push(Shape::of(&back, plane));
            polygons.push(back);
            let back_item = WorkItem {
                index: polygons.len() - 1,
                ..item
            };
            (Some(item), Some(back_item))
        }
        // A sliver fell below the vertex threshold; keep the surviving side whole.
        (Some(_), None) => (Some(item), None),
        (None, Some(_)) => (None, Some(item)),
        (None, None) => (None, None),
    }
}

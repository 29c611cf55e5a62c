//! Line-oriented text artifacts exchanged between the pipeline stages.
//!
//! Every artifact is a named block:
//!
//! ```text
//! Tree {
//! 3
//! 0 S
//! 1 E 6 [ 0 1 2 3 4 5 ]
//! 2 B 1 0 -1 ( 0 1 0 0 )
//! }
//! ```
//!
//! Readers take the whole text and fail with [`BspError::Format`] on the
//! first malformed or inconsistent token. Writers emit the exact layout the
//! readers accept; floats are written in their shortest round-trip form.

use std::io::Write;
use std::str::FromStr;

use nalgebra::{Point3, Vector2, Vector3};

use crate::bsp::{Branch, BspNode, BspTree, Leaf, LeafKind};
use crate::portal::{Portal, PortalInfo};
use crate::vis::LeafVisTable;
use crate::{BspError, Plane3D, Polygon, Real, Result, TexturedVertex, Vertex};

pub const TREE_BLOCK: &str = "Tree";
pub const PORTALS_BLOCK: &str = "Portals";
pub const VIS_BLOCK: &str = "Vis";
pub const POLYGONS_BLOCK: &str = "Polygons";

/// Whitespace-separated tokens; brackets, parentheses and braces are always
/// tokens of their own.
#[derive(Debug, Clone)]
pub struct Tokens<'a> {
    text: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Tokens<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            line: 1,
        }
    }

    /// Line of the next unread token.
    pub fn line(&self) -> usize {
        self.line
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.text[self.pos..];
        let trimmed = rest.trim_start();
        let skipped = &rest[..rest.len() - trimmed.len()];
        self.line += skipped.matches('\n').count();
        self.pos += skipped.len();
    }

    pub fn next_token(&mut self) -> Option<&'a str> {
        self.skip_whitespace();
        let rest = &self.text[self.pos..];
        let first = rest.chars().next()?;
        let len = if is_delimiter(first) {
            first.len_utf8()
        } else {
            rest.find(|c: char| c.is_whitespace() || is_delimiter(c))
                .unwrap_or(rest.len())
        };
        self.pos += len;
        Some(&rest[..len])
    }

    pub fn error(&self, message: impl std::fmt::Display) -> BspError {
        BspError::Format(format!("line {}: {message}", self.line))
    }

    /// Next token, which must exist.
    pub fn word(&mut self, what: &str) -> Result<&'a str> {
        self.next_token()
            .ok_or_else(|| self.error(format!("expected {what}, found end of input")))
    }

    pub fn expect(&mut self, token: &str) -> Result<()> {
        let found = self.word(&format!("`{token}`"))?;
        if found == token {
            Ok(())
        } else {
            Err(self.error(format!("expected `{token}`, found `{found}`")))
        }
    }

    pub fn parse<T: FromStr>(&mut self, what: &str) -> Result<T> {
        let found = self.word(what)?;
        found
            .parse()
            .map_err(|_| self.error(format!("expected {what}, found `{found}`")))
    }

    /// Consumes `Name {`.
    pub fn open_block(&mut self, name: &str) -> Result<()> {
        self.expect(name)?;
        self.expect("{")
    }

    /// Consumes `}` and requires nothing but whitespace after it.
    pub fn close_block(&mut self) -> Result<()> {
        self.expect("}")?;
        match self.next_token() {
            None => Ok(()),
            Some(extra) => Err(self.error(format!("unexpected `{extra}` after block"))),
        }
    }
}

fn is_delimiter(c: char) -> bool {
    matches!(c, '(' | ')' | '[' | ']' | '{' | '}')
}

/// A value with a fixed text layout inside a polygon line.
///
/// Vertices write their own parentheses; payloads write only their contents
/// and are wrapped in `[ ]` by the polygon writer.
pub trait TextRecord: Sized {
    fn write_text(&self, out: &mut impl Write) -> Result<()>;
    fn read_text(tokens: &mut Tokens<'_>) -> Result<Self>;
}

impl TextRecord for Point3<Real> {
    fn write_text(&self, out: &mut impl Write) -> Result<()> {
        write!(out, "( {} {} {} )", self.x, self.y, self.z)?;
        Ok(())
    }

    fn read_text(tokens: &mut Tokens<'_>) -> Result<Self> {
        tokens.expect("(")?;
        let point = read_point(tokens)?;
        tokens.expect(")")?;
        Ok(point)
    }
}

impl TextRecord for TexturedVertex {
    fn write_text(&self, out: &mut impl Write) -> Result<()> {
        let p = self.position;
        write!(out, "( {} {} {} {} {} )", p.x, p.y, p.z, self.uv.x, self.uv.y)?;
        Ok(())
    }

    fn read_text(tokens: &mut Tokens<'_>) -> Result<Self> {
        tokens.expect("(")?;
        let position = read_point(tokens)?;
        let uv = Vector2::new(tokens.parse("u")?, tokens.parse("v")?);
        tokens.expect(")")?;
        Ok(TexturedVertex::new(position, uv))
    }
}

impl TextRecord for () {
    fn write_text(&self, _out: &mut impl Write) -> Result<()> {
        Ok(())
    }

    fn read_text(_tokens: &mut Tokens<'_>) -> Result<Self> {
        Ok(())
    }
}

/// Material id (render geometry) or content flags (collision geometry).
impl TextRecord for u32 {
    fn write_text(&self, out: &mut impl Write) -> Result<()> {
        write!(out, " {self}")?;
        Ok(())
    }

    fn read_text(tokens: &mut Tokens<'_>) -> Result<Self> {
        tokens.parse("integer payload")
    }
}

/// `from to`; the index is the portal's position and is not stored.
impl TextRecord for PortalInfo {
    fn write_text(&self, out: &mut impl Write) -> Result<()> {
        write!(out, " {} {}", self.from_leaf, self.to_leaf)?;
        Ok(())
    }

    fn read_text(tokens: &mut Tokens<'_>) -> Result<Self> {
        Ok(PortalInfo {
            from_leaf: tokens.parse("from leaf")?,
            to_leaf: tokens.parse("to leaf")?,
            index: 0,
        })
    }
}

fn read_point(tokens: &mut Tokens<'_>) -> Result<Point3<Real>> {
    Ok(Point3::new(
        tokens.parse("x")?,
        tokens.parse("y")?,
        tokens.parse("z")?,
    ))
}

fn write_polygon<V: TextRecord, A: TextRecord>(
    out: &mut impl Write,
    polygon: &Polygon<V, A>,
) -> Result<()>
where
    V: Vertex,
{
    write!(out, "{}", polygon.len())?;
    for vertex in polygon.vertices() {
        write!(out, " ")?;
        vertex.write_text(out)?;
    }
    write!(out, " [")?;
    polygon.aux().write_text(out)?;
    writeln!(out, " ]")?;
    Ok(())
}

fn read_polygon<V, A>(tokens: &mut Tokens<'_>) -> Result<Polygon<V, A>>
where
    V: TextRecord + Vertex,
    A: TextRecord,
{
    let count: usize = tokens.parse("vertex count")?;
    if count < 3 {
        return Err(tokens.error(format!("polygon with {count} vertices")));
    }
    let vertices = (0..count)
        .map(|_| V::read_text(tokens))
        .collect::<Result<Vec<V>>>()?;
    tokens.expect("[")?;
    let aux = A::read_text(tokens)?;
    tokens.expect("]")?;
    Ok(Polygon::new(vertices, aux))
}

/// Writes a `Polygons` block.
pub fn write_polygons<V, A>(out: &mut impl Write, polygons: &[Polygon<V, A>]) -> Result<()>
where
    V: TextRecord + Vertex,
    A: TextRecord,
{
    writeln!(out, "{POLYGONS_BLOCK} {{")?;
    writeln!(out, "{}", polygons.len())?;
    for polygon in polygons {
        write_polygon(out, polygon)?;
    }
    writeln!(out, "}}")?;
    Ok(())
}

/// Reads a `Polygons` block.
pub fn read_polygons<V, A>(text: &str) -> Result<Vec<Polygon<V, A>>>
where
    V: TextRecord + Vertex,
    A: TextRecord,
{
    let mut tokens = Tokens::new(text);
    tokens.open_block(POLYGONS_BLOCK)?;
    let count: usize = tokens.parse("polygon count")?;
    let polygons = (0..count)
        .map(|_| read_polygon(&mut tokens))
        .collect::<Result<Vec<_>>>()?;
    tokens.close_block()?;
    Ok(polygons)
}

/// Writes a `Tree` block, one node per line in arena (post-)order.
pub fn write_tree(out: &mut impl Write, tree: &BspTree) -> Result<()> {
    writeln!(out, "{TREE_BLOCK} {{")?;
    writeln!(out, "{}", tree.len())?;
    for (id, node) in tree.nodes().iter().enumerate() {
        match node {
            BspNode::Leaf(leaf) => match leaf.kind() {
                LeafKind::Solid => writeln!(out, "{id} S")?,
                LeafKind::Empty { polygons, .. } => {
                    write!(out, "{id} E {} [", polygons.len())?;
                    for polygon in polygons {
                        write!(out, " {polygon}")?;
                    }
                    writeln!(out, " ]")?;
                }
            },
            BspNode::Branch(branch) => {
                let parent = branch.parent().map_or(-1, |parent| parent as i64);
                let plane = branch.plane();
                let n = plane.normal();
                writeln!(
                    out,
                    "{id} B {} {} {parent} ( {} {} {} {} )",
                    branch.front(),
                    branch.back(),
                    n.x,
                    n.y,
                    n.z,
                    plane.offset()
                )?;
            }
        }
    }
    writeln!(out, "}}")?;
    Ok(())
}

/// Reads a `Tree` block.
///
/// Node indices must be sequential, children must be loaded before their
/// branch, and every recorded parent must match the branch that claims the
/// node. Empty leaves are renumbered in node order.
pub fn read_tree(text: &str) -> Result<BspTree> {
    let mut tokens = Tokens::new(text);
    tokens.open_block(TREE_BLOCK)?;
    let count: usize = tokens.parse("node count")?;

    let mut nodes = Vec::new();
    let mut recorded_parents = Vec::new();
    let mut next_leaf = 0;

    for expected in 0..count {
        let index: usize = tokens.parse("node index")?;
        if index != expected {
            return Err(tokens.error(format!("node {index} out of order, expected {expected}")));
        }
        let node = match tokens.word("node type")? {
            "S" => BspNode::Leaf(Leaf::solid()),
            "E" => {
                let len: usize = tokens.parse("polygon count")?;
                tokens.expect("[")?;
                let polygons = (0..len)
                    .map(|_| tokens.parse("polygon index"))
                    .collect::<Result<Vec<usize>>>()?;
                tokens.expect("]")?;
                next_leaf += 1;
                BspNode::Leaf(Leaf::empty(next_leaf - 1, polygons))
            }
            "B" => {
                let front: usize = tokens.parse("front child")?;
                let back: usize = tokens.parse("back child")?;
                let parent: i64 = tokens.parse("parent index")?;
                tokens.expect("(")?;
                let normal = Vector3::new(
                    tokens.parse("nx")?,
                    tokens.parse("ny")?,
                    tokens.parse("nz")?,
                );
                let offset: Real = tokens.parse("plane offset")?;
                tokens.expect(")")?;
                let plane = Plane3D::new(normal, offset)
                    .map_err(|err| tokens.error(format!("branch {index}: {err}")))?;
                recorded_parents.push((index, parent));
                BspNode::Branch(Branch::new(plane, front, back))
            }
            other => return Err(tokens.error(format!("unknown node type `{other}`"))),
        };
        nodes.push(node);
    }
    tokens.close_block()?;

    let tree = BspTree::from_nodes(nodes)?;
    for (index, recorded) in recorded_parents {
        let actual = tree.node(index).parent().map_or(-1, |parent| parent as i64);
        if actual != recorded {
            return Err(BspError::Format(format!(
                "branch {index} records parent {recorded} but belongs to {actual}"
            )));
        }
    }
    Ok(tree)
}

/// Writes a `Portals` block.
pub fn write_portals(out: &mut impl Write, empty_leaf_count: usize, portals: &[Portal]) -> Result<()> {
    writeln!(out, "{PORTALS_BLOCK} {{")?;
    writeln!(out, "{empty_leaf_count}")?;
    writeln!(out, "{}", portals.len())?;
    for portal in portals {
        write_polygon(out, portal)?;
    }
    writeln!(out, "}}")?;
    Ok(())
}

/// Reads a `Portals` block, returning the empty-leaf count and the portals
/// numbered by position.
pub fn read_portals(text: &str) -> Result<(usize, Vec<Portal>)> {
    let mut tokens = Tokens::new(text);
    tokens.open_block(PORTALS_BLOCK)?;
    let empty_leaf_count: usize = tokens.parse("empty leaf count")?;
    if empty_leaf_count.checked_mul(empty_leaf_count).is_none() {
        return Err(tokens.error(format!("{empty_leaf_count} empty leaves is too many")));
    }
    let count: usize = tokens.parse("portal count")?;

    let mut portals = Vec::new();
    for index in 0..count {
        let portal: Portal = read_polygon(&mut tokens)?;
        let info = *portal.aux();
        if info.from_leaf >= empty_leaf_count || info.to_leaf >= empty_leaf_count {
            return Err(tokens.error(format!(
                "portal {index} links leaves {} and {} of {empty_leaf_count}",
                info.from_leaf, info.to_leaf
            )));
        }
        portals.push(portal.with_aux(PortalInfo { index, ..info }));
    }
    tokens.close_block()?;
    Ok((empty_leaf_count, portals))
}

/// Writes a `Vis` block: the size, then one row of `0`/`1` per leaf.
pub fn write_vis(out: &mut impl Write, table: &LeafVisTable) -> Result<()> {
    writeln!(out, "{VIS_BLOCK} {{")?;
    writeln!(out, "{}", table.size())?;
    for row in table.rows() {
        let line: String = row.iter().map(|&visible| if visible { '1' } else { '0' }).collect();
        writeln!(out, "{line}")?;
    }
    writeln!(out, "}}")?;
    Ok(())
}

/// Reads a `Vis` block.
pub fn read_vis(text: &str) -> Result<LeafVisTable> {
    let mut tokens = Tokens::new(text);
    tokens.open_block(VIS_BLOCK)?;
    let size: usize = tokens.parse("table size")?;

    let mut rows = Vec::new();
    for row in 0..size {
        let line = tokens.word("vis row")?;
        if line.len() != size {
            return Err(tokens.error(format!(
                "row {row} has {} entries, expected {size}",
                line.len()
            )));
        }
        let cells = line
            .chars()
            .map(|c| match c {
                '0' => Ok(false),
                '1' => Ok(true),
                other => Err(tokens.error(format!("invalid vis entry `{other}`"))),
            })
            .collect::<Result<Vec<bool>>>()?;
        rows.push(cells);
    }
    tokens.close_block()?;
    Ok(LeafVisTable::from_rows(rows))
}

use std::collections::BTreeMap;

use glam::Vec3;

use super::attribute::{AttribOwner, AttribType, Attribute, DataId};

/// Name of the point position attribute.
pub const POSITION: &str = "P";

/// A polygon mesh with named point, vertex, primitive and detail attributes.
///
/// Points carry positions. Vertices reference points, and each primitive is
/// an ordered run of vertices. Positions live in the `P` point attribute, so
/// they share the data id machinery of every other attribute.
#[derive(Clone, Debug)]
pub struct Detail {
    point_count: usize,
    vertex_points: Vec<u32>,
    /// `primitive_offsets[i]..primitive_offsets[i + 1]` are the vertices of primitive `i`.
    primitive_offsets: Vec<u32>,
    topology_id: DataId,
    point_attribs: BTreeMap<String, Attribute>,
    vertex_attribs: BTreeMap<String, Attribute>,
    primitive_attribs: BTreeMap<String, Attribute>,
    detail_attribs: BTreeMap<String, Attribute>,
}

impl Default for Detail {
    fn default() -> Self {
        Self::new()
    }
}

impl Detail {
    pub fn new() -> Self {
        let mut point_attribs = BTreeMap::new();
        point_attribs.insert(POSITION.to_owned(), Attribute::new(0, Vec3::ZERO));
        Self {
            point_count: 0,
            vertex_points: Vec::new(),
            primitive_offsets: vec![0],
            topology_id: DataId::next(),
            point_attribs,
            vertex_attribs: BTreeMap::new(),
            primitive_attribs: BTreeMap::new(),
            detail_attribs: BTreeMap::new(),
        }
    }

    /// Build a detail holding `positions` and no primitives.
    pub fn from_points(positions: &[Vec3]) -> Self {
        let mut detail = Self::new();
        let start = detail.append_points(positions.len());
        detail.positions_mut()[start..].copy_from_slice(positions);
        detail
    }

    pub fn point_count(&self) -> usize {
        self.point_count
    }

    pub fn vertex_count(&self) -> usize {
        self.vertex_points.len()
    }

    pub fn primitive_count(&self) -> usize {
        self.primitive_offsets.len() - 1
    }

    /// Append `count` points at the origin. Returns the index of the first one.
    pub fn append_points(&mut self, count: usize) -> usize {
        let start = self.point_count;
        self.point_count += count;
        let len = self.point_count;
        self.point_attribs.values_mut().for_each(|a| a.resize(len));
        self.topology_id = DataId::next();
        start
    }

    pub fn add_point(&mut self, position: Vec3) -> u32 {
        let index = self.append_points(1);
        self.positions_mut()[index] = position;
        index as u32
    }

    /// Append a primitive over `points`, one new vertex per point.
    /// Returns the primitive index.
    pub fn add_primitive(&mut self, points: &[u32]) -> usize {
        debug_assert!(points.iter().all(|&p| (p as usize) < self.point_count));
        self.vertex_points.extend_from_slice(points);
        self.primitive_offsets.push(self.vertex_points.len() as u32);

        let vertices = self.vertex_points.len();
        self.vertex_attribs.values_mut().for_each(|a| a.resize(vertices));
        let primitives = self.primitive_count();
        self.primitive_attribs.values_mut().for_each(|a| a.resize(primitives));
        self.topology_id = DataId::next();
        primitives - 1
    }

    /// Vertex indices of primitive `prim`, in winding order.
    pub fn primitive_vertices(&self, prim: usize) -> std::ops::Range<usize> {
        self.primitive_offsets[prim] as usize..self.primitive_offsets[prim + 1] as usize
    }

    pub fn primitive_vertex_count(&self, prim: usize) -> usize {
        self.primitive_vertices(prim).len()
    }

    /// Point indices of primitive `prim`, in winding order.
    pub fn primitive_points(&self, prim: usize) -> &[u32] {
        &self.vertex_points[self.primitive_vertices(prim)]
    }

    pub fn vertex_point(&self, vertex: usize) -> u32 {
        self.vertex_points[vertex]
    }

    /// Changes whenever points or primitives are added or removed.
    pub fn topology_data_id(&self) -> DataId {
        self.topology_id
    }

    pub fn positions(&self) -> &[Vec3] {
        self.find_attribute(AttribOwner::Point, POSITION)
            .unwrap_or_default()
    }

    /// Write access to positions. Bumps the `P` data id.
    pub fn positions_mut(&mut self) -> &mut [Vec3] {
        let len = self.point_count;
        self.point_attribs
            .entry(POSITION.to_owned())
            .or_insert_with(|| Attribute::new(len, Vec3::ZERO))
            .values_mut()
            .unwrap_or_default()
    }

    pub fn set_position(&mut self, point: usize, position: Vec3) {
        self.positions_mut()[point] = position;
    }

    /// Data id of the position attribute.
    pub fn position_data_id(&self) -> DataId {
        self.attribute_data_id(AttribOwner::Point, POSITION)
            .unwrap_or(self.topology_id)
    }

    fn attribs(&self, owner: AttribOwner) -> &BTreeMap<String, Attribute> {
        match owner {
            AttribOwner::Point => &self.point_attribs,
            AttribOwner::Vertex => &self.vertex_attribs,
            AttribOwner::Primitive => &self.primitive_attribs,
            AttribOwner::Detail => &self.detail_attribs,
        }
    }

    fn attribs_mut(&mut self, owner: AttribOwner) -> &mut BTreeMap<String, Attribute> {
        match owner {
            AttribOwner::Point => &mut self.point_attribs,
            AttribOwner::Vertex => &mut self.vertex_attribs,
            AttribOwner::Primitive => &mut self.primitive_attribs,
            AttribOwner::Detail => &mut self.detail_attribs,
        }
    }

    fn element_count(&self, owner: AttribOwner) -> usize {
        match owner {
            AttribOwner::Point => self.point_count,
            AttribOwner::Vertex => self.vertex_count(),
            AttribOwner::Primitive => self.primitive_count(),
            AttribOwner::Detail => 1,
        }
    }

    pub fn attribute(&self, owner: AttribOwner, name: &str) -> Option<&Attribute> {
        self.attribs(owner).get(name)
    }

    /// Values of the attribute `name` on `owner`, if it exists with type `T`.
    pub fn find_attribute<T: AttribType>(&self, owner: AttribOwner, name: &str) -> Option<&[T]> {
        self.attribute(owner, name)?.values()
    }

    /// Write access to an existing attribute of type `T`. Bumps its data id.
    pub fn find_attribute_mut<T: AttribType>(
        &mut self,
        owner: AttribOwner,
        name: &str,
    ) -> Option<&mut [T]> {
        self.attribs_mut(owner).get_mut(name)?.values_mut()
    }

    /// Write access to `name`, created with `default` if missing.
    ///
    /// An existing attribute of another type is replaced.
    pub fn add_attribute<T: AttribType>(
        &mut self,
        owner: AttribOwner,
        name: &str,
        default: T,
    ) -> &mut [T] {
        let len = self.element_count(owner);
        let attribs = self.attribs_mut(owner);
        let matches = attribs
            .get(name)
            .is_some_and(|a| a.values::<T>().is_some());
        if !matches {
            attribs.insert(name.to_owned(), Attribute::new(len, default));
        }
        attribs
            .get_mut(name)
            .and_then(|a| a.values_mut())
            .unwrap_or_default()
    }

    pub fn remove_attribute(&mut self, owner: AttribOwner, name: &str) -> bool {
        if owner == AttribOwner::Point && name == POSITION {
            return false;
        }
        self.attribs_mut(owner).remove(name).is_some()
    }

    pub fn attribute_data_id(&self, owner: AttribOwner, name: &str) -> Option<DataId> {
        self.attribute(owner, name).map(Attribute::data_id)
    }

    /// Give every point attribute a new data id.
    pub fn bump_all_data_ids(&mut self) {
        self.point_attribs
            .values_mut()
            .for_each(Attribute::bump_data_id);
    }

    /// Drop every primitive and replace the points with `count` fresh ones.
    ///
    /// Attribute definitions survive with their values reset to defaults.
    pub fn reset_points(&mut self, count: usize) {
        self.vertex_points.clear();
        self.primitive_offsets.truncate(1);
        self.point_count = count;
        self.point_attribs.values_mut().for_each(|a| a.reset(count));
        self.vertex_attribs.values_mut().for_each(|a| a.reset(0));
        self.primitive_attribs.values_mut().for_each(|a| a.reset(0));
        self.topology_id = DataId::next();
    }
}

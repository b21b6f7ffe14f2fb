use crate::{
    entity::{
        handle::NodeId,
        record::Record,
        refs::{CollectionKind, Refs},
    },
    error::{AccessFault, ErrorClass, ErrorOrigin, InternalError, ReconcileError},
};

/// Record inside a detached graph.
pub type DetachedRecord = Record<NodeId>;

///
/// DetachedGraph
///
/// Arena of detached records, typically decoded from a client request.
/// Nodes reference each other by `NodeId`, so cycles and shared
/// children are plain index links.
///

#[derive(Clone, Debug, Default)]
pub struct DetachedGraph {
    nodes: Vec<DetachedRecord>,
}

impl DetachedGraph {
    #[must_use]
    pub const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    pub fn insert(&mut self, record: DetachedRecord) -> NodeId {
        self.nodes.push(record);

        NodeId::new(self.nodes.len() - 1)
    }

    #[must_use]
    pub fn get(&self, node: NodeId) -> Option<&DetachedRecord> {
        self.nodes.get(node.index())
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut DetachedRecord> {
        self.nodes.get_mut(node.index())
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &DetachedRecord)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, record)| (NodeId::new(index), record))
    }

    /// Point a singular relation of `owner` at `target`.
    pub fn link(
        &mut self,
        owner: NodeId,
        field: &'static str,
        target: NodeId,
    ) -> Result<(), InternalError> {
        self.require(target)?;
        self.node_mut(owner)?.set_one(field, Some(target));

        Ok(())
    }

    /// Append `member` to a collection relation of `owner`, creating the collection if absent.
    pub fn push_member(
        &mut self,
        owner: NodeId,
        field: &'static str,
        kind: CollectionKind,
        member: NodeId,
    ) -> Result<(), InternalError> {
        self.require(member)?;
        let record = self.node_mut(owner)?;
        let entity = record.model().path;
        record
            .many_mut(field, kind)
            .map_err(|source| access(entity, field, source))?
            .push(member);

        Ok(())
    }

    /// Replace a collection relation of `owner` with an explicit (possibly empty) member list.
    pub fn set_members(
        &mut self,
        owner: NodeId,
        field: &'static str,
        kind: CollectionKind,
        members: impl IntoIterator<Item = NodeId>,
    ) -> Result<(), InternalError> {
        let members = Refs::from_items(kind, members);
        for member in members.iter() {
            self.require(*member)?;
        }
        self.node_mut(owner)?.set_many(field, Some(members));

        Ok(())
    }

    fn require(&self, node: NodeId) -> Result<(), InternalError> {
        if node.index() < self.nodes.len() {
            Ok(())
        } else {
            Err(missing(node))
        }
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut DetachedRecord, InternalError> {
        self.nodes.get_mut(node.index()).ok_or_else(|| missing(node))
    }
}

fn missing(node: NodeId) -> InternalError {
    InternalError::new(
        ErrorClass::InvariantViolation,
        ErrorOrigin::Reconcile,
        format!("detached node {node} does not exist"),
    )
}

fn access(entity: &'static str, field: &'static str, source: AccessFault) -> InternalError {
    ReconcileError::Access {
        entity,
        field,
        source,
    }
    .into()
}

//! Shared structural capability of groups and entries.

use coffre_types::{ObjectId, Timestamp};

/// Capability shared by [`Group`](crate::Group) and
/// [`Entry`](crate::Entry): identity, the parent back reference, and
/// the relocation bookkeeping the merge engine arbitrates with.
pub trait StructureItem {
    /// The object's immutable identity.
    fn uuid(&self) -> ObjectId;

    /// The uuid of the owning group, `None` for a root group.
    fn parent(&self) -> Option<ObjectId>;

    /// When the object was last moved to its current parent.
    fn location_changed(&self) -> Timestamp;

    fn set_location_changed(&mut self, at: Timestamp);

    /// The parent before the most recent relocation, if any.
    fn previous_parent(&self) -> Option<ObjectId>;

    fn set_previous_parent(&mut self, parent: Option<ObjectId>);
}

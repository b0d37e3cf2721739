//! Capability table deciding who may do what to which resource.
//!
//! Every mutating request passes through [`is_allowed`] before it touches the
//! database. The table maps a (resource, operation) pair to the least
//! privileged [`Role`] that may perform it; the evaluation itself has no side
//! effects.

use model::entities::user;

/// Kinds of resources exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Stream,
    Movie,
    Review,
}

/// Operations that can be requested on a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Create,
    Update,
    Delete,
    UploadImage,
}

/// Privilege required for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Any authenticated user.
    Authenticated,
    /// Only the user that owns the target record.
    Owner,
    /// Staff or superusers.
    Admin,
}

/// The acting, already authenticated, user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: i32,
    pub is_admin: bool,
}

impl From<&user::Model> for Actor {
    fn from(user: &user::Model) -> Self {
        Self {
            user_id: user.id,
            is_admin: user.is_admin(),
        }
    }
}

const CAPABILITIES: &[(Resource, Operation, Role)] = &[
    (Resource::Stream, Operation::Read, Role::Authenticated),
    (Resource::Stream, Operation::Create, Role::Admin),
    (Resource::Stream, Operation::Update, Role::Admin),
    (Resource::Stream, Operation::Delete, Role::Admin),
    (Resource::Movie, Operation::Read, Role::Authenticated),
    (Resource::Movie, Operation::Create, Role::Admin),
    (Resource::Movie, Operation::Update, Role::Admin),
    (Resource::Movie, Operation::Delete, Role::Admin),
    (Resource::Movie, Operation::UploadImage, Role::Authenticated),
    (Resource::Review, Operation::Read, Role::Authenticated),
    (Resource::Review, Operation::Create, Role::Authenticated),
    (Resource::Review, Operation::Update, Role::Owner),
    (Resource::Review, Operation::Delete, Role::Owner),
];

/// Looks up the role required for `operation` on `resource`.
///
/// Pairs missing from the table require [`Role::Admin`].
pub fn required_role(resource: Resource, operation: Operation) -> Role {
    CAPABILITIES
        .iter()
        .find(|(r, o, _)| *r == resource && *o == operation)
        .map(|(_, _, role)| *role)
        .unwrap_or(Role::Admin)
}

/// Decides whether `actor` may perform `operation` on `resource`.
///
/// `owner_id` is the owning user of the target record, if the record exists
/// and has one. Owner-only operations on records without an owner are denied.
/// Admin privilege does not grant owner-only operations.
pub fn is_allowed(
    actor: &Actor,
    resource: Resource,
    operation: Operation,
    owner_id: Option<i32>,
) -> bool {
    match required_role(resource, operation) {
        Role::Authenticated => true,
        Role::Owner => owner_id == Some(actor.user_id),
        Role::Admin => actor.is_admin,
    }
}

//! Bot, group, and member objects for groupwire.
//!
//! The object graph is an arena: a [`Bot`] owns its [`Group`]s, each group
//! owns its roster of [`NormalMember`]s, and everything below the bot only
//! holds a [`WeakBot`] plus ids pointing back up. Dropping the bot tears the
//! whole graph down.
//!
//! Members come in two kinds behind one [`Member`] capability trait:
//! - **[`NormalMember`]**: a registered member with a cached snapshot that
//!   supports the full command set
//! - **[`AnonymousMember`]**: an ephemeral anonymous sender that can only be
//!   muted or handed images
//!
//! [`AnyMember`] is the tagged union of both.

pub mod anonymous;
pub mod bot;
pub mod commands;
pub mod group;
pub mod member;
pub mod normal;
pub mod send;
pub mod snapshot;

#[cfg(test)]
mod test_helpers;

pub use anonymous::AnonymousMember;
pub use bot::{Bot, BotBuilder, WeakBot};
pub use group::Group;
pub use member::{AnyMember, Member};
pub use normal::NormalMember;
pub use snapshot::MemberSnapshot;

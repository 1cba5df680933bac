//! Privileged member commands.
//!
//! Every command runs the same three phases, in order, on the member's lane:
//!
//! 1. **Precondition**: rank and argument checks against the cached roster.
//!    Failures return before anything is sent.
//! 2. **Transport call**: one action; a non-ok answer becomes
//!    [`Error::Transport`] and nothing local changes.
//! 3. **Local mutation**: only after the transport reported success.
//!
//! Rank checks read the bot's permission once at call time.

use groupwire_core::error::{Error, Result};
use groupwire_core::permission::MemberPermission;
use tracing::{debug, info};

use crate::group::Group;
use crate::normal::NormalMember;

/// Require the bot to outrank the target in `group`.
pub(crate) fn check_permission_higher_than(
    group: &Group,
    member_id: i64,
    target: MemberPermission,
    operation: &str,
) -> Result<()> {
    let bot_permission = group.bot_permission();
    if bot_permission.higher_than(target) {
        return Ok(());
    }
    Err(Error::permission_denied(
        operation,
        format!(
            "acting on member {member_id} of group {} needs a higher permission than the target, \
             but the bot is {bot_permission} and the target is {target}",
            group.id()
        ),
    ))
}

/// Require the bot to hold at least `required` in `group`.
pub(crate) fn check_permission_at_least(
    group: &Group,
    member_id: i64,
    required: MemberPermission,
    operation: &str,
) -> Result<()> {
    let bot_permission = group.bot_permission();
    if bot_permission >= required {
        return Ok(());
    }
    Err(Error::permission_denied(
        operation,
        format!(
            "acting on member {member_id} of group {} needs {required}, but the bot is only {bot_permission}",
            group.id()
        ),
    ))
}

impl NormalMember {
    /// Remove this member from the group, optionally refusing future join
    /// requests. The transport action carries no reason; it is only logged.
    pub async fn kick(&self, reason: &str, block: bool) -> Result<()> {
        let _lane = self.lane.lock().await;
        let group = self.group()?;
        check_permission_higher_than(&group, self.id(), self.permission(), "kick")?;
        if !group.contains(self.id()) {
            return Err(Error::InvalidArgument(format!(
                "member {} was already removed from group {}",
                self.id(),
                group.id()
            )));
        }

        let bot = self.bot()?;
        let context = format!("kick member {} from group {}", self.id(), group.id());
        bot.transport()
            .set_group_kick(group.id(), self.id(), block)
            .await?
            .check(&context)?;

        group.remove_member(self.id());
        info!(group_id = group.id(), member_id = self.id(), reason, block, "Member kicked");
        Ok(())
    }

    /// Grant or revoke administrator. Only the group owner can do this.
    pub async fn modify_admin(&self, to_admin: bool) -> Result<()> {
        let _lane = self.lane.lock().await;
        let group = self.group()?;
        check_permission_at_least(&group, self.id(), MemberPermission::Owner, "modify admin")?;

        let bot = self.bot()?;
        let context = format!(
            "set admin status of member {} in group {} to {to_admin}",
            self.id(),
            group.id()
        );
        bot.transport()
            .set_group_admin(group.id(), self.id(), to_admin)
            .await?
            .check(&context)?;

        let role = if to_admin {
            MemberPermission::Administrator
        } else {
            MemberPermission::Member
        };
        self.modify_raw(|raw| raw.role = role.role_tag().to_string());
        info!(group_id = group.id(), member_id = self.id(), to_admin, "Member role changed");
        Ok(())
    }

    /// Mute for `duration_seconds`. The bot cannot mute itself.
    pub async fn mute(&self, duration_seconds: i32) -> Result<()> {
        let _lane = self.lane.lock().await;
        if self.is_bot() {
            return Err(Error::InvalidArgument("the bot cannot mute itself".into()));
        }
        if duration_seconds <= 0 {
            return Err(Error::InvalidArgument(format!(
                "mute duration must be positive, got {duration_seconds}"
            )));
        }
        let group = self.group()?;
        check_permission_higher_than(&group, self.id(), self.permission(), "mute")?;

        let bot = self.bot()?;
        let context = format!("mute member {} of group {}", self.id(), group.id());
        bot.transport()
            .set_group_ban(group.id(), self.id(), duration_seconds)
            .await?
            .check(&context)?;

        self.refresh_locked().await
    }

    /// Lift the current mute.
    pub async fn unmute(&self) -> Result<()> {
        let _lane = self.lane.lock().await;
        let group = self.group()?;
        check_permission_higher_than(&group, self.id(), self.permission(), "unmute")?;

        let bot = self.bot()?;
        let context = format!("unmute member {} of group {}", self.id(), group.id());
        bot.transport()
            .set_group_ban(group.id(), self.id(), 0)
            .await?
            .check(&context)?;

        self.refresh_locked().await
    }

    /// Nudge this member. Needs no rank and changes nothing locally.
    pub async fn nudge(&self) -> Result<()> {
        let _lane = self.lane.lock().await;
        let bot = self.bot()?;
        let context = format!("nudge member {} of group {}", self.id(), self.group_id());
        bot.transport()
            .group_poke(self.group_id(), self.id())
            .await?
            .check(&context)?;
        debug!(group_id = self.group_id(), member_id = self.id(), "Member nudged");
        Ok(())
    }
}

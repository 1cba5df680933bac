//! Member trait: one capability surface over both member kinds.
//!
//! Application code that only needs identity, muting, messaging and uploads
//! can hold a `dyn Member` or an [`AnyMember`] and ignore which kind it got.
//! Kind-specific operations (kick, admin changes, refresh) stay on
//! [`NormalMember`].

use async_trait::async_trait;
use groupwire_core::error::Result;
use groupwire_core::info::{MemberActive, MemberInfo};
use groupwire_core::message::{MessageChain, MessageElement, MessageReceipt};
use groupwire_core::permission::MemberPermission;
use groupwire_core::upload::ExternalResource;
use std::sync::Arc;

use crate::anonymous::AnonymousMember;
use crate::normal::NormalMember;

#[async_trait]
pub trait Member: Send + Sync {
    fn id(&self) -> i64;

    fn group_id(&self) -> i64;

    fn nick(&self) -> String;

    fn name_card(&self) -> String;

    fn permission(&self) -> MemberPermission;

    fn special_title(&self) -> String;

    /// The bot's friend remark; always empty for anonymous members.
    fn remark(&self) -> String;

    fn is_anonymous(&self) -> bool;

    fn info(&self) -> MemberInfo;

    fn active(&self) -> MemberActive;

    /// Card if set, nickname otherwise.
    fn display_name(&self) -> String {
        let card = self.name_card();
        if card.is_empty() { self.nick() } else { card }
    }

    async fn mute(&self, duration_seconds: i32) -> Result<()>;

    async fn nudge(&self) -> Result<()>;

    async fn send_message(&self, message: MessageChain) -> Result<MessageReceipt>;

    async fn upload_image(&self, resource: &ExternalResource) -> Result<MessageElement>;

    async fn upload_short_video(
        &self,
        thumbnail: &ExternalResource,
        video: &ExternalResource,
    ) -> Result<MessageElement>;
}

#[async_trait]
impl Member for NormalMember {
    fn id(&self) -> i64 {
        NormalMember::id(self)
    }

    fn group_id(&self) -> i64 {
        NormalMember::group_id(self)
    }

    fn nick(&self) -> String {
        NormalMember::nick(self)
    }

    fn name_card(&self) -> String {
        NormalMember::name_card(self)
    }

    fn permission(&self) -> MemberPermission {
        NormalMember::permission(self)
    }

    fn special_title(&self) -> String {
        NormalMember::special_title(self)
    }

    fn remark(&self) -> String {
        NormalMember::remark(self)
    }

    fn is_anonymous(&self) -> bool {
        false
    }

    fn info(&self) -> MemberInfo {
        NormalMember::info(self)
    }

    fn active(&self) -> MemberActive {
        NormalMember::active(self)
    }

    async fn mute(&self, duration_seconds: i32) -> Result<()> {
        NormalMember::mute(self, duration_seconds).await
    }

    async fn nudge(&self) -> Result<()> {
        NormalMember::nudge(self).await
    }

    async fn send_message(&self, message: MessageChain) -> Result<MessageReceipt> {
        NormalMember::send_message(self, message).await
    }

    async fn upload_image(&self, resource: &ExternalResource) -> Result<MessageElement> {
        NormalMember::upload_image(self, resource).await
    }

    async fn upload_short_video(
        &self,
        thumbnail: &ExternalResource,
        video: &ExternalResource,
    ) -> Result<MessageElement> {
        NormalMember::upload_short_video(self, thumbnail, video).await
    }
}

#[async_trait]
impl Member for AnonymousMember {
    fn id(&self) -> i64 {
        AnonymousMember::id(self)
    }

    fn group_id(&self) -> i64 {
        AnonymousMember::group_id(self)
    }

    fn nick(&self) -> String {
        self.name().to_string()
    }

    fn name_card(&self) -> String {
        self.name().to_string()
    }

    fn permission(&self) -> MemberPermission {
        AnonymousMember::permission(self)
    }

    fn special_title(&self) -> String {
        String::new()
    }

    fn remark(&self) -> String {
        String::new()
    }

    fn is_anonymous(&self) -> bool {
        true
    }

    fn info(&self) -> MemberInfo {
        AnonymousMember::info(self)
    }

    fn active(&self) -> MemberActive {
        AnonymousMember::active(self)
    }

    async fn mute(&self, duration_seconds: i32) -> Result<()> {
        AnonymousMember::mute(self, duration_seconds).await
    }

    async fn nudge(&self) -> Result<()> {
        AnonymousMember::nudge(self).await
    }

    async fn send_message(&self, message: MessageChain) -> Result<MessageReceipt> {
        AnonymousMember::send_message(self, message).await
    }

    async fn upload_image(&self, resource: &ExternalResource) -> Result<MessageElement> {
        AnonymousMember::upload_image(self, resource).await
    }

    async fn upload_short_video(
        &self,
        thumbnail: &ExternalResource,
        video: &ExternalResource,
    ) -> Result<MessageElement> {
        AnonymousMember::upload_short_video(self, thumbnail, video).await
    }
}

/// Either kind of member, e.g. the sender of an incoming group message.
#[derive(Debug, Clone)]
pub enum AnyMember {
    Normal(Arc<NormalMember>),
    Anonymous(AnonymousMember),
}

impl AnyMember {
    pub fn as_normal(&self) -> Option<&Arc<NormalMember>> {
        match self {
            Self::Normal(member) => Some(member),
            Self::Anonymous(_) => None,
        }
    }

    pub fn as_anonymous(&self) -> Option<&AnonymousMember> {
        match self {
            Self::Normal(_) => None,
            Self::Anonymous(member) => Some(member),
        }
    }

    fn inner(&self) -> &dyn Member {
        match self {
            Self::Normal(member) => member.as_ref() as &dyn Member,
            Self::Anonymous(member) => member as &dyn Member,
        }
    }
}

impl From<Arc<NormalMember>> for AnyMember {
    fn from(member: Arc<NormalMember>) -> Self {
        Self::Normal(member)
    }
}

impl From<AnonymousMember> for AnyMember {
    fn from(member: AnonymousMember) -> Self {
        Self::Anonymous(member)
    }
}

#[async_trait]
impl Member for AnyMember {
    fn id(&self) -> i64 {
        self.inner().id()
    }

    fn group_id(&self) -> i64 {
        self.inner().group_id()
    }

    fn nick(&self) -> String {
        self.inner().nick()
    }

    fn name_card(&self) -> String {
        self.inner().name_card()
    }

    fn permission(&self) -> MemberPermission {
        self.inner().permission()
    }

    fn special_title(&self) -> String {
        self.inner().special_title()
    }

    fn remark(&self) -> String {
        self.inner().remark()
    }

    fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous(_))
    }

    fn info(&self) -> MemberInfo {
        self.inner().info()
    }

    fn active(&self) -> MemberActive {
        self.inner().active()
    }

    async fn mute(&self, duration_seconds: i32) -> Result<()> {
        self.inner().mute(duration_seconds).await
    }

    async fn nudge(&self) -> Result<()> {
        self.inner().nudge().await
    }

    async fn send_message(&self, message: MessageChain) -> Result<MessageReceipt> {
        self.inner().send_message(message).await
    }

    async fn upload_image(&self, resource: &ExternalResource) -> Result<MessageElement> {
        self.inner().upload_image(resource).await
    }

    async fn upload_short_video(
        &self,
        thumbnail: &ExternalResource,
        video: &ExternalResource,
    ) -> Result<MessageElement> {
        self.inner().upload_short_video(thumbnail, video).await
    }
}

impl std::fmt::Display for AnyMember {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal(member) => std::fmt::Display::fmt(member, f),
            Self::Anonymous(member) => std::fmt::Display::fmt(member, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{TARGET, fixture};
    use groupwire_core::error::Error;
    use groupwire_core::transport::AnonymousInfo;

    fn members() -> (crate::test_helpers::Fixture, AnyMember, AnyMember) {
        let fx = fixture("owner", "member");
        let normal = AnyMember::from(fx.target.clone());
        let anonymous = AnyMember::from(fx.group.anonymous_member(AnonymousInfo {
            id: 0,
            name: "ghost".into(),
            flag: "tok".into(),
        }));
        (fx, normal, anonymous)
    }

    #[test]
    fn identity_delegates_to_the_variant() {
        let (fx, normal, anonymous) = members();
        assert_eq!(normal.id(), TARGET);
        assert_eq!(normal.display_name(), "target");
        assert!(!normal.is_anonymous());
        assert!(normal.as_normal().is_some());

        fx.bot.set_friend_remark(TARGET, "pal");
        assert_eq!(normal.remark(), "pal");

        assert!(anonymous.is_anonymous());
        assert_eq!(anonymous.nick(), "ghost");
        assert_eq!(anonymous.display_name(), "ghost");
        assert_eq!(anonymous.permission(), MemberPermission::Member);
        assert_eq!(anonymous.special_title(), "");
        assert_eq!(anonymous.remark(), "");
        assert_eq!(anonymous.to_string(), "AnonymousMember(ghost, tok)");
        assert_eq!(normal.to_string(), "NormalMember(2)");
    }

    #[tokio::test]
    async fn trait_objects_dispatch_commands() {
        let (fx, normal, anonymous) = members();
        let all: Vec<&dyn Member> = vec![&normal, &anonymous];
        for member in all {
            member.mute(60).await.unwrap();
        }
        assert_eq!(fx.transport.count("set_group_ban"), 1);
        assert_eq!(fx.transport.count("set_group_anonymous_ban"), 1);
    }

    #[tokio::test]
    async fn unsupported_capabilities_surface_as_errors() {
        let (fx, normal, anonymous) = members();
        let clip = ExternalResource::new(vec![0]);

        assert!(normal.upload_short_video(&clip, &clip).await.is_ok());
        assert!(matches!(
            anonymous.upload_short_video(&clip, &clip).await,
            Err(Error::UnsupportedOperation(_))
        ));
        assert!(matches!(
            anonymous.send_message(MessageChain::from("hi")).await,
            Err(Error::UnsupportedOperation(_))
        ));
        assert_eq!(fx.uploader.count(), 1);
    }

    #[tokio::test]
    async fn nudge_and_active_follow_the_member_kind() {
        let (fx, normal, anonymous) = members();

        normal.nudge().await.unwrap();
        assert!(matches!(anonymous.nudge().await, Err(Error::UnsupportedOperation(_))));
        assert_eq!(fx.transport.calls(), vec!["group_poke 100 2"]);

        assert_eq!(anonymous.active(), MemberActive::default());
        assert_eq!(normal.active(), fx.target.active());
    }
}

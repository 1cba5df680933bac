//! Temporary messages and media uploads addressed to group members.

use chrono::Utc;
use groupwire_core::error::{Error, Result};
use groupwire_core::event::MemberEvent;
use groupwire_core::message::{MessageChain, MessageElement, MessageReceipt};
use groupwire_core::upload::{ExternalResource, UploadService};
use std::sync::Arc;
use tracing::debug;

use crate::bot::Bot;
use crate::normal::NormalMember;

impl NormalMember {
    /// Send a temporary (group-originated private) message to this member.
    ///
    /// A `TempMessagePreSend` listener can veto the send, in which case no
    /// transport call is made. Otherwise exactly one `TempMessagePostSend`
    /// follows the attempt, carrying the receipt or the error text.
    pub async fn send_message(&self, message: impl Into<MessageChain>) -> Result<MessageReceipt> {
        let chain = message.into();
        let _lane = self.lane.lock().await;
        let bot = self.bot()?;
        let (group_id, target_id) = (self.group_id(), self.id());

        let pre = bot.events().broadcast(MemberEvent::TempMessagePreSend {
            group_id,
            target_id,
            message: chain.clone(),
        });
        if pre.cancelled {
            return Err(Error::SendCancelled(format!(
                "temp message to member {target_id} of group {group_id} was cancelled by a listener"
            )));
        }

        let result = self.dispatch(&bot, &chain).await;
        let (error, receipt) = match &result {
            Ok(receipt) => (None, Some(receipt.clone())),
            Err(e) => (Some(e.to_string()), None),
        };
        bot.events().broadcast(MemberEvent::TempMessagePostSend {
            group_id,
            target_id,
            message: chain.clone(),
            error,
            receipt,
        });

        debug!(ok = result.is_ok(), "Member({group_id}:{target_id}) <- {chain}");
        result
    }

    pub async fn send_text(&self, text: &str) -> Result<MessageReceipt> {
        self.send_message(MessageElement::text(text)).await
    }

    async fn dispatch(&self, bot: &Bot, chain: &MessageChain) -> Result<MessageReceipt> {
        let codec = bot.codec();
        let transport = bot.transport();
        let response = match codec.find_forward(chain) {
            Some(forward) => {
                let nodes = codec.forward_to_wire(forward)?;
                transport.send_private_forward_msg(self.id(), nodes).await?
            }
            None => {
                let wire = codec.to_wire(chain)?;
                transport
                    .send_private_msg(self.id(), wire, bot.settings().auto_escape)
                    .await?
            }
        };

        let context = format!(
            "send temp message to member {} of group {}",
            self.id(),
            self.group_id()
        );
        let ids = response
            .check(&context)?
            .map(|data| data.ids())
            .unwrap_or_default();

        Ok(MessageReceipt {
            internal_ids: ids.clone(),
            ids,
            source: chain.clone(),
            sender_id: bot.id(),
            group_id: self.group_id(),
            target_id: self.id(),
            time: Utc::now().timestamp(),
        })
    }

    /// Upload an image and return the element referencing it.
    pub async fn upload_image(&self, resource: &ExternalResource) -> Result<MessageElement> {
        upload_image(&self.bot()?, resource).await
    }

    /// Upload a short video. OneBot video segments carry no thumbnail, so
    /// `thumbnail` is not uploaded.
    pub async fn upload_short_video(
        &self,
        thumbnail: &ExternalResource,
        video: &ExternalResource,
    ) -> Result<MessageElement> {
        debug!(
            member_id = self.id(),
            thumbnail_bytes = thumbnail.len(),
            "Dropping video thumbnail"
        );
        upload_video(&self.bot()?, video).await
    }
}

fn uploader(bot: &Bot) -> Result<Arc<dyn UploadService>> {
    bot.uploader()
        .cloned()
        .ok_or_else(|| Error::UnsupportedOperation("no upload service is configured".into()))
}

pub(crate) async fn upload_image(bot: &Bot, resource: &ExternalResource) -> Result<MessageElement> {
    let remote = uploader(bot)?.upload(resource).await?;
    debug!(file = %remote.file, bytes = resource.len(), "Image uploaded");
    Ok(MessageElement::Image {
        file: remote.file,
        url: remote.url,
    })
}

pub(crate) async fn upload_video(bot: &Bot, video: &ExternalResource) -> Result<MessageElement> {
    let remote = uploader(bot)?.upload(video).await?;
    debug!(file = %remote.file, bytes = video.len(), "Video uploaded");
    Ok(MessageElement::Video {
        file: remote.file,
        url: remote.url,
    })
}

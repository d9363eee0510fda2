//! Messaging: private mail with a fixed expiry.

use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::game::errors::{Conflict, GameResult};
use crate::game::jail;
use crate::game::storage::{Records, UnitOfWork};
use crate::game::types::{CharacterId, MailId, MailMessage, SYSTEM_SENDER};
use crate::game::{GameContext, GameSettings};
use crate::validation::validate_mail;

/// Stage a message inside an existing unit of work.
pub fn stage_mail(
    uow: &mut UnitOfWork<'_>,
    settings: &GameSettings,
    sender_id: CharacterId,
    recipient_id: CharacterId,
    subject: &str,
    body: &str,
) -> GameResult<MailId> {
    let message = MailMessage::new(sender_id, recipient_id, subject, body, settings.mail_expiry());
    let id = uow.insert_mail(message)?;
    debug!("mail {} staged from {} to {}", id, sender_id, recipient_id);
    Ok(id)
}

/// Send player mail. A jailed sender may only write to the admin who jailed them.
pub fn send_mail(
    ctx: &GameContext,
    sender_id: CharacterId,
    recipient_id: CharacterId,
    subject: &str,
    body: &str,
) -> GameResult<MailId> {
    let (subject, body) = validate_mail(subject, body)?;
    let mut uow = ctx.store.begin();
    uow.character(recipient_id)?;
    if sender_id != SYSTEM_SENDER {
        let sender = uow.character(sender_id)?;
        if let Some(sentence) = jail::active_sentence(&uow, &sender, Utc::now())? {
            if sentence.admin_id != recipient_id {
                return Err(Conflict::Jailed.into());
            }
        }
    }
    let id = stage_mail(&mut uow, &ctx.settings, sender_id, recipient_id, &subject, &body)?;
    uow.commit()?;
    Ok(id)
}

/// Unexpired mail for `recipient`, newest first.
pub fn inbox(ctx: &GameContext, recipient: CharacterId, now: DateTime<Utc>) -> GameResult<Vec<MailMessage>> {
    let mut messages: Vec<MailMessage> = ctx
        .store
        .mailbox(recipient)?
        .into_iter()
        .filter(|mail| mail.expires_at > now)
        .collect();
    messages.reverse();
    Ok(messages)
}

pub fn unread_count(ctx: &GameContext, recipient: CharacterId, now: DateTime<Utc>) -> GameResult<usize> {
    Ok(inbox(ctx, recipient, now)?.iter().filter(|mail| !mail.read).count())
}

pub fn mark_read(ctx: &GameContext, recipient: CharacterId, id: MailId) -> GameResult<MailMessage> {
    let mut uow = ctx.store.begin();
    let mut message = uow.mail(recipient, id)?;
    if !message.read {
        message.read = true;
        uow.put_mail(&message)?;
        uow.commit()?;
    }
    Ok(message)
}

pub fn delete_mail(ctx: &GameContext, recipient: CharacterId, id: MailId) -> GameResult<()> {
    let mut uow = ctx.store.begin();
    uow.mail(recipient, id)?;
    uow.delete_mail(recipient, id);
    uow.commit()
}

/// Delete every message past its expiry. Returns how many were removed.
pub fn cleanup_expired_mail(ctx: &GameContext, now: DateTime<Utc>) -> GameResult<usize> {
    let mut uow = ctx.store.begin();
    let mut removed = 0usize;
    for message in ctx.store.list_mail()? {
        if message.expires_at <= now {
            uow.delete_mail(message.recipient_id, message.id);
            removed += 1;
        }
    }
    uow.commit()?;
    if removed > 0 {
        info!("removed {} expired messages", removed);
    }
    Ok(removed)
}

//! Request dispatch.
//!
//! Turns decoded client requests into registry operations and answers each
//! request under its own message id.

use crate::handlers::AppState;
use crate::metrics::{self, MembershipChange};
use roomcast_core::{ChatId, ClientId};
use roomcast_protocol::{codec, codes, Msg, Request, Resp};
use serde_json::json;
use tracing::{debug, warn};

/// Handle one inbound message from `client_id`.
pub async fn handle_msg(state: &AppState, client_id: ClientId, msg: Msg) {
    match codec::decode_payload::<Request>(&msg.data) {
        Ok(request) => handle_request(state, client_id, msg.id, request).await,
        Err(e) => {
            warn!(client = %client_id, error = %e, "Malformed request");
            metrics::record_error("request");
            let resp = Resp::error(codes::BAD_REQUEST, e.to_string());
            state.registry.reply(client_id, msg.id, &resp).await;
        }
    }
}

/// Execute a request and reply to the caller.
pub async fn handle_request(state: &AppState, client_id: ClientId, id: i64, request: Request) {
    debug!(client = %client_id, id, command = request.command(), "Request");
    metrics::record_request(request.command());

    let registry = &state.registry;

    let resp = match request {
        Request::Name { name } => match validate_name(state, &name) {
            Ok(name) => {
                registry.rename_client(client_id, name);
                Resp::ok_with(json!(registry.client(client_id)))
            }
            Err(resp) => resp,
        },

        Request::Create { name } => match validate_name(state, &name) {
            Ok(name) => {
                let chat = registry.create_chat(client_id, name);
                metrics::record_chat_created(registry.stats().chat_count);
                Resp::ok_with(json!(chat))
            }
            Err(resp) => resp,
        },

        Request::Delete { chat_id } => {
            let chat_id = ChatId(chat_id);
            let members = registry.members(chat_id);
            match registry.chat(chat_id) {
                Some(chat) if registry.delete_chat(client_id, chat_id) => {
                    metrics::record_chat_deleted(registry.stats().chat_count);
                    metrics::record_membership(MembershipChange::Evicted, members.len());
                    let event = Resp::event("deleted", json!({ "chat_id": chat.id }));
                    for member in members.into_iter().filter(|m| *m != client_id) {
                        registry.reply(member, id, &event).await;
                    }
                    Resp::ok_with(json!(chat))
                }
                _ => delete_refusal(state, chat_id),
            }
        }

        Request::Join { chat_id } | Request::Change { chat_id } => {
            let chat_id = ChatId(chat_id);
            let previous = registry.client(client_id).and_then(|c| c.chat_id);
            if registry.change_room(client_id, chat_id) {
                if let Some(previous) = previous.filter(|p| *p != chat_id) {
                    announce(state, client_id, previous, id, MembershipChange::Left);
                }
                announce(state, client_id, chat_id, id, MembershipChange::Joined);
                match registry.chat(chat_id) {
                    Some(chat) => Resp::ok_with(json!(chat)),
                    None => Resp::error(codes::NOT_FOUND, "No such chat"),
                }
            } else {
                Resp::error(codes::NOT_FOUND, "No such chat")
            }
        }

        Request::Leave => {
            let previous = registry.client(client_id).and_then(|c| c.chat_id);
            registry.leave(client_id);
            if let Some(previous) = previous {
                announce(state, client_id, previous, id, MembershipChange::Left);
            }
            Resp::ok()
        }

        Request::Say { text } => match registry.client(client_id) {
            Some(client) if client.chat_id.is_some() => {
                let event = Resp::event(
                    "say",
                    json!({
                        "chat_id": client.chat_id,
                        "from": client.id,
                        "name": client.name,
                        "text": text,
                    }),
                );
                metrics::record_broadcast(registry.broadcast(client_id, id, event));
                if registry.config().broadcast_to_origin {
                    // The echo already answers the request
                    return;
                }
                Resp::ok()
            }
            _ => Resp::error(codes::NOT_IN_CHAT, "Join a chat first"),
        },

        Request::List => Resp::ok_with(json!(registry.list_chats())),

        Request::Whoami => Resp::ok_with(json!(registry.client(client_id))),
    };

    registry.reply(client_id, id, &resp).await;
}

/// Tell everyone in `chat_id` that the caller joined or left it.
fn announce(
    state: &AppState,
    client_id: ClientId,
    chat_id: ChatId,
    id: i64,
    change: MembershipChange,
) {
    let name = state
        .registry
        .client(client_id)
        .map(|c| c.name)
        .unwrap_or_default();
    let event = Resp::event(
        change.as_str(),
        json!({ "chat_id": chat_id, "client": client_id, "name": name }),
    );
    metrics::record_membership(change, 1);
    metrics::record_broadcast(state.registry.broadcast_to(chat_id, client_id, id, event));
}

/// Explain a refused delete. The chat may have vanished since it was looked up.
fn delete_refusal(state: &AppState, chat_id: ChatId) -> Resp {
    if state.registry.chat_exists(chat_id) {
        Resp::error(codes::FORBIDDEN, "Only the creator can delete a chat")
    } else {
        Resp::error(codes::NOT_FOUND, "No such chat")
    }
}

fn validate_name<'a>(state: &AppState, name: &'a str) -> Result<&'a str, Resp> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Resp::error(codes::INVALID_NAME, "Name cannot be empty"));
    }
    if name.chars().count() > state.config.limits.max_name_length {
        return Err(Resp::error(codes::INVALID_NAME, "Name too long"));
    }
    if name.chars().any(char::is_control) {
        return Err(Resp::error(
            codes::INVALID_NAME,
            "Name contains invalid characters",
        ));
    }
    Ok(name)
}

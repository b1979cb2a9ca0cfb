use crate::common::{BROADCAST, Message, MessageKind};

/// Whether `requester` may see `message`.
///
/// Public messages and anything addressed to the broadcast sentinel are visible to
/// everyone, including an anonymous requester. Otherwise the requester has to be
/// the sender or the recipient.
pub fn is_visible(message: &Message, requester: Option<&str>) -> bool {
    if message.kind == MessageKind::Message || message.to == BROADCAST {
        return true;
    }

    match requester {
        Some(name) if !name.is_empty() => message.from == name || message.to == name,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(from: &str, to: &str, kind: MessageKind) -> Message {
        Message {
            from: from.into(),
            to: to.into(),
            text: "x".into(),
            kind,
            time: "00:00:00".into(),
        }
    }

    #[test]
    fn recipient_sees_public_and_own_private_messages() {
        let public = msg("X", "Y", MessageKind::Message);
        let to_b = msg("A", "B", MessageKind::PrivateMessage);
        let c_to_d = msg("C", "D", MessageKind::PrivateMessage);

        assert!(is_visible(&public, Some("B")));
        assert!(is_visible(&to_b, Some("B")));
        assert!(!is_visible(&c_to_d, Some("B")));
    }

    #[test]
    fn sender_sees_own_private_messages() {
        let a_to_b = msg("A", "B", MessageKind::PrivateMessage);
        assert!(is_visible(&a_to_b, Some("A")));
    }

    #[test]
    fn broadcast_recipient_is_visible_regardless_of_type() {
        let status = msg("A", BROADCAST, MessageKind::Status);
        let private = msg("A", BROADCAST, MessageKind::PrivateMessage);

        for requester in [Some("Z"), Some(""), None] {
            assert!(is_visible(&status, requester));
            assert!(is_visible(&private, requester));
        }
    }

    #[test]
    fn anonymous_requester_never_matches_identity() {
        let empty_sender = msg("", "", MessageKind::PrivateMessage);
        assert!(!is_visible(&empty_sender, None));
        assert!(!is_visible(&empty_sender, Some("")));
        assert!(is_visible(&msg("A", "B", MessageKind::Message), None));
    }

    #[test]
    fn status_to_someone_else_is_hidden() {
        let status = msg("A", "B", MessageKind::Status);
        assert!(!is_visible(&status, Some("C")));
        assert!(is_visible(&status, Some("B")));
    }
}

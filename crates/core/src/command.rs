use crate::config::DEFAULT_COMMAND_PREFIX;

/// Returns the item name when `message_text` is a price command.
///
/// Messages authored by the bot itself are never commands; this is the only thing
/// stopping the bot from answering its own replies forever.
pub fn extract_command(message_text: &str, sender_is_self: bool) -> Option<&str> {
    extract_command_with_prefix(message_text, sender_is_self, DEFAULT_COMMAND_PREFIX)
}

/// Like [`extract_command`] with a configurable prefix.
///
/// The remainder after the prefix is returned verbatim: no trimming, no case folding.
pub fn extract_command_with_prefix(
    message_text: &str,
    sender_is_self: bool,
    prefix: char,
) -> Option<&str> {
    if sender_is_self {
        return None;
    }

    let item_name = message_text.strip_prefix(prefix)?;
    if item_name.is_empty() {
        return None;
    }

    Some(item_name)
}

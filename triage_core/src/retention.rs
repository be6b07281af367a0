//! Bounded-memory retention policy for message history.

use crate::Message;

/// Bound a history to at most `max` messages.
///
/// The very first message is always preserved so the opening greeting and
/// context survive trimming; after it come the most recent `max - 1`
/// messages, with everything in between dropped. Histories already within
/// the bound are returned unchanged.
#[must_use]
pub fn trim(history: Vec<Message>, max: usize) -> Vec<Message> {
    if max == 0 || history.len() <= max {
        return history;
    }

    let tail_start = history.len() - (max - 1);
    let mut trimmed = Vec::with_capacity(max);
    trimmed.push(history[0].clone());
    trimmed.extend_from_slice(&history[tail_start..]);
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;

    fn messages(n: usize) -> Vec<Message> {
        (1..=n)
            .map(|i| Message::new(Role::Patient, format!("m{i}")))
            .collect()
    }

    #[test]
    fn history_within_bound_is_unchanged() {
        let history = messages(20);
        let trimmed = trim(history.clone(), 20);
        assert_eq!(trimmed.len(), 20);
        assert_eq!(trimmed[0].content, history[0].content);
        assert_eq!(trimmed[19].content, history[19].content);
    }

    #[test]
    fn keeps_first_message_and_most_recent_tail() {
        // 25 appends at max 20 -> [m1, m7, m8, ..., m25]
        let trimmed = trim(messages(25), 20);

        assert_eq!(trimmed.len(), 20);
        assert_eq!(trimmed[0].content, "m1");
        assert_eq!(trimmed[1].content, "m7");
        for (i, msg) in trimmed.iter().enumerate().skip(1) {
            assert_eq!(msg.content, format!("m{}", i + 6));
        }
        assert_eq!(trimmed[19].content, "m25");
    }

    #[test]
    fn single_overflow_drops_second_message() {
        let trimmed = trim(messages(21), 20);
        assert_eq!(trimmed.len(), 20);
        assert_eq!(trimmed[0].content, "m1");
        assert_eq!(trimmed[1].content, "m3");
    }

    #[test]
    fn zero_bound_is_a_no_op() {
        assert_eq!(trim(messages(5), 0).len(), 5);
    }
}

use super::message::ClassifiableMessage;

/// Decides which class a message belongs to. Must be deterministic.
pub trait AcceptancePolicy: Send + Sync {
    fn accepts(&self, message: &ClassifiableMessage) -> bool;
}

impl<F> AcceptancePolicy for F
where
    F: Fn(&ClassifiableMessage) -> bool + Send + Sync,
{
    fn accepts(&self, message: &ClassifiableMessage) -> bool {
        self(message)
    }
}

/// Accepts messages whose key has one of the configured lengths, counted in characters.
#[derive(Debug, Clone)]
pub struct KeyLengthPolicy {
    lengths: Vec<usize>,
}

impl KeyLengthPolicy {
    pub fn new(lengths: impl IntoIterator<Item = usize>) -> Self {
        Self {
            lengths: lengths.into_iter().collect(),
        }
    }
}

impl Default for KeyLengthPolicy {
    fn default() -> Self {
        Self::new([3, 4])
    }
}

impl AcceptancePolicy for KeyLengthPolicy {
    fn accepts(&self, message: &ClassifiableMessage) -> bool {
        self.lengths.contains(&message.key().chars().count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn message(key: &str) -> ClassifiableMessage {
        ClassifiableMessage::new(Value::Null, key, Value::Null, 1.0)
    }

    #[test]
    fn test_default_accepts_three_and_four_characters() {
        let policy = KeyLengthPolicy::default();

        assert!(!policy.accepts(&message("ab")));
        assert!(policy.accepts(&message("abc")));
        assert!(policy.accepts(&message("abcd")));
        assert!(!policy.accepts(&message("abcde")));
        assert!(!policy.accepts(&message("")));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        assert!(KeyLengthPolicy::default().accepts(&message("äöü")));
    }

    #[test]
    fn test_closures_are_policies() {
        let policy = |m: &ClassifiableMessage| m.value() > 0.5;
        assert!(policy.accepts(&message("x")));
    }
}

//! Unique-identifier minting for opt-in macro hygiene.

/// Mints identifiers unique within one compile.
///
/// The counter is owned by the expansion context rather than being
/// process-global, so that two compiles starting from a fresh counter
/// produce identical names (the determinism contract). It is never reset
/// mid-compile.
#[derive(Debug, Clone, Default)]
pub struct Gensyms {
    counter: u64,
}

const DEFAULT_PREFIX: &str = "gensym";

impl Gensyms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a fresh, compile-unique identifier name.
    ///
    /// When `generated` is supplied the exact same name is returned, so
    /// that re-expanding an already-expanded gensym node is idempotent.
    /// Idempotence is keyed on node identity: the expansion walker writes
    /// the minted name back into the originating node's `generated` field.
    pub fn fresh(&mut self, prefix: Option<&str>, generated: Option<&str>) -> String {
        if let Some(name) = generated {
            return name.to_string();
        }
        let n = self.counter;
        self.counter += 1;
        format!("{}_{}", prefix.unwrap_or(DEFAULT_PREFIX), n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_are_unique_and_monotonic() {
        let mut gensyms = Gensyms::new();
        assert_eq!(gensyms.fresh(Some("x"), None), "x_0");
        assert_eq!(gensyms.fresh(Some("x"), None), "x_1");
        assert_eq!(gensyms.fresh(None, None), "gensym_2");
    }

    #[test]
    fn previously_generated_name_is_returned_verbatim() {
        let mut gensyms = Gensyms::new();
        let first = gensyms.fresh(Some("tmp"), None);
        let again = gensyms.fresh(Some("tmp"), Some(&first));
        assert_eq!(first, again);
        // The counter did not advance for the idempotent call.
        assert_eq!(gensyms.fresh(Some("tmp"), None), "tmp_1");
    }
}

//! The clone-then-commit helper that gives every mutating
//! [`crate::participant::Participant`] operation all-or-nothing semantics.
//!
//! Several chain operations leave their owner in a logically inconsistent
//! state when they fail partway through (a DH ratchet step that advances
//! the root chain but then fails to re-seed the sending chain, say). Rather
//! than threading rollback logic through every such method, callers run the
//! whole operation against a clone and only write it back on success.

use crate::errors::Error;

/// Runs `op` against a clone of `*target`, writing the clone back only if
/// `op` succeeds. On failure `*target` is left exactly as it was.
pub(crate) fn atomically<T, R>(target: &mut T, op: impl FnOnce(&mut T) -> Result<R, Error>) -> Result<R, Error>
where
    T: Clone,
{
    let mut working_copy = target.clone();
    match op(&mut working_copy) {
        Ok(result) => {
            *target = working_copy;
            Ok(result)
        }
        Err(err) => {
            log::warn!("participant operation failed, discarding working copy: {err}");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug)]
    struct Counter(u32);

    #[test]
    fn commits_the_working_copy_on_success() {
        let mut counter = Counter(0);
        let result = atomically(&mut counter, |c| {
            c.0 += 1;
            Ok(c.0)
        });
        assert_eq!(result.unwrap(), 1);
        assert_eq!(counter, Counter(1));
    }

    #[test]
    fn discards_the_working_copy_on_failure() {
        let mut counter = Counter(5);
        let result: Result<(), Error> = atomically(&mut counter, |c| {
            c.0 += 100;
            Err(Error::InvalidValue("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(counter, Counter(5));
    }
}

use std::num::Wrapping;

/// Rounds `ix` up to the next multiple of `alignment`.
pub(crate) fn align(ix: usize, alignment: usize) -> usize {
    debug_assert!(
        alignment.is_power_of_two(),
        "{} is not power of 2, cannot be used as alignment",
        alignment
    );
    let mask = Wrapping(alignment) - Wrapping(1);
    let ix = Wrapping(ix);
    (ix + ((-ix) & mask)).0
}

/// Number of zero bytes needed before a value with `alignment` can
/// start at `ix`.
pub(crate) fn padding(ix: usize, alignment: usize) -> usize {
    align(ix, alignment) - ix
}

#[cfg(test)]
mod tests {
    use super::{align, padding};
    use test_log::test;

    #[test]
    fn alignment() {
        assert_eq!(align(23, 4), 24);
        assert_eq!(align(32, 4), 32);
        assert_eq!(align(31, 1), 31);
        assert_eq!(align(0, 8), 0);
        assert_eq!(align(25, 8), 32);
    }

    #[test]
    fn padding_counts() {
        assert_eq!(padding(1, 4), 3);
        assert_eq!(padding(8, 8), 0);
        assert_eq!(padding(13, 2), 1);
    }
}

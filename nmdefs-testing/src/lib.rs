//! Internal testing utilities for the nmdefs crates.

use std::fmt::Debug;
use std::panic::{RefUnwindSafe, UnwindSafe};

/// Table-driven test runner.
///
/// Declare a `Case` struct deriving `Debug`, build a collection of cases
/// and pass the check for one case to [`test_each`](TestCases::test_each).
/// Every case is run, even if earlier cases fail. Afterwards the runner
/// panics with the debug output of each case that failed, so one run
/// reports all broken cases rather than just the first.
///
/// ```
/// use nmdefs_testing::TestCases;
///
/// #[derive(Debug)]
/// struct Case {
///     direction: &'static str,
///     expected: usize,
/// }
///
/// let cases = [
///     Case { direction: "forward", expected: 1 },
///     Case { direction: "bidirectional", expected: 2 },
/// ];
///
/// cases.test_each(|case| {
///     let count = if case.direction == "bidirectional" { 2 } else { 1 };
///     assert_eq!(count, case.expected);
/// });
/// ```
///
/// Cases and any values captured by the check must be unwind safe. Values
/// with interior mutability should be created inside the check, or wrapped
/// in [`AssertUnwindSafe`](std::panic::AssertUnwindSafe).
pub trait TestCases {
    /// The data for a single test case.
    type Case;

    /// Run `test` against a reference to each case.
    fn test_each(self, test: impl Fn(&Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + RefUnwindSafe;

    /// Run `test` against an owned clone of each case.
    ///
    /// Useful when the check needs to move fields out of the case.
    fn test_each_clone(self, test: impl Fn(Self::Case) + RefUnwindSafe)
    where
        Self::Case: Debug + Clone + UnwindSafe;
}

/// Panic listing the failed cases, if there are any.
fn report_failures<T: Debug>(total: usize, failures: &[T]) {
    if failures.is_empty() {
        return;
    }
    panic!(
        "{} of {} test cases failed: {:#?}",
        failures.len(),
        total,
        failures
    );
}

impl<I: IntoIterator> TestCases for I {
    type Case = I::Item;

    fn test_each(self, test: impl Fn(&I::Item) + RefUnwindSafe)
    where
        I::Item: Debug + RefUnwindSafe,
    {
        let mut total = 0;
        let failures: Vec<I::Item> = self
            .into_iter()
            .inspect(|_| total += 1)
            .filter(|case| std::panic::catch_unwind(|| test(case)).is_err())
            .collect();
        report_failures(total, &failures);
    }

    fn test_each_clone(self, test: impl Fn(I::Item) + RefUnwindSafe)
    where
        I::Item: Debug + Clone + UnwindSafe,
    {
        let mut total = 0;
        let test = &test;
        let failures: Vec<I::Item> = self
            .into_iter()
            .inspect(|_| total += 1)
            .filter(|case| {
                let owned = case.clone();
                std::panic::catch_unwind(move || test(owned)).is_err()
            })
            .collect();
        report_failures(total, &failures);
    }
}

#[cfg(test)]
mod tests {
    use super::TestCases;

    #[derive(Clone, Debug)]
    struct Case {
        size: usize,
    }

    #[test]
    fn test_all_cases_pass() {
        let cases = [Case { size: 1 }, Case { size: 2 }];
        cases.clone().test_each(|case| assert!(case.size > 0));
        cases.test_each_clone(|case| assert!(case.size > 0));
    }

    #[test]
    #[should_panic(expected = "1 of 3 test cases failed")]
    fn test_each_reports_failures() {
        let cases = [Case { size: 1 }, Case { size: 0 }, Case { size: 2 }];
        cases.test_each(|case| assert!(case.size > 0));
    }

    #[test]
    #[should_panic(expected = "2 of 2 test cases failed")]
    fn test_each_clone_reports_failures() {
        let cases = [Case { size: 0 }, Case { size: 0 }];
        cases.test_each_clone(|case| assert!(case.size > 0));
    }
}

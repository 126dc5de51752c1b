// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Failure injection

/// How an operation of a fake misbehaves
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// fail every call
    Always,
    /// fail the first n calls, then succeed
    FirstN(u32),
    /// report not-ready on the first n calls, then succeed
    NotReady(u32),
    /// panic on every call
    Panic,
}

/// What a faulty operation must do on a call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Verdict {
    Pass,
    Fail,
    NotReady,
    Panic,
}

/// A fault plus the number of calls it already failed
#[derive(Clone, Copy, Debug)]
pub(crate) struct Injected {
    fault: Fault,
    failed: u32,
}

impl Injected {
    pub(crate) fn new(fault: Fault) -> Self {
        Self { fault, failed: 0 }
    }
    pub(crate) fn verdict(&mut self) -> Verdict {
        match self.fault {
            Fault::Always => Verdict::Fail,
            Fault::Panic => Verdict::Panic,
            Fault::FirstN(n) if self.failed < n => {
                self.failed += 1;
                Verdict::Fail
            }
            Fault::NotReady(n) if self.failed < n => {
                self.failed += 1;
                Verdict::NotReady
            }
            Fault::FirstN(_) | Fault::NotReady(_) => Verdict::Pass,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_n_then_pass() {
        let mut injected = Injected::new(Fault::FirstN(2));
        assert_eq!(injected.verdict(), Verdict::Fail);
        assert_eq!(injected.verdict(), Verdict::Fail);
        assert_eq!(injected.verdict(), Verdict::Pass);
        assert_eq!(Injected::new(Fault::Always).verdict(), Verdict::Fail);
        assert_eq!(Injected::new(Fault::Panic).verdict(), Verdict::Panic);

        let mut injected = Injected::new(Fault::NotReady(1));
        assert_eq!(injected.verdict(), Verdict::NotReady);
        assert_eq!(injected.verdict(), Verdict::Pass);
    }
}

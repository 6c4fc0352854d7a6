// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Outcome of a bounded wait.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Polled<T> {
    Ready(T),
    TimedOut { iterations: u32 },
}

/// Repeatedly `check` the state, calling `advance` between unsuccessful
/// checks, for at most `limit` checks.
///
/// Errors from `check` abort the wait immediately.
pub fn poll_bounded<S, T, E>(
    state: &mut S,
    limit: u32,
    mut check: impl FnMut(&mut S) -> Result<Option<T>, E>,
    mut advance: impl FnMut(&mut S),
) -> Result<Polled<T>, E> {
    for _ in 0..limit {
        if let Some(val) = check(state)? {
            return Ok(Polled::Ready(val));
        }
        advance(state);
    }
    Ok(Polled::TimedOut { iterations: limit })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ready_after_some_steps() {
        let mut count = 0u32;
        let res: Result<_, ()> = poll_bounded(
            &mut count,
            10,
            |c| Ok((*c == 3).then_some(*c)),
            |c| *c += 1,
        );
        assert_eq!(res, Ok(Polled::Ready(3)));
        assert_eq!(count, 3);
    }

    #[test]
    fn gives_up_at_limit() {
        let mut count = 0u32;
        let res: Result<Polled<()>, ()> =
            poll_bounded(&mut count, 5, |_| Ok(None), |c| *c += 1);
        assert_eq!(res, Ok(Polled::TimedOut { iterations: 5 }));
        assert_eq!(count, 5);
    }

    #[test]
    fn error_stops_polling() {
        let mut count = 0u32;
        let res: Result<Polled<()>, &str> = poll_bounded(
            &mut count,
            10,
            |c| if *c == 2 { Err("boom") } else { Ok(None) },
            |c| *c += 1,
        );
        assert_eq!(res, Err("boom"));
        assert_eq!(count, 2);
    }

    #[test]
    fn zero_limit_never_checks() {
        let mut checked = false;
        let res: Result<Polled<()>, ()> = poll_bounded(
            &mut checked,
            0,
            |c| {
                *c = true;
                Ok(None)
            },
            |_| {},
        );
        assert_eq!(res, Ok(Polled::TimedOut { iterations: 0 }));
        assert!(!checked);
    }
}

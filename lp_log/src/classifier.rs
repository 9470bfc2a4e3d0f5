use lp_types::LifecycleEvent;

/// Length of the `YYYY/MM/DD HH:MM:SS` prefix
const TIMESTAMP_LEN: usize = 19;

/// Classify a single client log line
///
/// Recognised records look like
/// `2024/12/18 21:14:05 1234 abc01f [INFO Client 42] [SHADER] Delay: OFF`.
/// The whole line must match; anything else is `LifecycleEvent::None`.
pub fn classify(line: &str) -> LifecycleEvent {
    let line = line.trim();

    if line.len() <= TIMESTAMP_LEN || !is_timestamp(&line.as_bytes()[..TIMESTAMP_LEN]) {
        return LifecycleEvent::None;
    }

    // The timestamp is pure ASCII, so this slice lands on a char boundary
    let rest = &line[TIMESTAMP_LEN..];
    if !rest.starts_with(char::is_whitespace) {
        return LifecycleEvent::None;
    }

    let mut tokens = rest.split_whitespace();

    // <thread id> <hex token> [INFO Client <n>]
    let header_ok = tokens.next().is_some_and(is_digits)
        && tokens.next().is_some_and(is_hex)
        && tokens.next().is_some_and(|t| t.eq_ignore_ascii_case("[INFO"))
        && tokens.next().is_some_and(|t| t.eq_ignore_ascii_case("Client"))
        && tokens.next().and_then(|t| t.strip_suffix(']')).is_some_and(is_digits);
    if !header_ok {
        return LifecycleEvent::None;
    }

    let Some(subsystem) = tokens.next() else {
        return LifecycleEvent::None;
    };
    let payload: Vec<&str> = tokens.collect();

    if subsystem.eq_ignore_ascii_case("[ENGINE]") {
        match payload.as_slice() {
            [word] if word.eq_ignore_ascii_case("Init") => LifecycleEvent::GameStart,
            _ => LifecycleEvent::None,
        }
    } else if subsystem.eq_ignore_ascii_case("[SHADER]") {
        match payload.as_slice() {
            [label, state] if label.eq_ignore_ascii_case("Delay:") => {
                if state.eq_ignore_ascii_case("OFF") {
                    LifecycleEvent::LoadStart
                } else if state.eq_ignore_ascii_case("ON") {
                    LifecycleEvent::LoadEnd
                } else {
                    LifecycleEvent::None
                }
            }
            _ => LifecycleEvent::None,
        }
    } else {
        LifecycleEvent::None
    }
}

/// `YYYY/MM/DD HH:MM:SS`, digits only (no calendar validation)
#[inline]
fn is_timestamp(bytes: &[u8]) -> bool {
    bytes.len() == TIMESTAMP_LEN
        && bytes.iter().enumerate().all(|(i, &b)| match i {
            4 | 7 => b == b'/',
            10 => b == b' ',
            13 | 16 => b == b':',
            _ => b.is_ascii_digit(),
        })
}

#[inline]
fn is_digits(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit())
}

#[inline]
fn is_hex(token: &str) -> bool {
    !token.is_empty() && token.bytes().all(|b| b.is_ascii_hexdigit())
}

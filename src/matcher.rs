use crate::types::UserId;
use crate::uid_map::{UidKey, UidProjection};

/// Default length guard for the prefix fallback. Large enough that the
/// fallback is effectively off unless a caller lowers it.
pub const DEFAULT_MIN_LEN: usize = 1024;

/// Decide whether `process` running as `uid` must be hidden.
///
/// Isolated processes are matched by prefix against the isolated patterns,
/// since the system appends a numeric suffix the rule may not include.
/// Everything else needs an exact name match. In both cases, when pattern
/// and name are both longer than `min_len`, an observed name that is a
/// prefix of the pattern also matches: observers truncate long names to a
/// fixed buffer.
pub fn is_hide_target(
    projection: &UidProjection,
    uid: UserId,
    process: &str,
    min_len: usize,
) -> bool {
    let isolated = uid.is_isolated();
    let key = if isolated {
        UidKey::Isolated
    } else {
        UidKey::Uid(uid)
    };

    let Some(patterns) = projection.patterns(key) else {
        return false;
    };

    patterns.iter().any(|pattern| {
        let truncated = pattern.len() > min_len
            && process.len() > min_len
            && pattern.starts_with(process);
        if isolated {
            truncated || process.starts_with(pattern.as_str())
        } else {
            truncated || pattern == process
        }
    })
}

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// seconds since `1970-1-1 00:00:00`,named as [UNIX_EPOCH], truncated to the
/// 32 bits an inode stores
pub fn now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().min(u32::MAX as u64) as u32)
        // a clock before the epoch is reported as the epoch itself
        .unwrap_or(0)
}

/// convert a stored timestamp back to [SystemTime]
pub fn to_system_time(secs: u32) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_round_trips() {
        let stamp = now();
        assert!(stamp > 0);
        let back = to_system_time(stamp);
        let diff = SystemTime::now().duration_since(back).unwrap();
        assert!(diff < Duration::from_secs(5));
    }
}

//! Provides [`EvictSelector`], the predicate passed to [`super::CacheStore::evict`].

use std::time::Duration;

/// Which entries an `evict` call should remove.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvictSelector {
    /// Every entry, regardless of age.
    All,
    /// Entries past this store's TTL. A no-op on a store with an unlimited TTL.
    Expired,
    /// Entries whose age exceeds the given duration, independent of the store's own TTL.
    OlderThan(Duration),
}

impl EvictSelector {
    /// Parses a `factorix cache evict <selector>` CLI argument: `all`, `expired`, or an age such
    /// as `7d`/`12h`/`30m`/`45s` meaning [`OlderThan`](EvictSelector::OlderThan).
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "all" => Ok(EvictSelector::All),
            "expired" => Ok(EvictSelector::Expired),
            other => Ok(EvictSelector::OlderThan(parse_age(other)?)),
        }
    }
}

/// Parses an age string such as `7d`, `12h`, `30m` or `45s` into a [`Duration`].
fn parse_age(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    let (digits, unit) = s.split_at(s.len().saturating_sub(1));
    let amount: u64 = digits
        .parse()
        .map_err(|_| anyhow::anyhow!("'{}' is not a valid age selector (expected e.g. '7d', '12h')", s))?;

    let seconds = match unit {
        "s" => amount,
        "m" => amount * 60,
        "h" => amount * 60 * 60,
        "d" => amount * 60 * 60 * 24,
        _ => return Err(anyhow::anyhow!("'{}' has an unrecognized age unit (expected s/m/h/d)", s)),
    };

    Ok(Duration::from_secs(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_named_selectors() {
        assert_eq!(EvictSelector::parse("all").unwrap(), EvictSelector::All);
        assert_eq!(EvictSelector::parse("expired").unwrap(), EvictSelector::Expired);
    }

    #[test]
    fn parses_age_selectors() {
        assert_eq!(
            EvictSelector::parse("7d").unwrap(),
            EvictSelector::OlderThan(Duration::from_secs(7 * 86400))
        );
        assert_eq!(
            EvictSelector::parse("12h").unwrap(),
            EvictSelector::OlderThan(Duration::from_secs(12 * 3600))
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(EvictSelector::parse("banana").is_err());
    }
}

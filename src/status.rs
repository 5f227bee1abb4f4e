//! Rate-limit status model: the wire shape as the service sends it, the
//! typed domain shape handed to callers, and the translation between them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Endpoint path as used by the service, e.g. `/statuses/show/:id`.
pub type Endpoint = String;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawEndpointStatus {
    pub limit: i64,
    pub remaining: i64,
    /// Epoch seconds.
    pub reset: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointStatus {
    pub limit: i64,
    pub remaining: i64,
    pub reset: DateTime<Utc>,
}

impl EndpointStatus {
    pub fn is_exhausted(&self) -> bool {
        self.remaining <= 0
    }

    /// Time left in the current window, zero once `now` is past the reset.
    pub fn until_reset(&self, now: DateTime<Utc>) -> Duration {
        (self.reset - now).to_std().unwrap_or(Duration::ZERO)
    }
}

pub type RawResource = HashMap<Endpoint, RawEndpointStatus>;
pub type Resource = HashMap<Endpoint, EndpointStatus>;

/// The closed set of resource families the service reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bundle {
    Users,
    Statuses,
    Help,
    Search,
    Friendships,
    Followers,
    Account,
    Media,
    DirectMessages,
    Mutes,
    Favorites,
}

impl Bundle {
    pub const ALL: [Bundle; 11] = [
        Bundle::Users,
        Bundle::Statuses,
        Bundle::Help,
        Bundle::Search,
        Bundle::Friendships,
        Bundle::Followers,
        Bundle::Account,
        Bundle::Media,
        Bundle::DirectMessages,
        Bundle::Mutes,
        Bundle::Favorites,
    ];

    /// Wire name, also accepted by the `resources` query parameter.
    pub fn as_str(self) -> &'static str {
        match self {
            Bundle::Users => "users",
            Bundle::Statuses => "statuses",
            Bundle::Help => "help",
            Bundle::Search => "search",
            Bundle::Friendships => "friendships",
            Bundle::Followers => "followers",
            Bundle::Account => "account",
            Bundle::Media => "media",
            Bundle::DirectMessages => "direct_messages",
            Bundle::Mutes => "mutes",
            Bundle::Favorites => "favorites",
        }
    }
}

impl fmt::Display for Bundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bundle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Bundle::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| format!("unknown resource bundle: {}", s))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawResources {
    #[serde(default)]
    pub users: RawResource,
    #[serde(default)]
    pub statuses: RawResource,
    #[serde(default)]
    pub help: RawResource,
    #[serde(default)]
    pub search: RawResource,
    #[serde(default)]
    pub friendships: RawResource,
    #[serde(default)]
    pub followers: RawResource,
    #[serde(default)]
    pub account: RawResource,
    #[serde(default)]
    pub media: RawResource,
    #[serde(default)]
    pub direct_messages: RawResource,
    #[serde(default)]
    pub mutes: RawResource,
    #[serde(default)]
    pub favorites: RawResource,
}

impl RawResources {
    pub fn get(&self, bundle: Bundle) -> &RawResource {
        match bundle {
            Bundle::Users => &self.users,
            Bundle::Statuses => &self.statuses,
            Bundle::Help => &self.help,
            Bundle::Search => &self.search,
            Bundle::Friendships => &self.friendships,
            Bundle::Followers => &self.followers,
            Bundle::Account => &self.account,
            Bundle::Media => &self.media,
            Bundle::DirectMessages => &self.direct_messages,
            Bundle::Mutes => &self.mutes,
            Bundle::Favorites => &self.favorites,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Resources {
    pub users: Resource,
    pub statuses: Resource,
    pub help: Resource,
    pub search: Resource,
    pub friendships: Resource,
    pub followers: Resource,
    pub account: Resource,
    pub media: Resource,
    pub direct_messages: Resource,
    pub mutes: Resource,
    pub favorites: Resource,
}

impl Resources {
    pub fn get(&self, bundle: Bundle) -> &Resource {
        match bundle {
            Bundle::Users => &self.users,
            Bundle::Statuses => &self.statuses,
            Bundle::Help => &self.help,
            Bundle::Search => &self.search,
            Bundle::Friendships => &self.friendships,
            Bundle::Followers => &self.followers,
            Bundle::Account => &self.account,
            Bundle::Media => &self.media,
            Bundle::DirectMessages => &self.direct_messages,
            Bundle::Mutes => &self.mutes,
            Bundle::Favorites => &self.favorites,
        }
    }

    /// Iterate every (bundle, endpoint, status) triple.
    pub fn iter(&self) -> impl Iterator<Item = (Bundle, &Endpoint, &EndpointStatus)> {
        Bundle::ALL
            .into_iter()
            .flat_map(move |b| self.get(b).iter().map(move |(k, v)| (b, k, v)))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitContext {
    #[serde(default)]
    pub access_token: String,
}

/// Rate-limit status exactly as decoded from the wire: resets are epoch seconds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RawRateLimitStatus {
    #[serde(default)]
    pub rate_limit_context: RateLimitContext,
    #[serde(default)]
    pub resources: RawResources,
}

/// Rate-limit status with parsed reset instants.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub rate_limit_context: RateLimitContext,
    pub resources: Resources,
}

impl RateLimitStatus {
    /// Look up an endpoint in whichever bundle reports it.
    pub fn endpoint(&self, path: &str) -> Option<(Bundle, &EndpointStatus)> {
        Bundle::ALL
            .into_iter()
            .find_map(|b| self.resources.get(b).get(path).map(|s| (b, s)))
    }

    pub fn exhausted(&self) -> impl Iterator<Item = (Bundle, &Endpoint, &EndpointStatus)> {
        self.resources.iter().filter(|(_, _, s)| s.is_exhausted())
    }
}

/// Epoch seconds to a UTC instant. Values outside chrono's range saturate
/// to the nearest representable instant.
pub fn to_timestamp(epoch_secs: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(epoch_secs, 0).unwrap_or(if epoch_secs < 0 {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

pub fn translate(raw: &RawResource) -> Resource {
    raw.iter()
        .map(|(endpoint, s)| {
            (
                endpoint.clone(),
                EndpointStatus {
                    limit: s.limit,
                    remaining: s.remaining,
                    reset: to_timestamp(s.reset),
                },
            )
        })
        .collect()
}

pub fn assemble(raw: &RawRateLimitStatus) -> RateLimitStatus {
    // Destructure exhaustively: a bundle added to RawResources must be
    // handled here before this compiles.
    let RawResources {
        users,
        statuses,
        help,
        search,
        friendships,
        followers,
        account,
        media,
        direct_messages,
        mutes,
        favorites,
    } = &raw.resources;

    RateLimitStatus {
        rate_limit_context: raw.rate_limit_context.clone(),
        resources: Resources {
            users: translate(users),
            statuses: translate(statuses),
            help: translate(help),
            search: translate(search),
            friendships: translate(friendships),
            followers: translate(followers),
            account: translate(account),
            media: translate(media),
            direct_messages: translate(direct_messages),
            mutes: translate(mutes),
            favorites: translate(favorites),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_entry(limit: i64, remaining: i64, reset: i64) -> RawEndpointStatus {
        RawEndpointStatus {
            limit,
            remaining,
            reset,
        }
    }

    fn full_raw() -> RawRateLimitStatus {
        let mut raw = RawRateLimitStatus::default();
        raw.rate_limit_context.access_token = "tok".into();
        let r = &mut raw.resources;
        for (i, res) in [
            &mut r.users,
            &mut r.statuses,
            &mut r.help,
            &mut r.search,
            &mut r.friendships,
            &mut r.followers,
            &mut r.account,
            &mut r.media,
            &mut r.direct_messages,
            &mut r.mutes,
            &mut r.favorites,
        ]
        .into_iter()
        .enumerate()
        {
            res.insert(
                format!("/endpoint/{}", i),
                raw_entry(15, i as i64, 1_700_000_000 + i as i64),
            );
        }
        raw
    }

    #[test]
    fn timestamp_roundtrips_epoch_seconds() {
        for t in [0i64, 1, 1_700_000_000, 4_102_444_800] {
            assert_eq!(to_timestamp(t).timestamp(), t);
            assert_eq!(to_timestamp(t), to_timestamp(t));
        }
    }

    #[test]
    fn timestamp_saturates_out_of_range() {
        assert_eq!(to_timestamp(i64::MAX), DateTime::<Utc>::MAX_UTC);
        assert_eq!(to_timestamp(i64::MIN), DateTime::<Utc>::MIN_UTC);
    }

    #[test]
    fn translate_preserves_keys_and_counts() {
        let mut raw = RawResource::new();
        raw.insert("/users/show/:id".into(), raw_entry(900, 899, 100));
        raw.insert("/users/lookup".into(), raw_entry(300, 0, 200));
        let out = translate(&raw);
        assert_eq!(out.len(), raw.len());
        for (k, v) in &raw {
            let got = &out[k];
            assert_eq!(got.limit, v.limit);
            assert_eq!(got.remaining, v.remaining);
            assert_eq!(got.reset.timestamp(), v.reset);
        }
    }

    #[test]
    fn translate_empty_is_empty() {
        assert!(translate(&RawResource::new()).is_empty());
    }

    #[test]
    fn assemble_populates_every_bundle() {
        let raw = full_raw();
        let status = assemble(&raw);
        assert_eq!(status.rate_limit_context.access_token, "tok");
        for b in Bundle::ALL {
            assert_eq!(status.resources.get(b).len(), 1, "bundle {} empty", b);
            assert_eq!(
                status.resources.get(b).keys().collect::<Vec<_>>(),
                raw.resources.get(b).keys().collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn assemble_is_idempotent() {
        let raw = full_raw();
        assert_eq!(assemble(&raw), assemble(&raw));
    }

    #[test]
    fn search_only_payload_leaves_other_bundles_empty() {
        let raw: RawRateLimitStatus = serde_json::from_value(serde_json::json!({
            "rate_limit_context": {"access_token": "abc"},
            "resources": {"search": {"/search/tweets": {"limit": 180, "remaining": 179, "reset": 1700000000}}}
        }))
        .unwrap();
        let status = assemble(&raw);
        assert_eq!(status.rate_limit_context.access_token, "abc");
        let s = &status.resources.search["/search/tweets"];
        assert_eq!(s.limit, 180);
        assert_eq!(s.remaining, 179);
        assert_eq!(s.reset, to_timestamp(1_700_000_000));
        for b in Bundle::ALL.into_iter().filter(|b| *b != Bundle::Search) {
            assert!(status.resources.get(b).is_empty());
        }
    }

    #[test]
    fn endpoint_lookup_and_exhausted() {
        let mut raw = RawRateLimitStatus::default();
        raw.resources
            .mutes
            .insert("/mutes/users/ids".into(), raw_entry(15, 0, 10));
        raw.resources
            .help
            .insert("/help/languages".into(), raw_entry(15, 14, 10));
        let status = assemble(&raw);
        let (bundle, s) = status.endpoint("/mutes/users/ids").unwrap();
        assert_eq!(bundle, Bundle::Mutes);
        assert!(s.is_exhausted());
        assert!(status.endpoint("/nope").is_none());
        let exhausted: Vec<_> = status.exhausted().map(|(_, k, _)| k.as_str()).collect();
        assert_eq!(exhausted, vec!["/mutes/users/ids"]);
    }

    #[test]
    fn until_reset_clamps_to_zero() {
        let s = EndpointStatus {
            limit: 1,
            remaining: 0,
            reset: to_timestamp(100),
        };
        assert_eq!(s.until_reset(to_timestamp(40)), Duration::from_secs(60));
        assert_eq!(s.until_reset(to_timestamp(500)), Duration::ZERO);
    }

    #[test]
    fn bundle_names_parse() {
        for b in Bundle::ALL {
            assert_eq!(b.as_str().parse::<Bundle>().unwrap(), b);
        }
        assert!("timeline".parse::<Bundle>().is_err());
    }
}

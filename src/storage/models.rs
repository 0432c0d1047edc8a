use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A persisted short-ID-to-URL mapping with ownership and visit metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    #[serde(default)]
    pub owner_provider: String,
    #[serde(default)]
    pub owner_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote_addr: Option<String>,
    /// Argon2 PHC string, present only for password-gated entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub public: EntryPublic,
}

/// The part of an entry that may be shown to anyone holding the short ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryPublic {
    pub created_on: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_visit: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub visit_count: u64,
    pub url: String,
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

impl Default for EntryPublic {
    fn default() -> Self {
        Self {
            created_on: Utc::now(),
            last_visit: None,
            expiration: None,
            visit_count: 0,
            url: String::new(),
        }
    }
}

impl Entry {
    /// Anonymous entry pointing at `url`
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            public: EntryPublic {
                url: url.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    pub fn with_owner(mut self, provider: impl Into<String>, id: impl Into<String>) -> Self {
        self.owner_provider = provider.into();
        self.owner_id = id.into();
        self
    }

    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.public.expiration = Some(expiration);
        self
    }

    pub fn with_remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = Some(addr.into());
        self
    }

    /// Key under which the owner index groups this entry
    pub fn owner_key(&self) -> String {
        owner_key(&self.owner_provider, &self.owner_id)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.public.expiration.is_some_and(|exp| now > exp)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_password_protected(&self) -> bool {
        self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

/// Owner identity as stored in the owner index: provider and id concatenated.
pub fn owner_key(provider: &str, owner_id: &str) -> String {
    format!("{}{}", provider, owner_id)
}

/// One logged access to an entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visitor {
    pub ip: String,
    #[serde(default)]
    pub referer: String,
    #[serde(default)]
    pub user_agent: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_medium: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utm_term: Option<String>,
}

impl Visitor {
    /// 创建新的访问记录
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            referer: String::new(),
            user_agent: String::new(),
            timestamp: Utc::now(),
            utm_source: None,
            utm_medium: None,
            utm_campaign: None,
            utm_content: None,
            utm_term: None,
        }
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = referer.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}
